#![warn(rust_2018_idioms)]

use std::{process, time::Duration};

use http_garage::{
  config::Config,
  door::{
    controller::{self, DoorController},
    gateway::{gpio::GpioGateway, DoorGateway},
    Door,
  },
  error::GarageResult,
  http, notifier,
  schedule::{self, CronTrigger},
  service::Services,
};
use simple_logger::SimpleLogger;
use tokio::{
  select,
  signal::{self, unix::SignalKind},
  sync::watch,
  time,
};

/// How long queued notifications get to go out once everything else has stopped
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
  SimpleLogger::new()
    .with_level(log::LevelFilter::Info)
    .with_module_level("hyper", log::LevelFilter::Warn)
    .with_module_level("reqwest", log::LevelFilter::Warn)
    .env()
    .init()
    .unwrap();

  if let Err(err) = run().await {
    log::error!("Shutting down after error: {}", err);
    process::exit(1);
  }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() -> GarageResult<()> {
  let mut terminate = signal::unix::signal(SignalKind::terminate())?;
  select! {
    interrupted = signal::ctrl_c() => interrupted?,
    _ = terminate.recv() => {},
  }
  log::info!("Received shutdown signal");
  Ok(())
}

/// Run the control loop, schedules and HTTP server until a signal arrives or one of them fails
async fn run() -> GarageResult<()> {
  let config = Config::load()?;

  let mut gateway = GpioGateway::new(&config.gpio)?;
  let initial_state = controller::initial_state(&mut gateway)?;
  gateway.stop()?;
  log::info!("Door is initially {:?}", initial_state.kind());

  let (notifier, webhook) = notifier::spawn(config.webhook_url.clone(), config.notification_queue);
  let door = Door::new(initial_state, notifier);
  let (shutdown_tx, shutdown_rx) = watch::channel(false);

  let services = Services {
    control: tokio::spawn(
      DoorController::new(gateway, door.clone(), config.stuck_after, config.control_tick).run(shutdown_rx.clone()),
    ),
    crons: schedule::spawn(CronTrigger::from_config(&config), &door, config.timezone, &shutdown_rx),
    server: tokio::spawn(http::serve(config.listen_address, door.clone(), shutdown_rx)),
  };
  let outcome = services.run_until(shutdown_signal(), &shutdown_tx).await;

  drop(door);
  if let Some(webhook) = webhook {
    if time::timeout(NOTIFICATION_DRAIN_TIMEOUT, webhook).await.is_err() {
      log::warn!("Gave up delivering queued notifications");
    }
  }

  log::info!("Stopped");
  outcome
}

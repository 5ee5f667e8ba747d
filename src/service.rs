use std::future::Future;

use tokio::{
  select,
  sync::watch,
  task::{JoinError, JoinHandle},
};

use crate::error::GarageResult;

/// The long running tasks of the door controller
#[derive(Debug)]
pub struct Services<G> {
  pub control: JoinHandle<GarageResult<G>>,
  pub server: JoinHandle<GarageResult<()>>,
  pub crons: Vec<JoinHandle<()>>,
}

impl<G> Services<G> {
  /// Run until `stop` resolves or the control loop or server ends, then shut everything down in order.
  ///
  /// Every task is awaited whatever ended the run (a panic included), so the control loop has stopped the motor and
  /// the gateway has been dropped by the time this returns.
  pub async fn run_until<F>(self, stop: F, shutdown: &watch::Sender<bool>) -> GarageResult<()>
  where
    F: Future<Output = GarageResult<()>>,
  {
    let Services {
      mut control,
      mut server,
      crons,
    } = self;
    let mut control_finished = false;
    let mut server_finished = false;

    // the control loop and server only end early on an error
    let outcome = select! {
      stopped = stop => stopped,
      joined = &mut control => {
        control_finished = true;
        flatten(joined).map(drop)
      }
      joined = &mut server => {
        server_finished = true;
        flatten(joined)
      }
    };

    shutdown.send_replace(true);

    if !control_finished {
      match flatten(control.await) {
        // dropping the gateway releases the motor pins
        Ok(gateway) => drop(gateway),
        Err(err) => log::error!("Control loop failed while stopping: {}", err),
      }
    }
    if !server_finished {
      if let Err(err) = flatten(server.await) {
        log::error!("HTTP server failed while stopping: {}", err);
      }
    }
    for cron in crons {
      if let Err(err) = cron.await {
        log::error!("Cron task failed while stopping: {}", err);
      }
    }

    outcome
  }
}

fn flatten<T>(joined: Result<GarageResult<T>, JoinError>) -> GarageResult<T> {
  joined.unwrap_or_else(|err| Err(err.into()))
}

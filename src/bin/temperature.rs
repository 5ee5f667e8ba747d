#![warn(rust_2018_idioms)]

use std::{path::PathBuf, process, sync::Arc};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use http_garage::{
  config::TemperatureConfig,
  error::GarageResult,
  temperature::{self, SensorResponse},
};
use simple_logger::SimpleLogger;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
  SimpleLogger::new()
    .with_level(log::LevelFilter::Info)
    .with_module_level("hyper", log::LevelFilter::Warn)
    .env()
    .init()
    .unwrap();

  if let Err(err) = run().await {
    log::error!("Temperature service failed: {}", err);
    process::exit(1);
  }
}

async fn run() -> GarageResult<()> {
  let config = TemperatureConfig::load()?;
  let router = Router::new()
    .route("/temperatures/all", get(temperatures))
    .with_state(Arc::new(config.w1_devices_dir));

  let listener = TcpListener::bind(config.listen_address).await?;
  log::info!("Listening on http://{}", listener.local_addr()?);
  axum::serve(listener, router).await?;
  Ok(())
}

async fn temperatures(State(w1_devices_dir): State<Arc<PathBuf>>) -> Result<Json<SensorResponse>, (StatusCode, String)> {
  let read = tokio::task::spawn_blocking(move || temperature::read_all(&w1_devices_dir)).await;
  match read {
    Ok(Ok(response)) => Ok(Json(response)),
    Ok(Err(err)) => {
      log::error!("Failed to read temperatures: {}", err);
      Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
    }
    Err(err) => {
      log::error!("Temperature read panicked: {}", err);
      Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
    }
  }
}

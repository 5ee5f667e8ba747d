use thiserror::Error;
use tokio::task::JoinError;

pub type GarageResult<T> = Result<T, GarageError>;

#[derive(Debug, Error)]
pub enum GarageError {
  #[error(transparent)]
  #[cfg(feature = "arm")]
  Gpio(#[from] rppal::gpio::Error),
  #[cfg(not(feature = "arm"))]
  #[error(transparent)]
  Gpio(#[from] crate::mock_gpio::Error),
  #[error("invalid configuration: {0}")]
  Config(#[from] config::ConfigError),
  #[error("failed to read .env: {0}")]
  Dotenv(#[from] dotenvy::Error),
  #[error("invalid cron expression {expression:?} for {name}: {source}")]
  InvalidCron {
    name: &'static str,
    expression: String,
    source: cron::error::Error,
  },
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("failed to deliver webhook: {0}")]
  Webhook(#[from] reqwest::Error),
  #[error("temperature sensor {sensor} returned an unusable reading: {reason}")]
  TemperatureReading { sensor: String, reason: &'static str },
  #[error(transparent)]
  JoinError(#[from] JoinError),
}

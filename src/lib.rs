pub mod config;
pub mod door;
pub mod error;
pub mod http;
#[cfg(not(feature = "arm"))]
mod mock_gpio;
pub mod notifier;
pub mod schedule;
pub mod service;
pub mod temperature;

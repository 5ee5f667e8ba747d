//! DS18B20 temperature probes on the kernel's 1-wire bus

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use serde::Serialize;

use crate::error::{GarageError, GarageResult};

/// The IDs of every probe the bus master currently sees
pub fn sensor_ids(w1_devices_dir: &Path) -> GarageResult<Vec<String>> {
  let slaves = fs::read_to_string(w1_devices_dir.join("w1_bus_master1").join("w1_master_slaves"))?;
  Ok(
    slaves
      .lines()
      .map(str::trim)
      .filter(|id| !id.is_empty() && *id != "not found.")
      .map(str::to_string)
      .collect(),
  )
}

/// Parse the contents of a probe's `w1_slave` file, e.g.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(sensor: &str, contents: &str) -> GarageResult<f64> {
  let reading_error = |reason| GarageError::TemperatureReading {
    sensor: sensor.to_string(),
    reason,
  };

  let mut lines = contents.lines();
  let crc = lines.next().ok_or_else(|| reading_error("empty reading"))?;
  if !crc.trim_end().ends_with("YES") {
    return Err(reading_error("CRC check failed"));
  }

  let millidegrees = lines
    .next()
    .and_then(|line| line.split("t=").nth(1))
    .ok_or_else(|| reading_error("missing temperature"))?
    .trim()
    .parse::<i64>()
    .map_err(|_| reading_error("temperature is not a number"))?;

  Ok(millidegrees as f64 / 1000.0)
}

pub fn read_celsius(w1_devices_dir: &Path, sensor: &str) -> GarageResult<f64> {
  let path: PathBuf = w1_devices_dir.join(sensor).join("w1_slave");
  parse_w1_slave(sensor, &fs::read_to_string(path)?)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
  (celsius * 9.0 / 5.0) + 32.0
}

/// Fahrenheit readings keyed by probe ID, formatted to two decimal places
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SensorResponse {
  pub sensors: BTreeMap<String, String>,
}

/// Read every probe. Any single failure fails the whole read.
pub fn read_all(w1_devices_dir: &Path) -> GarageResult<SensorResponse> {
  let mut response = SensorResponse::default();
  for sensor in sensor_ids(w1_devices_dir)? {
    let fahrenheit = celsius_to_fahrenheit(read_celsius(w1_devices_dir, &sensor)?);
    log::debug!("sensor: {sensor} temperature: {fahrenheit:.2} F");
    response.sensors.insert(sensor, format!("{fahrenheit:.2}"));
  }
  Ok(response)
}

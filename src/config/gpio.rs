use std::fmt;

use serde::Deserialize;

/// A GPIO pin by its BCM number (the numbering rppal uses).
/// See: https://pinout.xyz/
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "u8")]
pub struct GpioPin(u8);

impl GpioPin {
  /// The Raspberry Pi header exposes BCM 0 through 27
  pub const MAX_BCM: u8 = 27;

  pub fn bcm_number(&self) -> u8 {
    self.0
  }
}

impl TryFrom<u8> for GpioPin {
  type Error = String;

  fn try_from(bcm: u8) -> Result<Self, Self::Error> {
    if bcm <= GpioPin::MAX_BCM {
      Ok(GpioPin(bcm))
    }
    else {
      Err(format!("GPIO{bcm} is not on the header (expected 0-{})", GpioPin::MAX_BCM))
    }
  }
}

impl fmt::Display for GpioPin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "GPIO{}", self.0)
  }
}

/// Wiring of the motor driver and the two hall effect sensors
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GpioConfig {
  /// Driven high to run the motor upwards
  pub raise_pin: GpioPin,
  /// Driven high to run the motor downwards
  pub lower_pin: GpioPin,
  /// Pulled low when the door is fully closed
  pub closed_sensor_pin: GpioPin,
  /// Pulled low when the door is fully open
  pub open_sensor_pin: GpioPin,
}

impl Default for GpioConfig {
  fn default() -> Self {
    GpioConfig {
      raise_pin: GpioPin(26),
      lower_pin: GpioPin(19),
      closed_sensor_pin: GpioPin(6),
      open_sensor_pin: GpioPin(13),
    }
  }
}

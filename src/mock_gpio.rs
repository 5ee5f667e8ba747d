//! Mimics rppal's API without the need to compile to ARM and use physical hardware
//!
//! Input levels are read from `<bcm>.pin` files in the working directory (`0` or `1`), a missing file reads as high
//! (i.e. the pull-up with nothing attached). Output levels are only logged.

use std::fs;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("mock GPIO pin {0} is not a valid BCM pin")]
pub struct Error(u8);

pub struct Gpio;

impl Gpio {
  pub fn new() -> Result<Gpio, Error> {
    Ok(Gpio)
  }

  pub fn get(&self, pin: u8) -> Result<Pin, Error> {
    if pin > 27 {
      return Err(Error(pin));
    }
    Ok(Pin(pin))
  }
}

#[derive(Debug)]
pub struct Pin(u8);

impl Pin {
  pub fn into_output(self) -> OutputPin {
    OutputPin(self.0)
  }

  pub fn into_input_pullup(self) -> InputPin {
    InputPin(self.0)
  }
}

#[derive(Debug)]
pub struct OutputPin(u8);

impl OutputPin {
  pub fn set_high(&mut self) {
    log::trace!("GPIO{} set to high", self.0)
  }

  pub fn set_low(&mut self) {
    log::trace!("GPIO{} set to low", self.0)
  }
}

#[derive(Debug)]
pub struct InputPin(u8);

impl InputPin {
  pub fn is_low(&self) -> bool {
    fs::read_to_string(format!("{}.pin", self.0))
      .ok()
      .map(|value| value.trim() == "0")
      .unwrap_or(false)
  }
}

#[cfg(feature = "arm")]
use rppal::gpio::{Gpio, InputPin, OutputPin};

use super::DoorGateway;
#[cfg(not(feature = "arm"))]
use crate::mock_gpio::{Gpio, InputPin, OutputPin};
use crate::{config::gpio::GpioConfig, error::GarageResult};

/// A door wired straight to the Raspberry Pi's header.
///
/// The hall effect sensors pull their input low when the magnet is in front of them.
///
/// Dropping the gateway stops the motor, after which rppal returns the pins to the mode they were in before we
/// claimed them.
#[derive(Debug)]
pub struct GpioGateway {
  raise_pin: OutputPin,
  lower_pin: OutputPin,
  closed_sensor: InputPin,
  open_sensor: InputPin,
}

impl GpioGateway {
  pub fn new(config: &GpioConfig) -> GarageResult<Self> {
    let gpio = Gpio::new()?;
    let mut raise_pin = gpio.get(config.raise_pin.bcm_number())?.into_output();
    raise_pin.set_low();
    let mut lower_pin = gpio.get(config.lower_pin.bcm_number())?.into_output();
    lower_pin.set_low();
    let closed_sensor = gpio.get(config.closed_sensor_pin.bcm_number())?.into_input_pullup();
    let open_sensor = gpio.get(config.open_sensor_pin.bcm_number())?.into_input_pullup();

    log::debug!(
      "Motor on {} (raise) / {} (lower), sensors on {} (closed) / {} (open)",
      config.raise_pin,
      config.lower_pin,
      config.closed_sensor_pin,
      config.open_sensor_pin
    );

    Ok(GpioGateway {
      raise_pin,
      lower_pin,
      closed_sensor,
      open_sensor,
    })
  }
}

impl DoorGateway for GpioGateway {
  fn is_closed(&mut self) -> GarageResult<bool> {
    Ok(self.closed_sensor.is_low())
  }

  fn is_open(&mut self) -> GarageResult<bool> {
    Ok(self.open_sensor.is_low())
  }

  // the opposite channel always goes low first so both are never high together

  fn raise(&mut self) -> GarageResult<()> {
    self.lower_pin.set_low();
    self.raise_pin.set_high();
    Ok(())
  }

  fn lower(&mut self) -> GarageResult<()> {
    self.raise_pin.set_low();
    self.lower_pin.set_high();
    Ok(())
  }

  fn stop(&mut self) -> GarageResult<()> {
    self.raise_pin.set_low();
    self.lower_pin.set_low();
    Ok(())
  }
}

impl Drop for GpioGateway {
  fn drop(&mut self) {
    self.raise_pin.set_low();
    self.lower_pin.set_low();
    log::debug!("Motor pins released");
  }
}

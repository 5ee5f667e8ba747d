use std::fmt::Debug;

use super::state::TargetState;
use crate::error::GarageResult;

pub mod gpio;

/// The hardware boundary of a door: two end stop sensors and a two channel motor driver.
///
/// Sensor reads are single, unfiltered samples. Any error is fatal to the control loop, a door must never be left
/// moving with a failure swallowed.
pub trait DoorGateway: Debug + Send {
  /// True if the lower sensor sees the door in the closed position
  fn is_closed(&mut self) -> GarageResult<bool>;

  /// True if the upper sensor sees the door in the open position
  fn is_open(&mut self) -> GarageResult<bool>;

  /// Run the motor upwards (raise = 1, lower = 0)
  fn raise(&mut self) -> GarageResult<()>;

  /// Run the motor downwards (raise = 0, lower = 1)
  fn lower(&mut self) -> GarageResult<()>;

  /// Stop the motor (raise = 0, lower = 0)
  fn stop(&mut self) -> GarageResult<()>;

  /// True if the sensor for `target_state` sees the door there
  fn is_at(&mut self, target_state: TargetState) -> GarageResult<bool> {
    match target_state {
      TargetState::Open => self.is_open(),
      TargetState::Closed => self.is_closed(),
    }
  }

  /// Run the motor towards `target_state`
  fn drive_towards(&mut self, target_state: TargetState) -> GarageResult<()> {
    match target_state {
      TargetState::Open => self.raise(),
      TargetState::Closed => self.lower(),
    }
  }
}

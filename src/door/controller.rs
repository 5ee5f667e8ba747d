use std::{fmt, time::Duration};

use tokio::{
  select,
  sync::watch,
  time::{self, Instant, MissedTickBehavior},
};

use super::{
  gateway::DoorGateway,
  state::{State, TargetState, Travel},
  Door,
};
use crate::{error::GarageResult, notifier::Notice};

/// Sample both sensors to work out where the door is before anything starts moving it
pub fn initial_state<G: DoorGateway>(gateway: &mut G) -> GarageResult<State> {
  let is_closed = gateway.is_closed()?;
  let is_open = gateway.is_open()?;
  let state = State::from_sensors(is_closed, is_open);
  log::debug!("Sensors read closed: {is_closed}, open: {is_open}, so the door is {:?}", state.kind());
  Ok(state)
}

/// Drives the motor to match the door's state. The only thing that ever touches the motor.
#[derive(Debug)]
pub struct DoorController<G: DoorGateway> {
  gateway: G,
  door: Door,
  stuck_after: Duration,
  tick: Duration,
}

impl<G: DoorGateway> fmt::Display for DoorController<G> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "DoorController ({:?})", self.door.state().kind())
  }
}

impl<G: DoorGateway> DoorController<G> {
  pub fn new(gateway: G, door: Door, stuck_after: Duration, tick: Duration) -> Self {
    DoorController {
      gateway,
      door,
      stuck_after,
      tick,
    }
  }

  /// Evaluate the door once
  pub fn tick(&mut self, now: Instant) -> GarageResult<()> {
    let state = self.door.state();
    match state {
      State::Opening(travel) => self.travel(state, travel, TargetState::Open, now),
      State::Closing(travel) => self.travel(state, travel, TargetState::Closed, now),
      // the motor was stopped by whatever moved us in to these states
      State::Closed | State::Open | State::Stuck => Ok(()),
    }
  }

  fn travel(&mut self, state: State, travel: Travel, target_state: TargetState, now: Instant) -> GarageResult<()> {
    // reaching the target wins over timing out on the same tick
    if self.gateway.is_at(target_state)? {
      if self.door.settle(&state, target_state.into()) {
        self.gateway.stop()?;
        self.door.notifier().notify(Notice::arrived_at(target_state));
      }
    }
    else if travel.elapsed_secs(now) > self.stuck_after.as_secs() {
      if self.door.settle(&state, State::Stuck) {
        self.gateway.stop()?;
        self.door.notifier().notify(Notice::Stuck);
      }
    }
    else {
      // re-asserted every tick so a missed command corrects itself
      self.gateway.drive_towards(target_state)?;
    }

    Ok(())
  }

  /// Tick until `shutdown` fires (or its sender is dropped), then stop the motor and hand back the gateway.
  ///
  /// A gateway error ends the loop; the motor is stopped on a best effort basis before the error is returned.
  pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> GarageResult<G> {
    log::info!("{} running, ticking every {:?}", &self, self.tick);
    let mut interval = time::interval(self.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      select! {
        _ = interval.tick() => {
          if let Err(err) = self.tick(Instant::now()) {
            log::error!("{} gateway failed: {}", &self, err);
            if let Err(stop_err) = self.gateway.stop() {
              log::error!("{} failed to stop the motor: {}", &self, stop_err);
            }
            return Err(err);
          }
        }
        _ = shutdown.changed() => break,
      }
    }

    log::info!("{} shutting down, stopping motor", &self);
    self.gateway.stop()?;
    Ok(self.gateway)
  }
}

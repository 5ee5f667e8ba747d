use std::fmt;

use tokio::time::Instant;

/// The state the door is trying to get to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
  Open,
  Closed,
}

impl fmt::Display for TargetState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TargetState::Open => write!(f, "open"),
      TargetState::Closed => write!(f, "closed"),
    }
  }
}

/// Represents a door travel in progress, i.e. the motor should be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Travel {
  started: Instant,
}

impl Travel {
  pub fn started_at(started: Instant) -> Self {
    Travel { started }
  }

  pub fn started(&self) -> Instant {
    self.started
  }

  /// Whole seconds spent travelling as of `now`
  pub fn elapsed_secs(&self, now: Instant) -> u64 {
    now.saturating_duration_since(self.started).as_secs()
  }
}

/// The door's state. Only travelling states know when they started, so a timestamp can never be observed without
/// a travel (or vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Closed,
  Opening(Travel),
  Open,
  Closing(Travel),
  /// Didn't reach its target in time, or we couldn't tell where it was at startup
  Stuck,
}

/// The kind of [`State`] without any travel details
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
  Closed,
  Opening,
  Open,
  Closing,
  Stuck,
}

impl fmt::Display for DoorState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DoorState::Closed => write!(f, "Closed"),
      DoorState::Opening => write!(f, "Opening"),
      DoorState::Open => write!(f, "Open"),
      DoorState::Closing => write!(f, "Closing"),
      DoorState::Stuck => write!(f, "Stuck"),
    }
  }
}

impl From<TargetState> for State {
  fn from(target_state: TargetState) -> Self {
    match target_state {
      TargetState::Open => State::Open,
      TargetState::Closed => State::Closed,
    }
  }
}

impl State {
  /// The state a door is in once it starts travelling towards `target_state` at `now`
  pub fn travelling_to(target_state: TargetState, now: Instant) -> Self {
    let travel = Travel::started_at(now);
    match target_state {
      TargetState::Open => State::Opening(travel),
      TargetState::Closed => State::Closing(travel),
    }
  }

  /// Derive the state from a single reading of both end stop sensors.
  ///
  /// Neither sensor means the door stopped somewhere in between (e.g. power was cut mid travel). Both sensors is
  /// contradictory, so we can't trust either.
  pub fn from_sensors(is_closed: bool, is_open: bool) -> Self {
    match (is_closed, is_open) {
      (false, true) => State::Open,
      (true, false) => State::Closed,
      (false, false) | (true, true) => State::Stuck,
    }
  }

  pub fn kind(&self) -> DoorState {
    match self {
      State::Closed => DoorState::Closed,
      State::Opening(_) => DoorState::Opening,
      State::Open => DoorState::Open,
      State::Closing(_) => DoorState::Closing,
      State::Stuck => DoorState::Stuck,
    }
  }

  pub fn travel(&self) -> Option<&Travel> {
    match self {
      State::Opening(travel) | State::Closing(travel) => Some(travel),
      _ => None,
    }
  }

  pub fn status_at(&self, now: Instant) -> Status {
    Status {
      state: self.kind(),
      elapsed_secs: self.travel().map(|travel| travel.elapsed_secs(now)),
    }
  }
}

/// A human readable snapshot of the door, e.g. `Closing (7 seconds)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
  pub state: DoorState,
  pub elapsed_secs: Option<u64>,
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.elapsed_secs {
      Some(elapsed) => write!(f, "{} ({} seconds)", self.state, elapsed),
      None => write!(f, "{}", self.state),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn initial_state_from_sensors() {
    assert_eq!(State::from_sensors(true, false), State::Closed);
    assert_eq!(State::from_sensors(false, true), State::Open);
    assert_eq!(State::from_sensors(false, false), State::Stuck);
    assert_eq!(State::from_sensors(true, true), State::Stuck);

    for (is_closed, is_open) in [(true, false), (false, true), (false, false), (true, true)] {
      assert!(State::from_sensors(is_closed, is_open).travel().is_none());
    }
  }

  #[test]
  fn only_travelling_states_have_a_start() {
    let now = Instant::now();
    for state in [
      State::Closed,
      State::Open,
      State::Stuck,
      State::travelling_to(TargetState::Open, now),
      State::travelling_to(TargetState::Closed, now),
    ] {
      let travelling = matches!(state.kind(), DoorState::Opening | DoorState::Closing);
      assert_eq!(state.travel().is_some(), travelling, "{state:?}");
    }
  }

  #[test]
  fn elapsed_is_truncated() {
    let start = Instant::now();
    let travel = Travel::started_at(start);

    assert_eq!(travel.elapsed_secs(start), 0);
    assert_eq!(travel.elapsed_secs(start + Duration::from_millis(7_999)), 7);
    // a `now` from before the start (racing trigger) counts as no time at all
    assert_eq!(Travel::started_at(start + Duration::from_secs(1)).elapsed_secs(start), 0);
  }

  #[test]
  fn status_text() {
    let start = Instant::now();
    let later = start + Duration::from_secs(7);

    assert_eq!(State::Closed.status_at(later).to_string(), "Closed");
    assert_eq!(State::Open.status_at(later).to_string(), "Open");
    assert_eq!(State::Stuck.status_at(later).to_string(), "Stuck");
    assert_eq!(
      State::travelling_to(TargetState::Closed, start).status_at(later).to_string(),
      "Closing (7 seconds)"
    );
    assert_eq!(
      State::travelling_to(TargetState::Open, start).status_at(later).to_string(),
      "Opening (7 seconds)"
    );
  }
}

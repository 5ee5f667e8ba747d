use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

pub use self::{
  controller::DoorController,
  gateway::DoorGateway,
  state::{DoorState, State, Status, TargetState},
};
use crate::notifier::{Notice, Notifier};

pub mod controller;
pub mod gateway;
pub mod state;

/// The shared handle to the door's state.
///
/// Cloned into every HTTP handler, cron task and the control loop. Every write replaces the whole [`State`], so a
/// state and its travel start are always seen together. The lock is never held across I/O or an await.
#[derive(Debug, Clone)]
pub struct Door {
  state: Arc<Mutex<State>>,
  notifier: Notifier,
}

impl Door {
  pub fn new(initial_state: State, notifier: Notifier) -> Self {
    Door {
      state: Arc::new(Mutex::new(initial_state)),
      notifier,
    }
  }

  /// Start travelling towards `target_state`, whatever the door is doing now.
  ///
  /// Only the state changes here; the control loop picks it up on its next tick and drives the motor. Requesting
  /// the same target again restarts the travel's clock, requesting the opposite one reverses the door.
  ///
  /// Requests are logged but not sent to the notification sink, only where the door ends up is.
  pub fn request(&self, target_state: TargetState) {
    let state = State::travelling_to(target_state, Instant::now());
    let previous = std::mem::replace(&mut *self.state.lock(), state);
    log::debug!("Requested {target_state} while {:?}", previous.kind());
    log::info!("{}", Notice::started_towards(target_state));
  }

  pub fn request_open(&self) {
    self.request(TargetState::Open)
  }

  pub fn request_close(&self) {
    self.request(TargetState::Closed)
  }

  /// A copy of the current state
  pub fn state(&self) -> State {
    *self.state.lock()
  }

  pub fn status(&self) -> Status {
    self.state().status_at(Instant::now())
  }

  /// Replace the state with `to`, but only if it's still exactly `from`.
  ///
  /// Returns false if someone else (i.e. a request) changed the state in the mean time, in which case nothing is
  /// written.
  pub(crate) fn settle(&self, from: &State, to: State) -> bool {
    let mut state = self.state.lock();
    if *state == *from {
      *state = to;
      true
    }
    else {
      false
    }
  }

  pub fn notifier(&self) -> &Notifier {
    &self.notifier
  }
}

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::{select, sync::watch, task::JoinHandle, time};

use crate::{
  config::Config,
  door::{Door, TargetState},
};

/// Moves the door towards `target_state` whenever `schedule` fires
#[derive(Debug, Clone)]
pub struct CronTrigger {
  pub schedule: Schedule,
  pub target_state: TargetState,
}

impl CronTrigger {
  /// The automatic open/close triggers that have been configured
  pub fn from_config(config: &Config) -> Vec<CronTrigger> {
    [
      (config.auto_open.clone(), TargetState::Open),
      (config.auto_close.clone(), TargetState::Closed),
    ]
    .into_iter()
    .filter_map(|(schedule, target_state)| schedule.map(|schedule| CronTrigger { schedule, target_state }))
    .collect()
  }

  /// The first firing strictly after `after`, evaluated in `after`'s timezone
  pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Utc>> {
    self.schedule.after(after).next().map(|next| next.with_timezone(&Utc))
  }

  fn next_in(&self, after: DateTime<Utc>, timezone: Option<Tz>) -> Option<DateTime<Utc>> {
    match timezone {
      Some(timezone) => self.next_after(&after.with_timezone(&timezone)),
      None => self.next_after(&after.with_timezone(&Local)),
    }
  }

  /// Fire on schedule until `shutdown` fires or the schedule runs out
  pub async fn run(self, door: Door, timezone: Option<Tz>, mut shutdown: watch::Receiver<bool>) {
    // never earlier than the last firing, in case we woke up a touch before the wall clock got there
    let mut cursor = Utc::now();

    loop {
      cursor = cursor.max(Utc::now());
      let Some(next) = self.next_in(cursor, timezone) else {
        log::warn!("Cron schedule for {} has no further occurrences", self.target_state);
        return;
      };
      log::debug!("Next automatic {} at {}", self.target_state, next);
      let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

      select! {
        _ = time::sleep(delay) => {
          log::info!("Cron fired, moving door to {}", self.target_state);
          door.request(self.target_state);
          cursor = next;
        }
        _ = shutdown.changed() => return,
      }
    }
  }
}

/// Spawn a task for each trigger
pub fn spawn(
  triggers: Vec<CronTrigger>,
  door: &Door,
  timezone: Option<Tz>,
  shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
  triggers
    .into_iter()
    .map(|trigger| {
      let action = match trigger.target_state {
        TargetState::Open => "open",
        TargetState::Closed => "close",
      };
      log::info!("Added handler for auto-{action} cron");
      tokio::spawn(trigger.run(door.clone(), timezone, shutdown.clone()))
    })
    .collect()
}

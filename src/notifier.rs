use std::fmt;

use reqwest::Client;
use serde_json::json;
use tokio::{
  sync::mpsc::{self, error::TrySendError},
  task::JoinHandle,
};

use crate::{door::state::TargetState, error::GarageResult};

/// Something worth telling a human about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
  Raising,
  Lowering,
  FullyOpen,
  FullyClosed,
  Stuck,
}

impl Notice {
  pub fn started_towards(target_state: TargetState) -> Self {
    match target_state {
      TargetState::Open => Notice::Raising,
      TargetState::Closed => Notice::Lowering,
    }
  }

  pub fn arrived_at(target_state: TargetState) -> Self {
    match target_state {
      TargetState::Open => Notice::FullyOpen,
      TargetState::Closed => Notice::FullyClosed,
    }
  }
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Notice::Raising => write!(f, "Raising door."),
      Notice::Lowering => write!(f, "Lowering door."),
      Notice::FullyOpen => write!(f, "Door is fully open."),
      Notice::FullyClosed => write!(f, "Door is fully closed."),
      Notice::Stuck => write!(f, "Door is stuck!"),
    }
  }
}

/// A cheap handle for emitting notices without waiting on their delivery.
///
/// Notices are always logged. If a sink is attached they're also queued for it; when the queue is full (or the sink
/// has gone away) the notice is dropped rather than holding up the caller.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: Option<mpsc::Sender<Notice>>,
}

impl Notifier {
  /// Only log notices
  pub fn disabled() -> Self {
    Notifier { tx: None }
  }

  /// A notifier and the receiving end of its queue
  pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Notifier { tx: Some(tx) }, rx)
  }

  pub fn notify(&self, notice: Notice) {
    match notice {
      Notice::Stuck => log::warn!("{notice}"),
      _ => log::info!("{notice}"),
    }

    if let Some(tx) = &self.tx {
      match tx.try_send(notice) {
        Ok(()) => {}
        Err(TrySendError::Full(notice)) => log::warn!("Notification queue full, dropping {notice:?}"),
        Err(TrySendError::Closed(notice)) => log::warn!("Notification sink gone, dropping {notice:?}"),
      }
    }
  }
}

/// Posts notices to a Discord channel webhook
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
  client: Client,
  url: String,
}

impl DiscordWebhook {
  pub fn new(url: String) -> Self {
    DiscordWebhook {
      client: Client::new(),
      url,
    }
  }

  pub async fn send(&self, content: &str) -> GarageResult<()> {
    self
      .client
      .post(&self.url)
      .json(&json!({ "content": content }))
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }

  /// Deliver notices until every [`Notifier`] has been dropped. Failures are logged and skipped.
  pub async fn deliver(self, mut rx: mpsc::Receiver<Notice>) {
    while let Some(notice) = rx.recv().await {
      match self.send(&notice.to_string()).await {
        Ok(()) => log::debug!("Delivered {notice:?} to Discord"),
        Err(err) => log::error!("Failed to deliver {notice:?} to Discord: {err}"),
      }
    }
    log::debug!("Notification queue closed");
  }
}

/// Build the process' notifier, spawning the webhook delivery task if a URL is configured
pub fn spawn(webhook_url: Option<String>, capacity: usize) -> (Notifier, Option<JoinHandle<()>>) {
  match webhook_url {
    Some(url) => {
      let (notifier, rx) = Notifier::channel(capacity);
      let task = tokio::spawn(DiscordWebhook::new(url).deliver(rx));
      (notifier, Some(task))
    }
    None => {
      log::info!("No Discord webhook configured, notifications will only be logged");
      (Notifier::disabled(), None)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn notice_text() {
    assert_eq!(Notice::started_towards(TargetState::Open).to_string(), "Raising door.");
    assert_eq!(Notice::started_towards(TargetState::Closed).to_string(), "Lowering door.");
    assert_eq!(Notice::arrived_at(TargetState::Open).to_string(), "Door is fully open.");
    assert_eq!(Notice::arrived_at(TargetState::Closed).to_string(), "Door is fully closed.");
    assert_eq!(Notice::Stuck.to_string(), "Door is stuck!");
  }

  #[tokio::test]
  async fn drops_notices_when_full() {
    let (notifier, mut rx) = Notifier::channel(1);
    notifier.notify(Notice::Raising);
    notifier.notify(Notice::FullyOpen);

    assert_eq!(rx.recv().await, Some(Notice::Raising));
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn tolerates_closed_sink() {
    let (notifier, rx) = Notifier::channel(4);
    drop(rx);
    notifier.notify(Notice::Stuck);
    Notifier::disabled().notify(Notice::Stuck);
  }

  #[tokio::test]
  async fn webhook_failures_do_not_stop_delivery() {
    // nothing listens on the discard port, every send fails
    let webhook = DiscordWebhook::new("http://127.0.0.1:9/webhook".to_string());
    let (notifier, rx) = Notifier::channel(4);
    notifier.notify(Notice::Lowering);
    notifier.notify(Notice::FullyClosed);
    drop(notifier);

    webhook.deliver(rx).await;
  }
}

use std::net::SocketAddr;

use axum::{extract::State, routing::get, Router};
use tokio::{net::TcpListener, sync::watch};

use crate::{door::Door, error::GarageResult};

pub fn router(door: Door) -> Router {
  Router::new()
    .route("/open", get(open).post(open))
    .route("/close", get(close).post(close))
    .route("/status", get(status))
    .with_state(door)
}

/// Responds straight away, the door starts moving on the control loop's next tick
async fn open(State(door): State<Door>) -> &'static str {
  door.request_open();
  "Requesting door open."
}

async fn close(State(door): State<Door>) -> &'static str {
  door.request_close();
  "Requesting door close."
}

async fn status(State(door): State<Door>) -> String {
  door.status().to_string()
}

/// Serve the door's endpoints until `shutdown` fires
pub async fn serve(address: SocketAddr, door: Door, mut shutdown: watch::Receiver<bool>) -> GarageResult<()> {
  let listener = TcpListener::bind(address).await?;
  log::info!("Listening on http://{}", listener.local_addr()?);

  axum::serve(listener, router(door))
    .with_graceful_shutdown(async move {
      // a dropped sender means we're going down too
      let _ = shutdown.changed().await;
    })
    .await?;

  log::info!("HTTP server stopped");
  Ok(())
}

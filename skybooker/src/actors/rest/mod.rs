mod bookings;
mod error;
mod flights;

use std::{net::SocketAddr, time::Duration};

use actman::Control;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tokio::{sync::oneshot, task::JoinHandle};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

pub use crate::actors::rest::error::Error;
use crate::{
    actors::{
        rest::error::{ApiFailure, Operation},
        store::StoreHandle,
    },
    api::{self, Counts},
};

pub struct Actor {
    local_addr: SocketAddr,
    server_join_handle: JoinHandle<()>,
    shutdown_sender: oneshot::Sender<()>,
}

#[async_trait::async_trait]
impl actman::Actor for Actor {
    type Message = ();

    async fn run(mut self, mut state: actman::State<Self>) {
        loop {
            tokio::select! {
                Some(()) = state.message_receiver.recv() => {}
                Some(ctrl) = state.control_receiver.recv() => {
                    match ctrl {
                        Control::Shutdown => {
                            info!("REST actor received shutdown control.");
                            break;
                        },
                    }
                }
                else => {
                    warn!("All channels closed, terminating REST actor.");
                    break;
                }
            }
        }

        self.shutdown().await;
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct ServerState {
    store: StoreHandle,
}

/// Routes of the inventory and booking API.
pub fn router(store: StoreHandle) -> Router {
    Router::new()
        .route("/flights", get(flights::list).post(flights::create))
        .route(
            "/flights/{id}",
            get(flights::show)
                .put(flights::update)
                .delete(flights::delete),
        )
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/status", get(status))
        .layer(
            // Necessary for graceful shutdown
            timeout_layer(REQUEST_TIMEOUT),
        )
        .with_state(ServerState { store })
}

/// Answers `408 Request Timeout` for requests still running after `timeout`.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

impl Actor {
    pub async fn new(config: &Config, store: StoreHandle) -> Result<Self, Error> {
        let listener = tokio::net::TcpListener::bind(config.addr)
            .await
            .map_err(|cause| Error::IO {
                message: format!("Failed to listen on {}", config.addr),
                cause,
            })?;
        let local_addr = listener.local_addr().map_err(|cause| Error::IO {
            message: "Failed to read local address".to_string(),
            cause,
        })?;
        let router = router(store);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let server_join_handle = tokio::spawn(async move {
            info!("starting REST server: {local_addr}");
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(shutdown_receiver))
                .await
            {
                error!("REST server failed: {e}");
            }
        });

        Ok(Self {
            local_addr,
            server_join_handle,
            shutdown_sender,
        })
    }

    /// The address the server is bound to, with the actual port when the
    /// configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn shutdown(self) {
        // Send shutdown signal to the axum server
        if self.shutdown_sender.send(()).is_err() {
            warn!("REST server already stopped");
        }
        // Wait until the axum server task is terminated
        if let Err(e) = self.server_join_handle.await {
            error!("REST server task failed: {e}");
        }
        info!("REST server has been shut down.");
    }
}

/// A future to be passed to the [`axum::serve::Serve::with_graceful_shutdown`].
/// When this future resolves, the axum server will start graceful shutdown.
async fn shutdown_signal(shutdown_receiver: oneshot::Receiver<()>) {
    let _ = shutdown_receiver.await;
    info!("starting graceful shutdown for REST server...");
}

async fn status(State(state): State<ServerState>) -> Result<Json<Counts>, ApiFailure> {
    api::counts(&state.store)
        .await
        .map(Json)
        .map_err(|e| ApiFailure::new(Operation::Status, e))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

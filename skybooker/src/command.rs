use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::error;

use crate::{
    actors::store::StoreHandle,
    api::{self, Counts},
};

#[derive(Debug)]
pub enum Command {
    Status {
        reply_sender: oneshot::Sender<Result<Status, api::Error>>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Address of the REST server, if one is running.
    pub rest_addr: Option<SocketAddr>,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Handles a command and returns `true` if the runtime should shut down.
pub(crate) async fn handle_command(
    command: Command,
    store: &StoreHandle,
    rest_addr: Option<SocketAddr>,
) -> bool {
    match command {
        Command::Status { reply_sender } => {
            handle_status_command(reply_sender, store, rest_addr).await;
        }
        Command::Shutdown => {
            // Should shutdown
            return true;
        }
    }

    // Should not shutdown
    false
}

async fn handle_status_command(
    reply_sender: oneshot::Sender<Result<Status, api::Error>>,
    store: &StoreHandle,
    rest_addr: Option<SocketAddr>,
) {
    let status = api::counts(store)
        .await
        .map(|counts| Status { rest_addr, counts })
        .inspect_err(|e| error!("Failed to collect status: {e}"));
    let _ = reply_sender
        .send(status)
        .inspect_err(|_| error!("Failed to send status reply"));
}

use actman::Runner;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

#[cfg(feature = "rest")]
use crate::actors::rest;
#[cfg(feature = "rest")]
pub use crate::actors::rest::{Config as RestConfig, router};
use crate::command::handle_command;
pub use crate::{
    actors::store::{self, Config as StoreConfig, StoreHandle},
    command::{Command, Status},
    config::Config,
};

mod actors;
pub mod api;
#[cfg(feature = "client")]
pub mod client;
mod command;
mod config;
pub mod doc;

const COMMAND_CHANNEL_SIZE: usize = 100;

/// The service runtime: a store actor and, with the `rest` feature, the REST
/// server in front of it.
pub struct Skybooker {
    config: Config,
    command_receiver: mpsc::Receiver<Command>,
}

impl Skybooker {
    pub fn new(config: Config) -> Result<(Self, mpsc::Sender<Command>), Error> {
        config.validate()?;
        let (command_sender, command_receiver) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        Ok((
            Self {
                config,
                command_receiver,
            },
            command_sender,
        ))
    }

    /// Starts the actors, reports readiness through `ready_sender`, and then
    /// serves commands until [`Command::Shutdown`] or until every command
    /// sender is dropped.
    pub async fn run(mut self, ready_sender: oneshot::Sender<Result<(), Error>>) {
        info!("Skybooker is running...");

        let mut runner = Runner::new();

        let store_actor = match store::Actor::new(self.config.store.clone()).await {
            Ok(actor) => actor,
            Err(e) => {
                error!("Failed to create store actor: {e:?}");
                let _ = ready_sender.send(Err(e.into()));
                return;
            }
        };
        let store = StoreHandle::new(runner.run(store_actor));

        #[cfg(feature = "rest")]
        let rest_addr = match rest::Actor::new(&self.config.rest, store.clone()).await {
            Ok(actor) => {
                let addr = actor.local_addr();
                runner.run(actor);
                Some(addr)
            }
            Err(e) => {
                error!("Failed to create REST actor: {e:?}");
                runner.shutdown().await;
                let _ = ready_sender.send(Err(e.into()));
                return;
            }
        };
        #[cfg(not(feature = "rest"))]
        let rest_addr = None;

        if ready_sender.send(Ok(())).is_err() {
            warn!("Ready signal receiver dropped");
        }

        while let Some(cmd) = self.command_receiver.recv().await {
            debug!("Command received: {:?}", cmd);
            if handle_command(cmd, &store, rest_addr).await {
                break;
            }
        }

        runner.shutdown().await;
        info!("Skybooker has been shut down.");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] store::Error),
    #[cfg(feature = "rest")]
    #[error("REST error: {0}")]
    Rest(#[from] rest::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use url::Url;

    use super::*;

    fn config(store: StoreConfig) -> Config {
        Config {
            store,
            #[cfg(feature = "rest")]
            rest: RestConfig::default(),
        }
    }

    #[test]
    fn unsupported_store_url_is_invalid_config() {
        let store = StoreConfig {
            url: Url::parse("redis://localhost:6379/0").unwrap(),
        };
        assert!(matches!(
            Skybooker::new(config(store)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn status_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let (skybooker, command_sender) =
            Skybooker::new(config(StoreConfig::directory(dir.path()).unwrap())).unwrap();
        let (ready_sender, ready_receiver) = oneshot::channel();
        let task = tokio::spawn(skybooker.run(ready_sender));
        ready_receiver.await.unwrap().unwrap();

        let (reply_sender, reply_receiver) = oneshot::channel();
        command_sender
            .send(Command::Status { reply_sender })
            .await
            .unwrap();
        let status = reply_receiver.await.unwrap().unwrap();
        assert_eq!(status.counts.flights, 0);
        assert_eq!(status.counts.bookings, 0);
        assert_eq!(status.rest_addr.is_some(), cfg!(feature = "rest"));

        command_sender.send(Command::Shutdown).await.unwrap();
        task.await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn unreadable_store_fails_readiness() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("flights.json"), "not json").unwrap();
        let (skybooker, _command_sender) =
            Skybooker::new(config(StoreConfig::directory(dir.path()).unwrap())).unwrap();
        let (ready_sender, ready_receiver) = oneshot::channel();
        tokio::spawn(skybooker.run(ready_sender));
        assert!(matches!(
            ready_receiver.await.unwrap(),
            Err(Error::Store(store::Error::Json { .. }))
        ));
    }

    #[cfg(feature = "mongodb")]
    #[test_log::test(tokio::test)]
    async fn unreachable_mongodb_fails_readiness() {
        let url = Url::parse("mongodb://127.0.0.1:1/skybooker?serverSelectionTimeoutMS=200").unwrap();
        let (skybooker, _command_sender) =
            Skybooker::new(config(StoreConfig::new(url).unwrap())).unwrap();
        let (ready_sender, ready_receiver) = oneshot::channel();
        tokio::spawn(skybooker.run(ready_sender));
        assert!(matches!(
            ready_receiver.await.unwrap(),
            Err(Error::Store(store::Error::MongoDb { .. }))
        ));
    }
}

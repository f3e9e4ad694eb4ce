mod config;
mod handle;
mod local;
pub mod message;
#[cfg(feature = "mongodb")]
mod mongo;

use std::{collections::BTreeMap, io};

use actman::Control;
use config::Location;
pub use config::Config;
pub use handle::StoreHandle;
use local::LocalStore;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::doc::{Collection, Document, DocumentId};
use message::{DeleteMessage, GetMessage, InsertMessage, ListMessage, Message, MergeMessage};

/// Draws of a unique value (or id) before an insert gives up.
const MAX_UNIQUE_ATTEMPTS: usize = 32;

/// Owns the store backend and serializes every request to it.
pub struct Actor {
    backend: Backend,
}

enum Backend {
    Local(LocalStore),
    #[cfg(feature = "mongodb")]
    MongoDb(mongo::MongoStore),
}

#[async_trait::async_trait]
impl actman::Actor for Actor {
    type Message = Message;

    async fn run(mut self, mut state: actman::State<Self>) {
        loop {
            tokio::select! {
                Some(message) = state.message_receiver.recv() => {
                    self.handle_message(message).await
                }
                Some(ctrl) = state.control_receiver.recv() => {
                    match ctrl {
                        Control::Shutdown => {
                            info!("Store actor received shutdown control.");
                            return;
                        },
                    }
                }
                else => {
                    warn!("All channels closed, terminating store actor.");
                    return;
                }
            }
        }
    }
}

impl Actor {
    /// Opens the configured backend, loading or connecting as needed.
    pub async fn new(config: Config) -> Result<Self, Error> {
        let backend = match config.location()? {
            Location::Memory => Backend::Local(LocalStore::memory()),
            Location::Directory(dir) => Backend::Local(LocalStore::open(dir)?),
            #[cfg(feature = "mongodb")]
            Location::MongoDb(url) => Backend::MongoDb(mongo::MongoStore::connect(&url).await?),
        };
        Ok(Self { backend })
    }

    async fn handle_message(&mut self, message: Message) {
        debug!("Handling store message: {message:?}");
        match message {
            Message::List { msg, reply_sender } => {
                self.handle_list_message(msg, reply_sender).await
            }
            Message::Insert { msg, reply_sender } => {
                self.handle_insert_message(msg, reply_sender).await
            }
            Message::Get { msg, reply_sender } => self.handle_get_message(msg, reply_sender).await,
            Message::Merge { msg, reply_sender } => {
                self.handle_merge_message(msg, reply_sender).await
            }
            Message::Delete { msg, reply_sender } => {
                self.handle_delete_message(msg, reply_sender).await
            }
            Message::Stats { reply_sender } => self.handle_stats(reply_sender).await,
        }
    }

    async fn handle_list_message(
        &self,
        ListMessage { collection }: ListMessage,
        reply_sender: oneshot::Sender<Result<Vec<Document>, Error>>,
    ) {
        let result = match &self.backend {
            Backend::Local(store) => Ok(store.list(&collection)),
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.list(&collection).await,
        };
        let _ = reply_sender
            .send(result.inspect_err(|e| error!("Failed to handle list message: {e:?}")))
            .inspect_err(|_| error!("Failed to send reply"));
    }

    async fn handle_insert_message(
        &mut self,
        msg: InsertMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    ) {
        let _ = reply_sender
            .send(
                self.handle_insert_message_inner(msg)
                    .await
                    .inspect_err(|e| error!("Failed to handle insert message: {e:?}")),
            )
            .inspect_err(|_| error!("Failed to send reply"));
    }

    async fn handle_insert_message_inner(
        &mut self,
        InsertMessage {
            collection,
            fields,
            unique,
        }: InsertMessage,
    ) -> Result<Document, Error> {
        let document = match &mut self.backend {
            Backend::Local(store) => store.insert(&collection, fields, unique)?,
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.insert(&collection, fields, unique).await?,
        };
        info!("Inserted document {} into {collection}", document.id);
        Ok(document)
    }

    async fn handle_get_message(
        &self,
        GetMessage { collection, id }: GetMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    ) {
        let result = match &self.backend {
            Backend::Local(store) => store.get(&collection, id),
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.get(&collection, id).await,
        };
        let _ = reply_sender
            .send(result.inspect_err(|e| warn!("Failed to handle get message: {e:?}")))
            .inspect_err(|_| error!("Failed to send reply"));
    }

    async fn handle_merge_message(
        &mut self,
        MergeMessage {
            collection,
            id,
            fields,
        }: MergeMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    ) {
        let result = match &mut self.backend {
            Backend::Local(store) => store.merge(&collection, id, fields),
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.merge(&collection, id, fields).await,
        };
        let _ = reply_sender
            .send(
                result
                    .inspect(|_| info!("Merged fields into document {id} of {collection}"))
                    .inspect_err(|e| error!("Failed to handle merge message: {e:?}")),
            )
            .inspect_err(|_| error!("Failed to send reply"));
    }

    async fn handle_delete_message(
        &mut self,
        DeleteMessage { collection, id }: DeleteMessage,
        reply_sender: oneshot::Sender<Result<(), Error>>,
    ) {
        let result = match &mut self.backend {
            Backend::Local(store) => store.delete(&collection, id),
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.delete(&collection, id).await,
        };
        let _ = reply_sender
            .send(
                result
                    .inspect(|_| info!("Deleted document {id} from {collection}"))
                    .inspect_err(|e| error!("Failed to handle delete message: {e:?}")),
            )
            .inspect_err(|_| error!("Failed to send reply"));
    }

    async fn handle_stats(
        &self,
        reply_sender: oneshot::Sender<Result<BTreeMap<Collection, usize>, Error>>,
    ) {
        let result = match &self.backend {
            Backend::Local(store) => Ok(store.stats()),
            #[cfg(feature = "mongodb")]
            Backend::MongoDb(store) => store.stats().await,
        };
        let _ = reply_sender
            .send(result.inspect_err(|e| error!("Failed to collect stats: {e:?}")))
            .inspect_err(|_| error!("Failed to send reply"));
    }
}

fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {message}: {cause}")]
    IO { message: String, cause: io::Error },
    #[error("Serde JSON error: {message}: {cause}")]
    Json {
        message: String,
        cause: serde_json::Error,
    },
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {message}: {cause}")]
    MongoDb {
        message: String,
        cause: mongodb::error::Error,
    },
    #[cfg(feature = "mongodb")]
    #[error("BSON error: {0}")]
    Bson(String),
    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound {
        collection: Collection,
        id: DocumentId,
    },
    #[error("No free value for {collection}.{field} after {MAX_UNIQUE_ATTEMPTS} draws")]
    UniqueValuesExhausted {
        collection: Collection,
        field: &'static str,
    },
    #[error("Unsupported store URL: {0}")]
    UnsupportedUrl(String),
    #[error("Store is not running")]
    Unavailable,
}

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::{
    actors::store::{
        Actor, Error,
        message::{
            DeleteMessage, GetMessage, InsertMessage, ListMessage, Message, MergeMessage,
            UniqueField,
        },
    },
    doc::{Collection, Document, DocumentId},
};

/// Cloneable client of the store actor. Every request fails with
/// [`Error::Unavailable`] once the actor has stopped.
#[derive(Clone)]
pub struct StoreHandle {
    handle: actman::Handle<Actor>,
}

impl StoreHandle {
    pub(crate) fn new(handle: actman::Handle<Actor>) -> Self {
        Self { handle }
    }

    async fn request<T>(
        &self,
        (message, reply_receiver): (Message, oneshot::Receiver<T>),
    ) -> Result<T, Error> {
        // A stopped actor drops the message along with its reply sender.
        self.handle.send(message).await;
        reply_receiver.await.map_err(|_| Error::Unavailable)
    }

    pub async fn list(&self, collection: impl Into<Collection>) -> Result<Vec<Document>, Error> {
        self.request(
            ListMessage {
                collection: collection.into(),
            }
            .into(),
        )
        .await?
    }

    pub async fn insert(
        &self,
        collection: impl Into<Collection>,
        fields: Map<String, Value>,
    ) -> Result<Document, Error> {
        self.request(
            InsertMessage {
                collection: collection.into(),
                fields,
                unique: None,
            }
            .into(),
        )
        .await?
    }

    /// Inserts a document with `unique` set to a store-generated value that no
    /// other document of the collection holds.
    pub async fn insert_unique(
        &self,
        collection: impl Into<Collection>,
        fields: Map<String, Value>,
        unique: UniqueField,
    ) -> Result<Document, Error> {
        self.request(
            InsertMessage {
                collection: collection.into(),
                fields,
                unique: Some(unique),
            }
            .into(),
        )
        .await?
    }

    pub async fn get(
        &self,
        collection: impl Into<Collection>,
        id: DocumentId,
    ) -> Result<Document, Error> {
        self.request(
            GetMessage {
                collection: collection.into(),
                id,
            }
            .into(),
        )
        .await?
    }

    pub async fn merge(
        &self,
        collection: impl Into<Collection>,
        id: DocumentId,
        fields: Map<String, Value>,
    ) -> Result<Document, Error> {
        self.request(
            MergeMessage {
                collection: collection.into(),
                id,
                fields,
            }
            .into(),
        )
        .await?
    }

    pub async fn delete(
        &self,
        collection: impl Into<Collection>,
        id: DocumentId,
    ) -> Result<(), Error> {
        self.request(
            DeleteMessage {
                collection: collection.into(),
                id,
            }
            .into(),
        )
        .await?
    }

    /// Number of documents per non-empty collection.
    pub async fn stats(&self) -> Result<BTreeMap<Collection, usize>, Error> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        self.request((Message::Stats { reply_sender }, reply_receiver))
            .await?
    }
}

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
};

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::{
    actors::store::Error,
    doc::{Collection, Document, DocumentId},
};

pub enum Message {
    List {
        msg: ListMessage,
        reply_sender: oneshot::Sender<Result<Vec<Document>, Error>>,
    },
    Insert {
        msg: InsertMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    },
    Get {
        msg: GetMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    },
    Merge {
        msg: MergeMessage,
        reply_sender: oneshot::Sender<Result<Document, Error>>,
    },
    Delete {
        msg: DeleteMessage,
        reply_sender: oneshot::Sender<Result<(), Error>>,
    },
    Stats {
        reply_sender: oneshot::Sender<Result<BTreeMap<Collection, usize>, Error>>,
    },
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { msg, .. } => f.debug_tuple("List").field(msg).finish(),
            Self::Insert { msg, .. } => f.debug_tuple("Insert").field(msg).finish(),
            Self::Get { msg, .. } => f.debug_tuple("Get").field(msg).finish(),
            Self::Merge { msg, .. } => f.debug_tuple("Merge").field(msg).finish(),
            Self::Delete { msg, .. } => f.debug_tuple("Delete").field(msg).finish(),
            Self::Stats { .. } => f.debug_tuple("Stats").finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListMessage {
    pub collection: Collection,
}

impl From<ListMessage> for (Message, oneshot::Receiver<Result<Vec<Document>, Error>>) {
    fn from(msg: ListMessage) -> Self {
        let (reply_sender, reply_receiver) = oneshot::channel();
        (Message::List { msg, reply_sender }, reply_receiver)
    }
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub collection: Collection,
    pub fields: Map<String, Value>,
    pub unique: Option<UniqueField>,
}

/// A field whose value the store generates on insert, drawing again while
/// another document in the collection holds the same value. Gives up with
/// [`Error::UniqueValuesExhausted`] after a bounded number of draws.
#[derive(Debug, Clone, Copy)]
pub struct UniqueField {
    pub name: &'static str,
    pub generate: fn() -> Value,
}

impl From<InsertMessage> for (Message, oneshot::Receiver<Result<Document, Error>>) {
    fn from(msg: InsertMessage) -> Self {
        let (reply_sender, reply_receiver) = oneshot::channel();
        (Message::Insert { msg, reply_sender }, reply_receiver)
    }
}

#[derive(Debug, Clone)]
pub struct GetMessage {
    pub collection: Collection,
    pub id: DocumentId,
}

impl From<GetMessage> for (Message, oneshot::Receiver<Result<Document, Error>>) {
    fn from(msg: GetMessage) -> Self {
        let (reply_sender, reply_receiver) = oneshot::channel();
        (Message::Get { msg, reply_sender }, reply_receiver)
    }
}

/// Sets `fields` on an existing document, leaving its other fields as they are.
#[derive(Debug, Clone)]
pub struct MergeMessage {
    pub collection: Collection,
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

impl From<MergeMessage> for (Message, oneshot::Receiver<Result<Document, Error>>) {
    fn from(msg: MergeMessage) -> Self {
        let (reply_sender, reply_receiver) = oneshot::channel();
        (Message::Merge { msg, reply_sender }, reply_receiver)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteMessage {
    pub collection: Collection,
    pub id: DocumentId,
}

impl From<DeleteMessage> for (Message, oneshot::Receiver<Result<(), Error>>) {
    fn from(msg: DeleteMessage) -> Self {
        let (reply_sender, reply_receiver) = oneshot::channel();
        (Message::Delete { msg, reply_sender }, reply_receiver)
    }
}

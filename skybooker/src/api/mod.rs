//! Inventory and booking operations over the document store.
//!
//! Every operation takes the [`StoreHandle`] it works on, validates its
//! input, and reports failures with the three-way [`Error`] taxonomy that the
//! REST layer maps onto status codes.

pub mod bookings;
pub mod inventory;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    actors::store::{self, StoreHandle},
    doc::{self, Collection, Document, DocumentId, ValidationError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        collection: Collection,
        id: DocumentId,
    },
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(store::Error),
}

impl From<store::Error> for Error {
    fn from(e: store::Error) -> Self {
        match e {
            store::Error::DocumentNotFound { collection, id } => Self::NotFound { collection, id },
            e => Self::StorageUnavailable(e),
        }
    }
}

/// Decodes a stored document. Documents that no longer match their schema are
/// reported as a storage failure, not as bad input.
fn decode<T: DeserializeOwned>(document: Document) -> Result<T, Error> {
    let id = document.id;
    document.decode().map_err(|cause| {
        store::Error::Json {
            message: format!("Failed to decode stored document {id}"),
            cause,
        }
        .into()
    })
}

fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, Error> {
    documents.into_iter().map(decode).collect()
}

fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, Error> {
    doc::to_fields(record).map_err(|cause| {
        store::Error::Json {
            message: "Failed to encode record".to_string(),
            cause,
        }
        .into()
    })
}

/// Document counts shown by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Counts {
    pub flights: usize,
    pub bookings: usize,
}

pub async fn counts(store: &StoreHandle) -> Result<Counts, Error> {
    let stats = store.stats().await?;
    let count = |name: &str| stats.get(&Collection::from(name)).copied().unwrap_or(0);
    Ok(Counts {
        flights: count(doc::aviation::flight::COLLECTION),
        bookings: count(doc::aviation::booking::COLLECTION),
    })
}

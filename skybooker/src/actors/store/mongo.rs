use std::collections::{BTreeMap, HashSet};

use futures::TryStreamExt;
use mongodb::{
    Client, Database, IndexModel,
    bson::{self, Bson, Document as BsonDocument, doc},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::{
    actors::store::{Error, MAX_UNIQUE_ATTEMPTS, message::UniqueField},
    doc::{Collection, Document, DocumentId},
};

const DEFAULT_DATABASE: &str = "skybooker";
const DUPLICATE_KEY: i32 = 11000;

/// Documents kept in a MongoDB database, one MongoDB collection per
/// collection. `_id` holds the document id as a string.
pub(crate) struct MongoStore {
    database: Database,
    /// Unique indexes known to exist.
    indexes: HashSet<(Collection, &'static str)>,
}

impl MongoStore {
    /// Connects and pings the server, so an unreachable server fails here
    /// rather than on the first request.
    pub(crate) async fn connect(url: &Url) -> Result<Self, Error> {
        let client = Client::with_uri_str(url.as_str())
            .await
            .map_err(mongo_error("Failed to create MongoDB client"))?;
        let database = client.database(database_name(url));
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(mongo_error("Failed to reach MongoDB"))?;
        info!("Connected to MongoDB database {}", database.name());
        Ok(Self {
            database,
            indexes: HashSet::new(),
        })
    }

    fn collection(&self, collection: &Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.as_str())
    }

    pub(crate) async fn list(&self, collection: &Collection) -> Result<Vec<Document>, Error> {
        let documents: Vec<BsonDocument> = self
            .collection(collection)
            .find(doc! {})
            .sort(doc! { "$natural": 1 })
            .await
            .map_err(mongo_error("Failed to query documents"))?
            .try_collect()
            .await
            .map_err(mongo_error("Failed to read documents"))?;
        documents.into_iter().map(from_bson).collect()
    }

    pub(crate) async fn get(
        &self,
        collection: &Collection,
        id: DocumentId,
    ) -> Result<Document, Error> {
        self.collection(collection)
            .find_one(id_filter(id))
            .await
            .map_err(mongo_error("Failed to find document"))?
            .ok_or_else(|| Error::DocumentNotFound {
                collection: collection.clone(),
                id,
            })
            .and_then(from_bson)
    }

    /// Inserts with a fresh id, and a fresh `unique` value if given. The
    /// server enforces uniqueness, so a duplicate key is drawn again.
    pub(crate) async fn insert(
        &mut self,
        collection: &Collection,
        mut fields: Map<String, Value>,
        unique: Option<UniqueField>,
    ) -> Result<Document, Error> {
        if let Some(field) = unique {
            self.ensure_unique_index(collection, field.name).await?;
        }

        for _ in 0..MAX_UNIQUE_ATTEMPTS {
            let id = DocumentId::new_random();
            if let Some(field) = unique {
                fields.insert(field.name.to_string(), (field.generate)());
            }
            match self
                .collection(collection)
                .insert_one(to_bson(id, &fields)?)
                .await
            {
                Ok(_) => return Ok(Document { id, fields }),
                Err(e) if is_duplicate_key(&e) => {
                    debug!("Duplicate key in {collection}, drawing again");
                }
                Err(e) => return Err(mongo_error("Failed to insert document")(e)),
            }
        }
        Err(Error::UniqueValuesExhausted {
            collection: collection.clone(),
            field: unique.map_or("_id", |field| field.name),
        })
    }

    pub(crate) async fn merge(
        &self,
        collection: &Collection,
        id: DocumentId,
        fields: Map<String, Value>,
    ) -> Result<Document, Error> {
        if fields.is_empty() {
            return self.get(collection, id).await;
        }
        let set = bson::to_document(&fields).map_err(|e| Error::Bson(e.to_string()))?;
        self.collection(collection)
            .find_one_and_update(id_filter(id), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(mongo_error("Failed to update document"))?
            .ok_or_else(|| Error::DocumentNotFound {
                collection: collection.clone(),
                id,
            })
            .and_then(from_bson)
    }

    pub(crate) async fn delete(&self, collection: &Collection, id: DocumentId) -> Result<(), Error> {
        let result = self
            .collection(collection)
            .delete_one(id_filter(id))
            .await
            .map_err(mongo_error("Failed to delete document"))?;
        if result.deleted_count == 0 {
            return Err(Error::DocumentNotFound {
                collection: collection.clone(),
                id,
            });
        }
        Ok(())
    }

    pub(crate) async fn stats(&self) -> Result<BTreeMap<Collection, usize>, Error> {
        let mut stats = BTreeMap::new();
        for name in self
            .database
            .list_collection_names()
            .await
            .map_err(mongo_error("Failed to list collections"))?
        {
            let collection = Collection::from(name.as_str());
            let count = self
                .collection(&collection)
                .count_documents(doc! {})
                .await
                .map_err(mongo_error("Failed to count documents"))?;
            if count > 0 {
                stats.insert(collection, count as usize);
            }
        }
        Ok(stats)
    }

    async fn ensure_unique_index(
        &mut self,
        collection: &Collection,
        name: &'static str,
    ) -> Result<(), Error> {
        if self.indexes.contains(&(collection.clone(), name)) {
            return Ok(());
        }
        let mut keys = BsonDocument::new();
        keys.insert(name, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        self.collection(collection)
            .create_index(index)
            .await
            .map_err(mongo_error("Failed to create unique index"))?;
        info!("Ensured unique index on {collection}.{name}");
        self.indexes.insert((collection.clone(), name));
        Ok(())
    }
}

/// The database named by the URL path, or [`DEFAULT_DATABASE`].
fn database_name(url: &Url) -> &str {
    Some(url.path().trim_start_matches('/'))
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATABASE)
}

fn id_filter(id: DocumentId) -> BsonDocument {
    doc! { "_id": id.to_string() }
}

fn to_bson(id: DocumentId, fields: &Map<String, Value>) -> Result<BsonDocument, Error> {
    let mut document = bson::to_document(fields).map_err(|e| Error::Bson(e.to_string()))?;
    document.insert("_id", id.to_string());
    Ok(document)
}

fn from_bson(mut document: BsonDocument) -> Result<Document, Error> {
    let id = match document.remove("_id") {
        Some(Bson::String(id)) => id
            .parse()
            .map_err(|_| Error::Bson(format!("malformed document id: {id}")))?,
        other => return Err(Error::Bson(format!("unexpected document id: {other:?}"))),
    };
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Document { id, fields }),
        other => Err(Error::Bson(format!("unexpected document: {other}"))),
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn mongo_error(message: &str) -> impl FnOnce(mongodb::error::Error) -> Error + '_ {
    move |cause| Error::MongoDb {
        message: message.to_string(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn database_name_defaults() {
        let url = Url::parse("mongodb://localhost:27017/flightdb").unwrap();
        assert_eq!(database_name(&url), "flightdb");
        let url = Url::parse("mongodb://localhost:27017").unwrap();
        assert_eq!(database_name(&url), DEFAULT_DATABASE);
        let url = Url::parse("mongodb://localhost:27017/").unwrap();
        assert_eq!(database_name(&url), DEFAULT_DATABASE);
    }

    #[test]
    fn bson_conversion_keeps_fields() {
        let id = DocumentId::new_random();
        let Value::Object(fields) = json!({
            "flightNumber": "SK101",
            "price": 299,
            "discount": 0.5,
            "tags": ["red-eye"],
        }) else {
            unreachable!()
        };
        let document = to_bson(id, &fields).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), id.to_string());

        let decoded = from_bson(document).unwrap();
        assert_eq!(decoded, Document { id, fields });
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert!(matches!(
            from_bson(doc! { "_id": 42, "flightNumber": "SK101" }),
            Err(Error::Bson(_))
        ));
        assert!(matches!(
            from_bson(doc! { "_id": "not-a-uuid" }),
            Err(Error::Bson(_))
        ));
    }

    /// Runs against the server in `SKYBOOKER_TEST_MONGODB_URL`.
    #[test_log::test(tokio::test)]
    #[ignore = "requires a MongoDB server"]
    async fn crud_against_server() {
        let url = Url::parse(&std::env::var("SKYBOOKER_TEST_MONGODB_URL").unwrap()).unwrap();
        let mut store = MongoStore::connect(&url).await.unwrap();
        let collection = Collection::from(format!("flights_{}", DocumentId::new_random()).as_str());

        let Value::Object(fields) = json!({"flightNumber": "SK101", "price": 299}) else {
            unreachable!()
        };
        let doc = store.insert(&collection, fields, None).await.unwrap();
        assert_eq!(store.get(&collection, doc.id).await.unwrap(), doc);

        let Value::Object(price) = json!({"price": 199}) else {
            unreachable!()
        };
        let merged = store.merge(&collection, doc.id, price).await.unwrap();
        assert_eq!(merged.fields["price"], 199);
        assert_eq!(merged.fields["flightNumber"], "SK101");
        assert_eq!(store.list(&collection).await.unwrap(), vec![merged]);

        store.delete(&collection, doc.id).await.unwrap();
        assert!(matches!(
            store.get(&collection, doc.id).await,
            Err(Error::DocumentNotFound { .. })
        ));
        store.collection(&collection).drop().await.unwrap();
    }
}

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    actors::store::{Error, MAX_UNIQUE_ATTEMPTS, merge_fields, message::UniqueField},
    doc::{Collection, Document, DocumentId},
};

const FILE_EXT: &str = "json";

/// Documents held in memory and, when a directory is given, mirrored to one
/// JSON file per collection. A change is applied in place, persisted, and
/// rolled back if persisting fails.
pub(crate) struct LocalStore {
    dir: Option<PathBuf>,
    collections: HashMap<Collection, LocalCollection>,
}

#[derive(Default)]
struct LocalCollection {
    documents: Vec<Document>,
    /// Values taken per unique field, keyed by their JSON text. Built on the
    /// first unique insert and dropped when a change could invalidate it.
    taken: HashMap<&'static str, HashSet<String>>,
}

impl LocalStore {
    pub(crate) fn memory() -> Self {
        Self {
            dir: None,
            collections: HashMap::new(),
        }
    }

    pub(crate) fn open(dir: PathBuf) -> Result<Self, Error> {
        std::fs::create_dir_all(&dir).map_err(|cause| Error::IO {
            message: "Failed to create store directory".to_string(),
            cause,
        })?;
        info!("Created (or checked) store dir: {dir:?}");

        let mut collections = HashMap::new();
        for (collection, path) in collection_paths(&dir)? {
            let documents = load_collection(&path)?;
            info!(
                "Loaded {} documents into collection {collection}",
                documents.len()
            );
            collections.insert(
                collection,
                LocalCollection {
                    documents,
                    taken: HashMap::new(),
                },
            );
        }

        Ok(Self {
            dir: Some(dir),
            collections,
        })
    }

    pub(crate) fn list(&self, collection: &Collection) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, collection: &Collection, id: DocumentId) -> Result<Document, Error> {
        self.collections
            .get(collection)
            .and_then(|c| c.documents.iter().find(|doc| doc.id == id))
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound {
                collection: collection.clone(),
                id,
            })
    }

    pub(crate) fn insert(
        &mut self,
        collection: &Collection,
        mut fields: Map<String, Value>,
        unique: Option<UniqueField>,
    ) -> Result<Document, Error> {
        let path = self.path(collection);
        let entry = self.collections.entry(collection.clone()).or_default();
        entry.taken.retain(|name, _| !fields.contains_key(*name));

        let mut id = DocumentId::new_random();
        while entry.documents.iter().any(|doc| doc.id == id) {
            id = DocumentId::new_random();
        }
        let unique_key = match unique {
            Some(field) => {
                let value = entry.draw_unique(collection, field)?;
                let key = value.to_string();
                fields.insert(field.name.to_string(), value);
                Some((field.name, key))
            }
            None => None,
        };

        let document = Document { id, fields };
        entry.documents.push(document.clone());
        if let Err(e) = persist(path.as_deref(), &entry.documents) {
            entry.documents.pop();
            return Err(e);
        }
        if let Some((name, key)) = unique_key {
            entry.taken.entry(name).or_default().insert(key);
        }
        Ok(document)
    }

    pub(crate) fn merge(
        &mut self,
        collection: &Collection,
        id: DocumentId,
        fields: Map<String, Value>,
    ) -> Result<Document, Error> {
        let path = self.path(collection);
        let not_found = || Error::DocumentNotFound {
            collection: collection.clone(),
            id,
        };
        let entry = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let index = entry.position(id).ok_or_else(not_found)?;

        entry.taken.retain(|name, _| !fields.contains_key(*name));
        let previous = entry.documents[index].clone();
        merge_fields(&mut entry.documents[index].fields, fields);
        if let Err(e) = persist(path.as_deref(), &entry.documents) {
            entry.documents[index] = previous;
            return Err(e);
        }
        Ok(entry.documents[index].clone())
    }

    pub(crate) fn delete(&mut self, collection: &Collection, id: DocumentId) -> Result<(), Error> {
        let path = self.path(collection);
        let not_found = || Error::DocumentNotFound {
            collection: collection.clone(),
            id,
        };
        let entry = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let index = entry.position(id).ok_or_else(not_found)?;

        let removed = entry.documents.remove(index);
        if let Err(e) = persist(path.as_deref(), &entry.documents) {
            entry.documents.insert(index, removed);
            return Err(e);
        }
        entry.taken.clear();
        Ok(())
    }

    pub(crate) fn stats(&self) -> BTreeMap<Collection, usize> {
        self.collections
            .iter()
            .filter(|(_, c)| !c.documents.is_empty())
            .map(|(collection, c)| (collection.clone(), c.documents.len()))
            .collect()
    }

    fn path(&self, collection: &Collection) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{FILE_EXT}", collection.as_str())))
    }
}

impl LocalCollection {
    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id == id)
    }

    fn draw_unique(&mut self, collection: &Collection, field: UniqueField) -> Result<Value, Error> {
        let documents = &self.documents;
        let taken = self.taken.entry(field.name).or_insert_with(|| {
            documents
                .iter()
                .filter_map(|doc| doc.fields.get(field.name))
                .map(Value::to_string)
                .collect()
        });
        for _ in 0..MAX_UNIQUE_ATTEMPTS {
            let value = (field.generate)();
            if !taken.contains(&value.to_string()) {
                return Ok(value);
            }
        }
        Err(Error::UniqueValuesExhausted {
            collection: collection.clone(),
            field: field.name,
        })
    }
}

fn persist(path: Option<&Path>, documents: &[Document]) -> Result<(), Error> {
    match path {
        Some(path) => save_collection(documents, path),
        None => Ok(()),
    }
}

/// Returns all collection files in the store directory.
///
/// The directory structure is as follows:
/// /store_dir
///           /flights.json
///           /bookings.json
fn collection_paths(dir: &Path) -> Result<Vec<(Collection, PathBuf)>, Error> {
    let mut paths = vec![];
    let entries = std::fs::read_dir(dir).map_err(|cause| Error::IO {
        message: format!("failed to read store directory: {}", dir.display()),
        cause,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(FILE_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        if let Some(collection) = stem.to_str().map(Collection::from) {
            paths.push((collection, path));
        }
    }
    Ok(paths)
}

/// Writes to a temporary file in the same directory and renames it over
/// `path`, so the file on disk is always either the old or the new content.
fn save_collection(documents: &[Document], path: &Path) -> Result<(), Error> {
    let io_error = |message: &str| {
        let message = format!("{message} at {path:?}");
        move |cause| Error::IO { message, cause }
    };

    let data = serde_json::to_vec_pretty(documents).map_err(|cause| Error::Json {
        message: format!("Failed to serialize collection for {path:?}"),
        cause,
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file =
        NamedTempFile::new_in(dir).map_err(io_error("Failed to create temporary collection file"))?;
    file.write_all(&data)
        .map_err(io_error("Failed to write collection file"))?;
    file.as_file()
        .sync_all()
        .map_err(io_error("Failed to sync collection file"))?;
    file.persist(path)
        .map_err(|e| io_error("Failed to replace collection file")(e.error))?;
    debug!("Collection saved to {path:?}");
    Ok(())
}

fn load_collection(path: &Path) -> Result<Vec<Document>, Error> {
    let data = std::fs::read(path).map_err(|e| Error::IO {
        message: format!("Failed to read collection file at {path:?}"),
        cause: e,
    })?;
    serde_json::from_slice(&data).map_err(|cause| Error::Json {
        message: format!("Failed to parse collection file at {path:?}"),
        cause,
    })
}

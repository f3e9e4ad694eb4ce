pub mod aviation;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field under which a document's identifier is exposed on the wire.
pub const ID_FIELD: &str = "id";
/// Legacy identifier field, accepted on input only.
pub const LEGACY_ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Collection(String);

impl From<String> for Collection {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for Collection {
    fn from(name: &str) -> Self {
        name.to_string().into()
    }
}

impl PartialEq<&str> for Collection {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Collection {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Store-generated identifier of a document, unique within its collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::MalformedId(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored document: its identifier plus an open set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Returns the fields with the identifier inserted under [`ID_FIELD`].
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        Value::Object(fields)
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.clone().into_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let id = fields
            .remove(ID_FIELD)
            .ok_or_else(|| D::Error::missing_field(ID_FIELD))?;
        let id = id
            .as_str()
            .ok_or_else(|| D::Error::custom("document id must be a string"))?
            .parse()
            .map_err(D::Error::custom)?;
        Ok(Self { id, fields })
    }
}

/// Turns a serializable record into storable fields, dropping any identifier
/// the caller supplied.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, serde_json::Error> {
    use serde::ser::Error as _;

    let Value::Object(mut fields) = serde_json::to_value(record)? else {
        return Err(serde_json::Error::custom("record must serialize to an object"));
    };
    fields.remove(ID_FIELD);
    fields.remove(LEGACY_ID_FIELD);
    Ok(fields)
}

/// Rejected input. Messages are safe to return to clients.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed identifier: {0:?}")]
    MalformedId(String),
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("origin and destination must differ")]
    SameOriginAndDestination,
    #[error("arrival time must be after departure time")]
    ArrivalNotAfterDeparture,
    #[error("price must be a non-negative number")]
    InvalidPrice,
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

impl ValidationError {
    pub(crate) fn from_serde(e: serde_json::Error) -> Self {
        Self::MalformedBody(e.to_string())
    }
}

/// Parses a JSON body into `T`, reporting failures as [`ValidationError`].
pub fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ValidationError> {
    serde_json::from_value(body).map_err(ValidationError::from_serde)
}

/// Serde support for timestamps that accepts RFC 3339 as well as the
/// timezone-less `YYYY-MM-DDTHH:MM[:SS]` form, which is read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

    use super::ValidationError;

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

    pub fn parse(s: &str) -> Result<DateTime<Utc>, ValidationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| ValidationError::InvalidTimestamp(s.to_string()))
    }

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(|e| D::Error::custom(format!("{e}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize as _, Deserializer, Serializer};

        pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match dt {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            use serde::de::Error as _;

            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(|e| D::Error::custom(format!("{e}"))))
                .transpose()
        }
    }
}

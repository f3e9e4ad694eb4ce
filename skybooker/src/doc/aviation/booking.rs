use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::doc::{
    DocumentId, ID_FIELD, LEGACY_ID_FIELD, ValidationError, aviation::flight::Flight, parse_body,
    timestamp,
};

pub const COLLECTION: &str = "bookings";

pub const REFERENCE_FIELD: &str = "bookingReference";
const REFERENCE_PREFIX: &str = "SB";
const REFERENCE_SPACE: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        })
    }
}

/// Human-presentable booking code such as `SB004217`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BookingReference(String);

impl BookingReference {
    pub fn generate() -> Self {
        let number = Uuid::new_v4().as_u128() % REFERENCE_SPACE;
        Self(format!("{REFERENCE_PREFIX}{number:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: DocumentId,
    pub booking_reference: BookingReference,
    #[serde(flatten)]
    pub record: BookingRecord,
}

/// A booking without its identifier and reference: the flight snapshot taken
/// at booking time plus any passenger fields the client sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub flight_number: String,
    pub from: String,
    pub to: String,
    #[serde(with = "timestamp")]
    pub departure_date: DateTime<Utc>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookingRecord {
    /// Snapshots `flight` into a new confirmed booking.
    pub fn for_flight(flight: &Flight) -> Self {
        Self {
            flight_number: flight.record.flight_number.clone(),
            from: flight.record.from.clone(),
            to: flight.record.to.clone(),
            departure_date: flight.record.departure_time,
            status: BookingStatus::Confirmed,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Parses a create-booking body. Identifiers and references are assigned
    /// by the store, so any supplied ones are dropped.
    pub fn from_json(mut body: Value) -> Result<Self, ValidationError> {
        if let Value::Object(fields) = &mut body {
            fields.remove(ID_FIELD);
            fields.remove(LEGACY_ID_FIELD);
            fields.remove(REFERENCE_FIELD);
        }
        let record: Self = parse_body(body)?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("flightNumber", &self.flight_number),
            ("from", &self.from),
            ("to", &self.to),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }
        Ok(())
    }

    pub fn passengers(&self) -> Option<u64> {
        self.extra.get("passengers").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::doc::{DocumentId, ID_FIELD, LEGACY_ID_FIELD, ValidationError, parse_body, timestamp};

pub const COLLECTION: &str = "flights";

/// Surcharge applied on top of the base fare for taxes and fees.
pub const TAXES_AND_FEES_RATE: f64 = 0.12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(alias = "_id")]
    pub id: DocumentId,
    #[serde(flatten)]
    pub record: FlightRecord,
}

/// Every field of a flight except its identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub flight_number: String,
    pub airline: String,
    pub from: String,
    pub to: String,
    #[serde(with = "timestamp")]
    pub departure_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub arrival_time: DateTime<Utc>,
    pub price: f64,
    pub seats_available: u32,
}

impl FlightRecord {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let record: Self = parse_body(body)?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("flightNumber", &self.flight_number),
            ("airline", &self.airline),
            ("from", &self.from),
            ("to", &self.to),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }
        if self.from.trim().eq_ignore_ascii_case(self.to.trim()) {
            return Err(ValidationError::SameOriginAndDestination);
        }
        if self.arrival_time <= self.departure_time {
            return Err(ValidationError::ArrivalNotAfterDeparture);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        Ok(())
    }

    pub fn duration(&self) -> TimeDelta {
        self.arrival_time - self.departure_time
    }

    pub fn travel_time(&self) -> TravelTime {
        TravelTime::from(self.duration())
    }

    pub fn fare(&self) -> Fare {
        Fare { base: self.price }
    }

    /// "New York (JFK) → Los Angeles (LAX)"
    pub fn route(&self) -> String {
        format!("{} → {}", self.from, self.to)
    }
}

/// A partial flight update. Only the fields present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FlightPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats_available: Option<u32>,
}

impl FlightPatch {
    /// Parses an update body. Identifier fields echoed back by clients are
    /// ignored; any other unknown field is rejected.
    pub fn from_json(mut body: Value) -> Result<Self, ValidationError> {
        if let Value::Object(fields) = &mut body {
            fields.remove(ID_FIELD);
            fields.remove(LEGACY_ID_FIELD);
        }
        parse_body(body)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, record: &mut FlightRecord) {
        if let Some(flight_number) = &self.flight_number {
            record.flight_number = flight_number.clone();
        }
        if let Some(airline) = &self.airline {
            record.airline = airline.clone();
        }
        if let Some(from) = &self.from {
            record.from = from.clone();
        }
        if let Some(to) = &self.to {
            record.to = to.clone();
        }
        if let Some(departure_time) = self.departure_time {
            record.departure_time = departure_time;
        }
        if let Some(arrival_time) = self.arrival_time {
            record.arrival_time = arrival_time;
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(seats_available) = self.seats_available {
            record.seats_available = seats_available;
        }
    }
}

impl From<FlightRecord> for FlightPatch {
    fn from(record: FlightRecord) -> Self {
        Self {
            flight_number: Some(record.flight_number),
            airline: Some(record.airline),
            from: Some(record.from),
            to: Some(record.to),
            departure_time: Some(record.departure_time),
            arrival_time: Some(record.arrival_time),
            price: Some(record.price),
            seats_available: Some(record.seats_available),
        }
    }
}

/// Response of a flight update: the identifier plus the submitted fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightUpdate {
    pub id: DocumentId,
    #[serde(flatten)]
    pub patch: FlightPatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fare {
    base: f64,
}

impl Fare {
    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn taxes_and_fees(&self) -> u64 {
        (self.base * TAXES_AND_FEES_RATE).round() as u64
    }

    pub fn per_passenger(&self) -> u64 {
        (self.base * (1.0 + TAXES_AND_FEES_RATE)).round() as u64
    }

    pub fn total(&self, passengers: u32) -> u64 {
        (self.base * (1.0 + TAXES_AND_FEES_RATE) * f64::from(passengers)).round() as u64
    }
}

/// Whole hours and minutes of a flight, both floored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelTime {
    pub hours: i64,
    pub minutes: i64,
}

impl From<TimeDelta> for TravelTime {
    fn from(delta: TimeDelta) -> Self {
        let total_minutes = delta.num_seconds().div_euclid(60);
        Self {
            hours: total_minutes.div_euclid(60),
            minutes: total_minutes.rem_euclid(60),
        }
    }
}

impl fmt::Display for TravelTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> FlightRecord {
        FlightRecord::from_json(json!({
            "flightNumber": "SK101",
            "airline": "SkyBooker Airways",
            "from": "New York (JFK)",
            "to": "Los Angeles (LAX)",
            "departureTime": "2023-06-15T08:00:00Z",
            "arrivalTime": "2023-06-15T11:30:00Z",
            "price": 299,
            "seatsAvailable": 45,
        }))
        .unwrap()
    }

    #[test]
    fn deserialize_flight() {
        let data = r#"{"_id":"074bd346-c9d9-4bbf-ab95-bdb3aecb1fe0","flightNumber":"SK205","airline":"SkyBooker Airways","from":"Chicago (ORD)","to":"Miami (MIA)","departureTime":"2023-06-16T10:15:00Z","arrivalTime":"2023-06-16T13:45:00Z","price":249,"seatsAvailable":32}"#;
        let flight: Flight = serde_json::from_str(data).unwrap();
        assert_eq!(
            flight.id.to_string(),
            "074bd346-c9d9-4bbf-ab95-bdb3aecb1fe0"
        );
        assert_eq!(flight.record.price, 249.0);

        let value = serde_json::to_value(&flight).unwrap();
        assert_eq!(value["id"], "074bd346-c9d9-4bbf-ab95-bdb3aecb1fe0");
        assert_eq!(value["departureTime"], "2023-06-16T10:15:00Z");
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = FlightRecord::from_json(json!({
            "flightNumber": "SK101",
            "airline": "SkyBooker Airways",
            "from": "New York (JFK)",
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedBody(_)));
    }

    #[test]
    fn invariants() {
        let mut r = record();
        r.flight_number = " ".into();
        assert_eq!(r.validate(), Err(ValidationError::EmptyField("flightNumber")));

        let mut r = record();
        r.to = "new york (jfk)".into();
        assert_eq!(r.validate(), Err(ValidationError::SameOriginAndDestination));

        let mut r = record();
        r.arrival_time = r.departure_time;
        assert_eq!(r.validate(), Err(ValidationError::ArrivalNotAfterDeparture));

        let mut r = record();
        r.price = -1.0;
        assert_eq!(r.validate(), Err(ValidationError::InvalidPrice));

        assert!(matches!(
            FlightRecord::from_json(json!({
                "flightNumber": "SK101",
                "airline": "SkyBooker Airways",
                "from": "New York (JFK)",
                "to": "Los Angeles (LAX)",
                "departureTime": "2023-06-15T08:00:00Z",
                "arrivalTime": "2023-06-15T11:30:00Z",
                "price": 299,
                "seatsAvailable": -3,
            })),
            Err(ValidationError::MalformedBody(_))
        ));
    }

    #[test]
    fn admin_form_timestamps_are_read_as_utc() {
        let r = FlightRecord::from_json(json!({
            "flightNumber": "SK310",
            "airline": "SkyBooker Airways",
            "from": "San Francisco (SFO)",
            "to": "Seattle (SEA)",
            "departureTime": "2023-06-17T14:30",
            "arrivalTime": "2023-06-17T16:45",
            "price": 189.5,
            "seatsAvailable": 18,
        }))
        .unwrap();
        assert_eq!(timestamp::format(&r.departure_time), "2023-06-17T14:30:00Z");
        assert_eq!(r.travel_time().to_string(), "2h 15m");
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let patch = FlightPatch::from_json(json!({"id": "ignored", "price": 199})).unwrap();
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"price": 199.0}));

        let mut r = record();
        let before = r.clone();
        patch.apply(&mut r);
        assert_eq!(r.price, 199.0);
        assert_eq!(r.flight_number, before.flight_number);
        assert_eq!(r.arrival_time, before.arrival_time);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        assert!(matches!(
            FlightPatch::from_json(json!({"prize": 199})),
            Err(ValidationError::MalformedBody(_))
        ));
    }

    #[test]
    fn fare() {
        let fare = record().fare();
        assert_eq!(fare.per_passenger(), 335);
        assert_eq!(fare.taxes_and_fees(), 36);
        assert_eq!(fare.total(1), 335);
        assert_eq!(fare.total(2), 670);
    }

    #[test]
    fn travel_time_is_floored() {
        assert_eq!(record().travel_time().to_string(), "3h 30m");
        let delta = TimeDelta::seconds(2 * 3600 + 59 * 60 + 59);
        assert_eq!(TravelTime::from(delta).to_string(), "2h 59m");
    }
}

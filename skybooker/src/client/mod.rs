//! Client side of the service: the [`FlightsApi`] seam, its HTTP and
//! in-process implementations, and the view state machines built on it.

mod http;
mod local;
pub mod sample;
pub mod views;

pub use http::{ClientConfig, HttpClient};

use crate::{
    api,
    doc::{
        DocumentId,
        aviation::{
            booking::{Booking, BookingRecord},
            flight::{Flight, FlightPatch, FlightRecord, FlightUpdate},
        },
    },
};

/// The inventory and booking operations as seen by a client.
#[async_trait::async_trait]
pub trait FlightsApi: Send + Sync {
    async fn list_flights(&self) -> Result<Vec<Flight>, Error>;

    async fn get_flight(&self, id: DocumentId) -> Result<Flight, Error>;

    async fn create_flight(&self, record: FlightRecord) -> Result<Flight, Error>;

    async fn update_flight(&self, id: DocumentId, patch: FlightPatch)
    -> Result<FlightUpdate, Error>;

    async fn delete_flight(&self, id: DocumentId) -> Result<(), Error>;

    async fn list_bookings(&self) -> Result<Vec<Booking>, Error>;

    async fn create_booking(&self, record: BookingRecord) -> Result<Booking, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Not found")]
    NotFound,
    /// The service refused the input. The message describes what was wrong.
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<api::Error> for Error {
    fn from(e: api::Error) -> Self {
        match e {
            api::Error::Validation(e) => Self::Rejected(e.to_string()),
            api::Error::NotFound { .. } => Self::NotFound,
            api::Error::StorageUnavailable(e) => Self::Unavailable(e.to_string()),
        }
    }
}

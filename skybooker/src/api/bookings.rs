use serde_json::Value;
use tracing::info;

use crate::{
    actors::store::{StoreHandle, message::UniqueField},
    api::{Error, decode, decode_all, to_fields},
    doc::aviation::booking::{
        Booking, BookingRecord, BookingReference, COLLECTION, REFERENCE_FIELD,
    },
};

const REFERENCE: UniqueField = UniqueField {
    name: REFERENCE_FIELD,
    generate: generate_reference,
};

fn generate_reference() -> Value {
    Value::String(BookingReference::generate().to_string())
}

pub async fn list_bookings(store: &StoreHandle) -> Result<Vec<Booking>, Error> {
    decode_all(store.list(COLLECTION).await?)
}

/// Stores a booking under a fresh reference that no other booking holds.
pub async fn create_booking(store: &StoreHandle, record: BookingRecord) -> Result<Booking, Error> {
    record.validate()?;
    let document = store
        .insert_unique(COLLECTION, to_fields(&record)?, REFERENCE)
        .await?;
    let booking: Booking = decode(document)?;
    info!(
        "Booking {} created for flight {}",
        booking.booking_reference, booking.record.flight_number
    );
    Ok(booking)
}

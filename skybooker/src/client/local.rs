use crate::{
    actors::store::StoreHandle,
    api::{bookings, inventory},
    client::{Error, FlightsApi},
    doc::{
        DocumentId,
        aviation::{
            booking::{Booking, BookingRecord},
            flight::{Flight, FlightPatch, FlightRecord, FlightUpdate},
        },
    },
};

/// Serves the views in-process, straight from the store.
#[async_trait::async_trait]
impl FlightsApi for StoreHandle {
    async fn list_flights(&self) -> Result<Vec<Flight>, Error> {
        Ok(inventory::list_flights(self).await?)
    }

    async fn get_flight(&self, id: DocumentId) -> Result<Flight, Error> {
        Ok(inventory::get_flight(self, id).await?)
    }

    async fn create_flight(&self, record: FlightRecord) -> Result<Flight, Error> {
        Ok(inventory::create_flight(self, record).await?)
    }

    async fn update_flight(
        &self,
        id: DocumentId,
        patch: FlightPatch,
    ) -> Result<FlightUpdate, Error> {
        Ok(inventory::update_flight(self, id, patch).await?)
    }

    async fn delete_flight(&self, id: DocumentId) -> Result<(), Error> {
        Ok(inventory::delete_flight(self, id).await?)
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, Error> {
        Ok(bookings::list_bookings(self).await?)
    }

    async fn create_booking(&self, record: BookingRecord) -> Result<Booking, Error> {
        Ok(bookings::create_booking(self, record).await?)
    }
}

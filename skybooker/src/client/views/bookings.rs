use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{
    client::FlightsApi,
    doc::aviation::booking::{Booking, BookingReference, BookingStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRow {
    pub reference: BookingReference,
    pub flight_number: String,
    pub route: String,
    pub departure_date: DateTime<Utc>,
    pub status: BookingStatus,
}

impl From<&Booking> for BookingRow {
    fn from(booking: &Booking) -> Self {
        let record = &booking.record;
        Self {
            reference: booking.booking_reference.clone(),
            flight_number: record.flight_number.clone(),
            route: format!("{} → {}", record.from, record.to),
            departure_date: record.departure_date,
            status: record.status,
        }
    }
}

/// Lists stored bookings.
#[derive(Debug)]
pub struct MyBookingsView {
    loading: bool,
    bookings: Vec<Booking>,
    unavailable: Option<String>,
}

impl Default for MyBookingsView {
    fn default() -> Self {
        Self::new()
    }
}

impl MyBookingsView {
    pub fn new() -> Self {
        Self {
            loading: true,
            bookings: vec![],
            unavailable: None,
        }
    }

    pub async fn load<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        self.loading = true;
        match api.list_bookings().await {
            Ok(bookings) => {
                self.bookings = bookings;
                self.unavailable = None;
            }
            Err(e) => {
                warn!("Failed to fetch bookings: {e}");
                self.unavailable = Some(e.to_string());
            }
        }
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn unavailable(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn rows(&self) -> Vec<BookingRow> {
        self.bookings.iter().map(BookingRow::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{bookings::create_booking, tests::memory_store},
        client::{sample, tests::Unreachable},
        doc::aviation::booking::BookingRecord,
    };

    #[test_log::test(tokio::test)]
    async fn rows_show_stored_bookings() {
        let (store, _runner) = memory_store().await;
        let flight = sample::flights().remove(1);
        let booking = create_booking(&store, BookingRecord::for_flight(&flight))
            .await
            .unwrap();

        let mut view = MyBookingsView::new();
        assert!(view.is_loading());
        view.load(&store).await;
        assert!(!view.is_loading());
        assert_eq!(view.unavailable(), None);
        assert_eq!(
            view.rows(),
            vec![BookingRow {
                reference: booking.booking_reference,
                flight_number: "SK205".into(),
                route: "Chicago (ORD) → Miami (MIA)".into(),
                departure_date: flight.record.departure_time,
                status: BookingStatus::Confirmed,
            }]
        );
    }

    #[test_log::test(tokio::test)]
    async fn failure_is_reported() {
        let mut view = MyBookingsView::new();
        view.load(&Unreachable).await;
        assert!(view.unavailable().is_some());
        assert!(view.rows().is_empty());
    }
}

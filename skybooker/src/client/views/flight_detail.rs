use tracing::{error, info, warn};

use crate::{
    client::{Error, FlightsApi},
    doc::{
        DocumentId,
        aviation::{
            booking::{Booking, BookingRecord},
            flight::{Flight, TravelTime},
        },
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Found(Box<FoundFlight>),
    NotFound,
    /// The flight could not be fetched; loading again may succeed.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundFlight {
    pub flight: Flight,
    pub form: BookingForm,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Submitting,
    Redirected(Redirect),
    /// A user-visible message. Submitting again is allowed.
    Error(String),
}

/// Navigation context handed to the confirmation view.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub flight_id: DocumentId,
    pub booking: Booking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub passengers: u32,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            passengers: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("No seats available on this flight")]
    SoldOut,
    #[error("Passengers must be between 1 and {max}")]
    Passengers { max: u32 },
}

impl BookingForm {
    pub fn validate(&self, seats_available: u32) -> Result<(), FormError> {
        for (name, value) in [
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Email", &self.email),
            ("Phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(FormError::Missing(name));
            }
        }
        if seats_available == 0 {
            return Err(FormError::SoldOut);
        }
        if !(1..=seats_available).contains(&self.passengers) {
            return Err(FormError::Passengers {
                max: seats_available,
            });
        }
        Ok(())
    }

    /// The booking to create: a snapshot of `flight` plus the passenger fields.
    pub fn to_record(&self, flight: &Flight) -> BookingRecord {
        BookingRecord::for_flight(flight)
            .with_field("flightId", flight.id.to_string())
            .with_field("firstName", self.first_name.trim())
            .with_field("lastName", self.last_name.trim())
            .with_field("email", self.email.trim())
            .with_field("phone", self.phone.trim())
            .with_field("passengers", self.passengers)
    }
}

/// Price breakdown and duration shown next to the booking form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub base_fare: f64,
    pub taxes_and_fees: u64,
    pub per_passenger: u64,
    pub total: u64,
    pub travel_time: TravelTime,
}

#[derive(Debug)]
pub struct FlightDetailView {
    id: DocumentId,
    state: DetailState,
}

impl FlightDetailView {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            state: DetailState::Loading,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub async fn load<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        self.state = DetailState::Loading;
        self.state = match api.get_flight(self.id).await {
            Ok(flight) => DetailState::Found(Box::new(FoundFlight {
                flight,
                form: BookingForm::default(),
                phase: Phase::Idle,
            })),
            Err(Error::NotFound) => {
                info!("Flight {} not found", self.id);
                DetailState::NotFound
            }
            Err(e) => {
                warn!("Failed to fetch flight {}: {e}", self.id);
                DetailState::Unavailable(e.to_string())
            }
        };
    }

    pub fn form_mut(&mut self) -> Option<&mut BookingForm> {
        match &mut self.state {
            DetailState::Found(found) => Some(&mut found.form),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<Summary> {
        let DetailState::Found(found) = &self.state else {
            return None;
        };
        let record = &found.flight.record;
        let fare = record.fare();
        Some(Summary {
            base_fare: fare.base(),
            taxes_and_fees: fare.taxes_and_fees(),
            per_passenger: fare.per_passenger(),
            total: fare.total(found.form.passengers),
            travel_time: record.travel_time(),
        })
    }

    /// Validates the form and creates the booking. Ends in
    /// [`Phase::Redirected`] on success and [`Phase::Error`] otherwise.
    pub async fn submit<A: FlightsApi + ?Sized>(&mut self, api: &A) -> Option<&Phase> {
        let DetailState::Found(found) = &mut self.state else {
            return None;
        };
        if matches!(found.phase, Phase::Submitting | Phase::Redirected(_)) {
            return Some(&found.phase);
        }

        if let Err(e) = found.form.validate(found.flight.record.seats_available) {
            found.phase = Phase::Error(e.to_string());
            return Some(&found.phase);
        }

        found.phase = Phase::Submitting;
        let record = found.form.to_record(&found.flight);
        found.phase = match api.create_booking(record).await {
            Ok(booking) => {
                info!(
                    "Booking {} created for flight {}",
                    booking.booking_reference, found.flight.id
                );
                Phase::Redirected(Redirect {
                    flight_id: found.flight.id,
                    booking,
                })
            }
            Err(e) => {
                error!("Failed to create booking: {e}");
                Phase::Error(format!("Booking failed, please try again. ({e})"))
            }
        };
        Some(&found.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{inventory, tests::memory_store},
        client::{sample, tests::Unreachable},
        doc::aviation::booking::BookingStatus,
    };

    fn filled_form(passengers: u32) -> BookingForm {
        BookingForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+1 555 0100".into(),
            passengers,
        }
    }

    #[test]
    fn form_validation() {
        assert_eq!(
            BookingForm::default().validate(45),
            Err(FormError::Missing("First name"))
        );
        assert_eq!(filled_form(1).validate(45), Ok(()));
        assert_eq!(filled_form(45).validate(45), Ok(()));
        assert_eq!(
            filled_form(46).validate(45),
            Err(FormError::Passengers { max: 45 })
        );
        assert_eq!(
            filled_form(0).validate(45),
            Err(FormError::Passengers { max: 45 })
        );
    }

    #[test]
    fn sold_out_flight_rejects_any_passengers() {
        for passengers in 1..4 {
            assert_eq!(filled_form(passengers).validate(0), Err(FormError::SoldOut));
        }
    }

    #[test_log::test(tokio::test)]
    async fn found_flight_books_and_redirects() {
        let (store, _runner) = memory_store().await;
        let flight = inventory::create_flight(&store, sample::flights().remove(0).record)
            .await
            .unwrap();

        let mut view = FlightDetailView::new(flight.id);
        assert_eq!(view.state(), &DetailState::Loading);
        view.load(&store).await;
        assert!(matches!(view.state(), DetailState::Found(_)));

        *view.form_mut().unwrap() = filled_form(2);
        let summary = view.summary().unwrap();
        assert_eq!(summary.per_passenger, 335);
        assert_eq!(summary.taxes_and_fees, 36);
        assert_eq!(summary.total, 670);
        assert_eq!(summary.travel_time.to_string(), "3h 30m");

        let Some(Phase::Redirected(redirect)) = view.submit(&store).await.cloned() else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.flight_id, flight.id);
        assert_eq!(redirect.booking.record.status, BookingStatus::Confirmed);
        assert_eq!(redirect.booking.record.flight_number, "SK101");
        assert_eq!(redirect.booking.record.passengers(), Some(2));
        assert_eq!(redirect.booking.record.extra["flightId"], flight.id.to_string());

        // Submitting again does not create a second booking.
        view.submit(&store).await;
        assert_eq!(
            crate::api::bookings::list_bookings(&store)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[test_log::test(tokio::test)]
    async fn invalid_form_is_not_submitted() {
        let (store, _runner) = memory_store().await;
        let flight = inventory::create_flight(&store, sample::flights().remove(2).record)
            .await
            .unwrap();

        let mut view = FlightDetailView::new(flight.id);
        view.load(&store).await;
        *view.form_mut().unwrap() = filled_form(19);

        assert_eq!(
            view.submit(&store).await,
            Some(&Phase::Error("Passengers must be between 1 and 18".into()))
        );
        assert!(
            crate::api::bookings::list_bookings(&store)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[test_log::test(tokio::test)]
    async fn missing_and_unavailable_are_distinct() {
        let (store, _runner) = memory_store().await;
        let mut view = FlightDetailView::new(DocumentId::new_random());
        view.load(&store).await;
        assert_eq!(view.state(), &DetailState::NotFound);
        assert!(view.form_mut().is_none());
        assert_eq!(view.submit(&store).await, None);

        let mut view = FlightDetailView::new(DocumentId::new_random());
        view.load(&Unreachable).await;
        assert!(matches!(view.state(), DetailState::Unavailable(_)));
    }

    #[test_log::test(tokio::test)]
    async fn failed_booking_keeps_form_for_retry() {
        let (store, runner) = memory_store().await;
        let flight = inventory::create_flight(&store, sample::flights().remove(1).record)
            .await
            .unwrap();
        let mut view = FlightDetailView::new(flight.id);
        view.load(&store).await;
        *view.form_mut().unwrap() = filled_form(1);
        runner.shutdown().await;

        assert!(matches!(
            view.submit(&store).await,
            Some(Phase::Error(message)) if message.starts_with("Booking failed")
        ));
        assert_eq!(view.form_mut().unwrap().first_name, "Ada");
    }
}

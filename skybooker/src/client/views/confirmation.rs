use crate::{
    client::views::flight_detail::Redirect,
    doc::{
        DocumentId,
        aviation::booking::{Booking, BookingReference},
    },
};

/// Shows the booking that was just created. The reference is always the one
/// the service stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationView {
    flight_id: DocumentId,
    booking: Booking,
}

impl ConfirmationView {
    pub fn new(flight_id: DocumentId, booking: Booking) -> Self {
        Self { flight_id, booking }
    }

    pub fn flight_id(&self) -> DocumentId {
        self.flight_id
    }

    pub fn booking_reference(&self) -> &BookingReference {
        &self.booking.booking_reference
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }
}

impl From<Redirect> for ConfirmationView {
    fn from(Redirect { flight_id, booking }: Redirect) -> Self {
        Self::new(flight_id, booking)
    }
}

//! Flight inventory management: add and edit dialogs, confirmed deletes, and
//! a full refetch after every successful mutation.

use std::num::{ParseFloatError, ParseIntError};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    client::FlightsApi,
    doc::{
        DocumentId, ValidationError,
        aviation::flight::{Flight, FlightPatch, FlightRecord},
        timestamp,
    },
};

/// Minute precision, no timezone: the value a datetime-local input holds.
const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Closed,
    Add,
    Edit(DocumentId),
}

/// The add/edit dialog's fields, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightForm {
    pub flight_number: String,
    pub airline: String,
    pub from: String,
    pub to: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub price: String,
    pub seats_available: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("Price must be a number: {0}")]
    Price(ParseFloatError),
    #[error("Seats available must be a whole number: {0}")]
    Seats(ParseIntError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn form_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(FORM_DATETIME_FORMAT).to_string()
}

impl FlightForm {
    pub fn from_flight(record: &FlightRecord) -> Self {
        Self {
            flight_number: record.flight_number.clone(),
            airline: record.airline.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            departure_time: form_datetime(&record.departure_time),
            arrival_time: form_datetime(&record.arrival_time),
            price: record.price.to_string(),
            seats_available: record.seats_available.to_string(),
        }
    }

    pub fn parse(&self) -> Result<FlightRecord, FormError> {
        let record = FlightRecord {
            flight_number: self.flight_number.trim().to_string(),
            airline: self.airline.trim().to_string(),
            from: self.from.trim().to_string(),
            to: self.to.trim().to_string(),
            departure_time: timestamp::parse(self.departure_time.trim())?,
            arrival_time: timestamp::parse(self.arrival_time.trim())?,
            price: self.price.trim().parse().map_err(FormError::Price)?,
            seats_available: self.seats_available.trim().parse().map_err(FormError::Seats)?,
        };
        record.validate()?;
        Ok(record)
    }
}

#[derive(Debug)]
pub struct AdminView {
    flights: Vec<Flight>,
    loading: bool,
    refreshing: bool,
    dialog: Dialog,
    form: FlightForm,
    pending_delete: Option<DocumentId>,
    error: Option<String>,
}

impl Default for AdminView {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminView {
    pub fn new() -> Self {
        Self {
            flights: vec![],
            loading: true,
            refreshing: false,
            dialog: Dialog::Closed,
            form: FlightForm::default(),
            pending_delete: None,
            error: None,
        }
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn dialog(&self) -> Dialog {
        self.dialog
    }

    pub fn form(&self) -> &FlightForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FlightForm {
        &mut self.form
    }

    pub fn pending_delete(&self) -> Option<DocumentId> {
        self.pending_delete
    }

    /// Inline error of the last failed action, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        self.loading = true;
        self.fetch(api).await;
        self.loading = false;
    }

    async fn refresh<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        self.refreshing = true;
        self.fetch(api).await;
        self.refreshing = false;
    }

    async fn fetch<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        match api.list_flights().await {
            Ok(flights) => self.flights = flights,
            Err(e) => {
                error!("Failed to fetch flights: {e}");
                self.error = Some(format!("Failed to load flights: {e}"));
            }
        }
    }

    pub fn open_add(&mut self) {
        self.dialog = Dialog::Add;
        self.form = FlightForm::default();
        self.error = None;
    }

    /// Opens the edit dialog pre-filled from the listed flight. Returns
    /// `false` if no listed flight has that id.
    pub fn open_edit(&mut self, id: DocumentId) -> bool {
        let Some(flight) = self.flights.iter().find(|flight| flight.id == id) else {
            return false;
        };
        self.form = FlightForm::from_flight(&flight.record);
        self.dialog = Dialog::Edit(id);
        self.error = None;
        true
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::Closed;
        self.form = FlightForm::default();
        self.error = None;
    }

    /// Submits the open dialog. On success the list is refetched and the
    /// dialog closed; on failure the dialog stays open with an inline error.
    pub async fn submit<A: FlightsApi + ?Sized>(&mut self, api: &A) -> bool {
        let dialog = self.dialog;
        if dialog == Dialog::Closed {
            return false;
        }

        let record = match self.form.parse() {
            Ok(record) => record,
            Err(e) => {
                self.error = Some(e.to_string());
                return false;
            }
        };

        let result = match dialog {
            Dialog::Add => api.create_flight(record).await.map(|flight| {
                info!("Flight {} added", flight.id);
            }),
            Dialog::Edit(id) => api
                .update_flight(id, FlightPatch::from(record))
                .await
                .map(|_| info!("Flight {id} updated")),
            Dialog::Closed => return false,
        };

        match result {
            Ok(()) => {
                self.close_dialog();
                self.refresh(api).await;
                true
            }
            Err(e) => {
                error!("Failed to save flight: {e}");
                self.error = Some(format!("Failed to save flight: {e}"));
                false
            }
        }
    }

    /// Marks a listed flight for deletion and returns the confirmation prompt
    /// naming it.
    pub fn request_delete(&mut self, id: DocumentId) -> Option<String> {
        let flight = self.flights.iter().find(|flight| flight.id == id)?;
        let prompt = format!(
            "Delete flight {} ({})? This cannot be undone.",
            flight.record.flight_number,
            flight.record.route()
        );
        self.pending_delete = Some(id);
        Some(prompt)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the flight marked by [`Self::request_delete`].
    pub async fn confirm_delete<A: FlightsApi + ?Sized>(&mut self, api: &A) -> bool {
        let Some(id) = self.pending_delete.take() else {
            return false;
        };
        match api.delete_flight(id).await {
            Ok(()) => {
                info!("Flight {id} deleted");
                self.error = None;
                self.refresh(api).await;
                true
            }
            Err(e) => {
                error!("Failed to delete flight {id}: {e}");
                self.error = Some(format!("Failed to delete flight: {e}"));
                false
            }
        }
    }
}

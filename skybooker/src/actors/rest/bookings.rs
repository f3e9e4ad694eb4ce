use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;

use crate::{
    actors::rest::{
        ServerState,
        error::{ApiFailure, Operation},
    },
    api::bookings,
    doc::aviation::booking::{Booking, BookingRecord},
};

pub(super) async fn list(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Booking>>, ApiFailure> {
    bookings::list_bookings(&state.store)
        .await
        .map(Json)
        .map_err(|e| ApiFailure::new(Operation::ListBookings, e))
}

pub(super) async fn create(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), ApiFailure> {
    const OP: Operation = Operation::CreateBooking;

    let Json(body) = body.map_err(|rejection| ApiFailure::rejected_body(OP, rejection))?;
    let record = BookingRecord::from_json(body).map_err(|e| ApiFailure::new(OP, e))?;
    let booking = bookings::create_booking(&state.store, record)
        .await
        .map_err(|e| ApiFailure::new(OP, e))?;
    Ok((StatusCode::CREATED, Json(booking)))
}

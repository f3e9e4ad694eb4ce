use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    actors::rest::{
        ServerState,
        error::{ApiFailure, Operation},
    },
    api::inventory,
    doc::{
        DocumentId,
        aviation::flight::{Flight, FlightPatch, FlightRecord, FlightUpdate},
    },
};

fn parse_id(operation: Operation, id: &str) -> Result<DocumentId, ApiFailure> {
    id.parse().map_err(|e| ApiFailure::new(operation, e))
}

pub(super) async fn list(State(state): State<ServerState>) -> Result<Json<Vec<Flight>>, ApiFailure> {
    inventory::list_flights(&state.store)
        .await
        .map(Json)
        .map_err(|e| ApiFailure::new(Operation::ListFlights, e))
}

pub(super) async fn create(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Flight>), ApiFailure> {
    const OP: Operation = Operation::CreateFlight;

    let Json(body) = body.map_err(|rejection| ApiFailure::rejected_body(OP, rejection))?;
    let record = FlightRecord::from_json(body).map_err(|e| ApiFailure::new(OP, e))?;
    let flight = inventory::create_flight(&state.store, record)
        .await
        .map_err(|e| ApiFailure::new(OP, e))?;
    Ok((StatusCode::CREATED, Json(flight)))
}

pub(super) async fn show(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Flight>, ApiFailure> {
    const OP: Operation = Operation::GetFlight;

    let id = parse_id(OP, &id)?;
    inventory::get_flight(&state.store, id)
        .await
        .map(Json)
        .map_err(|e| ApiFailure::new(OP, e))
}

pub(super) async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FlightUpdate>, ApiFailure> {
    const OP: Operation = Operation::UpdateFlight;

    let id = parse_id(OP, &id)?;
    let Json(body) = body.map_err(|rejection| ApiFailure::rejected_body(OP, rejection))?;
    let patch = FlightPatch::from_json(body).map_err(|e| ApiFailure::new(OP, e))?;
    inventory::update_flight(&state.store, id, patch)
        .await
        .map(Json)
        .map_err(|e| ApiFailure::new(OP, e))
}

pub(super) async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    const OP: Operation = Operation::DeleteFlight;

    let id = parse_id(OP, &id)?;
    inventory::delete_flight(&state.store, id)
        .await
        .map_err(|e| ApiFailure::new(OP, e))?;
    Ok(Json(json!({ "message": "Flight deleted successfully" })))
}

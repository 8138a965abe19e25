use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::{NewTicket, Ticket, TicketPayload},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/{id}", get(get_ticket).delete(delete_ticket))
}

// Нечисловой id не может совпасть ни с одной строкой. MySQL сам привёл бы
// "12abc" к 12, здесь такой id даёт 404.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotFound)
}

// GET /tickets
async fn list_tickets(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let tickets = Ticket::list(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": tickets })))
}

// POST /tickets
async fn create_ticket(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TicketPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let new_ticket = NewTicket::try_from(payload)?;

    let ticket = Ticket::create(&state.db, &new_ticket).await?;
    tracing::info!(
        "Ticket {} booked: bus={}, seat={}, price={}",
        ticket.id,
        ticket.bus,
        ticket.seat,
        ticket.price
    );

    Ok(Json(json!({ "success": true, "data": ticket })))
}

// GET /tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let ticket = Ticket::find(&state.db, id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "success": true, "data": ticket })))
}

// DELETE /tickets/{id}
async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    if !Ticket::delete(&state.db, id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!("Ticket {} deleted", id);
    Ok(Json(json!({ "success": true, "message": "Ticket deleted" })))
}

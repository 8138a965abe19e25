pub mod frontend;
pub mod tickets;

use axum::{routing::get, Router};
use std::sync::Arc;

pub const BANNER: &str = "Ticket Booking Backend API is running...";

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .route("/", get(|| async { BANNER }))
        .route("/health", get(|| async { "OK" }))
        .merge(tickets::routes())
}

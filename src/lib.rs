pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod services;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let db = database::Database::new(&config.database).await?;
        tracing::info!("Database connected ({:?})", db.backend());

        db.run_migrations().await?;

        Ok(Arc::new(Self { db, config }))
    }
}

/// API доступно и в корне, и под `/api` (так к нему ходит клиент за nginx).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(controllers::routes())
        .nest("/api", controllers::routes())
        .merge(controllers::frontend::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

use axum::{response::Html, routing::get, Router};
use std::sync::Arc;

// Одностраничный клиент вшит в бинарник, отдельный фронтенд-сервер не нужен
const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new().route("/app", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

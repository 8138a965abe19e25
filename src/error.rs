//! Ошибки HTTP-слоя и их отображение в конверт `{ success: false, message }`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::TicketInputError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Payload(#[from] JsonRejection),
    #[error("Ticket not found")]
    NotFound,
    // Сообщение драйвера уходит клиенту как есть
    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Payload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TicketInputError> for ApiError {
    fn from(err: TicketInputError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Тело без JSON Content-Type равносильно пустому объекту
            ApiError::Payload(JsonRejection::MissingJsonContentType(_)) => {
                TicketInputError::Missing.to_string()
            }
            ApiError::Payload(rejection) => rejection.body_text(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        } else {
            tracing::debug!("request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

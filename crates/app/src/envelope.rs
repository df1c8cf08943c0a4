use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crm_core::Pagination;

#[derive(Debug, Serialize)]
struct EnvelopeBody<T> {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
}

/// Success response shaped as `{"message", "data"?, "pagination"?}`.
pub struct Envelope<T> {
    status: StatusCode,
    body: EnvelopeBody<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn message(message: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            body: EnvelopeBody {
                message,
                data: None,
                pagination: None,
            },
        }
    }

    pub fn data(message: &'static str, data: T) -> Self {
        let mut envelope = Self::message(message);
        envelope.body.data = Some(data);
        envelope
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.body.pagination = Some(pagination);
        self
    }

    pub fn created(mut self) -> Self {
        self.status = StatusCode::CREATED;
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

use crate::negotiation::NegotiationError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lantern_core::ErrorBody;

/// HTTP face of a failed negotiation.
#[derive(Debug)]
pub struct ApiError(pub NegotiationError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<NegotiationError> for ApiError {
    fn from(err: NegotiationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(self.0.kind(), self.0.to_string());
        (self.status(), Json(body)).into_response()
    }
}

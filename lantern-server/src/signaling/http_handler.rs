use crate::negotiation::{NegotiationError, Negotiator};
use crate::signaling::ApiError;
use axum::Json;
use axum::extract::State;
use bytes::Bytes;
use lantern_core::{NegotiateRequest, NegotiateResponse};
use tracing::{debug, error};

/// `POST /negotiate`: answers a remote offer once it can traverse NAT.
///
/// The body is parsed by hand so that every malformed payload maps to the
/// same 400 response instead of axum's extractor rejections.
pub async fn negotiate_handler(
    State(negotiator): State<Negotiator>,
    body: Bytes,
) -> Result<Json<NegotiateResponse>, ApiError> {
    let request: NegotiateRequest = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Unable to parse JSON");
        NegotiationError::MalformedInput(e.to_string())
    })?;
    debug!(sdp = %request.offer, "SDP offer received");

    let result = negotiator.negotiate(request.offer).await?;

    Ok(Json(NegotiateResponse::answer(result.answer)))
}

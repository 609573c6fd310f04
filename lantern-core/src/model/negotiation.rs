use crate::model::session::SessionDescription;
use serde::{Deserialize, Serialize};

/// Body of `POST /negotiate`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NegotiateRequest {
    #[serde(alias = "sdpOffer")]
    pub offer: String,
}

/// Successful reply carrying the finished local answer.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    pub session_description: SessionDescription,
}

impl NegotiateResponse {
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            session_description: SessionDescription::answer(sdp),
        }
    }
}

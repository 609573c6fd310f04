use serde::{Deserialize, Serialize};

/// Structured body returned with every failed negotiation.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }
}

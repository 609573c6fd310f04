use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("connection already closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

mod error;
mod negotiation;
mod session;

pub use error::ErrorBody;
pub use negotiation::{NegotiateRequest, NegotiateResponse};
pub use session::{SdpType, SessionDescription, SessionId};

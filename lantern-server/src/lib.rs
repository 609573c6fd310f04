pub mod heartbeat;
pub mod negotiation;
pub mod signaling;
pub mod transport;

pub use heartbeat::*;
pub use negotiation::*;
pub use signaling::*;
pub use transport::*;

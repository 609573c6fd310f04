mod gathering;
mod negotiation_config;
mod negotiation_error;
mod negotiator;
mod session_registry;

pub use gathering::*;
pub use negotiation_config::*;
pub use negotiation_error::*;
pub use negotiator::*;
pub use session_registry::*;

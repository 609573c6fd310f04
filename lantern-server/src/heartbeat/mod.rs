mod heartbeat_emitter;
mod heartbeat_registry;

pub use heartbeat_emitter::*;
pub use heartbeat_registry::*;

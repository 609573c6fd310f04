mod transport_config;
mod transport_engine;
mod transport_error;
mod webrtc_engine;

pub use transport_config::*;
pub use transport_engine::*;
pub use transport_error::*;
pub use webrtc_engine::*;

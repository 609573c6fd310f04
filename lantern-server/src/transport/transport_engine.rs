use crate::transport::{EngineError, TransportConfig};
use async_trait::async_trait;
use futures::future::BoxFuture;
use lantern_core::SessionId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Resolves (with a value or by closing) once candidate gathering has finished.
pub type GatheringComplete = mpsc::Receiver<()>;

pub type DataChannelOpenHandler =
    Box<dyn Fn(Arc<dyn EngineDataChannel>) -> BoxFuture<'static, ()> + Send + Sync>;

pub type StateChangeHandler = Box<dyn Fn(ConnectionState) -> BoxFuture<'static, ()> + Send + Sync>;

pub type CandidateHandler = Box<dyn Fn(CandidateKind) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
    Unspecified,
}

impl ConnectionState {
    /// The connection will never carry data again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
    Unknown,
}

/// Transport-level round-trip readings, both zero until the first
/// connectivity check completes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoundTripTime {
    pub current: Duration,
    pub smoothed: Duration,
}

/// Creates connections. One engine serves every request.
#[async_trait]
pub trait TransportEngine: Send + Sync + 'static {
    async fn create_connection(
        &self,
        config: &TransportConfig,
    ) -> Result<Arc<dyn EngineConnection>, EngineError>;
}

/// One peer connection, exclusively owned by the negotiation that created it.
#[async_trait]
pub trait EngineConnection: Send + Sync + 'static {
    fn session_id(&self) -> SessionId;

    /// Called once per remote data channel, after it has opened.
    fn on_data_channel_open(&self, handler: DataChannelOpenHandler);

    fn on_state_change(&self, handler: StateChangeHandler);

    /// Called once per locally gathered candidate.
    fn on_candidate(&self, handler: CandidateHandler);

    async fn set_remote_offer(&self, sdp: String) -> Result<(), EngineError>;

    async fn create_answer(&self) -> Result<String, EngineError>;

    /// Must be subscribed before the local description is committed.
    async fn gathering_complete(&self) -> GatheringComplete;

    /// Commits the answer and starts candidate gathering.
    async fn set_local_answer(&self, sdp: String) -> Result<(), EngineError>;

    /// Current local description including every candidate gathered so far.
    async fn local_description(&self) -> Option<String>;

    async fn round_trip_time(&self) -> RoundTripTime;

    /// Cancelled once the connection is closed or has failed.
    fn closed(&self) -> CancellationToken;

    async fn close(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait EngineDataChannel: Send + Sync + 'static {
    fn label(&self) -> String;

    async fn send_text(&self, text: String) -> Result<(), EngineError>;

    /// Cancelled once the channel has closed.
    fn closed(&self) -> CancellationToken;
}

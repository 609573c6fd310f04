use crate::heartbeat::HeartbeatRegistry;
use crate::negotiation::{
    GatheringOutcome, GatheringSignals, NegotiationConfig, NegotiationError, NegotiationStep,
    SessionRegistry, wait_for_reflexive_path,
};
use crate::transport::{
    CandidateKind, ConnectionState, EngineConnection, EngineDataChannel, EngineError,
    TransportEngine,
};
use futures::FutureExt;
use lantern_core::SessionId;
use lantern_core::sdp::{has_server_reflexive_candidate, looks_like_session_description};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A finished answer, ready to be returned to the client.
#[derive(Debug, Clone)]
pub struct NegotiationResult {
    pub session_id: SessionId,
    /// Current local description, as produced by the engine.
    pub answer: String,
    pub outcome: GatheringOutcome,
    /// Measured from just before the local description was committed.
    pub gather_elapsed: Duration,
}

/// Turns remote offers into NAT-traversable answers.
///
/// Cheap to clone; every clone shares the same engine and registries.
#[derive(Clone)]
pub struct Negotiator {
    engine: Arc<dyn TransportEngine>,
    config: Arc<NegotiationConfig>,
    sessions: SessionRegistry,
    heartbeats: HeartbeatRegistry,
}

impl Negotiator {
    pub fn new(engine: Arc<dyn TransportEngine>, config: NegotiationConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
            heartbeats: HeartbeatRegistry::new(),
        }
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn heartbeats(&self) -> &HeartbeatRegistry {
        &self.heartbeats
    }

    /// Builds the answer for `offer`.
    ///
    /// Every failure after the connection exists closes it before returning.
    /// On success the connection is kept in [`Self::sessions`] until the
    /// engine reports it closed or failed.
    pub async fn negotiate(&self, offer: String) -> Result<NegotiationResult, NegotiationError> {
        if !looks_like_session_description(&offer) {
            warn!("Rejected offer that is not a session description");
            return Err(NegotiationError::MalformedInput(
                "offer is not a session description".to_owned(),
            ));
        }

        let connection = self
            .engine
            .create_connection(&self.config.transport)
            .await
            .map_err(|e| {
                error!(error = %e, "Error creating peer connection");
                NegotiationError::EngineConfiguration(e)
            })?;

        let candidates = self.wire(&connection);

        let result = self
            .exchange(connection.as_ref(), offer, candidates)
            .await
            .and_then(|result| self.hand_off(connection.clone(), result));

        if result.is_err() {
            close_quietly(connection.as_ref()).await;
        }
        result
    }

    /// Moves the connection into the session registry.
    ///
    /// Insert, then check: a terminal state reported at any point is either
    /// seen here or removes the entry through the state handler.
    fn hand_off(
        &self,
        connection: Arc<dyn EngineConnection>,
        result: NegotiationResult,
    ) -> Result<NegotiationResult, NegotiationError> {
        let session_id = connection.session_id();
        let closed = connection.closed();
        self.sessions.insert(connection);

        if closed.is_cancelled() {
            self.sessions.remove(&session_id);
            error!(session = %session_id, "Connection ended before the answer was returned");
            return Err(NegotiationError::NegotiationStep {
                step: NegotiationStep::HandOff,
                source: EngineError::Closed,
            });
        }
        Ok(result)
    }

    /// Registers callbacks before any description is exchanged and returns
    /// the stream of gathered candidate kinds.
    fn wire(&self, connection: &Arc<dyn EngineConnection>) -> mpsc::UnboundedReceiver<CandidateKind> {
        let session_id = connection.session_id();

        // Weak: the registry, not the connection's own callbacks, keeps it alive.
        let weak = Arc::downgrade(connection);
        let heartbeats = self.heartbeats.clone();
        let interval = self.config.heartbeat_interval;
        connection.on_data_channel_open(Box::new(move |channel: Arc<dyn EngineDataChannel>| {
            let weak = weak.clone();
            let heartbeats = heartbeats.clone();

            async move {
                let Some(connection) = weak.upgrade() else {
                    warn!(session = %session_id, "Data channel opened on a dropped connection");
                    return;
                };
                heartbeats.start(channel, connection, interval);
            }
            .boxed()
        }));

        let sessions = self.sessions.clone();
        connection.on_state_change(Box::new(move |state: ConnectionState| {
            let sessions = sessions.clone();

            async move {
                debug!(session = %session_id, ?state, "WebRTC connection status change");
                if !state.is_terminal() {
                    return;
                }
                let Some(connection) = sessions.remove(&session_id) else {
                    return;
                };
                info!(session = %session_id, ?state, "Session ended");
                if state == ConnectionState::Failed {
                    // Closing fires Closed into this same handler, which the
                    // engine serializes; it must not be awaited from here.
                    tokio::spawn(async move {
                        close_quietly(connection.as_ref()).await;
                    });
                }
            }
            .boxed()
        }));

        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        connection.on_candidate(Box::new(move |kind: CandidateKind| {
            let _ = candidate_tx.send(kind);
            async {}.boxed()
        }));

        candidate_rx
    }

    async fn exchange(
        &self,
        connection: &dyn EngineConnection,
        offer: String,
        candidates: mpsc::UnboundedReceiver<CandidateKind>,
    ) -> Result<NegotiationResult, NegotiationError> {
        let session_id = connection.session_id();
        let step_failed = move |step: NegotiationStep| {
            move |source: EngineError| {
                error!(session = %session_id, %step, error = %source, "Negotiation step failed");
                NegotiationError::NegotiationStep { step, source }
            }
        };

        connection
            .set_remote_offer(offer)
            .await
            .map_err(step_failed(NegotiationStep::RemoteDescription))?;

        let answer = connection
            .create_answer()
            .await
            .map_err(step_failed(NegotiationStep::CreateAnswer))?;

        let started = Instant::now();
        let complete = connection.gathering_complete().await;

        connection
            .set_local_answer(answer)
            .await
            .map_err(step_failed(NegotiationStep::LocalDescription))?;

        let outcome = wait_for_reflexive_path(
            connection,
            GatheringSignals {
                candidates,
                complete,
            },
            self.config.poll_interval,
            self.config.gather_timeout,
        )
        .await;
        let gather_elapsed = started.elapsed();

        debug!(
            session = %session_id,
            ?outcome,
            elapsed_secs = gather_elapsed.as_secs_f64(),
            "Candidate gathering wait finished"
        );

        let answer = connection
            .local_description()
            .await
            .filter(|sdp| outcome != GatheringOutcome::TimedOut && has_server_reflexive_candidate(sdp));

        let Some(answer) = answer else {
            error!(
                session = %session_id,
                ?outcome,
                elapsed_secs = gather_elapsed.as_secs_f64(),
                "SDP answer has no server reflexive candidate"
            );
            return Err(NegotiationError::PathValidation {
                outcome,
                elapsed: gather_elapsed,
            });
        };

        info!(
            session = %session_id,
            elapsed_secs = gather_elapsed.as_secs_f64(),
            "SDP answer created"
        );
        debug!(session = %session_id, sdp = %answer, "SDP answer");

        Ok(NegotiationResult {
            session_id,
            answer,
            outcome,
            gather_elapsed,
        })
    }

    /// Stops every heartbeat and closes every handed-off session.
    pub async fn shutdown(&self) {
        self.heartbeats.shutdown();
        self.sessions.close_all().await;
    }
}

/// A close failure never changes the outcome of the request.
async fn close_quietly(connection: &dyn EngineConnection) {
    if let Err(e) = connection.close().await {
        error!(session = %connection.session_id(), error = %e, "Error closing peer connection");
    }
}

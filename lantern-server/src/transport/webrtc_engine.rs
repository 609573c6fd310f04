use crate::transport::{
    CandidateHandler, CandidateKind, ConnectionState, DataChannelOpenHandler, EngineConnection,
    EngineDataChannel, EngineError, GatheringComplete, RoundTripTime, StateChangeHandler,
    TransportConfig, TransportEngine,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use lantern_core::SessionId;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use webrtc::api::API;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice::mdns::MulticastDnsMode;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::stats::StatsReportType;

/// [`TransportEngine`] backed by the `webrtc` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebRtcEngine;

impl WebRtcEngine {
    pub fn new() -> Self {
        Self
    }

    fn build_api(config: &TransportConfig) -> Result<API, EngineError> {
        // Codecs are registered even though only data channels are negotiated;
        // browsers put audio/video sections in their offers.
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let mut settings = SettingEngine::default();
        if config.disable_mdns {
            settings.set_ice_multicast_dns_mode(MulticastDnsMode::Disabled);
        }
        if !config.public_ips.is_empty() {
            settings.set_nat_1to1_ips(config.public_ips.clone(), RTCIceCandidateType::Srflx);
        }

        Ok(APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build())
    }
}

#[async_trait]
impl TransportEngine for WebRtcEngine {
    async fn create_connection(
        &self,
        config: &TransportConfig,
    ) -> Result<Arc<dyn EngineConnection>, EngineError> {
        let api = Self::build_api(config)?;

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let session_id = SessionId::new();
        info!(session = %session_id, "Peer connection created");

        Ok(Arc::new(WebRtcConnection {
            session_id,
            peer_connection,
            closed: CancellationToken::new(),
            rtt: RttCache::default(),
        }))
    }
}

/// How long one stats read is reused. ICE checks refresh the pair's RTT
/// about once a second, far slower than the heartbeat period.
const RTT_MAX_AGE: Duration = Duration::from_millis(250);

pub struct WebRtcConnection {
    session_id: SessionId,
    peer_connection: Arc<RTCPeerConnection>,
    closed: CancellationToken,
    rtt: RttCache,
}

/// Last round-trip reading and when it was taken.
#[derive(Default)]
struct RttCache {
    last: Mutex<Option<(Instant, RoundTripTime)>>,
}

impl RttCache {
    fn fresh(&self, now: Instant) -> Option<RoundTripTime> {
        let (at, rtt) = (*self.last.lock().ok()?)?;
        (now.saturating_duration_since(at) < RTT_MAX_AGE).then_some(rtt)
    }

    fn store(&self, now: Instant, rtt: RoundTripTime) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some((now, rtt));
        }
    }
}

impl WebRtcConnection {
    /// Reads the selected candidate pair: nominated first, then the one with
    /// the most check responses.
    async fn read_round_trip_time(&self) -> RoundTripTime {
        let report = self.peer_connection.get_stats().await;

        let selected = report
            .reports
            .values()
            .filter_map(|entry| match entry {
                StatsReportType::CandidatePair(pair) => Some(pair),
                _ => None,
            })
            .max_by_key(|pair| (pair.nominated, pair.responses_received));

        let Some(pair) = selected else {
            return RoundTripTime::default();
        };

        let smoothed = if pair.responses_received > 0 {
            pair.total_round_trip_time / pair.responses_received as f64
        } else {
            0.0
        };

        RoundTripTime {
            current: seconds(pair.current_round_trip_time),
            smoothed: seconds(smoothed),
        }
    }
}

#[async_trait]
impl EngineConnection for WebRtcConnection {
    fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn on_data_channel_open(&self, handler: DataChannelOpenHandler) {
        let handler: Arc<dyn Fn(Arc<dyn EngineDataChannel>) -> BoxFuture<'static, ()> + Send + Sync> =
            Arc::from(handler);
        let session_id = self.session_id;

        self.peer_connection
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                let handler = handler.clone();

                Box::pin(async move {
                    debug!(session = %session_id, label = dc.label(), "Remote data channel announced");

                    // Writable only after on_open.
                    let channel: Arc<dyn EngineDataChannel> =
                        Arc::new(WebRtcDataChannel::new(dc.clone()));
                    dc.on_open(Box::new(move || {
                        Box::pin(async move {
                            info!(session = %session_id, label = %channel.label(), "Data channel open");
                            handler(channel).await;
                        })
                    }));
                })
            }));
    }

    fn on_state_change(&self, handler: StateChangeHandler) {
        let handler: Arc<dyn Fn(ConnectionState) -> BoxFuture<'static, ()> + Send + Sync> =
            Arc::from(handler);
        let closed = self.closed.clone();

        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let handler = handler.clone();
                let closed = closed.clone();

                Box::pin(async move {
                    let state = ConnectionState::from(s);
                    if state.is_terminal() {
                        closed.cancel();
                    }
                    handler(state).await;
                })
            }));
    }

    fn on_candidate(&self, handler: CandidateHandler) {
        let handler: Arc<dyn Fn(CandidateKind) -> BoxFuture<'static, ()> + Send + Sync> =
            Arc::from(handler);

        self.peer_connection
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let handler = handler.clone();

                Box::pin(async move {
                    // None marks the end of gathering, which is reported separately.
                    let Some(candidate) = c else { return };
                    handler(CandidateKind::from(candidate.typ)).await;
                })
            }));
    }

    async fn set_remote_offer(&self, sdp: String) -> Result<(), EngineError> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<String, EngineError> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(answer.sdp)
    }

    async fn gathering_complete(&self) -> GatheringComplete {
        self.peer_connection.gathering_complete_promise().await
    }

    async fn set_local_answer(&self, sdp: String) -> Result<(), EngineError> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<String> {
        self.peer_connection
            .local_description()
            .await
            .map(|desc| desc.sdp)
    }

    /// `get_stats` builds a report over every transport and codec, so a
    /// reading is reused for [`RTT_MAX_AGE`].
    async fn round_trip_time(&self) -> RoundTripTime {
        let now = Instant::now();
        if let Some(rtt) = self.rtt.fresh(now) {
            return rtt;
        }

        let rtt = self.read_round_trip_time().await;
        self.rtt.store(now, rtt);
        rtt
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.cancel();
        self.peer_connection.close().await?;
        Ok(())
    }
}

pub struct WebRtcDataChannel {
    inner: Arc<RTCDataChannel>,
    closed: CancellationToken,
}

impl WebRtcDataChannel {
    fn new(inner: Arc<RTCDataChannel>) -> Self {
        let closed = CancellationToken::new();

        let on_close = closed.clone();
        inner.on_close(Box::new(move || {
            let token = on_close.clone();
            Box::pin(async move {
                token.cancel();
            })
        }));

        Self { inner, closed }
    }
}

#[async_trait]
impl EngineDataChannel for WebRtcDataChannel {
    fn label(&self) -> String {
        self.inner.label().to_owned()
    }

    async fn send_text(&self, text: String) -> Result<(), EngineError> {
        self.inner.send_text(text).await?;
        Ok(())
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::New => ConnectionState::New,
            RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
            RTCPeerConnectionState::Connected => ConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectionState::Failed,
            RTCPeerConnectionState::Closed => ConnectionState::Closed,
            RTCPeerConnectionState::Unspecified => ConnectionState::Unspecified,
        }
    }
}

impl From<RTCIceCandidateType> for CandidateKind {
    fn from(typ: RTCIceCandidateType) -> Self {
        match typ {
            RTCIceCandidateType::Host => CandidateKind::Host,
            RTCIceCandidateType::Srflx => CandidateKind::ServerReflexive,
            RTCIceCandidateType::Prflx => CandidateKind::PeerReflexive,
            RTCIceCandidateType::Relay => CandidateKind::Relay,
            RTCIceCandidateType::Unspecified => CandidateKind::Unknown,
        }
    }
}

/// Stats report seconds as `f64`; negative or non-finite readings become zero.
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

use crate::heartbeat::{HeartbeatId, HeartbeatInfo, HeartbeatRegistry};
use crate::transport::{EngineConnection, EngineDataChannel, RoundTripTime};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Status line sent on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatMessage {
    pub seq: u64,
    pub rtt: RoundTripTime,
}

impl fmt::Display for HeartbeatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "heartbeat seq={} rtt={:.3} srtt={:.3}",
            self.seq,
            self.rtt.current.as_secs_f64(),
            self.rtt.smoothed.as_secs_f64()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStop {
    ChannelClosed,
    ConnectionClosed,
    Cancelled,
    SendFailed,
}

pub(crate) fn spawn(
    registry: &HeartbeatRegistry,
    channel: Arc<dyn EngineDataChannel>,
    connection: Arc<dyn EngineConnection>,
    interval: Duration,
) -> HeartbeatId {
    let info = HeartbeatInfo {
        id: HeartbeatId::new(),
        session_id: connection.session_id(),
        label: channel.label(),
        started_at: Instant::now(),
    };
    let id = info.id;
    let session_id = info.session_id;
    let (cancel, guard) = registry.register(info);

    info!(session = %session_id, heartbeat = %id, "Heartbeat started");

    tokio::spawn(async move {
        let _guard = guard;
        let reason = run(channel.as_ref(), connection.as_ref(), interval, cancel).await;
        info!(session = %session_id, heartbeat = %id, ?reason, "Heartbeat stopped");
    });

    id
}

async fn run(
    channel: &dyn EngineDataChannel,
    connection: &dyn EngineConnection,
    interval: Duration,
    cancel: CancellationToken,
) -> HeartbeatStop {
    let channel_closed = channel.closed();
    let connection_closed = connection.closed();

    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut seq = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return HeartbeatStop::Cancelled,
            _ = channel_closed.cancelled() => return HeartbeatStop::ChannelClosed,
            _ = connection_closed.cancelled() => return HeartbeatStop::ConnectionClosed,

            _ = ticker.tick() => {
                let rtt = connection.round_trip_time().await;
                let message = HeartbeatMessage { seq, rtt };

                if let Err(e) = channel.send_text(message.to_string()).await {
                    warn!(session = %connection.session_id(), error = %e, "Heartbeat send failed");
                    return HeartbeatStop::SendFailed;
                }
                debug!(session = %connection.session_id(), seq, "Heartbeat sent");
                seq += 1;
            }
        }
    }
}

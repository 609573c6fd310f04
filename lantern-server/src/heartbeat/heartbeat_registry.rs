use crate::heartbeat::heartbeat_emitter;
use crate::transport::{EngineConnection, EngineDataChannel};
use dashmap::DashMap;
use lantern_core::SessionId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct HeartbeatId(pub Uuid);

impl HeartbeatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HeartbeatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HeartbeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of one running heartbeat.
#[derive(Debug, Clone)]
pub struct HeartbeatInfo {
    pub id: HeartbeatId,
    pub session_id: SessionId,
    pub label: String,
    pub started_at: Instant,
}

struct HeartbeatEntry {
    info: HeartbeatInfo,
    cancel: CancellationToken,
}

/// Every heartbeat task that is still running.
///
/// Entries are removed by the task itself when it ends, so an empty registry
/// means no heartbeat has outlived its channel.
#[derive(Clone)]
pub struct HeartbeatRegistry {
    active: Arc<DashMap<HeartbeatId, HeartbeatEntry>>,
    shutdown: CancellationToken,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self {
            active: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Starts emitting heartbeats on `channel` until it or `connection` closes.
    pub fn start(
        &self,
        channel: Arc<dyn EngineDataChannel>,
        connection: Arc<dyn EngineConnection>,
        interval: Duration,
    ) -> HeartbeatId {
        heartbeat_emitter::spawn(self, channel, connection, interval)
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, id: &HeartbeatId) -> bool {
        self.active.contains_key(id)
    }

    pub fn list(&self) -> Vec<HeartbeatInfo> {
        self.active
            .iter()
            .map(|entry| entry.value().info.clone())
            .collect()
    }

    /// Asks one heartbeat to stop. Returns false if it is not running.
    pub fn stop(&self, id: &HeartbeatId) -> bool {
        match self.active.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops every current and future heartbeat.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn register(&self, info: HeartbeatInfo) -> (CancellationToken, HeartbeatGuard) {
        let cancel = self.shutdown.child_token();
        let id = info.id;
        self.active.insert(
            id,
            HeartbeatEntry {
                info,
                cancel: cancel.clone(),
            },
        );

        let guard = HeartbeatGuard {
            id,
            active: self.active.clone(),
        };
        (cancel, guard)
    }
}

impl Default for HeartbeatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deregisters a heartbeat when its task ends, however it ends.
pub(crate) struct HeartbeatGuard {
    id: HeartbeatId,
    active: Arc<DashMap<HeartbeatId, HeartbeatEntry>>,
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

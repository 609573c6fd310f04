use crate::transport::EngineConnection;
use dashmap::DashMap;
use lantern_core::SessionId;
use std::sync::Arc;
use tracing::{error, info};

/// Connections whose negotiation succeeded and that are still alive.
///
/// Holds the only strong reference to a handed-off connection, so removing
/// an entry is what lets the connection be dropped.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<dyn EngineConnection>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, connection: Arc<dyn EngineConnection>) {
        self.sessions.insert(connection.session_id(), connection);
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<Arc<dyn EngineConnection>> {
        self.sessions.remove(session_id).map(|(_, connection)| connection)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Closes and forgets every session.
    pub async fn close_all(&self) {
        // Collect first so no map guard is held across an await.
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();

        for session_id in ids {
            let Some(connection) = self.remove(&session_id) else {
                continue;
            };
            if let Err(e) = connection.close().await {
                error!(session = %session_id, error = %e, "Error closing peer connection");
            }
        }
        info!("All sessions closed");
    }
}

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Browser stand-in: offers a data channel and records what arrives on it.
pub struct TestClient {
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    received: Arc<Mutex<Vec<String>>>,
    dc_open_tx: mpsc::Sender<()>,
    dc_open_rx: Mutex<mpsc::Receiver<()>>,
}

impl TestClient {
    /// Client without ICE servers; only host candidates are gathered.
    pub async fn new() -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);
        let (dc_open_tx, dc_open_rx) = mpsc::channel(1);

        Ok(Self {
            peer_connection,
            data_channel: Arc::new(Mutex::new(None)),
            received: Arc::new(Mutex::new(Vec::new())),
            dc_open_tx,
            dc_open_rx: Mutex::new(dc_open_rx),
        })
    }

    /// Creates a data channel and an offer, and waits (bounded) for gathering
    /// so that the returned offer carries the client's candidates.
    pub async fn create_offer(&self, gather_timeout: Duration) -> Result<String> {
        let dc = self
            .peer_connection
            .create_data_channel("heartbeat", None)
            .await
            .context("Failed to create data channel")?;

        let received = Arc::clone(&self.received);
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let received = Arc::clone(&received);
            Box::pin(async move {
                let text = String::from_utf8_lossy(&msg.data).into_owned();
                received.lock().await.push(text);
            })
        }));

        let dc_open_tx = self.dc_open_tx.clone();
        dc.on_open(Box::new(move || {
            Box::pin(async move {
                tracing::debug!("[TestClient] Data channel opened");
                let _ = dc_open_tx.send(()).await;
            })
        }));

        *self.data_channel.lock().await = Some(dc);

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;

        let mut gathering_complete = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection
            .set_local_description(offer)
            .await
            .context("Failed to set local description")?;

        if tokio::time::timeout(gather_timeout, gathering_complete.recv())
            .await
            .is_err()
        {
            tracing::warn!("[TestClient] ICE gathering timeout, offering what was gathered");
        }

        let local = self
            .peer_connection
            .local_description()
            .await
            .context("No local description after offer")?;
        Ok(local.sdp)
    }

    pub async fn set_remote_answer(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.peer_connection
            .set_remote_description(answer)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    pub async fn wait_for_data_channel(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.dc_open_rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(())) => Ok(()),
            Ok(None) => anyhow::bail!("Data channel open channel closed"),
            Err(_) => anyhow::bail!("Timeout waiting for data channel to open"),
        }
    }

    /// Polls until at least `count` messages arrived.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> Result<Vec<String>> {
        let start = tokio::time::Instant::now();

        loop {
            let received = self.received.lock().await.clone();
            if received.len() >= count {
                return Ok(received);
            }
            if start.elapsed() > timeout {
                anyhow::bail!("Timeout: got {} of {} messages", received.len(), count);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("Failed to close peer connection")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creates_offer() {
        let client = TestClient::new().await.expect("Failed to create test client");

        let offer = client
            .create_offer(Duration::from_secs(3))
            .await
            .expect("Failed to create offer");

        assert!(offer.starts_with("v=0"));
        assert!(offer.contains("webrtc-datachannel"));

        client.close().await.expect("Failed to close client");
    }
}

use std::sync::Arc;
use std::time::Duration;

use lantern_server::{
    GatheringOutcome, NegotiationConfig, NegotiationError, Negotiator, TransportConfig,
    WebRtcEngine,
};

use crate::integration::init_tracing;
use crate::utils::TestClient;

fn negotiator(transport: TransportConfig) -> Negotiator {
    Negotiator::new(
        Arc::new(WebRtcEngine::new()),
        NegotiationConfig {
            transport,
            gather_timeout: Duration::from_secs(5),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_host_only_answer_is_refused() {
    init_tracing();

    let negotiator = negotiator(TransportConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    });
    let client = TestClient::new().await.expect("Failed to create test client");
    let offer = client
        .create_offer(Duration::from_secs(3))
        .await
        .expect("Failed to create offer");

    let err = negotiator
        .negotiate(offer)
        .await
        .expect_err("no STUN server and no public IP: nothing reflexive to offer");

    match err {
        NegotiationError::PathValidation { outcome, .. } => {
            assert_eq!(outcome, GatheringOutcome::GatheringComplete);
        }
        other => panic!("expected path validation failure, got {other}"),
    }
    assert!(negotiator.sessions().is_empty());

    client.close().await.expect("Failed to close client");
}

#[tokio::test]
#[ignore = "opens UDP sockets and runs full ICE/DTLS/SCTP over loopback"]
async fn test_heartbeats_reach_the_browser() {
    init_tracing();

    // The 1:1 NAT mapping turns the host address into a reflexive candidate.
    let negotiator = negotiator(TransportConfig {
        ice_servers: Vec::new(),
        public_ips: vec!["127.0.0.1".to_owned()],
        ..Default::default()
    });
    let client = TestClient::new().await.expect("Failed to create test client");
    let offer = client
        .create_offer(Duration::from_secs(3))
        .await
        .expect("Failed to create offer");

    let result = negotiator.negotiate(offer).await.expect("negotiation should succeed");
    assert!(result.answer.contains("typ srflx"));

    client
        .set_remote_answer(result.answer)
        .await
        .expect("Failed to apply answer");
    client
        .wait_for_data_channel(Duration::from_secs(10))
        .await
        .expect("Data channel did not open");

    let messages = client
        .wait_for_messages(5, Duration::from_secs(5))
        .await
        .expect("No heartbeats received");
    assert!(messages[0].starts_with("heartbeat seq=0 rtt="));
    assert!(messages.iter().all(|m| m.contains(" srtt=")));

    client.close().await.expect("Failed to close client");
    negotiator.shutdown().await;
}

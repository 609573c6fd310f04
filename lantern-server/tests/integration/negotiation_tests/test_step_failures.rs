use lantern_server::{NegotiationError, NegotiationStep};

use crate::integration::{create_negotiator, init_tracing};
use crate::utils::{MockScript, OFFER};

async fn assert_step_failure(step: NegotiationStep, expected_calls: &[&str]) {
    let (negotiator, engine) = create_negotiator(MockScript {
        fail_step: Some(step),
        ..Default::default()
    });

    let err = negotiator
        .negotiate(OFFER.to_owned())
        .await
        .expect_err("scripted step should fail");

    match &err {
        NegotiationError::NegotiationStep { step: failed, .. } => assert_eq!(*failed, step),
        other => panic!("expected step failure, got {other}"),
    }
    assert_eq!(err.kind(), "negotiation_step_failure");

    let connection = engine.last_connection();
    let mut calls = expected_calls.to_vec();
    calls.push("close");
    assert_eq!(connection.calls(), calls);
    assert_eq!(connection.close_calls(), 1);
    assert!(negotiator.sessions().is_empty());
}

#[tokio::test]
async fn test_remote_description_failure_closes_connection() {
    init_tracing();
    assert_step_failure(NegotiationStep::RemoteDescription, &["set_remote_offer"]).await;
}

#[tokio::test]
async fn test_create_answer_failure_closes_connection() {
    init_tracing();
    assert_step_failure(
        NegotiationStep::CreateAnswer,
        &["set_remote_offer", "create_answer"],
    )
    .await;
}

#[tokio::test]
async fn test_local_description_failure_closes_connection() {
    init_tracing();
    assert_step_failure(
        NegotiationStep::LocalDescription,
        &[
            "set_remote_offer",
            "create_answer",
            "gathering_complete",
            "set_local_answer",
        ],
    )
    .await;
}

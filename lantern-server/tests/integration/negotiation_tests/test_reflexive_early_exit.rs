use std::time::Duration;

use lantern_server::{GatheringOutcome, NegotiationConfig};

use crate::integration::{create_negotiator, create_negotiator_with, init_tracing, test_config};
use crate::utils::{MOCK_ANSWER, MockScript, OFFER, REFLEXIVE_LINE};

#[tokio::test(start_paused = true)]
async fn test_reflexive_candidate_found_by_polling() {
    init_tracing();

    let (negotiator, engine) = create_negotiator(MockScript {
        reflexive_after: Some(Duration::from_millis(100)),
        complete_after: Some(Duration::from_secs(10)),
        ..Default::default()
    });

    let result = negotiator
        .negotiate(OFFER.to_owned())
        .await
        .expect("negotiation should succeed");

    assert_eq!(result.outcome, GatheringOutcome::ReflexiveCandidate);
    assert!(result.gather_elapsed >= Duration::from_millis(100));
    // One poll interval of slack, far below the 10s gathering.
    assert!(
        result.gather_elapsed < Duration::from_millis(150),
        "waited {:?}",
        result.gather_elapsed
    );

    // The answer is the engine's local description, byte for byte.
    assert_eq!(result.answer, format!("{MOCK_ANSWER}{REFLEXIVE_LINE}"));

    let connection = engine.last_connection();
    assert_eq!(
        connection.calls(),
        vec![
            "set_remote_offer",
            "create_answer",
            "gathering_complete",
            "set_local_answer"
        ]
    );
    assert!(!connection.is_closed());
    assert!(negotiator.sessions().contains(&result.session_id));
}

#[tokio::test(start_paused = true)]
async fn test_reflexive_candidate_event_ends_wait() {
    init_tracing();

    // Polling effectively off: only the candidate event can end the wait early.
    let config = NegotiationConfig {
        poll_interval: Duration::from_secs(3600),
        ..test_config()
    };
    let (negotiator, _engine) = create_negotiator_with(
        MockScript {
            reflexive_after: Some(Duration::from_millis(40)),
            reflexive_as_event: true,
            complete_after: Some(Duration::from_secs(10)),
            ..Default::default()
        },
        config,
    );

    let result = negotiator
        .negotiate(OFFER.to_owned())
        .await
        .expect("negotiation should succeed");

    assert_eq!(result.outcome, GatheringOutcome::ReflexiveCandidate);
    assert!(result.gather_elapsed < Duration::from_millis(50));
    assert!(result.answer.contains("typ srflx"));
}

#[tokio::test(start_paused = true)]
async fn test_reflexive_candidate_present_when_gathering_completes() {
    init_tracing();

    let config = NegotiationConfig {
        poll_interval: Duration::from_secs(3600),
        ..test_config()
    };
    let (negotiator, _engine) = create_negotiator_with(
        MockScript {
            reflexive_after: Some(Duration::from_millis(200)),
            complete_after: Some(Duration::from_millis(300)),
            ..Default::default()
        },
        config,
    );

    let result = negotiator
        .negotiate(OFFER.to_owned())
        .await
        .expect("final description carries a reflexive candidate");

    assert_eq!(result.outcome, GatheringOutcome::GatheringComplete);
    assert!(result.gather_elapsed >= Duration::from_millis(300));
    assert!(result.answer.ends_with(REFLEXIVE_LINE));
}

use crate::transport::{CandidateKind, EngineConnection, GatheringComplete};
use lantern_core::sdp::has_server_reflexive_candidate;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// How the gathering wait of one negotiation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringOutcome {
    /// A server-reflexive candidate was found before gathering finished.
    ReflexiveCandidate,
    /// The engine reported that no further candidates will be gathered.
    GatheringComplete,
    /// Neither happened within the configured maximum wait.
    TimedOut,
}

/// Inputs the wait listens to, subscribed before the local description is committed.
pub struct GatheringSignals {
    pub candidates: mpsc::UnboundedReceiver<CandidateKind>,
    pub complete: GatheringComplete,
}

/// Waits until one usable NAT-traversing path exists or gathering is over.
///
/// Gathering can run for seconds, but a single server-reflexive candidate is
/// enough to hand the answer back. Whichever of these happens first ends the
/// wait:
///
/// - the engine reports a server-reflexive candidate;
/// - the local description, rescanned every `poll_interval`, contains one;
/// - the engine signals that gathering is complete;
/// - `timeout` expires.
pub async fn wait_for_reflexive_path(
    connection: &dyn EngineConnection,
    signals: GatheringSignals,
    poll_interval: Duration,
    timeout: Duration,
) -> GatheringOutcome {
    let GatheringSignals {
        mut candidates,
        mut complete,
    } = signals;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut poll = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut candidates_open = true;

    loop {
        tokio::select! {
            biased;

            candidate = candidates.recv(), if candidates_open => match candidate {
                Some(CandidateKind::ServerReflexive) => return GatheringOutcome::ReflexiveCandidate,
                Some(kind) => trace!(?kind, "Candidate gathered"),
                None => candidates_open = false,
            },

            // A closed channel means the same as a delivered value.
            _ = complete.recv() => return GatheringOutcome::GatheringComplete,

            _ = poll.tick() => {
                let found = connection
                    .local_description()
                    .await
                    .is_some_and(|sdp| has_server_reflexive_candidate(&sdp));
                if found {
                    return GatheringOutcome::ReflexiveCandidate;
                }
            }

            _ = &mut deadline => return GatheringOutcome::TimedOut,
        }
    }
}

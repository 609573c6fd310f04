//! Read-only inspection of session description text.
//!
//! The description is treated as an opaque document; only the lines needed to
//! decide whether an answer can traverse NAT are looked at.

/// Candidate type token for a server-reflexive (NAT-mapped public) address.
pub const SERVER_REFLEXIVE: &str = "srflx";

const CANDIDATE_PREFIX: &str = "a=candidate:";

/// Cheap shape check run before any engine call: the first non-blank line of
/// a session description is always the protocol version line.
pub fn looks_like_session_description(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with("v="))
}

/// Yields the `typ` value of every `a=candidate` line, in document order.
pub fn candidate_types(sdp: &str) -> impl Iterator<Item = &str> {
    sdp.lines().filter_map(|line| {
        let attr = line.trim().strip_prefix(CANDIDATE_PREFIX)?;
        let mut tokens = attr.split_whitespace();
        tokens.find(|t| *t == "typ")?;
        tokens.next()
    })
}

pub fn has_server_reflexive_candidate(sdp: &str) -> bool {
    candidate_types(sdp).any(|typ| typ == SERVER_REFLEXIVE)
}

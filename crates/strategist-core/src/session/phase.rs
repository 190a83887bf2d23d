//! Session phase state machine type.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The phase a session is in.
///
/// The "no session" state of the state machine is the absence of an active
/// session, so it has no variant here. Phases only ever advance:
/// `Conversation` -> `Finalists` -> `Complete`. Reaching `Conversation`
/// again requires a brand-new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// Default working phase: candidates are proposed and refined.
    Conversation,
    /// Narrowed comparative-analysis phase over the finalist list.
    Finalists,
    /// A final pick has been recorded; the session is read-only.
    Complete,
}

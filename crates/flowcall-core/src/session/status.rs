//! Construction status of a session.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Where a session is in the construction lifecycle.
///
/// ```text
/// collecting ──generate──▶ generating ──ok──▶ ready ──confirm──▶ deployed
///                              │  ▲             │ ▲                  │
///                              │  └─generate────┘ └─update           │
///                             err    ▲                               │
///                              ▼     │                               │
///                            error ──┴──────────generate─────────────┘
/// ```
///
/// Nothing transitions back into `collecting`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Collecting,
    Generating,
    Ready,
    Deployed,
    Error,
}

impl SessionStatus {
    /// Returns `true` when moving from `self` to `next` is allowed.
    ///
    /// The only self-transitions are re-entering `generating` and updating a
    /// `ready` workflow. A deployed session is never deployed again.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;

        matches!(
            (self, next),
            (Collecting | Generating | Ready | Deployed | Error, Generating)
                | (Generating, Ready | Error)
                | (Ready, Ready | Deployed)
        )
    }

    /// A short, speakable description for `getWorkflowStatus`.
    pub fn caller_message(self) -> &'static str {
        match self {
            SessionStatus::Collecting => {
                "I'm still gathering details about what you'd like to automate."
            }
            SessionStatus::Generating => "I'm building your workflow right now.",
            SessionStatus::Ready => {
                "Your workflow is ready. Would you like me to deploy it?"
            }
            SessionStatus::Deployed => "Your workflow has been deployed.",
            SessionStatus::Error => {
                "Something went wrong while building your workflow. Could you describe it again?"
            }
        }
    }
}

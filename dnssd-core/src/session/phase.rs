//! Session lifecycle with validated transitions.

use std::time::Instant;

use crate::error::DnssdError;

/// The current phase of a discovery session.
///
/// ```text
///  Pending ──► Active ──► Terminated
///     │                       ▲
///     └───────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Request sent, daemon acknowledgement outstanding.
    #[default]
    Pending,

    /// Acknowledged; replies may arrive.
    Active {
        /// When the daemon accepted the request.
        since: Instant,
    },

    /// Torn down, rejected, or cut off by the daemon. Terminal.
    Terminated,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Active { .. } => write!(f, "Active"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Time since the session became active; `None` in other phases.
    pub fn active_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Active { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// Transition to `Active`.
    ///
    /// Valid from: `Pending`.
    pub fn activate(&mut self) -> Result<(), DnssdError> {
        match self {
            Self::Pending => {
                *self = Self::Active {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(DnssdError::InvalidState(
                "cannot activate: not in Pending state",
            )),
        }
    }

    /// Transition to `Terminated`. Already terminated is not an error.
    pub fn terminate(&mut self) {
        *self = Self::Terminated;
    }

    /// Fail with `InvalidState` unless the session is active.
    pub fn require_active(&self) -> Result<(), DnssdError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DnssdError::InvalidState("session is not active"))
        }
    }
}

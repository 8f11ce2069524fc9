//! Lifecycle phases.

use std::fmt;

/// The discrete lifecycle stage of a partition's block-proposal actor.
///
/// Happy path: `Idle → Proposing → Finalizing → Idle`. `Synchronizing` is
/// reached from `Proposing` when the node detects it is behind the root's
/// view; `Closing` is terminal and absorbing: once entered no further
/// transition fires and pending work is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Synchronizing,
    Proposing,
    Finalizing,
    Closing,
}

impl Phase {
    /// Whether this phase accepts transactions into the current block.
    pub fn accepts_transactions(&self) -> bool {
        matches!(self, Phase::Proposing)
    }

    /// Whether the actor is shutting down.
    pub fn is_closing(&self) -> bool {
        matches!(self, Phase::Closing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Synchronizing => "synchronizing",
            Phase::Proposing => "proposing",
            Phase::Finalizing => "finalizing",
            Phase::Closing => "closing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_proposing_accepts_transactions() {
        assert!(Phase::Proposing.accepts_transactions());
        for phase in [
            Phase::Idle,
            Phase::Synchronizing,
            Phase::Finalizing,
            Phase::Closing,
        ] {
            assert!(!phase.accepts_transactions());
        }
    }
}

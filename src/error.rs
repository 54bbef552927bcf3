//! Errors a single turn can end with.
//!
//! None of them stop the game: every variant is counted against the player who
//! was asked to act, and the turn is skipped.

use thiserror::Error;

/// Why a player's turn produced no accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// Bot did not answer before the action timeout, or answered with an empty line.
    #[error("no response from bot")]
    NoResponse,
    /// Bot answered with a line that is not a valid command.
    #[error("malformed command '{line}': {reason}")]
    Malformed {
        /// The raw line, trimmed.
        line: String,
        /// What the parser complained about.
        reason: String,
    },
    /// Command was well formed but the rules refused it.
    #[error("illegal action: {0}")]
    RuleViolation(String),
    /// Bot process crashed, closed its output or could not be written to.
    #[error("bot process error: {0}")]
    Process(String),
}

impl TurnError {
    /// Short label used in logs and dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::NoResponse => "no_response",
            TurnError::Malformed { .. } => "malformed",
            TurnError::RuleViolation(_) => "rule_violation",
            TurnError::Process(_) => "process",
        }
    }
}

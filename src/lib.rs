//! # Ai Arena
//!
//! A modular Rust crate for running turn-based games between AI bots, each bot being a separate
//! OS process speaking a line protocol on its stdin/stdout.
//!
//! It provides:
//! - The round loop (`Engine`) and the game it drives (`GameSession`)
//! - The game logic contract via the `LogicHandler` trait, and `TurnLogic`, which implements it
//!   for any game described by the `Rules` trait
//! - Per-player error counting: a bot that times out, crashes, sends garbage or plays an illegal
//!   move gets an error, and is excluded from the game once it reaches the configured limit
//! - A reference game (`games::tictactoe`) and process-backed bots (`ProcessHandle`)
//!
//! # Documentation Overview
//!
//! - For the round loop and its states, see the [`engine`] module.
//! - For turn order, move numbering, exclusion and winner resolution, see the [`logic`] module.
//! - For the messages exchanged with bots, see the [`protocol`] module.
//! - For configuring limits and timeouts, see [`Configuration`](crate::configuration::Configuration).
//!
//! # Usage Example
//!
//! ```no_run
//! use ai_arena::prelude::*;
//! use ai_arena::games::tictactoe::TicTacToe;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env().with_max_rounds(Some(10));
//!
//!     let players = vec![
//!         Player::new(1, "alice", Box::new(ProcessHandle::from_command_line("alice", "./alice", &config)?)),
//!         Player::new(2, "bob", Box::new(ProcessHandle::from_command_line("bob", "./bob", &config)?)),
//!     ];
//!
//!     let mut session = GameSession::with_rules(players, TicTacToe::new(), config)?;
//!     let outcome = session.run()?;
//!     println!("winner: {}", outcome.winner_label());
//!     Ok(())
//! }
//! ```
//!
//! ## Bot Requirements
//!
//! - Read engine messages line by line on stdin (see [`protocol`])
//! - Answer every `action move <ms>` with exactly one line within the given time
//! - Exit when stdin is closed
#![warn(missing_docs)]

pub use anyhow;

pub mod configuration;
pub mod engine;
pub mod error;
pub mod games;
pub mod logger;
pub mod logic;
pub mod persistence;
pub mod player;
pub mod process;
pub mod protocol;
pub mod scripted;
pub mod session;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use ai_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::configuration::Configuration;
    pub use crate::engine::{Engine, EngineState, Game};
    pub use crate::error::TurnError;
    pub use crate::logic::{LogicHandler, Move, Rules, TurnLogic};
    pub use crate::persistence::{FileSink, ResultSink, StdoutSink};
    pub use crate::player::{Player, PlayerHandle, PlayerId};
    pub use crate::process::ProcessHandle;
    pub use crate::protocol::{Command, EngineMessage, RoundUpdateMessage};
    pub use crate::session::{GameSession, Outcome};
}

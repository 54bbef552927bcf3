//! The round loop.
//!
//! [`Engine::run`] drives any [`Game`] from its first round until it is over or the round bound
//! is exceeded, then lets the game finish. Rounds are played one after the other on the calling
//! thread.

use anyhow::bail;
use tracing::{debug, info, instrument};

use crate::session::Outcome;

/// What the engine drives.
pub trait Game {
    /// True when no further round should be played.
    fn is_game_over(&self) -> bool;

    /// Plays round `round` (starting at 1).
    fn play_round(&mut self, round: u32);

    /// Shuts the game down once the loop is over. `rounds_played` is the number of rounds
    /// that were started.
    fn finish(&mut self, rounds_played: u32) -> Outcome;
}

/// Lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, not started yet.
    Idle,
    /// Playing rounds.
    Running,
    /// Loop over, game finished.
    Finished,
}

/// Round scheduler.
#[derive(Debug)]
pub struct Engine {
    state: EngineState,
    round: u32,
    max_rounds: Option<u32>,
}

impl Engine {
    /// Engine stopping after `max_rounds` rounds, or only once the game is over if `None`.
    pub fn new(max_rounds: Option<u32>) -> Self {
        Self {
            state: EngineState::Idle,
            round: 1,
            max_rounds,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Round that will be played next.
    pub fn round(&self) -> u32 {
        self.round
    }

    fn within_bound(&self) -> bool {
        self.max_rounds.map_or(true, |max| self.round <= max)
    }

    /// Plays `game` to its end and returns how it finished.
    ///
    /// # Errors
    /// Returned when the engine was already run.
    #[instrument(skip_all, fields(max_rounds = ?self.max_rounds))]
    pub fn run<G: Game + ?Sized>(&mut self, game: &mut G) -> anyhow::Result<Outcome> {
        if self.state != EngineState::Idle {
            bail!("engine already ran (state: {:?})", self.state);
        }
        self.state = EngineState::Running;
        info!("game started");

        while !game.is_game_over() && self.within_bound() {
            debug!(round = self.round, "playing round");
            game.play_round(self.round);
            self.round += 1;
        }

        let rounds_played = self.round - 1;
        info!(rounds_played, game_over = game.is_game_over(), "game loop ended");
        self.state = EngineState::Finished;
        Ok(game.finish(rounds_played))
    }
}

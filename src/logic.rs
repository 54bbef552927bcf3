//! Game logic consumed by the engine.
//!
//! [`LogicHandler`] is what the engine drives: it plays rounds, tells whether the game is over
//! and who won, and produces the record of the game. [`TurnLogic`] implements it for any game
//! described by [`Rules`]: it owns the turn order bookkeeping (move numbers, error counting,
//! exclusion) and leaves the board questions to the rules.

use std::{fmt::Display, str::FromStr, thread, time::Duration};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    configuration::Configuration,
    error::TurnError,
    player::{Player, PlayerId},
    protocol::{Command, EngineMessage, RoundUpdateMessage},
};

/// What the engine needs from the game logic.
pub trait LogicHandler {
    /// Gives every live player one turn, in registration order.
    ///
    /// Stops early as soon as the game is over. Turn errors are absorbed: they are counted
    /// against the player and the turn is skipped.
    fn play_round(&mut self, round: u32, players: &mut [Player]);

    /// True once no further turn should be played. Calling it has no side effect.
    fn is_game_over(&self) -> bool;

    /// Winner of a finished game. `None` for a draw, or while the game is still going.
    fn winner(&self) -> Option<PlayerId>;

    /// Replayable record of every accepted move.
    fn played_game(&self) -> anyhow::Result<String>;
}

/// Rules of a specific game.
///
/// The rules own the authoritative state; only [`apply`](Rules::apply) mutates it.
pub trait Rules {
    /// What a bot sends to act, parsed from and printed to its line form.
    type Action: FromStr<Err = anyhow::Error> + Display + Serialize;
    /// Snapshot of the state sent to bots.
    type State: Display;

    /// Current state.
    fn state(&self) -> Self::State;

    /// Validates and applies `action` for `player`.
    ///
    /// # Error
    /// Returned when the action is illegal. The state must be left untouched.
    fn apply(&mut self, player: PlayerId, action: &Self::Action) -> anyhow::Result<()>;

    /// False once nobody can act anymore.
    fn has_possible_move(&self) -> bool;

    /// Player the rules consider the winner, if any.
    fn winner(&self) -> Option<PlayerId>;
}

/// One accepted action. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move<A> {
    number: u32,
    player: PlayerId,
    action: A,
}

impl<A> Move<A> {
    /// Global move number, starting at 1.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Player who played it.
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// What was played.
    pub fn action(&self) -> &A {
        &self.action
    }
}

#[derive(Serialize)]
struct PlayedGame<'a, A> {
    moves: &'a [Move<A>],
    excluded: &'a [PlayerId],
}

/// [`LogicHandler`] for turn-by-turn games, generic over their [`Rules`].
pub struct TurnLogic<R: Rules> {
    rules: R,
    roster: Vec<PlayerId>,
    excluded: Vec<PlayerId>,
    max_errors: Option<u32>,
    action_timeout: Duration,
    turn_delay: Option<Duration>,
    move_number: u32,
    moves: Vec<Move<R::Action>>,
}

impl<R: Rules> TurnLogic<R> {
    /// Logic for the players in `roster`, limits taken from `config`.
    pub fn new(rules: R, roster: impl IntoIterator<Item = PlayerId>, config: &Configuration) -> Self {
        Self {
            rules,
            roster: roster.into_iter().collect(),
            excluded: vec![],
            max_errors: config.max_errors,
            action_timeout: config.action_timeout,
            turn_delay: config.turn_delay,
            move_number: 1,
            moves: vec![],
        }
    }

    /// The rules and their current state.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Accepted moves, in order.
    pub fn moves(&self) -> &[Move<R::Action>] {
        &self.moves
    }

    /// Number the next accepted move will get.
    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    /// Players excluded for too many errors, in exclusion order.
    pub fn excluded(&self) -> &[PlayerId] {
        &self.excluded
    }

    fn is_excluded(&self, id: PlayerId) -> bool {
        self.excluded.contains(&id)
    }

    fn live_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.roster
            .iter()
            .copied()
            .filter(|id| !self.is_excluded(*id))
    }

    /// At least one exclusion happened and it left one player or none.
    fn is_over_by_exclusion(&self) -> bool {
        !self.excluded.is_empty() && self.live_players().count() <= 1
    }

    fn play_turn(&mut self, player: &mut Player, round: u32) {
        let update = RoundUpdateMessage::new(round, self.move_number, self.rules.state());
        let handle = player.handle_mut();
        handle.send_command(&EngineMessage::from(update));
        handle.send_command(&EngineMessage::ActionRequest {
            timeout: self.action_timeout,
        });

        match self.take_action(player) {
            Ok(action) => {
                debug!(player = player.id(), number = self.move_number, %action, "move accepted");
                self.moves.push(Move {
                    number: self.move_number,
                    player: player.id(),
                    action,
                });
                self.move_number += 1;
            }
            Err(e) => self.on_turn_error(player, e),
        }
    }

    fn take_action(&mut self, player: &mut Player) -> Result<R::Action, TurnError> {
        let line = player.handle_mut().request_move()?;
        trace!(player = player.id(), %line, "bot answered");
        let Command::Act(action) = Command::<R::Action>::parse(&line)?;
        self.rules
            .apply(player.id(), &action)
            .map_err(|e| TurnError::RuleViolation(format!("{e:#}")))?;
        Ok(action)
    }

    fn on_turn_error(&mut self, player: &mut Player, error: TurnError) {
        let errors = player.add_error();
        warn!(player = player.id(), kind = error.kind(), errors, "{error}");
        player
            .handle_mut()
            .add_to_dump(&format!("Engine warning: {error}"));

        if let Some(limit) = self.max_errors {
            if errors >= limit && !self.is_excluded(player.id()) {
                info!(player = player.id(), errors, "player excluded");
                player
                    .handle_mut()
                    .add_to_dump(&format!("Excluded after {errors} errors"));
                self.excluded.push(player.id());
            }
        }
    }
}

impl<R: Rules> LogicHandler for TurnLogic<R> {
    #[instrument(skip(self, players))]
    fn play_round(&mut self, round: u32, players: &mut [Player]) {
        for player in players.iter_mut() {
            if self.is_game_over() {
                return;
            }
            if self.is_excluded(player.id()) || !self.roster.contains(&player.id()) {
                continue;
            }
            if let Some(delay) = self.turn_delay {
                thread::sleep(delay);
            }
            self.play_turn(player, round);
        }
    }

    fn is_game_over(&self) -> bool {
        !self.rules.has_possible_move()
            || self.rules.winner().is_some()
            || self.is_over_by_exclusion()
    }

    fn winner(&self) -> Option<PlayerId> {
        if !self.is_game_over() {
            return None;
        }
        if self.is_over_by_exclusion() {
            let mut live = self.live_players();
            return match (live.next(), live.next()) {
                (Some(last), None) => Some(last),
                _ => None,
            };
        }
        self.rules
            .winner()
            .filter(|id| self.roster.contains(id) && !self.is_excluded(*id))
    }

    fn played_game(&self) -> anyhow::Result<String> {
        let record = PlayedGame {
            moves: &self.moves,
            excluded: &self.excluded,
        };
        serde_json::to_string(&record).context("could not serialize played game")
    }
}

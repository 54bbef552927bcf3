//! A single game between bots: players, logic and engine wired together.
//!
//! [`GameSession`] is the composition root. It owns the players and the [`LogicHandler`],
//! hands itself to an [`Engine`] on [`run`](GameSession::run), and takes care of shutting the
//! bots down and saving the result once the loop is over.
//!
//! Shutting down never fails: bots that do not exit within the grace period are killed, and a
//! result that cannot be saved is only logged.

use std::{collections::HashSet, mem};

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    configuration::Configuration,
    engine::{Engine, EngineState, Game},
    logic::{LogicHandler, Rules, TurnLogic},
    persistence::{sink_for, ResultSink},
    player::{Player, PlayerId},
    protocol::EngineMessage,
};

/// How a game ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Winning player, `None` for a draw.
    pub winner: Option<PlayerId>,
    /// Name of the winning player.
    pub winner_name: Option<String>,
    /// Number of rounds that were started.
    pub rounds_played: u32,
    /// Error count of every player, in turn order.
    pub errors: Vec<(PlayerId, u32)>,
    /// Played game, as produced by [`LogicHandler::played_game`].
    pub record: String,
}

impl Outcome {
    /// Winner name, or `"none"` for a draw.
    pub fn winner_label(&self) -> &str {
        self.winner_name.as_deref().unwrap_or("none")
    }
}

/// Players, game logic and result sink of one game.
pub struct GameSession<L: LogicHandler> {
    players: Vec<Player>,
    logic: L,
    config: Configuration,
    sink: Box<dyn ResultSink>,
    engine: Engine,
}

impl<R: Rules> GameSession<TurnLogic<R>> {
    /// Session playing `rules` between `players`, in the given turn order.
    ///
    /// # Errors
    /// See [`GameSession::new`].
    pub fn with_rules(players: Vec<Player>, rules: R, config: Configuration) -> anyhow::Result<Self> {
        let logic = TurnLogic::new(rules, players.iter().map(Player::id), &config);
        Self::new(players, logic, config)
    }
}

impl<L: LogicHandler> GameSession<L> {
    /// Session driving `logic` between `players`, in the given turn order.
    ///
    /// # Errors
    /// Returned when there is no player, two players share an id, or `config` is invalid.
    pub fn new(players: Vec<Player>, logic: L, config: Configuration) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;
        if players.is_empty() {
            bail!("a game needs at least one player");
        }
        let mut ids = HashSet::new();
        if let Some(duplicate) = players.iter().find(|p| !ids.insert(p.id())) {
            bail!("player id {} is used twice", duplicate.id());
        }

        let sink = sink_for(&config);
        let engine = Engine::new(config.max_rounds);
        Ok(Self {
            players,
            logic,
            config,
            sink,
            engine,
        })
    }

    /// Replaces the result sink chosen from the configuration.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Players, in turn order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Game logic.
    pub fn logic(&self) -> &L {
        &self.logic
    }

    /// Lifecycle state of the session's engine.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Plays the whole game and returns how it ended.
    ///
    /// # Errors
    /// Returned when the session already ran; everything happening during the game is absorbed.
    pub fn run(&mut self) -> anyhow::Result<Outcome> {
        if self.engine.state() != EngineState::Idle {
            bail!("game session already ran (state: {:?})", self.engine.state());
        }
        self.send_settings();

        // the engine drives `self`, so it is moved out for the duration of the loop
        let mut engine = mem::replace(&mut self.engine, Engine::new(self.config.max_rounds));
        let outcome = engine.run(self);
        self.engine = engine;
        outcome
    }

    fn send_settings(&mut self) {
        let names = self
            .players
            .iter()
            .map(Player::name)
            .collect::<Vec<_>>()
            .join(",");
        let timebank = self.config.action_timeout.as_millis();
        let max_rounds = self.config.max_rounds;

        for player in &mut self.players {
            let id = player.id();
            let handle = player.handle_mut();
            handle.send_command(&EngineMessage::setting("timebank", timebank));
            handle.send_command(&EngineMessage::setting("player_names", &names));
            handle.send_command(&EngineMessage::setting("your_botid", id));
            if let Some(max) = max_rounds {
                handle.send_command(&EngineMessage::setting("max_rounds", max));
            }
        }
    }

    fn outcome(&self, rounds_played: u32) -> Outcome {
        let winner = self.logic.winner();
        let winner_name = winner.and_then(|id| {
            self.players
                .iter()
                .find(|p| p.id() == id)
                .map(|p| p.name().to_string())
        });
        let record = self.logic.played_game().unwrap_or_else(|e| {
            error!("could not produce played game: {e:#}");
            String::new()
        });

        Outcome {
            winner,
            winner_name,
            rounds_played,
            errors: self.players.iter().map(|p| (p.id(), p.errors())).collect(),
            record,
        }
    }

    /// Stores the result with the session's sink.
    ///
    /// # Errors
    /// Whatever the sink reports.
    pub fn save_game(&mut self, outcome: &Outcome) -> anyhow::Result<()> {
        self.sink.save(outcome).context("saving game result")
    }

    fn stop_players(&mut self) {
        for player in &mut self.players {
            player.handle_mut().finish();
        }
        let grace = self.config.shutdown_grace;
        for player in &mut self.players {
            if let Err(e) = player.handle_mut().wait(grace) {
                warn!(player = player.id(), "bot did not stop cleanly: {e:#}");
            }
        }
    }
}

impl<L: LogicHandler> Game for GameSession<L> {
    fn is_game_over(&self) -> bool {
        self.logic.is_game_over()
    }

    fn play_round(&mut self, round: u32) {
        for player in &mut self.players {
            player.handle_mut().add_to_dump(&format!("Round {round}"));
        }
        if self.config.verbose {
            print_round(round);
        }
        self.logic.play_round(round, &mut self.players);
    }

    #[instrument(skip(self))]
    fn finish(&mut self, rounds_played: u32) -> Outcome {
        self.stop_players();

        let outcome = self.outcome(rounds_played);
        info!(winner = outcome.winner_label(), rounds_played, "game finished");
        if self.config.verbose {
            print_outcome(&outcome);
        }

        if let Err(e) = self.save_game(&outcome) {
            error!("{e:#}");
        }
        outcome
    }
}

fn print_round(round: u32) {
    // clear line, green round, start of line
    print!("\x1b[2K\x1b[32mRound {round}...\x1b[39m\x1b[0G");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

fn print_outcome(outcome: &Outcome) {
    let errors = outcome
        .errors
        .iter()
        .map(|(id, n)| format!("#{id}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "\x1b[2K\x1b[32mDone after {} rounds: \x1b[39mwinner {} \x1b[31merrors [{errors}]\x1b[39m",
        outcome.rounds_played,
        outcome.winner_label()
    );
}

//! Players and the handle the engine uses to talk to their bot.

use std::{fmt::Display, hash::Hash, time::Duration};

use crate::{error::TurnError, protocol::EngineMessage};

/// Identifier of a player, unique and stable for the whole game.
pub type PlayerId = u32;

/// Communication channel to one bot.
///
/// The engine only ever has one outstanding [`request_move`](PlayerHandle::request_move) at a
/// time, and never calls two handles concurrently.
pub trait PlayerHandle {
    /// Writes a message to the bot. Failures are not reported here: a bot that cannot be
    /// written to will fail its next `request_move`.
    fn send_command(&mut self, message: &EngineMessage);

    /// Blocks until the bot sends one line, or until the handle's timeout/crash policy gives up.
    ///
    /// # Errors
    /// [`TurnError::NoResponse`] on timeout, [`TurnError::Process`] when the bot is gone.
    fn request_move(&mut self) -> Result<String, TurnError>;

    /// Appends diagnostic text to this player's dump. Must never fail.
    fn add_to_dump(&mut self, text: &str);

    /// Everything written with [`add_to_dump`](PlayerHandle::add_to_dump) so far.
    fn dump(&self) -> &str;

    /// Asks the bot to stop. Best effort, returns immediately.
    fn finish(&mut self);

    /// Waits up to `grace` for the bot to stop after [`finish`](PlayerHandle::finish), then
    /// forces it.
    fn wait(&mut self, grace: Duration) -> anyhow::Result<()>;
}

/// A participant of the game: identity, bot handle and error count.
pub struct Player {
    id: PlayerId,
    name: String,
    handle: Box<dyn PlayerHandle>,
    errors: u32,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

impl Player {
    /// Registers a player with no error.
    pub fn new(id: PlayerId, name: impl Into<String>, handle: Box<dyn PlayerHandle>) -> Player {
        Player {
            id,
            name: name.into(),
            handle,
            errors: 0,
        }
    }

    /// Player identifier.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Errors accumulated so far.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Counts one more error and returns the new total.
    pub fn add_error(&mut self) -> u32 {
        self.errors = self.errors.saturating_add(1);
        self.errors
    }

    /// Bot handle.
    pub fn handle(&self) -> &dyn PlayerHandle {
        self.handle.as_ref()
    }

    /// Bot handle, mutably.
    pub fn handle_mut(&mut self) -> &mut dyn PlayerHandle {
        self.handle.as_mut()
    }
}

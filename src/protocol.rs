//! Line protocol spoken between the engine and the bots.
//!
//! Each turn is strictly request/response: the engine writes a round update followed by an
//! action request, then reads back exactly one line holding the bot's command.
//!
//! ```text
//! settings your_botid 1            (once, before the first round)
//! update game round 3
//! update game move 5
//! update game field .,X,.,O,.,.,.,.,.
//! action move 2000
//! ```
//!
//! The bot answers with the textual form of the game's action, e.g. `place_mark 1 2`.

use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context};

use crate::error::TurnError;

/// State of the game as reported to one player right before it is asked to act.
///
/// Built with the game's own state type, then turned into an [`EngineMessage`], which renders
/// the state once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundUpdateMessage<S = String> {
    /// Current round, starting at 1.
    pub round: u32,
    /// Number the next accepted move will get.
    pub move_number: u32,
    /// Snapshot of the game state.
    pub state: S,
}

impl<S> RoundUpdateMessage<S> {
    /// Snapshot `state` for the given round and move number.
    pub fn new(round: u32, move_number: u32, state: S) -> Self {
        Self {
            round,
            move_number,
            state,
        }
    }
}

impl<S: Display> From<RoundUpdateMessage<S>> for EngineMessage {
    fn from(update: RoundUpdateMessage<S>) -> Self {
        EngineMessage::RoundUpdate(RoundUpdateMessage {
            round: update.round,
            move_number: update.move_number,
            state: update.state.to_string(),
        })
    }
}

/// Everything the engine sends to a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// One setting, sent before the game starts.
    Settings {
        /// Setting name, without whitespace.
        key: String,
        /// Setting value.
        value: String,
    },
    /// Current round, move number and rendered state.
    RoundUpdate(RoundUpdateMessage),
    /// Asks the bot for its command, telling it how long it has.
    ActionRequest {
        /// Time the bot has to answer.
        timeout: Duration,
    },
}

impl EngineMessage {
    /// Convenience constructor for [`EngineMessage::Settings`].
    pub fn setting(key: &str, value: impl Display) -> Self {
        EngineMessage::Settings {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl Display for EngineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineMessage::Settings { key, value } => write!(f, "settings {key} {value}"),
            EngineMessage::RoundUpdate(update) => write!(
                f,
                "update game round {}\nupdate game move {}\nupdate game field {}",
                update.round, update.move_number, update.state
            ),
            EngineMessage::ActionRequest { timeout } => {
                write!(f, "action move {}", timeout.as_millis())
            }
        }
    }
}

impl FromStr for EngineMessage {
    type Err = anyhow::Error;

    /// Parses the text produced by `Display`, i.e. one line, or three for a round update.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines.next().context("empty message")?;
        let mut words = first.splitn(3, ' ');

        match (words.next(), words.next(), words.next()) {
            (Some("settings"), Some(key), Some(value)) => Ok(EngineMessage::setting(key, value)),
            (Some("action"), Some("move"), Some(ms)) => Ok(EngineMessage::ActionRequest {
                timeout: Duration::from_millis(ms.parse().context("invalid timeout")?),
            }),
            (Some("update"), Some("game"), Some(_)) => {
                let round = parse_update(first, "round")?
                    .parse()
                    .context("invalid round number")?;
                let move_number = parse_update(lines.next().context("missing move line")?, "move")?
                    .parse()
                    .context("invalid move number")?;
                let state = parse_update(lines.next().context("missing field line")?, "field")?;
                Ok(EngineMessage::RoundUpdate(RoundUpdateMessage {
                    round,
                    move_number,
                    state: state.to_string(),
                }))
            }
            _ => Err(anyhow!("unknown message '{first}'")),
        }
    }
}

fn parse_update<'a>(line: &'a str, name: &str) -> anyhow::Result<&'a str> {
    let prefix = format!("update game {name} ");
    match line.strip_prefix(&prefix) {
        Some(value) => Ok(value),
        None => bail!("expected 'update game {name}', got '{line}'"),
    }
}

/// What a bot sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<A> {
    /// Play one typed action.
    Act(A),
}

impl<A> Command<A> {
    /// The carried action.
    pub fn action(&self) -> &A {
        match self {
            Command::Act(action) => action,
        }
    }

    /// Consumes the command, returning the action.
    pub fn into_action(self) -> A {
        match self {
            Command::Act(action) => action,
        }
    }
}

impl<A> Command<A>
where
    A: FromStr,
    A::Err: Display,
{
    /// Parses the raw line sent by a bot.
    ///
    /// # Errors
    /// [`TurnError::NoResponse`] for a blank line, [`TurnError::Malformed`] when the action
    /// cannot be parsed.
    pub fn parse(line: &str) -> Result<Self, TurnError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(TurnError::NoResponse);
        }
        line.parse::<A>()
            .map(Command::Act)
            .map_err(|e| TurnError::Malformed {
                line: line.to_string(),
                reason: e.to_string(),
            })
    }
}

impl<A: Display> Display for Command<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_update_is_three_lines() {
        let msg = EngineMessage::from(RoundUpdateMessage::new(3, 5, "x,o,."));
        let text = msg.to_string();
        assert_eq!(
            text,
            "update game round 3\nupdate game move 5\nupdate game field x,o,."
        );
        assert_eq!(text.parse::<EngineMessage>().unwrap(), msg);
    }

    #[test]
    fn action_request_carries_millis() {
        let msg = EngineMessage::ActionRequest {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(msg.to_string(), "action move 1500");
        assert_eq!("action move 1500".parse::<EngineMessage>().unwrap(), msg);
    }

    #[test]
    fn settings_value_may_contain_spaces() {
        let msg: EngineMessage = "settings player_names alice, bob".parse().unwrap();
        assert_eq!(msg, EngineMessage::setting("player_names", "alice, bob"));
    }

    #[test]
    fn unknown_message_is_rejected() {
        assert!("hello there".parse::<EngineMessage>().is_err());
        assert!("update game round 1".parse::<EngineMessage>().is_err());
    }

    #[test]
    fn blank_command_is_no_response() {
        assert_eq!(Command::<u32>::parse("  \n"), Err(TurnError::NoResponse));
    }

    #[test]
    fn unparsable_command_is_malformed() {
        match Command::<u32>::parse("seven") {
            Err(TurnError::Malformed { line, .. }) => assert_eq!(line, "seven"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Command::<u32>::parse(" 7 "), Ok(Command::Act(7)));
    }
}

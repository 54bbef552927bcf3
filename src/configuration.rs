//! Config for the engine behaviors
//!
//! This module provides configuration options for controlling how a game is played.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive: set the value to `"true"` to enable one.
//!
//! - `ARENA_MAX_ROUNDS` — Maximum number of rounds (default: unbounded)
//! - `ARENA_MAX_ERRORS` — Errors after which a player is excluded, `0` for no limit (default: `3`)
//! - `ARENA_ACTION_TIMEOUT_MS` — Time a bot has to answer a move request (default: `2000`)
//! - `ARENA_TURN_DELAY_MS` — Pause before each turn (default: none)
//! - `ARENA_SHUTDOWN_GRACE_MS` — Time each bot gets to exit once the game is over (default: `100`)
//! - `ARENA_VERBOSE` — Print the game progress to stdout (default: `true`)
//! - `ARENA_LOG` — Enable logging to a file (default: `false`)
//! - `ARENA_DEBUG_BOT_STDERR` — Forward bot stderr for debugging (default: `false`)
//! - `ARENA_OUTPUT` — File the result is written to (default: stdout)

use std::{env, path::PathBuf, time::Duration};

use anyhow::bail;

/// Configuration for engine behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) max_rounds: Option<u32>,
    pub(crate) max_errors: Option<u32>,
    pub(crate) action_timeout: Duration,
    pub(crate) turn_delay: Option<Duration>,
    pub(crate) shutdown_grace: Duration,
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) debug_bot_stderr: bool,
    pub(crate) output: Option<PathBuf>,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The number of rounds is unbounded.
    /// - A player is excluded after 3 errors.
    /// - Bots have 2 seconds to answer each move request.
    /// - Turns are played back to back.
    /// - Bots get 100ms to exit once the game is over.
    /// - The game progress is printed to stdout, logging to file is disabled.
    /// - Bot stderr output is discarded.
    /// - The result is printed to stdout.
    pub fn new() -> Self {
        Self {
            max_rounds: None,
            max_errors: Some(3),
            action_timeout: Duration::from_secs(2),
            turn_delay: None,
            shutdown_grace: Duration::from_millis(100),
            verbose: true,
            log: false,
            debug_bot_stderr: false,
            output: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the list of recognized variables. Unset or
    /// unparsable values keep their default.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn parse_u32(var: &str) -> Option<u32> {
            env::var(var).ok()?.trim().parse().ok()
        }

        fn parse_duration_millis(var: &str) -> Option<Duration> {
            env::var(var)
                .ok()?
                .trim()
                .parse::<u64>()
                .ok()
                .map(Duration::from_millis)
        }

        let default = Self::new();
        let max_errors = match parse_u32("ARENA_MAX_ERRORS") {
            Some(0) => None,
            Some(n) => Some(n),
            None => default.max_errors,
        };

        Self {
            max_rounds: parse_u32("ARENA_MAX_ROUNDS"),
            max_errors,
            action_timeout: parse_duration_millis("ARENA_ACTION_TIMEOUT_MS")
                .unwrap_or(default.action_timeout),
            turn_delay: parse_duration_millis("ARENA_TURN_DELAY_MS").filter(|d| !d.is_zero()),
            shutdown_grace: parse_duration_millis("ARENA_SHUTDOWN_GRACE_MS")
                .unwrap_or(default.shutdown_grace),
            verbose: get_env_flag("ARENA_VERBOSE", default.verbose),
            log: get_env_flag("ARENA_LOG", default.log),
            debug_bot_stderr: get_env_flag("ARENA_DEBUG_BOT_STDERR", default.debug_bot_stderr),
            output: env::var_os("ARENA_OUTPUT").map(PathBuf::from),
        }
    }

    /// Set the maximum number of rounds. `None` means unbounded.
    pub fn with_max_rounds(mut self, value: Option<u32>) -> Self {
        self.max_rounds = value;
        self
    }

    /// Set the number of errors after which a player is excluded. `None` disables exclusion.
    pub fn with_max_errors(mut self, value: Option<u32>) -> Self {
        self.max_errors = value;
        self
    }

    /// Set the time a bot has to answer a move request.
    pub fn with_action_timeout(mut self, value: Duration) -> Self {
        self.action_timeout = value;
        self
    }

    /// Set an optional pause before each turn.
    pub fn with_turn_delay(mut self, value: Option<Duration>) -> Self {
        self.turn_delay = value;
        self
    }

    /// Set the time each bot gets to exit once the game is over.
    pub fn with_shutdown_grace(mut self, value: Duration) -> Self {
        self.shutdown_grace = value;
        self
    }

    /// Enable or disable printing of the game progress.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable bot stderr output (debug purposes only).
    pub fn with_debug_bot_stderr(mut self, value: bool) -> Self {
        self.debug_bot_stderr = value;
        self
    }

    /// Write the result to a file instead of stdout.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Maximum number of rounds, if any.
    pub fn max_rounds(&self) -> Option<u32> {
        self.max_rounds
    }

    /// Error limit, if any.
    pub fn max_errors(&self) -> Option<u32> {
        self.max_errors
    }

    /// Time a bot has to answer a move request.
    pub fn action_timeout(&self) -> Duration {
        self.action_timeout
    }

    /// True when events should be logged to a file.
    pub fn log_enabled(&self) -> bool {
        self.log
    }

    /// Checks that the configuration describes a playable game.
    ///
    /// # Errors
    ///
    /// Returned when the action timeout is zero or the error limit is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.action_timeout.is_zero() {
            bail!("action timeout must be greater than zero");
        }
        if self.max_errors == Some(0) {
            bail!("error limit must be at least 1 (use None to disable exclusion)");
        }
        Ok(())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Configuration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_rounds(), None);
        assert_eq!(config.max_errors(), Some(3));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Configuration::new()
            .with_max_rounds(Some(10))
            .with_max_errors(None)
            .with_turn_delay(Some(Duration::from_millis(5)))
            .with_output("/tmp/result.json");
        assert_eq!(config.max_rounds, Some(10));
        assert_eq!(config.max_errors, None);
        assert_eq!(config.turn_delay, Some(Duration::from_millis(5)));
        assert_eq!(config.output, Some(PathBuf::from("/tmp/result.json")));
    }

    #[test]
    fn rejects_unplayable_values() {
        let zero_timeout = Configuration::new().with_action_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let zero_errors = Configuration::new().with_max_errors(Some(0));
        assert!(zero_errors.validate().is_err());
    }
}

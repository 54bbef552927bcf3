use std::{path::Path, process::ExitCode};

use ai_arena::{games::tictactoe::TicTacToe, logger::init_logger, prelude::*};
use anyhow::{bail, Context};

/// Plays tic-tac-toe between two bot executables.
///
/// Usage: `ai-arena "<bot 1 command line>" "<bot 2 command line>"`
///
/// Limits and timeouts are read from `ARENA_*` environment variables.
fn main() -> ExitCode {
    match play() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn play() -> anyhow::Result<()> {
    let mut args = std::env::args();
    let _ = args.next(); // Skip binary name
    let command_lines = args.collect::<Vec<_>>();
    if command_lines.len() != 2 {
        bail!("expected two bot command lines, got {}", command_lines.len());
    }

    let config = Configuration::from_env();
    if config.log_enabled() {
        init_logger()?;
    }

    let mut players = Vec::with_capacity(command_lines.len());
    for (id, command_line) in (1..).zip(&command_lines) {
        let name = bot_name(command_line, id);
        let handle = ProcessHandle::from_command_line(&name, command_line, &config)
            .with_context(|| format!("could not launch bot '{name}'"))?;
        players.push(Player::new(id, name, Box::new(handle)));
    }

    let mut session = GameSession::with_rules(players, TicTacToe::new(), config)?;
    session.run()?;
    println!("Done.");
    Ok(())
}

fn bot_name(command_line: &str, id: PlayerId) -> String {
    let program = command_line
        .split_whitespace()
        .next()
        .and_then(|p| Path::new(p).file_name())
        .and_then(|p| p.to_str())
        .unwrap_or("bot");
    format!("{program}-{id}")
}

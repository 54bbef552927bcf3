//! Where the result of a game goes once it is over.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{configuration::Configuration, session::Outcome};

/// Destination of a finished game's result.
pub trait ResultSink {
    /// Stores `outcome`. Failures are reported to the caller, which decides what to do.
    fn save(&mut self, outcome: &Outcome) -> anyhow::Result<()>;
}

/// Prints `winner: <name>` followed by the played game.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ResultSink for StdoutSink {
    fn save(&mut self, outcome: &Outcome) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "winner: {}", outcome.winner_label()).context("writing winner")?;
        writeln!(out, "{}", outcome.record).context("writing played game")?;
        out.flush().context("flushing stdout")
    }
}

#[derive(Serialize)]
struct ResultDocument<'a> {
    winner: Option<&'a str>,
    rounds: u32,
    errors: &'a [(u32, u32)],
    record: Value,
}

/// Writes the result as a JSON document to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink writing (and overwriting) `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ResultSink for FileSink {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn save(&mut self, outcome: &Outcome) -> anyhow::Result<()> {
        // a record that is not JSON is kept verbatim as a string
        let record = serde_json::from_str(&outcome.record)
            .unwrap_or_else(|_| Value::String(outcome.record.clone()));
        let document = ResultDocument {
            winner: outcome.winner_name.as_deref(),
            rounds: outcome.rounds_played,
            errors: &outcome.errors,
            record,
        };
        let json = serde_json::to_string_pretty(&document).context("serializing result")?;
        fs::write(&self.path, json)
            .with_context(|| format!("could not write result to '{}'", self.path.display()))?;
        info!("result saved");
        Ok(())
    }
}

/// Sink selected by `config`: a [`FileSink`] when an output path is set, stdout otherwise.
pub fn sink_for(config: &Configuration) -> Box<dyn ResultSink> {
    match &config.output {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(StdoutSink),
    }
}

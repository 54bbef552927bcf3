//! [`PlayerHandle`] backed by a bot executable.
//!
//! The bot reads engine messages on its stdin and answers with one line on its stdout. A reader
//! thread forwards stdout lines through a channel, which lets `request_move` wait with a timeout.
//! Lines that are not UTF-8 or longer than [`MAX_LINE_BYTES`] are forwarded as malformed answers,
//! the reader keeps going. The child is killed on drop.

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use tracing::{debug, error, instrument, trace, warn};

use crate::{
    configuration::Configuration, error::TurnError, player::PlayerHandle,
    protocol::EngineMessage,
};

/// Longest answer line accepted from a bot, newline excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

type BotLine = Result<String, TurnError>;

/// A running bot process.
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<BotLine>,
    reader: Option<JoinHandle<()>>,
    timeout: Duration,
    dump: String,
    exited: bool,
}

impl ProcessHandle {
    /// Launches `command` with `args`. Answers are awaited for at most `timeout`.
    ///
    /// The bot's stderr is discarded unless `allow_stderr` is set.
    #[instrument(skip(args))]
    pub fn spawn(
        name: &str,
        command: &str,
        args: &[String],
        timeout: Duration,
        allow_stderr: bool,
    ) -> anyhow::Result<ProcessHandle> {
        let mut cmd = Command::new(command);
        cmd.args(args).stdin(Stdio::piped()).stdout(Stdio::piped());
        if !allow_stderr {
            cmd.stderr(Stdio::null());
        }
        let mut child = cmd
            .spawn()
            .with_context(|| format!("command '{command}' not found"))?;

        let stdin = child.stdin.take().context("bot stdin is not piped")?;
        let stdout = child.stdout.take().context("bot stdout is not piped")?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name(format!("{name}-stdout"))
            .spawn(move || forward_lines(stdout, &tx, MAX_LINE_BYTES))
            .context("could not spawn bot reader thread")?;

        debug!(pid = child.id(), "bot launched");
        Ok(ProcessHandle {
            name: name.to_string(),
            child,
            stdin: Some(stdin),
            lines: rx,
            reader: Some(reader),
            timeout,
            dump: String::new(),
            exited: false,
        })
    }

    /// Launches a whitespace separated command line, taking timeout and stderr policy from
    /// `config`.
    pub fn from_command_line(
        name: &str,
        command_line: &str,
        config: &Configuration,
    ) -> anyhow::Result<ProcessHandle> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let command = words
            .next()
            .ok_or_else(|| anyhow!("empty command line for bot '{name}'"))?;
        let args = words.collect::<Vec<_>>();
        Self::spawn(
            name,
            &command,
            &args,
            config.action_timeout,
            config.debug_bot_stderr,
        )
    }

    /// OS process id of the bot.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Lines the bot sent while nobody was waiting for them (typically late answers).
    fn discard_stale_lines(&mut self) {
        loop {
            match self.lines.try_recv() {
                Ok(line) => {
                    let text = line.unwrap_or_else(|e| e.to_string());
                    trace!(bot = %self.name, line = %text, "discarding stale line");
                    self.add_to_dump(&format!("Ignored late output: {text}"));
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn kill(&mut self) -> anyhow::Result<()> {
        if self.exited {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => {}
            // already exited
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e).context("could not kill bot process"),
        }
        self.child.wait().context("could not reap bot process")?;
        self.exited = true;
        Ok(())
    }
}

/// Sends every line of `output` through `tx` until the bot closes it or nobody listens anymore.
///
/// Lines are read at most `limit` bytes at a time, so a bot never sending a newline cannot grow
/// the buffer without bound.
fn forward_lines(output: impl Read, tx: &Sender<BotLine>, limit: usize) {
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let mut bounded = (&mut reader).take(limit as u64 + 1);
        match bounded.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("stopped reading bot output: {e}");
                break;
            }
        }

        if buf.len() > limit && buf.last() != Some(&b'\n') {
            let line = Err(TurnError::Malformed {
                line: format!("{}...", String::from_utf8_lossy(&buf[..buf.len().min(32)])),
                reason: format!("line longer than {limit} bytes"),
            });
            if tx.send(line).is_err() || skip_rest_of_line(&mut reader).is_err() {
                break;
            }
        } else if tx.send(decode_line(&buf)).is_err() {
            break;
        }
    }
}

fn decode_line(buf: &[u8]) -> BotLine {
    let bytes = buf.strip_suffix(b"\n").unwrap_or(buf);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| TurnError::Malformed {
        line: String::from_utf8_lossy(bytes).trim().to_string(),
        reason: "not valid UTF-8".to_string(),
    })
}

fn skip_rest_of_line(reader: &mut impl BufRead) -> io::Result<()> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

impl PlayerHandle for ProcessHandle {
    fn send_command(&mut self, message: &EngineMessage) {
        if matches!(message, EngineMessage::RoundUpdate(_)) {
            self.discard_stale_lines();
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return;
        };
        let result = writeln!(stdin, "{message}").and_then(|()| stdin.flush());
        if let Err(e) = result {
            warn!(bot = %self.name, "could not write to bot: {e}");
            self.add_to_dump(&format!("Engine warning: could not write to bot: {e}"));
            self.stdin = None;
        }
    }

    fn request_move(&mut self) -> Result<String, TurnError> {
        if self.stdin.is_none() {
            return Err(TurnError::Process("bot input is closed".to_string()));
        }
        match self.lines.recv_timeout(self.timeout) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => Err(TurnError::NoResponse),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TurnError::Process("bot closed its output".to_string()))
            }
        }
    }

    fn add_to_dump(&mut self, text: &str) {
        self.dump.push_str(text);
        self.dump.push('\n');
    }

    fn dump(&self) -> &str {
        &self.dump
    }

    fn finish(&mut self) {
        // closing stdin is the stop signal
        self.stdin = None;
    }

    fn wait(&mut self, grace: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + grace;
        while !self.exited && Instant::now() < deadline {
            if self
                .child
                .try_wait()
                .context("could not poll bot process")?
                .is_some()
            {
                self.exited = true;
                break;
            }
            // at least 10 polls
            thread::sleep(Duration::from_millis(10).min(grace / 10));
        }
        if !self.exited {
            debug!(bot = %self.name, "bot still running after {grace:?}, killing it");
            self.kill()?;
        }
        // a grandchild may still hold stdout open, only join a reader that is done
        if let Some(reader) = self.reader.take() {
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
        Ok(())
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.stdin = None;
        if let Err(e) = self.kill() {
            error!(bot = %self.name, "could not kill bot process on drop: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(bytes: &[u8], limit: usize) -> Vec<BotLine> {
        let (tx, rx) = mpsc::channel();
        forward_lines(Cursor::new(bytes.to_vec()), &tx, limit);
        drop(tx);
        rx.into_iter().collect()
    }

    #[test]
    fn invalid_utf8_line_does_not_stop_the_reader() {
        let lines = read_all(b"place_mark 0 0\r\n\xff\xfe\nplace_mark 1 1\n", 64);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Ok("place_mark 0 0".to_string()));
        assert!(matches!(&lines[1], Err(TurnError::Malformed { reason, .. }) if reason == "not valid UTF-8"));
        assert_eq!(lines[2], Ok("place_mark 1 1".to_string()));
    }

    #[test]
    fn over_long_line_is_malformed_and_skipped() {
        let mut bytes = vec![b'a'; 100];
        bytes.extend_from_slice(b"\nplace_mark 2 2\nlast");
        let lines = read_all(&bytes, 16);

        assert_eq!(lines.len(), 3);
        assert!(matches!(&lines[0], Err(TurnError::Malformed { reason, .. }) if reason.contains("16 bytes")));
        assert_eq!(lines[1], Ok("place_mark 2 2".to_string()));
        assert_eq!(lines[2], Ok("last".to_string()));
    }

    #[test]
    fn line_of_exactly_the_limit_is_accepted() {
        let lines = read_all(b"abcd\nabcde\n", 4);
        assert_eq!(lines[0], Ok("abcd".to_string()));
        assert!(lines[1].is_err());
        assert_eq!(lines.len(), 2);
    }
}

//! In-memory [`PlayerHandle`] replaying a fixed list of answers.
//!
//! Useful to replay a recorded game or to drive the engine without spawning processes.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use crate::{error::TurnError, player::PlayerHandle, protocol::EngineMessage};

/// What a [`ScriptedHandle`] saw during the game.
#[derive(Debug, Default)]
pub struct Transcript {
    /// Every message sent to the bot, in order.
    pub received: Vec<EngineMessage>,
    /// Number of `request_move` calls.
    pub requests: usize,
    /// Set once `finish` was called.
    pub finished: bool,
}

/// Bot stand-in answering each move request with the next scripted reply.
///
/// Once the script is exhausted, every request fails with [`TurnError::NoResponse`].
#[derive(Debug)]
pub struct ScriptedHandle {
    replies: VecDeque<Result<String, TurnError>>,
    transcript: Rc<RefCell<Transcript>>,
    dump: String,
}

impl ScriptedHandle {
    /// Handle answering with `replies`, in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Handle answering with `replies`, where an `Err` simulates a timeout or crash.
    pub fn with_results(replies: impl IntoIterator<Item = Result<String, TurnError>>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            transcript: Rc::new(RefCell::new(Transcript::default())),
            dump: String::new(),
        }
    }

    /// Shared view on what the handle saw, still readable after the handle is boxed.
    pub fn transcript(&self) -> Rc<RefCell<Transcript>> {
        Rc::clone(&self.transcript)
    }
}

impl PlayerHandle for ScriptedHandle {
    fn send_command(&mut self, message: &EngineMessage) {
        self.transcript.borrow_mut().received.push(message.clone());
    }

    fn request_move(&mut self) -> Result<String, TurnError> {
        self.transcript.borrow_mut().requests += 1;
        self.replies.pop_front().unwrap_or(Err(TurnError::NoResponse))
    }

    fn add_to_dump(&mut self, text: &str) {
        self.dump.push_str(text);
        self.dump.push('\n');
    }

    fn dump(&self) -> &str {
        &self.dump
    }

    fn finish(&mut self) {
        self.transcript.borrow_mut().finished = true;
    }

    fn wait(&mut self, _grace: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_in_order_then_times_out() {
        let mut handle = ScriptedHandle::new(["a", "b"]);
        let transcript = handle.transcript();
        assert_eq!(handle.request_move(), Ok("a".to_string()));
        assert_eq!(handle.request_move(), Ok("b".to_string()));
        assert_eq!(handle.request_move(), Err(TurnError::NoResponse));
        assert_eq!(transcript.borrow().requests, 3);
    }

    #[test]
    fn records_messages_and_dump() {
        let mut handle = ScriptedHandle::new(Vec::<String>::new());
        let transcript = handle.transcript();
        handle.send_command(&EngineMessage::setting("your_botid", 1));
        handle.add_to_dump("Round 1");
        handle.finish();
        assert_eq!(handle.dump(), "Round 1\n");
        assert_eq!(transcript.borrow().received.len(), 1);
        assert!(transcript.borrow().finished);
    }
}

//! Per-game one-shot timer scheduling.
//!
//! Timers are keyed by purpose within a game; scheduling over an
//! existing purpose replaces the pending timer, so at most one timer per
//! (game, purpose) is ever outstanding. Firings are delivered as
//! messages through the game's own inbox, which keeps the actor the
//! single mutation path: client-facing code never touches the bank.

use super::messages::GameMessage;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a pending timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Countdown expiry: countdown -> active.
    Countdown,
    /// Next automatic draw.
    Calling,
    /// Post-game reset: finished -> waiting.
    Reset,
}

/// One game's pending timers.
pub struct TimerBank {
    inbox: mpsc::Sender<GameMessage>,
    pending: HashMap<TimerPurpose, JoinHandle<()>>,
}

impl TimerBank {
    pub fn new(inbox: mpsc::Sender<GameMessage>) -> Self {
        Self {
            inbox,
            pending: HashMap::new(),
        }
    }

    /// Schedules `purpose` to fire after `delay`, cancelling any pending
    /// timer with the same purpose first.
    pub fn schedule(&mut self, purpose: TimerPurpose, delay: Duration) {
        self.cancel(purpose);
        let inbox = self.inbox.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(GameMessage::TimerFired(purpose)).await;
        });
        self.pending.insert(purpose, handle);
    }

    /// Cancels the pending timer for `purpose`, if any.
    pub fn cancel(&mut self, purpose: TimerPurpose) {
        if let Some(handle) = self.pending.remove(&purpose) {
            handle.abort();
        }
    }

    /// Cancels every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerBank {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

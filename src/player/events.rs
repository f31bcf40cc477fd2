//! Events processed by the controller's queue.
//!
//! Timers and network requests run as spawned tasks and report back here, so
//! the controller is only ever mutated by whoever drains the queue.

use crate::audio::AudioEvent;
use crate::error::Result;
use crate::models::Track;

/// Work item for [`super::PlayerController::handle`].
#[derive(Debug)]
pub enum Event {
    /// Notification from the audio sink, stamped with its source generation.
    Audio { source: u64, event: AudioEvent },
    /// Debounce window for a typed query elapsed.
    SearchDue { generation: u64, query: String },
    /// A search request finished.
    SearchFinished {
        token: u64,
        query: String,
        result: Result<Vec<Track>>,
    },
    /// A liked-list read or mutation finished with the backend's list.
    LikedFinished {
        request: LikedRequest,
        result: Result<Vec<Track>>,
    },
    /// Retry delay after a rejected play elapsed.
    RetryPlay { attempt: u64 },
}

impl Event {
    /// Whether this event completes a task the controller spawned.
    pub(crate) fn is_spawned_completion(&self) -> bool {
        !matches!(self, Event::Audio { .. })
    }
}

/// Which liked-list request a [`Event::LikedFinished`] answers.
///
/// Reads and mutations are tracked separately so a read never overrides the
/// backend's answer to a like or unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikedRequest {
    /// `GET /api/liked`. `writes_seen` is the latest mutation token when the
    /// read was sent.
    Read { token: u64, writes_seen: u64 },
    /// Like or unlike.
    Write { token: u64 },
}

/// Monotonic counter; only the most recently issued value is current.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RequestTokens {
    latest: u64,
}

impl RequestTokens {
    /// Issue a new token, invalidating all earlier ones.
    pub(crate) fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub(crate) fn is_current(&self, token: u64) -> bool {
        token == self.latest
    }

    pub(crate) fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_token_is_current() {
        let mut tokens = RequestTokens::default();
        let first = tokens.issue();
        let second = tokens.issue();
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        tokens.issue();
        assert!(!tokens.is_current(second));
    }
}

//! User-facing notifications.
//!
//! Store operations emit [`Notice`] values on a bounded channel with
//! best-effort `try_send`; the UI drains them into a [`NoticeBoard`] that
//! expires each entry after a fixed lifetime.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub message: String,
}

impl Notice {
    /// A success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// An error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sending half used by components that raise notices.
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: mpsc::Sender<Notice>,
}

impl NoticeSender {
    /// Creates a sender/receiver pair with room for `buffer` pending notices.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Emits a notice. Dropped silently if the channel is full or closed.
    pub fn notify(&self, notice: Notice) {
        if let Err(err) = self.tx.try_send(notice) {
            tracing::debug!(error = %err, "notice dropped");
        }
    }

    /// Emits a success notice.
    pub fn success(&self, message: impl Into<String>) {
        self.notify(Notice::success(message));
    }

    /// Emits an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.notify(Notice::error(message));
    }
}

/// Currently visible notices, newest last.
#[derive(Debug)]
pub struct NoticeBoard {
    lifetime: Duration,
    capacity: usize,
    entries: VecDeque<(Instant, Notice)>,
}

impl NoticeBoard {
    /// Creates a board showing at most `capacity` notices, each for
    /// `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration, capacity: usize) -> Self {
        Self {
            lifetime,
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Adds a notice shown from `now`.
    pub fn push_at(&mut self, notice: Notice, now: Instant) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((now, notice));
    }

    /// Adds a notice shown from the current instant.
    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    /// Moves every pending notice from `rx` onto the board.
    pub fn drain(&mut self, rx: &mut mpsc::Receiver<Notice>) {
        while let Ok(notice) = rx.try_recv() {
            self.push(notice);
        }
    }

    /// Drops notices older than the lifetime.
    pub fn expire_at(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.entries
            .retain(|(shown, _)| now.saturating_duration_since(*shown) < lifetime);
    }

    /// Drops notices older than the lifetime, measured from now.
    pub fn expire(&mut self) {
        self.expire_at(Instant::now());
    }

    /// Visible notices, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter().map(|(_, n)| n)
    }

    /// Whether nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

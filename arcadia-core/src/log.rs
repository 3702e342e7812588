//! The player-facing game log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a log line, used by the presentation layer for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    Info,
    Combat,
    Narrative,
    Roll,
}

/// A single line of the game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub message: String,
    pub kind: LogKind,
    /// Campaign clock time at which the entry was written.
    pub timestamp_ms: u64,
}

/// Append-only log. Entries keep emission order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    now_ms: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clock used to stamp subsequent entries.
    pub fn set_clock(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    /// Append an entry stamped with the current clock.
    ///
    /// Ids are random v4 UUIDs and do not follow the dice seed; two seeded
    /// runs agree on messages and timestamps but not on ids.
    pub fn push(&mut self, message: impl Into<String>, kind: LogKind) {
        self.entries.push(LogEntry {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            timestamp_ms: self.now_ms,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Info);
    }

    pub fn combat(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Combat);
    }

    pub fn narrative(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Narrative);
    }

    pub fn roll(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Roll);
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries written at or after `index`, for incremental rendering.
    pub fn since(&self, index: usize) -> &[LogEntry] {
        self.entries.get(index..).unwrap_or(&[])
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(text))
    }
}

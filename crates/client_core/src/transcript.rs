//! Append-only chat/system history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::domain::TranscriptOrigin;
use uuid::Uuid;

pub const CONNECTED_NOTICE: &str = "Conectado al servidor";
pub const DISCONNECTED_NOTICE: &str = "Desconectado del servidor";
pub const CONNECTION_ERROR_NOTICE: &str = "Error de conexión";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub origin: TranscriptOrigin,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// An entry that has been decided on but not yet stamped into a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptNote {
    pub origin: TranscriptOrigin,
    pub content: String,
}

impl TranscriptNote {
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            origin: TranscriptOrigin::Ai,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        origin: TranscriptOrigin,
        content: impl Into<String>,
    ) -> TranscriptEntry {
        self.append_at(origin, content, Utc::now())
    }

    /// Timestamps never run backwards: a clock step back is clamped to the
    /// previous entry's time.
    pub(crate) fn append_at(
        &mut self,
        origin: TranscriptOrigin,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> TranscriptEntry {
        let timestamp = match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        let entry = TranscriptEntry {
            id: Uuid::new_v4(),
            origin,
            content: content.into(),
            timestamp,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/transcript_tests.rs"]
mod tests;

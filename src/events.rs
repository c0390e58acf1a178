//! Append-only event log: the visual "minutes" of the match.
//!
//! Entries are either tagged textual notes or captured images with an
//! optional caption. Insertion order is the match timeline; entries are
//! never edited or reordered. The log is cleared only by a successful
//! match-end export or an explicit reset.

use crate::capture::ImageData;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tag for a textual note entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NoteKind {
    /// A goal attributed to a roster player.
    Goal,
    /// A point conceded without attribution.
    LostPoint,
    /// A completed substitution.
    Substitution,
    /// A confirmed formation change.
    FormationChange,
}

/// One entry in the match timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    /// A tagged textual note.
    Note {
        /// What kind of event the note records.
        kind: NoteKind,
        /// Human-readable description.
        text: String,
    },
    /// A captured board image.
    Capture {
        /// Optional caption drawn above the image in the export.
        label: Option<String>,
        /// The captured image, opaque to the engine.
        image: ImageData,
    },
}

/// Ordered, append-only record of notable match events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a note, returning the committed entry index.
    pub fn append_note(&mut self, kind: NoteKind, text: impl Into<String>) -> usize {
        let text = text.into();
        debug!(%kind, %text, "log note");
        self.entries.push(LogEntry::Note { kind, text });
        self.entries.len() - 1
    }

    /// Appends a captured image, returning the committed entry index.
    ///
    /// The returned index doubles as the acknowledgment the export pipeline
    /// awaits before compositing: once `append_capture` returns, the entry
    /// is part of the timeline.
    pub fn append_capture(&mut self, label: Option<String>, image: ImageData) -> usize {
        debug!(label = label.as_deref().unwrap_or(""), "log capture");
        self.entries.push(LogEntry::Capture { label, image });
        self.entries.len() - 1
    }

    /// Entries in timeline order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries have been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the log. Called on successful export or explicit reset.
    pub fn reset(&mut self) {
        debug!(discarded = self.entries.len(), "log reset");
        self.entries.clear();
    }
}

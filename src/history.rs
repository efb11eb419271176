use chrono::Local;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide, strictly increasing. Two entries created in the same clock
/// tick still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn next() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Local wall-clock time the way a browser prints `toLocaleTimeString`.
pub fn local_time_string() -> String {
    Local::now().format("%-I:%M:%S %p").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    id: EntryId,
    text: String,
    model: String,
    timestamp: String,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>, model: impl Into<String>, timestamp: impl Into<String>) -> Self {
        HistoryEntry {
            id: EntryId::next(),
            text: text.into(),
            model: model.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn stamped_now(text: impl Into<String>, model: impl Into<String>) -> Self {
        HistoryEntry::new(text, model, local_time_string())
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Somewhere to put copied text. Writes are fire-and-forget.
pub trait ClipboardSink {
    fn write_text(&mut self, text: String);
}

/// Completed descriptions, newest first. Unbounded and in-memory only.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
    }

    pub fn all(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best-effort; an unknown id is ignored.
    pub fn copy_text(&self, id: EntryId, sink: &mut dyn ClipboardSink) {
        match self.get(id) {
            Some(entry) => sink.write_text(entry.text.clone()),
            None => debug!(id = id.get(), "Copy requested for unknown history entry"),
        }
    }
}

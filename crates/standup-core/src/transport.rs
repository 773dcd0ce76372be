//! Boundary to the chat platform.
//!
//! The engine only needs two outbound calls: keep one summary display up to
//! date and post plain announcements. Inbound events arrive through
//! [`crate::engine::Engine::deliver_event`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::render::SummaryDocument;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The referenced display no longer exists.
    #[error("display not found: {0}")]
    NotFound(String),

    #[error("transport returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a display in `channel` when `display_ref` is `None`, otherwise
    /// edit it in place. A display that was deleted externally is replaced
    /// by a fresh one. Returns the ref now holding the document.
    async fn upsert_display(
        &self,
        channel: &str,
        display_ref: Option<&str>,
        document: &SummaryDocument,
    ) -> Result<String, TransportError>;

    async fn post_announcement(&self, channel: &str, text: &str) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
    pub channel: String,
    pub document: SummaryDocument,
    pub edits: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub channel: String,
    pub text: String,
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    displays: BTreeMap<String, DisplayRecord>,
    announcements: Vec<Announcement>,
    failing: bool,
}

/// In-process transport that records everything it is asked to show.
#[derive(Default)]
pub struct MemoryTransport {
    inner: Mutex<MemoryInner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every following call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn displays(&self) -> BTreeMap<String, DisplayRecord> {
        self.lock().displays.clone()
    }

    pub fn display(&self, display_ref: &str) -> Option<DisplayRecord> {
        self.lock().displays.get(display_ref).cloned()
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.lock().announcements.clone()
    }

    /// Simulate someone deleting the display in the chat client.
    pub fn remove_display(&self, display_ref: &str) -> bool {
        self.lock().displays.remove(display_ref).is_some()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn upsert_display(
        &self,
        channel: &str,
        display_ref: Option<&str>,
        document: &SummaryDocument,
    ) -> Result<String, TransportError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(TransportError::Request("memory transport offline".into()));
        }
        if let Some(existing) = display_ref.and_then(|r| inner.displays.get_mut(r)) {
            existing.document = document.clone();
            existing.edits += 1;
            return Ok(display_ref.unwrap_or_default().to_string());
        }
        inner.next_id += 1;
        let id = format!("display-{}", inner.next_id);
        inner.displays.insert(
            id.clone(),
            DisplayRecord {
                channel: channel.to_string(),
                document: document.clone(),
                edits: 0,
            },
        );
        Ok(id)
    }

    async fn post_announcement(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(TransportError::Request("memory transport offline".into()));
        }
        inner.announcements.push(Announcement {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SummaryCounts;

    fn doc(title: &str) -> SummaryDocument {
        SummaryDocument {
            title: title.into(),
            description: String::new(),
            fields: Vec::new(),
            footer: String::new(),
            counts: SummaryCounts {
                total: 0,
                participated: 0,
                pending: 0,
            },
            participated: Vec::new(),
            pending: Vec::new(),
        }
    }

    #[tokio::test]
    async fn upsert_edits_existing_display_in_place() {
        let t = MemoryTransport::new();
        let r = t.upsert_display("ch", None, &doc("one")).await.unwrap();
        let again = t.upsert_display("ch", Some(&r), &doc("two")).await.unwrap();
        assert_eq!(r, again);
        assert_eq!(t.displays().len(), 1);
        let record = t.display(&r).unwrap();
        assert_eq!(record.document.title, "two");
        assert_eq!(record.edits, 1);
    }

    #[tokio::test]
    async fn deleted_display_is_recreated() {
        let t = MemoryTransport::new();
        let r = t.upsert_display("ch", None, &doc("one")).await.unwrap();
        assert!(t.remove_display(&r));
        let fresh = t.upsert_display("ch", Some(&r), &doc("two")).await.unwrap();
        assert_ne!(r, fresh);
        assert_eq!(t.displays().len(), 1);
    }

    #[tokio::test]
    async fn failing_transport_records_nothing() {
        let t = MemoryTransport::new();
        t.set_failing(true);
        assert!(t.upsert_display("ch", None, &doc("x")).await.is_err());
        assert!(t.post_announcement("ch", "hi").await.is_err());
        assert!(t.displays().is_empty());
        assert!(t.announcements().is_empty());
    }
}

//! Page metadata (title, description, preview image) shared between the manga
//! reader, which writes it, and the layout shell, which reads it.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

/// Owned by the composition root; hands out the two halves.
///
/// Only the crate can mint writers, so outside code can observe but never publish:
///
/// ```compile_fail
/// let ctx = weebixx::metadata::MetadataContext::new();
/// let _writer = ctx.writer();
/// ```
#[derive(Debug)]
pub struct MetadataContext {
    tx: Arc<watch::Sender<PageMetadata>>,
}

impl Default for MetadataContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PageMetadata::default());
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn writer(&self) -> MetadataWriter {
        MetadataWriter { tx: self.tx.clone() }
    }

    pub fn reader(&self) -> MetadataReader {
        MetadataReader { rx: self.tx.subscribe() }
    }
}

/// Write-only handle. Not `Clone`: one per owning screen.
#[derive(Debug)]
pub struct MetadataWriter {
    tx: Arc<watch::Sender<PageMetadata>>,
}

impl MetadataWriter {
    pub fn publish(&self, meta: PageMetadata) {
        self.tx.send_if_modified(|current| {
            if *current == meta {
                return false;
            }
            *current = meta;
            true
        });
    }
}

/// Read-only handle for the layout shell.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    rx: watch::Receiver<PageMetadata>,
}

impl MetadataReader {
    pub fn current(&self) -> PageMetadata {
        self.rx.borrow().clone()
    }

    /// Whether a publish happened since the last `current_if_changed`.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn current_if_changed(&mut self) -> Option<PageMetadata> {
        if !self.has_changed() {
            return None;
        }
        Some(self.rx.borrow_and_update().clone())
    }
}

//! Batch document analysis.
//!
//! The controller owns an upload queue of documents. Each run analyses the
//! documents that were pending when it started, strictly one at a time, and a
//! failure on one document never stops the rest. Completed analyses can then
//! be merged into one comparative synthesis.
//!
//! Items may be removed at any moment, including while their analysis is in
//! flight. The collection lock is never held across a file read or remote
//! call; every step re-checks that its item still exists, and a late result
//! for a removed item is dropped and reported as [`BatchEvent::Discarded`].

use crate::client::InlineData;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::preset::CitationStandard;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, instrument, warn};

/// Message stored on an item whose analysis failed.
pub const ITEM_FAILURE_MESSAGE: &str = "failed to process file";

const EVENT_CAPACITY: usize = 256;

/// Where the bytes of a document live.
#[derive(Debug, Clone)]
pub enum DocumentBlob {
    /// File on disk, read when the item is processed
    Disk(PathBuf),
    /// Bytes already in memory
    Memory(Arc<[u8]>),
}

/// A document selected for analysis.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    /// Display name
    pub name: String,
    /// Media type sent with the encoded content
    pub media_type: String,
    blob: DocumentBlob,
}

impl DocumentFile {
    /// References a file on disk, guessing its media type from the extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            name,
            media_type,
            blob: DocumentBlob::Disk(path.to_path_buf()),
        }
    }

    /// Wraps bytes already in memory.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            blob: DocumentBlob::Memory(bytes.into()),
        }
    }

    /// Where the content lives.
    #[must_use]
    pub const fn blob(&self) -> &DocumentBlob {
        &self.blob
    }

    /// Loads the content.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a disk-backed file cannot be read.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match &self.blob {
            DocumentBlob::Disk(path) => tokio::fs::read(path)
                .await
                .map_err(|e| Error::io(path.clone(), e)),
            DocumentBlob::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Processing state of one uploaded document.
///
/// The analysis text and the error message live inside the variants, so an
/// item carries a result exactly when it is done and an error exactly when it
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the next run
    Pending,
    /// Content being loaded and encoded
    Reading,
    /// Remote analysis in flight
    Analyzing,
    /// Analysis finished
    Done(String),
    /// Analysis failed
    Error(String),
}

impl ItemStatus {
    /// Short machine-readable name.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reading => "reading",
            Self::Analyzing => "analyzing",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }

    /// Returns true once the item reached `done` or `error`.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }
}

/// One document in the upload queue.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Locally unique identifier
    pub id: String,
    /// The document
    pub file: DocumentFile,
    /// Current state
    pub status: ItemStatus,
    completed_seq: Option<u64>,
}

impl UploadItem {
    pub(crate) fn new(file: DocumentFile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            file,
            status: ItemStatus::Pending,
            completed_seq: None,
        }
    }

    /// The analysis text, when done.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Done(text) => Some(text),
            _ => None,
        }
    }

    /// The failure message, when failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Notification published for every change of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A document joined the queue
    Enqueued {
        /// Item id
        id: String,
    },
    /// An item changed state
    StatusChanged {
        /// Item id
        id: String,
        /// New state
        status: ItemStatus,
    },
    /// An item left the queue
    Removed {
        /// Item id
        id: String,
    },
    /// A step finished for an item that had been removed; its result was dropped
    Discarded {
        /// Item id
        id: String,
    },
    /// A new synthesis is available
    Consolidated,
}

/// Counts for one processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Items that reached `done` or `error`
    pub processed: usize,
    /// Items that reached `done`
    pub succeeded: usize,
    /// Items that reached `error`
    pub failed: usize,
    /// Late results dropped because their item was removed
    pub discarded: usize,
}

enum StepOutcome {
    Done,
    Failed,
    Discarded,
    Skipped,
}

#[derive(Default)]
struct BatchState {
    items: Vec<UploadItem>,
    standard: CitationStandard,
    synthesis: Option<String>,
    next_seq: u64,
}

impl BatchState {
    fn find_mut(&mut self, id: &str) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

/// Marks a run as active for as long as it lives.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::BatchInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Subscription to a controller's [`BatchEvent`]s.
///
/// A subscriber that falls behind loses the oldest events but keeps
/// receiving newer ones.
#[derive(Debug)]
pub struct BatchEvents {
    rx: broadcast::Receiver<BatchEvent>,
}

impl BatchEvents {
    /// Next event, or `None` once the controller is gone.
    pub async fn next(&mut self) -> Option<BatchEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Batch event subscriber fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Upload queue with sequential analysis and consolidation.
pub struct BatchController {
    gateway: Arc<Gateway>,
    state: Mutex<BatchState>,
    running: AtomicBool,
    events: broadcast::Sender<BatchEvent>,
}

impl BatchController {
    /// Creates an empty queue using `standard` for new analyses.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, standard: CitationStandard) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            state: Mutex::new(BatchState {
                standard,
                ..BatchState::default()
            }),
            running: AtomicBool::new(false),
            events,
        }
    }

    /// Receives every subsequent [`BatchEvent`].
    #[must_use]
    pub fn subscribe(&self) -> BatchEvents {
        BatchEvents {
            rx: self.events.subscribe(),
        }
    }

    fn publish(&self, event: BatchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Appends documents as pending items, in the given order.
    pub async fn enqueue(&self, files: impl IntoIterator<Item = DocumentFile>) -> Vec<String> {
        let new_items: Vec<UploadItem> = files.into_iter().map(UploadItem::new).collect();
        let ids: Vec<String> = new_items.iter().map(|item| item.id.clone()).collect();

        self.state.lock().await.items.extend(new_items);

        for id in &ids {
            self.publish(BatchEvent::Enqueued { id: id.clone() });
        }
        debug!(count = ids.len(), "Enqueued documents");
        ids
    }

    /// Removes an item in any state. Returns false if the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.state.lock().await;
            let before = state.items.len();
            state.items.retain(|item| item.id != id);
            state.items.len() != before
        };

        if removed {
            self.publish(BatchEvent::Removed { id: id.to_string() });
        }
        removed
    }

    /// Drops every item that is done or failed. Returns how many were removed.
    pub async fn clear_finished(&self) -> usize {
        let removed: Vec<String> = {
            let mut state = self.state.lock().await;
            let (finished, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.items)
                .into_iter()
                .partition(|item| item.status.is_finished());
            state.items = kept;
            finished.into_iter().map(|item| item.id).collect()
        };

        for id in &removed {
            self.publish(BatchEvent::Removed { id: id.clone() });
        }
        removed.len()
    }

    /// Snapshot of the queue in insertion order.
    pub async fn items(&self) -> Vec<UploadItem> {
        self.state.lock().await.items.clone()
    }

    /// Snapshot of one item.
    pub async fn item(&self, id: &str) -> Option<UploadItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Results of all done items, in the order they completed.
    pub async fn completed_results(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut done: Vec<(u64, String)> = state
            .items
            .iter()
            .filter_map(|item| Some((item.completed_seq?, item.result()?.to_string())))
            .collect();
        done.sort_by_key(|(seq, _)| *seq);
        done.into_iter().map(|(_, text)| text).collect()
    }

    /// The latest synthesis, if one was produced.
    pub async fn synthesis(&self) -> Option<String> {
        self.state.lock().await.synthesis.clone()
    }

    /// Citation standard used for analyses started from now on.
    pub async fn standard(&self) -> CitationStandard {
        self.state.lock().await.standard
    }

    /// Changes the citation standard for analyses started from now on.
    pub async fn set_standard(&self, standard: CitationStandard) {
        self.state.lock().await.standard = standard;
    }

    /// Analyses every item that is pending now, one at a time.
    ///
    /// Items enqueued while the run is in progress stay pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchInProgress`] if another run is active. Per-item
    /// failures never fail the run; they are recorded on the item.
    #[instrument(skip(self))]
    pub async fn process_pending(&self) -> Result<BatchSummary> {
        let _guard = RunGuard::acquire(&self.running)?;

        let pending: Vec<String> = {
            let state = self.state.lock().await;
            state
                .items
                .iter()
                .filter(|item| item.status == ItemStatus::Pending)
                .map(|item| item.id.clone())
                .collect()
        };

        info!(count = pending.len(), "Processing pending documents");

        let mut summary = BatchSummary::default();
        for id in pending {
            match self.process_item(&id).await {
                StepOutcome::Done => {
                    summary.processed += 1;
                    summary.succeeded += 1;
                }
                StepOutcome::Failed => {
                    summary.processed += 1;
                    summary.failed += 1;
                }
                StepOutcome::Discarded => summary.discarded += 1,
                StepOutcome::Skipped => {}
            }
        }

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            discarded = summary.discarded,
            "Batch finished"
        );
        Ok(summary)
    }

    async fn process_item(&self, id: &str) -> StepOutcome {
        let (file, standard) = {
            let mut state = self.state.lock().await;
            let standard = state.standard;
            let Some(item) = state.find_mut(id) else {
                return StepOutcome::Skipped;
            };
            if item.status != ItemStatus::Pending {
                return StepOutcome::Skipped;
            }
            item.status = ItemStatus::Reading;
            (item.file.clone(), standard)
        };
        self.publish(BatchEvent::StatusChanged {
            id: id.to_string(),
            status: ItemStatus::Reading,
        });
        info!(id, name = file.name.as_str(), "Reading document");

        let document = match file.read().await {
            Ok(bytes) => InlineData::encode(file.media_type.clone(), &bytes),
            Err(e) => {
                warn!(id, error = %e, "Could not read document");
                return self.finish(id, Err(e)).await;
            }
        };

        {
            let mut state = self.state.lock().await;
            let Some(item) = state.find_mut(id) else {
                return self.discard(id);
            };
            item.status = ItemStatus::Analyzing;
        }
        self.publish(BatchEvent::StatusChanged {
            id: id.to_string(),
            status: ItemStatus::Analyzing,
        });

        let outcome = self.gateway.analyze_document(document, standard).await;
        self.finish(id, outcome).await
    }

    async fn finish(&self, id: &str, outcome: Result<String>) -> StepOutcome {
        let (status, step) = {
            let mut state = self.state.lock().await;
            let seq = state.next_seq;
            state.next_seq += 1;
            let Some(item) = state.find_mut(id) else {
                return self.discard(id);
            };

            match outcome {
                Ok(text) => {
                    item.status = ItemStatus::Done(text);
                    item.completed_seq = Some(seq);
                    (item.status.clone(), StepOutcome::Done)
                }
                Err(e) => {
                    warn!(id, error = %e, "Document analysis failed");
                    item.status = ItemStatus::Error(ITEM_FAILURE_MESSAGE.to_string());
                    (item.status.clone(), StepOutcome::Failed)
                }
            }
        };

        self.publish(BatchEvent::StatusChanged {
            id: id.to_string(),
            status,
        });
        step
    }

    fn discard(&self, id: &str) -> StepOutcome {
        debug!(id, "Item removed while in flight; dropping its result");
        self.publish(BatchEvent::Discarded { id: id.to_string() });
        StepOutcome::Discarded
    }

    /// Merges all done analyses, in completion order, into one synthesis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotConsolidate`] with fewer than two done items
    /// (no remote call is made) and [`Error::Generation`] if the remote
    /// call fails.
    #[instrument(skip(self))]
    pub async fn consolidate(&self) -> Result<String> {
        let analyses = self.completed_results().await;
        info!(count = analyses.len(), "Consolidating analyses");

        let synthesis = self.gateway.consolidate(&analyses).await?;

        self.state.lock().await.synthesis = Some(synthesis.clone());
        self.publish(BatchEvent::Consolidated);
        Ok(synthesis)
    }
}

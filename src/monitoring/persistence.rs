//! Optional durable write-through
//!
//! Writes are fire-and-forget: callers hand records to a [`PersistenceWriter`], which
//! queues them on a bounded channel drained by a background task. A full queue or a
//! failing sink is logged and never reported to the in-memory operation.

use crate::monitoring::alerts::{Alert, EscalationState};
use crate::monitoring::handoff::HandoffRecord;
use crate::monitoring::stats::Sample;
use crate::utils::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A record shadowing an in-memory state change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PersistRecord {
    Sample(Sample),
    Handoff(HandoffRecord),
    Alert(Alert),
    Escalation(EscalationState),
}

impl PersistRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            PersistRecord::Sample(_) => "sample",
            PersistRecord::Handoff(_) => "handoff",
            PersistRecord::Alert(_) => "alert",
            PersistRecord::Escalation(_) => "escalation",
        }
    }
}

/// Durable store capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Write one record
    async fn persist(&self, record: &PersistRecord) -> Result<()>;
}

/// Append-only JSON lines file
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
    file: TokioMutex<Option<tokio::fs::File>>,
}

impl JsonlFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: TokioMutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<tokio::fs::File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                SentinelError::persistence(format!(
                    "Failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        Ok(file)
    }
}

#[async_trait::async_trait]
impl PersistenceSink for JsonlFileSink {
    async fn persist(&self, record: &PersistRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }

        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(&line).await {
                // Reopen on the next write
                *guard = None;
                return Err(SentinelError::persistence(format!(
                    "Failed to append to {}: {}",
                    self.path.display(),
                    e
                )));
            }
            file.flush().await?;
        }

        Ok(())
    }
}

/// Handle used by components to submit records
#[derive(Debug, Clone, Default)]
pub struct PersistenceWriter {
    sender: Option<mpsc::Sender<PersistRecord>>,
    dropped: Arc<AtomicU64>,
}

impl PersistenceWriter {
    /// A writer that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Spawn the drain task for a sink.
    ///
    /// The task exits once every writer clone is dropped, or when `shutdown`
    /// flips to `true`, after flushing what is already queued.
    pub fn spawn(
        sink: Arc<dyn PersistenceSink>,
        buffer_size: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<PersistRecord>(buffer_size.max(1));

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    record = receiver.recv() => match record {
                        Some(record) => write_record(sink.as_ref(), &record).await,
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            receiver.close();
                            while let Some(record) = receiver.recv().await {
                                write_record(sink.as_ref(), &record).await;
                            }
                            break;
                        }
                    }
                }
            }
            debug!("Persistence writer stopped");
        });

        (
            Self {
                sender: Some(sender),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            handle,
        )
    }

    /// Whether records go anywhere
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue a record without waiting
    pub fn submit(&self, record: PersistRecord) {
        let Some(sender) = &self.sender else {
            return;
        };

        if let Err(e) = sender.try_send(record) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let kind = match &e {
                mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => {
                    r.kind()
                }
            };
            warn!("Dropping {} persistence record: {}", kind, e);
        }
    }

    /// Records that could not be queued
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn write_record(sink: &dyn PersistenceSink, record: &PersistRecord) {
    if let Err(e) = sink.persist(record).await {
        warn!("Failed to persist {} record: {}", record.kind(), e);
    }
}

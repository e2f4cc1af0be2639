//! Durable persistence for the monitor's event stream.
//!
//! Everything the engine keeps about an input on disk is the classified
//! record: timestamp, category, severity, and a content fingerprint.  Raw
//! payloads never reach the log.  Alerts are interleaved into the same
//! stream, so replaying the file shows exactly what the monitor saw and
//! when it escalated.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use evasion_scanner::Severity;

use crate::event::{Alert, SecurityEvent};

/// Submission queue depth between producers and the drain task.
const QUEUE_DEPTH: usize = 1024;

/// Upper bound on how many queued records are appended before a flush.
const BATCH_LIMIT: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("could not open event log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not append to event log: {0}")]
    Append(std::io::Error),

    #[error("could not encode log record: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// LogRecord
// ---------------------------------------------------------------------------

/// One line of the on-disk log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    /// A classified input, reduced to its monitoring fields.
    Event {
        timestamp: DateTime<Utc>,
        category: String,
        severity: Severity,
        fingerprint: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
    },
    /// A threshold crossing, written at the position it fired.
    Alert {
        timestamp: DateTime<Utc>,
        category: String,
        count: usize,
    },
}

impl From<&SecurityEvent> for LogRecord {
    fn from(event: &SecurityEvent) -> Self {
        Self::Event {
            timestamp: event.timestamp,
            category: event.category.clone(),
            severity: event.severity,
            fingerprint: event.fingerprint.clone(),
            subject: event.subject.clone(),
        }
    }
}

impl From<&Alert> for LogRecord {
    fn from(alert: &Alert) -> Self {
        Self::Alert {
            timestamp: alert.timestamp,
            category: alert.category.clone(),
            count: alert.count,
        }
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Append-only JSON-lines log file with a buffered writer and a running
/// record count.
pub struct EventLog {
    out: BufWriter<tokio::fs::File>,
    written: u64,
}

impl EventLog {
    /// Open `path` for appending, creating the file and any missing parent
    /// directories on first use.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let open_err = |source| PersistError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(open_err)?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(open_err)?;

        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Encode one record as a JSON line and append it.
    pub async fn append(&mut self, record: &LogRecord) -> Result<(), PersistError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.out
            .write_all(&line)
            .await
            .map_err(PersistError::Append)?;
        self.written += 1;
        Ok(())
    }

    /// Push buffered lines down to the OS.
    pub async fn sync(&mut self) -> Result<(), PersistError> {
        self.out.flush().await.map_err(PersistError::Append)
    }

    /// Records appended since the log was opened.
    pub fn written(&self) -> u64 {
        self.written
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Cloneable handle that queues records for the background drain task.
///
/// Events below the configured severity floor are discarded at the handle,
/// before they ever touch the queue; alerts always persist.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<LogRecord>,
    min_severity: Severity,
}

impl EventSink {
    /// Open the log and spawn the drain task.
    ///
    /// The returned handle resolves to the number of records written once
    /// every sink clone is dropped and the queue has been drained and
    /// flushed.  The drain task never panics: a record that fails to write
    /// is logged via `tracing::error` and skipped.
    pub async fn start(
        path: impl AsRef<Path>,
        min_severity: Severity,
    ) -> Result<(Self, JoinHandle<u64>), PersistError> {
        let mut log = EventLog::open(path).await?;
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

        let handle = tokio::spawn(async move { drain(&mut log, rx).await });

        Ok((Self { tx, min_severity }, handle))
    }

    /// Queue a classified event, unless it falls below the severity floor.
    pub async fn record_event(&self, event: &SecurityEvent) {
        if event.severity < self.min_severity {
            return;
        }
        self.submit(LogRecord::from(event)).await;
    }

    /// Queue an alert.  Alerts are never filtered.
    pub async fn record_alert(&self, alert: &Alert) {
        self.submit(LogRecord::from(alert)).await;
    }

    async fn submit(&self, record: LogRecord) {
        if self.tx.send(record).await.is_err() {
            warn!("event log task gone; record dropped");
        }
    }
}

/// Drain loop: pull queued records in batches, append each, flush once per
/// batch.  Ends when every sender is gone and the queue is empty.
async fn drain(log: &mut EventLog, mut rx: mpsc::Receiver<LogRecord>) -> u64 {
    let mut batch = Vec::with_capacity(BATCH_LIMIT);

    while rx.recv_many(&mut batch, BATCH_LIMIT).await > 0 {
        for record in batch.drain(..) {
            if let Err(err) = log.append(&record).await {
                error!(%err, "dropping log record");
            }
        }
        if let Err(err) = log.sync().await {
            error!(%err, "event log flush failed");
        }
    }

    debug!(written = log.written(), "event log closed");
    log.written()
}

//! # Filesystem Event Log
//!
//! Local filesystem implementation of [`EventLog`], used as the default
//! "local instance" store.
//!
//! Each collection is one JSON-lines file at
//! `<root>/<database>/<collection>.jsonl`. Every insert appends exactly one
//! newline-terminated line and is acknowledged only after the data is synced.
//!
//! A torn append never swallows later records:
//! - a failed write or sync is rolled back by truncating to the previous length
//! - a file left without a trailing newline (crash mid-append) is repaired on
//!   open, and any unterminated tail found at insert time is closed off first

use super::memory_event_log::sort_newest_first;
use crate::event_log::{EventLog, EventLogError};
use crate::{NormalizedEvent, RequestId, StoredEvent};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

/// File extension of collection files
const COLLECTION_EXTENSION: &str = "jsonl";

/// Append-only JSON-lines event log
///
/// # Examples
///
/// ```no_run
/// use webhook_ledger_core::adapters::FilesystemEventLog;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = FilesystemEventLog::open(PathBuf::from("./data"), "github_webhook_db", "github_events").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FilesystemEventLog {
    path: PathBuf,

    /// Request IDs already on disk; the lock also serializes file access
    known_ids: Mutex<HashSet<RequestId>>,
}

impl FilesystemEventLog {
    /// Open (creating if needed) the collection file for `database`/`collection`
    ///
    /// # Errors
    ///
    /// Returns error if the database directory cannot be created or the
    /// existing collection file cannot be read.
    pub async fn open(
        root: PathBuf,
        database: &str,
        collection: &str,
    ) -> Result<Self, EventLogError> {
        let database_dir = root.join(database);
        fs::create_dir_all(&database_dir)
            .await
            .map_err(|e| EventLogError::Io {
                message: format!("Failed to create database directory: {}", e),
            })?;

        let path = database_dir.join(format!("{}.{}", collection, COLLECTION_EXTENSION));
        repair_torn_tail(&path).await?;

        let known_ids = read_records(&path)
            .await?
            .iter()
            .map(|stored| *stored.event.request_id())
            .collect();

        Ok(Self {
            path,
            known_ids: Mutex::new(known_ids),
        })
    }

    /// Path of the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventLog for FilesystemEventLog {
    #[instrument(skip(self, event), fields(request_id = %event.request_id()))]
    async fn insert_one(&self, event: &NormalizedEvent) -> Result<(), EventLogError> {
        let mut known_ids = self.known_ids.lock().await;

        if known_ids.contains(event.request_id()) {
            return Err(EventLogError::DuplicateRequestId {
                request_id: *event.request_id(),
            });
        }

        let stored = StoredEvent::assign(event.clone());
        let mut line = serde_json::to_vec(&stored).map_err(|e| EventLogError::Serialization {
            message: format!("Failed to serialize event: {}", e),
        })?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_error("Failed to open collection file", e))?;

        let original_len = file
            .metadata()
            .await
            .map_err(|e| io_error("Failed to inspect collection file", e))?
            .len();

        if ends_unterminated(&mut file, original_len)
            .await
            .map_err(|e| io_error("Failed to inspect collection file", e))?
        {
            warn!(
                path = %self.path.display(),
                "Collection file ends mid-record; terminating it before appending"
            );
            line.insert(0, b'\n');
        }

        if let Err(e) = append_synced(&mut file, &line).await {
            if let Err(rollback) = file.set_len(original_len).await {
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial append"
                );
            }
            return Err(io_error("Failed to append event", e));
        }

        known_ids.insert(*event.request_id());
        debug!(store_id = %stored.id, path = %self.path.display(), "Event appended to collection file");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventLogError> {
        let _guard = self.known_ids.lock().await;

        let mut records = read_records(&self.path).await?;
        sort_newest_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }
}

fn io_error(context: &str, e: std::io::Error) -> EventLogError {
    EventLogError::Io {
        message: format!("{}: {}", context, e),
    }
}

async fn append_synced(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

/// True when the file is non-empty and its last byte is not a newline
async fn ends_unterminated(file: &mut fs::File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(false);
    }

    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Close off an unterminated final line left by an interrupted append
///
/// A tail that parses as a complete record only lost its newline and is
/// kept; anything else was never acknowledged and is truncated away.
async fn repair_torn_tail(path: &Path) -> Result<(), EventLogError> {
    let contents = match fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error("Failed to read collection file", e)),
    };

    if contents.last().map_or(true, |last| *last == b'\n') {
        return Ok(());
    }

    let tail_start = contents
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |newline| newline + 1);
    let tail = &contents[tail_start..];

    let mut file = fs::OpenOptions::new()
        .write(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| io_error("Failed to open collection file", e))?;

    if serde_json::from_slice::<StoredEvent>(tail).is_ok() {
        warn!(path = %path.display(), "Terminating final record that lacked a newline");
        append_synced(&mut file, b"\n")
            .await
            .map_err(|e| io_error("Failed to repair collection file", e))?;
    } else {
        warn!(
            path = %path.display(),
            discarded_bytes = tail.len(),
            "Discarding torn record at end of collection file"
        );
        file.set_len(tail_start as u64)
            .await
            .map_err(|e| io_error("Failed to repair collection file", e))?;
        file.sync_data()
            .await
            .map_err(|e| io_error("Failed to repair collection file", e))?;
    }

    Ok(())
}

/// Read every parseable record from a collection file
///
/// A missing file is an empty collection. Lines that do not parse as a
/// [`StoredEvent`] are skipped with a warning.
async fn read_records(path: &Path) -> Result<Vec<StoredEvent>, EventLogError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(EventLogError::Io {
                message: format!("Failed to read collection file: {}", e),
            })
        }
    };

    let mut records = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<StoredEvent>(line) {
            Ok(stored) => records.push(stored),
            Err(e) => warn!(
                path = %path.display(),
                line = index + 1,
                error = %e,
                "Skipping unreadable event record"
            ),
        }
    }

    Ok(records)
}

#[cfg(test)]
#[path = "filesystem_event_log_tests.rs"]
mod tests;

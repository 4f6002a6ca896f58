//! JSONL audit store
//!
//! One JSON object per line in an append-only file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::{AuditStore, EntryStream, filtered};
use crate::entry::AuditLogEntry;
use crate::error::StorageError;
use crate::filter::AuditFilter;

/// JSONL file-based audit store
pub struct JsonlAuditStore {
    path: PathBuf,
    fsync: bool,
    /// Serializes appends from this process so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Create a store at the given path. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fsync: true,
            write_lock: Mutex::new(()),
        }
    }

    /// Whether each append waits for the data to reach disk (default true)
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Open a lazy reader over the whole file, or `None` if nothing was written yet
    async fn open_reader(&self) -> Result<Option<LineReader>, StorageError> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(LineReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Bytes scanned per step when looking for the last complete line
const TAIL_CHUNK: u64 = 4096;

/// Cut off a fragment left by an append that never finished.
///
/// An interrupted write leaves bytes after the last newline. Appending behind
/// them would glue the next entry onto the fragment and make both unreadable,
/// so the file is truncated back to its last complete line first.
async fn repair_torn_tail(file: &mut File, path: &Path) -> Result<(), StorageError> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(());
    }

    let mut chunk = vec![0u8; TAIL_CHUNK as usize];
    let mut end = len;
    let keep = loop {
        let start = end.saturating_sub(TAIL_CHUNK);
        let size = (end - start) as usize;
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut chunk[..size]).await?;

        if end == len && chunk[size - 1] == b'\n' {
            return Ok(());
        }
        if let Some(pos) = chunk[..size].iter().rposition(|b| *b == b'\n') {
            break start + pos as u64 + 1;
        }
        if start == 0 {
            break 0;
        }
        end = start;
    };

    tracing::warn!(
        path = %path.display(),
        dropped_bytes = len - keep,
        "truncating interrupted audit append"
    );
    file.set_len(keep).await?;
    Ok(())
}

/// Reads one entry per line, tracking line numbers for error reports
struct LineReader {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line: u64,
    done: bool,
}

impl LineReader {
    fn new(file: File) -> Self {
        Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line: 0,
            done: false,
        }
    }

    async fn next_record(
        mut self,
    ) -> Option<(Result<AuditLogEntry, StorageError>, LineReader)> {
        loop {
            if self.done {
                return None;
            }

            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(read) => read,
                Err(e) => {
                    self.done = true;
                    return Some((Err(e.into()), self));
                }
            };
            if read == 0 {
                return None;
            }
            self.line += 1;

            if self.buf.last() != Some(&b'\n') {
                // An append from another process is still in flight
                tracing::warn!(line = self.line, "skipping unterminated audit record");
                return None;
            }

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => {
                    serde_json::from_str::<AuditLogEntry>(text.trim()).map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            let parsed = parsed.map_err(|reason| StorageError::Corrupt {
                line: self.line,
                reason,
            });
            return Some((parsed, self));
        }
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        self.ensure_parent_dir().await?;

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        repair_torn_tail(&mut file, &self.path).await?;

        // Single write of the whole line so a reader sees all of it or none
        file.write_all(&line).await?;
        file.flush().await?;
        if self.fsync {
            file.sync_data().await?;
        }

        tracing::debug!(id = %entry.id(), path = %self.path.display(), "appended audit entry");
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<EntryStream, StorageError> {
        let Some(reader) = self.open_reader().await? else {
            return Ok(Box::pin(tokio_stream::empty::<
                Result<AuditLogEntry, StorageError>,
            >()));
        };
        Ok(filtered(stream::unfold(reader, LineReader::next_record), filter))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let Some(mut reader) = self.open_reader().await? else {
            return Ok(0);
        };

        let mut count = 0;
        loop {
            reader.buf.clear();
            if reader.reader.read_until(b'\n', &mut reader.buf).await? == 0 {
                break;
            }
            if reader.buf.last() == Some(&b'\n') && !reader.buf.trim_ascii().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn backend(&self) -> &'static str {
        "jsonl"
    }
}

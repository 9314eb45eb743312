use crate::error::{Result, StoreError};
use crate::types::{MessageId, MessageRecord};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Append-only sequence of submitted words with increasing ids.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Records with `id > cursor` (all records for `None`), ascending by id.
    async fn fetch_after(&self, cursor: Option<MessageId>) -> Result<Vec<MessageRecord>>;

    /// Appends `word` under the next id.
    async fn append(&self, word: &str) -> Result<MessageRecord>;
}

fn after_cursor(records: &[MessageRecord], cursor: Option<MessageId>) -> Vec<MessageRecord> {
    let mut out: Vec<MessageRecord> = records
        .iter()
        .filter(|r| cursor.map_or(true, |c| r.id > c))
        .cloned()
        .collect();
    out.sort_by_key(|r| r.id);
    out
}

#[derive(Debug, Default)]
pub struct MemoryMessageLog {
    records: Mutex<Vec<MessageRecord>>,
}

impl MemoryMessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record that may lack a word.
    pub async fn append_raw(&self, word: Option<&str>) -> MessageRecord {
        let mut guard = self.records.lock().await;
        let id = guard.last().map_or(1, |r| r.id + 1);
        let record = MessageRecord {
            id,
            word: word.map(str::to_string),
        };
        guard.push(record.clone());
        record
    }
}

#[async_trait]
impl MessageSource for MemoryMessageLog {
    async fn fetch_after(&self, cursor: Option<MessageId>) -> Result<Vec<MessageRecord>> {
        Ok(after_cursor(&self.records.lock().await, cursor))
    }

    async fn append(&self, word: &str) -> Result<MessageRecord> {
        Ok(self.append_raw(Some(word)).await)
    }
}

/// Messages stored one JSON object per line.
///
/// A line with an integer `id` is a record; its `word` is taken only if it is
/// a string. Lines without a usable id, or that are not UTF-8, are logged once
/// and ignored.
///
/// Appends hold an advisory exclusive lock on the file while reading the last
/// id and writing the new line, so concurrent writers in other processes
/// still produce strictly increasing ids.
#[derive(Debug)]
pub struct JsonlMessageLog {
    path: PathBuf,
    append_lock: Mutex<()>,
    warned_through_line: AtomicUsize,
}

impl JsonlMessageLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        log::debug!("Opened message log {:?}", path);
        Ok(Self {
            path,
            append_lock: Mutex::new(()),
            warned_through_line: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<MessageRecord>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let (records, unreadable) = parse_records(&bytes);

        let warned = self.warned_through_line.load(Ordering::Relaxed);
        for line_no in unreadable.iter().filter(|&&line_no| line_no > warned) {
            log::warn!("Ignoring unreadable message at {:?}:{line_no}", self.path);
        }
        if let Some(&last) = unreadable.last() {
            self.warned_through_line.fetch_max(last, Ordering::Relaxed);
        }
        Ok(records)
    }
}

/// Records in `bytes` and the line numbers that could not be read.
fn parse_records(bytes: &[u8]) -> (Vec<MessageRecord>, Vec<usize>) {
    let mut records = Vec::new();
    let mut unreadable = Vec::new();

    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_no = idx + 1;
        match std::str::from_utf8(raw).map(str::trim) {
            Ok("") => {}
            Ok(line) => match parse_line(line) {
                Some(record) => records.push(record),
                None => unreadable.push(line_no),
            },
            Err(_) => unreadable.push(line_no),
        }
    }
    (records, unreadable)
}

fn parse_line(line: &str) -> Option<MessageRecord> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let id = value.get("id")?.as_u64()?;
    let word = value
        .get("word")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    Some(MessageRecord { id, word })
}

fn append_locked(path: &Path, word: &str) -> Result<MessageRecord> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    let appended = append_to(&mut file, word);
    FileExt::unlock(&file)?;
    appended
}

fn append_to(file: &mut File, word: &str) -> Result<MessageRecord> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let (records, _) = parse_records(&bytes);
    let next_id = records
        .iter()
        .map(|r| r.id)
        .max()
        .map_or(1, |max| max + 1);
    let record = MessageRecord {
        id: next_id,
        word: Some(word.to_string()),
    };

    let mut line = Vec::new();
    if bytes.last().is_some_and(|b| *b != b'\n') {
        line.push(b'\n');
    }
    serde_json::to_writer(&mut line, &record)?;
    line.push(b'\n');
    file.write_all(&line)?;
    file.flush()?;
    Ok(record)
}

#[async_trait]
impl MessageSource for JsonlMessageLog {
    async fn fetch_after(&self, cursor: Option<MessageId>) -> Result<Vec<MessageRecord>> {
        let records = self.read_all().await?;
        Ok(after_cursor(&records, cursor))
    }

    async fn append(&self, word: &str) -> Result<MessageRecord> {
        let _guard = self.append_lock.lock().await;
        let path = self.path.clone();
        let word = word.to_string();
        tokio::task::spawn_blocking(move || append_locked(&path, &word))
            .await
            .map_err(|e| StoreError::Other(format!("Join error: {e}")))?
    }
}

//! Durable file-backed topic.
//!
//! Layout inside the spool directory:
//!
//! ```text
//! <topic>.jsonl    one JSON document per line, append-only
//! <topic>.offset   committed byte offset of the consumer (decimal text)
//! <topic>.lock     advisory lock held by a running loader
//! ```
//!
//! [`MessageSource::consume`] advances an in-memory read position;
//! [`MessageSource::ack`] persists it. A run that fails before acking leaves
//! the offset where it was, so the next run re-reads the unacknowledged
//! message. A trailing line without `\n` is treated as an append still in
//! progress and is not consumed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{MessageSink, MessageSource, QueueError};

#[derive(Debug)]
pub struct JsonlTopic {
    topic: String,
    log_path: PathBuf,
    offset_path: PathBuf,
    lock_path: PathBuf,
    committed: u64,
    position: u64,
}

impl JsonlTopic {
    /// Open (or create) a topic in `dir`, resuming from its committed offset.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the directory cannot be created or the
    /// offset file cannot be read, and [`QueueError::Unavailable`] if the
    /// offset file is corrupt.
    pub fn open(dir: &Path, topic: &str) -> Result<Self, QueueError> {
        let io_err = |source| QueueError::Io {
            topic: topic.to_string(),
            source,
        };

        fs::create_dir_all(dir).map_err(io_err)?;
        let offset_path = dir.join(format!("{topic}.offset"));

        let committed = match fs::read_to_string(&offset_path) {
            Ok(text) => text.trim().parse::<u64>().map_err(|err| QueueError::Unavailable {
                topic: topic.to_string(),
                reason: format!("corrupt offset file {}: {err}", offset_path.display()),
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
            Err(err) => return Err(io_err(err)),
        };

        Ok(Self {
            topic: topic.to_string(),
            log_path: dir.join(format!("{topic}.jsonl")),
            offset_path,
            lock_path: dir.join(format!("{topic}.lock")),
            committed,
            position: committed,
        })
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Path of the advisory lock guarding consumers of this topic.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Byte offset persisted by the last [`MessageSource::ack`].
    #[must_use]
    pub const fn committed_offset(&self) -> u64 {
        self.committed
    }

    fn io_error(&self, source: io::Error) -> QueueError {
        QueueError::Io {
            topic: self.topic.clone(),
            source,
        }
    }

    fn persist_offset(&self, offset: u64) -> io::Result<()> {
        let tmp = self.offset_path.with_extension("offset.tmp");
        fs::write(&tmp, format!("{offset}\n"))?;
        fs::rename(&tmp, &self.offset_path)
    }
}

impl MessageSource for JsonlTopic {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn consume(&mut self) -> Result<Option<Value>, QueueError> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(self.position))
            .map_err(|err| self.io_error(err))?;

        loop {
            let mut line = String::new();
            let read = reader
                .read_line(&mut line)
                .map_err(|err| self.io_error(err))?;
            if read == 0 || !line.ends_with('\n') {
                return Ok(None);
            }

            let start = self.position;
            self.position += read as u64;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| QueueError::Decode {
                    topic: self.topic.clone(),
                    offset: start,
                    source,
                });
        }
    }

    fn ack(&mut self) -> Result<(), QueueError> {
        if self.position == self.committed {
            return Ok(());
        }
        self.persist_offset(self.position)
            .map_err(|err| self.io_error(err))?;
        self.committed = self.position;
        Ok(())
    }
}

impl MessageSink for JsonlTopic {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn produce(&mut self, message: &Value) -> Result<(), QueueError> {
        let mut line = serde_json::to_string(message).map_err(|source| QueueError::Encode {
            topic: self.topic.clone(),
            source,
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|err| self.io_error(err))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|err| self.io_error(err))
    }
}

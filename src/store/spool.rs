//! Maildir-flavoured spool: one file per received message.
//!
//! Messages are written under `<dir>/tmp` and renamed into `<dir>/new`
//! once complete, so readers never observe partial files. Anything
//! beyond durable capture (indexing, search, eviction) is out of scope.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::debug;

use super::{MessageId, MessageStore, StoreError};

/// File-backed [`MessageStore`] with a hard per-message size limit.
pub struct SpoolStore {
    dir: PathBuf,
    max_message_size: u64,
    counter: AtomicU64,
}

impl SpoolStore {
    /// Open (creating if needed) a spool rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, max_message_size: u64) -> std::io::Result<Self> {
        let dir = dir.into();
        for sub in ["tmp", "new"] {
            std::fs::create_dir_all(dir.join(sub))?;
        }
        Ok(Self {
            dir,
            max_message_size,
            counter: AtomicU64::new(0),
        })
    }

    /// Maildir-style unique name: timestamp, pid, and a process-wide counter.
    fn unique_name(&self) -> String {
        let now = Utc::now();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}.M{}P{}Q{}.postsink",
            now.timestamp(),
            now.timestamp_subsec_micros(),
            std::process::id(),
            seq
        )
    }
}

impl MessageStore for SpoolStore {
    fn store(&self, raw: &[u8]) -> Result<MessageId, StoreError> {
        let size = raw.len() as u64;
        if size > self.max_message_size {
            return Err(StoreError::SizeLimitExceeded {
                size,
                limit: self.max_message_size,
            });
        }

        let name = self.unique_name();
        let tmp_path = self.dir.join("tmp").join(&name);
        let new_path = self.dir.join("new").join(&name);

        write_file(&tmp_path, raw)?;
        if let Err(e) = std::fs::rename(&tmp_path, &new_path) {
            // Do not leave partial deliveries behind under tmp/
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StoreError::Io {
                path: new_path,
                source: e,
            });
        }

        debug!(path = %new_path.display(), size, "message spooled");
        Ok(MessageId(name))
    }
}

fn write_file(path: &Path, raw: &[u8]) -> Result<(), StoreError> {
    std::fs::write(path, raw).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

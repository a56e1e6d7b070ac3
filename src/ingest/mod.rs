//! Bulk ingestion: walk folders of captured emails and re-deliver each one
//! over SMTP.
//!
//! The walk is single-threaded and sequential: one message is fully read,
//! parsed, and relayed before the next begins. Every per-file error is
//! recovered here (logged, loop continues); nothing along this path ever
//! terminates the run.

pub mod progress;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{IngestError, Result};
use crate::model::envelope::Envelope;
use crate::parser::header;
use crate::relay::MailRelay;
use progress::BatchProgress;

/// Configuration for one ingestion run. Constructed once at command
/// invocation; only `from_addr` mutates (the sticky default sender).
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// File or folder roots to scan.
    pub roots: Vec<PathBuf>,
    /// Only consider files modified within the last N days.
    pub recent_days: Option<u64>,
    /// Target SMTP server (`host:port`).
    pub smtp_addr: String,
    /// Default envelope sender. When unset, the first message with a
    /// `From` header fills it in for the rest of the run.
    pub from_addr: Option<String>,
}

/// Outcome counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Messages that reached the relay step (successful or not).
    pub processed: u64,
    /// Relay attempts that failed.
    pub relay_errors: u64,
    /// Files skipped before the relay step (unreadable, malformed,
    /// no resolvable sender).
    pub skipped: u64,
    /// Batch throughput lines emitted along the way.
    pub batches: u64,
}

/// Walk every root and relay each regular file found.
///
/// Directories and non-regular files are never attempted; walk errors on
/// individual entries are logged and do not abort the walk. A root whose
/// traversal fails outright is abandoned, but the remaining roots still
/// proceed.
pub fn run(options: &mut IngestOptions, relay: &dyn MailRelay) -> IngestSummary {
    let start = Instant::now();
    let mut summary = IngestSummary::default();
    let mut progress = BatchProgress::new();

    let roots = options.roots.clone();
    for root in &roots {
        walk_root(root, options, relay, &mut progress, &mut summary);
    }
    summary.batches = progress.batches_emitted();

    info!(
        processed = summary.processed,
        relay_errors = summary.relay_errors,
        skipped = summary.skipped,
        elapsed = ?start.elapsed(),
        "ingestion run complete"
    );

    summary
}

fn walk_root(
    root: &Path,
    options: &mut IngestOptions,
    relay: &dyn MailRelay,
    progress: &mut BatchProgress,
    summary: &mut IngestSummary,
) {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!(root = %root.display(), error = %e, "walk error, skipping entry");
                continue;
            }
        };

        // Symlinks and directories are not treated as files.
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        if let Some(days) = options.recent_days {
            if is_older_than(&entry, days) {
                debug!(path = %path.display(), "outside recency window, skipped");
                continue;
            }
        }

        match read_and_resolve(path, &mut options.from_addr) {
            Ok((envelope, raw)) => {
                if let Err(e) = relay.relay(&envelope, &raw) {
                    error!(path = %path.display(), error = %e, "error sending mail");
                    summary.relay_errors += 1;
                }
                // Relay failures still count toward throughput totals.
                progress.tick();
                summary.processed += 1;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "skipping file");
                summary.skipped += 1;
            }
        }
    }
}

/// The fallible per-file half of the pipeline: read, parse, resolve.
///
/// Errors from here are always converted to a single log line at the
/// per-file boundary and never propagated past the walk step.
fn read_and_resolve(
    path: &Path,
    default_sender: &mut Option<String>,
) -> Result<(Envelope, Vec<u8>)> {
    let raw = std::fs::read(path).map_err(|e| IngestError::read(path, e))?;
    let headers = header::parse(&raw)?;
    let envelope = Envelope::resolve(&headers, default_sender)?;
    Ok((envelope, raw))
}

/// Whether the entry's modification time falls outside the recency window.
///
/// Files with an unreadable mtime are processed rather than skipped; the
/// filter is best-effort.
fn is_older_than(entry: &walkdir::DirEntry, days: u64) -> bool {
    let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
    let Some(modified) = modified else {
        warn!(path = %entry.path().display(), "cannot read mtime, ingesting anyway");
        return false;
    };
    let window = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age > window,
        // mtime in the future counts as recent
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayError;
    use std::sync::Mutex;

    /// Records every relayed envelope; optionally fails each delivery.
    struct FakeRelay {
        sent: Mutex<Vec<Envelope>>,
        fail: bool,
    }

    impl FakeRelay {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl MailRelay for FakeRelay {
        fn relay(&self, envelope: &Envelope, _raw: &[u8]) -> std::result::Result<(), RelayError> {
            self.sent.lock().unwrap().push(envelope.clone());
            if self.fail {
                Err(RelayError::Address {
                    addr: "forced".to_string(),
                    source: "@".parse::<lettre::Address>().unwrap_err(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn options(root: &Path) -> IngestOptions {
        IngestOptions {
            roots: vec![root.to_path_buf()],
            recent_days: None,
            smtp_addr: "127.0.0.1:1025".to_string(),
            from_addr: None,
        }
    }

    fn write_message(dir: &Path, name: &str, from: &str, to: &str) {
        let body = format!("From: {from}\nTo: {to}\nSubject: t\n\nBody\n");
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn every_regular_file_attempted_once() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("cur");
        std::fs::create_dir(&sub).unwrap();
        write_message(tmp.path(), "a.eml", "a@x.com", "to@x.com");
        write_message(&sub, "b.eml", "b@x.com", "to@x.com");

        let relay = FakeRelay::new(false);
        let summary = run(&mut options(tmp.path()), &relay);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(relay.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn malformed_files_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "good.eml", "a@x.com", "to@x.com");
        // No header/body separator
        std::fs::write(tmp.path().join("bad.eml"), b"not an email at all").unwrap();

        let relay = FakeRelay::new(false);
        let summary = run(&mut options(tmp.path()), &relay);

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn relay_failure_counts_as_processed() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "a.eml", "a@x.com", "to@x.com");

        let relay = FakeRelay::new(true);
        let summary = run(&mut options(tmp.path()), &relay);

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.relay_errors, 1);
    }

    #[test]
    fn missing_root_does_not_abort_other_roots() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "a.eml", "a@x.com", "to@x.com");

        let mut opts = options(tmp.path());
        opts.roots
            .insert(0, tmp.path().join("does-not-exist"));

        let relay = FakeRelay::new(false);
        let summary = run(&mut opts, &relay);
        assert_eq!(summary.processed, 1);
    }

    #[test]
    fn sticky_default_sender_spans_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "a.eml", "first@x.com", "to@x.com");

        let mut opts = options(tmp.path());
        let relay = FakeRelay::new(false);
        run(&mut opts, &relay);

        assert_eq!(opts.from_addr.as_deref(), Some("first@x.com"));
    }

    #[test]
    fn recency_window_filters_old_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "old.eml", "a@x.com", "to@x.com");
        write_message(tmp.path(), "new.eml", "a@x.com", "to@x.com");

        // Backdate one file by 8 days.
        let old_mtime = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);
        let file = std::fs::File::options()
            .write(true)
            .open(tmp.path().join("old.eml"))
            .unwrap();
        file.set_modified(old_mtime).unwrap();
        drop(file);

        let mut opts = options(tmp.path());
        opts.recent_days = Some(7);
        let relay = FakeRelay::new(false);
        let summary = run(&mut opts, &relay);

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn huge_recency_window_does_not_overflow() {
        let tmp = tempfile::tempdir().unwrap();
        write_message(tmp.path(), "a.eml", "a@x.com", "to@x.com");

        let mut opts = options(tmp.path());
        opts.recent_days = Some(u64::MAX);
        let relay = FakeRelay::new(false);
        let summary = run(&mut opts, &relay);

        assert_eq!(summary.processed, 1);
    }
}

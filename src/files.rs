use futures_util::stream::{self, Stream, StreamExt};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use unicode_normalization::UnicodeNormalization;

use crate::client::Contest;
use crate::error::{AppError, Result};

/// How generated reports leave the downloads directory
///
/// A deployment picks exactly one. Running both would race a download
/// against the sweep removing the same file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove a report once it has been sent to the client
    #[default]
    DeleteAfterDownload,

    /// Leave reports in place and periodically remove stale ones
    Sweep {
        age_limit_secs: u64,
        poll_interval_secs: u64,
    },
}

/// Make a contest name safe to use as a file name
///
/// Accented letters are decomposed and lose their marks, then only ASCII
/// letters, digits, `_`, `.` and `-` are kept. Runs of whitespace and path
/// separators collapse to a single `_`, and leading or trailing dots and
/// underscores are trimmed. A name with nothing left becomes `leaderboard`.
pub fn sanitize_file_name(name: &str) -> String {
    let stem = ascii_stem(name);
    if stem.is_empty() {
        "leaderboard".to_string()
    } else {
        stem
    }
}

fn ascii_stem(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Base name of the report generated for a contest
///
/// Names written entirely outside the Latin alphabet sanitize to nothing,
/// so the slug stands in for them rather than every such contest sharing
/// one file.
pub fn report_stem(contest: &Contest) -> String {
    let stem = ascii_stem(&contest.name);
    if stem.is_empty() {
        sanitize_file_name(&contest.slug)
    } else {
        stem
    }
}

/// File name of the report generated for a contest
pub fn report_file_name(contest: &Contest) -> String {
    format!("{}.xlsx", report_stem(contest))
}

/// Write a report into `directory`, replacing any file of the same name
pub fn write_report(bytes: &[u8], directory: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let path = directory.join(file_name);
    fs::write(&path, bytes)?;
    debug!("wrote {} ({} bytes)", path.display(), bytes.len());

    Ok(path)
}

/// Removes a file when dropped, logging instead of failing
#[derive(Debug)]
pub struct RemoveOnDrop(PathBuf);

impl RemoveOnDrop {
    pub fn new(path: PathBuf) -> Self {
        RemoveOnDrop(path)
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        remove_logged(&self.0);
    }
}

/// A report ready to be sent to the client
#[derive(Debug)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
    guard: Option<RemoveOnDrop>,
}

impl Download {
    /// Whether the file is removed once the body has been sent
    #[cfg(test)]
    pub fn removes_after_send(&self) -> bool {
        self.guard.is_some()
    }

    /// Body stream for the response
    ///
    /// The removal guard rides along with the stream, so the file goes away
    /// only after the server has finished with (or dropped) the body.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
        let guard = self.guard;
        stream::iter(std::iter::once(Ok::<_, io::Error>(self.bytes))).map(move |chunk| {
            let _pending_removal = &guard;
            chunk
        })
    }
}

/// Load a report for download
///
/// Names that are not already sanitized (anything that could escape the
/// directory), missing files and non-regular files are all
/// [`AppError::FileNotFound`].
///
/// # Arguments
/// * `directory` - The downloads directory
/// * `file_name` - Bare file name as it appeared in the download URL
/// * `policy` - Decides whether the file is removed after sending
///
/// # Returns
/// * `Result<Download>` - The file contents, carrying a removal guard under
///   [`CleanupPolicy::DeleteAfterDownload`]
///
/// # Examples
/// ```no_run
/// use leaderboard_export::CleanupPolicy;
/// use leaderboard_export::files::open_download;
/// use std::path::Path;
///
/// # async fn demo() -> leaderboard_export::error::Result<()> {
/// let download = open_download(
///     Path::new("static/downloads"),
///     "Spring_Cup_2024.xlsx",
///     CleanupPolicy::DeleteAfterDownload,
/// )
/// .await?;
/// // the file is removed once this stream is dropped
/// let _body = download.into_stream();
/// # Ok(())
/// # }
/// ```
pub async fn open_download(
    directory: &Path,
    file_name: &str,
    policy: CleanupPolicy,
) -> Result<Download> {
    if file_name.is_empty() || sanitize_file_name(file_name) != file_name {
        return Err(AppError::FileNotFound(file_name.to_string()));
    }

    let path = directory.join(file_name);
    let bytes = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => tokio::fs::read(&path).await,
        Ok(_) => return Err(AppError::FileNotFound(file_name.to_string())),
        Err(e) => Err(e),
    };

    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::FileNotFound(file_name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let guard = match policy {
        CleanupPolicy::DeleteAfterDownload => Some(RemoveOnDrop::new(path)),
        CleanupPolicy::Sweep { .. } => None,
    };

    Ok(Download {
        file_name: file_name.to_string(),
        bytes,
        guard,
    })
}

/// Remove every regular file in `directory` older than `age_limit`
///
/// A missing directory, files that disappear mid-sweep and failed removals
/// are logged and skipped. Subdirectories are left alone.
///
/// # Arguments
/// * `directory` - Directory to scan (not recursive)
/// * `age_limit` - Files last modified longer ago than this are removed
///
/// # Returns
/// * `usize` - How many files were removed
///
/// # Examples
/// ```no_run
/// use leaderboard_export::files::sweep_expired_once;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let removed = sweep_expired_once(Path::new("static/downloads"), Duration::from_secs(3600));
/// println!("removed {} stale reports", removed);
/// ```
pub fn sweep_expired_once(directory: &Path, age_limit: Duration) -> usize {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("sweep skipped {}: {}", directory.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let metadata = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age > age_limit && remove_logged(&path) {
            removed += 1;
        }
    }

    removed
}

/// Run [`sweep_expired_once`] every `poll_interval` for the life of the process
pub fn spawn_sweeper(
    directory: PathBuf,
    age_limit: Duration,
    poll_interval: Duration,
) -> JoinHandle<()> {
    info!(
        "sweeping {} every {:?}, removing files older than {:?}",
        directory.display(),
        poll_interval,
        age_limit
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;

            let dir = directory.clone();
            match tokio::task::spawn_blocking(move || sweep_expired_once(&dir, age_limit)).await {
                Ok(0) => {}
                Ok(n) => info!("sweep removed {} expired file(s)", n),
                Err(e) => error!("sweep task failed: {}", e),
            }
        }
    })
}

fn remove_logged(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("deleted {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already gone", path.display());
            false
        }
        Err(e) => {
            error!("error deleting {}: {}", path.display(), e);
            false
        }
    }
}

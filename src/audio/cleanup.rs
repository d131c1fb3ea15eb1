//! Periodic removal of synthesized audio files that clients have had time to fetch.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delete `.mp3` files in `dir` whose modification time is at least `max_age` old.
///
/// A missing directory is not an error: nothing has been synthesized yet.
pub async fn sweep_stale_files(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();

        if age >= max_age {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Removed stale audio file");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale audio file"),
            }
        }
    }

    Ok(removed)
}

/// Run [`sweep_stale_files`] every `interval` until the runtime shuts down.
pub fn spawn_cleanup_task(dir: PathBuf, max_age: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep_stale_files(&dir, max_age).await {
                Ok(0) => {}
                Ok(removed) => info!(removed = removed, dir = %dir.display(), "Audio cleanup finished"),
                Err(e) => warn!(error = %e, dir = %dir.display(), "Audio cleanup failed"),
            }
        }
    })
}

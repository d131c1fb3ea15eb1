//! Scoped temporary files for uploads.
//!
//! The file exists exactly as long as the [`TempAudioFile`] value: it is removed when
//! the value is dropped, whether the request succeeded or failed.

use crate::audio::upload::AudioFormat;
use crate::error::{AppError, AppResult};
use actix_web::web;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct TempAudioFile {
    file: NamedTempFile,
}

impl TempAudioFile {
    /// Write `bytes` to a new file in `dir`, named after the detected container.
    pub fn create(dir: &Path, bytes: &[u8], format: AudioFormat) -> AppResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(dir)
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!(path = %file.path().display(), bytes = bytes.len(), "Upload staged");
        Ok(Self { file })
    }

    /// [`TempAudioFile::create`] on the blocking thread pool, for use from request handlers.
    pub async fn stage(dir: PathBuf, bytes: Vec<u8>, format: AudioFormat) -> AppResult<Self> {
        web::block(move || Self::create(&dir, &bytes, format))
            .await
            .map_err(|e| AppError::Internal(format!("Upload staging task failed: {}", e)))?
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "Removing staged upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = TempAudioFile::create(&dir.path().join("nested"), b"OggS data", AudioFormat::Ogg).unwrap();
        let path = staged.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ogg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"OggS data");

        drop(staged);
        assert!(!path.exists());
    }

    #[actix_web::test]
    async fn test_stage_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let staged = TempAudioFile::stage(dir.path().to_path_buf(), b"RIFF data".to_vec(), AudioFormat::Wav)
            .await
            .unwrap();

        assert_eq!(std::fs::read(staged.path()).unwrap(), b"RIFF data");
        assert!(staged.path().starts_with(dir.path()));

        drop(staged);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

//! # Audio Files
//!
//! Everything that touches audio on disk:
//! - **Upload**: validation of uploaded recordings (size, container)
//! - **Temp**: scoped staging of uploads for the transcription request
//! - **Cleanup**: expiry of synthesized speech served under `/audio`

pub mod cleanup;
pub mod temp;
pub mod upload;

pub use cleanup::spawn_cleanup_task;
pub use temp::TempAudioFile;
pub use upload::validate_upload;

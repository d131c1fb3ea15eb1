//! # Upload Validation
//!
//! Checks an uploaded audio blob before it is handed to speech-to-text:
//! 1. **Non-empty**: zero-byte uploads are rejected
//! 2. **Size**: must not exceed the configured limit
//! 3. **Container**: recognised from magic bytes (WAV, WebM, Ogg, MP3, MP4)
//!
//! For WAV uploads the duration can be read from the RIFF header.

use crate::error::{AppError, AppResult};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    WebM,
    Ogg,
    Mp3,
    Mp4,
}

impl AudioFormat {
    /// Identify the container from the first bytes of the file.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            Some(AudioFormat::Wav)
        } else if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            Some(AudioFormat::WebM)
        } else if bytes.starts_with(b"OggS") {
            Some(AudioFormat::Ogg)
        } else if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0) {
            Some(AudioFormat::Mp3)
        } else if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
            Some(AudioFormat::Mp4)
        } else {
            None
        }
    }

    /// File extension understood by the transcription API.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::WebM => "webm",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "m4a",
        }
    }
}

/// Validate an upload and return its container format.
pub fn validate_upload(bytes: &[u8], max_bytes: usize) -> AppResult<AudioFormat> {
    if bytes.is_empty() {
        return Err(AppError::ValidationError("Audio file is empty".to_string()));
    }

    if bytes.len() > max_bytes {
        return Err(AppError::ValidationError(format!(
            "File too large: {} bytes (max: {} bytes)",
            bytes.len(),
            max_bytes
        )));
    }

    AudioFormat::detect(bytes).ok_or_else(|| {
        AppError::ValidationError(
            "Unsupported audio format (expected WAV, WebM, Ogg, MP3 or MP4)".to_string(),
        )
    })
}

/// Duration of a PCM WAV file in seconds, from its `fmt ` and `data` chunks.
///
/// Returns `None` for anything that is not a well-formed RIFF/WAVE header.
pub fn wav_duration_secs(bytes: &[u8]) -> Option<f64> {
    if AudioFormat::detect(bytes) != Some(AudioFormat::Wav) {
        return None;
    }

    let mut cursor = Cursor::new(&bytes[12..]);
    let mut byte_rate: Option<u32> = None;

    loop {
        let mut id = [0u8; 4];
        cursor.read_exact(&mut id).ok()?;
        let size = cursor.read_u32::<LittleEndian>().ok()?;
        let body_start = cursor.position();

        match &id {
            b"fmt " => {
                let _format = cursor.read_u16::<LittleEndian>().ok()?;
                let _channels = cursor.read_u16::<LittleEndian>().ok()?;
                let _sample_rate = cursor.read_u32::<LittleEndian>().ok()?;
                byte_rate = Some(cursor.read_u32::<LittleEndian>().ok()?);
            }
            b"data" => {
                let rate = byte_rate.filter(|rate| *rate > 0)?;
                return Some(size as f64 / rate as f64);
            }
            _ => {}
        }

        // Chunks are word aligned.
        let padded = u64::from(size) + u64::from(size % 2);
        cursor.set_position(body_start + padded);
    }
}

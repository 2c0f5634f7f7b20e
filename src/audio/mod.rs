//! Server-side checks applied to every uploaded sound before it is stored.

pub mod mp3;

use thiserror::Error;

pub const AUDIO_MIME: &str = "audio/mpeg";
pub const AUDIO_EXTENSION: &str = ".mp3";
/// 2 MiB
pub const DEFAULT_MAX_AUDIO_BYTES: u64 = 2 * 1024 * 1024;
pub const DEFAULT_MAX_DURATION_SECS: f64 = 15.0;

#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("Unsupported file type '{0}': only audio/mpeg is accepted")]
    UnsupportedMime(String),
    #[error("File name '{0}' must end in .mp3")]
    UnsupportedExtension(String),
    #[error("File is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("No MPEG audio frames found")]
    Undecodable,
    #[error("Clip is {duration:.2}s long; the limit is {max:.0}s")]
    TooLong { duration: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioPolicy {
    pub max_bytes: u64,
    pub max_duration_secs: f64,
}

impl Default for AudioPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_AUDIO_BYTES,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

/// What the validator learned about an accepted clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub byte_size: u64,
    pub duration_secs: f64,
}

impl AudioPolicy {
    /// Check a clip against the policy. Checks run in a fixed order (MIME,
    /// extension, size, duration) so a given file always fails the same way.
    pub fn validate(
        &self,
        content_type: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<AudioInfo, AudioError> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime != AUDIO_MIME {
            return Err(AudioError::UnsupportedMime(content_type.to_string()));
        }

        if !file_name.to_ascii_lowercase().ends_with(AUDIO_EXTENSION) {
            return Err(AudioError::UnsupportedExtension(file_name.to_string()));
        }

        let byte_size = data.len() as u64;
        if byte_size > self.max_bytes {
            return Err(AudioError::TooLarge {
                size: byte_size,
                max: self.max_bytes,
            });
        }

        let duration_secs = mp3::duration_secs(data).ok_or(AudioError::Undecodable)?;
        if duration_secs > self.max_duration_secs {
            return Err(AudioError::TooLong {
                duration: duration_secs,
                max: self.max_duration_secs,
            });
        }

        Ok(AudioInfo {
            byte_size,
            duration_secs,
        })
    }
}

//! The speech-to-text boundary and engines that do not need the network.

use crate::srt::Segment;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failures reported by a [`Transcriber`].
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("API key is empty; set api_key in the config file or SRT_EXTRACT_API_KEY")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("invalid transcription response: {0}")]
    InvalidResponse(String),

    #[error("transcription response has no segment timestamps (verbose_json not supported?)")]
    MissingSegments,

    #[error("no speech segments detected in {0}")]
    NoSpeech(PathBuf),
}

/// A speech-to-text engine.
///
/// Implementations return the complete, ordered segment list for one media file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// True when the engine returns the same segments whatever media path it is given.
    fn single_source(&self) -> bool {
        false
    }

    async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<Segment>, TranscriptionError>;
}

/// Whisper JSON output: either the full document or just the segment array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentDump {
    Document { segments: Vec<Segment> },
    Segments(Vec<Segment>),
}

/// Reads segments from a Whisper JSON dump instead of running recognition.
pub struct JsonFileTranscriber {
    dump_path: PathBuf,
}

impl JsonFileTranscriber {
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
        }
    }
}

#[async_trait]
impl Transcriber for JsonFileTranscriber {
    fn name(&self) -> &str {
        "whisper-json"
    }

    fn single_source(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        path: &Path,
        _language: Option<&str>,
    ) -> Result<Vec<Segment>, TranscriptionError> {
        if !self.dump_path.is_file() {
            return Err(TranscriptionError::FileNotFound(self.dump_path.clone()));
        }
        debug!(dump = ?self.dump_path, media = ?path, "loading segments from JSON dump");

        let content = tokio::fs::read_to_string(&self.dump_path).await?;
        let segments = match serde_json::from_str::<SegmentDump>(&content) {
            Ok(SegmentDump::Document { segments }) | Ok(SegmentDump::Segments(segments)) => {
                segments
            }
            Err(e) => {
                return Err(TranscriptionError::InvalidResponse(format!(
                    "{}: {}",
                    self.dump_path.display(),
                    e
                )))
            }
        };

        if segments.is_empty() {
            return Err(TranscriptionError::NoSpeech(path.to_path_buf()));
        }
        Ok(segments)
    }
}

//! SRT rendering: timestamp formatting, caption chunking and document serialization.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// A span of recognized speech as returned by the transcription engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One numbered SRT entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} --> {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.text)
    }
}

/// Reasons a segment list cannot be rendered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SrtError {
    #[error("invalid configuration: max words per caption must be at least 1 (got {0})")]
    InvalidConfiguration(usize),

    #[error("nothing to transcribe: no captions could be produced from the segments")]
    EmptyInput,
}

/// Format seconds as `HH:MM:SS,mmm`.
///
/// The value is resolved to whole microseconds first and the milliseconds are
/// then truncated, so `3661.2345` renders as `01:01:01,234`. Negative and
/// non-finite input clamps to zero.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_us = (seconds * 1_000_000.0).round() as u64;
    let total_ms = total_us / 1000;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Split segments into captions of at most `max_words` words each.
///
/// Segments over the limit are cut into consecutive chunks whose time ranges
/// are interpolated proportionally to word count. Indices run from 1 across
/// the whole input. A segment ending before it starts is treated as zero-length.
pub fn chunk_segments(segments: &[Segment], max_words: usize) -> Result<Vec<Caption>, SrtError> {
    if max_words == 0 {
        return Err(SrtError::InvalidConfiguration(max_words));
    }
    if segments.is_empty() {
        return Err(SrtError::EmptyInput);
    }

    let mut captions = Vec::new();
    for segment in segments {
        let words: Vec<&str> = segment.text.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let start = segment.start;
        let end = if segment.end < start {
            warn!(start, end = segment.end, "segment ends before it starts, clamping");
            start
        } else {
            segment.end
        };

        if words.len() <= max_words {
            captions.push(Caption {
                index: captions.len() + 1,
                start,
                end,
                text: words.join(" "),
            });
            continue;
        }

        let word_duration = (end - start) / words.len() as f64;
        for (chunk_idx, chunk) in words.chunks(max_words).enumerate() {
            let offset = chunk_idx * max_words;
            let sub_start = start + offset as f64 * word_duration;
            let sub_end = sub_start + chunk.len() as f64 * word_duration;
            captions.push(Caption {
                index: captions.len() + 1,
                start: sub_start,
                end: sub_end,
                text: chunk.join(" "),
            });
        }
    }

    if captions.is_empty() {
        return Err(SrtError::EmptyInput);
    }
    Ok(captions)
}

/// Render segments as an SRT document, splitting any segment longer than `max_words`.
pub fn segments_to_srt(segments: &[Segment], max_words: usize) -> Result<String, SrtError> {
    let captions = chunk_segments(segments, max_words)?;
    Ok(captions
        .iter()
        .map(Caption::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}

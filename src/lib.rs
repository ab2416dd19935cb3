//! Turn speech-to-text segments into SubRip (`.srt`) subtitles.

pub mod api;
pub mod config;
pub mod scanner;
pub mod srt;
pub mod transcriber;

pub use srt::{chunk_segments, format_timestamp, segments_to_srt, Caption, Segment, SrtError};
pub use transcriber::{JsonFileTranscriber, Transcriber, TranscriptionError};

//! Input discovery and per-file conversion: transcribe, render SRT, write to disk.

use crate::srt::segments_to_srt;
use crate::transcriber::Transcriber;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Per-run settings shared by every file.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub model: String,
    pub language: Option<String>,
    pub max_words: usize,
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Outcome of a run: subtitles written, files skipped and files that failed.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: usize,
}

/// Convert `input` (a media file or a directory of them) into `.srt` files.
pub async fn run(
    input: &Path,
    transcriber: &dyn Transcriber,
    options: &JobOptions,
) -> Result<RunSummary> {
    if input.is_dir() {
        return process_directory(input, transcriber, options).await;
    }
    if !input.is_file() {
        bail!("file not found: {}", input.display());
    }

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| transcript_result_path(input, &options.model));
    process_file(input, &output, transcriber, options).await?;
    Ok(RunSummary {
        written: vec![output],
        ..RunSummary::default()
    })
}

/// Transcribe every pending media file under `dir`, continuing past per-file failures.
async fn process_directory(
    dir: &Path,
    transcriber: &dyn Transcriber,
    options: &JobOptions,
) -> Result<RunSummary> {
    if options.output.is_some() {
        bail!("--output cannot be used when the input is a directory");
    }
    if transcriber.single_source() {
        bail!(
            "the {} engine replays one transcription and cannot be used when the input is a directory",
            transcriber.name()
        );
    }

    let mut summary = RunSummary::default();
    let (jobs, skipped) = collect_jobs(dir, &options.model, options.force);
    summary.skipped = skipped;

    if jobs.is_empty() {
        info!(dir = %dir.display(), skipped, "no new media files to transcribe");
        return Ok(summary);
    }
    info!(pending = jobs.len(), skipped, "media files queued");

    for (input, output) in jobs {
        match process_file(&input, &output, transcriber, options).await {
            Ok(()) => summary.written.push(output),
            Err(e) => {
                error!(file = %input.display(), "{:#}", e);
                summary.failed += 1;
            }
        }
    }

    if summary.failed > 0 {
        return Err(anyhow!(
            "{} of {} files failed",
            summary.failed,
            summary.failed + summary.written.len()
        ));
    }
    Ok(summary)
}

/// Walk `dir` for media files, pairing each with its output path.
///
/// Files whose output already exists are counted as skipped unless `force` is set.
fn collect_jobs(dir: &Path, model: &str, force: bool) -> (Vec<(PathBuf, PathBuf)>, usize) {
    let mut jobs = Vec::new();
    let mut skipped = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(ext) = path.extension() else {
            continue;
        };
        if !is_media_extension(&ext.to_string_lossy().to_lowercase()) {
            continue;
        }

        let output = transcript_result_path(path, model);
        if output.exists() && !force {
            info!(file = %path.display(), "skipping, subtitles already exist");
            skipped += 1;
            continue;
        }
        jobs.push((path.to_path_buf(), output));
    }

    (jobs, skipped)
}

/// Transcribe one media file and write its subtitles to `output`.
async fn process_file(
    input: &Path,
    output: &Path,
    transcriber: &dyn Transcriber,
    options: &JobOptions,
) -> Result<()> {
    info!("[1/3] Using {} engine '{}'", transcriber.name(), options.model);

    info!("[2/3] Transcribing {:?}", input);
    let segments = transcriber
        .transcribe(input, options.language.as_deref())
        .await
        .with_context(|| format!("transcription of {} failed", input.display()))?;

    info!(
        "[3/3] Converting {} segments into SRT (max {} words each)",
        segments.len(),
        options.max_words
    );
    let srt_content = segments_to_srt(&segments, options.max_words)
        .with_context(|| format!("cannot build subtitles for {}", input.display()))?;

    if output.exists() {
        warn!(file = %output.display(), "overwriting existing subtitles");
    }
    fs::write(output, srt_content)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Done! Subtitles written to {:?}", output);
    Ok(())
}

/// Whether a lowercase extension names an audio or video container.
fn is_media_extension(ext: &str) -> bool {
    matches!(
        ext,
        "mkv"
            | "mp4"
            | "avi"
            | "mov"
            | "flv"
            | "wmv"
            | "webm"
            | "wav"
            | "ogg"
            | "opus"
            | "mp3"
            | "m4a"
            | "flac"
    )
}

/// Replace the input's extension with `<model>.srt`.
pub fn transcript_result_path(original: &Path, model: &str) -> PathBuf {
    let model: String = model
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let base_name = original
        .file_stem()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "subtitles".to_string());
    original.with_file_name(format!("{}.{}.srt", base_name, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srt::Segment;
    use crate::transcriber::{JsonFileTranscriber, TranscriptionError};
    use async_trait::async_trait;
    use std::fs as std_fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Returns canned segments, or a failure for files named `broken.*`.
    struct StubTranscriber {
        calls: Mutex<Vec<(PathBuf, Option<String>)>>,
    }

    impl StubTranscriber {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        fn name(&self) -> &str {
            "stub"
        }

        async fn transcribe(
            &self,
            path: &Path,
            language: Option<&str>,
        ) -> Result<Vec<Segment>, TranscriptionError> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_path_buf(), language.map(str::to_string)));
            if path.file_stem().is_some_and(|s| s == "broken") {
                return Err(TranscriptionError::NoSpeech(path.to_path_buf()));
            }
            Ok(vec![Segment::new(
                0.0,
                9.0,
                "the quick brown fox jumps over the lazy dog",
            )])
        }
    }

    fn options(max_words: usize) -> JobOptions {
        JobOptions {
            model: "small".to_string(),
            language: Some("en".to_string()),
            max_words,
            output: None,
            force: false,
        }
    }

    #[test]
    fn media_extension_detection() {
        for ext in ["mp3", "wav", "ogg", "mp4", "mkv", "webm", "flac"] {
            assert!(is_media_extension(ext));
        }

        for ext in ["txt", "rs", "json", "srt"] {
            assert!(!is_media_extension(ext));
        }
    }

    #[test]
    fn transcript_path_uses_model_suffix() {
        let path = Path::new("/tmp/input/video.mp4");
        assert_eq!(
            transcript_result_path(path, "small"),
            PathBuf::from("/tmp/input/video.small.srt")
        );

        let no_ext = Path::new("/tmp/audio");
        assert_eq!(
            transcript_result_path(no_ext, "whisper-1"),
            PathBuf::from("/tmp/audio.whisper-1.srt")
        );

        let dotted = Path::new("/tmp/my.talk.wav");
        assert_eq!(
            transcript_result_path(dotted, "openai/whisper-large-v3"),
            PathBuf::from("/tmp/my.talk.openai_whisper-large-v3.srt")
        );
    }

    #[test]
    fn walk_errors_are_skipped() {
        let dir = tempdir().unwrap();
        let (jobs, skipped) = collect_jobs(&dir.path().join("vanished"), "small", false);
        assert!(jobs.is_empty());
        assert_eq!(skipped, 0);
    }

    #[tokio::test]
    async fn single_file_writes_default_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("talk.wav");
        std_fs::write(&input, b"RIFF").unwrap();

        let stub = StubTranscriber::new();
        let summary = run(&input, &stub, &options(3)).await.unwrap();

        let expected = dir.path().join("talk.small.srt");
        assert_eq!(summary.written, vec![expected.clone()]);
        let srt = std_fs::read_to_string(&expected).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:03,000\nthe quick brown\n\n2\n"));
        assert!(srt.ends_with("3\n00:00:06,000 --> 00:00:09,000\nthe lazy dog\n"));

        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(input.clone(), Some("en".to_string()))]);
    }

    #[tokio::test]
    async fn explicit_output_path_is_honored() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("talk.wav");
        let output = dir.path().join("custom.srt");
        std_fs::write(&input, b"RIFF").unwrap();

        let mut opts = options(10);
        opts.output = Some(output.clone());
        run(&input, &StubTranscriber::new(), &opts).await.unwrap();

        assert!(output.exists());
        assert!(!dir.path().join("talk.small.srt").exists());
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let err = run(&dir.path().join("nope.mp4"), &StubTranscriber::new(), &options(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[tokio::test]
    async fn upstream_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.wav");
        std_fs::write(&input, b"RIFF").unwrap();

        let err = run(&input, &StubTranscriber::new(), &options(10))
            .await
            .unwrap_err();
        assert!(err.chain().any(|cause| cause
            .downcast_ref::<TranscriptionError>()
            .is_some()));
        assert!(!dir.path().join("broken.small.srt").exists());
    }

    #[tokio::test]
    async fn directory_skips_existing_and_reports_failures() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std_fs::create_dir(&nested).unwrap();
        std_fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std_fs::write(dir.path().join("done.mp4"), b"x").unwrap();
        std_fs::write(dir.path().join("done.small.srt"), "old").unwrap();
        std_fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std_fs::write(nested.join("b.wav"), b"x").unwrap();
        std_fs::write(nested.join("broken.ogg"), b"x").unwrap();

        let stub = StubTranscriber::new();
        let err = run(dir.path(), &stub, &options(10)).await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 files failed");

        assert!(dir.path().join("a.small.srt").exists());
        assert!(nested.join("b.small.srt").exists());
        assert_eq!(
            std_fs::read_to_string(dir.path().join("done.small.srt")).unwrap(),
            "old"
        );
        assert_eq!(stub.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn directory_force_reprocesses_existing() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("done.mp4"), b"x").unwrap();
        std_fs::write(dir.path().join("done.small.srt"), "old").unwrap();

        let mut opts = options(10);
        let summary = run(dir.path(), &StubTranscriber::new(), &opts).await.unwrap();
        assert!(summary.written.is_empty());
        assert_eq!(summary.skipped, 1);

        opts.force = true;
        let summary = run(dir.path(), &StubTranscriber::new(), &opts).await.unwrap();
        assert_eq!(summary.written.len(), 1);
        assert_ne!(
            std_fs::read_to_string(dir.path().join("done.small.srt")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn directory_rejects_explicit_output() {
        let dir = tempdir().unwrap();
        let mut opts = options(10);
        opts.output = Some(dir.path().join("out.srt"));
        let err = run(dir.path(), &StubTranscriber::new(), &opts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--output"));
    }

    #[tokio::test]
    async fn directory_rejects_single_dump_engine() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("media");
        std_fs::create_dir(&media).unwrap();
        std_fs::write(media.join("a.mp3"), b"x").unwrap();
        std_fs::write(media.join("b.mp3"), b"x").unwrap();
        let dump = dir.path().join("a.json");
        std_fs::write(&dump, r#"[{"start":0,"end":1,"text":"only for a"}]"#).unwrap();

        let err = run(&media, &JsonFileTranscriber::new(&dump), &options(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("directory"));
        assert!(!media.join("a.small.srt").exists());
        assert!(!media.join("b.small.srt").exists());

        // A single file still works with the same engine.
        let summary = run(&media.join("a.mp3"), &JsonFileTranscriber::new(&dump), &options(10))
            .await
            .unwrap();
        assert_eq!(summary.written, vec![media.join("a.small.srt")]);
    }
}

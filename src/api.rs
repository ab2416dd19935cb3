//! Client for OpenAI-compatible `/v1/audio/transcriptions` endpoints.

use crate::srt::Segment;
use crate::transcriber::{Transcriber, TranscriptionError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info};

/// `verbose_json` transcription response.
#[derive(Deserialize, Debug)]
pub struct VerboseResponse {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Option<Vec<Segment>>,
}

/// Uploads media files to a transcription API and returns timed segments.
pub struct ApiTranscriber {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl ApiTranscriber {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for ApiTranscriber {
    fn name(&self) -> &str {
        "api"
    }

    async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<Segment>, TranscriptionError> {
        if self.api_key.trim().is_empty() {
            return Err(TranscriptionError::MissingApiKey);
        }
        if !path.is_file() {
            return Err(TranscriptionError::FileNotFound(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file = File::open(path).await?;
        let stream = FramedRead::new(file, BytesCodec::new());
        let file_part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(stream))
            .file_name(file_name)
            .mime_str(mime_type_for(path))?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .part("file", file_part);
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        debug!(url = %self.api_url, model = %self.model, ?language, "uploading media");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranscriptionError::Api(format_api_error(status, &body)));
        }

        let parsed = parse_verbose_response(&body)?;
        if let Some(language) = &parsed.language {
            info!(%language, duration = ?parsed.duration, "transcription finished");
        }
        match parsed.segments {
            None => Err(TranscriptionError::MissingSegments),
            Some(segments) if segments.is_empty() => {
                Err(TranscriptionError::NoSpeech(path.to_path_buf()))
            }
            Some(segments) => Ok(segments),
        }
    }
}

fn parse_verbose_response(body: &str) -> Result<VerboseResponse, TranscriptionError> {
    serde_json::from_str::<VerboseResponse>(body).map_err(|e| {
        TranscriptionError::InvalidResponse(format!("{}: {}", e, truncate(body, 200)))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Infer the upload MIME type from the file extension.
fn mime_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension() else {
        return "application/octet-stream";
    };
    match ext.to_string_lossy().to_lowercase().as_str() {
        "wav" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Turn an API error body into a readable message.
fn format_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(obj) = value.as_object() {
            // OpenAI style: {"error": {"message": "...", "type": "..."}}
            if let Some(err) = obj.get("error").and_then(|v| v.as_object()) {
                let message = err.get("message").and_then(|v| v.as_str()).unwrap_or("");
                let kind = err.get("type").and_then(|v| v.as_str());
                return match kind {
                    Some(kind) => format!("API Error (HTTP {}, {}): {}", status, kind, message),
                    None => format!("API Error (HTTP {}): {}", status, message),
                };
            }

            let code = obj.get("code").and_then(|v| v.as_i64());
            let message = obj.get("message").and_then(|v| v.as_str());
            let data = obj.get("data").and_then(|v| v.as_str());

            if code.is_some() || message.is_some() || data.is_some() {
                return format!(
                    "API Error (HTTP {}, code {:?}): {} {}",
                    status,
                    code,
                    message.unwrap_or(""),
                    data.unwrap_or("")
                )
                .trim()
                .to_string();
            }
        } else if let Some(text) = value.as_str() {
            return format!("API Error (HTTP {}): {}", status, text);
        }
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return format!("Rate limited (HTTP 429): {}", body);
    }

    format!("API Error (HTTP {}): {}", status, body)
}

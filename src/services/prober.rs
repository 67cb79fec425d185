//! Media fragment probing via ffprobe.
//!
//! Fragment bytes are written to a temporary file and inspected with
//! two ffprobe invocations: one for container and stream metadata, and
//! one that attempts to decode a single video frame. A decode failure
//! whose error text matches encryption vocabulary is treated as a
//! positive "encrypted content" signal rather than a probe failure.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::errors::{AnalysisError, AppResult};

/// Error-text fragments that indicate the probe hit encrypted media
/// rather than a broken file.
const ENCRYPTION_VOCABULARY: &[&str] = &[
    "encrypt", "decrypt", "cenc", "aes-128", "sample-aes", "drm", "scrambl",
];

/// What one probed fragment looked like.
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub container_format: Option<String>,
    pub video_codec: Option<String>,
    pub codec_profile: Option<String>,
    pub resolution: Option<String>,
    pub frame_rate: Option<f64>,
    pub bitrate: Option<u64>,
    pub color_space: Option<String>,
    pub fragment_duration: Option<f64>,
    pub file_size: Option<u64>,
    pub encryption_observed: bool,
}

impl ProbeReport {
    /// Whether the probe actually read anything about the media, as
    /// opposed to only observing an encryption failure.
    pub fn describes_media(&self) -> bool {
        self.container_format.is_some()
            || self.video_codec.is_some()
            || self.resolution.is_some()
            || self.fragment_duration.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct FragmentProber {
    command: String,
    timeout: Duration,
}

impl FragmentProber {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            command: config.ffprobe_command.clone(),
            timeout: config.timeout,
        }
    }

    pub async fn probe(&self, fragment: &[u8]) -> AppResult<ProbeReport> {
        let file = write_temp_fragment(fragment)?;
        let path = file.path();

        let mut report = match self.probe_metadata(path).await {
            Ok(report) => report,
            Err(stderr) => {
                // an unreadable fragment is still informative when the
                // failure text points at encryption
                if matches_encryption_vocabulary(&stderr) {
                    debug!("Metadata probe failed with encryption signal: {}", stderr.trim());
                    ProbeReport {
                        encryption_observed: true,
                        ..ProbeReport::default()
                    }
                } else {
                    return Err(AnalysisError::probe(format!(
                        "ffprobe could not read fragment: {}",
                        stderr.trim()
                    )));
                }
            }
        };
        report.file_size = Some(fragment.len() as u64);

        if !report.encryption_observed {
            report.encryption_observed = self.frame_decode_fails_encrypted(path).await;
        }

        Ok(report)
    }

    /// First invocation: container format and stream metadata as JSON.
    /// Returns the stderr text on failure so the caller can classify it.
    async fn probe_metadata(&self, path: &Path) -> Result<ProbeReport, String> {
        let output = self
            .run_ffprobe(&[
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ], path)
            .await?;

        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).into_owned());
        }

        let parsed: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("unparsable ffprobe output: {e}"))?;
        Ok(report_from_json(&parsed))
    }

    /// Second invocation: try to decode one video frame. Only an error
    /// whose text matches the encryption vocabulary counts as a
    /// positive signal; other failures are ignored.
    async fn frame_decode_fails_encrypted(&self, path: &Path) -> bool {
        let output = self
            .run_ffprobe(&[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "frame=pict_type",
                "-read_intervals",
                "%+#1",
                "-print_format",
                "json",
            ], path)
            .await;

        match output {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                (!output.status.success() || !stderr.is_empty())
                    && matches_encryption_vocabulary(&stderr)
            }
            Err(e) => {
                debug!("Frame decode check failed to run: {}", e);
                false
            }
        }
    }

    async fn run_ffprobe(
        &self,
        args: &[&str],
        path: &Path,
    ) -> Result<std::process::Output, String> {
        let mut cmd = Command::new(&self.command);
        cmd.args(args).arg(path).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(format!("failed to run {}: {e}", self.command)),
            Err(_) => {
                warn!("ffprobe timed out after {:?}", self.timeout);
                Err(format!("{} timed out", self.command))
            }
        }
    }
}

fn write_temp_fragment(fragment: &[u8]) -> AppResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("fragment-")
        .suffix(".ts")
        .tempfile()
        .map_err(|e| AnalysisError::probe(format!("could not create temp file: {e}")))?;
    file.write_all(fragment)
        .map_err(|e| AnalysisError::probe(format!("could not write temp file: {e}")))?;
    Ok(file)
}

fn matches_encryption_vocabulary(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ENCRYPTION_VOCABULARY.iter().any(|word| lower.contains(word))
}

fn report_from_json(parsed: &Value) -> ProbeReport {
    let mut report = ProbeReport::default();

    if let Some(format) = parsed.get("format") {
        report.container_format = format
            .get("format_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        report.fragment_duration = format
            .get("duration")
            .and_then(Value::as_str)
            .and_then(|d| d.parse().ok());
    }

    let video_stream = parsed
        .get("streams")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|stream| stream.get("codec_type").and_then(Value::as_str) == Some("video"));

    if let Some(stream) = video_stream {
        report.video_codec = stream
            .get("codec_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        report.codec_profile = stream
            .get("profile")
            .and_then(Value::as_str)
            .map(str::to_string);
        report.resolution = match (
            stream.get("width").and_then(Value::as_u64),
            stream.get("height").and_then(Value::as_u64),
        ) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        };
        report.frame_rate = stream
            .get("r_frame_rate")
            .and_then(Value::as_str)
            .and_then(crate::extractors::codec::parse_frame_rate);
        report.bitrate = stream
            .get("bit_rate")
            .and_then(Value::as_str)
            .and_then(|b| b.parse().ok());
        report.color_space = stream
            .get("pix_fmt")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    report
}

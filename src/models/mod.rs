//! Data model for stream analysis requests and responses
//!
//! Everything here is created fresh per analysis request and discarded
//! once the response has been serialized; there is no persistence and no
//! cross-request state.

use serde::{Deserialize, Serialize};

/// Manifest format, determined from the reference's path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Hls,
    Dash,
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hls => write!(f, "hls"),
            Self::Dash => write!(f, "dash"),
        }
    }
}

/// Request body for `POST /api/analyze`.
///
/// `url` is optional so that a missing key fails request validation
/// with a 422 instead of a generic deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub url: Option<String>,
}

/// One rung of the encoding ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateInfo {
    /// 0-based level index, stable within one analysis
    pub level: usize,
    /// Bitrate in bits per second, 0 if undeclared
    pub bitrate: u64,
    /// Resolution as "WxH" when declared
    pub resolution: Option<String>,
    /// Normalized video codec name (e.g. "H.264")
    pub codec: Option<String>,
    /// Frame rate in fps, fractional rates resolved to decimal
    pub frame_rate: Option<f64>,
    /// Normalized audio codec name when declared alongside the video codec
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// BCP-47 language code, "und" when absent
    pub language: String,
    pub name: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub bitrate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub language: String,
    pub name: Option<String>,
    /// Normalized subtitle format (e.g. "WebVTT", "TTML")
    pub format: Option<String>,
    #[serde(default)]
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailTrack {
    pub resolution: Option<String>,
    pub url: Option<String>,
    /// Image format, defaults to "JPEG"
    pub format: Option<String>,
}

/// Where a DRM verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrmSource {
    #[serde(rename = "manifest")]
    Manifest,
    #[serde(rename = "observed-by-probe")]
    ObservedByProbe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrmInfo {
    /// Normalized DRM system name, or a sentinel for "detected but
    /// unidentified" when only fragment probing saw encryption
    pub system: String,
    pub key_id: Option<String>,
    pub license_url: Option<String>,
    /// Protection System Specific Header, base64; absent for HLS
    pub pssh: Option<String>,
    pub source: DrmSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scte35Marker {
    pub event_id: Option<u64>,
    /// Presentation timestamp in 90kHz ticks
    pub pts: Option<u64>,
    /// Splice command tag; "unknown" when the decoder cannot classify it
    pub command_type: String,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Unique Program ID from the segmentation descriptor
    pub upid: Option<String>,
    pub segmentation_type: Option<String>,
    #[serde(default)]
    pub out_of_network: bool,
    #[serde(default)]
    pub auto_return: bool,
    /// Pre-roll in milliseconds; no current source carries it
    pub pre_roll: Option<u64>,
}

/// Per-fragment probe result for one bitrate level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub level: usize,
    pub container_format: Option<String>,
    pub video_codec: Option<String>,
    pub codec_profile: Option<String>,
    pub resolution: Option<String>,
    pub frame_rate: Option<f64>,
    pub bitrate: Option<u64>,
    pub color_space: Option<String>,
    pub fragment_duration: Option<f64>,
    pub file_size: Option<u64>,
}

/// The unified analysis result.
///
/// Every list field serializes as an empty list rather than being
/// absent; `drm_info` is the single reconciled verdict, never a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub manifest_type: ManifestKind,
    pub manifest_url: String,
    #[serde(default)]
    pub bitrates: Vec<BitrateInfo>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitle_tracks: Vec<SubtitleTrack>,
    #[serde(default)]
    pub thumbnail_tracks: Vec<ThumbnailTrack>,
    pub drm_info: Option<DrmInfo>,
    #[serde(default)]
    pub scte35_markers: Vec<Scte35Marker>,
    #[serde(default)]
    pub video_metadata: Vec<VideoMetadata>,
}

/// Structured error body returned by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind
    pub error: String,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

//! Format-specific manifest extractors.
//!
//! Both extractors reduce their source format to [`ManifestExtract`],
//! the common intermediate the rest of the pipeline works from. The
//! parsed documents themselves stay available so marker extraction
//! and fragment sampling can revisit structure the common model does
//! not carry.

pub mod codec;
pub mod dash;
pub mod hls;

use crate::models::{
    AudioTrack, BitrateInfo, DrmInfo, SubtitleTrack, ThumbnailTrack,
};

/// Common intermediate representation shared by the HLS and DASH
/// extractors.
#[derive(Debug, Clone, Default)]
pub struct ManifestExtract {
    pub bitrates: Vec<BitrateInfo>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
    pub thumbnail_tracks: Vec<ThumbnailTrack>,
    pub drm_info: Option<DrmInfo>,
}

/// A successfully parsed manifest of either format.
#[derive(Debug)]
pub enum ParsedManifest {
    Hls(hls::HlsDocument),
    Dash(dash::DashDocument),
}

impl ParsedManifest {
    pub fn extract(&self) -> ManifestExtract {
        match self {
            Self::Hls(doc) => hls::extract(doc),
            Self::Dash(doc) => dash::extract(doc),
        }
    }
}

//! SCTE-35 marker unification.
//!
//! Both manifest formats carry the same binary signaling wrapped in
//! different containers. This service locates the payloads, decodes
//! them, and maps the decoded fields into one marker schema. A payload
//! that fails to decode is dropped rather than failing the request;
//! without the decoding capability the whole extraction fails with a
//! typed error so callers can tell "no markers" from "decoding
//! unsupported".

use tracing::debug;

use crate::errors::{AnalysisError, AppResult};
use crate::extractors::dash::{self, DashDocument};
use crate::extractors::hls;
use crate::models::Scte35Marker;
use crate::scte35::{self, Scte35Decoder, SpliceInfo};

pub struct MarkerExtractor {
    decoder: Option<Scte35Decoder>,
}

impl MarkerExtractor {
    pub fn new(decoder: Option<Scte35Decoder>) -> Self {
        Self { decoder }
    }

    /// Extract markers from raw HLS playlist text.
    pub fn from_hls(&self, content: &str) -> AppResult<Vec<Scte35Marker>> {
        let decoder = self
            .decoder
            .as_ref()
            .ok_or(AnalysisError::CueDecodingUnsupported)?;

        let mut markers = Vec::new();
        for cue in hls::cue_attachments(content) {
            let info = match decoder.decode(&cue.payload) {
                Ok(info) => info,
                Err(e) => {
                    debug!("Dropping undecodable cue payload: {}", e);
                    continue;
                }
            };

            let duration = info
                .segmentation
                .as_ref()
                .and_then(|seg| seg.duration_ticks)
                .or(info.break_duration_ticks)
                .map(scte35::ticks_to_seconds)
                .or(cue.declared_duration);

            markers.push(build_marker(&info, None, None, duration));
        }
        Ok(markers)
    }

    /// Extract markers from DASH event streams.
    pub fn from_dash(&self, doc: &DashDocument) -> AppResult<Vec<Scte35Marker>> {
        let decoder = self
            .decoder
            .as_ref()
            .ok_or(AnalysisError::CueDecodingUnsupported)?;

        let mut markers = Vec::new();
        for event in dash::cue_events(doc) {
            let info = match decoder.decode(&event.payload) {
                Ok(info) => info,
                Err(e) => {
                    debug!("Dropping undecodable event payload: {}", e);
                    continue;
                }
            };

            let duration = event.duration.or_else(|| {
                info.segmentation
                    .as_ref()
                    .and_then(|seg| seg.duration_ticks)
                    .or(info.break_duration_ticks)
                    .map(scte35::ticks_to_seconds)
            });

            markers.push(build_marker(
                &info,
                event.declared_id,
                event.presentation_time,
                duration,
            ));
        }
        Ok(markers)
    }
}

/// Field-mapping common to both formats. Event id preference:
/// segmentation descriptor, then splice command, then the container's
/// declared id. The container's presentation time outranks the
/// command's own splice time when both exist.
fn build_marker(
    info: &SpliceInfo,
    declared_id: Option<u64>,
    declared_pts: Option<u64>,
    duration: Option<f64>,
) -> Scte35Marker {
    let segmentation = info.segmentation.as_ref();

    let event_id = segmentation
        .map(|seg| seg.event_id)
        .or(info.command_event_id)
        .or(declared_id);

    let command_type = if info.command_type.is_empty() {
        "unknown".to_string()
    } else {
        info.command_type.clone()
    };

    Scte35Marker {
        event_id,
        pts: declared_pts.or(info.pts),
        command_type,
        duration,
        upid: segmentation.and_then(|seg| seg.upid.clone()),
        segmentation_type: segmentation
            .map(|seg| scte35::segmentation_type_name(seg.type_id)),
        out_of_network: info.out_of_network,
        auto_return: info.auto_return,
        pre_roll: None,
    }
}

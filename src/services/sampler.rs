//! Fragment sampling.
//!
//! For each bitrate level a bounded number of fragment references is
//! resolved against the manifest location, fetched, and probed. Levels
//! are sampled concurrently; only the first fragment that probes
//! successfully contributes a VideoMetadata entry for its level, and
//! any download or probe failure skips that fragment without touching
//! the rest of the analysis.

use tracing::debug;
use url::Url;

use crate::extractors::{dash, hls, ParsedManifest};
use crate::models::VideoMetadata;
use crate::services::prober::{FragmentProber, ProbeReport};
use crate::utils::http_client::BoundedHttpClient;
use crate::utils::url::resolve_reference;

pub struct FragmentSampler {
    http: BoundedHttpClient,
    prober: FragmentProber,
    fragments_per_level: usize,
}

/// Everything fragment sampling learned.
#[derive(Debug, Default)]
pub struct SampleOutcome {
    pub video_metadata: Vec<VideoMetadata>,
    /// True when any probed fragment showed encryption signals
    pub encryption_observed: bool,
}

/// Where one level's fragment candidates come from.
enum LevelSource {
    /// An HLS variant playlist that must be fetched to find segments
    VariantPlaylist(String),
    /// Direct fragment references, resolved against the manifest URL
    Fragments(Vec<String>),
}

impl FragmentSampler {
    pub fn new(
        http: BoundedHttpClient,
        prober: FragmentProber,
        fragments_per_level: usize,
    ) -> Self {
        Self {
            http,
            prober,
            fragments_per_level,
        }
    }

    pub async fn sample(&self, manifest_url: &Url, manifest: &ParsedManifest) -> SampleOutcome {
        let sources = level_sources(manifest);

        let samples = futures::future::join_all(
            sources
                .into_iter()
                .enumerate()
                .map(|(level, source)| self.sample_level(manifest_url, level, source)),
        )
        .await;

        let mut outcome = SampleOutcome::default();
        for sample in samples.into_iter().flatten() {
            outcome.encryption_observed |= sample.encryption_observed;
            if let Some(metadata) = sample.metadata {
                outcome.video_metadata.push(metadata);
            }
        }
        outcome
    }

    async fn sample_level(
        &self,
        manifest_url: &Url,
        level: usize,
        source: LevelSource,
    ) -> Option<LevelSample> {
        let candidates = match source {
            LevelSource::VariantPlaylist(uri) => {
                self.variant_fragment_urls(manifest_url, level, &uri).await?
            }
            LevelSource::Fragments(uris) => uris
                .iter()
                .take(self.fragments_per_level)
                .filter_map(|uri| resolve_reference(manifest_url, uri).ok())
                .collect(),
        };

        let mut encryption_observed = false;
        for url in candidates {
            let fragment = match self.http.fetch_fragment(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Level {}: skipping fragment {}: {}", level, url, e);
                    continue;
                }
            };
            match self.prober.probe(&fragment).await {
                Ok(report) if report.describes_media() => {
                    debug!("Level {}: probed {} ({} bytes)", level, url, fragment.len());
                    return Some(LevelSample {
                        encryption_observed: encryption_observed | report.encryption_observed,
                        metadata: Some(metadata_from_report(level, report)),
                    });
                }
                Ok(report) => {
                    // an encryption-only report is a signal worth keeping,
                    // but it does not count as a probed fragment
                    encryption_observed |= report.encryption_observed;
                }
                Err(e) => {
                    debug!("Level {}: probe failed for {}: {}", level, url, e);
                }
            }
        }

        if encryption_observed {
            return Some(LevelSample {
                encryption_observed: true,
                metadata: None,
            });
        }
        None
    }

    /// Fetch an HLS variant playlist and return its first few segment
    /// URLs, resolved against the variant playlist's own location.
    async fn variant_fragment_urls(
        &self,
        manifest_url: &Url,
        level: usize,
        variant_uri: &str,
    ) -> Option<Vec<Url>> {
        let variant_url = resolve_reference(manifest_url, variant_uri).ok()?;
        let content = match self.http.fetch_manifest(&variant_url).await {
            Ok(content) => content,
            Err(e) => {
                debug!("Level {}: variant playlist fetch failed: {}", level, e);
                return None;
            }
        };
        let media = match hls::parse(&content) {
            Ok(hls::HlsDocument::Media(media)) => media,
            Ok(hls::HlsDocument::Master(_)) => {
                debug!("Level {}: variant URI pointed at another master playlist", level);
                return None;
            }
            Err(e) => {
                debug!("Level {}: variant playlist unparsable: {}", level, e);
                return None;
            }
        };

        Some(
            hls::segment_urls(&media)
                .iter()
                .take(self.fragments_per_level)
                .filter_map(|uri| resolve_reference(&variant_url, uri).ok())
                .collect(),
        )
    }
}

struct LevelSample {
    metadata: Option<VideoMetadata>,
    encryption_observed: bool,
}

/// Per-level fragment sources, index-aligned with the bitrate ladder.
fn level_sources(manifest: &ParsedManifest) -> Vec<LevelSource> {
    match manifest {
        ParsedManifest::Hls(hls::HlsDocument::Master(master)) => hls::variant_urls(master)
            .into_iter()
            .map(LevelSource::VariantPlaylist)
            .collect(),
        // a media playlist is its own single level
        ParsedManifest::Hls(hls::HlsDocument::Media(media)) => {
            vec![LevelSource::Fragments(hls::segment_urls(media))]
        }
        ParsedManifest::Dash(doc) => dash::video_base_urls(doc)
            .into_iter()
            .map(LevelSource::Fragments)
            .collect(),
    }
}

fn metadata_from_report(level: usize, report: ProbeReport) -> VideoMetadata {
    VideoMetadata {
        level,
        container_format: report.container_format,
        video_codec: report.video_codec,
        codec_profile: report.codec_profile,
        resolution: report.resolution,
        frame_rate: report.frame_rate,
        bitrate: report.bitrate,
        color_space: report.color_space,
        fragment_duration: report.fragment_duration,
        file_size: report.file_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_level_sources_align_with_ladder() {
        let mpd = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period>
            <AdaptationSet contentType="video" mimeType="video/mp4">
              <Representation id="v0" bandwidth="1000" width="640" height="360">
                <BaseURL>low/seg.mp4</BaseURL>
              </Representation>
              <Representation id="v1" bandwidth="2000" width="1280" height="720"/>
            </AdaptationSet></Period></MPD>"#;
        let manifest = ParsedManifest::Dash(dash::parse(mpd).unwrap());

        let sources = level_sources(&manifest);
        assert_eq!(sources.len(), 2);
        match &sources[0] {
            LevelSource::Fragments(uris) => assert_eq!(uris, &vec!["low/seg.mp4".to_string()]),
            _ => panic!("expected direct fragment source"),
        }
        match &sources[1] {
            LevelSource::Fragments(uris) => assert!(uris.is_empty()),
            _ => panic!("expected direct fragment source"),
        }
    }

    #[test]
    fn hls_media_playlist_is_one_level() {
        let playlist = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n#EXTINF:6.0,\nseg1.ts\n#EXT-X-ENDLIST\n";
        let manifest = ParsedManifest::Hls(hls::parse(playlist).unwrap());

        let sources = level_sources(&manifest);
        assert_eq!(sources.len(), 1);
        match &sources[0] {
            LevelSource::Fragments(uris) => assert_eq!(uris.len(), 2),
            _ => panic!("expected direct fragment source"),
        }
    }

    #[test]
    fn probe_report_maps_onto_video_metadata() {
        let report = ProbeReport {
            container_format: Some("mpegts".to_string()),
            video_codec: Some("h264".to_string()),
            resolution: Some("1280x720".to_string()),
            file_size: Some(4096),
            ..ProbeReport::default()
        };
        let metadata = metadata_from_report(3, report);
        assert_eq!(metadata.level, 3);
        assert_eq!(metadata.container_format.as_deref(), Some("mpegts"));
        assert_eq!(metadata.file_size, Some(4096));
    }
}

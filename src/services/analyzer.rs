//! Analysis orchestration.
//!
//! Runs the pipeline end to end: gate the URL, fetch the manifest,
//! extract the common model, unify markers, sample fragments, and
//! reconcile the DRM verdict. Everything downstream of a successfully
//! parsed manifest degrades to partial results instead of failing the
//! request.

use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{AnalysisError, AppResult};
use crate::extractors::{dash, hls, ParsedManifest};
use crate::models::{AnalyzeResponse, ManifestKind, Scte35Marker};
use crate::scte35::Scte35Decoder;
use crate::services::drm;
use crate::services::markers::MarkerExtractor;
use crate::services::prober::FragmentProber;
use crate::services::sampler::{FragmentSampler, SampleOutcome};
use crate::utils::http_client::BoundedHttpClient;
use crate::utils::url::classify_manifest_url;

pub struct StreamAnalyzer {
    http: BoundedHttpClient,
    markers: MarkerExtractor,
    sampler: Option<FragmentSampler>,
}

impl StreamAnalyzer {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = BoundedHttpClient::new(&config.fetch)?;

        let decoder = config.scte35.enabled.then(Scte35Decoder::new);
        let sampler = config.probe.enabled.then(|| {
            FragmentSampler::new(
                http.clone(),
                FragmentProber::new(&config.probe),
                config.probe.fragments_per_level,
            )
        });

        Ok(Self {
            http,
            markers: MarkerExtractor::new(decoder),
            sampler,
        })
    }

    pub async fn analyze(&self, raw_url: &str) -> AppResult<AnalyzeResponse> {
        let (url, kind) = classify_manifest_url(raw_url)?;
        info!("Analyzing {} manifest at {}", kind, url);

        let content = self.http.fetch_manifest(&url).await?;
        let manifest = match kind {
            ManifestKind::Hls => ParsedManifest::Hls(hls::parse(&content)?),
            ManifestKind::Dash => ParsedManifest::Dash(dash::parse(&content)?),
        };

        let extract = manifest.extract();
        let scte35_markers = self.unify_markers(&manifest, &content)?;

        let sample = match &self.sampler {
            Some(sampler) => sampler.sample(&url, &manifest).await,
            None => SampleOutcome::default(),
        };

        let drm_info = drm::reconcile(extract.drm_info, sample.encryption_observed);

        info!(
            "Analysis of {} complete: {} levels, {} markers, {} probed fragments",
            url,
            extract.bitrates.len(),
            scte35_markers.len(),
            sample.video_metadata.len()
        );

        Ok(AnalyzeResponse {
            manifest_type: kind,
            manifest_url: url.to_string(),
            bitrates: extract.bitrates,
            audio_tracks: extract.audio_tracks,
            subtitle_tracks: extract.subtitle_tracks,
            thumbnail_tracks: extract.thumbnail_tracks,
            drm_info,
            scte35_markers,
            video_metadata: sample.video_metadata,
        })
    }

    fn unify_markers(
        &self,
        manifest: &ParsedManifest,
        content: &str,
    ) -> AppResult<Vec<Scte35Marker>> {
        let result = match manifest {
            ParsedManifest::Hls(_) => self.markers.from_hls(content),
            ParsedManifest::Dash(doc) => self.markers.from_dash(doc),
        };
        match result {
            Ok(markers) => Ok(markers),
            Err(AnalysisError::CueDecodingUnsupported) => {
                warn!("SCTE-35 decoding disabled, reporting no markers");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

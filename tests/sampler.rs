//! Fragment sampler tests against a local mock upstream, with ffprobe
//! replaced by a stub script. The sampler is driven directly because
//! the URL gate (tested elsewhere) blocks loopback hosts.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stream_lens::config::{FetchConfig, ProbeConfig};
use stream_lens::extractors::{dash, ParsedManifest};
use stream_lens::services::prober::FragmentProber;
use stream_lens::services::sampler::FragmentSampler;
use stream_lens::utils::http_client::BoundedHttpClient;
use url::Url;

const MPD_TWO_LEVELS: &str = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period>
    <AdaptationSet contentType="video" mimeType="video/mp4">
      <Representation id="v0" bandwidth="1000" width="640" height="360">
        <BaseURL>level0/frag.ts</BaseURL>
      </Representation>
      <Representation id="v1" bandwidth="2000" width="1280" height="720">
        <BaseURL>level1/frag.ts</BaseURL>
      </Representation>
    </AdaptationSet></Period></MPD>"#;

/// Writes an executable shell script to stand in for ffprobe.
fn stub_ffprobe(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let script = dir.path().join("ffprobe-stub.sh");
    fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn sampler_with(script: PathBuf) -> FragmentSampler {
    let fetch = FetchConfig {
        manifest_timeout: Duration::from_secs(5),
        fragment_timeout: Duration::from_secs(5),
        max_manifest_size: 1024 * 1024,
        max_fragment_size: 1024 * 1024,
    };
    let probe = ProbeConfig {
        enabled: true,
        ffprobe_command: script.to_string_lossy().into_owned(),
        timeout: Duration::from_secs(5),
        fragments_per_level: 2,
    };
    FragmentSampler::new(
        BoundedHttpClient::new(&fetch).expect("client should build"),
        FragmentProber::new(&probe),
        probe.fragments_per_level,
    )
}

#[tokio::test]
async fn fragment_download_failure_does_not_remove_other_levels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/level0/frag.ts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level1/frag.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1880]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let script = stub_ffprobe(
        &dir,
        r#"printf '%s' '{"format":{"format_name":"mpegts","duration":"4.0"},"streams":[{"codec_type":"video","codec_name":"h264","width":1280,"height":720,"r_frame_rate":"25/1"}]}'"#,
    );

    let manifest_url = Url::parse(&format!("{}/stream.mpd", server.uri())).unwrap();
    let manifest = ParsedManifest::Dash(dash::parse(MPD_TWO_LEVELS).unwrap());

    let outcome = sampler_with(script).sample(&manifest_url, &manifest).await;

    assert_eq!(outcome.video_metadata.len(), 1);
    assert_eq!(outcome.video_metadata[0].level, 1);
    assert_eq!(outcome.video_metadata[0].video_codec.as_deref(), Some("h264"));
    assert_eq!(outcome.video_metadata[0].file_size, Some(1880));
    assert!(!outcome.encryption_observed);
}

#[tokio::test]
async fn encryption_only_probe_failure_reports_no_metadata() {
    let server = MockServer::start().await;
    for route in ["/level0/frag.ts", "/level1/frag.ts"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 188]))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let script = stub_ffprobe(
        &dir,
        "echo 'Error: CENC decryption key not available' >&2\nexit 1",
    );

    let manifest_url = Url::parse(&format!("{}/stream.mpd", server.uri())).unwrap();
    let manifest = ParsedManifest::Dash(dash::parse(MPD_TWO_LEVELS).unwrap());

    let outcome = sampler_with(script).sample(&manifest_url, &manifest).await;

    assert!(outcome.video_metadata.is_empty());
    assert!(outcome.encryption_observed);
}

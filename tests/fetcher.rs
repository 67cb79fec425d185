//! Bounded fetcher tests against a local mock upstream. These go
//! through the fetcher directly because the URL gate (tested
//! elsewhere) blocks loopback hosts long before a fetch happens.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stream_lens::config::FetchConfig;
use stream_lens::errors::AnalysisError;
use stream_lens::utils::http_client::BoundedHttpClient;
use url::Url;

fn small_limits() -> FetchConfig {
    FetchConfig {
        manifest_timeout: Duration::from_secs(5),
        fragment_timeout: Duration::from_secs(5),
        max_manifest_size: 1024,
        max_fragment_size: 2048,
    }
}

fn client() -> BoundedHttpClient {
    BoundedHttpClient::new(&small_limits()).expect("client should build")
}

#[tokio::test]
async fn fetches_manifest_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/main.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/main.m3u8", server.uri())).unwrap();
    let body = client().fetch_manifest(&url).await.unwrap();
    assert_eq!(body, "#EXTM3U\n");
}

#[tokio::test]
async fn upstream_error_status_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.m3u8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/gone.m3u8", server.uri())).unwrap();
    let err = client().fetch_manifest(&url).await.unwrap_err();
    assert!(matches!(err, AnalysisError::UpstreamStatus { status: 404 }));
}

#[tokio::test]
async fn oversized_manifest_is_rejected() {
    let server = MockServer::start().await;
    let big = "x".repeat(4096);
    Mock::given(method("GET"))
        .and(path("/huge.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(big))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/huge.m3u8", server.uri())).unwrap();
    let err = client().fetch_manifest(&url).await.unwrap_err();
    assert!(matches!(err, AnalysisError::PayloadTooLarge { .. }));
}

#[tokio::test]
async fn fragment_ceiling_is_independent_of_manifest_ceiling() {
    let server = MockServer::start().await;
    // 1.5 KiB: over the manifest ceiling, under the fragment ceiling
    let body = vec![0u8; 1536];
    Mock::given(method("GET"))
        .and(path("/seg0.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/seg0.ts", server.uri())).unwrap();
    let client = client();

    let fragment = client.fetch_fragment(&url).await.unwrap();
    assert_eq!(fragment.len(), 1536);

    let err = client.fetch_manifest(&url).await.unwrap_err();
    assert!(matches!(err, AnalysisError::PayloadTooLarge { .. }));
}

#[tokio::test]
async fn non_utf8_manifest_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFE, 0x00]))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/bad.m3u8", server.uri())).unwrap();
    let err = client().fetch_manifest(&url).await.unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedDocument { .. }));
}

#[tokio::test]
async fn timeout_is_reported_as_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("#EXTM3U\n")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        manifest_timeout: Duration::from_millis(200),
        ..small_limits()
    };
    let client = BoundedHttpClient::new(&config).unwrap();

    let url = Url::parse(&format!("{}/slow.m3u8", server.uri())).unwrap();
    let err = client.fetch_manifest(&url).await.unwrap_err();
    assert!(matches!(err, AnalysisError::FetchTimeout { .. }));
}

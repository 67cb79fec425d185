//! HLS playlist extraction.
//!
//! Master playlists yield the bitrate ladder, alternate renditions and
//! I-frame thumbnail tracks. Media playlists yield segment-level
//! encryption keys and segment URIs for fragment sampling. Cue tags
//! are collected by a raw line scan because SCTE-35 carriage in HLS is
//! spread across vendor tags the structural parser does not model.

use m3u8_rs::{
    AlternativeMediaType, Key, KeyMethod, MasterPlaylist, MediaPlaylist, Playlist, VariantStream,
};
use tracing::debug;

use crate::errors::{AnalysisError, AppResult};
use crate::extractors::{codec, ManifestExtract};
use crate::models::{
    AudioTrack, BitrateInfo, DrmInfo, DrmSource, SubtitleTrack, ThumbnailTrack,
};

#[derive(Debug)]
pub enum HlsDocument {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

pub fn parse(content: &str) -> AppResult<HlsDocument> {
    match m3u8_rs::parse_playlist(content.as_bytes()) {
        Ok((_, Playlist::MasterPlaylist(pl))) => Ok(HlsDocument::Master(pl)),
        Ok((_, Playlist::MediaPlaylist(pl))) => Ok(HlsDocument::Media(pl)),
        Err(e) => Err(AnalysisError::malformed(format!(
            "invalid HLS playlist: {e}"
        ))),
    }
}

pub fn extract(doc: &HlsDocument) -> ManifestExtract {
    match doc {
        HlsDocument::Master(master) => extract_master(master),
        HlsDocument::Media(media) => extract_media(media),
    }
}

/// Variant playlist URIs in ladder order. Index i is the playlist for
/// bitrate level i; the sampler relies on this alignment.
pub fn variant_urls(master: &MasterPlaylist) -> Vec<String> {
    ladder_variants(master)
        .map(|variant| variant.uri.clone())
        .collect()
}

/// Segment URIs of a media playlist, in declaration order.
pub fn segment_urls(media: &MediaPlaylist) -> Vec<String> {
    media
        .segments
        .iter()
        .map(|segment| segment.uri.clone())
        .collect()
}

fn ladder_variants(master: &MasterPlaylist) -> impl Iterator<Item = &VariantStream> {
    master.variants.iter().filter(|v| !v.is_i_frame)
}

fn extract_master(master: &MasterPlaylist) -> ManifestExtract {
    let mut extract = ManifestExtract::default();

    for (level, variant) in ladder_variants(master).enumerate() {
        let resolution = variant
            .resolution
            .as_ref()
            .map(|r| format!("{}x{}", r.width, r.height));
        let codec = variant
            .codecs
            .as_deref()
            .and_then(codec::video_codec_from_list);
        let audio_codec = variant
            .codecs
            .as_deref()
            .and_then(codec::audio_codec_from_list);

        extract.bitrates.push(BitrateInfo {
            level,
            bitrate: variant.bandwidth,
            resolution,
            codec,
            frame_rate: variant.frame_rate,
            audio_codec,
        });
    }

    for alternative in &master.alternatives {
        match alternative.media_type {
            AlternativeMediaType::Audio => {
                extract.audio_tracks.push(AudioTrack {
                    language: alternative
                        .language
                        .clone()
                        .unwrap_or_else(|| "und".to_string()),
                    name: non_empty(&alternative.name),
                    codec: codec::audio_codec_from_group_id(&alternative.group_id),
                    channels: alternative
                        .channels
                        .as_deref()
                        .and_then(|c| c.parse().ok()),
                    bitrate: None,
                });
            }
            AlternativeMediaType::Subtitles | AlternativeMediaType::ClosedCaptions => {
                extract.subtitle_tracks.push(SubtitleTrack {
                    language: alternative
                        .language
                        .clone()
                        .unwrap_or_else(|| "und".to_string()),
                    name: non_empty(&alternative.name),
                    format: Some(subtitle_format(alternative.uri.as_deref())),
                    forced: alternative.forced,
                });
            }
            _ => {}
        }
    }

    // I-frame-only variants serve as trick-play thumbnail tracks
    for variant in master.variants.iter().filter(|v| v.is_i_frame) {
        extract.thumbnail_tracks.push(ThumbnailTrack {
            resolution: variant
                .resolution
                .as_ref()
                .map(|r| format!("{}x{}", r.width, r.height)),
            url: Some(variant.uri.clone()),
            format: Some("JPEG".to_string()),
        });
    }

    extract.drm_info = master
        .session_key
        .iter()
        .find_map(|session_key| drm_from_key(&session_key.0));

    debug!(
        "HLS master: {} levels, {} audio, {} subtitle, {} thumbnail tracks",
        extract.bitrates.len(),
        extract.audio_tracks.len(),
        extract.subtitle_tracks.len(),
        extract.thumbnail_tracks.len()
    );
    extract
}

fn extract_media(media: &MediaPlaylist) -> ManifestExtract {
    ManifestExtract {
        drm_info: media
            .segments
            .iter()
            .find_map(|segment| segment.key.as_ref().and_then(drm_from_key)),
        ..ManifestExtract::default()
    }
}

fn drm_from_key(key: &Key) -> Option<DrmInfo> {
    let system = match &key.method {
        KeyMethod::None => return None,
        KeyMethod::AES128 => "AES-128".to_string(),
        KeyMethod::SampleAES => "SAMPLE-AES".to_string(),
        KeyMethod::Other(other) => other.clone(),
    };
    Some(DrmInfo {
        system,
        key_id: key.iv.clone(),
        license_url: key.uri.clone(),
        // HLS does not carry box-level protection headers
        pssh: None,
        source: DrmSource::Manifest,
    })
}

fn subtitle_format(uri: Option<&str>) -> String {
    match uri.map(str::to_ascii_lowercase) {
        Some(u) if u.contains(".ttml") => "TTML".to_string(),
        _ => "WebVTT".to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A cue payload found in the playlist text, with the duration the
/// carrying tag declared (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct CueAttachment {
    pub payload: String,
    pub declared_duration: Option<f64>,
}

/// Scan playlist lines for SCTE-35 carriage: `#EXT-OATCLS-SCTE35`,
/// `#EXT-X-SCTE35` and `#EXT-X-DATERANGE` with an SCTE35-* attribute.
pub fn cue_attachments(content: &str) -> Vec<CueAttachment> {
    let mut cues = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("#EXT-OATCLS-SCTE35:") {
            if !rest.is_empty() {
                cues.push(CueAttachment {
                    payload: rest.trim_matches('"').to_string(),
                    declared_duration: None,
                });
            }
        } else if let Some(rest) = line.strip_prefix("#EXT-X-SCTE35:") {
            let attrs = parse_attribute_list(rest);
            if let Some(payload) = attr_value(&attrs, "CUE") {
                cues.push(CueAttachment {
                    payload,
                    declared_duration: None,
                });
            }
        } else if let Some(rest) = line.strip_prefix("#EXT-X-DATERANGE:") {
            let attrs = parse_attribute_list(rest);
            let payload = attr_value(&attrs, "SCTE35-CMD")
                .or_else(|| attr_value(&attrs, "SCTE35-OUT"))
                .or_else(|| attr_value(&attrs, "SCTE35-IN"));
            if let Some(payload) = payload {
                cues.push(CueAttachment {
                    payload,
                    declared_duration: attr_value(&attrs, "DURATION")
                        .and_then(|d| d.parse().ok()),
                });
            }
        }
    }

    cues
}

fn attr_value(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

/// Split an HLS attribute list (`KEY=VALUE,KEY="quoted,value"`),
/// honoring quoted values that contain commas.
fn parse_attribute_list(input: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut key = String::new();
        for c in chars.by_ref() {
            if c == '=' {
                break;
            }
            key.push(c);
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                value.push(c);
            }
            // consume the trailing comma, if any
            if chars.peek() == Some(&',') {
                chars.next();
            }
        } else {
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
                value.push(c);
            }
        }

        let key = key.trim().to_string();
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_FIXTURE: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-aac",NAME="English",LANGUAGE="en",DEFAULT=YES,CHANNELS="2",URI="audio/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",URI="subs/en.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720,CODECS="avc1.64001f,mp4a.40.2",FRAME-RATE=25.000,AUDIO="audio-aac",SUBTITLES="subs"
video/720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,CODECS="avc1.640028,mp4a.40.2",FRAME-RATE=25.000,AUDIO="audio-aac",SUBTITLES="subs"
video/1080p.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=150000,RESOLUTION=320x180,CODECS="avc1.64001f",URI="iframe/320p.m3u8"
"#;

    const MEDIA_FIXTURE: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-KEY:METHOD=AES-128,URI="https://keys.example.com/k1",IV=0x00000000000000000000000000000001
#EXTINF:6.0,
seg0.ts
#EXTINF:6.0,
seg1.ts
#EXTINF:6.0,
seg2.ts
#EXT-X-ENDLIST
"#;

    fn parse_master(content: &str) -> MasterPlaylist {
        match parse(content).unwrap() {
            HlsDocument::Master(m) => m,
            other => panic!("expected master playlist, got {other:?}"),
        }
    }

    #[test]
    fn master_ladder_preserves_declaration_order() {
        let extract = extract(&parse(MASTER_FIXTURE).unwrap());
        assert_eq!(extract.bitrates.len(), 2);

        let first = &extract.bitrates[0];
        assert_eq!(first.level, 0);
        assert_eq!(first.bitrate, 2_000_000);
        assert_eq!(first.resolution.as_deref(), Some("1280x720"));
        assert_eq!(first.codec.as_deref(), Some("H.264"));
        assert_eq!(first.audio_codec.as_deref(), Some("AAC"));
        assert_eq!(first.frame_rate, Some(25.0));

        let second = &extract.bitrates[1];
        assert_eq!(second.level, 1);
        assert_eq!(second.bitrate, 5_000_000);
        assert_eq!(second.resolution.as_deref(), Some("1920x1080"));
    }

    #[test]
    fn master_renditions_become_tracks() {
        let extract = extract(&parse(MASTER_FIXTURE).unwrap());

        assert_eq!(extract.audio_tracks.len(), 1);
        let audio = &extract.audio_tracks[0];
        assert_eq!(audio.language, "en");
        assert_eq!(audio.name.as_deref(), Some("English"));
        assert_eq!(audio.codec.as_deref(), Some("AAC"));
        assert_eq!(audio.channels, Some(2));

        assert_eq!(extract.subtitle_tracks.len(), 1);
        let subs = &extract.subtitle_tracks[0];
        assert_eq!(subs.language, "en");
        assert_eq!(subs.format.as_deref(), Some("WebVTT"));
        assert!(!subs.forced);
    }

    #[test]
    fn iframe_variants_become_thumbnails_not_levels() {
        let extract = extract(&parse(MASTER_FIXTURE).unwrap());
        assert_eq!(extract.thumbnail_tracks.len(), 1);
        let thumb = &extract.thumbnail_tracks[0];
        assert_eq!(thumb.resolution.as_deref(), Some("320x180"));
        assert_eq!(thumb.url.as_deref(), Some("iframe/320p.m3u8"));
        assert_eq!(thumb.format.as_deref(), Some("JPEG"));
    }

    #[test]
    fn variant_urls_align_with_levels() {
        let master = parse_master(MASTER_FIXTURE);
        let urls = variant_urls(&master);
        assert_eq!(urls, vec!["video/720p.m3u8", "video/1080p.m3u8"]);
    }

    #[test]
    fn media_playlist_yields_segment_drm() {
        let doc = parse(MEDIA_FIXTURE).unwrap();
        let extract = extract(&doc);
        assert!(extract.bitrates.is_empty());

        let drm = extract.drm_info.unwrap();
        assert_eq!(drm.system, "AES-128");
        assert_eq!(drm.license_url.as_deref(), Some("https://keys.example.com/k1"));
        assert_eq!(drm.source, DrmSource::Manifest);
        assert!(drm.pssh.is_none());

        if let HlsDocument::Media(media) = &doc {
            assert_eq!(segment_urls(media), vec!["seg0.ts", "seg1.ts", "seg2.ts"]);
        }
    }

    #[test]
    fn unencrypted_playlist_has_no_drm() {
        let extract = extract(&parse(MASTER_FIXTURE).unwrap());
        assert!(extract.drm_info.is_none());
    }

    #[test]
    fn rejects_non_playlist_content() {
        let err = parse("<html>not a playlist</html>").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedDocument { .. }));
    }

    #[test]
    fn finds_oatcls_and_daterange_cues() {
        let playlist = r#"#EXTM3U
#EXT-X-TARGETDURATION:6
#EXT-OATCLS-SCTE35:/DAvAAAAAAAA///wFAVIAACPf+/+c2nALv4AUsz1AAAAAAAKAAhDVUVJAAABNWLbowo=
#EXTINF:6.0,
seg0.ts
#EXT-X-DATERANGE:ID="splice-1",START-DATE="2026-01-01T00:00:00Z",DURATION=60.1,SCTE35-OUT=0xFC302F00
#EXTINF:6.0,
seg1.ts
"#;
        let cues = cue_attachments(playlist);
        assert_eq!(cues.len(), 2);
        assert!(cues[0].payload.starts_with("/DAv"));
        assert_eq!(cues[0].declared_duration, None);
        assert_eq!(cues[1].payload, "0xFC302F00");
        assert_eq!(cues[1].declared_duration, Some(60.1));
    }

    #[test]
    fn daterange_without_cue_attribute_is_ignored() {
        let playlist = r#"#EXTM3U
#EXT-X-DATERANGE:ID="plain",START-DATE="2026-01-01T00:00:00Z",DURATION=10.0
#EXTINF:6.0,
seg0.ts
"#;
        assert!(cue_attachments(playlist).is_empty());
    }

    #[test]
    fn attribute_lists_honor_quoted_commas() {
        let attrs = parse_attribute_list(r#"ID="a,b",DURATION=5.0,CUE="/DAv""#);
        assert_eq!(attrs[0], ("ID".to_string(), "a,b".to_string()));
        assert_eq!(attrs[1], ("DURATION".to_string(), "5.0".to_string()));
        assert_eq!(attrs[2], ("CUE".to_string(), "/DAv".to_string()));
    }
}

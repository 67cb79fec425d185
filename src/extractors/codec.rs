//! Codec string normalization.
//!
//! Manifests declare codecs as RFC 6381 strings (`avc1.640028`,
//! `mp4a.40.2`). These tables map them to the human-readable names
//! the analysis reports. All matching is ordered, first match wins.

/// Video codec prefixes, checked in order.
const VIDEO_CODECS: &[(&str, &str)] = &[
    ("avc", "H.264"),
    ("hvc", "H.265"),
    ("hev", "H.265"),
    ("vp09", "VP9"),
    ("vp9", "VP9"),
    ("av01", "AV1"),
];

/// Audio codec prefixes, checked in order.
const AUDIO_CODECS: &[(&str, &str)] = &[
    ("mp4a", "AAC"),
    ("ec-3", "EAC3"),
    ("ac-3", "AC3"),
    ("opus", "Opus"),
];

/// Substring hints used when an HLS rendition declares no codec and
/// the group id is all we have. `ec3` is checked before `ac3` so that
/// groups like "audio-ec3" are not misread as Dolby Digital.
const AUDIO_GROUP_HINTS: &[(&str, &str)] = &[("aac", "AAC"), ("ec3", "EAC3"), ("ac3", "AC3")];

fn match_prefix(table: &[(&'static str, &'static str)], token: &str) -> Option<&'static str> {
    let lower = token.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, name)| *name)
}

/// Pick the video codec out of a comma-separated codec list.
pub fn video_codec_from_list(codecs: &str) -> Option<String> {
    codecs
        .split(',')
        .find_map(|token| match_prefix(VIDEO_CODECS, token))
        .map(str::to_string)
}

/// Pick the audio codec out of a comma-separated codec list.
pub fn audio_codec_from_list(codecs: &str) -> Option<String> {
    codecs
        .split(',')
        .find_map(|token| match_prefix(AUDIO_CODECS, token))
        .map(str::to_string)
}

/// Normalize a single codec string, trying video then audio tables.
/// Unrecognized codecs pass through unchanged rather than vanishing.
pub fn normalize_codec(codecs: &str) -> Option<String> {
    let trimmed = codecs.trim();
    if trimmed.is_empty() {
        return None;
    }
    match_prefix(VIDEO_CODECS, trimmed)
        .or_else(|| match_prefix(AUDIO_CODECS, trimmed))
        .map(str::to_string)
        .or_else(|| Some(trimmed.to_string()))
}

/// Guess an audio codec from an HLS rendition group id.
pub fn audio_codec_from_group_id(group_id: &str) -> Option<String> {
    let lower = group_id.to_ascii_lowercase();
    AUDIO_GROUP_HINTS
        .iter()
        .find(|(hint, _)| lower.contains(hint))
        .map(|(_, name)| name.to_string())
}

/// Parse a frame rate that may be fractional ("30000/1001") or
/// decimal ("29.97").
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Some((num, den)) = trimmed.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        trimmed.parse().ok()
    }
}

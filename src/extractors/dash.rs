//! DASH MPD extraction.
//!
//! The MPD is read into a small element tree keyed by local names, so
//! lookups work whether or not the document declares namespace
//! prefixes. Video levels are numbered in document order across all
//! periods and video-bearing adaptation sets; the fragment sampler
//! reuses [`video_representations`] so its level numbering is
//! identical to the bitrate ladder's.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::errors::{AnalysisError, AppResult};
use crate::extractors::{codec, ManifestExtract};
use crate::models::{
    AudioTrack, BitrateInfo, DrmInfo, DrmSource, SubtitleTrack, ThumbnailTrack,
};

/// DRM systems recognised in ContentProtection scheme identifiers,
/// matched case-insensitively by human-readable token or well-known
/// system UUID, in this order.
const DRM_SCHEMES: &[(&str, &str, &str)] = &[
    ("widevine", "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed", "Widevine"),
    ("playready", "9a04f079-9840-4286-ab92-e65be0885f95", "PlayReady"),
    ("fairplay", "94ce86fb-07ff-4f43-adb8-93d2fa968ca2", "FairPlay"),
    ("clearkey", "e2719d58-a985-b3c9-781a-b030af78d30e", "ClearKey"),
];

/// Event stream scheme URNs that carry SCTE-35 signaling.
const SCTE35_SCHEMES: &[&str] = &[
    "urn:scte:scte35:2013:bin",
    "urn:scte:scte35:2014:xml+bin",
    "urn:scte:scte35:2013:xml",
];

/// One XML element with namespace prefixes stripped from element and
/// attribute names.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Depth-first descendants with the given local name.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            found.extend(child.descendants(name));
        }
        found
    }

    pub fn first_descendant(&self, name: &str) -> Option<&XmlElement> {
        self.descendants(name).into_iter().next()
    }

    fn trimmed_text(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

#[derive(Debug)]
pub struct DashDocument {
    root: XmlElement,
}

pub fn parse(content: &str) -> AppResult<DashDocument> {
    let root = parse_tree(content)?;
    if root.name != "MPD" {
        return Err(AnalysisError::malformed(format!(
            "expected MPD root element, found <{}>",
            root.name
        )));
    }
    Ok(DashDocument { root })
}

fn parse_tree(content: &str) -> AppResult<XmlElement> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let mut element = XmlElement {
                    name: local_name(e.name().as_ref()),
                    ..XmlElement::default()
                };
                read_attributes(&e, &mut element)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let mut element = XmlElement {
                    name: local_name(e.name().as_ref()),
                    ..XmlElement::default()
                };
                read_attributes(&e, &mut element)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .xml_content()
                        .map_err(|e| AnalysisError::malformed(format!("invalid XML text: {e}")))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AnalysisError::malformed(format!("invalid XML: {e}")));
            }
        }
    }

    root.ok_or_else(|| AnalysisError::malformed("document has no root element".to_string()))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

fn read_attributes(
    e: &quick_xml::events::BytesStart<'_>,
    element: &mut XmlElement,
) -> AppResult<()> {
    for attr in e.attributes().flatten() {
        let key = local_name(attr.key.as_ref());
        let value = attr
            .unescape_value()
            .map_err(|err| AnalysisError::malformed(format!("invalid XML attribute: {err}")))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(())
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

/// How an adaptation set's content is classified.
fn adaptation_matches(adaptation: &XmlElement, token: &str) -> bool {
    let content_type = adaptation.attr("contentType").unwrap_or("");
    let mime_type = adaptation.attr("mimeType").unwrap_or("");
    if content_type.contains(token) || mime_type.contains(token) {
        return true;
    }
    // fall back to the representations' own MIME types
    adaptation.descendants("Representation").iter().any(|rep| {
        rep.attr("mimeType")
            .unwrap_or(mime_type)
            .contains(token)
    })
}

/// All video representations in document order, paired with their
/// adaptation set. The index in the returned list is the bitrate
/// level.
pub fn video_representations<'a>(
    doc: &'a DashDocument,
) -> Vec<(&'a XmlElement, &'a XmlElement)> {
    let mut reps = Vec::new();
    for period in doc.root.descendants("Period") {
        for adaptation in period.descendants("AdaptationSet") {
            if !adaptation_matches(adaptation, "video") {
                continue;
            }
            for rep in adaptation.descendants("Representation") {
                reps.push((adaptation, rep));
            }
        }
    }
    reps
}

pub fn extract(doc: &DashDocument) -> ManifestExtract {
    let mut extract = ManifestExtract::default();

    for (level, (adaptation, rep)) in video_representations(doc).into_iter().enumerate() {
        let bitrate = rep
            .attr("bandwidth")
            .and_then(|b| b.parse().ok())
            .unwrap_or(0);
        let resolution = match (rep.attr("width"), rep.attr("height")) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        };
        let codecs = rep.attr("codecs").or_else(|| adaptation.attr("codecs"));
        let frame_rate = rep
            .attr("frameRate")
            .or_else(|| adaptation.attr("frameRate"))
            .and_then(codec::parse_frame_rate);

        extract.bitrates.push(BitrateInfo {
            level,
            bitrate,
            resolution,
            codec: codecs.and_then(codec::normalize_codec),
            frame_rate,
            audio_codec: None,
        });
    }

    for period in doc.root.descendants("Period") {
        for adaptation in period.descendants("AdaptationSet") {
            if adaptation_matches(adaptation, "video") {
                continue;
            }
            if adaptation_matches(adaptation, "audio") {
                extract.audio_tracks.push(audio_track(adaptation));
            } else if is_subtitle_adaptation(adaptation) {
                extract.subtitle_tracks.push(subtitle_track(adaptation));
            } else if adaptation_matches(adaptation, "image") {
                if let Some(thumb) = thumbnail_track(adaptation) {
                    extract.thumbnail_tracks.push(thumb);
                }
            }
        }
    }

    extract.drm_info = extract_drm(doc);

    debug!(
        "DASH MPD: {} levels, {} audio, {} subtitle, {} thumbnail tracks",
        extract.bitrates.len(),
        extract.audio_tracks.len(),
        extract.subtitle_tracks.len(),
        extract.thumbnail_tracks.len()
    );
    extract
}

fn audio_track(adaptation: &XmlElement) -> AudioTrack {
    let rep = adaptation.first_descendant("Representation");

    let codec = rep
        .and_then(|r| r.attr("codecs"))
        .or_else(|| adaptation.attr("codecs"))
        .and_then(codec::normalize_codec);
    let channels = rep
        .and_then(|r| r.first_descendant("AudioChannelConfiguration"))
        .or_else(|| adaptation.first_descendant("AudioChannelConfiguration"))
        .and_then(|c| c.attr("value"))
        .and_then(|v| v.parse().ok());
    let bitrate = rep
        .and_then(|r| r.attr("bandwidth"))
        .and_then(|b| b.parse().ok());

    AudioTrack {
        language: adaptation.attr("lang").unwrap_or("und").to_string(),
        name: label_text(adaptation),
        codec,
        channels,
        bitrate,
    }
}

fn is_subtitle_adaptation(adaptation: &XmlElement) -> bool {
    let content_type = adaptation.attr("contentType").unwrap_or("");
    let mime_type = adaptation.attr("mimeType").unwrap_or("");
    content_type.contains("text") || mime_type.contains("application")
}

fn subtitle_track(adaptation: &XmlElement) -> SubtitleTrack {
    let mime_type = adaptation.attr("mimeType").unwrap_or("");
    let format = if mime_type.contains("wvtt") || mime_type.contains("vtt") {
        Some("WebVTT".to_string())
    } else if mime_type.contains("ttml") || mime_type.contains("stpp") {
        Some("TTML".to_string())
    } else {
        None
    };

    SubtitleTrack {
        language: adaptation.attr("lang").unwrap_or("und").to_string(),
        name: label_text(adaptation),
        format,
        // the forced flag has no MPD equivalent
        forced: false,
    }
}

fn thumbnail_track(adaptation: &XmlElement) -> Option<ThumbnailTrack> {
    let rep = adaptation.first_descendant("Representation")?;
    let resolution = match (rep.attr("width"), rep.attr("height")) {
        (Some(w), Some(h)) => Some(format!("{w}x{h}")),
        _ => None,
    };
    let mime_type = rep
        .attr("mimeType")
        .or_else(|| adaptation.attr("mimeType"))
        .unwrap_or("");
    let format = if mime_type.to_ascii_lowercase().contains("png") {
        "PNG"
    } else {
        "JPEG"
    };

    Some(ThumbnailTrack {
        resolution,
        url: rep.first_descendant("BaseURL").and_then(|b| b.trimmed_text()),
        format: Some(format.to_string()),
    })
}

fn label_text(adaptation: &XmlElement) -> Option<String> {
    adaptation
        .first_descendant("Label")
        .and_then(|label| label.trimmed_text())
}

fn extract_drm(doc: &DashDocument) -> Option<DrmInfo> {
    let protections = doc.root.descendants("ContentProtection");

    // any declaration may carry the key id the identified system lacks
    let common_key_id = protections.iter().find_map(|cp| key_id_of(cp));

    for cp in &protections {
        let scheme = cp.attr("schemeIdUri").unwrap_or("").to_ascii_lowercase();
        let system = DRM_SCHEMES.iter().find_map(|(token, uuid, name)| {
            if scheme.contains(token) || scheme.contains(uuid) {
                Some(*name)
            } else {
                None
            }
        });
        // generic CENC declarations without an identifiable system are
        // not reported on their own
        let Some(system) = system else { continue };

        let pssh = cp
            .first_descendant("pssh")
            .and_then(|p| p.trimmed_text());
        let license_url = if system == "PlayReady" {
            cp.first_descendant("laurl").and_then(|l| l.trimmed_text())
        } else {
            None
        };

        return Some(DrmInfo {
            system: system.to_string(),
            key_id: key_id_of(cp).or_else(|| common_key_id.clone()),
            license_url,
            pssh,
            source: DrmSource::Manifest,
        });
    }

    None
}

fn key_id_of(cp: &XmlElement) -> Option<String> {
    cp.attr("default_KID")
        .or_else(|| cp.attr("kid"))
        .map(str::to_string)
}

/// One SCTE-35 event found in an MPD event stream.
#[derive(Debug, Clone)]
pub struct DashCueEvent {
    pub payload: String,
    /// The Event element's own id attribute
    pub declared_id: Option<u64>,
    pub presentation_time: Option<u64>,
    /// Duration in seconds, already divided by the stream's timescale
    pub duration: Option<f64>,
}

/// Collect SCTE-35 events from all event streams whose scheme matches
/// a known SCTE-35 URN. The payload is the event's text content or a
/// nested Signal/Binary element.
pub fn cue_events(doc: &DashDocument) -> Vec<DashCueEvent> {
    let mut events = Vec::new();

    for period in doc.root.descendants("Period") {
        for stream in period.descendants("EventStream") {
            let scheme = stream.attr("schemeIdUri").unwrap_or("");
            if !SCTE35_SCHEMES.iter().any(|known| scheme.contains(known)) {
                continue;
            }

            let timescale: f64 = stream
                .attr("timescale")
                .and_then(|t| t.parse().ok())
                .unwrap_or(1.0);

            for event in stream.descendants("Event") {
                let payload = event.trimmed_text().or_else(|| {
                    event
                        .first_descendant("Binary")
                        .and_then(|b| b.trimmed_text())
                });
                let Some(payload) = payload else { continue };

                let duration = event
                    .attr("duration")
                    .and_then(|d| d.parse::<f64>().ok())
                    .filter(|_| timescale > 0.0)
                    .map(|d| d / timescale);

                events.push(DashCueEvent {
                    payload,
                    declared_id: event.attr("id").and_then(|id| id.parse().ok()),
                    presentation_time: event
                        .attr("presentationTime")
                        .and_then(|t| t.parse().ok()),
                    duration,
                });
            }
        }
    }

    events
}

/// BaseURL references of each video representation, in level order.
/// Segment-template addressing is not expanded; representations
/// without a direct BaseURL yield an empty list for their level.
pub fn video_base_urls(doc: &DashDocument) -> Vec<Vec<String>> {
    video_representations(doc)
        .into_iter()
        .map(|(_, rep)| {
            rep.descendants("BaseURL")
                .into_iter()
                .filter_map(|b| b.trimmed_text())
                .collect()
        })
        .collect()
}

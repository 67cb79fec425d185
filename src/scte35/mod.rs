//! SCTE-35 splice information section decoding.
//!
//! Decodes the binary splice_info_section carried in HLS daterange /
//! cue tags and DASH event payloads. Only the fields the analysis
//! surfaces are retained: the splice command identity and timing, the
//! break duration, and the segmentation descriptor when present.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

mod bits;
use bits::BitReader;

const TABLE_ID: u8 = 0xFC;
const SPLICE_NULL: u8 = 0x00;
const SPLICE_INSERT: u8 = 0x05;
const TIME_SIGNAL: u8 = 0x06;
const SEGMENTATION_DESCRIPTOR_TAG: u8 = 0x02;

#[derive(Debug, Error)]
pub enum CueError {
    #[error("cue payload is neither valid base64 nor hex")]
    BadEncoding,
    #[error("cue payload truncated at bit {0}")]
    Truncated(usize),
    #[error("not a splice_info_section (table_id 0x{0:02X})")]
    NotSpliceInfo(u8),
    #[error("encrypted splice_info_section is not supported")]
    Encrypted,
}

/// Decoded splice_info_section, reduced to the fields the analysis
/// reports.
#[derive(Debug, Clone, Default)]
pub struct SpliceInfo {
    pub command_type: String,
    pub command_event_id: Option<u64>,
    pub pts: Option<u64>,
    pub out_of_network: bool,
    pub auto_return: bool,
    pub break_duration_ticks: Option<u64>,
    pub segmentation: Option<SegmentationDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SegmentationDescriptor {
    pub event_id: u64,
    pub type_id: u8,
    pub duration_ticks: Option<u64>,
    pub upid: Option<String>,
    pub segment_num: u8,
    pub segments_expected: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Scte35Decoder;

impl Scte35Decoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a cue payload given as base64 (the common carriage in
    /// both HLS and DASH) or as a hex string.
    pub fn decode(&self, payload: &str) -> Result<SpliceInfo, CueError> {
        let bytes = decode_payload(payload)?;
        self.decode_bytes(&bytes)
    }

    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<SpliceInfo, CueError> {
        let mut reader = BitReader::new(bytes);

        let table_id = reader.read(8)? as u8;
        if table_id != TABLE_ID {
            return Err(CueError::NotSpliceInfo(table_id));
        }
        reader.read(1)?; // section_syntax_indicator
        reader.read(1)?; // private_indicator
        reader.read(2)?; // sap_type
        reader.read(12)?; // section_length
        reader.read(8)?; // protocol_version
        let encrypted = reader.read(1)? == 1;
        if encrypted {
            return Err(CueError::Encrypted);
        }
        reader.read(6)?; // encryption_algorithm
        reader.read(33)?; // pts_adjustment
        reader.read(8)?; // cw_index
        reader.read(12)?; // tier
        reader.read(12)?; // splice_command_length
        let command_type = reader.read(8)? as u8;

        let mut info = SpliceInfo::default();
        match command_type {
            SPLICE_NULL => {
                info.command_type = "splice_null".to_string();
            }
            SPLICE_INSERT => {
                info.command_type = "splice_insert".to_string();
                decode_splice_insert(&mut reader, &mut info)?;
            }
            TIME_SIGNAL => {
                info.command_type = "time_signal".to_string();
                info.pts = decode_splice_time(&mut reader)?;
            }
            other => {
                info.command_type = format!("command_0x{other:02x}");
                // unknown commands carry no fields we can interpret;
                // the descriptor loop position is lost, so stop here
                return Ok(info);
            }
        }

        let descriptor_loop_length = reader.read(16)? as usize;
        let mut consumed = 0usize;
        while consumed + 2 <= descriptor_loop_length {
            let tag = reader.read(8)? as u8;
            let length = reader.read(8)? as usize;
            consumed += 2 + length;
            if tag == SEGMENTATION_DESCRIPTOR_TAG {
                info.segmentation = decode_segmentation_descriptor(&mut reader, length)?;
            } else {
                reader.skip_bytes(length)?;
            }
        }

        Ok(info)
    }
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, CueError> {
    let trimmed = payload.trim();
    if let Some(hex_body) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return hex::decode(hex_body).map_err(|_| CueError::BadEncoding);
    }
    // A bare hex string of even length is also a valid base64 string,
    // so hex has to be tried first or it would never be reached.
    if trimmed.len() % 2 == 0 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(trimmed) {
            return Ok(bytes);
        }
    }
    BASE64.decode(trimmed).map_err(|_| CueError::BadEncoding)
}

fn decode_splice_insert(reader: &mut BitReader<'_>, info: &mut SpliceInfo) -> Result<(), CueError> {
    info.command_event_id = Some(reader.read(32)?);
    let cancel = reader.read(1)? == 1;
    reader.read(7)?; // reserved
    if cancel {
        return Ok(());
    }

    info.out_of_network = reader.read(1)? == 1;
    let program_splice = reader.read(1)? == 1;
    let duration_flag = reader.read(1)? == 1;
    let splice_immediate = reader.read(1)? == 1;
    reader.read(4)?; // reserved

    if program_splice && !splice_immediate {
        info.pts = decode_splice_time(reader)?;
    }
    if duration_flag {
        info.auto_return = reader.read(1)? == 1;
        reader.read(6)?; // reserved
        info.break_duration_ticks = Some(reader.read(33)?);
    }
    reader.read(16)?; // unique_program_id
    reader.read(8)?; // avail_num
    reader.read(8)?; // avails_expected
    Ok(())
}

fn decode_splice_time(reader: &mut BitReader<'_>) -> Result<Option<u64>, CueError> {
    let time_specified = reader.read(1)? == 1;
    if time_specified {
        reader.read(6)?; // reserved
        Ok(Some(reader.read(33)?))
    } else {
        reader.read(7)?; // reserved
        Ok(None)
    }
}

fn decode_segmentation_descriptor(
    reader: &mut BitReader<'_>,
    length: usize,
) -> Result<Option<SegmentationDescriptor>, CueError> {
    let end = reader.position() + length * 8;

    reader.read(32)?; // identifier, always "CUEI"
    let event_id = reader.read(32)?;
    let cancel = reader.read(1)? == 1;
    reader.read(7)?; // reserved
    if cancel {
        reader.seek(end)?;
        return Ok(None);
    }

    let program_segmentation = reader.read(1)? == 1;
    let duration_flag = reader.read(1)? == 1;
    reader.read(1)?; // delivery_not_restricted
    reader.read(5)?; // restriction flags or reserved
    if !program_segmentation {
        let component_count = reader.read(8)? as usize;
        // component_tag(8) + reserved(7) + pts_offset(33) each
        reader.skip_bytes(component_count * 6)?;
    }
    let duration_ticks = if duration_flag {
        Some(reader.read(40)?)
    } else {
        None
    };

    reader.read(8)?; // upid_type
    let upid_length = reader.read(8)? as usize;
    let mut upid_bytes = Vec::with_capacity(upid_length);
    for _ in 0..upid_length {
        upid_bytes.push(reader.read(8)? as u8);
    }
    let upid = if upid_bytes.is_empty() {
        None
    } else {
        Some(render_upid(&upid_bytes))
    };

    let type_id = reader.read(8)? as u8;
    let segment_num = reader.read(8)? as u8;
    let segments_expected = reader.read(8)? as u8;

    reader.seek(end)?;
    Ok(Some(SegmentationDescriptor {
        event_id,
        type_id,
        duration_ticks,
        upid,
        segment_num,
        segments_expected,
    }))
}

fn render_upid(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => s.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

/// Human-readable name for a segmentation type id, as defined in the
/// SCTE-35 segmentation_type_id table.
pub fn segmentation_type_name(type_id: u8) -> String {
    let name = match type_id {
        0x00 => "Not Indicated",
        0x01 => "Content Identification",
        0x10 => "Program Start",
        0x11 => "Program End",
        0x12 => "Program Early Termination",
        0x13 => "Program Breakaway",
        0x14 => "Program Resumption",
        0x15 => "Program Runover Planned",
        0x16 => "Program Runover Unplanned",
        0x17 => "Program Overlap Start",
        0x20 => "Chapter Start",
        0x21 => "Chapter End",
        0x22 => "Break Start",
        0x23 => "Break End",
        0x30 => "Provider Advertisement Start",
        0x31 => "Provider Advertisement End",
        0x32 => "Distributor Advertisement Start",
        0x33 => "Distributor Advertisement End",
        0x34 => "Provider Placement Opportunity Start",
        0x35 => "Provider Placement Opportunity End",
        0x36 => "Distributor Placement Opportunity Start",
        0x37 => "Distributor Placement Opportunity End",
        0x40 => "Unscheduled Event Start",
        0x41 => "Unscheduled Event End",
        0x50 => "Network Start",
        0x51 => "Network End",
        other => return format!("Type 0x{other:02X}"),
    };
    name.to_string()
}

/// Convert a 90 kHz tick count to seconds.
pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / 90_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // splice_insert going out of network with a break duration and an
    // avail descriptor
    const SPLICE_INSERT_CUE: &str =
        "/DAvAAAAAAAA///wFAVIAACPf+/+c2nALv4AUsz1AAAAAAAKAAhDVUVJAAABNWLbowo=";

    // time_signal carrying a Provider Advertisement Start segmentation
    // descriptor with upid "ABCD"
    const TIME_SIGNAL_CUE: &str =
        "/DAwAAAAAAAAAP/wBQb+AA27oAAaAhhDVUVJAAASNH//AAApMuABBEFCQ0QwAAEAAAAA";

    #[test]
    fn decodes_splice_insert() {
        let info = Scte35Decoder::new().decode(SPLICE_INSERT_CUE).unwrap();
        assert_eq!(info.command_type, "splice_insert");
        assert_eq!(info.command_event_id, Some(1207959695));
        assert!(info.out_of_network);
        assert_eq!(info.pts, Some(1936310318));
        assert!(info.auto_return);
        assert_eq!(info.break_duration_ticks, Some(5426421));
        // the descriptor loop holds an avail descriptor, not a
        // segmentation descriptor
        assert!(info.segmentation.is_none());
    }

    #[test]
    fn decodes_time_signal_with_segmentation() {
        let info = Scte35Decoder::new().decode(TIME_SIGNAL_CUE).unwrap();
        assert_eq!(info.command_type, "time_signal");
        assert_eq!(info.pts, Some(900000));
        assert!(!info.out_of_network);

        let seg = info.segmentation.unwrap();
        assert_eq!(seg.event_id, 4660);
        assert_eq!(seg.type_id, 0x30);
        assert_eq!(seg.duration_ticks, Some(2700000));
        assert_eq!(seg.upid.as_deref(), Some("ABCD"));
        assert_eq!(seg.segment_num, 0);
        assert_eq!(seg.segments_expected, 1);
    }

    #[test]
    fn accepts_hex_payloads() {
        let bytes = BASE64.decode(SPLICE_INSERT_CUE).unwrap();
        let hex_payload = format!("0x{}", hex::encode(&bytes));
        let info = Scte35Decoder::new().decode(&hex_payload).unwrap();
        assert_eq!(info.command_type, "splice_insert");

        let bare_hex = hex::encode(&bytes);
        let info = Scte35Decoder::new().decode(&bare_hex).unwrap();
        assert_eq!(info.command_event_id, Some(1207959695));

        let info = Scte35Decoder::new()
            .decode(&bare_hex.to_ascii_uppercase())
            .unwrap();
        assert_eq!(info.command_type, "splice_insert");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Scte35Decoder::new().decode("!!not a cue!!"),
            Err(CueError::BadEncoding)
        ));
    }

    #[test]
    fn rejects_wrong_table_id() {
        let err = Scte35Decoder::new().decode_bytes(&[0x47; 20]).unwrap_err();
        assert!(matches!(err, CueError::NotSpliceInfo(0x47)));
    }

    #[test]
    fn rejects_truncated_section() {
        let mut bytes = BASE64.decode(SPLICE_INSERT_CUE).unwrap();
        bytes.truncate(10);
        let err = Scte35Decoder::new().decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, CueError::Truncated(_)));
    }

    #[test]
    fn names_segmentation_types() {
        assert_eq!(segmentation_type_name(0x30), "Provider Advertisement Start");
        assert_eq!(segmentation_type_name(0x22), "Break Start");
        assert_eq!(segmentation_type_name(0x7F), "Type 0x7F");
    }

    #[test]
    fn ticks_convert_at_90khz() {
        assert!((ticks_to_seconds(2700000) - 30.0).abs() < 1e-9);
    }
}

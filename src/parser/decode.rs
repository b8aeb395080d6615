use super::fields::{FieldKey, ScanFields};
use super::rules::{find_rule, DecodeContext};
use crate::camera::{is_trailer_byte, GS, RS};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Text the camera sends when no symbol could be read
pub const NOREAD: &str = "NOREAD";

/// Readable stand-in for record separators embedded in a segment
pub const RS_MARKER: &str = "<RS>";

/// How much of a label was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Manufacturer part number found
    Identified,
    /// Some fields decoded, but no part number
    Partial,
    /// Empty frame or NOREAD
    Failed,
}

/// One decoded capture result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    raw: Vec<u8>,
    fields: ScanFields,
}

impl ScanResult {
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn fields(&self) -> &ScanFields {
        &self.fields
    }

    pub fn part_number(&self) -> Option<&str> {
        self.fields.get(FieldKey::MfgPn)
    }

    pub fn outcome(&self) -> ScanOutcome {
        if self.fields.contains(FieldKey::MfgPn) {
            ScanOutcome::Identified
        } else if self.fields.is_empty() {
            ScanOutcome::Failed
        } else {
            ScanOutcome::Partial
        }
    }
}

/// Decodes camera result frames into label fields
#[derive(Debug, Clone, Default)]
pub struct ResultParser;

impl ResultParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode one frame. Never fails: unusable input yields an empty field set.
    pub fn parse(&self, raw: &[u8]) -> ScanResult {
        let fields = match segments(raw) {
            Some(segments) => decode_segments(&segments),
            None => ScanFields::default(),
        };

        ScanResult {
            raw: raw.to_vec(),
            fields,
        }
    }
}

/// Trimmed, RS-escaped segments, or `None` when the frame is a failed read
pub fn segments(raw: &[u8]) -> Option<Vec<String>> {
    let end = raw
        .iter()
        .rposition(|b| !is_trailer_byte(*b))
        .map_or(0, |i| i + 1);
    let body = &raw[..end];

    if body.is_empty() {
        debug!("Empty result frame");
        return None;
    }

    let segments: Vec<String> = body
        .split(|b| *b == GS)
        .map(|segment| {
            String::from_utf8_lossy(segment)
                .trim()
                .replace(RS as char, RS_MARKER)
        })
        .collect();

    if segments.iter().any(|segment| segment == NOREAD) {
        debug!("Camera reported NOREAD");
        return None;
    }

    Some(segments)
}

fn decode_segments(segments: &[String]) -> ScanFields {
    let mut fields = ScanFields::default();
    let mut ctx = DecodeContext::default();

    for segment in segments {
        match find_rule(segment, &ctx) {
            Some(rule) => {
                trace!("Segment {:?} matched rule {}", segment, rule.name);
                rule.apply(segment, &mut fields, &mut ctx);
            }
            None => {
                trace!("Segment {:?} matched no rule", segment);
                fields.set(FieldKey::Unknown, segment.as_str());
            }
        }
    }

    fields
}

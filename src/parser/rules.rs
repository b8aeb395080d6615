//! Ordered segment rules for supply-chain labels.
//!
//! Covers three overlapping conventions: a vendor pipe-delimited record,
//! ANSI MH10.8 data identifiers, and Digi-Key's distributor-specific prefixes
//! which only apply after a bare `K` segment has been seen.

use super::fields::{FieldKey, ScanFields};
use Extraction::*;
use FieldKey::*;
use Matcher::*;

/// Distributor name recorded for a bare `K` segment
pub const DIGIKEY: &str = "Digi-Key";

/// State shared by all segments of one decode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeContext {
    /// A bare `K` segment has been seen
    pub digikey: bool,
}

/// How a rule recognises a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Starts with the text
    Prefix(&'static str),
    /// Contains the text anywhere
    Contains(&'static str),
    /// Is exactly the text
    Exact(&'static str),
    /// Starts with the text and splits on `|` into at least four parts
    Delimited(&'static str),
    /// One digit 4-9 followed by `D`
    ShortDateCode,
    /// A number 10-16 followed by `D`
    LongDateCode,
    /// Starts with the text, only inside Digi-Key context
    DigiKey(&'static str),
}

impl Matcher {
    fn matches(&self, segment: &str, ctx: &DecodeContext) -> bool {
        match *self {
            Matcher::Prefix(prefix) => segment.starts_with(prefix),
            Matcher::Contains(needle) => segment.contains(needle),
            Matcher::Exact(text) => segment == text,
            Matcher::Delimited(prefix) => {
                segment.starts_with(prefix) && segment.split('|').count() >= 4
            }
            Matcher::ShortDateCode => {
                let b = segment.as_bytes();
                b.len() >= 2 && (b'4'..=b'9').contains(&b[0]) && b[1] == b'D'
            }
            Matcher::LongDateCode => {
                let b = segment.as_bytes();
                b.len() >= 3
                    && b[0] == b'1'
                    && (b'0'..=b'6').contains(&b[1])
                    && b[2] == b'D'
            }
            Matcher::DigiKey(prefix) => ctx.digikey && segment.starts_with(prefix),
        }
    }

    /// Length of the identifier in front of the value
    fn consumed(&self) -> usize {
        match *self {
            Matcher::Prefix(prefix) | Matcher::DigiKey(prefix) => prefix.len(),
            Matcher::ShortDateCode => 2,
            Matcher::LongDateCode => 3,
            Matcher::Contains(_) | Matcher::Exact(_) | Matcher::Delimited(_) => 0,
        }
    }
}

/// What a matching rule writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Text after the identifier
    Remainder(FieldKey),
    /// The whole segment
    Whole(FieldKey),
    /// `pn|qty|date|xxxxxCCtrace`
    PipeRecord,
    /// Record Digi-Key as distributor and enter Digi-Key context
    DigiKeyMarker,
    /// Recognised padding, nothing recorded
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub extraction: Extraction,
}

impl Rule {
    const fn new(name: &'static str, matcher: Matcher, extraction: Extraction) -> Self {
        Self {
            name,
            matcher,
            extraction,
        }
    }

    pub fn matches(&self, segment: &str, ctx: &DecodeContext) -> bool {
        self.matcher.matches(segment, ctx)
    }

    pub fn apply(&self, segment: &str, fields: &mut ScanFields, ctx: &mut DecodeContext) {
        match self.extraction {
            Extraction::Remainder(key) => {
                fields.set(key, &segment[self.matcher.consumed()..]);
            }
            Extraction::Whole(key) => {
                fields.set(key, segment);
            }
            Extraction::PipeRecord => {
                let parts: Vec<&str> = segment.split('|').collect();
                fields.set(FieldKey::MfgPn, parts[0]);
                fields.set(FieldKey::Qty, parts[1]);
                fields.set(FieldKey::DateCode, parts[2]);
                fields.set(FieldKey::Coo, char_slice(parts[3], 5, Some(7)));
                fields.set(FieldKey::Traceability, char_slice(parts[3], 7, None));
            }
            Extraction::DigiKeyMarker => {
                fields.set(FieldKey::Distributor, DIGIKEY);
                ctx.digikey = true;
            }
            Extraction::Ignore => {}
        }
    }
}

/// Characters `start..end` of `s`, clamped to its length
fn char_slice(s: &str, start: usize, end: Option<usize>) -> String {
    let chars = s.chars().skip(start);
    match end {
        Some(end) => chars.take(end.saturating_sub(start)).collect(),
        None => chars.collect(),
    }
}

/// Evaluated top to bottom; the first match handles the segment
pub static RULES: &[Rule] = &[
    Rule::new("vendor-record", Delimited("GWCR"), PipeRecord),
    Rule::new("header", Contains("[)>"), Whole(Signature)),
    Rule::new("1P", Prefix("1P"), Remainder(MfgPn)),
    Rule::new("1V", Prefix("1V"), Remainder(Manufacturer)),
    Rule::new("1T", Prefix("1T"), Remainder(Traceability)),
    Rule::new("4L", Prefix("4L"), Remainder(Coo)),
    Rule::new("P", Prefix("P"), Remainder(Product)),
    Rule::new("Q", Prefix("Q"), Remainder(Qty)),
    Rule::new("S", Prefix("S"), Remainder(Serial)),
    Rule::new("nD", ShortDateCode, Remainder(DateCode)),
    Rule::new("1nD", LongDateCode, Remainder(DateCode)),
    Rule::new("K-marker", Exact("K"), DigiKeyMarker),
    Rule::new("K", Prefix("K"), Remainder(OrderNo)),
    Rule::new("digikey-1K", DigiKey("1K"), Remainder(OrderNo)),
    Rule::new("digikey-4K", DigiKey("4K"), Remainder(LineNo)),
    Rule::new("digikey-10K", DigiKey("10K"), Remainder(InvoiceNo)),
    Rule::new("digikey-11K", DigiKey("11K"), Remainder(LineNo)),
    Rule::new("digikey-11Z", DigiKey("11Z"), Remainder(Pick)),
    Rule::new("digikey-12Z", DigiKey("12Z"), Remainder(PartId)),
    Rule::new("digikey-13Z", DigiKey("13Z"), Remainder(LoadId)),
    Rule::new("digikey-20Z", DigiKey("20Z"), Ignore),
    Rule::new("11K", Prefix("11K"), Remainder(InvoiceNo)),
    Rule::new("14K", Prefix("14K"), Remainder(LineNo)),
];

/// First rule that accepts the segment
pub fn find_rule(segment: &str, ctx: &DecodeContext) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(segment, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_one(segment: &str, ctx: &mut DecodeContext) -> (Option<&'static str>, ScanFields) {
        let mut fields = ScanFields::default();
        let rule = find_rule(segment, ctx);
        if let Some(rule) = rule {
            rule.apply(segment, &mut fields, ctx);
        }
        (rule.map(|r| r.name), fields)
    }

    #[test]
    fn test_simple_identifiers() {
        let cases = [
            ("1PLM358N", "1P", MfgPn, "LM358N"),
            ("1VTexas Instruments", "1V", Manufacturer, "Texas Instruments"),
            ("1TLOT42", "1T", Traceability, "LOT42"),
            ("4LCN", "4L", Coo, "CN"),
            ("P296-1395-ND", "P", Product, "296-1395-ND"),
            ("Q100", "Q", Qty, "100"),
            ("S000123", "S", Serial, "000123"),
            ("9D2315", "nD", DateCode, "2315"),
            ("10D2315", "1nD", DateCode, "2315"),
            ("16D20230601", "1nD", DateCode, "20230601"),
            ("K88001", "K", OrderNo, "88001"),
            ("11K555", "11K", InvoiceNo, "555"),
            ("14K003", "14K", LineNo, "003"),
        ];

        for (segment, rule_name, key, value) in cases {
            let (name, fields) = apply_one(segment, &mut DecodeContext::default());
            assert_eq!(name, Some(rule_name), "segment {}", segment);
            assert_eq!(fields.get(key), Some(value), "segment {}", segment);
            assert_eq!(fields.len(), 1, "segment {}", segment);
        }
    }

    #[test]
    fn test_date_code_ranges() {
        let ctx = DecodeContext::default();

        assert!(find_rule("3D2315", &ctx).is_none());
        assert!(find_rule("17D2315", &ctx).is_none());
        assert!(find_rule("1D2315", &ctx).is_none());
        assert_eq!(find_rule("4D2315", &ctx).map(|r| r.name), Some("nD"));
        assert_eq!(find_rule("13D2315", &ctx).map(|r| r.name), Some("1nD"));
    }

    #[test]
    fn test_vendor_record() {
        let (name, fields) = apply_one(
            "GWCR-100|250|2319|ABCDECNTRACE01",
            &mut DecodeContext::default(),
        );

        assert_eq!(name, Some("vendor-record"));
        assert_eq!(fields.mfg_pn.as_deref(), Some("GWCR-100"));
        assert_eq!(fields.qty.as_deref(), Some("250"));
        assert_eq!(fields.date_code.as_deref(), Some("2319"));
        assert_eq!(fields.coo.as_deref(), Some("CN"));
        assert_eq!(fields.traceability.as_deref(), Some("TRACE01"));
    }

    #[test]
    fn test_vendor_record_with_short_tail() {
        let (_, fields) = apply_one("GWCR1|2|3|ABC", &mut DecodeContext::default());

        assert_eq!(fields.coo.as_deref(), Some(""));
        assert_eq!(fields.traceability.as_deref(), Some(""));
    }

    #[test]
    fn test_vendor_prefix_without_pipes_is_not_a_record() {
        let ctx = DecodeContext::default();
        assert!(find_rule("GWCR123", &ctx).is_none());
    }

    #[test]
    fn test_header_is_signature() {
        let (name, fields) = apply_one("[)><RS>06", &mut DecodeContext::default());

        assert_eq!(name, Some("header"));
        assert_eq!(fields.signature.as_deref(), Some("[)><RS>06"));
    }

    #[test]
    fn test_bare_k_enters_digikey_context() {
        let mut ctx = DecodeContext::default();
        let (name, fields) = apply_one("K", &mut ctx);

        assert_eq!(name, Some("K-marker"));
        assert!(ctx.digikey);
        assert_eq!(fields.distributor.as_deref(), Some(DIGIKEY));
    }

    #[test]
    fn test_digikey_prefixes_require_context() {
        let plain = DecodeContext::default();
        let digikey = DecodeContext { digikey: true };

        for segment in ["1K1", "4K1", "10K1", "11Z1", "12Z1", "13Z1", "20Z000"] {
            assert!(find_rule(segment, &plain).is_none(), "segment {}", segment);
            assert!(find_rule(segment, &digikey).is_some(), "segment {}", segment);
        }
    }

    #[test]
    fn test_11k_depends_on_context() {
        let (_, fields) = apply_one("11K777", &mut DecodeContext::default());
        assert_eq!(fields.invoice_no.as_deref(), Some("777"));

        let (name, fields) = apply_one("11K777", &mut DecodeContext { digikey: true });
        assert_eq!(name, Some("digikey-11K"));
        assert_eq!(fields.line_no.as_deref(), Some("777"));
    }

    #[test]
    fn test_digikey_padding_is_ignored() {
        let (name, fields) = apply_one("20Z0000000", &mut DecodeContext { digikey: true });

        assert_eq!(name, Some("digikey-20Z"));
        assert!(fields.is_empty());
    }
}

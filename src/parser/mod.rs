mod decode;
mod fields;
mod rules;

pub use decode::{segments, ResultParser, ScanOutcome, ScanResult, NOREAD, RS_MARKER};
pub use fields::{FieldKey, ScanFields};
pub use rules::{find_rule, DecodeContext, Extraction, Matcher, Rule, DIGIKEY, RULES};

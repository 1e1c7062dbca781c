use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{CARRIAGE_RETURN, FIELD_SEPARATOR, LINE_TERMINATOR, RECORD_FIELDS};

/// Why a line was kept out of the master file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RejectReason {
    EmptyLine,
    NotEnoughParts,
    Duplicate,
}

impl RejectReason {
    pub const ALL: [RejectReason; 3] = [
        RejectReason::EmptyLine,
        RejectReason::NotEnoughParts,
        RejectReason::Duplicate,
    ];

    /// Human-readable label, also used as the rejection log file stem.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::EmptyLine => "Empty Line",
            RejectReason::NotEnoughParts => "Not Enough Parts",
            RejectReason::Duplicate => "Duplicate",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Rejected(RejectReason),
}

/// How a line is cut into its three fields.
///
/// `Strict` requires exactly two separators. `Tolerant` uses the first two separators as
/// delimiters and lets the last field carry further colons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSplit {
    #[default]
    Strict,
    Tolerant,
}

/// Removes one trailing `\n` and every `\r` before it. Everything else is kept.
///
/// A record never ends in `\r`, so a record written with a `\n` terminator and read back
/// through this function yields the same bytes.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(line);
    let kept = line
        .iter()
        .rposition(|b| *b != CARRIAGE_RETURN)
        .map_or(0, |last| last + 1);
    &line[..kept]
}

/// Classifies a record whose terminator was already removed by [`strip_terminator`].
pub fn classify(line: &[u8], split: FieldSplit) -> Verdict {
    if line.is_empty() {
        return Verdict::Rejected(RejectReason::EmptyLine);
    }

    let field_count = match split {
        FieldSplit::Strict => line.split(|b| *b == FIELD_SEPARATOR).count(),
        FieldSplit::Tolerant => line.splitn(RECORD_FIELDS, |b| *b == FIELD_SEPARATOR).count(),
    };

    if field_count != RECORD_FIELDS {
        return Verdict::Rejected(RejectReason::NotEnoughParts);
    }

    Verdict::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator(b"a:b:c\n"), b"a:b:c");
        assert_eq!(strip_terminator(b"a:b:c\r\n"), b"a:b:c");
        assert_eq!(strip_terminator(b"a:b:c\r"), b"a:b:c");
        assert_eq!(strip_terminator(b"a:b:c\r\r\n"), b"a:b:c");
        assert_eq!(strip_terminator(b"a:\rb:c\n"), b"a:\rb:c");
        assert_eq!(strip_terminator(b"\r\r"), b"");
        assert_eq!(strip_terminator(b"a:b:c"), b"a:b:c");
        assert_eq!(strip_terminator(b" a:b:c \n"), b" a:b:c ");
        assert_eq!(strip_terminator(b"\n"), b"");
    }

    #[test]
    fn test_empty_lines() {
        for split in [FieldSplit::Strict, FieldSplit::Tolerant] {
            assert_eq!(classify(b"", split), Verdict::Rejected(RejectReason::EmptyLine));
            for raw in [&b"\n"[..], b"\r\n", b"\r\r\n"] {
                assert_eq!(
                    classify(strip_terminator(raw), split),
                    Verdict::Rejected(RejectReason::EmptyLine)
                );
            }
        }
    }

    #[test]
    fn test_whitespace_only_line_is_not_empty() {
        assert_eq!(
            classify(b"   ", FieldSplit::Strict),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
    }

    #[test]
    fn test_strict_split_boundaries() {
        assert_eq!(classify(b"a:b:c", FieldSplit::Strict), Verdict::Valid);
        assert_eq!(classify(b"site.com:user:p@ss word", FieldSplit::Strict), Verdict::Valid);
        assert_eq!(classify(b"::", FieldSplit::Strict), Verdict::Valid);
        assert_eq!(
            classify(b"x:y", FieldSplit::Strict),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
        assert_eq!(
            classify(b"novalue", FieldSplit::Strict),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
        assert_eq!(
            classify(b"https://site.com:user:pass", FieldSplit::Strict),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
        assert_eq!(
            classify(b"a:b:c:d", FieldSplit::Strict),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
    }

    #[test]
    fn test_tolerant_split_boundaries() {
        assert_eq!(classify(b"a:b:c", FieldSplit::Tolerant), Verdict::Valid);
        assert_eq!(classify(b"a:b:c:d", FieldSplit::Tolerant), Verdict::Valid);
        assert_eq!(classify(b"site:user:pa:ss:word", FieldSplit::Tolerant), Verdict::Valid);
        assert_eq!(
            classify(b"x:y", FieldSplit::Tolerant),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
        assert_eq!(
            classify(b"xy", FieldSplit::Tolerant),
            Verdict::Rejected(RejectReason::NotEnoughParts)
        );
    }

    #[test]
    fn test_non_utf8_bytes_are_classified() {
        assert_eq!(classify(b"\xff\xfe:user:pass", FieldSplit::Strict), Verdict::Valid);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(RejectReason::EmptyLine.to_string(), "Empty Line");
        assert_eq!(RejectReason::NotEnoughParts.label(), "Not Enough Parts");
        assert_eq!(RejectReason::Duplicate.label(), "Duplicate");
    }
}

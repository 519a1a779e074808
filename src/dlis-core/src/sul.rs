//! C4: Storage Unit Label parser (`spec.md` §4.4).
//!
//! Grounded on the teacher's `MetadataHeader::from`/`PeHeader::from` idiom: a
//! `from(&[u8; N]) -> Result<T, Error>` associated function that validates a
//! magic/version field before trusting the rest of the buffer.

use crate::error::{Error, Result};
use crate::warning::Warning;

pub const SUL_LEN: usize = 80;

/// The 80-byte ASCII storage unit label (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUnitLabel {
    pub sequence: u32,
    pub version: String,
    pub layout: String,
    pub maxlen: u32,
    pub id: String,
}

/// Parses an 80-byte buffer into a [`StorageUnitLabel`].
///
/// `on_warning` is invoked (not treated as an error) when the layout field is
/// present but not recognized, per `spec.md` §4.4.
pub fn storage_label(buffer: &[u8], on_warning: &mut dyn FnMut(Warning)) -> Result<StorageUnitLabel> {
    if buffer.len() < SUL_LEN {
        return Err(Error::BufferTooSmall { expected: SUL_LEN, actual: buffer.len() });
    }

    let sequence_field = ascii_field(&buffer[0..4]);
    let version_field = ascii_field(&buffer[4..9]);
    let layout_field = ascii_field(&buffer[9..15]);
    let maxlen_field = ascii_field(&buffer[15..20]);
    let id = String::from_utf8_lossy(&buffer[20..80]).into_owned();

    if version_field.trim() != "V1.00" {
        return Err(Error::UnsupportedVersion(version_field));
    }

    // The sequence and maxlen fields are numeric by convention but not
    // load-bearing for parsing; a label with garbage in these fields (as in
    // the "label inconsistent" fixture) still parses, with the field read as
    // 0 rather than aborting the whole label.
    let sequence = sequence_field.trim().parse::<u32>().unwrap_or(0);
    let maxlen = maxlen_field.trim().parse::<u32>().unwrap_or(0);

    let trimmed_layout = layout_field.trim();
    let layout = if trimmed_layout == "RECORD" || trimmed_layout.is_empty() {
        "record".to_string()
    } else {
        on_warning(Warning::LabelInconsistent { found: layout_field.clone() });
        "unknown".to_string()
    };

    Ok(StorageUnitLabel {
        sequence,
        version: "1.0".to_string(),
        layout,
        maxlen,
        id,
    })
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_bytes(sequence: &str, version: &str, layout: &str, maxlen: &str, id: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(sequence.as_bytes());
        out.extend_from_slice(version.as_bytes());
        out.extend_from_slice(layout.as_bytes());
        out.extend_from_slice(maxlen.as_bytes());
        out.extend_from_slice(id.as_bytes());
        out
    }

    #[test]
    fn parses_well_formed_label() {
        let id = "Default Storage Set".to_string() + &" ".repeat(40);
        let bytes = label_bytes("   1", "V1.00", "RECORD", " 8192", &id);
        let mut warned = false;
        let mut sink = |_: Warning| warned = true;
        let sul = storage_label(&bytes, &mut sink).unwrap();
        assert!(!warned);
        assert_eq!(sul.sequence, 1);
        assert_eq!(sul.version, "1.0");
        assert_eq!(sul.layout, "record");
        assert_eq!(sul.maxlen, 8192);
        assert_eq!(sul.id, id);
    }

    #[test]
    fn buffer_too_small_is_an_error() {
        let mut sink = |_: Warning| {};
        let err = storage_label(b"too short", &mut sink).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { expected: 80, .. }));
    }

    #[test]
    fn unsupported_version_is_an_error() {
        let id = "Default Storage Set".to_string() + &" ".repeat(40);
        let bytes = label_bytes("   1", "V2.00", "RECORD", " 8192", &id);
        let mut sink = |_: Warning| {};
        let err = storage_label(&bytes, &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(_)));
    }

    #[test]
    fn inconsistent_layout_warns_and_is_unknown() {
        let id = "Default Storage Set".to_string() + &" ".repeat(40);
        let bytes = label_bytes("  2 ", "V1.00", "TRASH1", "ZZZZZ", &id);
        let mut warned = false;
        let mut sink = |_: Warning| warned = true;
        // maxlen field is garbage here too; only the layout/warning behavior
        // is under test, matching the fixture in the original implementation.
        let sul = storage_label(&bytes, &mut sink).unwrap();
        assert!(warned);
        assert_eq!(sul.layout, "unknown");
    }
}

//! Parse-time configuration (`spec.md` §6, ambient addition A4 of `SPEC_FULL.md`).

use crate::warning::{default_sink, WarningSink};

/// Options controlling how a [`crate::file::Handle`] is opened.
///
/// Grounded on the teacher's `PeParser::new`/`open` split, which takes its
/// inputs as explicit constructor arguments rather than reading ambient
/// configuration; here the analogous knobs (scan window, max record size,
/// eager indexing) are gathered into one struct since `open`/`load` both
/// need the same set of them.
pub struct ParseOptions {
    /// How many leading bytes to scan for the storage unit label before
    /// giving up (`spec.md` §4.3 point 1). Default 200, per spec's "at least
    /// 200 bytes" guidance.
    pub sul_scan_window: usize,
    /// Upper bound on a single Visible Record's declared length; a VR header
    /// claiming more is rejected with `Error::MalformedVr` before its body is
    /// read, bounding the allocation a hostile or corrupt length field could
    /// otherwise force (`crate::physical::VisibleRecordHeader::read`).
    /// Default 16 KiB.
    pub max_visible_record_len: usize,
    /// Sink invoked for non-fatal conditions (`spec.md` §9 "warning channel").
    pub warning_sink: WarningSink,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            sul_scan_window: 200,
            max_visible_record_len: 16 * 1024,
            warning_sink: default_sink(),
        }
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("sul_scan_window", &self.sul_scan_window)
            .field("max_visible_record_len", &self.max_visible_record_len)
            .finish_non_exhaustive()
    }
}

//! Non-fatal conditions surfaced without aborting a parse.
//!
//! Grounded on `hyrax_fs_exfat`'s use of `log::error!` at format-inconsistency
//! sites: we keep that as the default sink, but let a caller install their
//! own to collect warnings instead (`spec.md` §9 "warning channel" note).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The storage unit label's layout field was neither "RECORD" nor empty.
    LabelInconsistent { found: String },
    /// A string attribute contained invalid UTF-8; it was decoded lossily.
    InvalidUtf8 { context: String },
    /// A logical record was dropped from the index during `Handle`
    /// construction instead of aborting the whole parse (`spec.md` §7's
    /// "parse errors abort the current record" rule).
    RecordSkipped { record_index: usize, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LabelInconsistent { found } => {
                write!(f, "label inconsistent: layout field {found:?}")
            }
            Warning::InvalidUtf8 { context } => {
                write!(f, "invalid utf-8 in {context}, decoded lossily")
            }
            Warning::RecordSkipped { record_index, reason } => {
                write!(f, "record {record_index} skipped: {reason}")
            }
        }
    }
}

/// A sink that receives [`Warning`]s as they are raised.
///
/// The default sink logs at `warn` level via the `log` crate and otherwise
/// discards the warning; a caller that wants to collect warnings can install
/// their own closure with [`crate::config::ParseOptions::warning_sink`].
pub type WarningSink = Box<dyn FnMut(Warning) + Send>;

pub(crate) fn default_sink() -> WarningSink {
    Box::new(|warning| log::warn!("{warning}"))
}

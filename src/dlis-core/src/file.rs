//! C8: file facade (`spec.md` §4.8).
//!
//! Grounded on the teacher's `PeParser`/`PeImage` split (`metadata/parser.rs`,
//! `metadata/image.rs`): a builder that walks the byte source once, handing
//! off to a queryable result. Kept as a single `Handle` here rather than two
//! types, since (unlike the PE reader, which never needs to append to its
//! image after `read()`) `reindex`/`extract` let a caller keep mutating the
//! same handle's record index after construction.

use std::fs;
use std::path::Path;

use crate::config::ParseOptions;
use crate::eflr;
use crate::error::{Error, Result};
use crate::object::{Axis, Calibration, Channel, Frame, Origin, Parameter, Record, Tool};
use crate::physical::{LogicalRecord, PhysicalReader};
use crate::sul::{self, StorageUnitLabel, SUL_LEN};
use crate::table::{Fingerprint, Table};
use crate::warning::Warning;

/// An opened DLIS file: the storage unit label, the reassembled logical
/// record stream, and (once indexed) the object table (`spec.md` §4.8).
pub struct Handle {
    data: Vec<u8>,
    options: ParseOptions,
    label: StorageUnitLabel,
    sul_offset: usize,
    records: Vec<LogicalRecord>,
    table: Table,
    indexed: bool,
    warnings: Vec<Warning>,
    closed: bool,
}

impl Handle {
    /// Opens `path` and locates the storage unit label, but defers building
    /// the object table until first queried (`spec.md` §9 "lazy vs eager
    /// indexing").
    pub fn open(path: impl AsRef<Path>) -> Result<Handle> {
        Handle::open_with(path, ParseOptions::default())
    }

    /// As [`Handle::open`], additionally building the full object table
    /// eagerly before returning.
    pub fn load(path: impl AsRef<Path>) -> Result<Handle> {
        Handle::load_with(path, ParseOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: ParseOptions) -> Result<Handle> {
        let data = fs::read(path)?;
        Handle::from_bytes(data, options)
    }

    pub fn load_with(path: impl AsRef<Path>, options: ParseOptions) -> Result<Handle> {
        let mut handle = Handle::open_with(path, options)?;
        handle.ensure_indexed()?;
        Ok(handle)
    }

    fn from_bytes(data: Vec<u8>, mut options: ParseOptions) -> Result<Handle> {
        let mut warnings = Vec::new();
        let (label, sul_offset) = {
            let sink = &mut options.warning_sink;
            let warnings = &mut warnings;
            let mut on_warning = |w: Warning| {
                warnings.push(w.clone());
                sink(w);
            };
            locate_sul(&data, options.sul_scan_window, &mut on_warning)?
        };

        let mut reader = PhysicalReader::new(&data, sul_offset + SUL_LEN, options.max_visible_record_len);
        reader.sync_to_first_vr(options.sul_scan_window)?;
        let mut records = Vec::new();
        while let Some(record) = reader.next_record()? {
            records.push(record);
        }

        Ok(Handle {
            data,
            options,
            label,
            sul_offset,
            records,
            table: Table::new(),
            indexed: false,
            warnings,
            closed: false,
        })
    }

    /// Closes the handle; every further accessor returns `Error::Closed`
    /// (`spec.md` §5 "a handle may be closed at any time; in-flight reads...
    /// fail with `Closed`").
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    pub fn storage_label(&self) -> &StorageUnitLabel {
        &self.label
    }

    pub fn sul_offset(&self) -> usize {
        self.sul_offset
    }

    /// Non-fatal conditions raised since construction (`spec.md` §9
    /// "pluggable warning sink"), in addition to whatever the configured
    /// sink (logging by default) already received.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The full object table, building it on first access if `open`
    /// deferred it (`spec.md` §4.8).
    pub fn objects(&mut self) -> Result<&Table> {
        self.ensure_indexed()?;
        Ok(&self.table)
    }

    fn ensure_indexed(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.indexed {
            return Ok(());
        }
        for (index, record) in self.records.iter().enumerate() {
            if !record.explicit {
                // IFLR: frame data or no-format bytes (`spec.md` §4.3
                // glossary "IFLR"), out of scope for the object table.
                continue;
            }
            if record.encrypted {
                // Tolerated here so one encrypted record doesn't abort the
                // whole index (`spec.md` §7); a caller asking to decode this
                // specific record's contents via `Handle::decode` gets
                // `Error::Encrypted` instead of a silent skip.
                self.warnings.push(Warning::RecordSkipped { record_index: index, reason: "encrypted".to_string() });
                continue;
            }
            let sink = &mut self.options.warning_sink;
            let warnings = &mut self.warnings;
            let mut on_warning = |w: Warning| {
                warnings.push(w.clone());
                sink(w);
            };
            let set = match eflr::parse(&record.data, &mut on_warning) {
                Ok(set) => set,
                Err(err) => {
                    self.warnings.push(Warning::RecordSkipped { record_index: index, reason: err.to_string() });
                    continue;
                }
            };
            let built = crate::object::build_records(&set);
            for (obj, rec) in set.objects.iter().zip(built) {
                let key = Fingerprint::from_obname(set.set_type.as_str(), &obj.name);
                if let Err(err) = self.table.insert(key, rec) {
                    self.warnings.push(Warning::RecordSkipped { record_index: index, reason: err.to_string() });
                }
            }
        }
        self.indexed = true;
        Ok(())
    }

    /// Returns the raw (already trailer-stripped) payload of each requested
    /// logical record, by position in file order (`spec.md` §4.8 "recovery
    /// pair"). Unlike [`Handle::decode`], this does not attempt to interpret
    /// an encrypted record's contents, so it succeeds even for those.
    pub fn extract(&self, record_indices: &[usize]) -> Result<Vec<Vec<u8>>> {
        self.ensure_open()?;
        Ok(record_indices.iter().filter_map(|&i| self.records.get(i).map(|r| r.data.clone())).collect())
    }

    /// Parses logical record `record_index` as an EFLR `Set`, the one
    /// accessor that actually decodes a record's contents rather than just
    /// returning bytes or a pre-built object. Returns `Error::Encrypted` if
    /// the record is marked encrypted, since decoding it requires a key this
    /// crate does not have (`spec.md` §7).
    pub fn decode(&mut self, record_index: usize) -> Result<eflr::Set> {
        self.ensure_open()?;
        let record = self.records.get(record_index).ok_or(Error::Truncated)?;
        if record.encrypted {
            return Err(Error::Encrypted);
        }
        let sink = &mut self.options.warning_sink;
        let warnings = &mut self.warnings;
        let mut on_warning = |w: Warning| {
            warnings.push(w.clone());
            sink(w);
        };
        eflr::parse(&record.data, &mut on_warning)
    }

    /// Replaces the handle's record index with caller-supplied byte spans
    /// over the raw file, bypassing automatic VR/LRS framing (`spec.md`
    /// §4.8, §9's recovery scenario for corrupted stretches the automatic
    /// walk can't get past). Each span is treated as one already-reassembled
    /// explicit (EFLR) logical record; `reindex` clears the object table so
    /// the next [`Handle::objects`] call rebuilds it from the new spans.
    pub fn reindex(&mut self, offsets: &[usize], lengths: &[usize]) -> Result<()> {
        self.ensure_open()?;
        if offsets.len() != lengths.len() {
            return Err(Error::MalformedLrs("reindex: offsets and lengths must have equal length".to_string()));
        }
        let mut records = Vec::with_capacity(offsets.len());
        for (&offset, &length) in offsets.iter().zip(lengths) {
            let end = offset.checked_add(length).ok_or(Error::Truncated)?;
            let data = self.data.get(offset..end).ok_or(Error::Truncated)?.to_vec();
            records.push(LogicalRecord { record_type: 0, explicit: true, encrypted: false, data });
        }
        self.records = records;
        self.table = Table::new();
        self.indexed = false;
        Ok(())
    }

    pub fn channels(&mut self) -> Result<impl Iterator<Item = &Channel>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("CHANNEL").filter_map(|(_, r)| match r {
            Record::Channel(c) => Some(c),
            _ => None,
        }))
    }

    pub fn frames(&mut self) -> Result<impl Iterator<Item = &Frame>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("FRAME").filter_map(|(_, r)| match r {
            Record::Frame(f) => Some(f),
            _ => None,
        }))
    }

    pub fn tools(&mut self) -> Result<impl Iterator<Item = &Tool>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("TOOL").filter_map(|(_, r)| match r {
            Record::Tool(t) => Some(t),
            _ => None,
        }))
    }

    pub fn parameters(&mut self) -> Result<impl Iterator<Item = &Parameter>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("PARAMETER").filter_map(|(_, r)| match r {
            Record::Parameter(p) => Some(p),
            _ => None,
        }))
    }

    pub fn calibrations(&mut self) -> Result<impl Iterator<Item = &Calibration>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("CALIBRATION").filter_map(|(_, r)| match r {
            Record::Calibration(c) => Some(c),
            _ => None,
        }))
    }

    pub fn origins(&mut self) -> Result<impl Iterator<Item = &Origin>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("ORIGIN").filter_map(|(_, r)| match r {
            Record::Origin(o) => Some(o),
            _ => None,
        }))
    }

    pub fn axes(&mut self) -> Result<impl Iterator<Item = &Axis>> {
        self.ensure_indexed()?;
        Ok(self.table.iter_kind("AXIS").filter_map(|(_, r)| match r {
            Record::Axis(a) => Some(a),
            _ => None,
        }))
    }

    /// Every object whose set type has no dedicated Rust type (`spec.md`
    /// §4.6 "unknown set types produce a generic record").
    pub fn unknowns(&mut self) -> Result<impl Iterator<Item = &Record>> {
        self.ensure_indexed()?;
        Ok(self.table.iter().filter_map(|(_, r)| match r {
            Record::Generic(_) => Some(r),
            _ => None,
        }))
    }

    /// Resolves every [`crate::object::Reference`] reachable from a
    /// [`Frame`]'s channel list, so [`Frame::fmtstr`] and
    /// [`Frame::row_schema`] have something to walk (`spec.md` §4.6,
    /// "reference resolution... via table lookup").
    pub fn resolve_frame(&mut self, frame: &Frame) -> Result<Frame> {
        self.ensure_indexed()?;
        let channels = frame.channels.iter().map(|r| r.resolve(&self.table)).collect::<Result<Vec<_>>>()?;
        Ok(Frame { channels, ..frame.clone() })
    }
}

/// Scans `data[..scan_window.max(SUL_LEN)]` for the `V1.00` version marker
/// and parses the 80-byte label ending/starting around it (`spec.md` §4.3
/// point 1: "scan from offset 0 for up to some bounded window (>= 200
/// bytes)").
fn locate_sul(data: &[u8], scan_window: usize, on_warning: &mut dyn FnMut(Warning)) -> Result<(StorageUnitLabel, usize)> {
    const VERSION_MARKER: &[u8] = b"V1.00";
    const VERSION_FIELD_OFFSET: usize = 4;

    let window_end = (scan_window.max(SUL_LEN)).min(data.len());
    let haystack = &data[..window_end];
    let marker_pos = haystack
        .windows(VERSION_MARKER.len())
        .position(|w| w == VERSION_MARKER)
        .ok_or_else(|| Error::UnsupportedVersion("no V1.00 storage unit label found in scan window".to_string()))?;

    let label_start = marker_pos.saturating_sub(VERSION_FIELD_OFFSET);
    let label = sul::storage_label(&data[label_start..], on_warning)?;
    Ok((label, label_start))
}

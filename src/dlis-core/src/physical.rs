//! C3: physical layer — Visible Record / Logical Record Segment reassembly
//! (`spec.md` §4.3).
//!
//! Grounded on the teacher's `PeParser::read` chain (`metadata/parser.rs`):
//! validate a magic/signature field, then walk a sequence of fixed-header,
//! variable-body records. Unlike the PE header chain (one header of each
//! kind, read once), a DLIS byte stream is an open-ended sequence of VRs
//! each containing LRS fragments that must be reassembled across VR
//! boundaries into Logical Records (`spec.md` §4.3 point 4).

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// Visible Record header: `spec.md` §3 "Visible Record (VR)".
#[derive(Debug, Clone, Copy)]
pub struct VisibleRecordHeader {
    pub length: u16,
    pub format_version: u16,
}

impl VisibleRecordHeader {
    const SIZE: usize = 4;

    fn read(cursor: &mut Cursor, max_len: usize) -> Result<Self> {
        let length = cursor.read_u16()?;
        let format_version = cursor.read_u16()?;
        if format_version >> 8 != 0xFF {
            return Err(Error::MalformedVr(format!(
                "expected format version high byte 0xFF, got 0x{:02X}",
                format_version >> 8
            )));
        }
        if format_version & 0xFF != 0x01 {
            return Err(Error::MalformedVr(format!(
                "expected format version low byte 0x01, got 0x{:02X}",
                format_version & 0xFF
            )));
        }
        if length < Self::SIZE as u16 {
            return Err(Error::MalformedVr(format!("visible record length {length} shorter than header")));
        }
        if length as usize > max_len {
            return Err(Error::MalformedVr(format!("visible record length {length} exceeds configured maximum {max_len}")));
        }
        Ok(VisibleRecordHeader { length, format_version })
    }
}

/// Bitfield carried by each Logical Record Segment header (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LrsAttributes(u8);

impl LrsAttributes {
    const STRUCTURE: u8 = 0b1000_0000;
    const PREDECESSOR: u8 = 0b0100_0000;
    const SUCCESSOR: u8 = 0b0010_0000;
    const ENCRYPTION: u8 = 0b0001_0000;
    const ENCRYPTION_PACKET: u8 = 0b0000_1000;
    const CHECKSUM: u8 = 0b0000_0100;
    const TRAILING_LENGTH: u8 = 0b0000_0010;
    const PADDING: u8 = 0b0000_0001;

    pub fn explicit(self) -> bool {
        self.0 & Self::STRUCTURE != 0
    }
    pub fn has_predecessor(self) -> bool {
        self.0 & Self::PREDECESSOR != 0
    }
    pub fn has_successor(self) -> bool {
        self.0 & Self::SUCCESSOR != 0
    }
    pub fn encrypted(self) -> bool {
        self.0 & Self::ENCRYPTION != 0
    }
    pub fn has_encryption_packet(self) -> bool {
        self.0 & Self::ENCRYPTION_PACKET != 0
    }
    pub fn has_checksum(self) -> bool {
        self.0 & Self::CHECKSUM != 0
    }
    pub fn has_trailing_length(self) -> bool {
        self.0 & Self::TRAILING_LENGTH != 0
    }
    pub fn has_padding(self) -> bool {
        self.0 & Self::PADDING != 0
    }
}

/// One reassembled Logical Record (`spec.md` §3 "Logical Record (LR)").
#[derive(Debug, Clone)]
pub struct LogicalRecord {
    pub record_type: u8,
    pub explicit: bool,
    pub encrypted: bool,
    pub data: Vec<u8>,
}

/// In-progress reassembly of one LR across LRS/VR boundaries.
struct PendingRecord {
    record_type: u8,
    explicit: bool,
    encrypted: bool,
    data: Vec<u8>,
}

/// Walks Visible Records and Logical Record Segments, yielding reassembled
/// [`LogicalRecord`]s (`spec.md` §4.3).
pub struct PhysicalReader<'d> {
    data: &'d [u8],
    /// Offset of the next Visible Record header to read, once the current
    /// one (if any) has been fully drained.
    offset: usize,
    /// Offset of the next LRS header to read within the VR currently being
    /// drained, and that VR's body end. `None` when between VRs.
    current_vr: Option<(usize, usize)>,
    pending: Option<PendingRecord>,
    /// Upper bound on a single Visible Record's length (`ParseOptions::max_visible_record_len`).
    max_record_len: usize,
}

impl<'d> PhysicalReader<'d> {
    /// `start_offset` is the position immediately after the storage unit
    /// label (or after any pre-VR garbage, once synced — see
    /// [`Self::sync_to_first_vr`]). `max_record_len` bounds the length a
    /// single Visible Record's header may declare.
    pub fn new(data: &'d [u8], start_offset: usize, max_record_len: usize) -> Self {
        PhysicalReader { data, offset: start_offset, current_vr: None, pending: None, max_record_len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Scans forward from the current offset for the `0xFF 0x01` visible
    /// record format-version sync pattern, per `spec.md` §4.3 point 2.
    /// Returns the number of garbage bytes skipped.
    pub fn sync_to_first_vr(&mut self, max_scan: usize) -> Result<usize> {
        let window_end = (self.offset + max_scan).min(self.data.len().saturating_sub(1));
        let mut probe = self.offset;
        while probe + 4 <= self.data.len() && probe <= window_end {
            if self.data[probe + 2] == 0xFF && self.data[probe + 3] == 0x01 {
                let skipped = probe - self.offset;
                self.offset = probe;
                return Ok(skipped);
            }
            probe += 1;
        }
        Err(Error::MalformedVr("no visible record sync pattern found".to_string()))
    }

    /// Returns the next reassembled logical record, or `Ok(None)` at a clean
    /// end of file (a truncated Visible Record boundary, per `spec.md` §9's
    /// open question resolution: truncation exactly at a VR boundary is EOF,
    /// truncation mid-LRS is [`Error::Truncated`]).
    pub fn next_record(&mut self) -> Result<Option<LogicalRecord>> {
        loop {
            let (lrs_offset, vr_body_end) = match self.current_vr {
                Some(state) => state,
                None => {
                    if self.offset >= self.data.len() {
                        return Ok(None);
                    }
                    if self.offset + VisibleRecordHeader::SIZE > self.data.len() {
                        // Trailing garbage shorter than one VR header: clean EOF.
                        return Ok(None);
                    }

                    let mut cursor = Cursor::new(self.data);
                    cursor.set_position(self.offset);
                    let vr = VisibleRecordHeader::read(&mut cursor, self.max_record_len)?;
                    let vr_body_start = self.offset + VisibleRecordHeader::SIZE;
                    let vr_body_end = self.offset + vr.length as usize;
                    if vr_body_end > self.data.len() {
                        return Err(Error::Truncated);
                    }
                    (vr_body_start, vr_body_end)
                }
            };

            if lrs_offset + 4 > vr_body_end {
                // This VR is drained; advance to the next one and loop.
                self.offset = vr_body_end;
                self.current_vr = None;
                continue;
            }

            let (record, next_offset) = self.read_one_segment(lrs_offset, vr_body_end)?;
            self.current_vr = Some((next_offset, vr_body_end));
            if let Some(record) = record {
                return Ok(Some(record));
            }
        }
    }

    fn read_one_segment(&mut self, offset: usize, bound: usize) -> Result<(Option<LogicalRecord>, usize)> {
        let mut cursor = Cursor::new(self.data);
        cursor.set_position(offset);
        let length = cursor.read_u16()?;
        let attributes = LrsAttributes(cursor.read_u8()?);
        let record_type = cursor.read_u8()?;

        if (length as usize) < 4 || offset + length as usize > bound {
            return Err(Error::MalformedLrs(format!(
                "segment length {length} invalid at offset {offset} (bound {bound})"
            )));
        }

        let mut body = cursor.read_bytes(length as usize - 4)?.to_vec();
        strip_trailers(&mut body, attributes)?;

        if attributes.has_predecessor() {
            let pending = self.pending.as_mut().ok_or_else(|| {
                Error::MalformedLrs("segment has predecessor bit set but no record is open".to_string())
            })?;
            if pending.record_type != record_type {
                return Err(Error::MalformedLrs("segment type does not match open record".to_string()));
            }
            pending.encrypted |= attributes.encrypted();
            pending.data.extend_from_slice(&body);
        } else {
            if self.pending.is_some() {
                return Err(Error::MalformedLrs("new record started before previous one closed".to_string()));
            }
            self.pending = Some(PendingRecord {
                record_type,
                explicit: attributes.explicit(),
                encrypted: attributes.encrypted(),
                data: body,
            });
        }

        let next_offset = offset + length as usize;
        if attributes.has_successor() {
            Ok((None, next_offset))
        } else {
            let pending = self.pending.take().expect("record was just opened or extended above");
            Ok((
                Some(LogicalRecord {
                    record_type: pending.record_type,
                    explicit: pending.explicit,
                    encrypted: pending.encrypted,
                    data: pending.data,
                }),
                next_offset,
            ))
        }
    }
}

/// Strips, in order, encryption packet / checksum / trailing-length / pad
/// bytes from the tail of a segment body (`spec.md` §3's LRS body layout).
/// We do not attempt to separate an encryption packet from its payload: a
/// segment with the encryption flag set is surfaced unparsed regardless
/// (`spec.md` §4.3 edge cases), so leaving it embedded is harmless.
fn strip_trailers(body: &mut Vec<u8>, attributes: LrsAttributes) -> Result<()> {
    if attributes.has_padding() {
        let pad_count = *body.last().ok_or_else(|| Error::MalformedLrs("empty segment with padding bit set".to_string()))? as usize;
        if pad_count > body.len() {
            return Err(Error::MalformedLrs("pad count exceeds segment body length".to_string()));
        }
        body.truncate(body.len() - pad_count);
    }
    if attributes.has_trailing_length() {
        if body.len() < 2 {
            return Err(Error::MalformedLrs("segment too short for trailing length field".to_string()));
        }
        body.truncate(body.len() - 2);
    }
    if attributes.has_checksum() {
        if body.len() < 2 {
            return Err(Error::MalformedLrs("segment too short for checksum field".to_string()));
        }
        body.truncate(body.len() - 2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lrs(body: &[u8], attrs: u8, record_type: u8) -> Vec<u8> {
        let mut out = Vec::new();
        let length = (4 + body.len()) as u16;
        out.extend_from_slice(&length.to_be_bytes());
        out.push(attrs);
        out.push(record_type);
        out.extend_from_slice(body);
        out
    }

    fn vr(segments: &[Vec<u8>]) -> Vec<u8> {
        let body_len: usize = segments.iter().map(|s| s.len()).sum();
        let mut out = Vec::new();
        let length = (4 + body_len) as u16;
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&[0xFF, 0x01]);
        for s in segments {
            out.extend_from_slice(s);
        }
        out
    }

    const EXPLICIT: u8 = 0b1000_0000;

    #[test]
    fn single_segment_record_round_trips() {
        let data = vr(&[lrs(b"hello", EXPLICIT, 0)]);
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.data, b"hello");
        assert_eq!(record.record_type, 0);
        assert!(record.explicit);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn multi_segment_record_reassembles_in_order() {
        const SUCCESSOR: u8 = 0b0010_0000;
        const PREDECESSOR: u8 = 0b0100_0000;
        let first = lrs(b"abc", EXPLICIT | SUCCESSOR, 1);
        let second = lrs(b"def", PREDECESSOR, 1);
        let data = vr(&[first, second]);
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.data, b"abcdef");
    }

    #[test]
    fn padding_is_stripped_to_empty_payload() {
        const PADDING: u8 = 0b0000_0001;
        // pad_count includes itself: an all-padding body of length 4 strips
        // down to an empty payload.
        let body = [0u8, 0, 0, 4];
        let data = vr(&[lrs(&body, EXPLICIT | PADDING, 0)]);
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        let record = reader.next_record().unwrap().unwrap();
        assert!(record.data.is_empty());
    }

    #[test]
    fn truncated_mid_lrs_is_an_error() {
        let mut data = vr(&[lrs(b"hello", EXPLICIT, 0)]);
        data.truncate(data.len() - 2);
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        assert!(matches!(reader.next_record(), Err(Error::Truncated)));
    }

    #[test]
    fn visible_record_over_configured_max_is_an_error() {
        let data = vr(&[lrs(b"hello", EXPLICIT, 0)]);
        let mut reader = PhysicalReader::new(&data, 0, 8);
        assert!(matches!(reader.next_record(), Err(Error::MalformedVr(_))));
    }

    #[test]
    fn wrong_format_version_low_byte_is_an_error() {
        let mut data = vr(&[lrs(b"hello", EXPLICIT, 0)]);
        data[3] = 0x02;
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        assert!(matches!(reader.next_record(), Err(Error::MalformedVr(_))));
    }

    #[test]
    fn sync_skips_leading_garbage() {
        let mut data = vec![0u8; 6];
        data.extend_from_slice(&vr(&[lrs(b"hi", EXPLICIT, 0)]));
        let mut reader = PhysicalReader::new(&data, 0, 16 * 1024);
        let skipped = reader.sync_to_first_vr(20).unwrap();
        assert_eq!(skipped, 6);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.data, b"hi");
    }
}

//! C2: representation-code decoder (`spec.md` §4.2, codes 1-27).
//!
//! Grounded on the teacher's `TableDecode` trait (`metadata/decode.rs`), which
//! gives every primitive a single fallible `decode(context, buffer) -> T`
//! function threaded through a cursor. RP66 redesign note (`spec.md` §9):
//! dispatch is a flat function table keyed by code rather than a trait
//! hierarchy per Rust type, since the 27 codes are a closed enumeration, not
//! compositions of distinct Rust primitive types the way CIL column types are.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::warning::Warning;

/// A single decoded RP66 value, tagged by representation code.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    FShort(f32),
    FSingl(f32),
    FSing1(f32, f32),
    FSing2(f32, f32, f32),
    ISingl(f32),
    VSingl(f32),
    FDoubl(f64),
    FDoub1(f64, f64),
    FDoub2(f64, f64, f64),
    CSingl(f32, f32),
    CDoubl(f64, f64),
    SShort(i8),
    SNorm(i16),
    SLong(i32),
    UShort(u8),
    UNorm(u16),
    ULong(u32),
    UVari(u32),
    Ident(String),
    Ascii(String),
    DTime(DTime),
    Origin(u32),
    ObName(ObName),
    ObjRef(ObjRef),
    AttRef(AttRef),
    Status(bool),
    Units(String),
}

/// `II.24.2.6`-style date-time: RP66 §3.2.2, code 21 (DTIME).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DTime {
    pub year: u16,
    pub timezone: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

/// `(id, origin, copynumber)`, uniquely identifying an object within its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObName {
    pub origin: u32,
    pub copynumber: u8,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjRef {
    pub obj_type: String,
    pub name: ObName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttRef {
    pub obj_type: String,
    pub name: ObName,
    pub label: String,
}

/// Decodes a single value of representation code `code` from `cursor`.
///
/// `on_warning` receives lossy-UTF-8 notices (`spec.md` §4.2's "tolerate
/// invalid UTF-8" failure mode); it does not receive errors, which propagate
/// through the `Result`.
pub fn decode(code: u8, cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning)) -> Result<Value> {
    Ok(match code {
        1 => Value::FShort(decode_fshort(cursor)?),
        2 => Value::FSingl(cursor.read_f32()?),
        3 => Value::FSing1(cursor.read_f32()?, cursor.read_f32()?),
        4 => Value::FSing2(cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?),
        5 => Value::ISingl(decode_isingl(cursor)?),
        6 => Value::VSingl(decode_vsingl(cursor)?),
        7 => Value::FDoubl(cursor.read_f64()?),
        8 => Value::FDoub1(cursor.read_f64()?, cursor.read_f64()?),
        9 => Value::FDoub2(cursor.read_f64()?, cursor.read_f64()?, cursor.read_f64()?),
        10 => Value::CSingl(cursor.read_f32()?, cursor.read_f32()?),
        11 => Value::CDoubl(cursor.read_f64()?, cursor.read_f64()?),
        12 => Value::SShort(cursor.read_i8()?),
        13 => Value::SNorm(cursor.read_i16()?),
        14 => Value::SLong(cursor.read_i32()?),
        15 => Value::UShort(cursor.read_u8()?),
        16 => Value::UNorm(cursor.read_u16()?),
        17 => Value::ULong(cursor.read_u32()?),
        18 => Value::UVari(decode_uvari(cursor)?),
        19 => Value::Ident(decode_ident(cursor, on_warning, "IDENT")?),
        20 => Value::Ascii(decode_ascii(cursor, on_warning)?),
        21 => Value::DTime(decode_dtime(cursor)?),
        22 => Value::Origin(decode_uvari(cursor)?),
        23 => Value::ObName(decode_obname(cursor, on_warning)?),
        24 => Value::ObjRef(decode_objref(cursor, on_warning)?),
        25 => Value::AttRef(decode_attref(cursor, on_warning)?),
        26 => Value::Status(cursor.read_u8()? != 0),
        27 => Value::Units(decode_ident(cursor, on_warning, "UNITS")?),
        other => return Err(Error::UnknownReprc(other)),
    })
}

/// RP66 Appendix A `FSHORT`: sign (1 bit), exponent (4 bits, two's
/// complement), fraction (11 bits, unsigned magnitude), value =
/// `sign * fraction * 2^(exponent - 10)`.
fn decode_fshort(cursor: &mut Cursor) -> Result<f32> {
    let raw = cursor.read_u16()?;
    let sign = if raw & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((raw >> 11) & 0x0F) as i8;
    let exponent = if exponent > 7 { exponent - 16 } else { exponent };
    let fraction = (raw & 0x07FF) as f32;
    Ok(sign * fraction * 2f32.powi(exponent as i32 - 10))
}

/// RP66 Appendix A `ISINGL`: IBM System/360 single precision float — sign (1
/// bit), exponent (7 bits, excess-64, base 16), fraction (24 bits).
fn decode_isingl(cursor: &mut Cursor) -> Result<f32> {
    let raw = cursor.read_u32()?;
    let sign = if raw & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((raw >> 24) & 0x7F) as i32 - 64;
    let fraction = (raw & 0x00FF_FFFF) as f32 / (1u32 << 24) as f32;
    Ok(sign * fraction * 16f32.powi(exponent))
}

/// RP66 Appendix A `VSINGL`: VAX F-floating — sign (1 bit), exponent (8
/// bits, excess 128), fraction (23 bits, implied leading `0.1`), stored as
/// two word-swapped 16-bit halves relative to IEEE byte order.
fn decode_vsingl(cursor: &mut Cursor) -> Result<f32> {
    let bytes = cursor.read_bytes(4)?;
    let swapped = [bytes[2], bytes[3], bytes[0], bytes[1]];
    let raw = u32::from_be_bytes(swapped);
    let sign = if raw & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((raw >> 23) & 0xFF) as i32;
    if exponent == 0 {
        return Ok(0.0);
    }
    let fraction = (raw & 0x007F_FFFF) as f32 / (1u32 << 23) as f32;
    Ok(sign * (1.0 + fraction) * 2f32.powi(exponent - 129))
}

/// RP66 §4.2's UVARI: top two bits of the first byte select a 1/2/4-byte
/// width, masked off from the value itself. Must fit in 30 bits (invariant 5
/// of `spec.md` §3).
pub fn decode_uvari(cursor: &mut Cursor) -> Result<u32> {
    let first = cursor.read_u8()?;
    let value = if first & 0x80 == 0 {
        first as u32
    } else if first & 0xC0 == 0x80 {
        let second = cursor.read_u8()?;
        (((first & 0x3F) as u32) << 8) | second as u32
    } else {
        let rest = cursor.read_bytes(3)?;
        (((first & 0x3F) as u32) << 24)
            | ((rest[0] as u32) << 16)
            | ((rest[1] as u32) << 8)
            | rest[2] as u32
    };
    Ok(value)
}

/// RP66 code 19 (IDENT) and 27 (UNITS): one length byte, then that many
/// ASCII bytes, decoded lossily (`spec.md` §4.2's UTF-8 tolerance rule).
pub fn decode_ident(cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning), context: &str) -> Result<String> {
    let len = cursor.read_u8()? as usize;
    let bytes = cursor.read_bytes(len)?;
    Ok(lossy_utf8(bytes, context, on_warning))
}

/// RP66 code 20 (ASCII): a UVARI length prefix, then that many bytes.
pub fn decode_ascii(cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning)) -> Result<String> {
    let len = decode_uvari(cursor)? as usize;
    let bytes = cursor.read_bytes(len)?;
    Ok(lossy_utf8(bytes, "ASCII", on_warning))
}

fn lossy_utf8(bytes: &[u8], context: &str, on_warning: &mut dyn FnMut(Warning)) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            on_warning(Warning::InvalidUtf8 { context: context.to_string() });
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn decode_dtime(cursor: &mut Cursor) -> Result<DTime> {
    let year = cursor.read_u8()? as u16 + 1900;
    let tz_month = cursor.read_u8()?;
    let day = cursor.read_u8()?;
    let hour = cursor.read_u8()?;
    let minute = cursor.read_u8()?;
    let second = cursor.read_u8()?;
    let millisecond = cursor.read_u16()?;
    Ok(DTime {
        year,
        timezone: (tz_month & 0xF0) >> 4,
        month: tz_month & 0x0F,
        day,
        hour,
        minute,
        second,
        millisecond,
    })
}

pub fn decode_obname(cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning)) -> Result<ObName> {
    let origin = decode_uvari(cursor)?;
    let copynumber = cursor.read_u8()?;
    let id = decode_ident(cursor, on_warning, "OBNAME")?;
    Ok(ObName { origin, copynumber, id })
}

fn decode_objref(cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning)) -> Result<ObjRef> {
    let obj_type = decode_ident(cursor, on_warning, "OBJREF")?;
    let name = decode_obname(cursor, on_warning)?;
    Ok(ObjRef { obj_type, name })
}

fn decode_attref(cursor: &mut Cursor, on_warning: &mut dyn FnMut(Warning)) -> Result<AttRef> {
    let obj_type = decode_ident(cursor, on_warning, "ATTREF")?;
    let name = decode_obname(cursor, on_warning)?;
    let label = decode_ident(cursor, on_warning, "ATTREF")?;
    Ok(AttRef { obj_type, name, label })
}

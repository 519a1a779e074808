//! C6: object model (`spec.md` §4.6).
//!
//! Grounded on the teacher's `Row` enum (`metadata/rows.rs`): one variant
//! per known kind, each a plain struct with named fields taken from the
//! spec's attribute table. Generalized with a `GenericRecord` fallback
//! absent from the teacher (CIL tables are closed; DLIS set types are
//! open) but with precedent in the broader pack's data-carrying unknown
//! variants, e.g. `SectionType::Unknown(u32)` in
//! `other_examples/140c7e3a_Cach30verfl0w-libelf__src-header-mod.rs.rs`,
//! which keeps an `Unknown` payload variant alongside its named ELF
//! section-type variants.

use crate::eflr::{Attribute, Object, Set};
use crate::error::{Error, Result};
use crate::reprc::{ObName, Value};
use crate::table::{Fingerprint, Table};

/// A reference to another object, resolved lazily via table lookup
/// (`spec.md` §9: "do not store raw pointers, as objects may be appended
/// to during indexing").
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<K> {
    Unresolved(ObName),
    Resolved(K),
}

impl<K: TypedRecord + Clone> Reference<K> {
    pub fn resolve(&self, table: &Table) -> Result<Reference<K>> {
        match self {
            Reference::Resolved(k) => Ok(Reference::Resolved(k.clone())),
            Reference::Unresolved(name) => {
                let fp = Fingerprint::from_obname(K::SET_TYPE, name);
                let record = if K::SET_TYPE.is_empty() {
                    // Wildcard sentinel (`GenericRecord::SET_TYPE`): the
                    // reference site doesn't know the target's set type, so
                    // match on id/origin/copynumber alone.
                    table.get_by_name(name.origin, name.copynumber, &name.id).map(|(_, r)| r)
                } else {
                    table.get(&fp)
                };
                let record = record.ok_or_else(|| Error::DanglingReference(fp.clone()))?;
                let typed = K::from_record(record).ok_or_else(|| Error::DanglingReference(fp))?;
                Ok(Reference::Resolved(typed.clone()))
            }
        }
    }

    pub fn name(&self) -> Option<&ObName> {
        match self {
            Reference::Unresolved(name) => Some(name),
            Reference::Resolved(_) => None,
        }
    }
}

/// Implemented by every typed record so [`Reference`] resolution knows
/// which set type to look up and how to downcast a [`Record`].
pub trait TypedRecord: Sized {
    const SET_TYPE: &'static str;
    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! typed_record {
    ($ty:ident, $set_type:literal, $variant:ident) => {
        impl TypedRecord for $ty {
            const SET_TYPE: &'static str = $set_type;
            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    Record::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::Ident(s) | Value::Ascii(s) | Value::Units(s) => Some(s.clone()),
        _ => None,
    }
}

fn f64_of(value: &Value) -> Option<f64> {
    match *value {
        Value::FShort(v) | Value::FSingl(v) | Value::ISingl(v) | Value::VSingl(v) => Some(v as f64),
        Value::FDoubl(v) => Some(v),
        Value::SShort(v) => Some(v as f64),
        Value::SNorm(v) => Some(v as f64),
        Value::SLong(v) => Some(v as f64),
        Value::UShort(v) => Some(v as f64),
        Value::UNorm(v) => Some(v as f64),
        Value::ULong(v) => Some(v as f64),
        Value::UVari(v) => Some(v as f64),
        _ => None,
    }
}

fn i64_of(value: &Value) -> Option<i64> {
    match *value {
        Value::SShort(v) => Some(v as i64),
        Value::SNorm(v) => Some(v as i64),
        Value::SLong(v) => Some(v as i64),
        Value::UShort(v) => Some(v as i64),
        Value::UNorm(v) => Some(v as i64),
        Value::ULong(v) => Some(v as i64),
        Value::UVari(v) => Some(v as i64),
        Value::Origin(v) => Some(v as i64),
        _ => None,
    }
}

fn obname_of(value: &Value) -> Option<ObName> {
    match value {
        Value::ObName(n) => Some(n.clone()),
        Value::ObjRef(r) => Some(r.name.clone()),
        Value::AttRef(r) => Some(r.name.clone()),
        _ => None,
    }
}

/// Convenience extraction used by every typed record's `from_object`
/// (`spec.md` §4.6 "Field extraction rules").
trait ObjectExt {
    fn attr(&self, label: &str) -> Option<&Attribute>;
    fn scalar_string(&self, label: &str) -> Option<String>;
    fn scalar_f64(&self, label: &str) -> Option<f64>;
    fn scalar_i64(&self, label: &str) -> Option<i64>;
    fn scalar_bool(&self, label: &str) -> Option<bool>;
    fn list_strings(&self, label: &str) -> Vec<String>;
    fn list_i64(&self, label: &str) -> Vec<i64>;
    fn reference<K>(&self, label: &str) -> Option<Reference<K>>;
    fn reference_list<K>(&self, label: &str) -> Vec<Reference<K>>;
}

impl ObjectExt for Object {
    fn attr(&self, label: &str) -> Option<&Attribute> {
        self.attribute(label)
    }

    fn scalar_string(&self, label: &str) -> Option<String> {
        self.attr(label)?.values.first().and_then(string_of)
    }

    fn scalar_f64(&self, label: &str) -> Option<f64> {
        self.attr(label)?.values.first().and_then(f64_of)
    }

    fn scalar_i64(&self, label: &str) -> Option<i64> {
        self.attr(label)?.values.first().and_then(i64_of)
    }

    fn scalar_bool(&self, label: &str) -> Option<bool> {
        match self.attr(label)?.values.first()? {
            Value::Status(b) => Some(*b),
            other => i64_of(other).map(|v| v != 0),
        }
    }

    fn list_strings(&self, label: &str) -> Vec<String> {
        self.attr(label).map(|a| a.values.iter().filter_map(string_of).collect()).unwrap_or_default()
    }

    fn list_i64(&self, label: &str) -> Vec<i64> {
        self.attr(label).map(|a| a.values.iter().filter_map(i64_of).collect()).unwrap_or_default()
    }

    fn reference<K>(&self, label: &str) -> Option<Reference<K>> {
        let name = self.attr(label)?.values.first().and_then(obname_of)?;
        Some(Reference::Unresolved(name))
    }

    fn reference_list<K>(&self, label: &str) -> Vec<Reference<K>> {
        self.attr(label)
            .map(|a| a.values.iter().filter_map(obname_of).map(Reference::Unresolved).collect())
            .unwrap_or_default()
    }
}

/// RP66 Appendix B channel format characters (`spec.md` §4.6 "Format string").
pub fn format_char(reprc: u8) -> char {
    match reprc {
        1 | 2 | 5 | 6 => 'f',
        3 | 4 => 'r',
        7 => 'F',
        8 | 9 => 'R',
        10 => 'c',
        11 => 'C',
        12 => 'b',
        13 => 's',
        14 => 'l',
        15 => 'B',
        16 => 'S',
        17 => 'L',
        18 => 'U',
        19 | 27 => 'i',
        20 => 'a',
        21 => 'j',
        22 => 'u',
        23 => 'o',
        24 => 'O',
        25 => 'A',
        26 => 't',
        _ => '?',
    }
}

macro_rules! simple_record {
    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty => $label:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub name: ObName,
            $(pub $field: $ty,)*
        }
    };
}

simple_record!(
    /// `spec.md` §4.6: file header record.
    FileHeader { sequence_number: Option<String> => "SEQUENCE-NUMBER", id: Option<String> => "ID" }
);
typed_record!(FileHeader, "FILE-HEADER", FileHeader);
impl FileHeader {
    fn from_object(obj: &Object) -> Self {
        FileHeader { name: obj.name.clone(), sequence_number: obj.scalar_string("SEQUENCE-NUMBER"), id: obj.scalar_string("ID") }
    }
}

simple_record!(
    Origin {
        file_id: Option<String> => "FILE-ID",
        file_set_name: Option<String> => "FILE-SET-NAME",
        file_set_number: Option<i64> => "FILE-SET-NUMBER",
        file_number: Option<i64> => "FILE-NUMBER",
        well_id: Option<String> => "WELL-ID",
        well_name: Option<String> => "WELL-NAME",
        field_name: Option<String> => "FIELD-NAME",
        company: Option<String> => "COMPANY",
        producer_name: Option<String> => "PRODUCER-NAME",
        product: Option<String> => "PRODUCT",
        version: Option<String> => "VERSION",
        programs: Vec<String> => "PROGRAMS",
    }
);
typed_record!(Origin, "ORIGIN", Origin);
impl Origin {
    fn from_object(obj: &Object) -> Self {
        Origin {
            name: obj.name.clone(),
            file_id: obj.scalar_string("FILE-ID"),
            file_set_name: obj.scalar_string("FILE-SET-NAME"),
            file_set_number: obj.scalar_i64("FILE-SET-NUMBER"),
            file_number: obj.scalar_i64("FILE-NUMBER"),
            well_id: obj.scalar_string("WELL-ID"),
            well_name: obj.scalar_string("WELL-NAME"),
            field_name: obj.scalar_string("FIELD-NAME"),
            company: obj.scalar_string("COMPANY"),
            producer_name: obj.scalar_string("PRODUCER-NAME"),
            product: obj.scalar_string("PRODUCT"),
            version: obj.scalar_string("VERSION"),
            programs: obj.list_strings("PROGRAMS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: ObName,
    pub long_name: Option<String>,
    pub reprc: u8,
    pub units: Option<String>,
    pub properties: Vec<String>,
    pub dimension: Vec<i64>,
    pub element_limit: Vec<i64>,
    pub axis: Vec<Reference<Axis>>,
    pub source: Option<ObName>,
}
typed_record!(Channel, "CHANNEL", Channel);
impl Channel {
    fn from_object(obj: &Object) -> Self {
        Channel {
            name: obj.name.clone(),
            long_name: obj.scalar_string("LONG-NAME"),
            reprc: obj.attr("REPRESENTATION-CODE").and_then(|a| a.values.first()).and_then(i64_of).map(|v| v as u8).unwrap_or(19),
            units: obj.scalar_string("UNITS"),
            properties: obj.list_strings("PROPERTIES"),
            dimension: obj.list_i64("DIMENSION"),
            element_limit: obj.list_i64("ELEMENT-LIMIT"),
            axis: obj.reference_list("AXIS"),
            source: obj.attr("SOURCE").and_then(|a| a.values.first()).and_then(obname_of),
        }
    }

    /// The channel's format character, derived from its representation
    /// code (`spec.md` §4.6).
    pub fn format_char(&self) -> char {
        format_char(self.reprc)
    }

    /// Total scalar element count across `dimension` (1 for a scalar
    /// channel, the product of dimensions for an array channel).
    pub fn scalar_count(&self) -> i64 {
        if self.dimension.is_empty() {
            1
        } else {
            self.dimension.iter().product()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: ObName,
    pub description: Option<String>,
    pub channels: Vec<Reference<Channel>>,
    pub index_type: Option<String>,
    pub direction: Option<String>,
    pub spacing: Option<f64>,
    pub encrypted: bool,
    pub index_min: Option<f64>,
    pub index_max: Option<f64>,
}
typed_record!(Frame, "FRAME", Frame);
impl Frame {
    fn from_object(obj: &Object) -> Self {
        Frame {
            name: obj.name.clone(),
            description: obj.scalar_string("DESCRIPTION"),
            channels: obj.reference_list("CHANNELS"),
            index_type: obj.scalar_string("INDEX-TYPE"),
            direction: obj.scalar_string("DIRECTION"),
            spacing: obj.scalar_f64("SPACING"),
            encrypted: false,
            index_min: obj.scalar_f64("INDEX-MIN"),
            index_max: obj.scalar_f64("INDEX-MAX"),
        }
    }

    /// Concatenates resolved channels' format characters, one run per
    /// scalar element (`spec.md` §4.6, §8 scenario 6).
    pub fn fmtstr(&self) -> String {
        self.channels
            .iter()
            .filter_map(|r| match r {
                Reference::Resolved(channel) => Some(channel),
                Reference::Unresolved(_) => None,
            })
            .flat_map(|channel| std::iter::repeat(channel.format_char()).take(channel.scalar_count().max(0) as usize))
            .collect()
    }

    /// `(channel_id, scalar_type, shape)` per resolved channel
    /// (`spec.md` §4.6 "Row schema").
    pub fn row_schema(&self) -> Vec<(String, char, Vec<i64>)> {
        self.channels
            .iter()
            .filter_map(|r| match r {
                Reference::Resolved(channel) => Some((channel.name.id.clone(), channel.format_char(), channel.dimension.clone())),
                Reference::Unresolved(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: ObName,
    pub description: Option<String>,
    pub channels: Vec<Reference<Channel>>,
    pub parameters: Vec<Reference<Parameter>>,
    pub parts: Vec<Reference<GenericRecord>>,
    pub status: Option<bool>,
}
typed_record!(Tool, "TOOL", Tool);
impl Tool {
    fn from_object(obj: &Object) -> Self {
        Tool {
            name: obj.name.clone(),
            description: obj.scalar_string("DESCRIPTION"),
            channels: obj.reference_list("CHANNELS"),
            parameters: obj.reference_list("PARAMETERS"),
            parts: obj.reference_list("PARTS"),
            status: obj.scalar_bool("STATUS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: ObName,
    pub long_name: Option<String>,
    pub dimension: Vec<i64>,
    pub axis: Vec<Reference<Axis>>,
    pub zones: Vec<Reference<Zone>>,
    pub values: Vec<Value>,
}
typed_record!(Parameter, "PARAMETER", Parameter);
impl Parameter {
    fn from_object(obj: &Object) -> Self {
        Parameter {
            name: obj.name.clone(),
            long_name: obj.scalar_string("LONG-NAME"),
            dimension: obj.list_i64("DIMENSION"),
            axis: obj.reference_list("AXIS"),
            zones: obj.reference_list("ZONES"),
            values: obj.attr("VALUES").map(|a| a.values.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub name: ObName,
    pub method: Option<String>,
    pub calibrated_channel: Vec<Reference<Channel>>,
    pub uncalibrated_channel: Vec<Reference<Channel>>,
    pub coefficients: Vec<Reference<CalibrationCoefficient>>,
    pub measurements: Vec<Reference<CalibrationMeasurement>>,
    pub parameters: Vec<Reference<Parameter>>,
}
typed_record!(Calibration, "CALIBRATION", Calibration);
impl Calibration {
    fn from_object(obj: &Object) -> Self {
        Calibration {
            name: obj.name.clone(),
            method: obj.scalar_string("METHOD"),
            calibrated_channel: obj.reference_list("CALIBRATED-CHANNELS"),
            uncalibrated_channel: obj.reference_list("UNCALIBRATED-CHANNELS"),
            coefficients: obj.reference_list("COEFFICIENTS"),
            measurements: obj.reference_list("MEASUREMENTS"),
            parameters: obj.reference_list("PARAMETERS"),
        }
    }
}

simple_record!(
    Axis { axis_id: Option<String> => "AXIS-ID", coordinates: Vec<String> => "COORDINATES", spacing: Option<f64> => "SPACING" }
);
typed_record!(Axis, "AXIS", Axis);
impl Axis {
    fn from_object(obj: &Object) -> Self {
        Axis { name: obj.name.clone(), axis_id: obj.scalar_string("AXIS-ID"), coordinates: obj.list_strings("COORDINATES"), spacing: obj.scalar_f64("SPACING") }
    }
}

simple_record!(
    Zone { description: Option<String> => "DESCRIPTION", domain: Option<String> => "DOMAIN", maximum: Option<f64> => "MAXIMUM", minimum: Option<f64> => "MINIMUM" }
);
typed_record!(Zone, "ZONE", Zone);
impl Zone {
    fn from_object(obj: &Object) -> Self {
        Zone { name: obj.name.clone(), description: obj.scalar_string("DESCRIPTION"), domain: obj.scalar_string("DOMAIN"), maximum: obj.scalar_f64("MAXIMUM"), minimum: obj.scalar_f64("MINIMUM") }
    }
}

simple_record!(
    Equipment {
        trademark_name: Option<String> => "TRADEMARK-NAME",
        status: Option<bool> => "STATUS",
        kind: Option<String> => "TYPE",
        serial_number: Option<String> => "SERIAL-NUMBER",
        location: Option<String> => "LOCATION",
        height: Option<f64> => "HEIGHT",
        length: Option<f64> => "LENGTH",
        weight: Option<f64> => "WEIGHT",
    }
);
typed_record!(Equipment, "EQUIPMENT", Equipment);
impl Equipment {
    fn from_object(obj: &Object) -> Self {
        Equipment {
            name: obj.name.clone(),
            trademark_name: obj.scalar_string("TRADEMARK-NAME"),
            status: obj.scalar_bool("STATUS"),
            kind: obj.scalar_string("TYPE"),
            serial_number: obj.scalar_string("SERIAL-NUMBER"),
            location: obj.scalar_string("LOCATION"),
            height: obj.scalar_f64("HEIGHT"),
            length: obj.scalar_f64("LENGTH"),
            weight: obj.scalar_f64("WEIGHT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub name: ObName,
    pub description: Option<String>,
    pub status: Option<String>,
    pub input_channels: Vec<Reference<Channel>>,
    pub output_channels: Vec<Reference<Channel>>,
    pub parameters: Vec<Reference<Parameter>>,
    pub comment: Option<String>,
}
typed_record!(Process, "PROCESS", Process);
impl Process {
    fn from_object(obj: &Object) -> Self {
        Process {
            name: obj.name.clone(),
            description: obj.scalar_string("DESCRIPTION"),
            status: obj.scalar_string("STATUS"),
            input_channels: obj.reference_list("INPUT-CHANNELS"),
            output_channels: obj.reference_list("OUTPUT-CHANNELS"),
            parameters: obj.reference_list("PARAMETERS"),
            comment: obj.scalar_string("COMMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub name: ObName,
    pub frame_type: Option<Reference<Frame>>,
    pub well_reference_point: Option<Reference<WellReferencePoint>>,
    pub value: Vec<Reference<Channel>>,
    pub borehole_depth: Option<Reference<Channel>>,
    pub vertical_depth: Option<Reference<Channel>>,
    pub time: Option<Reference<Channel>>,
}
typed_record!(Path, "PATH", Path);
impl Path {
    fn from_object(obj: &Object) -> Self {
        Path {
            name: obj.name.clone(),
            frame_type: obj.reference("FRAME-TYPE"),
            well_reference_point: obj.reference("WELL-REFERENCE-POINT"),
            value: obj.reference_list("VALUE"),
            borehole_depth: obj.reference("BOREHOLE-DEPTH"),
            vertical_depth: obj.reference("VERTICAL-DEPTH"),
            time: obj.reference("TIME"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCoefficient {
    pub name: ObName,
    pub label: Option<String>,
    pub coefficients: Vec<f64>,
    pub references: Vec<f64>,
    pub plus_tolerances: Vec<f64>,
    pub minus_tolerances: Vec<f64>,
}
typed_record!(CalibrationCoefficient, "CALIBRATION-COEFFICIENT", CalibrationCoefficient);
impl CalibrationCoefficient {
    fn from_object(obj: &Object) -> Self {
        CalibrationCoefficient {
            name: obj.name.clone(),
            label: obj.scalar_string("LABEL"),
            coefficients: obj.attr("COEFFICIENTS").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            references: obj.attr("REFERENCES").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            plus_tolerances: obj.attr("PLUS-TOLERANCES").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            minus_tolerances: obj.attr("MINUS-TOLERANCES").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMeasurement {
    pub name: ObName,
    pub phase: Option<String>,
    pub measurement_source: Option<ObName>,
    pub kind: Option<String>,
    pub dimension: Vec<i64>,
    pub axis: Vec<Reference<Axis>>,
    pub measurement: Vec<f64>,
    pub sample_count: Option<i64>,
    pub standard: Vec<f64>,
    pub plus_tolerance: Vec<f64>,
    pub minus_tolerance: Vec<f64>,
}
typed_record!(CalibrationMeasurement, "CALIBRATION-MEASUREMENT", CalibrationMeasurement);
impl CalibrationMeasurement {
    fn from_object(obj: &Object) -> Self {
        CalibrationMeasurement {
            name: obj.name.clone(),
            phase: obj.scalar_string("PHASE"),
            measurement_source: obj.attr("MEASUREMENT-SOURCE").and_then(|a| a.values.first()).and_then(obname_of),
            kind: obj.scalar_string("TYPE"),
            dimension: obj.list_i64("DIMENSION"),
            axis: obj.reference_list("AXIS"),
            measurement: obj.attr("MEASUREMENT").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            sample_count: obj.scalar_i64("SAMPLE-COUNT"),
            standard: obj.attr("STANDARD").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            plus_tolerance: obj.attr("PLUS-TOLERANCE").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
            minus_tolerance: obj.attr("MINUS-TOLERANCE").map(|a| a.values.iter().filter_map(f64_of).collect()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: ObName,
    pub description: Option<String>,
    pub object_type: Option<String>,
    pub object_list: Vec<ObName>,
    pub group_list: Vec<Reference<Group>>,
}
typed_record!(Group, "GROUP", Group);
impl Group {
    fn from_object(obj: &Object) -> Self {
        Group {
            name: obj.name.clone(),
            description: obj.scalar_string("DESCRIPTION"),
            object_type: obj.scalar_string("OBJECT-TYPE"),
            object_list: obj.attr("OBJECT-LIST").map(|a| a.values.iter().filter_map(obname_of).collect()).unwrap_or_default(),
            group_list: obj.reference_list("GROUP-LIST"),
        }
    }
}

simple_record!(LongName { text: Option<String> => "SHORT-NAME" });
typed_record!(LongName, "LONG-NAME", LongName);
impl LongName {
    fn from_object(obj: &Object) -> Self {
        LongName { name: obj.name.clone(), text: obj.scalar_string("SHORT-NAME") }
    }
}

simple_record!(Comment { text: Option<String> => "TEXT" });
typed_record!(Comment, "COMMENT", Comment);
impl Comment {
    fn from_object(obj: &Object) -> Self {
        Comment { name: obj.name.clone(), text: obj.scalar_string("TEXT") }
    }
}

simple_record!(Message { kind: Option<String> => "TYPE", text: Option<String> => "TEXT" });
typed_record!(Message, "MESSAGE", Message);
impl Message {
    fn from_object(obj: &Object) -> Self {
        Message { name: obj.name.clone(), kind: obj.scalar_string("TYPE"), text: obj.scalar_string("TEXT") }
    }
}

simple_record!(NoFormat { consumer_name: Option<String> => "CONSUMER-NAME", description: Option<String> => "DESCRIPTION" });
typed_record!(NoFormat, "NO-FORMAT", NoFormat);
impl NoFormat {
    fn from_object(obj: &Object) -> Self {
        NoFormat { name: obj.name.clone(), consumer_name: obj.scalar_string("CONSUMER-NAME"), description: obj.scalar_string("DESCRIPTION") }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    pub name: ObName,
    pub output_channel: Option<Reference<Channel>>,
    pub input_channels: Vec<Reference<Channel>>,
    pub zones: Vec<Reference<Zone>>,
}
typed_record!(Splice, "SPLICE", Splice);
impl Splice {
    fn from_object(obj: &Object) -> Self {
        Splice {
            name: obj.name.clone(),
            output_channel: obj.reference("OUTPUT-CHANNEL"),
            input_channels: obj.reference_list("INPUT-CHANNELS"),
            zones: obj.reference_list("ZONES"),
        }
    }
}

simple_record!(
    WellReferencePoint {
        permanent_datum: Option<String> => "PERMANENT-DATUM",
        vertical_zero: Option<String> => "VERTICAL-ZERO",
        permanent_datum_elevation: Option<f64> => "PERMANENT-DATUM-ELEVATION",
        above_permanent_datum: Option<f64> => "ABOVE-PERMANENT-DATUM",
        magnetic_declination: Option<f64> => "MAGNETIC-DECLINATION",
    }
);
typed_record!(WellReferencePoint, "WELL-REFERENCE-POINT", WellReferencePoint);
impl WellReferencePoint {
    fn from_object(obj: &Object) -> Self {
        WellReferencePoint {
            name: obj.name.clone(),
            permanent_datum: obj.scalar_string("PERMANENT-DATUM"),
            vertical_zero: obj.scalar_string("VERTICAL-ZERO"),
            permanent_datum_elevation: obj.scalar_f64("PERMANENT-DATUM-ELEVATION"),
            above_permanent_datum: obj.scalar_f64("ABOVE-PERMANENT-DATUM"),
            magnetic_declination: obj.scalar_f64("MAGNETIC-DECLINATION"),
        }
    }
}

/// Fallback for set types with no dedicated Rust type (`spec.md` §9 "open
/// content record").
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    pub name: ObName,
    pub attributes: Vec<(String, Attribute)>,
}
impl TypedRecord for GenericRecord {
    /// Empty string is a wildcard sentinel, not a real RP66 set type:
    /// [`Reference::resolve`] special-cases it to look a name up by
    /// id/origin/copynumber alone instead of building a `Fingerprint` with
    /// this as the set type (a `Table` never keys anything under `""`).
    const SET_TYPE: &'static str = "";
    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Generic(inner) => Some(inner),
            _ => None,
        }
    }
}

/// One assembled object, tagged by known set type or carried generically
/// (`spec.md` §4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    FileHeader(FileHeader),
    Origin(Origin),
    Channel(Channel),
    Frame(Frame),
    Tool(Tool),
    Parameter(Parameter),
    Calibration(Calibration),
    Axis(Axis),
    Zone(Zone),
    Equipment(Equipment),
    Process(Process),
    Path(Path),
    CalibrationCoefficient(CalibrationCoefficient),
    CalibrationMeasurement(CalibrationMeasurement),
    Group(Group),
    LongName(LongName),
    Comment(Comment),
    Message(Message),
    NoFormat(NoFormat),
    Splice(Splice),
    WellReferencePoint(WellReferencePoint),
    Generic(GenericRecord),
}

impl Record {
    pub fn name(&self) -> &ObName {
        match self {
            Record::FileHeader(r) => &r.name,
            Record::Origin(r) => &r.name,
            Record::Channel(r) => &r.name,
            Record::Frame(r) => &r.name,
            Record::Tool(r) => &r.name,
            Record::Parameter(r) => &r.name,
            Record::Calibration(r) => &r.name,
            Record::Axis(r) => &r.name,
            Record::Zone(r) => &r.name,
            Record::Equipment(r) => &r.name,
            Record::Process(r) => &r.name,
            Record::Path(r) => &r.name,
            Record::CalibrationCoefficient(r) => &r.name,
            Record::CalibrationMeasurement(r) => &r.name,
            Record::Group(r) => &r.name,
            Record::LongName(r) => &r.name,
            Record::Comment(r) => &r.name,
            Record::Message(r) => &r.name,
            Record::NoFormat(r) => &r.name,
            Record::Splice(r) => &r.name,
            Record::WellReferencePoint(r) => &r.name,
            Record::Generic(r) => &r.name,
        }
    }
}

/// Builds a typed [`Record`] for every object in `set`, dispatching on
/// `set.set_type` (`spec.md` §4.6: "unknown set types produce a generic
/// record preserving the full attribute list").
pub fn build_records(set: &Set) -> Vec<Record> {
    set.objects
        .iter()
        .map(|obj| match set.set_type.as_str() {
            "FILE-HEADER" => Record::FileHeader(FileHeader::from_object(obj)),
            "ORIGIN" => Record::Origin(Origin::from_object(obj)),
            "CHANNEL" => Record::Channel(Channel::from_object(obj)),
            "FRAME" => Record::Frame(Frame::from_object(obj)),
            "TOOL" => Record::Tool(Tool::from_object(obj)),
            "PARAMETER" => Record::Parameter(Parameter::from_object(obj)),
            "CALIBRATION" => Record::Calibration(Calibration::from_object(obj)),
            "AXIS" => Record::Axis(Axis::from_object(obj)),
            "ZONE" => Record::Zone(Zone::from_object(obj)),
            "EQUIPMENT" => Record::Equipment(Equipment::from_object(obj)),
            "PROCESS" => Record::Process(Process::from_object(obj)),
            "PATH" => Record::Path(Path::from_object(obj)),
            "CALIBRATION-COEFFICIENT" => Record::CalibrationCoefficient(CalibrationCoefficient::from_object(obj)),
            "CALIBRATION-MEASUREMENT" => Record::CalibrationMeasurement(CalibrationMeasurement::from_object(obj)),
            "GROUP" => Record::Group(Group::from_object(obj)),
            "LONG-NAME" => Record::LongName(LongName::from_object(obj)),
            "COMMENT" => Record::Comment(Comment::from_object(obj)),
            "MESSAGE" => Record::Message(Message::from_object(obj)),
            "NO-FORMAT" => Record::NoFormat(NoFormat::from_object(obj)),
            "SPLICE" => Record::Splice(Splice::from_object(obj)),
            "WELL-REFERENCE-POINT" => Record::WellReferencePoint(WellReferencePoint::from_object(obj)),
            _ => Record::Generic(GenericRecord {
                name: obj.name.clone(),
                attributes: obj.attributes.iter().flatten().map(|a| (a.label.clone(), a.clone())).collect(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eflr;

    #[test]
    fn format_char_matches_spec_table() {
        assert_eq!(format_char(2), 'f'); // FSINGL
        assert_eq!(format_char(7), 'F'); // FDOUBL
        assert_eq!(format_char(14), 'l'); // SLONG
    }

    #[test]
    fn channel_set_builds_typed_records() {
        let mut sink = |_| {};
        let set = eflr::parse(&eflr::tests_support::stdrecord(), &mut sink).unwrap();
        let records = build_records(&set);
        assert_eq!(records.len(), 3);
        match &records[1] {
            Record::Channel(channel) => assert_eq!(channel.units.as_deref(), Some("psi")),
            other => panic!("expected Channel, got {other:?}"),
        }
    }

    #[test]
    fn generic_record_reference_resolves_by_name_regardless_of_set_type() {
        let mut table = Table::new();
        let part = GenericRecord { name: ObName { origin: 0, copynumber: 0, id: "PART-1".to_string() }, attributes: Vec::new() };
        table.insert(Fingerprint::new("EQUIPMENT", "PART-1", 0, 0), Record::Generic(part.clone())).unwrap();

        let reference: Reference<GenericRecord> = Reference::Unresolved(ObName { origin: 0, copynumber: 0, id: "PART-1".to_string() });
        match reference.resolve(&table).unwrap() {
            Reference::Resolved(resolved) => assert_eq!(resolved, part),
            other => panic!("expected Resolved, got {other:?}"),
        }
    }

    #[test]
    fn generic_record_reference_is_dangling_when_name_is_absent() {
        let table = Table::new();
        let reference: Reference<GenericRecord> = Reference::Unresolved(ObName { origin: 0, copynumber: 0, id: "MISSING".to_string() });
        assert!(matches!(reference.resolve(&table), Err(Error::DanglingReference(_))));
    }
}

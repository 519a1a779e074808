//! End-to-end scenarios (`spec.md` §8), exercised through the crate's public
//! API rather than its private module internals.

use dlis_core::eflr;
use dlis_core::object::{self, Channel, Frame, Reference};
use dlis_core::reprc::ObName;
use dlis_core::table::{fingerprint, Table};
use dlis_core::warning::Warning;
use dlis_core::{storage_label, Error};

fn label_bytes(sequence: &str, version: &str, layout: &str, maxlen: &str, id: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(sequence.as_bytes());
    out.extend_from_slice(version.as_bytes());
    out.extend_from_slice(layout.as_bytes());
    out.extend_from_slice(maxlen.as_bytes());
    out.extend_from_slice(id.as_bytes());
    out
}

fn padded_id(name: &str) -> String {
    let mut id = name.to_string();
    id.push_str(&" ".repeat(60 - name.len()));
    id
}

/// The RP66 Annex CHANNEL set fixture (`spec.md` §8 scenario 5), transcribed
/// from `dlisio`'s `test_core.py::stdrecord` with segment headers/trailers
/// omitted, matching `eflr.rs`'s own unit-test copy.
fn stdrecord() -> Vec<u8> {
    vec![
        // channel set
        0xF8, 0x07, b'C', b'H', b'A', b'N', b'N', b'E', b'L', 0x01, b'0',
        // template
        0x34, 0x09, b'L', b'O', b'N', b'G', b'-', b'N', b'A', b'M', b'E', 0x17,
        0x35, 0x0D, b'E', b'L', b'E', b'M', b'E', b'N', b'T', b'-', b'L', b'I', b'M', b'I', b'T', 0x12, 0x01,
        0x35, 0x13, b'R', b'E', b'P', b'R', b'E', b'S', b'E', b'N', b'T', b'A', b'T', b'I', b'O', b'N', b'-',
        b'C', b'O', b'D', b'E', 0x0F, 0x02,
        0x30, 0x05, b'U', b'N', b'I', b'T', b'S',
        0x35, 0x09, b'D', b'I', b'M', b'E', b'N', b'S', b'I', b'O', b'N', 0x12, 0x01,
        // object #1: TIME
        0x70, 0x00, 0x00, 0x04, b'T', b'I', b'M', b'E',
        0x21, 0x00, 0x00, 0x01, 0x31,
        0x20,
        0x20,
        0x21, 0x01, 0x73,
        // object #2: PRESSURE
        0x70, 0x01, 0x00, 0x08, b'P', b'R', b'E', b'S', b'S', b'U', b'R', b'E',
        0x21, 0x00, 0x00, 0x01, 0x32,
        0x20,
        0x21, 0x07,
        0x21, 0x03, b'p', b's', b'i',
        // object #3: PAD-ARRAY
        0x70, 0x00, 0x01, 0x09, b'P', b'A', b'D', b'-', b'A', b'R', b'R', b'A', b'Y',
        0x21, 0x00, 0x00, 0x01, 0x33,
        0x29, 0x02, 0x08, 0x14,
        0x21, 0x0D,
        0x00,
        0x29, 0x02, 0x08, 0x0A,
    ]
}

/// Scenario 1: SUL parse.
#[test]
fn scenario_sul_parse() {
    let id = padded_id("Default Storage Set");
    let bytes = label_bytes("   1", "V1.00", "RECORD", " 8192", &id);
    let mut sink = |_: Warning| {};
    let label = storage_label(&bytes, &mut sink).unwrap();
    assert_eq!(label.sequence, 1);
    assert_eq!(label.version, "1.0");
    assert_eq!(label.layout, "record");
    assert_eq!(label.maxlen, 8192);
    assert_eq!(label.id, id);
}

/// Scenario 2: SUL too short.
#[test]
fn scenario_sul_too_short() {
    let mut sink = |_: Warning| {};
    let err = storage_label(b"too short", &mut sink).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { expected: 80, .. }));
}

/// Scenario 3: SUL wrong version.
#[test]
fn scenario_sul_wrong_version() {
    let id = padded_id("Default Storage Set");
    let bytes = label_bytes("   1", "V2.00", "RECORD", " 8192", &id);
    let mut sink = |_: Warning| {};
    let err = storage_label(&bytes, &mut sink).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(_)));
}

/// Scenario 4: SUL inconsistent layout.
#[test]
fn scenario_sul_inconsistent_layout() {
    let id = padded_id("Default Storage Set");
    let bytes = label_bytes("  2 ", "V1.00", "TRASH1", "ZZZZZ", &id);
    let mut warned = false;
    let mut sink = |_: Warning| warned = true;
    let label = storage_label(&bytes, &mut sink).unwrap();
    assert!(warned);
    assert_eq!(label.layout, "unknown");
}

/// Scenario 5: CHANNEL set reassembly, against the RP66 Annex fixture.
#[test]
fn scenario_channel_set_reassembly() {
    let mut sink = |_: Warning| {};
    let set = eflr::parse(&stdrecord(), &mut sink).unwrap();
    assert_eq!(set.set_type, "CHANNEL");

    let names: Vec<ObName> = set.objects.iter().map(|o| o.name.clone()).collect();
    assert_eq!(
        names,
        vec![
            ObName { origin: 0, copynumber: 0, id: "TIME".into() },
            ObName { origin: 1, copynumber: 0, id: "PRESSURE".into() },
            ObName { origin: 0, copynumber: 1, id: "PAD-ARRAY".into() },
        ]
    );

    let pressure = set.objects[1].attribute("UNITS").unwrap();
    assert_eq!(pressure.values, vec![dlis_core::reprc::Value::Ident("psi".to_string())]);

    let pad_array = &set.objects[2];
    let dimension = pad_array.attribute("DIMENSION").unwrap();
    let element_limit = pad_array.attribute("ELEMENT-LIMIT").unwrap();
    let as_ints = |vals: &[dlis_core::reprc::Value]| -> Vec<i64> {
        vals.iter()
            .map(|v| match v {
                dlis_core::reprc::Value::UVari(n) => *n as i64,
                other => panic!("expected UVARI, got {other:?}"),
            })
            .collect()
    };
    assert_eq!(as_ints(&dimension.values), vec![8, 10]);
    assert_eq!(as_ints(&element_limit.values), vec![8, 20]);

    // Invariant 3: every object's attribute list matches the template length.
    for obj in &set.objects {
        assert_eq!(obj.attributes.len(), set.template.len());
    }

    // Invariant 4: fingerprint uniqueness across the resulting table.
    let mut table = Table::new();
    for (obj, record) in set.objects.iter().zip(object::build_records(&set)) {
        table.insert(fingerprint(set.set_type.as_str(), obj.name.id.as_str(), obj.name.origin, obj.name.copynumber), record).unwrap();
    }
    assert_eq!(table.len(), 3);
}

fn resolved_channel(id: &str, reprc: u8, dimension: Vec<i64>) -> Reference<Channel> {
    Reference::Resolved(Channel {
        name: ObName { origin: 0, copynumber: 0, id: id.to_string() },
        long_name: None,
        reprc,
        units: None,
        properties: Vec::new(),
        dimension,
        element_limit: Vec::new(),
        axis: Vec::new(),
        source: None,
    })
}

/// Scenario 6 (first half): four scalar FSINGL channels yield `"ffff"`.
#[test]
fn scenario_frame_format_string_four_channels() {
    const FSINGL: u8 = 2;
    let frame = Frame {
        name: ObName { origin: 0, copynumber: 0, id: "FRAME".into() },
        description: None,
        channels: vec![
            resolved_channel("TIME", FSINGL, vec![]),
            resolved_channel("TDEP", FSINGL, vec![]),
            resolved_channel("TENS_SL", FSINGL, vec![]),
            resolved_channel("DEPT_SL", FSINGL, vec![]),
        ],
        index_type: None,
        direction: None,
        spacing: None,
        encrypted: false,
        index_min: None,
        index_max: None,
    };
    assert_eq!(frame.fmtstr(), "ffff");
}

/// Scenario 6 (second half): a 43-channel frame with one SLONG channel among
/// FSINGLs yields a format string of length 43 with a single `'l'`.
#[test]
fn scenario_frame_format_string_43_channels() {
    const FSINGL: u8 = 2;
    const SLONG: u8 = 14;
    let mut channels: Vec<Reference<Channel>> = (0..43).map(|i| resolved_channel(&format!("CH{i}"), FSINGL, vec![])).collect();
    channels[20] = resolved_channel("DEPTH-INDEX", SLONG, vec![]);

    let frame = Frame {
        name: ObName { origin: 0, copynumber: 0, id: "FRAME".into() },
        description: None,
        channels,
        index_type: None,
        direction: None,
        spacing: None,
        encrypted: false,
        index_min: None,
        index_max: None,
    };
    let fmtstr = frame.fmtstr();
    assert_eq!(fmtstr.len(), 43);
    assert_eq!(fmtstr.matches('l').count(), 1);
    assert_eq!(fmtstr.matches('f').count(), 42);
}

/// Invariant 5: an array-valued channel's scalar count (and thus its
/// contribution to a frame's format string) respects its dimension.
#[test]
fn scenario_array_channel_contributes_product_of_dimensions() {
    const FDOUBL: u8 = 7;
    let frame = Frame {
        name: ObName { origin: 0, copynumber: 0, id: "FRAME".into() },
        description: None,
        channels: vec![resolved_channel("IMAGE", FDOUBL, vec![4, 3])],
        index_type: None,
        direction: None,
        spacing: None,
        encrypted: false,
        index_min: None,
        index_max: None,
    };
    assert_eq!(frame.fmtstr(), "FFFFFFFFFFFF");
}

//! C7: object table (`spec.md` §4.7).
//!
//! Grounded on the teacher's `CodedIndexTag` composite addressing scheme
//! (`metadata/index.rs`): a tag made of a table kind plus a row position.
//! Generalized from a 2-tuple `(table, row)` to DLIS's 4-tuple fingerprint,
//! and from an implicit positional index to an explicit `HashMap` since
//! DLIS objects are addressed by name, not row ordinal.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::object::Record;
use crate::reprc::ObName;

/// Canonical key `(set-type, id, origin, copynumber)` (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub set_type: String,
    pub id: String,
    pub origin: u32,
    pub copynumber: u8,
}

impl Fingerprint {
    pub fn new(set_type: impl Into<String>, id: impl Into<String>, origin: u32, copynumber: u8) -> Self {
        Fingerprint { set_type: set_type.into(), id: id.into(), origin, copynumber }
    }

    pub fn from_obname(set_type: impl Into<String>, name: &ObName) -> Self {
        Fingerprint::new(set_type, name.id.clone(), name.origin, name.copynumber)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, origin={}, copy={})", self.set_type, self.id, self.origin, self.copynumber)
    }
}

/// Free function mirroring `dlisio.core.fingerprint`, so a caller can
/// compute a lookup key without holding an object in hand (`spec.md` §6).
pub fn fingerprint(set_type: impl Into<String>, id: impl Into<String>, origin: u32, copynumber: u8) -> Fingerprint {
    Fingerprint::new(set_type, id, origin, copynumber)
}

/// Maps fingerprints to assembled records, with stable per-kind iteration
/// (`spec.md` §4.7, §5 ordering rule).
#[derive(Debug, Default)]
pub struct Table {
    records: HashMap<Fingerprint, Record>,
}

impl Table {
    pub fn new() -> Self {
        Table { records: HashMap::new() }
    }

    /// Inserts a record, tolerating an exact duplicate of an existing entry
    /// (`spec.md` §3 invariant 4; §4.7 "tolerate exact duplicates").
    pub fn insert(&mut self, key: Fingerprint, record: Record) -> Result<()> {
        match self.records.get(&key) {
            Some(existing) if *existing == record => Ok(()),
            Some(_) => Err(Error::DuplicateFingerprint(key)),
            None => {
                self.records.insert(key, record);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<&Record> {
        self.records.get(key)
    }

    /// Looks up a record by id/origin/copynumber alone, ignoring set type.
    /// Used to resolve a [`crate::object::Reference`] whose target set type
    /// isn't known at the reference site (`SPEC_FULL.md` §3 "arbitrary-typed
    /// sub-objects", e.g. `Tool.parts: Vec<Reference<GenericRecord>>`).
    pub fn get_by_name(&self, origin: u32, copynumber: u8, id: &str) -> Option<(&Fingerprint, &Record)> {
        self.records.iter().find(|(key, _)| key.origin == origin && key.copynumber == copynumber && key.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &Record)> {
        self.records.iter()
    }

    /// Returns every record of `set_type`, sorted by fingerprint so that
    /// iteration order is stable across runs (`spec.md` §5).
    pub fn iter_kind<'a>(&'a self, set_type: &'a str) -> impl Iterator<Item = (&'a Fingerprint, &'a Record)> {
        let mut matches: Vec<_> = self.records.iter().filter(move |(key, _)| key.set_type == set_type).collect();
        matches.sort_by(|(a, _), (b, _)| (&a.set_type, &a.id, a.origin, a.copynumber).cmp(&(&b.set_type, &b.id, b.origin, b.copynumber)));
        matches.into_iter()
    }
}

use crate::{
    error::Error,
    model::{IndexModel, KeyExpression},
    tuple::{ScalarKind, Tuple, Value},
};
use std::collections::BTreeMap;

///
/// FieldModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldModel {
    pub name: String,
    pub kind: ScalarKind,
}

impl FieldModel {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

///
/// RecordTypeModel
///
/// Declared shape of one record type: a primary-key expression, the field
/// descriptors, and the indexes maintained for it.
///

#[derive(Clone, Debug)]
pub struct RecordTypeModel {
    pub name: String,
    pub primary_key: KeyExpression,
    pub fields: Vec<FieldModel>,
    pub indexes: Vec<IndexModel>,
}

impl RecordTypeModel {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        primary_key: KeyExpression,
        fields: Vec<FieldModel>,
        indexes: Vec<IndexModel>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_key,
            fields,
            indexes,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Number of tuple columns in the primary key.
    #[must_use]
    pub fn primary_key_len(&self) -> usize {
        self.primary_key.column_count()
    }

    /// Field names that make up the primary key, in column order.
    #[must_use]
    pub fn primary_key_fields(&self) -> Vec<&str> {
        self.primary_key.field_names()
    }

    /// Extract the primary key of a record of this type.
    pub fn primary_key_of(&self, record: &StoredRecord) -> Result<Tuple, Error> {
        self.primary_key.evaluate_single(record)
    }
}

///
/// StoredRecord
///
/// Runtime record: a type name plus extracted field values. Fields are
/// multi-valued; extraction of an undeclared or absent field yields the
/// empty slice.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredRecord {
    record_type: String,
    fields: BTreeMap<String, Vec<Value>>,
}

impl StoredRecord {
    #[must_use]
    pub fn new(record_type: impl Into<String>, fields: BTreeMap<String, Vec<Value>>) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
        }
    }

    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    #[must_use]
    pub fn field_values(&self, name: &str) -> &[Value] {
        self.fields.get(name).map_or(&[], Vec::as_slice)
    }

    /// First extracted value of a field, if any.
    #[must_use]
    pub fn single(&self, name: &str) -> Option<&Value> {
        self.field_values(name).first()
    }

    #[must_use]
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn set_field(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.fields.insert(name.into(), values);
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.fields
    }
}

///
/// RecordAccess
///
/// Collaborator that owns the wire form of records. The engine hands it
/// raw bytes from the record subspace and receives extracted field values
/// back. `supports_index_reconstruction` advertises whether records can be
/// rebuilt from covering index tuples without a point read; the planner
/// consults it before emitting covering scans.
///

pub trait RecordAccess: Send + Sync {
    fn deserialize(&self, record_type: &str, bytes: &[u8]) -> Result<StoredRecord, Error>;

    fn serialize(&self, record: &StoredRecord) -> Result<Vec<u8>, Error>;

    fn supports_index_reconstruction(&self) -> bool {
        false
    }
}

///
/// CborRecordCodec
///
/// Reference `RecordAccess`: record bytes are a CBOR map of field name to
/// value list. The record type never travels in-band; it is implied by the
/// key the bytes were read from.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct CborRecordCodec;

impl RecordAccess for CborRecordCodec {
    fn deserialize(&self, record_type: &str, bytes: &[u8]) -> Result<StoredRecord, Error> {
        let fields: BTreeMap<String, Vec<Value>> = serde_cbor::from_slice(bytes)
            .map_err(|err| {
                Error::schema_mismatch(format!("record of type {record_type} failed to decode: {err}"))
            })?;
        Ok(StoredRecord::new(record_type, fields))
    }

    fn serialize(&self, record: &StoredRecord) -> Result<Vec<u8>, Error> {
        serde_cbor::to_vec(record.fields())
            .map_err(|err| Error::schema_mismatch(format!("record failed to encode: {err}")))
    }

    fn supports_index_reconstruction(&self) -> bool {
        true
    }
}

///
/// TESTS
///

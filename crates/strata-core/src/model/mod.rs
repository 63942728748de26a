mod index;
mod key_expr;
mod record;

pub use index::{IndexKind, IndexModel};
pub use key_expr::KeyExpression;
pub use record::{CborRecordCodec, FieldModel, RecordAccess, RecordTypeModel, StoredRecord};

use crate::{MAX_INDEX_COLUMNS, error::Error};
use std::collections::BTreeMap;

///
/// RecordMetadata
///
/// Registry of record types and their indexes. Registration validates the
/// declared shape once so planning and execution can trust it.
///

#[derive(Clone, Debug, Default)]
pub struct RecordMetadata {
    types: BTreeMap<String, RecordTypeModel>,
}

impl RecordMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: RecordTypeModel) -> Result<(), Error> {
        validate_record_type(&model)?;
        if self.types.contains_key(&model.name) {
            return Err(Error::invalid_argument(format!(
                "record type {} is already registered",
                model.name
            )));
        }
        for index in &model.indexes {
            if self.index(&index.name).is_ok() {
                return Err(Error::invalid_argument(format!(
                    "index name {} is already registered",
                    index.name
                )));
            }
        }
        self.types.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn record_type(&self, name: &str) -> Result<&RecordTypeModel, Error> {
        self.types
            .get(name)
            .ok_or_else(|| Error::schema_mismatch(format!("unknown record type {name}")))
    }

    /// Look up an index by name along with its owning record type.
    pub fn index(&self, name: &str) -> Result<(&RecordTypeModel, &IndexModel), Error> {
        for model in self.types.values() {
            if let Some(index) = model.indexes.iter().find(|index| index.name == name) {
                return Ok((model, index));
            }
        }
        Err(Error::index_not_found(name))
    }

    #[must_use]
    pub fn record_types(&self) -> impl Iterator<Item = &RecordTypeModel> {
        self.types.values()
    }
}

fn validate_record_type(model: &RecordTypeModel) -> Result<(), Error> {
    for name in model.primary_key_fields() {
        if model.field(name).is_none() {
            return Err(Error::invalid_argument(format!(
                "primary key of {} references undeclared field {name}",
                model.name
            )));
        }
    }

    for index in &model.indexes {
        if index.column_count() == 0 {
            return Err(Error::invalid_argument(format!(
                "index {} has no indexed columns",
                index.name
            )));
        }
        if index.column_count() > MAX_INDEX_COLUMNS {
            return Err(Error::invalid_argument(format!(
                "index {} exceeds {MAX_INDEX_COLUMNS} indexed columns",
                index.name
            )));
        }
        for name in index.indexed_field_names() {
            if model.field(name).is_none() {
                return Err(Error::invalid_argument(format!(
                    "index {} references undeclared field {name}",
                    index.name
                )));
            }
        }
        if index.grouping_len > index.column_count() {
            return Err(Error::invalid_argument(format!(
                "index {} groups over more columns than it declares",
                index.name
            )));
        }
        if matches!(index.kind, IndexKind::Rank) && index.leading_value_field().is_none() {
            return Err(Error::invalid_argument(format!(
                "rank index {} has no ranked value column after its grouping prefix",
                index.name
            )));
        }
        if let Some(covering) = &index.covering {
            for name in covering {
                if model.field(name).is_none() {
                    return Err(Error::invalid_argument(format!(
                        "covering list of {} references undeclared field {name}",
                        index.name
                    )));
                }
            }
        }
    }

    Ok(())
}

///
/// TESTS
///

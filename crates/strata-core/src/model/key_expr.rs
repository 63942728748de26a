use crate::{
    error::Error,
    model::StoredRecord,
    tuple::{Tuple, Value},
};

///
/// KeyExpression
///
/// Recursive description of how a key tuple is derived from a record.
/// Evaluation yields one tuple per combination of multi-valued field
/// extractions; a record that extracts zero values for a `Field` yields
/// zero tuples.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyExpression {
    Field(String),
    Concatenate(Vec<KeyExpression>),
    Literal(Value),
}

impl KeyExpression {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub const fn concat(children: Vec<Self>) -> Self {
        Self::Concatenate(children)
    }

    #[must_use]
    pub const fn literal(value: Value) -> Self {
        Self::Literal(value)
    }

    /// Number of tuple columns this expression produces.
    #[must_use]
    pub fn column_count(&self) -> usize {
        match self {
            Self::Field(_) | Self::Literal(_) => 1,
            Self::Concatenate(children) => children.iter().map(Self::column_count).sum(),
        }
    }

    /// Field names referenced, in column order. Literal columns contribute
    /// nothing.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Self::Field(name) => vec![name.as_str()],
            Self::Literal(_) => Vec::new(),
            Self::Concatenate(children) => {
                children.iter().flat_map(Self::field_names).collect()
            }
        }
    }

    /// Column-aligned field names: one entry per column, `None` for
    /// literal columns. Used to rebuild records from covering index tuples.
    #[must_use]
    pub fn column_fields(&self) -> Vec<Option<&str>> {
        match self {
            Self::Field(name) => vec![Some(name.as_str())],
            Self::Literal(_) => vec![None],
            Self::Concatenate(children) => {
                children.iter().flat_map(Self::column_fields).collect()
            }
        }
    }

    /// Evaluate against a record, fanning out over multi-valued fields.
    pub fn evaluate(&self, record: &StoredRecord) -> Result<Vec<Tuple>, Error> {
        match self {
            Self::Literal(value) => Ok(vec![Tuple::single(value.clone())]),
            Self::Field(name) => Ok(record
                .field_values(name)
                .iter()
                .map(|value| Tuple::single(value.clone()))
                .collect()),
            Self::Concatenate(children) => {
                let mut combinations = vec![Tuple::empty()];
                for child in children {
                    let child_tuples = child.evaluate(record)?;
                    let mut next = Vec::with_capacity(combinations.len() * child_tuples.len());
                    for head in &combinations {
                        for tail in &child_tuples {
                            next.push(head.clone().concat(tail));
                        }
                    }
                    combinations = next;
                }
                Ok(combinations)
            }
        }
    }

    /// Evaluate expecting exactly one tuple. Primary keys must not fan out.
    pub fn evaluate_single(&self, record: &StoredRecord) -> Result<Tuple, Error> {
        let mut tuples = self.evaluate(record)?;
        match tuples.len() {
            1 => Ok(tuples.remove(0)),
            0 => Err(Error::schema_mismatch(format!(
                "key expression produced no tuple for record type {}",
                record.record_type()
            ))),
            n => Err(Error::schema_mismatch(format!(
                "key expression fanned out into {n} tuples where exactly one was required"
            ))),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> StoredRecord {
        let mut fields = BTreeMap::new();
        fields.insert("city".to_string(), vec![Value::Text("Tokyo".into())]);
        fields.insert(
            "tag".to_string(),
            vec![Value::Text("a".into()), Value::Text("b".into())],
        );
        fields.insert("id".to_string(), vec![Value::Int(1)]);
        StoredRecord::new("User", fields)
    }

    #[test]
    fn concat_fans_out_over_multivalued_fields() {
        let expr = KeyExpression::concat(vec![
            KeyExpression::field("tag"),
            KeyExpression::field("id"),
        ]);
        let tuples = expr.evaluate(&record()).expect("evaluate");
        assert_eq!(
            tuples,
            vec![
                Tuple::new(vec![Value::Text("a".into()), Value::Int(1)]),
                Tuple::new(vec![Value::Text("b".into()), Value::Int(1)]),
            ]
        );
    }

    #[test]
    fn evaluate_single_rejects_fan_out() {
        let err = KeyExpression::field("tag")
            .evaluate_single(&record())
            .expect_err("fan-out");
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatch);
    }

    #[test]
    fn missing_field_yields_no_tuples() {
        let expr = KeyExpression::field("absent");
        assert!(expr.evaluate(&record()).expect("evaluate").is_empty());
    }

    #[test]
    fn column_fields_align_with_columns() {
        let expr = KeyExpression::concat(vec![
            KeyExpression::field("city"),
            KeyExpression::literal(Value::Int(7)),
            KeyExpression::field("id"),
        ]);
        assert_eq!(expr.column_count(), 3);
        assert_eq!(expr.column_fields(), vec![Some("city"), None, Some("id")]);
    }
}

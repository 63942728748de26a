use crate::{
    cursor::BoxedRecordCursor,
    error::Error,
    model::StoredRecord,
    predicate::{CompareOp, eval},
    tuple::Value,
};
use std::collections::BTreeMap;

///
/// GroupBy evaluation.
///
/// Scans the source cursor once, accumulating per-group aggregates in
/// memory, then filters groups through the optional HAVING clause. AVG
/// reports a double; the other aggregates keep the variant of their
/// inputs. Groups come back in key order.
///

///
/// GroupAggregate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupAggregate {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

///
/// HavingClause
///
/// Comparison against one accumulated aggregate, by position in the
/// aggregate list.
///

#[derive(Clone, Debug, PartialEq)]
pub struct HavingClause {
    pub aggregate: usize,
    pub op: CompareOp,
    pub value: Value,
}

///
/// GroupBySpec
///

#[derive(Clone, Debug, PartialEq)]
pub struct GroupBySpec {
    pub field: String,
    pub aggregates: Vec<GroupAggregate>,
    pub having: Option<HavingClause>,
}

///
/// GroupRow
///

#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow {
    pub key: Value,
    pub aggregates: Vec<Value>,
}

enum Accumulator {
    Count(i64),
    Sum(Option<Value>),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    fn for_aggregate(aggregate: &GroupAggregate) -> Self {
        match aggregate {
            GroupAggregate::Count => Self::Count(0),
            GroupAggregate::Sum(_) => Self::Sum(None),
            GroupAggregate::Avg(_) => Self::Avg { sum: 0.0, count: 0 },
            GroupAggregate::Min(_) => Self::Min(None),
            GroupAggregate::Max(_) => Self::Max(None),
        }
    }

    fn ingest(&mut self, aggregate: &GroupAggregate, record: &StoredRecord) -> Result<(), Error> {
        match (self, aggregate) {
            (Self::Count(count), GroupAggregate::Count) => {
                *count += 1;
                Ok(())
            }
            (Self::Sum(state), GroupAggregate::Sum(field)) => {
                if let Some(value) = record.single(field) {
                    *state = Some(match state.take() {
                        None => value.clone(),
                        Some(current) => add_values(&current, value)?,
                    });
                }
                Ok(())
            }
            (Self::Avg { sum, count }, GroupAggregate::Avg(field)) => {
                if let Some(value) = record.single(field) {
                    let Some(value) = value.as_f64() else {
                        return Err(Error::schema_mismatch(format!(
                            "AVG over non-numeric field {field}"
                        )));
                    };
                    *sum += value;
                    *count += 1;
                }
                Ok(())
            }
            (Self::Min(state), GroupAggregate::Min(field)) => {
                if let Some(value) = record.single(field) {
                    let replace = state
                        .as_ref()
                        .is_none_or(|current| value.canonical_cmp(current).is_lt());
                    if replace {
                        *state = Some(value.clone());
                    }
                }
                Ok(())
            }
            (Self::Max(state), GroupAggregate::Max(field)) => {
                if let Some(value) = record.single(field) {
                    let replace = state
                        .as_ref()
                        .is_none_or(|current| value.canonical_cmp(current).is_gt());
                    if replace {
                        *state = Some(value.clone());
                    }
                }
                Ok(())
            }
            _ => Err(Error::internal("accumulator does not match its aggregate")),
        }
    }

    /// Groups with no contributing values finalize to `Null`.
    fn finalize(self) -> Value {
        match self {
            Self::Count(count) => Value::Int(count),
            Self::Sum(state) | Self::Min(state) | Self::Max(state) => {
                state.unwrap_or(Value::Null)
            }
            Self::Avg { sum, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Double(sum / count as f64)
                }
            }
        }
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        _ => Err(Error::schema_mismatch(format!(
            "SUM over mixed or non-numeric values ({} + {})",
            left.type_label(),
            right.type_label()
        ))),
    }
}

/// Evaluate a GroupBy specification over a record stream.
pub async fn evaluate_group_by(
    mut cursor: BoxedRecordCursor,
    spec: &GroupBySpec,
) -> Result<Vec<GroupRow>, Error> {
    if spec.aggregates.is_empty() {
        return Err(Error::invalid_argument(
            "GROUP BY requires at least one aggregate",
        ));
    }
    if let Some(having) = &spec.having
        && having.aggregate >= spec.aggregates.len()
    {
        return Err(Error::invalid_argument(format!(
            "HAVING references aggregate {} of {}",
            having.aggregate,
            spec.aggregates.len()
        )));
    }

    let mut groups: BTreeMap<Value, Vec<Accumulator>> = BTreeMap::new();
    while let Some(fetched) = cursor.next().await? {
        let key = fetched
            .record
            .single(&spec.field)
            .cloned()
            .unwrap_or(Value::Null);
        let accumulators = groups.entry(key).or_insert_with(|| {
            spec.aggregates.iter().map(Accumulator::for_aggregate).collect()
        });
        for (accumulator, aggregate) in accumulators.iter_mut().zip(spec.aggregates.iter()) {
            accumulator.ingest(aggregate, &fetched.record)?;
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, accumulators) in groups {
        let aggregates: Vec<Value> = accumulators
            .into_iter()
            .map(Accumulator::finalize)
            .collect();
        if let Some(having) = &spec.having
            && !eval::compare_scalar(&aggregates[having.aggregate], having.op, &having.value)
        {
            continue;
        }
        out.push(GroupRow { key, aggregates });
    }
    Ok(out)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{FetchedRecord, VecCursor};
    use crate::test_support::{sample_users, user_metadata};

    fn cursor_over(records: Vec<StoredRecord>) -> BoxedRecordCursor {
        let metadata = user_metadata();
        let model = metadata.record_type("User").expect("model");
        let fetched = records
            .into_iter()
            .map(|record| FetchedRecord {
                primary_key: model.primary_key_of(&record).expect("pk"),
                record,
            })
            .collect();
        Box::new(VecCursor::new(fetched))
    }

    #[tokio::test]
    async fn groups_accumulate_count_sum_avg_extrema() {
        let spec = GroupBySpec {
            field: "city".into(),
            aggregates: vec![
                GroupAggregate::Count,
                GroupAggregate::Sum("age".into()),
                GroupAggregate::Avg("age".into()),
                GroupAggregate::Min("age".into()),
                GroupAggregate::Max("age".into()),
            ],
            having: None,
        };

        let rows = evaluate_group_by(cursor_over(sample_users()), &spec)
            .await
            .expect("group by");
        assert_eq!(rows.len(), 2);

        // Keys come back sorted: Osaka before Tokyo.
        assert_eq!(rows[0].key, Value::Text("Osaka".into()));
        assert_eq!(
            rows[0].aggregates,
            vec![
                Value::Int(1),
                Value::Int(40),
                Value::Double(40.0),
                Value::Int(40),
                Value::Int(40),
            ]
        );
        assert_eq!(rows[1].key, Value::Text("Tokyo".into()));
        assert_eq!(
            rows[1].aggregates,
            vec![
                Value::Int(2),
                Value::Int(50),
                Value::Double(25.0),
                Value::Int(20),
                Value::Int(30),
            ]
        );
    }

    #[tokio::test]
    async fn having_filters_groups_on_an_aggregate() {
        let spec = GroupBySpec {
            field: "city".into(),
            aggregates: vec![GroupAggregate::Count],
            having: Some(HavingClause {
                aggregate: 0,
                op: CompareOp::Gte,
                value: Value::Int(2),
            }),
        };

        let rows = evaluate_group_by(cursor_over(sample_users()), &spec)
            .await
            .expect("group by");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, Value::Text("Tokyo".into()));
    }

    #[tokio::test]
    async fn having_out_of_range_is_invalid() {
        let spec = GroupBySpec {
            field: "city".into(),
            aggregates: vec![GroupAggregate::Count],
            having: Some(HavingClause {
                aggregate: 3,
                op: CompareOp::Eq,
                value: Value::Int(1),
            }),
        };
        let err = evaluate_group_by(cursor_over(sample_users()), &spec)
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}

use crate::{
    error::Error,
    model::{IndexKind, IndexModel, RecordTypeModel},
    predicate::{CompareOp, Predicate},
    tuple::{Tuple, Value},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

///
/// Ranked retrieval.
///
/// Rank indexes live in an external sorted-set structure keyed by
/// `(grouping, rankValue, primaryKey)`; this module consumes it as an
/// opaque collaborator that answers by ordinal position. Top-N scans
/// positions descending, bottom-N ascending; each returned primary key is
/// point-read by the caller.
///

///
/// RankSet
///

#[async_trait]
pub trait RankSet: Send + Sync {
    /// Primary keys of one group's entries at rank positions
    /// `[start, end)`, ascending by rank value or descending when asked.
    async fn scan_by_rank(
        &self,
        index: &str,
        group: &Tuple,
        start: u64,
        end: u64,
        descending: bool,
    ) -> Result<Vec<Tuple>, Error>;
}

///
/// MemoryRankSet
///
/// Reference sorted-set backing: per index, per packed grouping tuple, an
/// ordered set of `(rankValue, primaryKey)`.
///

#[derive(Default)]
pub struct MemoryRankSet {
    sets: Mutex<BTreeMap<String, BTreeMap<Vec<u8>, BTreeSet<(Value, Tuple)>>>>,
}

impl MemoryRankSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, index: &str, group: Tuple, rank_value: Value, primary_key: Tuple) {
        self.sets
            .lock()
            .await
            .entry(index.to_string())
            .or_default()
            .entry(group.pack())
            .or_default()
            .insert((rank_value, primary_key));
    }

    pub async fn remove(&self, index: &str, group: &Tuple, rank_value: &Value, primary_key: &Tuple) {
        if let Some(groups) = self.sets.lock().await.get_mut(index)
            && let Some(set) = groups.get_mut(&group.pack())
        {
            set.remove(&(rank_value.clone(), primary_key.clone()));
        }
    }
}

#[async_trait]
impl RankSet for MemoryRankSet {
    async fn scan_by_rank(
        &self,
        index: &str,
        group: &Tuple,
        start: u64,
        end: u64,
        descending: bool,
    ) -> Result<Vec<Tuple>, Error> {
        let sets = self.sets.lock().await;
        let Some(set) = sets.get(index).and_then(|groups| groups.get(&group.pack())) else {
            return Ok(Vec::new());
        };

        let take = (end - start) as usize;
        let skip = start as usize;
        let out: Vec<Tuple> = if descending {
            set.iter()
                .rev()
                .skip(skip)
                .take(take)
                .map(|(_, primary_key)| primary_key.clone())
                .collect()
        } else {
            set.iter()
                .skip(skip)
                .take(take)
                .map(|(_, primary_key)| primary_key.clone())
                .collect()
        };
        Ok(out)
    }
}

///
/// Rank index resolution.
///

///
/// ResolvedRank
///

#[derive(Clone, Debug)]
pub struct ResolvedRank<'a> {
    pub index: &'a IndexModel,
    /// Grouping values extracted from the query's equality filter.
    pub group: Tuple,
}

/// Resolve the rank index for a ranked query: by explicit name, or by the
/// single rank index whose leading non-grouping column is the sort field.
///
/// A filter is only admissible against a composite rank index whose
/// grouping prefix it pins with equalities; a simple rank index with any
/// filter is rejected outright.
pub fn resolve_rank_index<'a>(
    model: &'a RecordTypeModel,
    sort_field: &str,
    explicit: Option<&str>,
    filter: Option<&Predicate>,
) -> Result<ResolvedRank<'a>, Error> {
    let candidates: Vec<&IndexModel> = model
        .indexes
        .iter()
        .filter(|index| {
            index.kind == IndexKind::Rank && index.leading_value_field() == Some(sort_field)
        })
        .collect();

    let index = match explicit {
        Some(name) => *candidates
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| Error::index_not_found(name))?,
        None => match filter {
            None => *candidates
                .iter()
                .find(|index| index.grouping_len == 0)
                .ok_or_else(|| {
                    Error::index_not_found(format!("<rank index on {sort_field}>"))
                })?,
            Some(_) => *candidates
                .iter()
                .find(|index| index.grouping_len > 0)
                .or_else(|| candidates.first())
                .ok_or_else(|| {
                    Error::index_not_found(format!("<rank index on {sort_field}>"))
                })?,
        },
    };

    let group = match filter {
        None => {
            if index.grouping_len > 0 {
                return Err(Error::invalid_argument(format!(
                    "rank index {} groups by {:?}; add equality filters for the grouping prefix",
                    index.name,
                    index.grouping_field_names()
                )));
            }
            Tuple::empty()
        }
        Some(filter) => extract_grouping(index, filter)?,
    };

    Ok(ResolvedRank { index, group })
}

/// Match the filter's equality leaves against the index grouping prefix.
fn extract_grouping(index: &IndexModel, filter: &Predicate) -> Result<Tuple, Error> {
    if index.grouping_len == 0 {
        return Err(Error::invalid_argument(format!(
            "rank index {} is ungrouped and cannot serve a filtered ranked query; \
             define a rank index grouped by the filtered fields",
            index.name
        )));
    }

    let mut equalities: BTreeMap<&str, &Value> = BTreeMap::new();
    let conjuncts: Vec<&Predicate> = match filter {
        Predicate::And(children) => children.iter().collect(),
        other => vec![other],
    };
    for conjunct in &conjuncts {
        let Predicate::Compare(cmp) = conjunct else {
            return Err(Error::invalid_argument(
                "ranked queries accept only equality filters over the rank grouping prefix",
            ));
        };
        if cmp.op != CompareOp::Eq || equalities.insert(&cmp.field, &cmp.value).is_some() {
            return Err(Error::invalid_argument(
                "ranked queries accept only one equality per grouping field",
            ));
        }
    }

    let grouping_fields = index.grouping_field_names();
    if equalities.len() != grouping_fields.len() {
        return Err(Error::invalid_argument(format!(
            "rank index {} requires equality filters for exactly {:?}",
            index.name, grouping_fields
        )));
    }

    let mut group = Tuple::empty();
    for field in grouping_fields {
        let Some(value) = equalities.get(field) else {
            return Err(Error::invalid_argument(format!(
                "rank index {} requires an equality filter on {field}",
                index.name
            )));
        };
        group.push((*value).clone());
    }
    Ok(group)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::user_model;

    #[tokio::test]
    async fn memory_rank_set_orders_by_value_then_key() {
        let set = MemoryRankSet::new();
        let group = Tuple::empty();
        set.insert("r", group.clone(), Value::Int(40), Tuple::single(Value::Int(3))).await;
        set.insert("r", group.clone(), Value::Int(20), Tuple::single(Value::Int(1))).await;
        set.insert("r", group.clone(), Value::Int(30), Tuple::single(Value::Int(2))).await;

        let bottom = set.scan_by_rank("r", &group, 0, 2, false).await.expect("scan");
        assert_eq!(
            bottom,
            vec![Tuple::single(Value::Int(1)), Tuple::single(Value::Int(2))]
        );

        let top = set.scan_by_rank("r", &group, 0, 2, true).await.expect("scan");
        assert_eq!(
            top,
            vec![Tuple::single(Value::Int(3)), Tuple::single(Value::Int(2))]
        );
    }

    #[test]
    fn simple_rank_index_rejects_filters() {
        let model = user_model();
        let err = resolve_rank_index(
            &model,
            "age",
            Some("rank_by_age"),
            Some(&Predicate::eq("city", "Tokyo")),
        )
        .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("grouped"));
    }

    #[test]
    fn composite_rank_index_extracts_grouping_values() {
        let model = user_model();
        let resolved = resolve_rank_index(
            &model,
            "age",
            None,
            Some(&Predicate::eq("city", "Tokyo")),
        )
        .expect("resolve");
        assert_eq!(resolved.index.name, "rank_age_by_city");
        assert_eq!(resolved.group, Tuple::single(Value::Text("Tokyo".into())));
    }

    #[test]
    fn unfiltered_rank_resolves_the_simple_index() {
        let model = user_model();
        let resolved = resolve_rank_index(&model, "age", None, None).expect("resolve");
        assert_eq!(resolved.index.name, "rank_by_age");
        assert!(resolved.group.is_empty());
    }

    #[test]
    fn unknown_sort_field_has_no_rank_index() {
        let model = user_model();
        let err = resolve_rank_index(&model, "email", None, None).expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::IndexNotFound);
    }
}

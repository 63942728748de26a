use crate::predicate::Predicate;

///
/// Query builder.
///
/// Purely declarative accumulation of filter, order, limit, projection,
/// and optional ranked-retrieval intent. No schema access or planning
/// happens here; the produced `QuerySpec` is the handoff point into the
/// planner/executor pipeline, where field names and shapes are validated.
///

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

///
/// RankSpec
///
/// Ranked top-N/bottom-N retrieval by a sort field, optionally pinned to
/// a named rank index.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankSpec {
    pub n: usize,
    pub field: String,
    pub descending: bool,
    pub index: Option<String>,
}

///
/// QuerySpec
///
/// Immutable query intent produced by the builder.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    pub record_type: String,
    pub predicate: Option<Predicate>,
    pub order: Vec<(String, OrderDirection)>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
    pub rank: Option<RankSpec>,
}

///
/// Query
///

#[derive(Clone, Debug)]
pub struct Query {
    record_type: String,
    predicates: Vec<Predicate>,
    order: Vec<(String, OrderDirection)>,
    limit: Option<usize>,
    projection: Option<Vec<String>>,
    rank: Option<RankSpec>,
}

impl Query {
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            projection: None,
            rank: None,
        }
    }

    /// Add a predicate; multiple calls AND together.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a sort key.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    /// Set or replace the result limit.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Restrict the answered fields, enabling covering plans.
    #[must_use]
    pub fn select(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    /// The `n` records with the greatest values of `field`.
    #[must_use]
    pub fn top_n(mut self, n: usize, field: impl Into<String>) -> Self {
        self.rank = Some(RankSpec {
            n,
            field: field.into(),
            descending: true,
            index: None,
        });
        self
    }

    /// The `n` records with the smallest values of `field`.
    #[must_use]
    pub fn bottom_n(mut self, n: usize, field: impl Into<String>) -> Self {
        self.rank = Some(RankSpec {
            n,
            field: field.into(),
            descending: false,
            index: None,
        });
        self
    }

    /// Pin ranked retrieval to a named rank index.
    #[must_use]
    pub fn via_rank_index(mut self, name: impl Into<String>) -> Self {
        if let Some(rank) = &mut self.rank {
            rank.index = Some(name.into());
        }
        self
    }

    /// Finalize into an immutable specification.
    #[must_use]
    pub fn build(self) -> QuerySpec {
        let mut predicates = self.predicates;
        let predicate = match predicates.len() {
            0 => None,
            1 => Some(predicates.remove(0)),
            _ => Some(Predicate::And(predicates)),
        };
        QuerySpec {
            record_type: self.record_type,
            predicate,
            order: self.order,
            limit: self.limit,
            projection: self.projection,
            rank: self.rank,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_filters_and_together() {
        let spec = Query::new("User")
            .filter(Predicate::eq("city", "Tokyo"))
            .filter(Predicate::gt("age", 25i64))
            .build();
        assert_eq!(
            spec.predicate,
            Some(Predicate::eq("city", "Tokyo") & Predicate::gt("age", 25i64))
        );
    }

    #[test]
    fn single_filter_stays_a_leaf() {
        let spec = Query::new("User").filter(Predicate::eq("city", "Tokyo")).build();
        assert_eq!(spec.predicate, Some(Predicate::eq("city", "Tokyo")));
    }

    #[test]
    fn rank_intent_carries_direction_and_index() {
        let spec = Query::new("User")
            .top_n(2, "age")
            .via_rank_index("rank_by_age")
            .build();
        let rank = spec.rank.expect("rank");
        assert!(rank.descending);
        assert_eq!(rank.n, 2);
        assert_eq!(rank.index.as_deref(), Some("rank_by_age"));
    }
}

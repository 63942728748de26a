use crate::{
    predicate::Predicate,
    query::{OrderDirection, Query, QuerySpec},
};

///
/// QueryDef
///
/// Declarative query form: fill in the blocks, lower onto the builder.
/// Useful where queries arrive as data (configuration, request payloads)
/// rather than as call chains.
///

#[derive(Clone, Debug, Default)]
pub struct QueryDef {
    pub where_: Option<Predicate>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
}

impl QueryDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower onto the fluent builder for a record type.
    #[must_use]
    pub fn into_query(self, record_type: impl Into<String>) -> Query {
        let mut query = Query::new(record_type);
        if let Some(predicate) = self.where_ {
            query = query.filter(predicate);
        }
        for (field, direction) in self.order_by {
            query = query.order_by(field, direction);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(projection) = self.projection {
            query = query.select(projection);
        }
        query
    }

    #[must_use]
    pub fn into_spec(self, record_type: impl Into<String>) -> QuerySpec {
        self.into_query(record_type).build()
    }
}

///
/// TESTS
///

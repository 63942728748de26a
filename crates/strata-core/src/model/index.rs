use crate::model::KeyExpression;

///
/// IndexKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexKind {
    /// Entries store `indexedFields || primaryKey` with an empty value.
    Value,
    /// Grouping tuple maps to a little-endian i64 count.
    Count,
    /// Grouping tuple maps to a little-endian i64 sum.
    Sum,
    /// Grouping tuple maps to a little-endian i64 minimum.
    Min,
    /// Grouping tuple maps to a little-endian i64 maximum.
    Max,
    /// Sorted-set structure keyed by `(grouping, rankValue, primaryKey)`.
    Rank,
}

impl IndexKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Rank => "rank",
        }
    }

    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Count | Self::Sum | Self::Min | Self::Max)
    }
}

///
/// IndexModel
///
/// Declared index. `root` describes the indexed columns only; for value
/// indexes the write path appends the primary key, for aggregate kinds the
/// leading `grouping_len` columns group and the tail is the aggregated
/// value. `covering` lists record fields answerable from the entry alone.
///

#[derive(Clone, Debug)]
pub struct IndexModel {
    pub name: String,
    pub kind: IndexKind,
    pub root: KeyExpression,
    pub grouping_len: usize,
    pub covering: Option<Vec<String>>,
    pub unique: bool,
}

impl IndexModel {
    #[must_use]
    pub fn value(name: impl Into<String>, root: KeyExpression) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Value,
            root,
            grouping_len: 0,
            covering: None,
            unique: false,
        }
    }

    /// Count indexes group over every declared column; the other aggregate
    /// kinds treat the trailing column as the aggregated value.
    #[must_use]
    pub fn aggregate(name: impl Into<String>, kind: IndexKind, root: KeyExpression) -> Self {
        let columns = root.column_count();
        let grouping_len = match kind {
            IndexKind::Count => columns,
            _ => columns.saturating_sub(1),
        };
        Self {
            name: name.into(),
            kind,
            root,
            grouping_len,
            covering: None,
            unique: false,
        }
    }

    #[must_use]
    pub fn rank(name: impl Into<String>, root: KeyExpression, grouping_len: usize) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Rank,
            root,
            grouping_len,
            covering: None,
            unique: false,
        }
    }

    #[must_use]
    pub fn with_covering(mut self, fields: Vec<String>) -> Self {
        self.covering = Some(fields);
        self
    }

    #[must_use]
    pub const fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Field names in column order over the indexed columns.
    #[must_use]
    pub fn indexed_field_names(&self) -> Vec<&str> {
        self.root.field_names()
    }

    #[must_use]
    pub fn first_indexed_field(&self) -> Option<&str> {
        self.indexed_field_names().first().copied()
    }

    /// Number of indexed columns (excludes the appended primary key).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.root.column_count()
    }

    /// Field names of the grouping prefix (rank/aggregate kinds).
    #[must_use]
    pub fn grouping_field_names(&self) -> Vec<&str> {
        let names = self.indexed_field_names();
        names[..self.grouping_len.min(names.len())].to_vec()
    }

    /// Leading field after the grouping prefix: the ranked value of a rank
    /// index, the aggregated value of a sum index.
    #[must_use]
    pub fn leading_value_field(&self) -> Option<&str> {
        self.indexed_field_names().get(self.grouping_len).copied()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_prefix_splits_at_grouping_len() {
        let index = IndexModel::rank(
            "rank_age_by_city",
            KeyExpression::concat(vec![
                KeyExpression::field("city"),
                KeyExpression::field("age"),
            ]),
            1,
        );
        assert_eq!(index.grouping_field_names(), vec!["city"]);
        assert_eq!(index.leading_value_field(), Some("age"));
    }

    #[test]
    fn aggregate_indexes_group_over_all_columns() {
        let index = IndexModel::aggregate(
            "count_by_city",
            IndexKind::Count,
            KeyExpression::field("city"),
        );
        assert_eq!(index.grouping_len, 1);
        assert!(index.kind.is_aggregate());
    }
}

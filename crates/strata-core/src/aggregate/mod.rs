mod group_by;
mod rank;

pub use group_by::{GroupAggregate, GroupBySpec, GroupRow, HavingClause, evaluate_group_by};
pub use rank::{MemoryRankSet, RankSet, resolve_rank_index};

use crate::{
    error::Error,
    kv::{IsolationLevel, KvRead},
    model::{IndexKind, IndexModel},
    store::StoreLayout,
    tuple::{Tuple, Value},
};

///
/// Aggregate evaluation.
///
/// COUNT/SUM/MIN/MAX indexes maintain one little-endian i64 cell per
/// grouping tuple; evaluation is a single point read taken verbatim. An
/// absent cell reads as zero: the group simply has no rows yet.
///

///
/// AggregateFunction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    #[must_use]
    pub const fn expected_kind(&self) -> IndexKind {
        match self {
            Self::Count => IndexKind::Count,
            Self::Sum => IndexKind::Sum,
            Self::Min => IndexKind::Min,
            Self::Max => IndexKind::Max,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Read one aggregate cell for a grouping tuple.
pub async fn read_aggregate_cell(
    kv: &dyn KvRead,
    isolation: IsolationLevel,
    layout: &StoreLayout,
    function: AggregateFunction,
    index: &IndexModel,
    grouping: &[Value],
) -> Result<i64, Error> {
    if index.kind != function.expected_kind() {
        return Err(Error::invalid_argument(format!(
            "index {} is a {} index; {} was requested",
            index.name,
            index.kind.label(),
            function.label()
        )));
    }
    if grouping.len() != index.grouping_len {
        return Err(Error::invalid_argument(format!(
            "index {} groups over {} columns; {} grouping values were supplied",
            index.name,
            index.grouping_len,
            grouping.len()
        )));
    }

    let key = layout
        .index_subspace(&index.name)
        .pack(&Tuple::new(grouping.to_vec()));
    match kv.get(&key, isolation).await? {
        None => Ok(0),
        Some(bytes) => decode_cell(&bytes),
    }
}

/// Sum every cell under a proper grouping prefix. Serves count queries
/// whose equality predicates pin only the leading grouping columns; a
/// fully pinned grouping goes through `read_aggregate_cell` instead.
pub async fn sum_aggregate_cells(
    kv: &dyn KvRead,
    isolation: IsolationLevel,
    layout: &StoreLayout,
    index: &IndexModel,
    grouping_prefix: &[Value],
) -> Result<i64, Error> {
    let subspace = layout.index_subspace(&index.name);
    let (begin, end) = if grouping_prefix.is_empty() {
        subspace.range()
    } else {
        let packed = subspace.pack(&Tuple::new(grouping_prefix.to_vec()));
        let mut begin = packed.clone();
        begin.push(0x00);
        let mut end = packed;
        end.push(0xFF);
        (begin, end)
    };

    let mut iter = kv.range(begin, end, isolation).await?;
    let mut total = 0i64;
    while let Some((_, bytes)) = iter.next().await? {
        total = total.wrapping_add(decode_cell(&bytes)?);
    }
    Ok(total)
}

fn decode_cell(bytes: &[u8]) -> Result<i64, Error> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::tuple_decode("aggregate cell is not a little-endian i64"))?;
    Ok(i64::from_le_bytes(bytes))
}

///
/// TESTS
///

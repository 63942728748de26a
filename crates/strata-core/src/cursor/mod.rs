mod build;
mod in_join;
mod index_scan;
mod merge;
mod scan;

#[cfg(test)]
mod tests;

pub use build::build_cursor;
pub use in_join::InJoinCursor;
pub use index_scan::{CoveringScanCursor, IndexScanCursor};
pub use merge::{IntersectionCursor, UnionCursor};
pub use scan::FullScanCursor;

use crate::{
    error::Error,
    kv::{IsolationLevel, KvRead},
    model::{RecordAccess, RecordMetadata, StoredRecord},
    predicate::{Predicate, eval},
    store::StoreLayout,
    tuple::Tuple,
};
use async_trait::async_trait;
use std::sync::Arc;

///
/// Execution cursors.
///
/// Every plan node lowers into one cursor: lazy, forward-only, single
/// consumer. A cursor owns its KV iterator and releases it on drop, so
/// dropping the cursor is cancellation. Errors fuse the cursor: after the
/// first `Err`, the sequence is over.
///

///
/// FetchedRecord
///
/// One record together with the primary key it was reached under. Merge
/// cursors compare and deduplicate on the key without re-deriving it.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FetchedRecord {
    pub primary_key: Tuple,
    pub record: StoredRecord,
}

///
/// RecordCursor
///

#[async_trait]
pub trait RecordCursor: Send {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error>;
}

/// Type-erased cursor. Safe to move between tasks, not for concurrent use.
pub type BoxedRecordCursor = Box<dyn RecordCursor>;

#[async_trait]
impl RecordCursor for BoxedRecordCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        self.as_mut().next().await
    }
}

///
/// ExecutionContext
///
/// Everything a cursor needs to reach storage: the KV read view, the
/// record access collaborator, metadata, the store layout, and the
/// isolation choice the whole query runs under.
///

#[derive(Clone)]
pub struct ExecutionContext {
    pub kv: Arc<dyn KvRead>,
    pub access: Arc<dyn RecordAccess>,
    pub metadata: Arc<RecordMetadata>,
    pub layout: StoreLayout,
    pub isolation: IsolationLevel,
}

///
/// EmptyCursor
///

#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyCursor;

#[async_trait]
impl RecordCursor for EmptyCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        Ok(None)
    }
}

///
/// VecCursor
///
/// Materialized records behind the cursor interface; rank retrieval and
/// tests use it.
///

#[derive(Debug)]
pub struct VecCursor {
    items: std::vec::IntoIter<FetchedRecord>,
}

impl VecCursor {
    #[must_use]
    pub fn new(items: Vec<FetchedRecord>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

#[async_trait]
impl RecordCursor for VecCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        Ok(self.items.next())
    }
}

///
/// FilterCursor
///

pub struct FilterCursor {
    child: BoxedRecordCursor,
    predicate: Predicate,
}

impl FilterCursor {
    #[must_use]
    pub fn new(child: BoxedRecordCursor, predicate: Predicate) -> Self {
        Self { child, predicate }
    }
}

#[async_trait]
impl RecordCursor for FilterCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        while let Some(fetched) = self.child.next().await? {
            if eval::matches(&self.predicate, &fetched.record) {
                return Ok(Some(fetched));
            }
        }
        Ok(None)
    }
}

///
/// LimitCursor
///

pub struct LimitCursor {
    child: BoxedRecordCursor,
    remaining: usize,
}

impl LimitCursor {
    #[must_use]
    pub fn new(child: BoxedRecordCursor, limit: usize) -> Self {
        Self {
            child,
            remaining: limit,
        }
    }
}

#[async_trait]
impl RecordCursor for LimitCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        if self.remaining == 0 {
            return Ok(None);
        }
        match self.child.next().await? {
            Some(fetched) => {
                self.remaining -= 1;
                Ok(Some(fetched))
            }
            None => {
                self.remaining = 0;
                Ok(None)
            }
        }
    }
}

/// Drain a cursor to completion. Convenience for callers that want the
/// whole result set in memory.
pub async fn collect_all(mut cursor: BoxedRecordCursor) -> Result<Vec<FetchedRecord>, Error> {
    let mut out = Vec::new();
    while let Some(fetched) = cursor.next().await? {
        out.push(fetched);
    }
    Ok(out)
}

use crate::{
    cursor::{ExecutionContext, FetchedRecord, IndexScanCursor, RecordCursor},
    error::Error,
    plan::node::{InJoinNode, IndexScanNode, ScanEdge},
};
use async_trait::async_trait;
use std::collections::HashSet;

///
/// InJoinCursor
///
/// One equality index probe per IN value, in value order. Records reached
/// through more than one value are deduplicated on the canonical byte form
/// of their record key.
///

pub struct InJoinCursor {
    ctx: ExecutionContext,
    node: InJoinNode,
    next_value: usize,
    inner: Option<IndexScanCursor>,
    seen: HashSet<Vec<u8>>,
    done: bool,
}

impl InJoinCursor {
    #[must_use]
    pub fn new(ctx: ExecutionContext, node: InJoinNode) -> Self {
        Self {
            ctx,
            node,
            next_value: 0,
            inner: None,
            seen: HashSet::new(),
            done: false,
        }
    }

    fn open_probe(&mut self) -> bool {
        let Some(value) = self.node.values.get(self.next_value) else {
            return false;
        };
        self.next_value += 1;

        let scan = IndexScanNode {
            index: self.node.index.clone(),
            record_type: self.node.record_type.clone(),
            begin: ScanEdge::Values(vec![value.clone()]),
            end: ScanEdge::Prefix(vec![value.clone()]),
            filter: self.node.filter.clone(),
            pk_len: self.node.pk_len,
            window: None,
            source_leaves: Vec::new(),
            selectivity: self.node.selectivity,
        };
        self.inner = Some(IndexScanCursor::new(self.ctx.clone(), scan));
        true
    }
}

#[async_trait]
impl RecordCursor for InJoinCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        if self.done {
            return Ok(None);
        }

        loop {
            let Some(inner) = &mut self.inner else {
                if !self.open_probe() {
                    self.done = true;
                    return Ok(None);
                }
                continue;
            };

            match inner.next().await {
                Err(err) => {
                    self.done = true;
                    return Err(err);
                }
                Ok(None) => {
                    self.inner = None;
                }
                Ok(Some(fetched)) => {
                    let key = self
                        .ctx
                        .layout
                        .record_key(&self.node.record_type, &fetched.primary_key);
                    if self.seen.insert(key) {
                        return Ok(Some(fetched));
                    }
                }
            }
        }
    }
}

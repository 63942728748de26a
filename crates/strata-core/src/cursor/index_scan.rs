use crate::{
    cursor::{ExecutionContext, FetchedRecord, RecordCursor},
    error::Error,
    kv::KvRangeIter,
    plan::node::IndexScanNode,
    predicate::eval,
    tuple::Tuple,
};
use async_trait::async_trait;

///
/// IndexScanCursor
///
/// Walks one index key range in tuple order. Every entry carries the
/// primary key as its trailing columns; the record itself is recovered by
/// one point read. An entry without a live record violates the index
/// invariant and surfaces as an internal error.
///

pub struct IndexScanCursor {
    ctx: ExecutionContext,
    node: IndexScanNode,
    state: State,
}

enum State {
    Pending,
    Running(Box<dyn KvRangeIter>),
    Done,
}

impl IndexScanCursor {
    #[must_use]
    pub fn new(ctx: ExecutionContext, node: IndexScanNode) -> Self {
        Self {
            ctx,
            node,
            state: State::Pending,
        }
    }

    /// Decode one entry into its index tuple and primary-key suffix.
    fn decode_entry(&self, key: &[u8]) -> Result<(Tuple, Tuple), Error> {
        let subspace = self.ctx.layout.index_subspace(&self.node.index);
        let tuple = subspace.unpack(key)?;
        let primary_key = tuple.suffix(self.node.pk_len)?;
        Ok((tuple, primary_key))
    }

    async fn fetch_record(&self, primary_key: &Tuple) -> Result<FetchedRecord, Error> {
        let record_key = self
            .ctx
            .layout
            .record_key(&self.node.record_type, primary_key);
        let Some(bytes) = self.ctx.kv.get(&record_key, self.ctx.isolation).await? else {
            return Err(Error::internal(format!(
                "index {} entry has no record under its primary key",
                self.node.index
            )));
        };
        let record = self
            .ctx
            .access
            .deserialize(&self.node.record_type, &bytes)?;
        Ok(FetchedRecord {
            primary_key: primary_key.clone(),
            record,
        })
    }

    async fn open_range(&mut self) -> Result<(), Error> {
        let subspace = self.ctx.layout.index_subspace(&self.node.index);
        let begin = self.node.begin.begin_bytes(&subspace);
        let end = self.node.end.end_bytes(&subspace);
        if begin >= end {
            self.state = State::Done;
            return Ok(());
        }
        let iter = self.ctx.kv.range(begin, end, self.ctx.isolation).await?;
        self.state = State::Running(iter);
        Ok(())
    }

    async fn next_entry(&mut self) -> Result<Option<(Tuple, Tuple)>, Error> {
        loop {
            if matches!(self.state, State::Pending) {
                self.open_range().await?;
            }

            let pulled = match &mut self.state {
                State::Done => return Ok(None),
                State::Pending => continue,
                State::Running(iter) => iter.next().await,
            };

            return match pulled {
                Err(err) => {
                    self.state = State::Done;
                    Err(err)
                }
                Ok(None) => {
                    self.state = State::Done;
                    Ok(None)
                }
                Ok(Some((key, _))) => match self.decode_entry(&key) {
                    Err(err) => {
                        self.state = State::Done;
                        Err(err)
                    }
                    Ok(entry) => Ok(Some(entry)),
                },
            };
        }
    }
}

#[async_trait]
impl RecordCursor for IndexScanCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        loop {
            let Some((_, primary_key)) = self.next_entry().await? else {
                return Ok(None);
            };

            let fetched = match self.fetch_record(&primary_key).await {
                Err(err) => {
                    self.state = State::Done;
                    return Err(err);
                }
                Ok(fetched) => fetched,
            };

            if let Some(filter) = &self.node.filter
                && !eval::matches(filter, &fetched.record)
            {
                continue;
            }
            return Ok(Some(fetched));
        }
    }
}

///
/// CoveringScanCursor
///
/// Index scan that answers from the entry alone when it can. Columns of
/// the index tuple map back to record fields; a row whose declared fields
/// cannot all be rebuilt from the tuple falls back to a point read.
///

pub struct CoveringScanCursor {
    inner: IndexScanCursor,
    /// Field name per indexed column (`None` for literal columns).
    index_columns: Vec<Option<String>>,
    /// Field name per primary-key column.
    pk_columns: Vec<Option<String>>,
    /// Fields the reconstruction must be able to answer.
    fields: Vec<String>,
    record_type: String,
    filter: Option<crate::predicate::Predicate>,
}

impl CoveringScanCursor {
    pub fn new(ctx: ExecutionContext, node: IndexScanNode, fields: Vec<String>) -> Result<Self, Error> {
        let (model, index) = ctx.metadata.index(&node.index)?;
        let index_columns = index
            .root
            .column_fields()
            .into_iter()
            .map(|name| name.map(ToString::to_string))
            .collect();
        let pk_columns = model
            .primary_key
            .column_fields()
            .into_iter()
            .map(|name| name.map(ToString::to_string))
            .collect();
        let record_type = node.record_type.clone();
        // The inner scan must not post-filter: filtering happens against
        // the reconstructed record so the point read stays avoidable.
        let filter = node.filter.clone();
        let inner = IndexScanCursor::new(
            ctx,
            IndexScanNode {
                filter: None,
                ..node
            },
        );
        Ok(Self {
            inner,
            index_columns,
            pk_columns,
            fields,
            record_type,
            filter,
        })
    }

    /// Rebuild a partial record from one index tuple, or `None` when a
    /// declared field is not present in the tuple.
    fn reconstruct(&self, tuple: &Tuple, primary_key: &Tuple) -> Option<crate::model::StoredRecord> {
        let mut record = crate::model::StoredRecord::new(
            self.record_type.clone(),
            std::collections::BTreeMap::new(),
        );

        let elements = tuple.elements();
        for (column, name) in self.index_columns.iter().enumerate() {
            let (Some(name), Some(value)) = (name, elements.get(column)) else {
                continue;
            };
            record.set_field(name.clone(), vec![value.clone()]);
        }
        for (column, name) in self.pk_columns.iter().enumerate() {
            let (Some(name), Some(value)) = (name, primary_key.elements().get(column)) else {
                continue;
            };
            record.set_field(name.clone(), vec![value.clone()]);
        }

        self.fields
            .iter()
            .all(|field| !record.field_values(field).is_empty())
            .then_some(record)
    }
}

#[async_trait]
impl RecordCursor for CoveringScanCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        loop {
            let Some((tuple, primary_key)) = self.inner.next_entry().await? else {
                return Ok(None);
            };

            let record = match self.reconstruct(&tuple, &primary_key) {
                Some(record) => record,
                None => {
                    match self.inner.fetch_record(&primary_key).await {
                        Err(err) => {
                            self.inner.state = State::Done;
                            return Err(err);
                        }
                        Ok(fetched) => fetched.record,
                    }
                }
            };

            if let Some(filter) = &self.filter
                && !eval::matches(filter, &record)
            {
                continue;
            }

            return Ok(Some(FetchedRecord {
                primary_key,
                record,
            }));
        }
    }
}

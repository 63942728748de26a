use crate::{
    cursor::{ExecutionContext, FetchedRecord, RecordCursor},
    error::Error,
    kv::{KvPair, KvRangeIter},
    plan::node::FullScanNode,
    predicate::eval,
    tuple::Value,
};
use async_trait::async_trait;

///
/// FullScanCursor
///
/// Sweeps the whole record partition in key order: `(recordType,
/// primaryKey...)` tuples. Records of other types are skipped, never
/// errors; one partition holds every type of the store.
///

pub struct FullScanCursor {
    ctx: ExecutionContext,
    node: FullScanNode,
    state: State,
}

enum State {
    Pending,
    Running(Box<dyn KvRangeIter>),
    Done,
}

impl FullScanCursor {
    #[must_use]
    pub fn new(ctx: ExecutionContext, node: FullScanNode) -> Self {
        Self {
            ctx,
            node,
            state: State::Pending,
        }
    }

    /// Decode one stored pair; `None` means the pair is filtered out.
    fn decode_pair(&self, pair: &KvPair) -> Result<Option<FetchedRecord>, Error> {
        let (key, bytes) = pair;
        let decoded = self.ctx.layout.records_root().unpack(key)?;
        let Some(Value::Text(record_type)) = decoded.elements().first() else {
            return Err(Error::tuple_decode(
                "record key does not start with a record type name",
            ));
        };
        if let Some(expected) = &self.node.record_type
            && record_type != expected
        {
            return Ok(None);
        }

        let primary_key = decoded.suffix(decoded.len() - 1)?;
        let record = self.ctx.access.deserialize(record_type, bytes)?;

        if let Some(filter) = &self.node.filter
            && !eval::matches(filter, &record)
        {
            return Ok(None);
        }

        Ok(Some(FetchedRecord {
            primary_key,
            record,
        }))
    }
}

#[async_trait]
impl RecordCursor for FullScanCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        loop {
            if matches!(self.state, State::Pending) {
                let (begin, end) = self.ctx.layout.records_root().range();
                let iter = self.ctx.kv.range(begin, end, self.ctx.isolation).await?;
                self.state = State::Running(iter);
            }

            let pulled = match &mut self.state {
                State::Done => return Ok(None),
                State::Pending => continue,
                State::Running(iter) => iter.next().await,
            };

            let pair = match pulled {
                Err(err) => {
                    self.state = State::Done;
                    return Err(err);
                }
                Ok(None) => {
                    self.state = State::Done;
                    return Ok(None);
                }
                Ok(Some(pair)) => pair,
            };

            match self.decode_pair(&pair) {
                Err(err) => {
                    self.state = State::Done;
                    return Err(err);
                }
                Ok(Some(fetched)) => return Ok(Some(fetched)),
                Ok(None) => {}
            }
        }
    }
}

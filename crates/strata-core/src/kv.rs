use crate::error::Error;
use async_trait::async_trait;

///
/// Key-value contract consumed by the engine.
///
/// A `KvRead` handle is a transactional read view: reads issued through one
/// handle observe one consistent snapshot or serializable state, chosen per
/// call. The engine never writes; commit and retry policy belong to the
/// surrounding transaction, and cancellation is dropping the handle (range
/// iterators release their window on drop).
///

///
/// IsolationLevel
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IsolationLevel {
    /// Reads participate in conflict detection.
    #[default]
    Serializable,
    /// Reads observe the snapshot without registering conflicts.
    Snapshot,
}

/// One key-value pair as stored.
pub type KvPair = (Vec<u8>, Vec<u8>);

///
/// KvRangeIter
///
/// Pull iterator over one key range, in ascending key order. Single
/// consumer; every `next` may suspend on I/O.
///

#[async_trait]
pub trait KvRangeIter: Send + Sync {
    async fn next(&mut self) -> Result<Option<KvPair>, Error>;
}

#[async_trait]
impl KvRangeIter for Box<dyn KvRangeIter> {
    async fn next(&mut self) -> Result<Option<KvPair>, Error> {
        self.as_mut().next().await
    }
}

///
/// KvRead
///
/// Minimal read surface over the ordered store: point reads and half-open
/// range scans `[begin, end)`.
///

#[async_trait]
pub trait KvRead: Send + Sync {
    async fn get(&self, key: &[u8], isolation: IsolationLevel) -> Result<Option<Vec<u8>>, Error>;

    async fn range(
        &self,
        begin: Vec<u8>,
        end: Vec<u8>,
        isolation: IsolationLevel,
    ) -> Result<Box<dyn KvRangeIter>, Error>;
}

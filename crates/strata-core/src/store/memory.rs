use crate::{
    error::Error,
    kv::{IsolationLevel, KvPair, KvRangeIter, KvRead},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

///
/// MemoryKv
///
/// Ordered in-memory store for tests and demos. Range scans snapshot the
/// requested window at iterator creation, so a running scan observes one
/// consistent state regardless of later writes, the same contract a
/// transactional backend provides.
///

#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: Vec<u8>, value: Vec<u8>) {
        self.map.lock().await.insert(key, value);
    }

    pub async fn remove(&self, key: &[u8]) {
        self.map.lock().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.map.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.lock().await.is_empty()
    }
}

#[async_trait]
impl KvRead for MemoryKv {
    async fn get(&self, key: &[u8], _isolation: IsolationLevel) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn range(
        &self,
        begin: Vec<u8>,
        end: Vec<u8>,
        _isolation: IsolationLevel,
    ) -> Result<Box<dyn KvRangeIter>, Error> {
        let snapshot: Vec<KvPair> = self
            .map
            .lock()
            .await
            .range(begin..end)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Box::new(MemoryRangeIter {
            items: snapshot.into_iter(),
        }))
    }
}

struct MemoryRangeIter {
    items: std::vec::IntoIter<KvPair>,
}

#[async_trait]
impl KvRangeIter for MemoryRangeIter {
    async fn next(&mut self) -> Result<Option<KvPair>, Error> {
        Ok(self.items.next())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn range_scans_are_snapshots() {
        let kv = MemoryKv::new();
        kv.set(vec![1], vec![0xA]).await;
        kv.set(vec![2], vec![0xB]).await;

        let mut iter = kv
            .range(vec![0], vec![0xFF], IsolationLevel::Snapshot)
            .await
            .expect("range");
        kv.set(vec![3], vec![0xC]).await;

        let mut seen = Vec::new();
        while let Some((key, _)) = iter.next().await.expect("next") {
            seen.push(key);
        }
        assert_eq!(seen, vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn get_reflects_latest_write() {
        let kv = MemoryKv::new();
        kv.set(vec![9], vec![1]).await;
        kv.set(vec![9], vec![2]).await;
        assert_eq!(
            kv.get(&[9], IsolationLevel::Serializable).await.expect("get"),
            Some(vec![2])
        );
        kv.remove(&[9]).await;
        assert_eq!(kv.get(&[9], IsolationLevel::Serializable).await.expect("get"), None);
    }
}

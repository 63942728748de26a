use crate::{
    cursor::{BoxedRecordCursor, FetchedRecord, RecordCursor},
    error::Error,
    tuple::Tuple,
};
use async_trait::async_trait;
use std::cmp::Ordering;

///
/// Streaming merge cursors.
///
/// Both cursors keep exactly one "current" record per child: a fixed
/// array, not a priority queue, because the child count is bounded by the
/// candidate cap. Children are expected to produce records in ascending
/// primary-key order; the intersection verifies it and raises an internal
/// error on regression, since its correctness depends on it.
///

///
/// UnionCursor
///
/// Emits the union of its children with primary-key deduplication: each
/// pull takes the minimum current key, emits it once, and advances every
/// child sitting on that key. O(k) per output row, O(1) buffering.
///

pub struct UnionCursor {
    children: Vec<BoxedRecordCursor>,
    current: Vec<Option<FetchedRecord>>,
    primed: bool,
    done: bool,
}

impl UnionCursor {
    #[must_use]
    pub fn new(children: Vec<BoxedRecordCursor>) -> Self {
        let current = children.iter().map(|_| None).collect();
        Self {
            children,
            current,
            primed: false,
            done: false,
        }
    }

    async fn prime(&mut self) -> Result<(), Error> {
        for (child, slot) in self.children.iter_mut().zip(self.current.iter_mut()) {
            *slot = child.next().await?;
        }
        self.primed = true;
        Ok(())
    }
}

#[async_trait]
impl RecordCursor for UnionCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        if self.done {
            return Ok(None);
        }
        if !self.primed {
            if let Err(err) = self.prime().await {
                self.done = true;
                return Err(err);
            }
        }

        let Some(minimum) = self
            .current
            .iter()
            .flatten()
            .map(|fetched| fetched.primary_key.clone())
            .min()
        else {
            self.done = true;
            return Ok(None);
        };

        let mut emitted = None;
        for (child, slot) in self.children.iter_mut().zip(self.current.iter_mut()) {
            let matches_minimum =
                matches!(slot, Some(fetched) if fetched.primary_key == minimum);
            if !matches_minimum {
                continue;
            }
            let taken = slot.take();
            if emitted.is_none() {
                emitted = taken;
            }
            *slot = match child.next().await {
                Ok(next) => next,
                Err(err) => {
                    self.done = true;
                    return Err(err);
                }
            };
        }

        Ok(emitted)
    }
}

///
/// IntersectionCursor
///
/// Streaming k-way sort-merge intersection: advance the child with the
/// smallest current key until every child sits on the same key or any
/// child runs dry. Requires primary-key-ordered children.
///

pub struct IntersectionCursor {
    children: Vec<BoxedRecordCursor>,
    current: Vec<Option<FetchedRecord>>,
    /// Last key seen per child, for the ordering invariant.
    watermark: Vec<Option<Tuple>>,
    primed: bool,
    done: bool,
}

impl IntersectionCursor {
    #[must_use]
    pub fn new(children: Vec<BoxedRecordCursor>) -> Self {
        let current = children.iter().map(|_| None).collect();
        let watermark = children.iter().map(|_| None).collect();
        Self {
            children,
            current,
            watermark,
            primed: false,
            done: false,
        }
    }

    async fn advance(&mut self, position: usize) -> Result<(), Error> {
        let next = self.children[position].next().await?;
        if let Some(fetched) = &next {
            if let Some(previous) = &self.watermark[position]
                && fetched.primary_key.cmp(previous) != Ordering::Greater
            {
                return Err(Error::internal(
                    "intersection child emitted keys out of primary-key order",
                ));
            }
            self.watermark[position] = Some(fetched.primary_key.clone());
        }
        self.current[position] = next;
        Ok(())
    }

    async fn prime(&mut self) -> Result<(), Error> {
        for position in 0..self.children.len() {
            self.advance(position).await?;
        }
        self.primed = true;
        Ok(())
    }
}

#[async_trait]
impl RecordCursor for IntersectionCursor {
    async fn next(&mut self) -> Result<Option<FetchedRecord>, Error> {
        if self.done || self.children.is_empty() {
            return Ok(None);
        }
        if !self.primed {
            if let Err(err) = self.prime().await {
                self.done = true;
                return Err(err);
            }
        }

        loop {
            if self.current.iter().any(Option::is_none) {
                self.done = true;
                return Ok(None);
            }

            let maximum = self
                .current
                .iter()
                .flatten()
                .map(|fetched| fetched.primary_key.clone())
                .max()
                .expect("all slots are occupied");

            let mut all_match = true;
            for position in 0..self.children.len() {
                let behind = matches!(
                    &self.current[position],
                    Some(fetched) if fetched.primary_key < maximum
                );
                if behind {
                    all_match = false;
                    if let Err(err) = self.advance(position).await {
                        self.done = true;
                        return Err(err);
                    }
                }
            }
            if !all_match {
                continue;
            }

            // Every child sits on the same key: emit once, advance all.
            let emitted = self.current[0].clone();
            for position in 0..self.children.len() {
                if let Err(err) = self.advance(position).await {
                    self.done = true;
                    return Err(err);
                }
            }
            return Ok(emitted);
        }
    }
}

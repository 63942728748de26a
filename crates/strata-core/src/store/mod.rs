mod memory;


pub use memory::MemoryKv;

use crate::{
    aggregate::{
        AggregateFunction, GroupBySpec, GroupRow, RankSet, evaluate_group_by,
        read_aggregate_cell, resolve_rank_index, sum_aggregate_cells,
    },
    cursor::{
        BoxedRecordCursor, ExecutionContext, FetchedRecord, LimitCursor, VecCursor, build_cursor,
        collect_all,
    },
    error::Error,
    kv::{IsolationLevel, KvRead},
    model::{IndexKind, RecordAccess, RecordMetadata, StoredRecord},
    plan::{
        CacheStats, CachedPlan, CostModel, PhysicalPlan, PlanCache, PlannerConfig,
        QueryFingerprint, planner::Planner, rewrite::rewrite,
    },
    predicate::{CompareOp, Predicate},
    query::{Query, QuerySpec, RankSpec},
    stats::{NoStats, StatsProvider},
    tuple::{Subspace, Tuple, Value},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

///
/// StoreLayout
///
/// The persisted key geometry under one store prefix:
///
/// - `<prefix> "R" (recordType, primaryKey...)` → record bytes
/// - `<prefix> "I" (indexName) (indexTuple...)` → `""` or `int64 LE`
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreLayout {
    root: Subspace,
}

impl StoreLayout {
    #[must_use]
    pub const fn new(prefix: Vec<u8>) -> Self {
        Self {
            root: Subspace::new(prefix),
        }
    }

    /// Partition holding every record of every type.
    #[must_use]
    pub fn records_root(&self) -> Subspace {
        self.root.raw_child(b"R")
    }

    #[must_use]
    pub fn record_type_subspace(&self, record_type: &str) -> Subspace {
        self.records_root()
            .child(&Value::Text(record_type.to_string()))
    }

    /// Canonical byte key of one record.
    #[must_use]
    pub fn record_key(&self, record_type: &str, primary_key: &Tuple) -> Vec<u8> {
        self.record_type_subspace(record_type).pack(primary_key)
    }

    #[must_use]
    pub fn index_subspace(&self, index_name: &str) -> Subspace {
        self.root
            .raw_child(b"I")
            .child(&Value::Text(index_name.to_string()))
    }
}

///
/// RecordStore
///
/// Read-only query surface over one record store: planner, plan cache,
/// cursors, and aggregate evaluation behind a single handle. The plan
/// cache is the handle's only shared mutable state, and dropping the
/// handle drops every cached plan.
///

pub struct RecordStore {
    layout: StoreLayout,
    kv: Arc<dyn KvRead>,
    access: Arc<dyn RecordAccess>,
    metadata: Arc<RecordMetadata>,
    stats: Arc<dyn StatsProvider>,
    rank: Option<Arc<dyn RankSet>>,
    config: PlannerConfig,
    cost_model: CostModel,
    cache: PlanCache,
    isolation: IsolationLevel,
}

/// Cached plans kept per store handle.
const DEFAULT_PLAN_CACHE_CAPACITY: usize = 128;

impl RecordStore {
    pub fn new(
        prefix: Vec<u8>,
        kv: Arc<dyn KvRead>,
        access: Arc<dyn RecordAccess>,
        metadata: Arc<RecordMetadata>,
    ) -> Self {
        Self {
            layout: StoreLayout::new(prefix),
            kv,
            access,
            metadata,
            stats: Arc::new(NoStats),
            rank: None,
            config: PlannerConfig::default(),
            cost_model: CostModel::default(),
            cache: PlanCache::new(DEFAULT_PLAN_CACHE_CAPACITY),
            isolation: IsolationLevel::default(),
        }
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Arc<dyn StatsProvider>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn with_rank_set(mut self, rank: Arc<dyn RankSet>) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Result<Self, Error> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub fn with_cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    #[must_use]
    pub fn with_plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = PlanCache::new(capacity);
        self
    }

    #[must_use]
    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[must_use]
    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    /// Start a query against one record type.
    #[must_use]
    pub fn query(&self, record_type: impl Into<String>) -> Query {
        Query::new(record_type)
    }

    fn planner(&self) -> Planner<'_> {
        Planner {
            metadata: &self.metadata,
            stats: self.stats.as_ref(),
            config: &self.config,
            cost_model: &self.cost_model,
            reconstruction_capable: self.access.supports_index_reconstruction(),
        }
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext {
            kv: Arc::clone(&self.kv),
            access: Arc::clone(&self.access),
            metadata: Arc::clone(&self.metadata),
            layout: self.layout.clone(),
            isolation: self.isolation,
        }
    }

    /// Plan a query, going through the parameterized plan cache.
    pub async fn plan(&self, spec: &QuerySpec) -> Result<PhysicalPlan, Error> {
        let fingerprint = QueryFingerprint::of(spec);
        let planner = self.planner();

        if let Some(cached) = self.cache.get(&fingerprint).await {
            debug!(?fingerprint, "plan cache hit");
            return planner.bind(&cached.plan, spec);
        }

        let planned = planner.plan_query(spec)?;
        self.cache
            .put(
                fingerprint,
                CachedPlan {
                    plan: planned.plan.clone(),
                    cost: planned.cost,
                },
            )
            .await;
        Ok(planned.plan)
    }

    /// Execute a query into a lazy record cursor.
    pub async fn execute(&self, spec: &QuerySpec) -> Result<BoxedRecordCursor, Error> {
        if let Some(rank) = &spec.rank {
            return self.execute_rank(spec, rank).await;
        }
        let plan = self.plan(spec).await?;
        build_cursor(&self.context(), &plan)
    }

    /// Execute and materialize every record.
    pub async fn fetch_all(&self, spec: &QuerySpec) -> Result<Vec<StoredRecord>, Error> {
        let cursor = self.execute(spec).await?;
        Ok(collect_all(cursor)
            .await?
            .into_iter()
            .map(|fetched| fetched.record)
            .collect())
    }

    /// Count matching records. Equality predicates that pin a prefix of a
    /// count index's grouping answer from the maintained cells; everything
    /// else executes and counts.
    pub async fn count(&self, spec: &QuerySpec) -> Result<i64, Error> {
        if spec.rank.is_none()
            && let Some(count) = self.count_from_index(spec).await?
        {
            return Ok(count);
        }

        let cursor = self.execute(spec).await?;
        Ok(collect_all(cursor).await?.len() as i64)
    }

    async fn count_from_index(&self, spec: &QuerySpec) -> Result<Option<i64>, Error> {
        let model = self.metadata.record_type(&spec.record_type)?;
        let rewritten = spec.predicate.as_ref().map(|predicate| rewrite(predicate));
        let Some(bindings) = equality_bindings(rewritten.as_ref()) else {
            return Ok(None);
        };

        let mut count_indexes: Vec<_> = model
            .indexes
            .iter()
            .filter(|index| index.kind == IndexKind::Count)
            .collect();
        count_indexes.sort_by(|left, right| left.name.cmp(&right.name));

        for index in count_indexes {
            let grouping_fields = index.grouping_field_names();
            if bindings.len() > grouping_fields.len() {
                continue;
            }
            let prefix = &grouping_fields[..bindings.len()];
            if !prefix.iter().all(|field| bindings.contains_key(field)) {
                continue;
            }

            let values: Vec<Value> = prefix
                .iter()
                .map(|field| (*bindings.get(field).expect("field was checked")).clone())
                .collect();

            let count = if values.len() == index.grouping_len {
                read_aggregate_cell(
                    self.kv.as_ref(),
                    self.isolation,
                    &self.layout,
                    AggregateFunction::Count,
                    index,
                    &values,
                )
                .await?
            } else {
                sum_aggregate_cells(
                    self.kv.as_ref(),
                    self.isolation,
                    &self.layout,
                    index,
                    &values,
                )
                .await?
            };
            debug!(index = %index.name, count, "count answered from aggregate index");
            return Ok(Some(count));
        }

        Ok(None)
    }

    /// Evaluate one maintained aggregate for a grouping tuple.
    pub async fn evaluate_aggregate(
        &self,
        function: AggregateFunction,
        index_name: &str,
        grouping: &[Value],
    ) -> Result<i64, Error> {
        let (_, index) = self.metadata.index(index_name)?;
        read_aggregate_cell(
            self.kv.as_ref(),
            self.isolation,
            &self.layout,
            function,
            index,
            grouping,
        )
        .await
    }

    /// Group a query's results and accumulate aggregates per group.
    pub async fn group_by(
        &self,
        spec: &QuerySpec,
        group: &GroupBySpec,
    ) -> Result<Vec<GroupRow>, Error> {
        let cursor = self.execute(spec).await?;
        evaluate_group_by(cursor, group).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn execute_rank(
        &self,
        spec: &QuerySpec,
        rank: &RankSpec,
    ) -> Result<BoxedRecordCursor, Error> {
        let model = self.metadata.record_type(&spec.record_type)?;
        let Some(rank_set) = &self.rank else {
            return Err(Error::invalid_argument(
                "ranked retrieval requires a rank-set collaborator on the store",
            ));
        };
        if let Some(predicate) = &spec.predicate {
            predicate.validate()?;
        }

        let resolved = resolve_rank_index(
            model,
            &rank.field,
            rank.index.as_deref(),
            spec.predicate.as_ref(),
        )?;
        debug!(index = %resolved.index.name, n = rank.n, descending = rank.descending, "rank scan");

        let primary_keys = rank_set
            .scan_by_rank(
                &resolved.index.name,
                &resolved.group,
                0,
                rank.n as u64,
                rank.descending,
            )
            .await?;

        let mut out = Vec::with_capacity(primary_keys.len());
        for primary_key in primary_keys {
            let key = self.layout.record_key(&model.name, &primary_key);
            let Some(bytes) = self.kv.get(&key, self.isolation).await? else {
                return Err(Error::internal(format!(
                    "rank index {} entry has no record under its primary key",
                    resolved.index.name
                )));
            };
            let record = self.access.deserialize(&model.name, &bytes)?;
            out.push(FetchedRecord {
                primary_key,
                record,
            });
        }

        let cursor: BoxedRecordCursor = Box::new(VecCursor::new(out));
        Ok(match spec.limit {
            Some(limit) => Box::new(LimitCursor::new(cursor, limit)),
            None => cursor,
        })
    }
}

/// Field-to-value map when the predicate is a pure equality conjunction
/// (or absent). `None` disqualifies the aggregate-index fast path.
fn equality_bindings(predicate: Option<&Predicate>) -> Option<BTreeMap<&str, &Value>> {
    let mut bindings = BTreeMap::new();
    let Some(predicate) = predicate else {
        return Some(bindings);
    };

    let conjuncts: Vec<&Predicate> = match predicate {
        Predicate::And(children) => children.iter().collect(),
        other => vec![other],
    };
    for conjunct in conjuncts {
        let Predicate::Compare(cmp) = conjunct else {
            return None;
        };
        if cmp.op != CompareOp::Eq {
            return None;
        }
        if bindings.insert(cmp.field.as_str(), &cmp.value).is_some() {
            return None;
        }
    }
    Some(bindings)
}

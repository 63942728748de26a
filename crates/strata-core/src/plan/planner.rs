use crate::{
    error::Error,
    model::{IndexKind, IndexModel, RecordMetadata, RecordTypeModel},
    plan::{
        config::PlannerConfig,
        cost::{CostModel, DEFAULT_ROW_COUNT, DEFAULT_SELECTIVITY, cost_plan},
        fingerprint::canonical_leaves,
        node::{
            CoveringScanNode, FullScanNode, InJoinNode, IndexScanNode, IntersectionNode,
            PhysicalPlan, ScanEdge, UnionNode,
        },
        rewrite::rewrite,
    },
    predicate::{CompareOp, ComparePredicate, Predicate, PredicateLeaf, normalize},
    primitives::Window,
    query::QuerySpec,
    stats::StatsProvider,
    tuple::Value,
};
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::debug;

///
/// Planner
///
/// Turns a query specification into the cheapest physical plan the
/// candidate generator can produce. Planning is pure and deterministic:
/// indexes are considered in name order, candidates keep insertion order,
/// and cost ties resolve to the earlier candidate. "Optimization not
/// applicable" is never an error here; a candidate is simply not emitted
/// and the full scan remains.
///
/// Index-backed candidates are only generated where they are sound: a
/// single scan must come from a top-level conjunct (the predicate implies
/// the leaf), a union must cover every disjunct.
///

pub struct Planner<'a> {
    pub metadata: &'a RecordMetadata,
    pub stats: &'a dyn StatsProvider,
    pub config: &'a PlannerConfig,
    pub cost_model: &'a CostModel,
    /// Whether the record access collaborator can rebuild records from
    /// covering index tuples; gates covering-scan candidates.
    pub reconstruction_capable: bool,
}

///
/// PlannedQuery
///

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedQuery {
    pub plan: PhysicalPlan,
    pub cost: f64,
}

impl Planner<'_> {
    /// Plan a query without cache involvement.
    pub fn plan_query(&self, spec: &QuerySpec) -> Result<PlannedQuery, Error> {
        let model = self.metadata.record_type(&spec.record_type)?;
        validate_spec(model, spec)?;

        let rewritten = spec.predicate.as_ref().map(|predicate| rewrite(predicate));
        let dnf = rewritten
            .as_ref()
            .map(|predicate| normalize::to_dnf(predicate, self.config.max_dnf_branches));
        let leaves = rewritten
            .as_ref()
            .map(|predicate| canonical_leaves(predicate))
            .unwrap_or_default();

        let candidates =
            self.generate_candidates(model, spec, rewritten.as_ref(), dnf.as_ref(), &leaves);
        let (plan, cost) = self.select(model, candidates);
        debug!(
            record_type = %spec.record_type,
            plan = %plan.describe(),
            cost,
            "selected plan"
        );

        let plan = match spec.limit {
            Some(limit) => plan.limited(limit),
            None => plan,
        };
        let cost = self.final_cost(model, &plan).min(cost);

        Ok(PlannedQuery { plan, cost })
    }

    /// Re-substitute the literals of a live query into a cached plan of
    /// the same fingerprint shape.
    pub fn bind(&self, cached: &PhysicalPlan, spec: &QuerySpec) -> Result<PhysicalPlan, Error> {
        let model = self.metadata.record_type(&spec.record_type)?;
        validate_spec(model, spec)?;

        let rewritten = spec.predicate.as_ref().map(|predicate| rewrite(predicate));
        let leaves = rewritten
            .as_ref()
            .map(|predicate| canonical_leaves(predicate))
            .unwrap_or_default();

        self.bind_plan(cached, rewritten.as_ref(), &leaves)
    }

    fn final_cost(&self, model: &RecordTypeModel, plan: &PhysicalPlan) -> f64 {
        cost_plan(plan, self.row_count(model), self.cost_model).cost
    }

    fn row_count(&self, model: &RecordTypeModel) -> f64 {
        self.stats
            .table_stats(&model.name)
            .map_or(DEFAULT_ROW_COUNT, |stats| stats.row_count as f64)
    }

    // ---- candidate generation ------------------------------------------

    fn generate_candidates(
        &self,
        model: &RecordTypeModel,
        spec: &QuerySpec,
        predicate: Option<&Predicate>,
        dnf: Option<&Predicate>,
        leaves: &[PredicateLeaf<'_>],
    ) -> Vec<PhysicalPlan> {
        let mut out = vec![PhysicalPlan::FullScan(FullScanNode {
            record_type: Some(model.name.clone()),
            filter: predicate.cloned(),
        })];

        let Some(predicate) = predicate else {
            out.truncate(self.config.max_candidate_plans);
            return out;
        };

        // Leaves the whole predicate implies: only these can anchor a
        // single index scan.
        let conjuncts = top_level_conjuncts(dnf);

        // Repeated ranges over one field collapse into a window; an empty
        // window proves the conjunction unsatisfiable.
        let window_fields = match window_constraints(&conjuncts, leaves) {
            WindowOutcome::Empty => return vec![PhysicalPlan::Empty],
            WindowOutcome::Windows(windows) => windows,
        };

        for (field, (window, ordinals)) in &window_fields {
            for index in sorted_value_indexes(model) {
                if index.first_indexed_field() != Some(*field) {
                    continue;
                }
                let (begin, end) = window_edges(window);
                out.push(PhysicalPlan::IndexScan(IndexScanNode {
                    index: index.name.clone(),
                    record_type: model.name.clone(),
                    begin,
                    end,
                    filter: Some(predicate.clone()),
                    pk_len: model.primary_key_len(),
                    window: Some(window.clone()),
                    source_leaves: ordinals.clone(),
                    selectivity: self.window_selectivity(index, window),
                }));
            }
        }

        for conjunct in &conjuncts {
            let Predicate::Compare(cmp) = conjunct else {
                continue;
            };
            if window_fields.contains_key(cmp.field.as_str()) {
                continue;
            }
            let Some((begin, end)) = scan_bounds(cmp) else {
                continue;
            };
            let Some(ordinal) = find_leaf_ordinal(leaves, cmp) else {
                continue;
            };
            for index in sorted_value_indexes(model) {
                if index.first_indexed_field() != Some(cmp.field.as_str()) {
                    continue;
                }
                out.push(PhysicalPlan::IndexScan(IndexScanNode {
                    index: index.name.clone(),
                    record_type: model.name.clone(),
                    begin: begin.clone(),
                    end: end.clone(),
                    filter: residual_filter(predicate, conjunct),
                    pk_len: model.primary_key_len(),
                    window: None,
                    source_leaves: vec![ordinal],
                    selectivity: self.compare_selectivity(index, cmp),
                }));
            }
        }

        if let Some(plan) = self.intersection_candidate(model, predicate, &conjuncts, leaves) {
            out.push(plan);
        }
        if let Some(plan) = self.union_candidate(model, dnf, leaves) {
            out.push(plan);
        }
        self.push_in_join_candidates(model, predicate, &conjuncts, leaves, &mut out);
        self.push_covering_candidates(model, spec, Some(predicate), &conjuncts, leaves, &mut out);

        out.truncate(self.config.max_candidate_plans);
        out
    }

    /// Top-level AND with two or more index-usable children on distinct
    /// fields becomes a streaming intersection of index scans.
    fn intersection_candidate(
        &self,
        model: &RecordTypeModel,
        predicate: &Predicate,
        conjuncts: &[&Predicate],
        leaves: &[PredicateLeaf<'_>],
    ) -> Option<PhysicalPlan> {
        if conjuncts.len() < 2 {
            return None;
        }

        let mut scans = Vec::new();
        let mut used_fields = Vec::new();
        let mut residual = false;
        for conjunct in conjuncts {
            let Predicate::Compare(cmp) = conjunct else {
                residual = true;
                continue;
            };
            let Some((begin, end)) = scan_bounds(cmp) else {
                residual = true;
                continue;
            };
            if used_fields.contains(&cmp.field.as_str()) {
                // One scan per field; repeated constraints stay in the filter.
                residual = true;
                continue;
            }
            let Some(index) = sorted_value_indexes(model)
                .into_iter()
                .find(|index| index.first_indexed_field() == Some(cmp.field.as_str()))
            else {
                residual = true;
                continue;
            };
            used_fields.push(cmp.field.as_str());
            let ordinal = find_leaf_ordinal(leaves, cmp)?;
            scans.push(PhysicalPlan::IndexScan(IndexScanNode {
                index: index.name.clone(),
                record_type: model.name.clone(),
                begin,
                end,
                filter: None,
                pk_len: model.primary_key_len(),
                window: None,
                source_leaves: vec![ordinal],
                selectivity: self.compare_selectivity(index, cmp),
            }));
        }

        if scans.len() < 2 {
            return None;
        }

        let plan = PhysicalPlan::Intersection(IntersectionNode { children: scans });
        Some(if residual {
            plan.filtered(predicate.clone())
        } else {
            plan
        })
    }

    /// Top-level OR whose every disjunct is index-usable becomes a
    /// streaming deduplicating union.
    fn union_candidate(
        &self,
        model: &RecordTypeModel,
        dnf: Option<&Predicate>,
        leaves: &[PredicateLeaf<'_>],
    ) -> Option<PhysicalPlan> {
        let Some(Predicate::Or(disjuncts)) = dnf else {
            return None;
        };

        let mut scans = Vec::with_capacity(disjuncts.len());
        for disjunct in disjuncts {
            let conjuncts: &[Predicate] = match disjunct {
                Predicate::And(children) => children,
                other => std::slice::from_ref(other),
            };

            // The scanned leaf anchors the disjunct; the rest of the
            // conjunct rides along as the scan's filter.
            let anchor = conjuncts.iter().find_map(|conjunct| {
                let Predicate::Compare(cmp) = conjunct else {
                    return None;
                };
                let bounds = scan_bounds(cmp)?;
                let index = sorted_value_indexes(model)
                    .into_iter()
                    .find(|index| index.first_indexed_field() == Some(cmp.field.as_str()))?;
                Some((cmp, bounds, index))
            })?;

            let (cmp, (begin, end), index) = anchor;
            let ordinal = find_leaf_ordinal(leaves, cmp)?;
            scans.push(PhysicalPlan::IndexScan(IndexScanNode {
                index: index.name.clone(),
                record_type: model.name.clone(),
                begin,
                end,
                filter: residual_filter(disjunct, &Predicate::Compare(cmp.clone())),
                pk_len: model.primary_key_len(),
                window: None,
                source_leaves: vec![ordinal],
                selectivity: self.compare_selectivity(index, cmp),
            }));
        }

        if scans.len() < 2 {
            return None;
        }
        Some(PhysicalPlan::Union(UnionNode { children: scans }))
    }

    /// IN over an indexed field becomes one probe per value, deduplicated;
    /// beyond `max_in_values` the filtered full scan stands alone.
    fn push_in_join_candidates(
        &self,
        model: &RecordTypeModel,
        predicate: &Predicate,
        conjuncts: &[&Predicate],
        leaves: &[PredicateLeaf<'_>],
        out: &mut Vec<PhysicalPlan>,
    ) {
        for conjunct in conjuncts {
            let Predicate::In { field, values } = conjunct else {
                continue;
            };
            if values.len() > self.config.max_in_values {
                debug!(field = %field, count = values.len(), "IN degrades to full scan");
                continue;
            }
            let Some(index) = sorted_value_indexes(model)
                .into_iter()
                .find(|index| index.first_indexed_field() == Some(field.as_str()))
            else {
                continue;
            };
            let Some(ordinal) = find_in_ordinal(leaves, field, values) else {
                continue;
            };
            out.push(PhysicalPlan::InJoin(InJoinNode {
                index: index.name.clone(),
                record_type: model.name.clone(),
                field: field.clone(),
                values: values.clone(),
                filter: residual_filter(predicate, conjunct),
                pk_len: model.primary_key_len(),
                source_leaves: vec![ordinal],
                selectivity: self.in_value_selectivity(index, values),
            }));
        }
    }

    /// A covering index answering every projected and filtered field
    /// (minus primary-key columns) can skip the point read per row.
    fn push_covering_candidates(
        &self,
        model: &RecordTypeModel,
        spec: &QuerySpec,
        predicate: Option<&Predicate>,
        conjuncts: &[&Predicate],
        leaves: &[PredicateLeaf<'_>],
        out: &mut Vec<PhysicalPlan>,
    ) {
        if !self.reconstruction_capable {
            return;
        }
        // Without a declared projection the caller wants whole records, and
        // no index entry can answer that.
        let Some(projection) = &spec.projection else {
            return;
        };

        let pk_fields = model.primary_key_fields();
        let mut needed: Vec<&str> = projection.iter().map(String::as_str).collect();
        if let Some(predicate) = predicate {
            needed.extend(predicate.field_names());
        }
        needed.retain(|field| !pk_fields.contains(field));
        needed.sort_unstable();
        needed.dedup();

        for index in sorted_value_indexes(model) {
            let Some(covering) = &index.covering else {
                continue;
            };
            let mut answerable: Vec<&str> = covering.iter().map(String::as_str).collect();
            answerable.extend(index.indexed_field_names());
            answerable.extend(pk_fields.iter().copied());
            if !needed.iter().all(|field| answerable.contains(field)) {
                continue;
            }

            // Reuse the tightest usable conjunct on the leading column;
            // fall back to sweeping the whole index.
            let anchor = conjuncts.iter().find_map(|conjunct| {
                let Predicate::Compare(cmp) = conjunct else {
                    return None;
                };
                if index.first_indexed_field() != Some(cmp.field.as_str()) {
                    return None;
                }
                let bounds = scan_bounds(cmp)?;
                find_leaf_ordinal(leaves, cmp).map(|ordinal| (ordinal, cmp, bounds))
            });

            let (begin, end, source_leaves, selectivity) = match anchor {
                Some((ordinal, cmp, (begin, end))) => (
                    begin,
                    end,
                    vec![ordinal],
                    self.compare_selectivity(index, cmp),
                ),
                None => (
                    ScanEdge::SubspaceStart,
                    ScanEdge::SubspaceEnd,
                    Vec::new(),
                    1.0,
                ),
            };

            let mut fields: Vec<String> = answerable.iter().map(ToString::to_string).collect();
            fields.sort_unstable();
            fields.dedup();

            out.push(PhysicalPlan::CoveringIndexScan(CoveringScanNode {
                scan: IndexScanNode {
                    index: index.name.clone(),
                    record_type: model.name.clone(),
                    begin,
                    end,
                    filter: predicate.cloned(),
                    pk_len: model.primary_key_len(),
                    window: None,
                    source_leaves,
                    selectivity,
                },
                fields,
            }));
        }
    }

    // ---- selection -----------------------------------------------------

    fn select(
        &self,
        model: &RecordTypeModel,
        candidates: Vec<PhysicalPlan>,
    ) -> (PhysicalPlan, f64) {
        let row_count = self.row_count(model);

        if self.config.enable_heuristic_pruning {
            // A full-column equality probe of a unique index cannot be
            // beaten; take it without costing the field.
            for candidate in &candidates {
                if let PhysicalPlan::IndexScan(node) = candidate
                    && let Ok((_, index)) = self.metadata.index(&node.index)
                    && node.is_unique_equality(index.unique, index.column_count())
                {
                    let cost = cost_plan(candidate, row_count, self.cost_model).cost;
                    return (candidate.clone(), cost);
                }
            }
        }

        let costs: Vec<_> = candidates
            .iter()
            .map(|candidate| cost_plan(candidate, row_count, self.cost_model))
            .collect();
        let cheapest = costs
            .iter()
            .map(|cost| cost.cost)
            .fold(f64::INFINITY, f64::min);

        let mut best: Option<(usize, f64)> = None;
        for (position, cost) in costs.iter().enumerate() {
            if self.config.enable_heuristic_pruning
                && row_count > 0.0
                && cost.rows / row_count > 0.5
                && cost.cost > cheapest
            {
                continue;
            }
            match best {
                Some((_, best_cost)) if cost.cost >= best_cost => {}
                _ => best = Some((position, cost.cost)),
            }
        }

        let (position, cost) = best.unwrap_or((0, f64::INFINITY));
        (candidates[position].clone(), cost)
    }

    // ---- binding -------------------------------------------------------

    fn bind_plan(
        &self,
        plan: &PhysicalPlan,
        predicate: Option<&Predicate>,
        leaves: &[PredicateLeaf<'_>],
    ) -> Result<PhysicalPlan, Error> {
        match plan {
            PhysicalPlan::Empty => Ok(PhysicalPlan::Empty),
            PhysicalPlan::FullScan(node) => Ok(PhysicalPlan::FullScan(FullScanNode {
                record_type: node.record_type.clone(),
                filter: node.filter.as_ref().and(predicate).cloned(),
            })),
            PhysicalPlan::IndexScan(node) => {
                Ok(match self.bind_scan(node, predicate, leaves)? {
                    Some(bound) => PhysicalPlan::IndexScan(bound),
                    None => PhysicalPlan::Empty,
                })
            }
            PhysicalPlan::CoveringIndexScan(node) => {
                Ok(match self.bind_scan(&node.scan, predicate, leaves)? {
                    Some(scan) => PhysicalPlan::CoveringIndexScan(CoveringScanNode {
                        scan,
                        fields: node.fields.clone(),
                    }),
                    None => PhysicalPlan::Empty,
                })
            }
            PhysicalPlan::Intersection(node) => {
                let children = node
                    .children
                    .iter()
                    .map(|child| self.bind_plan(child, predicate, leaves))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PhysicalPlan::Intersection(IntersectionNode { children }))
            }
            PhysicalPlan::Union(node) => {
                let children = node
                    .children
                    .iter()
                    .map(|child| self.bind_plan(child, predicate, leaves))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PhysicalPlan::Union(UnionNode { children }))
            }
            PhysicalPlan::InJoin(node) => {
                let ordinal = single_source(node.source_leaves.as_slice())?;
                let Some(PredicateLeaf::In { values, .. }) = leaves.get(ordinal) else {
                    return Err(Error::internal(
                        "cached IN-join no longer aligns with an IN leaf",
                    ));
                };
                Ok(PhysicalPlan::InJoin(InJoinNode {
                    values: values.to_vec(),
                    filter: node.filter.as_ref().and(predicate).cloned(),
                    ..node.clone()
                }))
            }
            PhysicalPlan::Filter(node) => {
                let child = self.bind_plan(&node.child, predicate, leaves)?;
                let bound = predicate.cloned().unwrap_or_else(|| node.predicate.clone());
                Ok(child.filtered(bound))
            }
            PhysicalPlan::Limit(node) => {
                let child = self.bind_plan(&node.child, predicate, leaves)?;
                Ok(child.limited(node.limit))
            }
        }
    }

    /// Rebuild one scan's bounds from the live leaves. `None` means the
    /// re-bound window proved empty.
    fn bind_scan(
        &self,
        node: &IndexScanNode,
        predicate: Option<&Predicate>,
        leaves: &[PredicateLeaf<'_>],
    ) -> Result<Option<IndexScanNode>, Error> {
        let filter = node.filter.as_ref().and(predicate).cloned();

        if node.source_leaves.is_empty() {
            return Ok(Some(IndexScanNode {
                filter,
                ..node.clone()
            }));
        }

        let (_, index) = self.metadata.index(&node.index)?;

        if node.window.is_some() || node.source_leaves.len() > 1 {
            let mut window = Window::unbounded();
            for ordinal in &node.source_leaves {
                let Some(PredicateLeaf::Compare { cmp, .. }) = leaves.get(*ordinal) else {
                    return Err(Error::internal(
                        "cached window scan no longer aligns with range leaves",
                    ));
                };
                let Some(leaf_window) = range_window(cmp) else {
                    return Err(Error::internal(
                        "cached window scan re-bound to a non-range leaf",
                    ));
                };
                window = window.intersect(&leaf_window);
            }
            if window.is_empty() {
                return Ok(None);
            }
            let (begin, end) = window_edges(&window);
            let selectivity = self.window_selectivity(index, &window);
            return Ok(Some(IndexScanNode {
                begin,
                end,
                filter,
                window: Some(window),
                selectivity,
                ..node.clone()
            }));
        }

        let ordinal = single_source(node.source_leaves.as_slice())?;
        let Some(PredicateLeaf::Compare { cmp, .. }) = leaves.get(ordinal) else {
            return Err(Error::internal(
                "cached index scan no longer aligns with a comparison leaf",
            ));
        };
        let Some((begin, end)) = scan_bounds(cmp) else {
            return Err(Error::internal(
                "cached index scan re-bound to a non-scannable operator",
            ));
        };
        Ok(Some(IndexScanNode {
            begin,
            end,
            filter,
            selectivity: self.compare_selectivity(index, cmp),
            ..node.clone()
        }))
    }

    // ---- selectivity ---------------------------------------------------

    fn compare_selectivity(&self, index: &IndexModel, cmp: &ComparePredicate) -> f64 {
        let stats = self.stats.index_stats(&index.name);
        match cmp.op {
            CompareOp::Eq => match &stats {
                Some(stats) => stats
                    .histogram
                    .as_ref()
                    .map(|histogram| histogram.selectivity_eq(&cmp.value))
                    .or_else(|| {
                        (stats.distinct_values > 0)
                            .then(|| 1.0 / stats.distinct_values as f64)
                    })
                    .unwrap_or(DEFAULT_SELECTIVITY),
                None => DEFAULT_SELECTIVITY,
            },
            CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => stats
                .as_ref()
                .and_then(|stats| stats.histogram.as_ref())
                .map_or(DEFAULT_SELECTIVITY, |histogram| {
                    let (lower, upper) = match cmp.op {
                        CompareOp::Lt | CompareOp::Lte => (None, Some(&cmp.value)),
                        _ => (Some(&cmp.value), None),
                    };
                    histogram.selectivity_range(lower, upper)
                }),
            // Fixed conservative estimate for substring shapes.
            CompareOp::StartsWith | CompareOp::Contains | CompareOp::Ne => DEFAULT_SELECTIVITY,
        }
    }

    fn window_selectivity(&self, index: &IndexModel, window: &Window<Value>) -> f64 {
        self.stats
            .index_stats(&index.name)
            .and_then(|stats| stats.histogram)
            .map_or(DEFAULT_SELECTIVITY, |histogram| {
                histogram.selectivity_range(bound_ref(&window.lower), bound_ref(&window.upper))
            })
    }

    fn in_value_selectivity(&self, index: &IndexModel, values: &[Value]) -> f64 {
        let Some(stats) = self.stats.index_stats(&index.name) else {
            return DEFAULT_SELECTIVITY;
        };
        if let Some(histogram) = &stats.histogram {
            let total: f64 = values
                .iter()
                .map(|value| histogram.selectivity_eq(value))
                .sum();
            return total / values.len() as f64;
        }
        if stats.distinct_values > 0 {
            return 1.0 / stats.distinct_values as f64;
        }
        DEFAULT_SELECTIVITY
    }
}

// ---- free helpers ------------------------------------------------------

fn validate_spec(model: &RecordTypeModel, spec: &QuerySpec) -> Result<(), Error> {
    if let Some(predicate) = &spec.predicate {
        predicate.validate()?;
    }
    if spec.limit == Some(0) {
        return Err(Error::invalid_argument("limit must be greater than zero"));
    }
    if spec.rank.is_some() {
        return Err(Error::invalid_argument(
            "ranked retrieval does not go through the planner",
        ));
    }

    if !spec.order.is_empty() {
        let pk_fields = model.primary_key_fields();
        let ordered: Vec<&str> = spec.order.iter().map(|(field, _)| field.as_str()).collect();
        let all_ascending = spec
            .order
            .iter()
            .all(|(_, direction)| *direction == crate::query::OrderDirection::Asc);
        if ordered != pk_fields || !all_ascending {
            return Err(Error::invalid_argument(
                "plans emit primary-key order; sort by the primary key ascending, or use a rank index for ordered retrieval",
            ));
        }
    }

    Ok(())
}

fn sorted_value_indexes(model: &RecordTypeModel) -> Vec<&IndexModel> {
    let mut indexes: Vec<&IndexModel> = model
        .indexes
        .iter()
        .filter(|index| index.kind == IndexKind::Value)
        .collect();
    indexes.sort_by(|left, right| left.name.cmp(&right.name));
    indexes
}

/// Leaves the normalized predicate implies directly: the members of a
/// top-level AND, or the predicate itself when it is a single leaf. A
/// disjunction implies none of its leaves.
fn top_level_conjuncts(dnf: Option<&Predicate>) -> Vec<&Predicate> {
    match dnf {
        Some(Predicate::And(children)) => children.iter().collect(),
        Some(leaf @ (Predicate::Compare(_) | Predicate::In { .. })) => vec![leaf],
        _ => Vec::new(),
    }
}

/// Range bounds implied by one comparison, or `None` when the operator
/// cannot drive a scan (Ne, Contains, non-text StartsWith).
fn scan_bounds(cmp: &ComparePredicate) -> Option<(ScanEdge, ScanEdge)> {
    let value = cmp.value.clone();
    match cmp.op {
        CompareOp::Eq => Some((
            ScanEdge::Values(vec![value.clone()]),
            ScanEdge::Prefix(vec![value]),
        )),
        CompareOp::Lt => Some((ScanEdge::SubspaceStart, ScanEdge::Values(vec![value]))),
        CompareOp::Lte => Some((ScanEdge::SubspaceStart, ScanEdge::Prefix(vec![value]))),
        CompareOp::Gt => Some((ScanEdge::Prefix(vec![value]), ScanEdge::SubspaceEnd)),
        CompareOp::Gte => Some((ScanEdge::Values(vec![value]), ScanEdge::SubspaceEnd)),
        CompareOp::StartsWith => match value {
            Value::Text(prefix) => Some((
                ScanEdge::TextPrefix {
                    values: Vec::new(),
                    prefix: prefix.clone(),
                },
                ScanEdge::TextPrefix {
                    values: Vec::new(),
                    prefix,
                },
            )),
            _ => None,
        },
        CompareOp::Ne | CompareOp::Contains => None,
    }
}

/// The window a single range comparison describes.
fn range_window(cmp: &ComparePredicate) -> Option<Window<Value>> {
    let value = cmp.value.clone();
    match cmp.op {
        CompareOp::Gt => Some(Window::greater_than(value)),
        CompareOp::Gte => Some(Window::at_least(value)),
        CompareOp::Lt => Some(Window::less_than(value)),
        CompareOp::Lte => Some(Window::at_most(value)),
        _ => None,
    }
}

fn window_edges(window: &Window<Value>) -> (ScanEdge, ScanEdge) {
    let begin = match &window.lower {
        Bound::Unbounded => ScanEdge::SubspaceStart,
        Bound::Included(value) => ScanEdge::Values(vec![value.clone()]),
        Bound::Excluded(value) => ScanEdge::Prefix(vec![value.clone()]),
    };
    let end = match &window.upper {
        Bound::Unbounded => ScanEdge::SubspaceEnd,
        Bound::Included(value) => ScanEdge::Prefix(vec![value.clone()]),
        Bound::Excluded(value) => ScanEdge::Values(vec![value.clone()]),
    };
    (begin, end)
}

const fn bound_ref<T>(bound: &Bound<T>) -> Option<&T> {
    match bound {
        Bound::Included(value) | Bound::Excluded(value) => Some(value),
        Bound::Unbounded => None,
    }
}

enum WindowOutcome<'a> {
    Empty,
    Windows(BTreeMap<&'a str, (Window<Value>, Vec<usize>)>),
}

/// Windows for fields constrained by two or more range comparisons among
/// the top-level conjuncts.
fn window_constraints<'a>(
    conjuncts: &[&'a Predicate],
    leaves: &[PredicateLeaf<'a>],
) -> WindowOutcome<'a> {
    let mut per_field: BTreeMap<&str, Vec<&ComparePredicate>> = BTreeMap::new();
    for conjunct in conjuncts {
        let Predicate::Compare(cmp) = conjunct else {
            continue;
        };
        if cmp.op.is_range() {
            per_field.entry(cmp.field.as_str()).or_default().push(cmp);
        }
    }

    let mut windows = BTreeMap::new();
    for (field, compares) in per_field {
        if compares.len() < 2 {
            continue;
        }
        let mut window = Window::unbounded();
        let mut ordinals = Vec::new();
        for cmp in compares {
            let Some(leaf_window) = range_window(cmp) else {
                continue;
            };
            window = window.intersect(&leaf_window);
            if let Some(ordinal) = find_leaf_ordinal(leaves, cmp) {
                ordinals.push(ordinal);
            }
        }
        if window.is_empty() {
            return WindowOutcome::Empty;
        }
        ordinals.sort_unstable();
        ordinals.dedup();
        windows.insert(field, (window, ordinals));
    }

    WindowOutcome::Windows(windows)
}

/// Ordinal of one comparison in the canonical leaf list. Duplicated DNF
/// instances resolve to the first structurally equal canonical leaf.
fn find_leaf_ordinal(leaves: &[PredicateLeaf<'_>], cmp: &ComparePredicate) -> Option<usize> {
    leaves.iter().position(|leaf| {
        matches!(leaf, PredicateLeaf::Compare { negated: false, cmp: candidate } if *candidate == cmp)
    })
}

fn find_in_ordinal(
    leaves: &[PredicateLeaf<'_>],
    field: &str,
    values: &[Value],
) -> Option<usize> {
    leaves.iter().position(|leaf| {
        matches!(
            leaf,
            PredicateLeaf::In { negated: false, field: candidate, values: candidate_values }
                if *candidate == field && *candidate_values == values
        )
    })
}

fn residual_filter(predicate: &Predicate, satisfied: &Predicate) -> Option<Predicate> {
    if predicate == satisfied {
        None
    } else {
        Some(predicate.clone())
    }
}

fn single_source(source_leaves: &[usize]) -> Result<usize, Error> {
    match source_leaves {
        [ordinal] => Ok(*ordinal),
        _ => Err(Error::internal(
            "cached scan does not trace to exactly one predicate leaf",
        )),
    }
}

use crate::plan::node::PhysicalPlan;

///
/// Cost model.
///
/// Costs scale selectivity-weighted row counts by per-operation constants;
/// nothing here models buffer-pool or cache behavior. Unknown selectivity
/// defaults to a conservative fixed estimate.
///

pub const DEFAULT_SELECTIVITY: f64 = 0.1;

/// Row count assumed for tables without statistics.
pub const DEFAULT_ROW_COUNT: f64 = 1_000.0;

///
/// CostModel
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostModel {
    /// Cost of visiting one row during a full record scan.
    pub full_scan_row: f64,
    /// Cost of visiting one index entry.
    pub index_entry: f64,
    /// Cost of one point read to fetch a record behind an index entry.
    pub point_read: f64,
    /// Per-output-row cost of merging sorted child streams.
    pub merge_row: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            full_scan_row: 1.0,
            index_entry: 0.5,
            point_read: 2.0,
            merge_row: 0.2,
        }
    }
}

///
/// PlanCost
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanCost {
    /// Estimated rows the plan emits.
    pub rows: f64,
    pub cost: f64,
}

/// Cost one plan against a table of `row_count` rows.
#[must_use]
pub fn cost_plan(plan: &PhysicalPlan, row_count: f64, model: &CostModel) -> PlanCost {
    match plan {
        PhysicalPlan::Empty => PlanCost { rows: 0.0, cost: 0.0 },
        PhysicalPlan::FullScan(_) => PlanCost {
            rows: row_count,
            cost: model.full_scan_row * row_count,
        },
        PhysicalPlan::IndexScan(node) => {
            let hit = node.selectivity * row_count;
            PlanCost {
                rows: hit,
                cost: (model.index_entry + model.point_read) * hit,
            }
        }
        PhysicalPlan::CoveringIndexScan(node) => {
            let hit = node.scan.selectivity * row_count;
            PlanCost {
                rows: hit,
                cost: model.index_entry * hit,
            }
        }
        PhysicalPlan::Intersection(node) => {
            let mut cost = 0.0;
            let mut narrowest = 1.0f64;
            for child in &node.children {
                let selectivity = child_selectivity(child);
                cost += model.index_entry * selectivity * row_count;
                narrowest = narrowest.min(selectivity);
            }
            cost += model.merge_row * narrowest * row_count;
            PlanCost {
                rows: narrowest * row_count,
                cost,
            }
        }
        PhysicalPlan::Union(node) => {
            let mut cost = 0.0;
            let mut combined = 0.0f64;
            for child in &node.children {
                let selectivity = child_selectivity(child);
                cost += (model.index_entry + model.point_read) * selectivity * row_count;
                combined += selectivity;
            }
            PlanCost {
                rows: combined.min(1.0) * row_count,
                cost,
            }
        }
        PhysicalPlan::InJoin(node) => {
            let per_value = node.selectivity * row_count;
            let m = node.values.len() as f64;
            PlanCost {
                rows: (m * node.selectivity).min(1.0) * row_count,
                cost: m * (model.index_entry + model.point_read) * per_value,
            }
        }
        PhysicalPlan::Filter(node) => cost_plan(&node.child, row_count, model),
        PhysicalPlan::Limit(node) => {
            let inner = cost_plan(&node.child, row_count, model);
            let attenuation = if inner.rows > 0.0 {
                (node.limit as f64 / inner.rows).min(1.0)
            } else {
                1.0
            };
            PlanCost {
                rows: inner.rows.min(node.limit as f64),
                cost: inner.cost * attenuation,
            }
        }
    }
}

fn child_selectivity(child: &PhysicalPlan) -> f64 {
    match child {
        PhysicalPlan::IndexScan(node) => node.selectivity,
        PhysicalPlan::CoveringIndexScan(node) => node.scan.selectivity,
        PhysicalPlan::Filter(node) => child_selectivity(&node.child),
        _ => DEFAULT_SELECTIVITY,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::node::{FullScanNode, IndexScanNode, IntersectionNode, ScanEdge};
    use crate::tuple::Value;

    fn scan(selectivity: f64) -> IndexScanNode {
        IndexScanNode {
            index: "city_idx".into(),
            record_type: "User".into(),
            begin: ScanEdge::Values(vec![Value::Text("Tokyo".into())]),
            end: ScanEdge::Prefix(vec![Value::Text("Tokyo".into())]),
            filter: None,
            pk_len: 1,
            window: None,
            source_leaves: vec![0],
            selectivity,
        }
    }

    #[test]
    fn selective_index_scan_beats_full_scan() {
        let model = CostModel::default();
        let full = cost_plan(
            &PhysicalPlan::FullScan(FullScanNode {
                record_type: Some("User".into()),
                filter: None,
            }),
            1_000.0,
            &model,
        );
        let index = cost_plan(&PhysicalPlan::IndexScan(scan(0.1)), 1_000.0, &model);
        assert!(index.cost < full.cost);
    }

    #[test]
    fn intersection_cost_tracks_narrowest_child() {
        let model = CostModel::default();
        let plan = PhysicalPlan::Intersection(IntersectionNode {
            children: vec![
                PhysicalPlan::IndexScan(scan(0.2)),
                PhysicalPlan::IndexScan(scan(0.05)),
            ],
        });
        let cost = cost_plan(&plan, 1_000.0, &model);
        assert!((cost.rows - 50.0).abs() < 1e-9);
        let expected = 0.5 * (200.0 + 50.0) + 0.2 * 50.0;
        assert!((cost.cost - expected).abs() < 1e-9);
    }

    #[test]
    fn limit_attenuates_cost() {
        let model = CostModel::default();
        let unlimited = cost_plan(&PhysicalPlan::IndexScan(scan(0.5)), 1_000.0, &model);
        let limited = cost_plan(
            &PhysicalPlan::IndexScan(scan(0.5)).limited(50),
            1_000.0,
            &model,
        );
        assert!((limited.cost - unlimited.cost * 0.1).abs() < 1e-9);
        assert!((limited.rows - 50.0).abs() < 1e-9);
    }
}

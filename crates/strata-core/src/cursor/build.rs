use crate::{
    cursor::{
        BoxedRecordCursor, CoveringScanCursor, EmptyCursor, ExecutionContext, FilterCursor,
        FullScanCursor, InJoinCursor, IndexScanCursor, IntersectionCursor, LimitCursor,
        UnionCursor,
    },
    error::Error,
    plan::node::PhysicalPlan,
};
use tracing::trace;

/// Lower a physical plan into its cursor tree. Construction performs no
/// I/O; every range opens lazily on the first pull.
pub fn build_cursor(
    ctx: &ExecutionContext,
    plan: &PhysicalPlan,
) -> Result<BoxedRecordCursor, Error> {
    trace!(plan = %plan.describe(), "building cursor");

    Ok(match plan {
        PhysicalPlan::Empty => Box::new(EmptyCursor),
        PhysicalPlan::FullScan(node) => {
            Box::new(FullScanCursor::new(ctx.clone(), node.clone()))
        }
        PhysicalPlan::IndexScan(node) => {
            Box::new(IndexScanCursor::new(ctx.clone(), node.clone()))
        }
        PhysicalPlan::CoveringIndexScan(node) => Box::new(CoveringScanCursor::new(
            ctx.clone(),
            node.scan.clone(),
            node.fields.clone(),
        )?),
        PhysicalPlan::Intersection(node) => {
            let children = node
                .children
                .iter()
                .map(|child| build_cursor(ctx, child))
                .collect::<Result<Vec<_>, _>>()?;
            Box::new(IntersectionCursor::new(children))
        }
        PhysicalPlan::Union(node) => {
            let children = node
                .children
                .iter()
                .map(|child| build_cursor(ctx, child))
                .collect::<Result<Vec<_>, _>>()?;
            Box::new(UnionCursor::new(children))
        }
        PhysicalPlan::InJoin(node) => Box::new(InJoinCursor::new(ctx.clone(), node.clone())),
        PhysicalPlan::Filter(node) => Box::new(FilterCursor::new(
            build_cursor(ctx, &node.child)?,
            node.predicate.clone(),
        )),
        PhysicalPlan::Limit(node) => {
            Box::new(LimitCursor::new(build_cursor(ctx, &node.child)?, node.limit))
        }
    })
}

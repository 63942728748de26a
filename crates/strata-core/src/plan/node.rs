use crate::{
    predicate::Predicate,
    primitives::Window,
    tuple::{Subspace, Tuple, Value, codec},
};
use std::fmt::Write as _;

///
/// Physical plan nodes.
///
/// Immutable descriptors of how a query executes. Plans are value trees:
/// nodes own their children and are cheap to clone, so shared sub-plans are
/// duplicated rather than referenced. Execution lowers each node into a
/// lazy record cursor.
///

#[derive(Clone, Debug, PartialEq)]
pub enum PhysicalPlan {
    FullScan(FullScanNode),
    IndexScan(IndexScanNode),
    CoveringIndexScan(CoveringScanNode),
    Intersection(IntersectionNode),
    Union(UnionNode),
    InJoin(InJoinNode),
    Filter(FilterNode),
    Limit(LimitNode),
    Empty,
}

impl PhysicalPlan {
    #[must_use]
    pub fn limited(self, limit: usize) -> Self {
        Self::Limit(LimitNode {
            child: Box::new(self),
            limit,
        })
    }

    #[must_use]
    pub fn filtered(self, predicate: Predicate) -> Self {
        Self::Filter(FilterNode {
            child: Box::new(self),
            predicate,
        })
    }

    /// Compact single-line descriptor used by tracing and tests.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::FullScan(node) => {
                let mut out = format!(
                    "FullScan({})",
                    node.record_type.as_deref().unwrap_or("*")
                );
                if node.filter.is_some() {
                    out.push_str("+filter");
                }
                out
            }
            Self::IndexScan(node) => node.describe("IndexScan"),
            Self::CoveringIndexScan(node) => node.scan.describe("CoveringIndexScan"),
            Self::Intersection(node) => describe_children("Intersection", &node.children),
            Self::Union(node) => describe_children("Union", &node.children),
            Self::InJoin(node) => {
                format!("InJoin({}, {} values)", node.index, node.values.len())
            }
            Self::Filter(node) => format!("Filter({})", node.child.describe()),
            Self::Limit(node) => format!("Limit({}, {})", node.limit, node.child.describe()),
            Self::Empty => "Empty".to_string(),
        }
    }
}

fn describe_children(label: &str, children: &[PhysicalPlan]) -> String {
    let mut out = format!("{label}(");
    for (position, child) in children.iter().enumerate() {
        if position > 0 {
            out.push_str(", ");
        }
        out.push_str(&child.describe());
    }
    out.push(')');
    out
}

///
/// FullScanNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct FullScanNode {
    /// Record type to keep; other types found in the record space are
    /// skipped, not errors.
    pub record_type: Option<String>,
    pub filter: Option<Predicate>,
}

///
/// ScanEdge
///
/// One boundary of an index range scan, expressed over tuple values and
/// resolved to key bytes against the index subspace.
///
/// `Prefix` packs its values and appends `0xFF`: as an exclusive end it
/// admits every primary-key suffix of the equality prefix, as an inclusive
/// begin it skips them. `TextPrefix` encodes an unterminated text payload
/// so a `starts_with` scan covers exactly the strings extending the prefix.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ScanEdge {
    SubspaceStart,
    SubspaceEnd,
    Values(Vec<Value>),
    Prefix(Vec<Value>),
    TextPrefix { values: Vec<Value>, prefix: String },
}

impl ScanEdge {
    /// Resolve this edge as the inclusive begin key of a scan.
    #[must_use]
    pub fn begin_bytes(&self, subspace: &Subspace) -> Vec<u8> {
        match self {
            Self::SubspaceStart => subspace.range().0,
            Self::SubspaceEnd => subspace.range().1,
            Self::Values(values) => subspace.pack(&Tuple::new(values.clone())),
            Self::Prefix(values) => {
                let mut key = subspace.pack(&Tuple::new(values.clone()));
                key.push(0xFF);
                key
            }
            Self::TextPrefix { values, prefix } => {
                let mut key = subspace.pack(&Tuple::new(values.clone()));
                codec::push_text_prefix(&mut key, prefix);
                key
            }
        }
    }

    /// Resolve this edge as the exclusive end key of a scan.
    #[must_use]
    pub fn end_bytes(&self, subspace: &Subspace) -> Vec<u8> {
        match self {
            Self::TextPrefix { .. } => {
                let mut key = self.begin_bytes(subspace);
                key.push(0xFF);
                key
            }
            _ => self.begin_bytes(subspace),
        }
    }

    fn render(&self) -> String {
        fn values(out: &mut String, values: &[Value]) {
            out.push('[');
            for (position, value) in values.iter().enumerate() {
                if position > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{value:?}");
            }
            out.push(']');
        }

        let mut out = String::new();
        match self {
            Self::SubspaceStart => out.push('('),
            Self::SubspaceEnd => out.push(')'),
            Self::Values(vs) => values(&mut out, vs),
            Self::Prefix(vs) => {
                values(&mut out, vs);
                out.push('+');
            }
            Self::TextPrefix { values: vs, prefix } => {
                values(&mut out, vs);
                let _ = write!(out, "{prefix:?}*");
            }
        }
        out
    }
}

///
/// IndexScanNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct IndexScanNode {
    pub index: String,
    pub record_type: String,
    pub begin: ScanEdge,
    pub end: ScanEdge,
    pub filter: Option<Predicate>,
    /// Trailing tuple columns that form the primary key suffix.
    pub pk_len: usize,
    /// Narrowing window on the first indexed column, when one was derived.
    pub window: Option<Window<Value>>,
    /// Ordinals into the query's canonical leaf list this scan was built
    /// from; literal re-binding on plan-cache hits goes through these.
    pub source_leaves: Vec<usize>,
    /// Planner-estimated fraction of the table this scan touches.
    pub selectivity: f64,
}

impl IndexScanNode {
    fn describe(&self, label: &str) -> String {
        let mut out = format!(
            "{label}({} {}..{}",
            self.index,
            self.begin.render(),
            self.end.render()
        );
        if self.filter.is_some() {
            out.push_str(" +filter");
        }
        out.push(')');
        out
    }

    /// Whether this scan is a full-column equality probe of a unique index.
    #[must_use]
    pub fn is_unique_equality(&self, unique: bool, column_count: usize) -> bool {
        if !unique {
            return false;
        }
        match (&self.begin, &self.end) {
            (ScanEdge::Values(begin), ScanEdge::Prefix(end)) => {
                begin == end && begin.len() == column_count
            }
            _ => false,
        }
    }
}

///
/// CoveringScanNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct CoveringScanNode {
    pub scan: IndexScanNode,
    /// Record fields answerable from the index entry alone.
    pub fields: Vec<String>,
}

///
/// IntersectionNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionNode {
    /// Children must emit records in primary-key order.
    pub children: Vec<PhysicalPlan>,
}

///
/// UnionNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct UnionNode {
    pub children: Vec<PhysicalPlan>,
}

///
/// InJoinNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct InJoinNode {
    pub index: String,
    pub record_type: String,
    pub field: String,
    pub values: Vec<Value>,
    pub filter: Option<Predicate>,
    pub pk_len: usize,
    pub source_leaves: Vec<usize>,
    /// Planner-estimated per-value selectivity.
    pub selectivity: f64,
}

///
/// FilterNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct FilterNode {
    pub child: Box<PhysicalPlan>,
    pub predicate: Predicate,
}

///
/// LimitNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct LimitNode {
    pub child: Box<PhysicalPlan>,
    pub limit: usize,
}

///
/// TESTS
///

use crate::{error::Error, tuple::Value};
use std::fmt;
use std::ops::{BitAnd, BitOr};

///
/// Predicate AST
///
/// Pure representation of query filters. This layer carries no schema
/// knowledge, index logic, or execution semantics; interpretation happens
/// in normalization, planning, and evaluation.
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
    Contains,
}

impl CompareOp {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::StartsWith => "starts_with",
            Self::Contains => "contains",
        }
    }

    /// Stable one-byte code used in fingerprints and leaf ordering.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Eq => 0,
            Self::Ne => 1,
            Self::Lt => 2,
            Self::Lte => 3,
            Self::Gt => 4,
            Self::Gte => 5,
            Self::StartsWith => 6,
            Self::Contains => 7,
        }
    }

    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl fmt::Display for ComparePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.field, self.op.label(), self.value)
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    Compare(ComparePredicate),
    In { field: String, values: Vec<Value> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn cmp(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare(ComparePredicate {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::cmp(field, CompareOp::StartsWith, Value::Text(prefix.into()))
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::cmp(field, CompareOp::Contains, Value::Text(needle.into()))
    }

    #[must_use]
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Structural validation: every AND/OR needs at least one child, every
    /// IN at least one value.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Compare(_) => Ok(()),
            Self::In { field, values } => {
                if values.is_empty() {
                    return Err(Error::invalid_argument(format!(
                        "IN on field {field} requires at least one value"
                    )));
                }
                Ok(())
            }
            Self::And(children) => {
                if children.is_empty() {
                    return Err(Error::invalid_argument("AND requires at least one child"));
                }
                children.iter().try_for_each(Self::validate)
            }
            Self::Or(children) => {
                if children.is_empty() {
                    return Err(Error::invalid_argument("OR requires at least one child"));
                }
                children.iter().try_for_each(Self::validate)
            }
            Self::Not(inner) => inner.validate(),
        }
    }

    /// Whether any IN leaf occurs anywhere in the tree.
    #[must_use]
    pub fn contains_in(&self) -> bool {
        match self {
            Self::In { .. } => true,
            Self::Compare(_) => false,
            Self::And(children) | Self::Or(children) => children.iter().any(Self::contains_in),
            Self::Not(inner) => inner.contains_in(),
        }
    }

    /// Field names referenced anywhere in the tree.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_field_names(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_field_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare(cmp) => out.push(cmp.field.as_str()),
            Self::In { field, .. } => out.push(field.as_str()),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_field_names(out);
                }
            }
            Self::Not(inner) => inner.collect_field_names(out),
        }
    }

    /// Leaf predicates in depth-first order, with their negation state.
    #[must_use]
    pub fn leaves(&self) -> Vec<PredicateLeaf<'_>> {
        let mut out = Vec::new();
        self.collect_leaves(false, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, negated: bool, out: &mut Vec<PredicateLeaf<'a>>) {
        match self {
            Self::Compare(cmp) => out.push(PredicateLeaf::Compare { negated, cmp }),
            Self::In { field, values } => out.push(PredicateLeaf::In {
                negated,
                field: field.as_str(),
                values: values.as_slice(),
            }),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_leaves(negated, out);
                }
            }
            Self::Not(inner) => inner.collect_leaves(!negated, out),
        }
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

///
/// PredicateLeaf
///
/// Borrowed view of one leaf with its effective negation, as seen through
/// any enclosing NOT nodes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PredicateLeaf<'a> {
    Compare {
        negated: bool,
        cmp: &'a ComparePredicate,
    },
    In {
        negated: bool,
        field: &'a str,
        values: &'a [Value],
    },
}

impl PredicateLeaf<'_> {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Compare { cmp, .. } => cmp.field.as_str(),
            Self::In { field, .. } => field,
        }
    }

    #[must_use]
    pub const fn negated(&self) -> bool {
        match self {
            Self::Compare { negated, .. } | Self::In { negated, .. } => *negated,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_compose_trees() {
        let predicate = Predicate::eq("city", "Tokyo") & Predicate::gt("age", 25i64);
        let Predicate::And(children) = &predicate else {
            panic!("expected AND");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn empty_in_fails_validation() {
        let err = Predicate::is_in("age", vec![]).validate().expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_and_fails_validation() {
        let err = Predicate::And(vec![]).validate().expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn leaves_carry_negation_through_not() {
        let predicate = (Predicate::eq("a", 1i64) & Predicate::eq("b", 2i64).negate()).negate();
        let leaves = predicate.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(leaves[0].negated());
        assert!(!leaves[1].negated());
    }
}

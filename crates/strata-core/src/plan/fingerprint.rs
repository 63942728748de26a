use crate::{
    predicate::{Predicate, PredicateLeaf},
    query::{OrderDirection, QuerySpec},
};
use sha2::{Digest, Sha256};
use std::fmt;

///
/// Query fingerprint.
///
/// Stable digest of a query's *shape*: record type, canonically ordered
/// filter leaves with literal values elided, sort spec, and limit. Two
/// queries that differ only in literal bytes share a fingerprint, which is
/// what makes the plan cache parameterized: the cached shape is re-bound
/// to the live literals on a hit. IN arity stays in the fingerprint
/// because the planned shape depends on the value count.
///

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QueryFingerprint([u8; 32]);

impl fmt::Debug for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryFingerprint(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "…)")
    }
}

impl QueryFingerprint {
    #[must_use]
    pub fn of(spec: &QuerySpec) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(spec.record_type.as_bytes());
        hasher.update([0x00]);

        if let Some(predicate) = &spec.predicate {
            for leaf in canonical_leaves(predicate) {
                hash_leaf(&mut hasher, &leaf);
            }
        }
        hasher.update([0x01]);

        for (field, direction) in &spec.order {
            hasher.update(field.as_bytes());
            hasher.update([0x00, direction_code(*direction)]);
        }
        hasher.update([0x02]);

        match spec.limit {
            Some(limit) => {
                hasher.update([0x01]);
                hasher.update((limit as u64).to_le_bytes());
            }
            None => hasher.update([0x00]),
        }

        if let Some(projection) = &spec.projection {
            hasher.update([0x01]);
            for field in projection {
                hasher.update(field.as_bytes());
                hasher.update([0x00]);
            }
        } else {
            hasher.update([0x00]);
        }

        Self(hasher.finalize().into())
    }
}

fn hash_leaf(hasher: &mut Sha256, leaf: &PredicateLeaf<'_>) {
    match leaf {
        PredicateLeaf::Compare { negated, cmp } => {
            hasher.update(cmp.field.as_bytes());
            hasher.update([
                0x00,
                u8::from(*negated),
                cmp.op.code(),
                cmp.value.type_rank(),
            ]);
            hasher.update(1u16.to_le_bytes());
        }
        PredicateLeaf::In {
            negated,
            field,
            values,
        } => {
            hasher.update(field.as_bytes());
            hasher.update([0x00, u8::from(*negated), IN_OP_CODE, in_type_rank(values)]);
            hasher.update((values.len() as u16).to_le_bytes());
        }
    }
}

const IN_OP_CODE: u8 = 0x40;

fn in_type_rank(values: &[crate::tuple::Value]) -> u8 {
    values.first().map_or(0xFF, crate::tuple::Value::type_rank)
}

const fn direction_code(direction: OrderDirection) -> u8 {
    match direction {
        OrderDirection::Asc => 0,
        OrderDirection::Desc => 1,
    }
}

/// Leaves of a predicate in canonical order: sorted by field, operator
/// code, value type, arity, and negation, with ties kept in tree order.
/// Literal values do not participate in the ordering, so two queries of
/// the same shape list their leaves at the same ordinals.
#[must_use]
pub fn canonical_leaves(predicate: &Predicate) -> Vec<PredicateLeaf<'_>> {
    let mut leaves = predicate.leaves();
    leaves.sort_by(|left, right| leaf_sort_key(left).cmp(&leaf_sort_key(right)));
    leaves
}

fn leaf_sort_key<'a>(leaf: &PredicateLeaf<'a>) -> (&'a str, u8, u8, usize, bool) {
    match leaf {
        PredicateLeaf::Compare { negated, cmp } => (
            cmp.field.as_str(),
            cmp.op.code(),
            cmp.value.type_rank(),
            1,
            *negated,
        ),
        PredicateLeaf::In {
            negated,
            field,
            values,
        } => (*field, IN_OP_CODE, in_type_rank(values), values.len(), *negated),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use crate::tuple::Value;

    fn spec_for(predicate: Predicate) -> QuerySpec {
        Query::new("User").filter(predicate).build()
    }

    #[test]
    fn literal_values_do_not_change_the_fingerprint() {
        let tokyo = QueryFingerprint::of(&spec_for(Predicate::eq("city", "Tokyo")));
        let osaka = QueryFingerprint::of(&spec_for(Predicate::eq("city", "Osaka")));
        assert_eq!(tokyo, osaka);
    }

    #[test]
    fn shape_changes_change_the_fingerprint() {
        let eq = QueryFingerprint::of(&spec_for(Predicate::eq("city", "Tokyo")));
        let gt = QueryFingerprint::of(&spec_for(Predicate::gt("city", "Tokyo")));
        let other_field = QueryFingerprint::of(&spec_for(Predicate::eq("age", 1i64)));
        let other_type = QueryFingerprint::of(&spec_for(Predicate::eq("city", 1i64)));
        assert_ne!(eq, gt);
        assert_ne!(eq, other_field);
        assert_ne!(eq, other_type);
    }

    #[test]
    fn leaf_order_inside_and_does_not_matter() {
        let a = spec_for(Predicate::eq("city", "Tokyo") & Predicate::gt("age", 25i64));
        let b = spec_for(Predicate::gt("age", 10i64) & Predicate::eq("city", "Osaka"));
        assert_eq!(QueryFingerprint::of(&a), QueryFingerprint::of(&b));
    }

    #[test]
    fn in_arity_is_part_of_the_shape() {
        let two = spec_for(Predicate::is_in("age", vec![Value::Int(1), Value::Int(2)]));
        let three = spec_for(Predicate::is_in(
            "age",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        ));
        assert_ne!(QueryFingerprint::of(&two), QueryFingerprint::of(&three));
    }

    #[test]
    fn limit_is_part_of_the_fingerprint() {
        let unlimited = spec_for(Predicate::eq("city", "Tokyo"));
        let mut limited = unlimited.clone();
        limited.limit = Some(10);
        assert_ne!(QueryFingerprint::of(&unlimited), QueryFingerprint::of(&limited));
    }

    #[test]
    fn canonical_leaf_order_is_stable_for_equal_shapes() {
        let p = Predicate::eq("city", "Tokyo") | Predicate::eq("city", "Osaka");
        let leaves = canonical_leaves(&p);
        assert_eq!(leaves.len(), 2);
        // Ties keep tree order, so binding by ordinal is deterministic.
        let PredicateLeaf::Compare { cmp, .. } = leaves[0] else {
            panic!("expected compare leaf");
        };
        assert_eq!(cmp.value, Value::Text("Tokyo".into()));
    }
}

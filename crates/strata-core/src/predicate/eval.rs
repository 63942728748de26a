use crate::{
    model::StoredRecord,
    predicate::{CompareOp, ComparePredicate, Predicate},
    tuple::Value,
};
use std::cmp::Ordering;

///
/// Local predicate matching.
///
/// Pure record-side evaluation, independent of any index. Multi-valued
/// fields match under *any* semantics: a predicate holds if any extracted
/// value satisfies it. Cross-variant comparisons mirror index ordering:
/// equality across variants is false, ordering uses the variant rank.
///

/// Evaluate a predicate against one record.
#[must_use]
pub fn matches(predicate: &Predicate, record: &StoredRecord) -> bool {
    match predicate {
        Predicate::Compare(cmp) => any_value_matches(record, cmp),
        Predicate::In { field, values } => record
            .field_values(field)
            .iter()
            .any(|candidate| values.iter().any(|value| candidate.same_variant_eq(value))),
        Predicate::And(children) => children.iter().all(|child| matches(child, record)),
        Predicate::Or(children) => children.iter().any(|child| matches(child, record)),
        Predicate::Not(inner) => !matches(inner, record),
    }
}

fn any_value_matches(record: &StoredRecord, cmp: &ComparePredicate) -> bool {
    record
        .field_values(&cmp.field)
        .iter()
        .any(|candidate| compare_scalar(candidate, cmp.op, &cmp.value))
}

/// Compare one extracted value against a literal under the given operator.
#[must_use]
pub fn compare_scalar(candidate: &Value, op: CompareOp, literal: &Value) -> bool {
    match op {
        CompareOp::Eq => candidate.same_variant_eq(literal),
        CompareOp::Ne => !candidate.same_variant_eq(literal),
        CompareOp::Lt => candidate.canonical_cmp(literal) == Ordering::Less,
        CompareOp::Lte => candidate.canonical_cmp(literal) != Ordering::Greater,
        CompareOp::Gt => candidate.canonical_cmp(literal) == Ordering::Greater,
        CompareOp::Gte => candidate.canonical_cmp(literal) != Ordering::Less,
        CompareOp::StartsWith => match (candidate, literal) {
            (Value::Text(candidate), Value::Text(prefix)) => candidate.starts_with(prefix),
            _ => false,
        },
        CompareOp::Contains => match (candidate, literal) {
            (Value::Text(candidate), Value::Text(needle)) => candidate.contains(needle),
            _ => false,
        },
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(city: &str, age: i64, tags: &[&str]) -> StoredRecord {
        let mut fields = BTreeMap::new();
        fields.insert("city".to_string(), vec![Value::Text(city.into())]);
        fields.insert("age".to_string(), vec![Value::Int(age)]);
        fields.insert(
            "tags".to_string(),
            tags.iter().map(|tag| Value::Text((*tag).into())).collect(),
        );
        StoredRecord::new("User", fields)
    }

    #[test]
    fn compare_and_boolean_composition() {
        let r = record("Tokyo", 30, &[]);
        let p = Predicate::eq("city", "Tokyo") & Predicate::gt("age", 25i64);
        assert!(matches(&p, &r));
        assert!(!matches(&p.clone().negate(), &r));

        let q = Predicate::eq("city", "Osaka") | Predicate::lte("age", 30i64);
        assert!(matches(&q, &r));
    }

    #[test]
    fn multivalued_fields_match_under_any_semantics() {
        let r = record("Tokyo", 30, &["alpha", "beta"]);
        assert!(matches(&Predicate::eq("tags", "beta"), &r));
        assert!(!matches(&Predicate::eq("tags", "gamma"), &r));
        // Ne holds as soon as one value differs, even if another is equal.
        assert!(matches(&Predicate::ne("tags", "alpha"), &r));
    }

    #[test]
    fn cross_variant_equality_is_false_but_ordering_uses_type_rank() {
        let r = record("Tokyo", 30, &[]);
        assert!(!matches(&Predicate::eq("age", "30"), &r));
        // Int ranks below Text, so age < "anything" holds.
        assert!(matches(&Predicate::lt("age", "0"), &r));
        assert!(!matches(&Predicate::gt("age", "0"), &r));
    }

    #[test]
    fn text_operators_require_text_on_both_sides() {
        let r = record("Tokyo", 30, &[]);
        assert!(matches(&Predicate::starts_with("city", "Tok"), &r));
        assert!(matches(&Predicate::contains("city", "oky"), &r));
        assert!(!matches(&Predicate::cmp("age", CompareOp::StartsWith, Value::Text("3".into())), &r));
    }

    #[test]
    fn in_matches_any_listed_value() {
        let r = record("Tokyo", 30, &[]);
        let p = Predicate::is_in("age", vec![Value::Int(20), Value::Int(30)]);
        assert!(matches(&p, &r));
        let q = Predicate::is_in("age", vec![Value::Int(21)]);
        assert!(!matches(&q, &r));
    }

    #[test]
    fn absent_field_never_matches_positively() {
        let r = record("Tokyo", 30, &[]);
        assert!(!matches(&Predicate::eq("height", 180i64), &r));
        // ...but the negation of an unmatched predicate holds.
        assert!(matches(&Predicate::eq("height", 180i64).negate(), &r));
    }
}

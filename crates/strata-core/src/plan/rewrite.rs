use crate::predicate::Predicate;

///
/// Safe algebraic rewrites applied before normalization.
///
/// Every rewrite is semantically neutral: single-child AND/OR collapse,
/// nested same-kind flattening, double-negation elimination, and the
/// IN-with-one-value collapse to equality. IN extraction itself is not a
/// rewrite; the predicate keeps its IN leaves and the planner decides
/// whether an IN-join pays off.
///

#[must_use]
pub fn rewrite(predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::Compare(_) => predicate.clone(),
        Predicate::In { field, values } => {
            if values.len() == 1 {
                Predicate::eq(field.clone(), values[0].clone())
            } else {
                predicate.clone()
            }
        }
        Predicate::Not(inner) => match &**inner {
            Predicate::Not(grandchild) => rewrite(grandchild),
            _ => rewrite(inner).negate(),
        },
        Predicate::And(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                match rewrite(child) {
                    Predicate::And(grandchildren) => out.extend(grandchildren),
                    other => out.push(other),
                }
            }
            collapse(out, true)
        }
        Predicate::Or(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                match rewrite(child) {
                    Predicate::Or(grandchildren) => out.extend(grandchildren),
                    other => out.push(other),
                }
            }
            collapse(out, false)
        }
    }
}

fn collapse(mut children: Vec<Predicate>, conjunction: bool) -> Predicate {
    if children.len() == 1 {
        return children.remove(0);
    }
    if conjunction {
        Predicate::And(children)
    } else {
        Predicate::Or(children)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Value;

    #[test]
    fn single_value_in_collapses_to_eq() {
        let p = Predicate::is_in("age", vec![Value::Int(20)]);
        assert_eq!(rewrite(&p), Predicate::eq("age", 20i64));
    }

    #[test]
    fn double_negation_is_stripped() {
        let p = Predicate::eq("a", 1i64).negate().negate();
        assert_eq!(rewrite(&p), Predicate::eq("a", 1i64));
    }

    #[test]
    fn trivial_and_collapses_and_nesting_flattens() {
        let p = Predicate::And(vec![Predicate::And(vec![
            Predicate::eq("a", 1i64),
            Predicate::eq("b", 2i64),
        ])]);
        assert_eq!(
            rewrite(&p),
            Predicate::And(vec![Predicate::eq("a", 1i64), Predicate::eq("b", 2i64)])
        );

        let single = Predicate::Or(vec![Predicate::eq("a", 1i64)]);
        assert_eq!(rewrite(&single), Predicate::eq("a", 1i64));
    }
}

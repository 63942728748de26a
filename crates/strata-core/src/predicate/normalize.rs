use crate::predicate::Predicate;

///
/// Disjunctive normal form.
///
/// Rewrites a predicate into `OR(AND(leaf...), ...)`:
///
/// 1. NOT pushdown by De Morgan; negation on a comparison or IN leaf stays
///    on the leaf.
/// 2. AND-over-OR distribution, folding children left to right and
///    flattening nested conjunctions.
/// 3. A branch cap: when the top-level OR would exceed `max_branches`
///    disjuncts, the original predicate is returned unchanged and the
///    planner degrades to heuristic planning.
///
/// The normalizer is pure. Callers must not hand it an empty AND/OR
/// (structural validation happens before planning).
///

/// Normalize into DNF, or return the input unchanged when the disjunct
/// count would exceed `max_branches`.
#[must_use]
pub fn to_dnf(predicate: &Predicate, max_branches: usize) -> Predicate {
    let pushed = push_not(predicate, false);
    match distribute(&pushed, max_branches) {
        Some(branches) => rebuild(branches),
        None => predicate.clone(),
    }
}

/// Whether a predicate already has the `OR(AND(leaf...))` shape.
#[must_use]
pub fn is_dnf(predicate: &Predicate) -> bool {
    fn is_conjunct(predicate: &Predicate) -> bool {
        match predicate {
            Predicate::And(children) => children.iter().all(is_leaf),
            other => is_leaf(other),
        }
    }

    match predicate {
        Predicate::Or(children) => children.iter().all(is_conjunct),
        other => is_conjunct(other),
    }
}

fn is_leaf(predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare(_) | Predicate::In { .. } => true,
        Predicate::Not(inner) => matches!(**inner, Predicate::Compare(_) | Predicate::In { .. }),
        Predicate::And(_) | Predicate::Or(_) => false,
    }
}

/// Push negation down to the leaves.
fn push_not(predicate: &Predicate, negated: bool) -> Predicate {
    match predicate {
        Predicate::Not(inner) => push_not(inner, !negated),
        Predicate::And(children) => {
            let pushed = children.iter().map(|child| push_not(child, negated)).collect();
            if negated {
                Predicate::Or(pushed)
            } else {
                Predicate::And(pushed)
            }
        }
        Predicate::Or(children) => {
            let pushed = children.iter().map(|child| push_not(child, negated)).collect();
            if negated {
                Predicate::And(pushed)
            } else {
                Predicate::Or(pushed)
            }
        }
        leaf @ (Predicate::Compare(_) | Predicate::In { .. }) => {
            if negated {
                leaf.clone().negate()
            } else {
                leaf.clone()
            }
        }
    }
}

/// Disjuncts as conjunct lists, or `None` once the cap is exceeded.
fn distribute(predicate: &Predicate, max_branches: usize) -> Option<Vec<Vec<Predicate>>> {
    match predicate {
        leaf @ (Predicate::Compare(_) | Predicate::In { .. } | Predicate::Not(_)) => {
            Some(vec![vec![leaf.clone()]])
        }
        Predicate::Or(children) => {
            let mut branches = Vec::new();
            for child in children {
                branches.extend(distribute(child, max_branches)?);
                if branches.len() > max_branches {
                    return None;
                }
            }
            Some(branches)
        }
        Predicate::And(children) => {
            let mut branches: Vec<Vec<Predicate>> = vec![Vec::new()];
            for child in children {
                let child_branches = distribute(child, max_branches)?;
                let mut crossed = Vec::with_capacity(branches.len() * child_branches.len());
                for left in &branches {
                    for right in &child_branches {
                        let mut conjuncts = left.clone();
                        conjuncts.extend(right.iter().cloned());
                        crossed.push(conjuncts);
                    }
                }
                if crossed.len() > max_branches {
                    return None;
                }
                branches = crossed;
            }
            Some(branches)
        }
    }
}

fn rebuild(branches: Vec<Vec<Predicate>>) -> Predicate {
    let mut disjuncts: Vec<Predicate> = branches
        .into_iter()
        .map(|mut conjuncts| {
            if conjuncts.len() == 1 {
                conjuncts.remove(0)
            } else {
                Predicate::And(conjuncts)
            }
        })
        .collect();

    if disjuncts.len() == 1 {
        disjuncts.remove(0)
    } else {
        Predicate::Or(disjuncts)
    }
}

///
/// TESTS
///

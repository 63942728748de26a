use std::cmp::Ordering;
use std::ops::Bound;

///
/// Window
///
/// Interval over a totally ordered domain, built from one-sided or bounded
/// range conditions. Intersection takes the greater lower bound and the
/// smaller upper bound; a window is empty when its lower bound reaches or
/// passes its upper bound.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Window<T> {
    pub lower: Bound<T>,
    pub upper: Bound<T>,
}

impl<T> Window<T> {
    #[must_use]
    pub const fn new(lower: Bound<T>, upper: Bound<T>) -> Self {
        Self { lower, upper }
    }

    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    #[must_use]
    pub const fn at_least(value: T) -> Self {
        Self::new(Bound::Included(value), Bound::Unbounded)
    }

    #[must_use]
    pub const fn greater_than(value: T) -> Self {
        Self::new(Bound::Excluded(value), Bound::Unbounded)
    }

    #[must_use]
    pub const fn at_most(value: T) -> Self {
        Self::new(Bound::Unbounded, Bound::Included(value))
    }

    #[must_use]
    pub const fn less_than(value: T) -> Self {
        Self::new(Bound::Unbounded, Bound::Excluded(value))
    }
}

impl<T: Clone + Ord> Window<T> {
    /// Mathematical intersection of two windows.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            lower: tighter_lower(&self.lower, &other.lower),
            upper: tighter_upper(&self.upper, &other.upper),
        }
    }

    /// Fold a sequence of windows into their common intersection.
    #[must_use]
    pub fn intersect_all<'a>(windows: impl IntoIterator<Item = &'a Self>) -> Self
    where
        T: 'a,
    {
        windows
            .into_iter()
            .fold(Self::unbounded(), |acc, window| acc.intersect(window))
    }

    /// An empty window admits no value of the domain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let (Some(lower), Some(upper)) = (bound_value(&self.lower), bound_value(&self.upper))
        else {
            return false;
        };

        match lower.cmp(upper) {
            Ordering::Less => false,
            Ordering::Greater => true,
            Ordering::Equal => {
                !(matches!(self.lower, Bound::Included(_))
                    && matches!(self.upper, Bound::Included(_)))
            }
        }
    }

    /// Whether one value falls inside the window.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lower) => value >= lower,
            Bound::Excluded(lower) => value > lower,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(upper) => value <= upper,
            Bound::Excluded(upper) => value < upper,
        };
        above && below
    }
}

const fn bound_value<T>(bound: &Bound<T>) -> Option<&T> {
    match bound {
        Bound::Included(value) | Bound::Excluded(value) => Some(value),
        Bound::Unbounded => None,
    }
}

fn tighter_lower<T: Clone + Ord>(left: &Bound<T>, right: &Bound<T>) -> Bound<T> {
    match (bound_value(left), bound_value(right)) {
        (None, _) => right.clone(),
        (_, None) => left.clone(),
        (Some(a), Some(b)) => match a.cmp(b) {
            Ordering::Greater => left.clone(),
            Ordering::Less => right.clone(),
            // Equal values: exclusion is the tighter lower bound.
            Ordering::Equal => {
                if matches!(left, Bound::Excluded(_)) {
                    left.clone()
                } else {
                    right.clone()
                }
            }
        },
    }
}

fn tighter_upper<T: Clone + Ord>(left: &Bound<T>, right: &Bound<T>) -> Bound<T> {
    match (bound_value(left), bound_value(right)) {
        (None, _) => right.clone(),
        (_, None) => left.clone(),
        (Some(a), Some(b)) => match a.cmp(b) {
            Ordering::Less => left.clone(),
            Ordering::Greater => right.clone(),
            Ordering::Equal => {
                if matches!(left, Bound::Excluded(_)) {
                    left.clone()
                } else {
                    right.clone()
                }
            }
        },
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_takes_max_lower_min_upper() {
        let a = Window::at_least(10);
        let b = Window::less_than(20);
        let c = Window::new(Bound::Included(12), Bound::Included(30));

        let all = Window::intersect_all([&a, &b, &c]);
        assert_eq!(all, Window::new(Bound::Included(12), Bound::Excluded(20)));
        assert!(!all.is_empty());
        assert!(all.contains(&12));
        assert!(all.contains(&19));
        assert!(!all.contains(&20));
    }

    #[test]
    fn disjoint_ranges_intersect_to_empty() {
        let low = Window::less_than(10);
        let high = Window::greater_than(20);
        assert!(low.intersect(&high).is_empty());
    }

    #[test]
    fn touching_bounds_are_empty_unless_both_inclusive() {
        let half_open = Window::new(Bound::Included(5), Bound::Excluded(5));
        assert!(half_open.is_empty());

        let point = Window::new(Bound::Included(5), Bound::Included(5));
        assert!(!point.is_empty());
        assert!(point.contains(&5));

        let open = Window::new(Bound::Excluded(5), Bound::Included(5));
        assert!(open.is_empty());
    }

    #[test]
    fn exclusion_wins_ties_on_equal_bounds() {
        let inclusive = Window::at_least(7);
        let exclusive = Window::greater_than(7);
        assert_eq!(
            inclusive.intersect(&exclusive),
            Window::greater_than(7)
        );
    }

    #[test]
    fn unbounded_is_the_identity_of_intersection() {
        let window = Window::new(Bound::Excluded(1), Bound::Included(9));
        assert_eq!(window.intersect(&Window::unbounded()), window);
    }
}

use crate::error::Error;

///
/// PlannerConfig
///
/// Enumerated planner knobs. Ranges are validated once at engine
/// construction so planning never re-checks them.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Candidate generation cap (1..=100).
    pub max_candidate_plans: usize,
    /// Disjunct cap handed to the DNF normalizer (1..=50).
    pub max_dnf_branches: usize,
    /// Short-circuit obviously optimal plans and skip obviously poor ones.
    pub enable_heuristic_pruning: bool,
    /// IN predicates beyond this many values degrade to a filtered full
    /// scan (2..=1000).
    pub max_in_values: usize,
}

/// Preset values accepted for `max_candidate_plans`.
pub const CANDIDATE_PRESETS: [usize; 5] = [5, 10, 20, 50, 100];

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_candidate_plans: 20,
            max_dnf_branches: 16,
            enable_heuristic_pruning: true,
            max_in_values: 100,
        }
    }
}

impl PlannerConfig {
    #[must_use]
    pub const fn with_max_candidates(mut self, n: usize) -> Self {
        self.max_candidate_plans = n;
        self
    }

    #[must_use]
    pub const fn with_max_dnf_branches(mut self, n: usize) -> Self {
        self.max_dnf_branches = n;
        self
    }

    #[must_use]
    pub const fn with_max_in_values(mut self, n: usize) -> Self {
        self.max_in_values = n;
        self
    }

    #[must_use]
    pub const fn with_heuristic_pruning(mut self, enabled: bool) -> Self {
        self.enable_heuristic_pruning = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=100).contains(&self.max_candidate_plans) {
            return Err(Error::invalid_argument(
                "max_candidate_plans must lie in 1..=100",
            ));
        }
        if !(1..=50).contains(&self.max_dnf_branches) {
            return Err(Error::invalid_argument(
                "max_dnf_branches must lie in 1..=50",
            ));
        }
        if !(2..=1000).contains(&self.max_in_values) {
            return Err(Error::invalid_argument("max_in_values must lie in 2..=1000"));
        }
        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PlannerConfig::default().validate().expect("valid");
    }

    #[test]
    fn out_of_range_knobs_are_rejected() {
        let err = PlannerConfig::default()
            .with_max_candidates(0)
            .validate()
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);

        assert!(PlannerConfig::default().with_max_dnf_branches(51).validate().is_err());
        assert!(PlannerConfig::default().with_max_in_values(1).validate().is_err());
    }

    #[test]
    fn presets_are_all_valid() {
        for preset in CANDIDATE_PRESETS {
            PlannerConfig::default()
                .with_max_candidates(preset)
                .validate()
                .expect("preset valid");
        }
    }
}

//! Planner shape tests over the shared User fixture.

use crate::{
    error::ErrorKind,
    plan::{
        PlannerConfig, QueryFingerprint,
        cost::CostModel,
        node::{PhysicalPlan, ScanEdge},
        planner::Planner,
    },
    predicate::Predicate,
    query::{OrderDirection, Query},
    stats::NoStats,
    test_support::user_metadata,
    tuple::Value,
};

fn planner_with<'a>(
    metadata: &'a crate::model::RecordMetadata,
    config: &'a PlannerConfig,
    cost_model: &'a CostModel,
) -> Planner<'a> {
    Planner {
        metadata,
        stats: &NoStats,
        config,
        cost_model,
        reconstruction_capable: true,
    }
}

macro_rules! plan {
    ($spec:expr) => {{
        let metadata = user_metadata();
        let config = PlannerConfig::default();
        let cost_model = CostModel::default();
        planner_with(&metadata, &config, &cost_model)
            .plan_query(&$spec)
            .expect("plan")
            .plan
    }};
}

#[test]
fn empty_filter_plans_a_full_scan() {
    let plan = plan!(Query::new("User").build());
    let PhysicalPlan::FullScan(node) = &plan else {
        panic!("expected full scan, got {}", plan.describe());
    };
    assert_eq!(node.record_type.as_deref(), Some("User"));
    assert!(node.filter.is_none());
}

#[test]
fn equality_on_indexed_field_plans_an_index_scan() {
    let plan = plan!(Query::new("User").filter(Predicate::eq("city", "Tokyo")).build());
    let PhysicalPlan::IndexScan(node) = &plan else {
        panic!("expected index scan, got {}", plan.describe());
    };
    assert_eq!(node.index, "city_idx");
    assert_eq!(node.begin, ScanEdge::Values(vec![Value::Text("Tokyo".into())]));
    assert_eq!(node.end, ScanEdge::Prefix(vec![Value::Text("Tokyo".into())]));
    assert!(node.filter.is_none(), "exact scans need no post-filter");
}

#[test]
fn conjunction_of_two_indexed_fields_plans_an_intersection() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::eq("city", "Tokyo") & Predicate::gt("age", 25i64))
            .build()
    );
    let PhysicalPlan::Intersection(node) = &plan else {
        panic!("expected intersection, got {}", plan.describe());
    };
    assert_eq!(node.children.len(), 2);
    let scans: Vec<&str> = node
        .children
        .iter()
        .map(|child| {
            let PhysicalPlan::IndexScan(scan) = child else {
                panic!("intersection child must be an index scan");
            };
            scan.index.as_str()
        })
        .collect();
    assert!(scans.contains(&"city_idx"));
    assert!(scans.contains(&"age_idx"));
}

#[test]
fn disjunction_of_indexed_equalities_plans_a_union() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::eq("city", "Tokyo") | Predicate::eq("city", "Osaka"))
            .build()
    );
    let PhysicalPlan::Union(node) = &plan else {
        panic!("expected union, got {}", plan.describe());
    };
    assert_eq!(node.children.len(), 2);
}

#[test]
fn in_on_indexed_field_plans_an_in_join() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::is_in("age", vec![Value::Int(20), Value::Int(30)]))
            .build()
    );
    let PhysicalPlan::InJoin(node) = &plan else {
        panic!("expected IN-join, got {}", plan.describe());
    };
    assert_eq!(node.index, "age_idx");
    assert_eq!(node.values.len(), 2);
}

#[test]
fn oversized_in_degrades_to_a_filtered_full_scan() {
    let metadata = user_metadata();
    let config = PlannerConfig::default().with_max_in_values(2);
    let cost_model = CostModel::default();
    let spec = Query::new("User")
        .filter(Predicate::is_in(
            "age",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        ))
        .build();

    let plan = planner_with(&metadata, &config, &cost_model)
        .plan_query(&spec)
        .expect("plan")
        .plan;
    let PhysicalPlan::FullScan(node) = &plan else {
        panic!("expected full scan, got {}", plan.describe());
    };
    assert!(node.filter.is_some());
}

#[test]
fn single_value_in_collapses_to_an_equality_scan() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::is_in("city", vec![Value::Text("Tokyo".into())]))
            .build()
    );
    let PhysicalPlan::IndexScan(node) = &plan else {
        panic!("expected index scan, got {}", plan.describe());
    };
    assert_eq!(node.index, "city_idx");
}

#[test]
fn overlapping_ranges_merge_into_a_window_scan() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::gt("age", 25i64) & Predicate::lt("age", 35i64))
            .build()
    );
    let PhysicalPlan::IndexScan(node) = &plan else {
        panic!("expected index scan, got {}", plan.describe());
    };
    assert_eq!(node.index, "age_idx");
    assert!(node.window.is_some());
    assert_eq!(node.begin, ScanEdge::Prefix(vec![Value::Int(25)]));
    assert_eq!(node.end, ScanEdge::Values(vec![Value::Int(35)]));
}

#[test]
fn contradictory_ranges_plan_empty() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::gt("age", 35i64) & Predicate::lt("age", 25i64))
            .build()
    );
    assert_eq!(plan, PhysicalPlan::Empty);
}

#[test]
fn unique_equality_short_circuits_candidate_costing() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::eq("email", "u1@example.com") & Predicate::gt("age", 0i64))
            .build()
    );
    // The unique-index probe wins outright, residual filter preserved.
    let PhysicalPlan::IndexScan(node) = &plan else {
        panic!("expected index scan, got {}", plan.describe());
    };
    assert_eq!(node.index, "email_idx");
    assert!(node.filter.is_some());
}

#[test]
fn projection_covered_by_an_index_plans_a_covering_scan() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::eq("city", "Tokyo"))
            .select(vec!["city".to_string()])
            .build()
    );
    let PhysicalPlan::CoveringIndexScan(node) = &plan else {
        panic!("expected covering scan, got {}", plan.describe());
    };
    assert_eq!(node.scan.index, "city_idx");
}

#[test]
fn covering_requires_the_capability_flag() {
    let metadata = user_metadata();
    let config = PlannerConfig::default();
    let cost_model = CostModel::default();
    let mut planner = planner_with(&metadata, &config, &cost_model);
    planner.reconstruction_capable = false;

    let spec = Query::new("User")
        .filter(Predicate::eq("city", "Tokyo"))
        .select(vec!["city".to_string()])
        .build();
    let plan = planner.plan_query(&spec).expect("plan").plan;
    assert!(
        !matches!(plan, PhysicalPlan::CoveringIndexScan(_)),
        "got {}",
        plan.describe()
    );
}

#[test]
fn limit_wraps_the_selected_plan() {
    let plan = plan!(
        Query::new("User")
            .filter(Predicate::eq("city", "Tokyo"))
            .limit(3)
            .build()
    );
    let PhysicalPlan::Limit(node) = &plan else {
        panic!("expected limit, got {}", plan.describe());
    };
    assert_eq!(node.limit, 3);
}

#[test]
fn zero_limit_is_rejected() {
    let metadata = user_metadata();
    let config = PlannerConfig::default();
    let cost_model = CostModel::default();
    let mut spec = Query::new("User").filter(Predicate::eq("city", "Tokyo")).build();
    spec.limit = Some(0);

    let err = planner_with(&metadata, &config, &cost_model)
        .plan_query(&spec)
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn non_primary_key_order_is_rejected() {
    let metadata = user_metadata();
    let config = PlannerConfig::default();
    let cost_model = CostModel::default();
    let planner = planner_with(&metadata, &config, &cost_model);

    let by_pk = Query::new("User").order_by("id", OrderDirection::Asc).build();
    planner.plan_query(&by_pk).expect("pk order is satisfied");

    let by_age = Query::new("User").order_by("age", OrderDirection::Asc).build();
    let err = planner.plan_query(&by_age).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn dnf_blowup_falls_back_to_heuristic_shapes() {
    let metadata = user_metadata();
    let config = PlannerConfig::default().with_max_dnf_branches(3);
    let cost_model = CostModel::default();

    // (city=A | city=B) & (age>1 | age<0) would distribute into 4 branches.
    let spec = Query::new("User")
        .filter(Predicate::And(vec![
            Predicate::eq("city", "A") | Predicate::eq("city", "B"),
            Predicate::gt("age", 1i64) | Predicate::lt("age", 0i64),
        ]))
        .build();

    let plan = planner_with(&metadata, &config, &cost_model)
        .plan_query(&spec)
        .expect("plan")
        .plan;
    let PhysicalPlan::FullScan(node) = &plan else {
        panic!("expected full scan fallback, got {}", plan.describe());
    };
    assert!(node.filter.is_some());
}

#[test]
fn cached_shape_rebinds_to_live_literals() {
    let metadata = user_metadata();
    let config = PlannerConfig::default();
    let cost_model = CostModel::default();
    let planner = planner_with(&metadata, &config, &cost_model);

    let tokyo = Query::new("User").filter(Predicate::eq("city", "Tokyo")).build();
    let osaka = Query::new("User").filter(Predicate::eq("city", "Osaka")).build();
    assert_eq!(QueryFingerprint::of(&tokyo), QueryFingerprint::of(&osaka));

    let cached = planner.plan_query(&tokyo).expect("plan").plan;
    let bound = planner.bind(&cached, &osaka).expect("bind");

    let PhysicalPlan::IndexScan(node) = &bound else {
        panic!("expected index scan, got {}", bound.describe());
    };
    assert_eq!(node.begin, ScanEdge::Values(vec![Value::Text("Osaka".into())]));
}

#[test]
fn rebinding_a_window_scan_can_prove_emptiness() {
    let metadata = user_metadata();
    let config = PlannerConfig::default();
    let cost_model = CostModel::default();
    let planner = planner_with(&metadata, &config, &cost_model);

    let satisfiable = Query::new("User")
        .filter(Predicate::gt("age", 25i64) & Predicate::lt("age", 35i64))
        .build();
    let contradictory = Query::new("User")
        .filter(Predicate::gt("age", 35i64) & Predicate::lt("age", 25i64))
        .build();
    assert_eq!(
        QueryFingerprint::of(&satisfiable),
        QueryFingerprint::of(&contradictory)
    );

    let cached = planner.plan_query(&satisfiable).expect("plan").plan;
    let bound = planner.bind(&cached, &contradictory).expect("bind");
    assert_eq!(bound, PhysicalPlan::Empty);
}

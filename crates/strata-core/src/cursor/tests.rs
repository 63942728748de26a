//! Cursor behavior over the seeded in-memory store.

use crate::{
    cursor::{
        BoxedRecordCursor, ExecutionContext, FetchedRecord, FilterCursor, FullScanCursor,
        InJoinCursor, IndexScanCursor, IntersectionCursor, LimitCursor, RecordCursor, UnionCursor,
        VecCursor, collect_all,
    },
    error::{Error, ErrorKind},
    kv::IsolationLevel,
    plan::node::{FullScanNode, InJoinNode, IndexScanNode, ScanEdge},
    predicate::Predicate,
    test_support::{SeededStore, sample_users, seed_store, user},
    tuple::{Tuple, Value},
};

fn ctx(store: &SeededStore) -> ExecutionContext {
    ExecutionContext {
        kv: store.kv.clone(),
        access: store.access.clone(),
        metadata: store.metadata.clone(),
        layout: store.layout.clone(),
        isolation: IsolationLevel::Serializable,
    }
}

fn ids(fetched: &[FetchedRecord]) -> Vec<i64> {
    fetched
        .iter()
        .map(|item| {
            let Some(Value::Int(id)) = item.record.single("id") else {
                panic!("record has no int id");
            };
            *id
        })
        .collect()
}

fn index_scan(index: &str, begin: ScanEdge, end: ScanEdge) -> IndexScanNode {
    IndexScanNode {
        index: index.to_string(),
        record_type: "User".to_string(),
        begin,
        end,
        filter: None,
        pk_len: 1,
        window: None,
        source_leaves: Vec::new(),
        selectivity: 0.1,
    }
}

fn eq_scan(index: &str, value: Value) -> IndexScanNode {
    index_scan(
        index,
        ScanEdge::Values(vec![value.clone()]),
        ScanEdge::Prefix(vec![value]),
    )
}

fn fetched(id: i64, city: &str, age: i64) -> FetchedRecord {
    FetchedRecord {
        primary_key: Tuple::single(Value::Int(id)),
        record: user(id, city, age),
    }
}

#[tokio::test]
async fn full_scan_returns_records_in_primary_key_order() {
    let store = seed_store(&sample_users()).await.expect("seed");
    let cursor = FullScanCursor::new(
        ctx(&store),
        FullScanNode {
            record_type: Some("User".into()),
            filter: None,
        },
    );
    let all = collect_all(Box::new(cursor)).await.expect("scan");
    assert_eq!(ids(&all), vec![1, 2, 3]);
}

#[tokio::test]
async fn full_scan_applies_its_filter() {
    let store = seed_store(&sample_users()).await.expect("seed");
    let cursor = FullScanCursor::new(
        ctx(&store),
        FullScanNode {
            record_type: Some("User".into()),
            filter: Some(Predicate::contains("city", "saka")),
        },
    );
    let all = collect_all(Box::new(cursor)).await.expect("scan");
    assert_eq!(ids(&all), vec![3]);
}

#[tokio::test]
async fn index_scan_recovers_records_behind_equal_keys() {
    let store = seed_store(&sample_users()).await.expect("seed");
    let cursor = IndexScanCursor::new(
        ctx(&store),
        eq_scan("city_idx", Value::Text("Tokyo".into())),
    );
    let all = collect_all(Box::new(cursor)).await.expect("scan");
    assert_eq!(ids(&all), vec![1, 2]);
}

#[tokio::test]
async fn index_range_scan_emits_in_index_order() {
    let store = seed_store(&sample_users()).await.expect("seed");
    // age > 25: everything after the (25, *) prefix.
    let cursor = IndexScanCursor::new(
        ctx(&store),
        index_scan(
            "age_idx",
            ScanEdge::Prefix(vec![Value::Int(25)]),
            ScanEdge::SubspaceEnd,
        ),
    );
    let all = collect_all(Box::new(cursor)).await.expect("scan");
    assert_eq!(ids(&all), vec![2, 3]);
}

#[tokio::test]
async fn empty_range_scan_finishes_immediately() {
    let store = seed_store(&sample_users()).await.expect("seed");
    let cursor = IndexScanCursor::new(
        ctx(&store),
        eq_scan("city_idx", Value::Text("Kyoto".into())),
    );
    let all = collect_all(Box::new(cursor)).await.expect("scan");
    assert!(all.is_empty());
}

#[tokio::test]
async fn union_deduplicates_by_primary_key() {
    let left: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(1, "Tokyo", 20),
        fetched(2, "Tokyo", 30),
    ]));
    let right: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(2, "Tokyo", 30),
        fetched(3, "Osaka", 40),
    ]));

    let union = UnionCursor::new(vec![left, right]);
    let all = collect_all(Box::new(union)).await.expect("union");
    assert_eq!(ids(&all), vec![1, 2, 3]);
}

#[tokio::test]
async fn intersection_emits_only_shared_keys() {
    let left: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(1, "Tokyo", 20),
        fetched(2, "Tokyo", 30),
        fetched(3, "Osaka", 40),
    ]));
    let right: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(2, "Tokyo", 30),
        fetched(3, "Osaka", 40),
    ]));
    let third: BoxedRecordCursor = Box::new(VecCursor::new(vec![fetched(2, "Tokyo", 30)]));

    let intersection = IntersectionCursor::new(vec![left, right, third]);
    let all = collect_all(Box::new(intersection)).await.expect("intersection");
    assert_eq!(ids(&all), vec![2]);
}

#[tokio::test]
async fn intersection_detects_out_of_order_children() {
    let ordered: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(1, "Tokyo", 20),
        fetched(3, "Osaka", 40),
    ]));
    let disordered: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(3, "Osaka", 40),
        fetched(1, "Tokyo", 20),
    ]));

    let mut intersection = IntersectionCursor::new(vec![ordered, disordered]);
    let mut outcome: Result<Option<FetchedRecord>, Error> = Ok(None);
    loop {
        match intersection.next().await {
            Ok(None) => break,
            Ok(Some(_)) => {}
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    let err = outcome.expect_err("order violation must surface");
    assert_eq!(err.kind(), ErrorKind::Internal);

    // Fused after the error.
    assert!(intersection.next().await.expect("fused").is_none());
}

#[tokio::test]
async fn in_join_deduplicates_across_probes() {
    let store = seed_store(&sample_users()).await.expect("seed");
    let node = InJoinNode {
        index: "age_idx".into(),
        record_type: "User".into(),
        field: "age".into(),
        values: vec![Value::Int(20), Value::Int(30), Value::Int(20)],
        filter: None,
        pk_len: 1,
        source_leaves: Vec::new(),
        selectivity: 0.1,
    };
    let cursor = InJoinCursor::new(ctx(&store), node);
    let all = collect_all(Box::new(cursor)).await.expect("in-join");
    // The repeated 20 probe finds user 1 again; dedup keeps one copy.
    assert_eq!(ids(&all), vec![1, 2]);
}

#[tokio::test]
async fn limit_and_filter_wrap_any_cursor() {
    let base: BoxedRecordCursor = Box::new(VecCursor::new(vec![
        fetched(1, "Tokyo", 20),
        fetched(2, "Tokyo", 30),
        fetched(3, "Osaka", 40),
    ]));
    let filtered: BoxedRecordCursor = Box::new(FilterCursor::new(
        base,
        Predicate::eq("city", "Tokyo"),
    ));
    let mut limited = LimitCursor::new(filtered, 1);

    let first = limited.next().await.expect("next").expect("one record");
    assert_eq!(first.primary_key, Tuple::single(Value::Int(1)));
    assert!(limited.next().await.expect("next").is_none());
}

//! Shared fixtures: the User record type from the end-to-end scenarios,
//! plus a write path that keeps index subspaces consistent the way the
//! real maintainer would.

use crate::{
    aggregate::MemoryRankSet,
    error::Error,
    kv::{IsolationLevel, KvRead},
    model::{
        CborRecordCodec, FieldModel, IndexKind, IndexModel, KeyExpression, RecordAccess,
        RecordMetadata, RecordTypeModel, StoredRecord,
    },
    store::{MemoryKv, StoreLayout},
    tuple::{ScalarKind, Tuple, Value},
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) fn user_model() -> RecordTypeModel {
    RecordTypeModel::new(
        "User",
        KeyExpression::field("id"),
        vec![
            FieldModel::new("id", ScalarKind::Int),
            FieldModel::new("city", ScalarKind::Text),
            FieldModel::new("age", ScalarKind::Int),
            FieldModel::new("email", ScalarKind::Text),
        ],
        vec![
            IndexModel::value("age_idx", KeyExpression::field("age")),
            IndexModel::value("city_idx", KeyExpression::field("city"))
                .with_covering(vec!["city".to_string(), "id".to_string()]),
            IndexModel::value("email_idx", KeyExpression::field("email")).with_unique(),
            IndexModel::aggregate("count_by_city", IndexKind::Count, KeyExpression::field("city")),
            IndexModel::aggregate(
                "sum_age_by_city",
                IndexKind::Sum,
                KeyExpression::concat(vec![
                    KeyExpression::field("city"),
                    KeyExpression::field("age"),
                ]),
            ),
            IndexModel::rank("rank_by_age", KeyExpression::field("age"), 0),
            IndexModel::rank(
                "rank_age_by_city",
                KeyExpression::concat(vec![
                    KeyExpression::field("city"),
                    KeyExpression::field("age"),
                ]),
                1,
            ),
        ],
    )
}

pub(crate) fn user_metadata() -> RecordMetadata {
    let mut metadata = RecordMetadata::new();
    metadata.register(user_model()).expect("register User");
    metadata
}

pub(crate) fn user(id: i64, city: &str, age: i64) -> StoredRecord {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), vec![Value::Int(id)]);
    fields.insert("city".to_string(), vec![Value::Text(city.into())]);
    fields.insert("age".to_string(), vec![Value::Int(age)]);
    fields.insert(
        "email".to_string(),
        vec![Value::Text(format!("u{id}@example.com"))],
    );
    StoredRecord::new("User", fields)
}

/// The three-user dataset the end-to-end scenarios are written against.
pub(crate) fn sample_users() -> Vec<StoredRecord> {
    vec![user(1, "Tokyo", 20), user(2, "Tokyo", 30), user(3, "Osaka", 40)]
}

///
/// SeededStore
///
/// One in-memory store with records, value indexes, aggregate cells, and
/// rank sets all maintained atomically per record write.
///

pub(crate) struct SeededStore {
    pub kv: Arc<MemoryKv>,
    pub layout: StoreLayout,
    pub metadata: Arc<RecordMetadata>,
    pub access: Arc<CborRecordCodec>,
    pub rank: Arc<MemoryRankSet>,
}

pub(crate) async fn seed_store(records: &[StoredRecord]) -> Result<SeededStore, Error> {
    let store = SeededStore {
        kv: Arc::new(MemoryKv::new()),
        layout: StoreLayout::new(vec![0x15]),
        metadata: Arc::new(user_metadata()),
        access: Arc::new(CborRecordCodec),
        rank: Arc::new(MemoryRankSet::new()),
    };

    for record in records {
        write_record(&store, record).await?;
    }

    Ok(store)
}

async fn write_record(store: &SeededStore, record: &StoredRecord) -> Result<(), Error> {
    let model = store.metadata.record_type(record.record_type())?;
    let pk = model.primary_key_of(record)?;

    let bytes = store.access.serialize(record)?;
    store
        .kv
        .set(store.layout.record_key(&model.name, &pk), bytes)
        .await;

    for index in &model.indexes {
        match index.kind {
            IndexKind::Value => {
                let subspace = store.layout.index_subspace(&index.name);
                for tuple in index.root.evaluate(record)? {
                    let entry = tuple.concat(&pk);
                    store.kv.set(subspace.pack(&entry), Vec::new()).await;
                }
            }
            IndexKind::Count => {
                for group in index.root.evaluate(record)? {
                    bump_cell(store, &index.name, &group, 1).await?;
                }
            }
            IndexKind::Sum | IndexKind::Min | IndexKind::Max => {
                for tuple in index.root.evaluate(record)? {
                    let group = tuple.prefix(index.grouping_len)?;
                    let Some(Value::Int(value)) = tuple.elements().last() else {
                        return Err(Error::schema_mismatch(format!(
                            "aggregate index {} requires an int value column",
                            index.name
                        )));
                    };
                    match index.kind {
                        IndexKind::Sum => bump_cell(store, &index.name, &group, *value).await?,
                        IndexKind::Min => extremum_cell(store, &index.name, &group, *value, true).await?,
                        IndexKind::Max => extremum_cell(store, &index.name, &group, *value, false).await?,
                        _ => unreachable!("non-aggregate kinds were matched above"),
                    }
                }
            }
            IndexKind::Rank => {
                for tuple in index.root.evaluate(record)? {
                    let group = tuple.prefix(index.grouping_len)?;
                    let rank_value = tuple.elements()[index.grouping_len].clone();
                    store
                        .rank
                        .insert(&index.name, group, rank_value, pk.clone())
                        .await;
                }
            }
        }
    }

    Ok(())
}

async fn bump_cell(store: &SeededStore, index: &str, group: &Tuple, delta: i64) -> Result<(), Error> {
    let key = store.layout.index_subspace(index).pack(group);
    let current = read_cell(store, &key).await?;
    store
        .kv
        .set(key, (current + delta).to_le_bytes().to_vec())
        .await;
    Ok(())
}

async fn extremum_cell(
    store: &SeededStore,
    index: &str,
    group: &Tuple,
    value: i64,
    min: bool,
) -> Result<(), Error> {
    let key = store.layout.index_subspace(index).pack(group);
    let updated = match store.kv.get(&key, IsolationLevel::Snapshot).await? {
        None => value,
        Some(_) => {
            let current = read_cell(store, &key).await?;
            if min { current.min(value) } else { current.max(value) }
        }
    };
    store.kv.set(key, updated.to_le_bytes().to_vec()).await;
    Ok(())
}

async fn read_cell(store: &SeededStore, key: &[u8]) -> Result<i64, Error> {
    match store.kv.get(key, IsolationLevel::Snapshot).await? {
        None => Ok(0),
        Some(bytes) => {
            let bytes: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| Error::tuple_decode("aggregate cell is not 8 bytes"))?;
            Ok(i64::from_le_bytes(bytes))
        }
    }
}

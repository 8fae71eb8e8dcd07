//! Property tests for the request executor.

use proptest::prelude::*;
use shelfdb_codec::{Key, Value};
use shelfdb_core::{
    ConnectionPool, CursorPosition, DataType, DatabaseSchema, IndexSchema, KeyRange, ListItem, ListMethod, ListQuery,
    RecordRef, RequestExecutor, StoreSchema, TransactionMode,
};
use shelfdb_testkit::prelude::*;
use std::collections::BTreeMap;

fn records_by_id(records: &[Value]) -> BTreeMap<Key, Value> {
    records
        .iter()
        .map(|r| (Key::from_value(r.get("id").unwrap()).unwrap(), r.clone()))
        .collect()
}

fn tagged(pool: &ConnectionPool) -> shelfdb_core::Connection {
    pool.connect(
        "props",
        DatabaseSchema::versioned(
            1,
            vec![StoreSchema::with_key_path("items", "id").index(IndexSchema::new("by_tag", "tag"))],
        ),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn put_then_get_many_keeps_request_order(
        records in prop::collection::vec(record_strategy(), 0..40),
        lookups in prop::collection::vec(small_int_key_strategy(), 0..40),
    ) {
        let pool = ConnectionPool::in_memory();
        let conn = tagged(&pool);
        let written = conn.put_all("items", records.clone()).unwrap();
        prop_assert_eq!(written.len(), records.len());
        prop_assert!(!written.has_error());

        let expected = records_by_id(&records);
        let fetched = conn.get_all("items", &lookups).unwrap();
        prop_assert_eq!(fetched.len(), lookups.len());
        for (wanted, got) in lookups.iter().zip(fetched.items()) {
            prop_assert_eq!(got.as_ref().unwrap().as_ref(), expected.get(wanted));
        }
    }

    #[test]
    fn paged_listing_matches_one_shot_listing(
        records in prop::collection::vec(record_strategy(), 1..40),
        page in 1usize..7,
        reverse in any::<bool>(),
        unique in any::<bool>(),
    ) {
        let pool = ConnectionPool::in_memory();
        let conn = tagged(&pool);
        conn.put_all("items", records).unwrap();

        let mut query = ListQuery::new("items", ListMethod::KeyPairs).index("by_tag");
        if reverse {
            query = query.reverse();
        }
        if unique {
            query = query.unique();
        }
        let all = conn.list(&query.clone().limit(usize::MAX)).unwrap();

        let paged_query = query.limit(page);
        let mut position = CursorPosition::new();
        let mut paged: Vec<ListItem> = Vec::new();
        while !position.is_exhausted() {
            let items = conn.list_from(&paged_query, &mut position).unwrap();
            prop_assert!(items.len() <= page);
            paged.extend(items);
        }
        prop_assert_eq!(paged, all);
    }

    #[test]
    fn counts_agree_with_listing(
        records in prop::collection::vec(record_strategy(), 0..40),
        range in int_range_strategy(),
    ) {
        let pool = ConnectionPool::in_memory();
        let conn = tagged(&pool);
        conn.put_all("items", records.clone()).unwrap();
        let expected = records_by_id(&records).keys().filter(|k| range.contains(k)).count();

        let counted = conn
            .run(&["items"], TransactionMode::ReadOnly, |tx| {
                conn.executor().count_key_range(tx, "items", Some(&range), None, false)
            })
            .unwrap();
        prop_assert_eq!(counted, expected);

        let listed = conn
            .list(&ListQuery::new("items", ListMethod::PrimaryKeys).range(range.clone()).limit(usize::MAX))
            .unwrap();
        prop_assert_eq!(listed.len(), expected);
    }

    #[test]
    fn removing_a_range_leaves_the_rest(
        records in prop::collection::vec(record_strategy(), 0..40),
        range in int_range_strategy(),
    ) {
        let pool = ConnectionPool::in_memory();
        let conn = tagged(&pool);
        conn.put_all("items", records.clone()).unwrap();
        let before = records_by_id(&records);

        let removed = conn
            .run(&["items"], TransactionMode::ReadWrite, |tx| {
                conn.executor().remove_by_key_range(tx, "items", &range)
            })
            .unwrap();
        prop_assert_eq!(removed, before.keys().filter(|k| range.contains(k)).count());
        prop_assert_eq!(conn.count("items").unwrap(), before.len() - removed);
        for key in before.keys() {
            prop_assert_eq!(conn.get("items", key.clone()).unwrap().is_some(), !range.contains(key));
        }
    }
}

#[test]
fn refs_span_stores_in_one_transaction() {
    let pool = ConnectionPool::in_memory();
    let conn = pool
        .connect(
            "refs",
            DatabaseSchema::versioned(1, vec![StoreSchema::new("left"), StoreSchema::with_key_path("right", "id")]),
        )
        .unwrap();

    let written = conn
        .run(&["left", "right"], TransactionMode::ReadWrite, |tx| {
            conn.executor().put_by_refs(
                tx,
                vec![
                    (RecordRef::new("left", "a"), Value::from("first")),
                    (RecordRef::new("right", 1), Value::object([("id", Value::from(1))])),
                    (RecordRef::new("right", 2), Value::object([("id", Value::from(3))])),
                ],
            )
        })
        .unwrap();
    assert!(written.get(0).unwrap().is_ok());
    assert!(written.get(1).unwrap().is_ok());
    assert!(written.get(2).unwrap().is_err());

    let fetched = conn
        .run(&["left", "right"], TransactionMode::ReadOnly, |tx| {
            conn.executor()
                .get_by_refs(tx, &[RecordRef::new("right", 1), RecordRef::new("left", "a"), RecordRef::new("left", "b")])
        })
        .unwrap();
    let values: Vec<_> = fetched.into_items().into_iter().map(Result::unwrap).collect();
    assert_eq!(values[1], Some(Value::from("first")));
    assert!(values[0].is_some());
    assert!(values[2].is_none());
}

#[test]
fn load_then_dump_by_index() {
    with_temp_pool(|pool| {
        let conn = pool
            .connect(
                "people",
                DatabaseSchema::versioned(
                    1,
                    vec![StoreSchema::with_key_path("people", "id")
                        .key_type(DataType::Text)
                        .index(IndexSchema::new("age", "age").data_type(DataType::Integer))],
                ),
            )
            .unwrap();
        let keys = conn
            .load("people", "id,name,age\n\"p1\",\"Ann\",41\n\"p2\",\"Bob\",29\n\n\"p3\",\"Cid\",35\n", ',')
            .unwrap();
        assert_eq!(keys, vec![Key::from("p1"), Key::from("p2"), Key::from("p3")]);

        let names: Vec<Value> = conn
            .list(&ListQuery::new("people", ListMethod::Values).index("age").limit(10))
            .unwrap()
            .into_iter()
            .filter_map(|item| item.into_value().and_then(|v| v.get("name").cloned()))
            .collect();
        assert_eq!(names, vec![Value::from("\"Bob\""), Value::from("\"Cid\""), Value::from("\"Ann\"")]);

        let older = conn
            .run(&["people"], TransactionMode::ReadOnly, |tx| {
                conn.executor()
                    .count_key_range(tx, "people", Some(&KeyRange::lower_bound(30, false)), Some("age"), false)
            })
            .unwrap();
        assert_eq!(older, 2);
    });
}

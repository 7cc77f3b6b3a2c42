//! PostgreSQL integration tests.
//!
//! All tests share one PostgreSQL container; each test truncates the events
//! table, so the suite is serialized with `#[serial]`.

use std::sync::Arc;

use event_store::{
    AggregateId, EventEnvelope, EventStore, EventStoreError, PostgresEventStore, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_events_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn test_event(aggregate_id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
    EventEnvelope::new(
        aggregate_id,
        "User",
        event_type,
        Version::new(version),
        serde_json::json!({"test": true}),
    )
}

#[tokio::test]
#[serial]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let new_version = store
        .append(
            vec![test_event(aggregate_id, 1, "UserRegistered")],
            Version::initial(),
        )
        .await
        .unwrap();
    assert_eq!(new_version, Version::first());

    let events = store.get_events(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "UserRegistered");
    assert_eq!(events[0].version, Version::first());
}

#[tokio::test]
#[serial]
async fn append_batch_is_atomic_and_ordered() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let events = vec![
        test_event(aggregate_id, 1, "Event1"),
        test_event(aggregate_id, 2, "Event2"),
        test_event(aggregate_id, 3, "Event3"),
    ];

    let new_version = store.append(events, Version::initial()).await.unwrap();
    assert_eq!(new_version, Version::new(3));

    let stored = store.get_events(aggregate_id).await.unwrap();
    assert_eq!(stored.len(), 3);
    for (i, event) in stored.iter().enumerate() {
        assert_eq!(event.version, Version::new(i as i64 + 1));
    }
}

#[tokio::test]
#[serial]
async fn stale_writer_gets_conflict_and_store_is_unchanged() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(vec![test_event(aggregate_id, 1, "EventA")], Version::initial())
        .await
        .unwrap();
    store
        .append(vec![test_event(aggregate_id, 2, "EventB")], Version::first())
        .await
        .unwrap();

    // This writer still thinks the aggregate is at version 1.
    let result = store
        .append(vec![test_event(aggregate_id, 2, "EventC")], Version::first())
        .await;

    match result {
        Err(EventStoreError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, Version::first());
            assert_eq!(actual, Version::new(2));
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }

    let events = store.get_events(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
#[serial]
async fn concurrent_appends_have_exactly_one_winner() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(vec![test_event(aggregate_id, 1, "EventA")], Version::initial())
        .await
        .unwrap();

    let x = store.clone();
    let y = store.clone();
    let handle_x = tokio::spawn(async move {
        x.append(vec![test_event(aggregate_id, 2, "EventB")], Version::first())
            .await
    });
    let handle_y = tokio::spawn(async move {
        y.append(vec![test_event(aggregate_id, 2, "EventC")], Version::first())
            .await
    });

    let results = [handle_x.await.unwrap(), handle_y.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(EventStoreError::ConcurrencyConflict { .. })))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(store.get_events(aggregate_id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn sequential_appends_produce_gap_free_history() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let mut version = Version::initial();
    for batch in 0..5 {
        let events: Vec<_> = (0..3)
            .map(|i| {
                test_event(
                    aggregate_id,
                    version.as_i64() + i + 1,
                    &format!("Event{batch}"),
                )
            })
            .collect();
        version = store.append(events, version).await.unwrap();
    }

    let events = store.get_events(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 15);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.version, Version::new(i as i64 + 1));
    }
}

#[tokio::test]
#[serial]
async fn get_events_from_version() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let events: Vec<_> = (1..=5)
        .map(|v| test_event(aggregate_id, v, "Event"))
        .collect();
    store.append(events, Version::initial()).await.unwrap();

    let tail = store
        .get_events_from(aggregate_id, Version::new(3))
        .await
        .unwrap();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].version, Version::new(3));
}

#[tokio::test]
#[serial]
async fn get_events_by_type() {
    let store = get_test_store().await;
    let id1 = AggregateId::new();
    let id2 = AggregateId::new();

    store
        .append(vec![test_event(id1, 1, "UserRegistered")], Version::initial())
        .await
        .unwrap();
    store
        .append(vec![test_event(id2, 1, "UserRegistered")], Version::initial())
        .await
        .unwrap();
    store
        .append(vec![test_event(id1, 2, "UserDeactivated")], Version::first())
        .await
        .unwrap();

    let registered = store.get_events_by_type("UserRegistered").await.unwrap();
    assert_eq!(registered.len(), 2);

    let deactivated = store.get_events_by_type("UserDeactivated").await.unwrap();
    assert_eq!(deactivated.len(), 1);
}

#[tokio::test]
#[serial]
async fn stream_all_events_in_global_append_order() {
    use futures_util::StreamExt;

    let store = get_test_store().await;
    let id1 = AggregateId::new();
    let id2 = AggregateId::new();

    store
        .append(vec![test_event(id1, 1, "First")], Version::initial())
        .await
        .unwrap();
    store
        .append(vec![test_event(id2, 1, "Second")], Version::initial())
        .await
        .unwrap();
    store
        .append(vec![test_event(id1, 2, "Third")], Version::first())
        .await
        .unwrap();

    let stream = store.stream_all_events().await.unwrap();
    let types: Vec<_> = stream.map(|r| r.unwrap().event_type).collect().await;
    assert_eq!(types, vec!["First", "Second", "Third"]);
}

#[tokio::test]
#[serial]
async fn current_version_for_unknown_aggregate_is_none() {
    let store = get_test_store().await;
    let version = store.current_version(AggregateId::new()).await.unwrap();
    assert!(version.is_none());
}

#[tokio::test]
#[serial]
async fn payload_survives_roundtrip() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let payload = serde_json::json!({
        "user_id": aggregate_id.to_string(),
        "name": "Ada Lovelace",
        "email": "ada@example.com"
    });
    let event = EventEnvelope::new(
        aggregate_id,
        "User",
        "UserRegistered",
        Version::first(),
        payload.clone(),
    );
    let event_id = event.event_id;

    store.append(vec![event], Version::initial()).await.unwrap();

    let events = store.get_events(aggregate_id).await.unwrap();
    assert_eq!(events[0].event_id, event_id);
    assert_eq!(events[0].payload, payload);
}

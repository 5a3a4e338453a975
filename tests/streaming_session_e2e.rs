use async_trait::async_trait;
use geotax::application::services::import_engine::ImportEngine;
use geotax::application::services::import_service::ImportService;
use geotax::application::services::order_pricer::OrderPricer;
use geotax::application::services::order_service::OrderService;
use geotax::application::services::session_registry::SessionRegistry;
use geotax::domain::entities::import_session::{ImportEvent, SessionId};
use geotax::domain::entities::order::RawRow;
use geotax::domain::errors::{ImportError, RowError};
use geotax::domain::repositories::order_store::OrderStore;
use geotax::domain::services::jurisdiction_resolver::{
    BoundingBoxResolver, JurisdictionResolver, Resolution,
};
use geotax::domain::value_objects::coordinates::Coordinates;
use geotax::persistence::init_database_at;
use geotax::persistence::repository::OrderRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bounding-box resolution with an artificial delay, so a cancel request
/// reliably lands while the import is still running.
struct SlowResolver {
    delay: Duration,
}

#[async_trait]
impl JurisdictionResolver for SlowResolver {
    async fn resolve(&self, point: Coordinates) -> Result<Resolution, RowError> {
        tokio::time::sleep(self.delay).await;
        BoundingBoxResolver::new().resolve(point).await
    }
}

struct Harness {
    store: Arc<OrderRepository>,
    orders: OrderService,
    imports: ImportService,
}

async fn harness(delay: Duration) -> Harness {
    let pool = init_database_at("sqlite::memory:").await.unwrap();
    let store = Arc::new(OrderRepository::new(pool));
    let pricer = Arc::new(OrderPricer::new(Arc::new(SlowResolver { delay })));
    let engine = Arc::new(ImportEngine::new(pricer.clone(), store.clone()).with_chunk_size(2));
    Harness {
        store: store.clone(),
        orders: OrderService::new(pricer, store),
        imports: ImportService::new(engine, Arc::new(SessionRegistry::new())),
    }
}

fn rows(ids: std::ops::RangeInclusive<i64>) -> Vec<RawRow> {
    ids.map(|id| RawRow::new(&id.to_string(), "40.7128", "-74.0060", "120.00"))
        .collect()
}

async fn drain(rx: &mut mpsc::Receiver<ImportEvent>) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_completed_stream_reports_every_row() {
    let h = harness(Duration::from_millis(1)).await;
    let (session_id, mut rx) = h.imports.start_streaming_import(rows(1..=5)).await;

    let events = drain(&mut rx).await;

    assert_eq!(events[0], ImportEvent::Session { session_id });
    let processed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::Progress { processed, .. } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![1, 2, 3, 4, 5]);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(
        events.last(),
        Some(ImportEvent::Done {
            success: 5,
            failed: 0,
            ..
        })
    ));
    assert_eq!(h.store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_progress_flags_match_final_counts_on_mixed_batch() {
    let h = harness(Duration::from_millis(1)).await;
    let batch = vec![
        RawRow::new("1", "40.7128", "-74.0060", "120.00"),
        RawRow::new("2", "40.7128", "-74.0060", "-5"),
        RawRow::new("3", "34.0522", "-118.2437", "10.00"),
        RawRow::new("4", "42.8864", "-78.8784", "19.99"),
        RawRow::new("", "40.7128", "-74.0060", "10.00"),
    ];

    let (_, mut rx) = h.imports.start_streaming_import(batch).await;
    let events = drain(&mut rx).await;

    let flags: Vec<(usize, String, bool)> = events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::Progress { processed, id, ok } => Some((*processed, id.clone(), *ok)),
            _ => None,
        })
        .collect();
    assert_eq!(
        flags,
        vec![
            (1, "1".to_string(), true),
            (2, "2".to_string(), false),
            (3, "3".to_string(), false),
            (4, "4".to_string(), true),
            (5, "?".to_string(), false),
        ]
    );

    let ok_count = flags.iter().filter(|(_, _, ok)| *ok).count();
    let failed_count = flags.len() - ok_count;
    match events.last() {
        Some(ImportEvent::Done {
            success,
            failed,
            errors,
        }) => {
            assert_eq!(*success, ok_count);
            assert_eq!(*failed, failed_count);
            let rows: Vec<usize> = errors.iter().map(|e| e.row).collect();
            assert_eq!(rows, vec![2, 3, 5]);
        }
        other => panic!("expected done, got {:?}", other),
    }
    assert_eq!(h.store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_cancel_rolls_back_session_inserts_but_keeps_updates() {
    let h = harness(Duration::from_millis(40)).await;

    // Orders 1 and 2 exist before the import and must survive cancellation.
    for id in 1..=2 {
        h.orders
            .create_order(&RawRow::new(&id.to_string(), "40.7128", "-74.0060", "10.00"))
            .await
            .unwrap();
    }

    let (session_id, mut rx) = h.imports.start_streaming_import(rows(1..=12)).await;
    let first = rx.recv().await.unwrap();
    assert_eq!(
        first,
        ImportEvent::Session {
            session_id: session_id.clone()
        }
    );

    h.imports.cancel_session(&session_id).await.unwrap();
    // A second cancel while the session is live is harmless.
    h.imports.cancel_session(&session_id).await.unwrap();

    let events = drain(&mut rx).await;
    let terminal = events.last().cloned().unwrap();
    let rolled_back = match terminal {
        ImportEvent::Cancelled {
            rolled_back,
            error: None,
        } => rolled_back,
        other => panic!("expected cancellation, got {:?}", other),
    };
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let progressed = events
        .iter()
        .filter(|e| matches!(e, ImportEvent::Progress { .. }))
        .count();
    assert!(progressed < 12);

    // Everything still stored predates the session.
    assert_eq!(h.store.count().await.unwrap(), 2);
    for id in 1..=2 {
        let survivor = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(survivor.import_session, None);
    }
    assert_eq!(rolled_back as usize, progressed.saturating_sub(2));

    assert!(matches!(
        h.imports.cancel_session(&session_id).await,
        Err(ImportError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_cancelling_one_session_leaves_others_running() {
    let h = harness(Duration::from_millis(20)).await;

    let (first_id, mut first_rx) = h.imports.start_streaming_import(rows(100..=105)).await;
    let (_, mut second_rx) = h.imports.start_streaming_import(rows(200..=205)).await;

    h.imports.cancel_session(&first_id).await.unwrap();

    let (first, second) = tokio::join!(drain(&mut first_rx), drain(&mut second_rx));
    assert!(matches!(first.last(), Some(ImportEvent::Cancelled { .. })));
    assert!(matches!(
        second.last(),
        Some(ImportEvent::Done { success: 6, .. })
    ));

    for id in 100..=105 {
        assert!(!h.store.exists(id).await.unwrap());
    }
    for id in 200..=205 {
        assert!(h.store.exists(id).await.unwrap());
    }
}

#[tokio::test]
async fn test_cancel_unknown_session() {
    let h = harness(Duration::from_millis(1)).await;
    let err = h
        .imports
        .cancel_session(&SessionId::from("never-started"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Import session not found: never-started");
}

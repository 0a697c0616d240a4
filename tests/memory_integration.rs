//! Memory provider integration tests
//!
//! End-to-end tests exercising the full AuditPipeline lifecycle with the
//! in-memory backends. Covers provisioning idempotence, polling, failure
//! handling, export content, notification, and readiness.

use a3s_audit::provider::memory::{MemoryObjectStore, MemoryQueryEngine, StaticIdentity};
use a3s_audit::{
    AggregationOutcome, AuditError, AuditPipeline, MemoryNotifier, PipelineConfig, QueryState,
    RequestType, ResultSet, SchemaOutcome, SchemaReport, SetupOutcome, SetupStatus,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const DB: &str = "fss_pricing_trend";
const TABLE: &str = "cloudtrail_logs_fss_pricing";
const EXPORT_KEY: &str = "estadisticas/query_results.csv";

struct Harness {
    engine: Arc<MemoryQueryEngine>,
    store: Arc<MemoryObjectStore>,
    pipeline: AuditPipeline,
}

fn harness(engine: MemoryQueryEngine) -> Harness {
    let config = PipelineConfig::from_vars([
        ("TRAIL_BUCKET", "filestorage-events"),
        ("ATHENA_BUCKET", "athena-results"),
    ])
    .unwrap();

    let engine = Arc::new(engine);
    let store = Arc::new(MemoryObjectStore::new());
    let pipeline = AuditPipeline::new(
        config,
        engine.clone(),
        store.clone(),
        Arc::new(StaticIdentity::new("123456789012")),
    );

    Harness {
        engine,
        store,
        pipeline,
    }
}

fn usage_rows() -> ResultSet {
    ResultSet::from_text(vec![
        vec!["totalevent", "eventname", "eventhour", "bkt"],
        vec!["3", "PutObject", "2024010110", "my-bucket"],
    ])
}

// ─── Schema Provisioning ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_setup_from_scratch() {
    let h = harness(MemoryQueryEngine::new().with_default_script(vec![
        QueryState::Queued,
        QueryState::Succeeded,
    ]));
    let notifier = MemoryNotifier::new();

    let outcome = h
        .pipeline
        .setup(RequestType::Create, &notifier)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SetupOutcome::Provisioned(SchemaReport {
            outcome: SchemaOutcome::Created,
            catalog_created: true,
        })
    );
    assert_eq!(h.engine.submitted_matching("CREATE DATABASE"), 1);
    assert_eq!(h.engine.submitted_matching("CREATE EXTERNAL TABLE"), 1);
    for request in h.engine.submitted() {
        assert_eq!(request.output_location, "s3://athena-results/logs/");
    }
    assert!(h.engine.has_catalog(DB));
    assert_eq!(h.engine.table_count(DB), 1);

    let ddl = &h.engine.submitted()[1].query;
    assert!(ddl.contains("LOCATION 's3://filestorage-events/AWSLogs/'"));
}

#[tokio::test]
async fn test_setup_is_idempotent() {
    let h = harness(MemoryQueryEngine::new());
    let notifier = MemoryNotifier::new();

    let first = assert_ok!(h.pipeline.setup(RequestType::Create, &notifier).await);
    let second = assert_ok!(h.pipeline.setup(RequestType::Update, &notifier).await);

    assert_eq!(first.as_str(), "created");
    assert_eq!(second.as_str(), "already_exists");
    assert_eq!(h.engine.table_count(DB), 1);
    assert_eq!(h.engine.submitted_matching("CREATE DATABASE"), 1);
    assert_eq!(h.engine.submitted_matching("CREATE EXTERNAL TABLE"), 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|n| n.status == SetupStatus::Success));
}

#[tokio::test]
async fn test_setup_with_everything_present_submits_nothing() {
    let h = harness(MemoryQueryEngine::new().with_catalog(DB).with_table(DB, TABLE));
    let notifier = MemoryNotifier::new();

    let outcome = assert_ok!(h.pipeline.setup(RequestType::Create, &notifier).await);

    assert_eq!(outcome.as_str(), "already_exists");
    assert_eq!(h.engine.submitted_matching("CREATE DATABASE"), 0);
    assert_eq!(h.engine.submitted_matching("CREATE EXTERNAL TABLE"), 0);
    assert_eq!(notifier.sent()[0].data["result"], "success");
}

#[tokio::test]
async fn test_setup_lookup_failure_reports_failed() {
    let h = harness(MemoryQueryEngine::new().with_catalog(DB));
    h.engine.fail_lookups("AccessDeniedException: glue:GetTable");
    let notifier = MemoryNotifier::new();

    let err = assert_err!(h.pipeline.setup(RequestType::Create, &notifier).await);

    assert!(matches!(err, AuditError::Lookup { .. }));
    assert_eq!(h.engine.submitted_matching("CREATE EXTERNAL TABLE"), 0);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, SetupStatus::Failed);
    assert!(sent[0].reason.as_deref().unwrap().contains("AccessDeniedException"));
}

#[tokio::test]
async fn test_setup_failed_table_creation_sends_no_success() {
    let h = harness(MemoryQueryEngine::new().with_catalog(DB));
    h.engine.push_script(vec![QueryState::Failed]);
    let notifier = MemoryNotifier::new();

    assert_err!(h.pipeline.setup(RequestType::Create, &notifier).await);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_ne!(sent[0].status, SetupStatus::Success);
}

// ─── Aggregation ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_aggregate_after_setup() {
    let h = harness(MemoryQueryEngine::new().with_results(usage_rows()));
    let notifier = MemoryNotifier::new();
    h.pipeline.setup(RequestType::Create, &notifier).await.unwrap();

    h.engine.push_script(vec![
        QueryState::Queued,
        QueryState::Running,
        QueryState::Running,
        QueryState::Succeeded,
    ]);
    let polls_before = h.engine.poll_count();

    let outcome = h.pipeline.aggregate().await.unwrap();

    assert_eq!(h.engine.poll_count() - polls_before, 4);
    let artifact = outcome.artifact().unwrap();
    assert_eq!(artifact.bucket, "athena-results");
    assert_eq!(artifact.key, EXPORT_KEY);
    assert_eq!(
        h.store.get_text("athena-results", EXPORT_KEY).unwrap(),
        "totalevent,eventname,eventhour,bkt\r\n3,PutObject,2024010110,my-bucket\r\n"
    );
    assert_eq!(
        h.engine.execution_state(&artifact.execution_id),
        Some(QueryState::Succeeded)
    );
}

#[tokio::test]
async fn test_aggregate_before_setup_is_not_ready() {
    let h = harness(MemoryQueryEngine::new().with_results(usage_rows()));

    let outcome = h.pipeline.aggregate().await.unwrap();

    assert!(matches!(outcome, AggregationOutcome::NotReady { .. }));
    assert!(h.engine.submitted().is_empty());
    assert!(h.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_aggregate_failure_writes_nothing() {
    let h = harness(
        MemoryQueryEngine::new()
            .with_catalog(DB)
            .with_table(DB, TABLE)
            .with_results(usage_rows()),
    );
    h.engine.push_script(vec![QueryState::Running, QueryState::Failed]);

    let err = h.pipeline.aggregate().await.unwrap_err();

    assert!(err.is_query_outcome());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_aggregate_rerun_overwrites_export() {
    let h = harness(
        MemoryQueryEngine::new()
            .with_catalog(DB)
            .with_table(DB, TABLE)
            .with_results(usage_rows()),
    );

    h.pipeline.aggregate().await.unwrap();
    h.pipeline.aggregate().await.unwrap();

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.engine.submitted().len(), 2);
}

// ─── Delete ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_keeps_table_usable() {
    let h = harness(MemoryQueryEngine::new().with_results(usage_rows()));
    let notifier = MemoryNotifier::new();

    h.pipeline.setup(RequestType::Create, &notifier).await.unwrap();
    let outcome = h.pipeline.setup(RequestType::Delete, &notifier).await.unwrap();

    assert_eq!(outcome, SetupOutcome::Retained);
    assert_eq!(h.engine.table_count(DB), 1);
    assert!(h.pipeline.aggregate().await.unwrap().artifact().is_some());
}

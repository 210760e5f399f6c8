// tests/snapshot.rs
mod common;

use std::sync::Arc;
use tempfile::tempdir;

use common::{aapl_fetcher, catalog, config, ScriptedFetcher};
use dcf_dashboard::error::SnapshotError;
use dcf_dashboard::models::{Percent, ValuationParameters};
use dcf_dashboard::services::fin_report::StatementIngestor;
use dcf_dashboard::services::snapshot::{
    AnalysisMode, SnapshotPolicy, SnapshotSession, DEFAULT_SNAPSHOT_ID,
};
use dcf_dashboard::services::store::{FileStore, KeyValueStore};

async fn policy(root: &std::path::Path) -> (SnapshotPolicy, Arc<ScriptedFetcher>) {
    let fetcher = Arc::new(aapl_fetcher());
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(root).await.unwrap());
    let ingestor = StatementIngestor::new(fetcher.clone(), Arc::new(catalog()), store.clone(), &config());
    (SnapshotPolicy::new(Arc::new(ingestor), store), fetcher)
}

fn parameters(cost_of_capital: f64) -> ValuationParameters {
    ValuationParameters {
        cost_of_capital: Percent(cost_of_capital),
        ..ValuationParameters::default()
    }
}

#[tokio::test]
async fn saved_bundle_reads_back_byte_identical() {
    let dir = tempdir().unwrap();
    let (policy, _) = policy(dir.path()).await;
    let session = SnapshotSession::restore("AAPL", AnalysisMode::Live, DEFAULT_SNAPSHOT_ID);

    let saved = policy.save(&session, &parameters(9.0)).await.unwrap();
    assert_eq!(saved.ticker, "AAPL");
    assert_eq!(saved.snapshot_id, DEFAULT_SNAPSHOT_ID);

    let first = policy
        .read_bundle_bytes("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();
    let second = policy
        .read_bundle_bytes("aapl", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, second);

    let bundle = policy
        .read_bundle("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bundle.saved_at, saved.saved_at);
    assert_eq!(bundle.record, saved.record);
    assert_eq!(bundle.projection.formatted(), saved.projection.formatted());
}

#[tokio::test]
async fn snapshot_mode_falls_back_to_live_without_a_bundle() {
    let dir = tempdir().unwrap();
    let (policy, _) = policy(dir.path()).await;
    let session = SnapshotSession::restore("AAPL", AnalysisMode::Snapshot, DEFAULT_SNAPSHOT_ID);

    let evaluation = policy.evaluate(&session, &parameters(9.0)).await.unwrap();
    assert!(!evaluation.from_snapshot);
    assert_eq!(evaluation.bundle.parameters.cost_of_capital, Percent(9.0));
    assert!(policy
        .read_bundle("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn snapshot_mode_serves_the_saved_bundle() {
    let dir = tempdir().unwrap();
    let (policy, fetcher) = policy(dir.path()).await;
    let live = SnapshotSession::restore("AAPL", AnalysisMode::Live, DEFAULT_SNAPSHOT_ID);
    let saved = policy.save(&live, &parameters(9.0)).await.unwrap();
    let calls = fetcher.calls();

    let snapshot = SnapshotSession::restore("AAPL", AnalysisMode::Snapshot, DEFAULT_SNAPSHOT_ID);
    // different parameters on the form do not change a saved snapshot
    let evaluation = policy.evaluate(&snapshot, &parameters(12.0)).await.unwrap();
    assert!(evaluation.from_snapshot);
    assert_eq!(evaluation.bundle.saved_at, saved.saved_at);
    assert_eq!(evaluation.bundle.parameters.cost_of_capital, Percent(9.0));
    assert_eq!(fetcher.calls(), calls);
}

#[tokio::test]
async fn saving_outside_live_mode_is_refused() {
    let dir = tempdir().unwrap();
    let (policy, fetcher) = policy(dir.path()).await;
    let session = SnapshotSession::restore("AAPL", AnalysisMode::Snapshot, DEFAULT_SNAPSHOT_ID);

    let err = policy.save(&session, &parameters(9.0)).await.unwrap_err();
    assert!(matches!(err, SnapshotError::NotLive));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn snapshot_mode_reuses_the_saved_cost_of_capital() {
    let dir = tempdir().unwrap();
    let (policy, _) = policy(dir.path()).await;
    let live = SnapshotSession::restore("AAPL", AnalysisMode::Live, DEFAULT_SNAPSHOT_ID);
    policy.save(&live, &parameters(9.25)).await.unwrap();

    let report = policy
        .ingestor()
        .fetch_statement_record_cached("AAPL")
        .await
        .unwrap();
    let snapshot = SnapshotSession::restore("AAPL", AnalysisMode::Snapshot, DEFAULT_SNAPSHOT_ID);
    let reused = policy
        .resolve_cost_of_capital(&snapshot, &report, &parameters(8.5))
        .await
        .unwrap();
    assert_eq!(reused, Percent(9.25));

    let derived = policy
        .resolve_cost_of_capital(&live, &report, &parameters(8.5))
        .await
        .unwrap();
    assert!(derived.0 > 0.0 && derived.0 < 20.0, "derived {:?}", derived);
}

#[tokio::test]
async fn bundles_survive_a_store_reopen() {
    let dir = tempdir().unwrap();
    let saved = {
        let (policy, _) = policy(dir.path()).await;
        let session = SnapshotSession::for_ticker("MSFT");
        let session = SnapshotSession::restore("AAPL", AnalysisMode::Live, session.snapshot_id);
        policy.save(&session, &parameters(9.0)).await.unwrap()
    };

    let (reopened, _) = policy(dir.path()).await;
    let bundle = reopened
        .read_bundle("AAPL", &saved.snapshot_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bundle.saved_at, saved.saved_at);
    assert_eq!(bundle.record, saved.record);
}

#[tokio::test]
async fn saved_snapshot_is_never_replaced() {
    let dir = tempdir().unwrap();
    let (policy, _) = policy(dir.path()).await;
    let session = SnapshotSession::restore("AAPL", AnalysisMode::Live, DEFAULT_SNAPSHOT_ID);
    policy.save(&session, &parameters(9.0)).await.unwrap();
    let before = policy
        .read_bundle_bytes("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();

    let err = policy.save(&session, &parameters(12.0)).await.unwrap_err();
    assert!(matches!(err, SnapshotError::AlreadySaved(ref link) if *link == session.link()));

    let after = policy
        .read_bundle_bytes("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before, after);
    let bundle = policy
        .read_bundle("AAPL", &DEFAULT_SNAPSHOT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bundle.parameters.cost_of_capital, Percent(9.0));

    // a fresh id takes the new parameters
    let mut next = session.clone();
    next.select_mode(AnalysisMode::Snapshot);
    next.select_mode(AnalysisMode::Live);
    assert_ne!(next.snapshot_id, session.snapshot_id);
    let saved = policy.save(&next, &parameters(12.0)).await.unwrap();
    assert_eq!(saved.parameters.cost_of_capital, Percent(12.0));
}

//! Service-layer integration tests: a mutable in-process mock of the POS
//! cloud API in front of an in-memory database.
//! Run: cargo test -p inventory-core --test service_integration

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;

use pos_client::{PosClient, PosConfig};

use inventory_core::cache::{MemoryCache, SharedCache};
use inventory_core::db::models::MonthlySales;
use inventory_core::db::repository::{MonthlySalesRepository, StockRepository, StoreRepository};
use inventory_core::services::JobState;
use inventory_core::{
    AppError, Config, DbService, RefreshRunner, SalesService, StockService, SyncService,
};

const STORE_A: &str = "11111111-1111-1111-1111-111111111111";
const STORE_B: &str = "22222222-2222-2222-2222-222222222222";
const PROD_X: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
const PROD_Y: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";

/// Mutable upstream state; tests reshape it between sync passes
#[derive(Default)]
struct MockPos {
    stores: Mutex<Vec<serde_json::Value>>,
    products: Mutex<Vec<serde_json::Value>>,
    /// product uuid -> stock entries; `None` answers 204 No Content
    stocks: Mutex<HashMap<String, Option<Vec<serde_json::Value>>>>,
    receipts: Mutex<Vec<serde_json::Value>>,
    receipt_scans: AtomicUsize,
    receipt_delay_ms: AtomicU64,
    fail_receipts: AtomicBool,
    fail_stocks: AtomicBool,
}

impl MockPos {
    fn seed() -> Self {
        let state = Self::default();
        *state.stores.lock().unwrap() = vec![
            serde_json::json!({"id": STORE_A, "number": "6300", "name": "Downtown", "active": true}),
            serde_json::json!({"id": STORE_B, "number": "6400", "name": "Harbor", "active": true, "warehouse": true}),
        ];
        *state.products.lock().unwrap() = vec![
            serde_json::json!({"id": PROD_X, "number": 100, "name": "Red", "codes": [{"productCode": "111"}]}),
            serde_json::json!({"id": PROD_Y, "number": 200, "name": "White"}),
            serde_json::json!({"number": "SKU-BAD", "name": "Unkeyable"}),
        ];
        state.stocks.lock().unwrap().insert(
            PROD_X.to_string(),
            Some(vec![
                serde_json::json!({"warehouse": {"id": STORE_A}, "amount": {"actual": "12.5", "ordered": "3"}, "listed": true}),
                serde_json::json!({"warehouse": {"id": STORE_B}, "amount": {"actual": "4"}}),
            ]),
        );
        state
            .stocks
            .lock()
            .unwrap()
            .insert(PROD_Y.to_string(), Some(vec![
                serde_json::json!({"warehouse": {"id": STORE_A}, "amount": {"actual": "1"}}),
            ]));
        // 15 units of X at Downtown across the window, nothing else counts
        *state.receipts.lock().unwrap() = vec![
            serde_json::json!({
                "number": "r-1",
                "organizationalUnit": {"id": STORE_A},
                "items": [{"product": {"id": PROD_X}, "quantity": 15}]
            }),
            serde_json::json!({
                "number": "r-2",
                "voided": true,
                "organizationalUnit": {"id": STORE_A},
                "items": [{"product": {"id": PROD_X}, "quantity": 100}]
            }),
        ];
        state
    }
}

fn page(params: &HashMap<String, String>) -> u32 {
    params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
}

fn listing(rows: Vec<serde_json::Value>, params: &HashMap<String, String>) -> Json<serde_json::Value> {
    if page(params) == 1 {
        Json(serde_json::json!({"results": rows, "pagesTotal": 1}))
    } else {
        Json(serde_json::json!({"results": [], "pagesTotal": 1}))
    }
}

async fn org_units(
    State(state): State<Arc<MockPos>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    listing(state.stores.lock().unwrap().clone(), &params)
}

async fn products(
    State(state): State<Arc<MockPos>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    listing(state.products.lock().unwrap().clone(), &params)
}

async fn stocks(State(state): State<Arc<MockPos>>, Path(id): Path<String>) -> impl IntoResponse {
    if state.fail_stocks.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
    }
    match state.stocks.lock().unwrap().get(&id) {
        Some(Some(rows)) => Json(serde_json::json!({"results": rows})).into_response(),
        Some(None) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn receipts(
    State(state): State<Arc<MockPos>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if state.fail_receipts.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
    }
    let delay = state.receipt_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if page(&params) == 1 {
        state.receipt_scans.fetch_add(1, Ordering::SeqCst);
    }
    listing(state.receipts.lock().unwrap().clone(), &params).into_response()
}

async fn spawn_mock(state: Arc<MockPos>) -> String {
    let app = Router::new()
        .route("/accounts/acct1/organizationalUnits", get(org_units))
        .route("/accounts/acct1/products", get(products))
        .route("/accounts/acct1/products/{id}/stocks", get(stocks))
        .route("/accounts/acct1/receipts", get(receipts))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Harness {
    state: Arc<MockPos>,
    db: DbService,
    cache: SharedCache,
    sync: SyncService,
    stock: StockService,
    sales: SalesService,
    refresh: RefreshRunner,
}

async fn harness() -> Harness {
    let state = Arc::new(MockPos::seed());
    let base = spawn_mock(state.clone()).await;

    let pos_config =
        PosConfig::new(&base, "acct1", "user", "secret").with_retry_base_delay(Duration::from_millis(5));
    let client = Arc::new(PosClient::new(pos_config).unwrap());

    let config = Config {
        lock_lease: Duration::from_secs(60),
        ..Config::default()
    };
    let db = DbService::memory().await.unwrap();
    let cache: SharedCache = Arc::new(MemoryCache::new());

    let sync = SyncService::new(client.clone(), &db);
    let stock = StockService::new(client.clone(), &db, cache.clone(), config.clone());
    let sales = SalesService::new(client.clone(), &db, cache.clone(), config.clone());
    let refresh = RefreshRunner::new(
        sync.clone(),
        stock.clone(),
        sales.clone(),
        cache.clone(),
        config,
    );

    Harness {
        state,
        db,
        cache,
        sync,
        stock,
        sales,
        refresh,
    }
}

#[tokio::test]
async fn sync_passes_are_idempotent() {
    let h = harness().await;

    let stores = h.sync.sync_stores().await.unwrap();
    assert_eq!(stores.fetched, 2);
    assert_eq!(stores.created, 2);
    assert_eq!(stores.skipped, 0);

    let catalog = h.sync.sync_catalog().await.unwrap();
    assert_eq!(catalog.fetched, 3);
    assert_eq!(catalog.created, 2);
    assert_eq!(catalog.skipped, 1);

    // Unchanged upstream data writes nothing on the second pass
    let stores = h.sync.sync_stores().await.unwrap();
    assert_eq!(stores.created, 0);
    assert_eq!(stores.updated, 0);
    assert_eq!(stores.unchanged, 2);

    let catalog = h.sync.sync_catalog().await.unwrap();
    assert_eq!(catalog.created, 0);
    assert_eq!(catalog.updated, 0);
    assert_eq!(catalog.unchanged, 2);
}

#[tokio::test]
async fn renamed_store_is_updated_in_place() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();

    h.state.stores.lock().unwrap()[0] = serde_json::json!({
        "id": STORE_A, "number": "6300", "name": "Downtown II", "active": true
    });
    let report = h.sync.sync_stores().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, 1);

    let repo = StoreRepository::new(h.db.db().clone());
    let store = repo.find_by_code("6300").await.unwrap().unwrap();
    assert_eq!(store.name, "Downtown II");
}

#[tokio::test]
async fn missing_store_is_deactivated_not_deleted() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();

    h.state.stores.lock().unwrap().truncate(1);
    let report = h.sync.sync_stores().await.unwrap();
    assert_eq!(report.deactivated, 1);

    let repo = StoreRepository::new(h.db.db().clone());
    assert_eq!(repo.find_all().await.unwrap().len(), 2);
    let active = repo.find_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code, "6300");
}

#[tokio::test]
async fn stock_sync_prunes_dropped_warehouses() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let report = h.stock.sync_stock(100, None).await.unwrap();
    assert_eq!(report.created, 2);

    let repo = StockRepository::new(h.db.db().clone());
    let rows = repo.rows_for_product(100).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].store_code, "6300");
    assert_eq!(rows[0].actual, Decimal::new(125, 1));

    // Harbor drops out of the upstream answer
    h.state.stocks.lock().unwrap().insert(
        PROD_X.to_string(),
        Some(vec![serde_json::json!({
            "warehouse": {"id": STORE_A}, "amount": {"actual": "10"}
        })]),
    );
    let report = h.stock.sync_stock(100, None).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(repo.rows_for_product(100).await.unwrap().len(), 1);

    // 204 means the POS tracks no stock at all
    h.state.stocks.lock().unwrap().insert(PROD_X.to_string(), None);
    let report = h.stock.sync_stock(100, None).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(repo.rows_for_product(100).await.unwrap().is_empty());
}

#[tokio::test]
async fn single_store_stock_sync_leaves_siblings_alone() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();
    h.stock.sync_stock(100, None).await.unwrap();

    h.state.stocks.lock().unwrap().insert(
        PROD_X.to_string(),
        Some(vec![serde_json::json!({
            "warehouse": {"id": STORE_A}, "amount": {"actual": "99"}
        })]),
    );
    let report = h.stock.sync_stock(100, Some("6300")).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.deleted, 0);

    // Harbor's row survives even though the new answer no longer lists it
    let repo = StockRepository::new(h.db.db().clone());
    let rows = repo.rows_for_product(100).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows.iter().find(|r| r.store_code == "6300").unwrap().actual,
        Decimal::from(99)
    );
}

#[tokio::test]
async fn stock_query_falls_back_to_persisted_rows_when_api_fails() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();
    h.stock.sync_stock(100, None).await.unwrap();

    h.state.fail_stocks.store(true, Ordering::SeqCst);
    let answer = h.stock.get_stock(100, None, false).await.unwrap();
    assert!(answer.cached);
    assert_eq!(answer.rows.len(), 2);
    assert!(answer.rows.iter().all(|row| row.cached));

    // With nothing persisted the failure propagates
    let err = h.stock.get_stock(200, None, false).await.unwrap_err();
    assert!(matches!(err, AppError::Api(_)));
}

#[tokio::test]
async fn stock_query_live_path_serves_and_caches_fresh_rows() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let answer = h.stock.get_stock(100, None, false).await.unwrap();
    assert!(!answer.cached);
    assert_eq!(answer.rows.len(), 2);

    // The live answer was persisted as a side effect
    let repo = StockRepository::new(h.db.db().clone());
    assert_eq!(repo.rows_for_product(100).await.unwrap().len(), 2);

    // And the fast cache now answers without touching the API
    h.state.fail_stocks.store(true, Ordering::SeqCst);
    let answer = h.stock.get_stock(100, None, false).await.unwrap();
    assert!(!answer.cached);
    assert_eq!(answer.rows.len(), 2);

    // The store filter narrows the cached payload
    let answer = h.stock.get_stock(100, Some("6400"), false).await.unwrap();
    assert_eq!(answer.rows.len(), 1);
    assert_eq!(answer.rows[0].store_code, "6400");
    assert_eq!(answer.rows[0].actual, Decimal::from(4));
}

#[tokio::test]
async fn force_refresh_and_invalidation_bypass_the_stock_cache() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();
    h.stock.get_stock(100, None, false).await.unwrap();

    // A quantity change upstream is invisible through the fast tier
    h.state.stocks.lock().unwrap().insert(
        PROD_X.to_string(),
        Some(vec![serde_json::json!({
            "warehouse": {"id": STORE_A}, "amount": {"actual": "42"}
        })]),
    );
    let stale = h.stock.get_stock(100, Some("6300"), false).await.unwrap();
    assert_eq!(stale.rows[0].actual, Decimal::new(125, 1));

    let fresh = h.stock.get_stock(100, Some("6300"), true).await.unwrap();
    assert_eq!(fresh.rows[0].actual, Decimal::from(42));

    // Invalidation drops the fast tier; the next plain read goes live
    h.state.stocks.lock().unwrap().insert(
        PROD_X.to_string(),
        Some(vec![serde_json::json!({
            "warehouse": {"id": STORE_A}, "amount": {"actual": "7"}
        })]),
    );
    h.stock.invalidate(100).await.unwrap();
    let fresh = h.stock.get_stock(100, Some("6300"), false).await.unwrap();
    assert_eq!(fresh.rows[0].actual, Decimal::from(7));
}

#[tokio::test]
async fn monthly_sales_three_tiers_scan_exactly_once() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    // Tier 3: live scan (15 units over 30 days -> 15/month)
    let value = h.sales.get_monthly_sales(100, "6300").await.unwrap();
    assert_eq!(value, 15);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // Tier 1: fast cache
    let value = h.sales.get_monthly_sales(100, "6300").await.unwrap();
    assert_eq!(value, 15);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // Tier 2: persisted row, still fresh, after the fast tier is dropped
    h.cache.delete_prefix("monthly_sales:").await;
    let value = h.sales.get_monthly_sales(100, "6300").await.unwrap();
    assert_eq!(value, 15);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // The scan persisted sibling stores too: zero sales at Harbor
    let value = h.sales.get_monthly_sales(100, "6400").await.unwrap();
    assert_eq!(value, 0);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_row_is_served_when_the_scan_fails() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let repo = MonthlySalesRepository::new(h.db.db().clone());
    let mut row = MonthlySales::from_window(100, "6300", Decimal::from(9), 30);
    row.calculated_at = Utc::now() - chrono::Duration::minutes(40);
    repo.upsert(row).await.unwrap();

    h.state.fail_receipts.store(true, Ordering::SeqCst);
    let value = h.sales.get_monthly_sales(100, "6300").await.unwrap();
    assert_eq!(value, 9);

    // No persisted row at all: the failure propagates
    let err = h.sales.get_monthly_sales(200, "6300").await.unwrap_err();
    assert!(matches!(err, AppError::Api(_)));
}

#[tokio::test]
async fn warm_all_covers_the_catalog_with_one_scan() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let report = h.sales.warm_all().await.unwrap();
    assert_eq!(report.products, 2);
    assert_eq!(report.stores, 2);
    assert_eq!(report.rows_written, 4);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // Every pair answers from the warmed tiers, no further scans
    assert_eq!(h.sales.get_monthly_sales(100, "6300").await.unwrap(), 15);
    assert_eq!(h.sales.get_monthly_sales(100, "6400").await.unwrap(), 0);
    assert_eq!(h.sales.get_monthly_sales(200, "6300").await.unwrap(), 0);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_job_completes_and_rejects_concurrent_starts() {
    let h = harness().await;
    h.state.receipt_delay_ms.store(200, Ordering::SeqCst);

    let job_id = h.refresh.start().await.unwrap();
    assert!(h.refresh.busy().await);

    let err = h.refresh.start().await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut status = h.refresh.status(&job_id).await.expect("status present");
    for _ in 0..100 {
        if status.state != JobState::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = h.refresh.status(&job_id).await.expect("status present");
    }
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress, 100);
    assert!(status.finished_at.is_some());

    // Lock released; the next job can start
    assert!(!h.refresh.busy().await);

    // The pass populated everything downstream
    let stores = StoreRepository::new(h.db.db().clone());
    assert_eq!(stores.find_active().await.unwrap().len(), 2);
    let stock = StockRepository::new(h.db.db().clone());
    assert_eq!(stock.rows_for_product(100).await.unwrap().len(), 2);
    assert_eq!(h.sales.get_monthly_sales(100, "6300").await.unwrap(), 15);
}

#[tokio::test]
async fn failed_refresh_releases_the_lock_and_reports_failed() {
    let h = harness().await;
    h.state.fail_receipts.store(true, Ordering::SeqCst);

    let job_id = h.refresh.start().await.unwrap();
    let mut status = h.refresh.status(&job_id).await.expect("status present");
    for _ in 0..100 {
        if status.state != JobState::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = h.refresh.status(&job_id).await.expect("status present");
    }
    assert_eq!(status.state, JobState::Failed);
    assert!(!h.refresh.busy().await);

    // The fatal step came after the syncs, which still landed
    let stores = StoreRepository::new(h.db.db().clone());
    assert_eq!(stores.find_active().await.unwrap().len(), 2);

    // And a new job can start immediately
    h.state.fail_receipts.store(false, Ordering::SeqCst);
    let second = h.refresh.start().await.unwrap();
    assert_ne!(second, job_id);
}

#[tokio::test]
async fn unknown_job_id_has_no_status() {
    let h = harness().await;
    assert!(h.refresh.status("no-such-job").await.is_none());
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let err = h.stock.get_stock(999, None, false).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = h.sales.get_monthly_sales(999, "6300").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = h.sales.get_monthly_sales(100, "0000").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn bulk_monthly_query_shares_one_scan_and_degrades_per_pair() {
    let h = harness().await;
    h.sync.sync_stores().await.unwrap();
    h.sync.sync_catalog().await.unwrap();

    let answers = h
        .sales
        .get_monthly_sales_many(100, None, 30, false)
        .await
        .unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers["6300"], 15);
    assert_eq!(answers["6400"], 0);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // Warm pairs answer from the tiers, still one scan total
    let answers = h
        .sales
        .get_monthly_sales_many(100, Some(vec!["6300".into()]), 30, false)
        .await
        .unwrap();
    assert_eq!(answers["6300"], 15);
    assert_eq!(h.state.receipt_scans.load(Ordering::SeqCst), 1);

    // Forced refresh with a failing scan: stale rows answer, nothing fails
    h.state.fail_receipts.store(true, Ordering::SeqCst);
    let answers = h
        .sales
        .get_monthly_sales_many(100, None, 30, true)
        .await
        .unwrap();
    assert_eq!(answers["6300"], 15);
    assert_eq!(answers["6400"], 0);

    // A product with no persisted rows yields an empty map, not an error
    let answers = h
        .sales
        .get_monthly_sales_many(200, None, 30, false)
        .await
        .unwrap();
    assert!(answers.is_empty());
}

#[tokio::test]
async fn cancelled_refresh_stops_and_releases_the_lock() {
    let h = harness().await;
    h.state.receipt_delay_ms.store(500, Ordering::SeqCst);

    let job_id = h.refresh.start().await.unwrap();

    // Wait for the job to reach the receipt-scan step, then cancel it
    for _ in 0..200 {
        if let Some(status) = h.refresh.status(&job_id).await {
            if status.progress >= 70 {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    h.refresh.cancel();

    let mut status = h.refresh.status(&job_id).await.expect("status present");
    for _ in 0..100 {
        if status.state != JobState::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = h.refresh.status(&job_id).await.expect("status present");
    }
    assert_eq!(status.state, JobState::Failed);
    assert!(status.message.contains("cancelled"));
    assert!(!h.refresh.busy().await);
}

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::PgPool;
use tokio::sync::MutexGuard;
use tower::ServiceExt;

use common::{COLDKEY, OTHER_KEY};
use shadow_trader::api::router::create_router;
use shadow_trader::config::{AppConfig, MatchMode};
use shadow_trader::db::{extrinsic_repo, tick_repo};
use shadow_trader::models::{Balance, NewExtrinsic, NewTick, PortfolioBalance, TradeSignal};
use shadow_trader::AppState;

struct TestApp {
    router: Router,
    pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

async fn build_test_app() -> Option<TestApp> {
    let guard = common::DB_LOCK.lock().await;
    let pool = common::setup_test_db().await?;

    let config = AppConfig {
        database_url: String::new(),
        db_max_connections: 5,
        host: "127.0.0.1".into(),
        port: 0,
        cors_allowed_origins: vec!["http://localhost:3000".into()],
        chain_endpoint: "ws://127.0.0.1:9944".into(),
        tracked_coldkey: COLDKEY.into(),
        match_mode: MatchMode::default(),
        backoff_base: Duration::from_millis(500),
        backoff_max: Duration::from_secs(30),
        metrics_addr: None,
        log_json: false,
    };

    // Local recorder: tests must not fight over the global one.
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    let state = AppState {
        db: pool.clone(),
        config,
        metrics_handle,
    };

    Some(TestApp {
        router: create_router(state),
        pool,
        _guard: guard,
    })
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn seed_tick(pool: &PgPool, block_number: i64, timestamp: DateTime<Utc>) {
    let free = Balance::from_rao(100);
    let root = Balance::from_rao(2_000_000_000);
    let alpha = Balance::from_rao(1_000_000_000);
    tick_repo::insert_tick(
        pool,
        &NewTick {
            block_number,
            timestamp,
            balance: PortfolioBalance {
                total: free + root + alpha,
                free,
                root,
                alpha,
            },
        },
    )
    .await
    .expect("Failed to seed tick");
}

fn block_numbers(json: &serde_json::Value) -> Vec<i64> {
    json.as_array()
        .expect("bare JSON array")
        .iter()
        .map(|row| row["block_number"].as_i64().unwrap())
        .collect()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 24, hour, minute, 0).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let Some(app) = build_test_app().await else { return };

    let (status, json) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["latest_block"].is_null());

    seed_tick(&app.pool, 41, Utc::now() - TimeDelta::minutes(2)).await;
    seed_tick(&app.pool, 42, Utc::now() - TimeDelta::minutes(1)).await;

    let (status, json) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["latest_block"], 42);
    let lag = json["lag_seconds"].as_i64().unwrap();
    assert!((55..=120).contains(&lag), "lag {lag}");
}

#[tokio::test]
async fn test_ticks_newest_block_first() {
    let Some(app) = build_test_app().await else { return };
    seed_tick(&app.pool, 10, at(4, 0)).await;
    seed_tick(&app.pool, 12, at(4, 1)).await;
    seed_tick(&app.pool, 11, at(4, 2)).await;

    let (status, json) = get(&app, "/ticks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block_numbers(&json), vec![12, 11, 10]);
}

#[tokio::test]
async fn test_ticks_limit() {
    let Some(app) = build_test_app().await else { return };
    for n in 1..=5 {
        seed_tick(&app.pool, n, at(4, n as u32)).await;
    }

    let (_, json) = get(&app, "/ticks?limit=3").await;
    assert_eq!(block_numbers(&json), vec![5, 4, 3]);

    let (_, json) = get(&app, "/ticks?limit=0").await;
    assert_eq!(block_numbers(&json).len(), 5);

    let (status, json) = get(&app, "/ticks?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = get(&app, "/ticks?limit=many").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ticks_explicit_range_is_inclusive() {
    let Some(app) = build_test_app().await else { return };
    seed_tick(&app.pool, 1, at(3, 59)).await;
    seed_tick(&app.pool, 2, at(4, 0)).await;
    seed_tick(&app.pool, 3, at(4, 30)).await;
    seed_tick(&app.pool, 4, at(5, 12)).await;
    seed_tick(&app.pool, 5, at(6, 0)).await;

    let (status, json) = get(
        &app,
        "/ticks?start_date=2025-11-24&start_time=04:00:00&end_date=2025-11-24&end_time=05:12:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block_numbers(&json), vec![4, 3, 2]);
}

#[tokio::test]
async fn test_ticks_hours_takes_precedence() {
    let Some(app) = build_test_app().await else { return };
    let now = Utc::now();
    seed_tick(&app.pool, 1, now - TimeDelta::hours(30)).await;
    seed_tick(&app.pool, 2, now - TimeDelta::hours(1)).await;

    let (_, json) = get(&app, "/ticks?hours=24").await;
    assert_eq!(block_numbers(&json), vec![2]);

    // Range alone would select only the old tick.
    let old = (now - TimeDelta::hours(31)).format("%H:%M:%S");
    let day = (now - TimeDelta::hours(31)).format("%Y-%m-%d");
    let end = (now - TimeDelta::hours(29)).format("%H:%M:%S");
    let end_day = (now - TimeDelta::hours(29)).format("%Y-%m-%d");
    let range = format!("start_date={day}&start_time={old}&end_date={end_day}&end_time={end}");

    let (_, json) = get(&app, &format!("/ticks?{range}")).await;
    assert_eq!(block_numbers(&json), vec![1]);

    let (_, json) = get(&app, &format!("/ticks?hours=24&{range}")).await;
    assert_eq!(block_numbers(&json), vec![2]);
}

#[tokio::test]
async fn test_ticks_partial_range_returns_everything() {
    let Some(app) = build_test_app().await else { return };
    seed_tick(&app.pool, 1, at(1, 0)).await;
    seed_tick(&app.pool, 2, at(9, 0)).await;

    let (_, json) = get(&app, "/ticks?start_date=2025-11-24&start_time=04:00").await;
    assert_eq!(block_numbers(&json), vec![2, 1]);
}

#[tokio::test]
async fn test_ticks_bad_date_is_rejected() {
    let Some(app) = build_test_app().await else { return };

    let (status, json) = get(
        &app,
        "/ticks?start_date=24-11-2025&start_time=04:00&end_date=2025-11-24&end_time=05:00",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("24-11-2025"));
}

#[tokio::test]
async fn test_tick_balance_shape() {
    let Some(app) = build_test_app().await else { return };
    seed_tick(&app.pool, 7, at(4, 0)).await;

    let (_, json) = get(&app, "/ticks").await;
    let tick = &json[0];
    assert_eq!(tick["block_number"], 7);
    assert_eq!(tick["balance"]["total"], "τ3.000000100");
    assert_eq!(tick["balance"]["free"], "τ0.000000100");
    assert_eq!(tick["balance"]["root"], "τ2.000000000");
    assert_eq!(tick["balance"]["alpha"], "τ1.000000000");

    let ts: DateTime<Utc> = tick["timestamp"].as_str().unwrap().parse().unwrap();
    assert_eq!(ts, at(4, 0));
}

#[tokio::test]
async fn test_counts_are_bare_integers() {
    let Some(app) = build_test_app().await else { return };
    seed_tick(&app.pool, 1, at(4, 0)).await;
    seed_tick(&app.pool, 2, at(4, 1)).await;

    let (status, json) = get(&app, "/ticks/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(2));

    let (status, json) = get(&app, "/extrinsics/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(0));
}

#[tokio::test]
async fn test_extrinsic_round_trip() {
    let Some(app) = build_test_app().await else { return };
    let record = NewExtrinsic {
        block_number: 6_945_998,
        timestamp: at(4, 30),
        address: COLDKEY.into(),
        call_module: "SubtensorModule".into(),
        call_function: "add_stake_limit".into(),
        signal: TradeSignal::Buy,
        hotkey: Some(OTHER_KEY.into()),
        netuid: Some(19),
        amount_staked: Some(1_500_000_000),
        amount_unstaked: None,
        limit_price: Some(9_000_000),
    };
    extrinsic_repo::insert_extrinsic(&app.pool, &record).await.unwrap();

    let (status, json) = get(&app, "/extrinsics?hours=0&limit=0").await;
    assert_eq!(status, StatusCode::OK);
    // hours=0 is an empty trailing window.
    assert!(json.as_array().unwrap().is_empty());

    let (_, json) = get(&app, "/extrinsics").await;
    let row = &json[0];
    assert_eq!(row["block_number"], 6_945_998);
    assert_eq!(row["address"], COLDKEY);
    assert_eq!(row["call_module"], "SubtensorModule");
    assert_eq!(row["call_function"], "add_stake_limit");
    assert_eq!(row["signal"], "BUY");
    assert_eq!(row["hotkey"], OTHER_KEY);
    assert_eq!(row["netuid"], 19);
    assert_eq!(row["amount_staked"], 1_500_000_000i64);
    assert!(row["amount_unstaked"].is_null());
    assert_eq!(row["limit_price"], 9_000_000);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let Some(app) = build_test_app().await else { return };

    let resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).is_ok());
}

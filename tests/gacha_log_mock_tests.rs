//! 祈願履歴APIモックを使った統合テスト
//!
//! ローカルに warp サーバーを立て、ページング・失敗分類・取り込みの冪等性を確認する

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::Filter;

use wishlog::{
    api::query::AUTH_KEYS,
    config::{AppConfig, FetchConfig},
    AuthParams, Category, GachaLogClient, IngestOptions, IngestPipeline, WishDatabase, WishError,
    WishSource, WishStore,
};

const PATH: &str = "event/gacha_info/api/getGachaLog";

/// モックの応答モード
#[derive(Clone)]
enum MockMode {
    /// 履歴を end_id カーソルでページングして返す
    History,
    /// 指定ステータスを返す
    Status(StatusCode),
    /// 200 だが message が OK 以外
    Rejected(&'static str),
}

struct MockServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    history: Arc<Mutex<Vec<Value>>>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
}

impl MockServer {
    fn endpoint(&self) -> String {
        format!("http://{}/{}", self.addr, PATH)
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// 新しい祈願を履歴の先頭（最新側）に追加
    fn push_newest(&self, count: usize) {
        let mut history = self.history.lock().unwrap();
        let start = history.len();
        let mut newer: Vec<Value> = (start..start + count).rev().map(wish).collect();
        newer.extend(history.drain(..));
        *history = newer;
    }
}

/// i 番目（0始まり、古い順）の祈願
fn wish(i: usize) -> Value {
    let rank = if i % 10 == 9 {
        "5"
    } else if i % 5 == 4 {
        "4"
    } else {
        "3"
    };
    json!({
        "uid": "100000001",
        "gacha_type": "301",
        "item_id": "",
        "count": "1",
        "id": format!("{}", 1_600_000_000_000u64 + i as u64),
        "item_type": if rank == "3" { "Weapon" } else { "Character" },
        "name": format!("Item {}", i + 1),
        "rank_type": rank,
        "time": format!("2021-03-01 {:02}:{:02}:{:02}", i / 3600, (i / 60) % 60, i % 60),
        "lang": "en-us",
    })
}

/// 新しい順の履歴
fn newest_first(count: usize) -> Vec<Value> {
    (0..count).rev().map(wish).collect()
}

fn page_after(history: &[Value], end_id: &str, size: usize) -> Vec<Value> {
    let start = if end_id == "0" {
        0
    } else {
        history
            .iter()
            .position(|w| w["id"] == end_id)
            .map(|p| p + 1)
            .unwrap_or(history.len())
    };
    history.iter().skip(start).take(size).cloned().collect()
}

async fn start_mock(history: Vec<Value>, mode: MockMode) -> MockServer {
    let requests = Arc::new(AtomicUsize::new(0));
    let history = Arc::new(Mutex::new(history));
    let last_query = Arc::new(Mutex::new(HashMap::new()));

    let route = {
        let requests = requests.clone();
        let history = history.clone();
        let last_query = last_query.clone();

        warp::path!("event" / "gacha_info" / "api" / "getGachaLog")
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .map(move |query: HashMap<String, String>| {
                requests.fetch_add(1, Ordering::SeqCst);
                *last_query.lock().unwrap() = query.clone();

                match &mode {
                    MockMode::Status(status) => warp::reply::with_status(
                        warp::reply::json(&json!({"message": "error"})),
                        *status,
                    ),
                    MockMode::Rejected(message) => warp::reply::with_status(
                        warp::reply::json(&json!({"retcode": -101, "message": message, "data": null})),
                        StatusCode::OK,
                    ),
                    MockMode::History => {
                        let size: usize = query
                            .get("size")
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(6);
                        let end_id = query.get("end_id").cloned().unwrap_or_else(|| "0".into());
                        let list = page_after(&history.lock().unwrap(), &end_id, size);
                        warp::reply::with_status(
                            warp::reply::json(&json!({
                                "retcode": 0,
                                "message": "OK",
                                "data": {
                                    "page": query.get("page").cloned().unwrap_or_default(),
                                    "size": size.to_string(),
                                    "list": list,
                                    "region": "os_asia",
                                }
                            })),
                            StatusCode::OK,
                        )
                    }
                }
            })
    };

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    MockServer {
        addr,
        requests,
        history,
        last_query,
    }
}

fn auth() -> AuthParams {
    let query: Vec<String> = AUTH_KEYS
        .iter()
        .map(|key| match *key {
            "authkey" => "authkey=test%2Bkey".to_string(),
            "lang" => "lang=en".to_string(),
            other => format!("{}=1", other),
        })
        .collect();
    let url = format!(
        "https://webstatic-sea.example.com/genshin/event/e20190909gacha/index.html?{}#/log",
        query.join("&")
    );
    AuthParams::from_url(&url).unwrap()
}

fn client_for(mock: &MockServer) -> GachaLogClient {
    let config = FetchConfig {
        endpoint: mock.endpoint(),
        page_size: 6,
        request_interval_ms: 0,
    };
    GachaLogClient::new(auth(), &config)
}

#[tokio::test]
async fn test_pagination_stops_on_short_page() {
    let mock = start_mock(newest_first(15), MockMode::History).await;
    let client = client_for(&mock);

    let wishes = client.fetch_history("301").await.unwrap();

    // [6, 6, 3] の3ページ
    assert_eq!(mock.requests(), 3);
    assert_eq!(wishes.len(), 15);
    assert_eq!(wishes[0].name, "Item 15");
    assert_eq!(wishes[14].name, "Item 1");

    let query = mock.last_query.lock().unwrap().clone();
    assert_eq!(query.get("gacha_type").map(String::as_str), Some("301"));
    assert_eq!(query.get("page").map(String::as_str), Some("3"));
    assert_eq!(query.get("size").map(String::as_str), Some("6"));
    assert_eq!(query.get("authkey").map(String::as_str), Some("test+key"));
    assert_eq!(
        query.get("end_id").map(String::as_str),
        Some(wishes[11].id.as_str())
    );
}

#[tokio::test]
async fn test_pagination_exact_multiple_needs_empty_page() {
    let mock = start_mock(newest_first(12), MockMode::History).await;
    let client = client_for(&mock);

    let wishes = client.fetch_history("301").await.unwrap();

    assert_eq!(mock.requests(), 3);
    assert_eq!(wishes.len(), 12);
}

#[tokio::test]
async fn test_empty_history() {
    let mock = start_mock(Vec::new(), MockMode::History).await;
    let client = client_for(&mock);

    let wishes = client.fetch_history("200").await.unwrap();

    assert_eq!(mock.requests(), 1);
    assert!(wishes.is_empty());
}

#[tokio::test]
async fn test_server_error_is_network_failure() {
    let mock = start_mock(Vec::new(), MockMode::Status(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let client = client_for(&mock);

    match client.fetch_history("301").await {
        Err(WishError::Network { status }) => assert_eq!(status, 500),
        other => panic!("expected network error, got {:?}", other.map(|w| w.len())),
    }
}

#[tokio::test]
async fn test_rejected_message_is_upstream_failure() {
    let mock = start_mock(Vec::new(), MockMode::Rejected("authkey timeout")).await;
    let client = client_for(&mock);

    match client.fetch_history("301").await {
        Err(WishError::Upstream { message }) => assert_eq!(message, "authkey timeout"),
        other => panic!("expected upstream error, got {:?}", other.map(|w| w.len())),
    }
    assert_eq!(mock.requests(), 1);
}

#[tokio::test]
async fn test_ingestion_is_idempotent_end_to_end() {
    let mock = start_mock(newest_first(15), MockMode::History).await;
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        output_dir: dir.path().to_path_buf(),
        fetch: FetchConfig {
            endpoint: mock.endpoint(),
            page_size: 6,
            request_interval_ms: 0,
        },
        ..AppConfig::default()
    };

    let client = client_for(&mock);
    let db = WishDatabase::new_in_memory().unwrap();
    let mut pipeline = IngestPipeline::new(client, db, config);

    let first = pipeline
        .run(Category::Character, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(first.fetched, 15);
    assert_eq!(first.appended, 15);

    let stored = pipeline.store().all_records(Category::Character).unwrap();
    let ids: Vec<i64> = stored.iter().map(|w| w.id).collect();
    assert_eq!(ids, (1..=15).collect::<Vec<i64>>());
    assert_eq!(stored[0].wish.name, "Item 1");

    let export = first.export_path.unwrap();
    assert_eq!(export, dir.path().join("character_wishes.csv"));
    assert_eq!(std::fs::read_to_string(&export).unwrap().lines().count(), 16);

    // 上流に変化がなければ2回目は0件
    let second = pipeline
        .run(Category::Character, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(second.appended, 0);
    assert_eq!(pipeline.store().total_count(Category::Character).unwrap(), 15);

    // 新しい祈願が3件増えた場合はその3件だけ追記される
    mock.push_newest(3);
    let third = pipeline
        .run(Category::Character, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(third.fetched, 18);
    assert_eq!(third.appended, 3);

    let stored = pipeline.store().all_records(Category::Character).unwrap();
    assert_eq!(stored.len(), 18);
    assert_eq!(stored[17].wish.name, "Item 18");
    assert_eq!(pipeline.store().total_count(Category::Weapon).unwrap(), 0);
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_untouched() {
    let mock = start_mock(Vec::new(), MockMode::Status(StatusCode::BAD_GATEWAY)).await;
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        output_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let mut pipeline = IngestPipeline::new(
        client_for(&mock),
        WishDatabase::new_in_memory().unwrap(),
        config,
    );

    let result = pipeline
        .run(Category::Weapon, IngestOptions::default())
        .await;
    assert!(matches!(result, Err(WishError::Network { status: 502 })));
    assert_eq!(pipeline.store().total_count(Category::Weapon).unwrap(), 0);
    assert!(!dir.path().join("weapon_wishes.csv").exists());
}

//! End-to-end tests of the HTTP API against a real listener.

use std::fs;
use std::path::PathBuf;

use license_tracker::{server, AppState, Config, CorruptPolicy};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    base: String,
    client: Client,
    dir: TempDir,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(CorruptPolicy::Fail, |_| {}).await
    }

    async fn start_with(on_corrupt: CorruptPolicy, prepare: impl FnOnce(&std::path::Path)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        prepare(dir.path());

        let mut config = Config::default();
        config.storage.data_file = dir.path().join("licenses.json");
        config.storage.export_file = dir.path().join("licenses_export.csv");
        config.storage.on_corrupt = on_corrupt;
        config.server.static_dir = dir.path().join("static");

        let state = AppState::from_config(&config).expect("app state");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (shutdown, signal) = oneshot::channel::<()>();
        tokio::spawn(server::serve(listener, state, async {
            let _ = signal.await;
        }));

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            dir,
            _shutdown: shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn data_file(&self) -> PathBuf {
        self.dir.path().join("licenses.json")
    }

    async fn list(&self) -> Vec<Value> {
        let response = self
            .client
            .get(self.url("/api/licenses"))
            .send()
            .await
            .expect("list request");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("list body")
    }

    async fn create(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/licenses"))
            .json(body)
            .send()
            .await
            .expect("create request")
    }

    async fn seed(&self, names: &[&str]) {
        for name in names {
            let response = self.create(&record(name)).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }
}

fn record(name: &str) -> Value {
    json!({
        "name": name,
        "start_date": "2024-01-01",
        "end_date": "2024-12-31",
        "active": true,
        "level": 1
    })
}

/// The record without its store-assigned id.
fn fields(value: &Value) -> Value {
    let mut value = value.clone();
    value.as_object_mut().expect("object").remove("id");
    value
}

fn names(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["name"].as_str().expect("name").to_string())
        .collect()
}

#[tokio::test]
async fn pulse_reports_ok() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/api/pulse"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn list_starts_empty_and_is_idempotent() {
    let server = TestServer::start().await;
    assert!(server.list().await.is_empty());

    server.seed(&["A", "B"]).await;
    let first = server.list().await;
    let second = server.list().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn create_then_read_returns_posted_record_last() {
    let server = TestServer::start().await;
    server.seed(&["existing"]).await;

    let posted = record("A");
    let response = server.create(&posted).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let records = server.list().await;
    let last = records.last().expect("last record");
    assert_eq!(fields(last), posted);
    assert_eq!(last["id"], body["id"]);
}

#[tokio::test]
async fn create_accepts_string_level() {
    let server = TestServer::start().await;
    let mut posted = record("A");
    posted["level"] = json!("gold");

    assert_eq!(server.create(&posted).await.status(), StatusCode::CREATED);
    assert_eq!(server.list().await[0]["level"], "gold");
}

#[tokio::test]
async fn create_and_update_accept_float_and_null_levels() {
    let server = TestServer::start().await;
    for level in [json!(2.5), Value::Null] {
        let mut posted = record("A");
        posted["level"] = level;
        assert_eq!(server.create(&posted).await.status(), StatusCode::CREATED);
    }

    let mut replacement = record("B");
    replacement["level"] = Value::Null;
    let response = server
        .client
        .put(server.url("/api/licenses/0"))
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = server.list().await;
    assert_eq!(records.len(), 2);
    assert_eq!(fields(&records[0]), replacement);
    assert!(records[1]["level"].is_null());
}

#[tokio::test]
async fn create_rejects_missing_fields_without_change() {
    let server = TestServer::start().await;
    server.seed(&["A"]).await;
    let before = server.list().await;

    for field in ["name", "start_date", "end_date", "active", "level"] {
        let mut body = record("B");
        body.as_object_mut().unwrap().remove(field);

        let response = server.create(&body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "field {field}");
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].as_str().unwrap().contains(field));
    }

    assert_eq!(server.list().await, before);
}

#[tokio::test]
async fn create_rejects_empty_and_malformed_bodies() {
    let server = TestServer::start().await;

    let empty = server
        .client
        .post(server.url("/api/licenses"))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let malformed = server
        .client
        .post(server.url("/api/licenses"))
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    assert!(server.list().await.is_empty());
}

#[tokio::test]
async fn update_replaces_exactly_one_element() {
    let server = TestServer::start().await;
    server.seed(&["A", "B", "C"]).await;
    let before = server.list().await;

    let replacement = json!({
        "name": "X",
        "start_date": "2025-01-01",
        "end_date": "2025-06-30",
        "active": false,
        "level": 3
    });
    let response = server
        .client
        .put(server.url("/api/licenses/1"))
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let after = server.list().await;
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_eq!(fields(&after[1]), replacement);
    assert_eq!(after[1]["id"], before[1]["id"]);
}

#[tokio::test]
async fn update_rejects_invalid_body() {
    let server = TestServer::start().await;
    server.seed(&["A"]).await;
    let before = server.list().await;

    let response = server
        .client
        .put(server.url("/api/licenses/0"))
        .json(&json!({ "name": "only a name" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.list().await, before);
}

#[tokio::test]
async fn update_and_delete_enforce_bounds() {
    let server = TestServer::start().await;
    server.seed(&["A", "B"]).await;
    let before = server.list().await;

    for index in ["2", "-1", "abc"] {
        let put = server
            .client
            .put(server.url(&format!("/api/licenses/{index}")))
            .json(&record("X"))
            .send()
            .await
            .unwrap();
        assert_eq!(put.status(), StatusCode::NOT_FOUND, "PUT {index}");
        let body: Value = put.json().await.unwrap();
        assert_eq!(body["error"], "index out of range");

        let delete = server
            .client
            .delete(server.url(&format!("/api/licenses/{index}")))
            .send()
            .await
            .unwrap();
        assert_eq!(delete.status(), StatusCode::NOT_FOUND, "DELETE {index}");
    }

    assert_eq!(server.list().await, before);
}

#[tokio::test]
async fn delete_shifts_tail() {
    let server = TestServer::start().await;
    server.seed(&["A", "B", "C", "D"]).await;
    let before = server.list().await;

    let response = server
        .client
        .delete(server.url("/api/licenses/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let after = server.list().await;
    assert_eq!(names(&after), vec!["A", "C", "D"]);
    assert_eq!(after[1], before[2]);
    assert_eq!(after[2], before[3]);
}

#[tokio::test]
async fn id_routes_address_records_stably() {
    let server = TestServer::start().await;
    server.seed(&["A", "B", "C"]).await;
    let before = server.list().await;
    let c_id = before[2]["id"].as_str().unwrap().to_string();

    // Removing an earlier record does not change C's id
    server
        .client
        .delete(server.url("/api/licenses/0"))
        .send()
        .await
        .unwrap();

    let fetched: Value = server
        .client
        .get(server.url(&format!("/api/licenses/id/{c_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, before[2]);

    let response = server
        .client
        .put(server.url(&format!("/api/licenses/id/{c_id}")))
        .json(&record("C2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(names(&server.list().await), vec!["B", "C2"]);

    let response = server
        .client
        .delete(server.url(&format!("/api/licenses/id/{c_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(names(&server.list().await), vec!["B"]);

    let missing = server
        .client
        .get(server.url(&format!("/api/licenses/id/{c_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed = server
        .client
        .delete(server.url("/api/licenses/id/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_csv_has_header_and_one_row_per_record() {
    let server = TestServer::start().await;
    server.seed(&["A", "B"]).await;
    let mut third = record("C, Inc");
    third["active"] = json!(false);
    third["level"] = json!("gold");
    server.create(&third).await;

    let response = server
        .client
        .get(server.url("/api/export_csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"licenses_export.csv\""
    );

    let body = response.text().await.unwrap();
    let lines: Vec<&str> = body.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Name,Start Date,End Date,Active,Level");
    assert_eq!(lines[1], "A,2024-01-01,2024-12-31,true,1");
    assert_eq!(lines[2], "B,2024-01-01,2024-12-31,true,1");
    assert_eq!(lines[3], "\"C, Inc\",2024-01-01,2024-12-31,false,gold");

    let written = fs::read_to_string(server.dir.path().join("licenses_export.csv")).unwrap();
    assert_eq!(written, body);
}

#[tokio::test]
async fn stats_counts_records() {
    let server = TestServer::start().await;
    server.seed(&["A"]).await;
    let mut inactive = record("B");
    inactive["active"] = json!(false);
    server.create(&inactive).await;

    let stats: Value = server
        .client
        .get(server.url("/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["active"], 1);
    assert_eq!(stats["inactive"], 1);
}

#[tokio::test]
async fn static_pages_are_served_or_missing() {
    let server = TestServer::start_with(CorruptPolicy::Fail, |dir| {
        let static_dir = dir.join("static");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("dashboard.html"), "<h1>Dashboard</h1>").unwrap();
    })
    .await;

    let dashboard = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(dashboard.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(dashboard.text().await.unwrap(), "<h1>Dashboard</h1>");

    let edit = server.client.get(server.url("/edit")).send().await.unwrap();
    assert_eq!(edit.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corrupt_store_fails_requests_and_keeps_file() {
    let server = TestServer::start().await;
    fs::write(server.data_file(), "{not json").unwrap();

    let list = server
        .client
        .get(server.url("/api/licenses"))
        .send()
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = list.json().await.unwrap();
    assert_eq!(body["error"], "internal server error");

    assert_eq!(
        server.create(&record("A")).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(fs::read_to_string(server.data_file()).unwrap(), "{not json");
}

#[tokio::test]
async fn corrupt_store_quarantined_when_configured() {
    let server = TestServer::start_with(CorruptPolicy::Quarantine, |dir| {
        fs::write(dir.join("licenses.json"), "{not json").unwrap();
    })
    .await;

    assert!(server.list().await.is_empty());
    server.seed(&["A"]).await;
    assert_eq!(names(&server.list().await), vec!["A"]);

    let quarantined = fs::read_dir(server.dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("licenses.json.corrupt-")
        })
        .count();
    assert_eq!(quarantined, 1);
}

const GOOD_RECORD: &str =
    r#"{"name":"Good","start_date":"2024-01-01","end_date":"2024-12-31","active":true,"level":1}"#;

#[tokio::test]
async fn stored_float_and_null_levels_are_served() {
    let server = TestServer::start_with(CorruptPolicy::Fail, |dir| {
        let contents = format!(
            r#"[{GOOD_RECORD},
{{"name":"Half","start_date":"s","end_date":"e","active":true,"level":2.5}},
{{"name":"Unset","start_date":"s","end_date":"e","active":false,"level":null}}]"#
        );
        fs::write(dir.join("licenses.json"), contents).unwrap();
    })
    .await;

    let records = server.list().await;
    assert_eq!(names(&records), vec!["Good", "Half", "Unset"]);
    assert_eq!(records[1]["level"], json!(2.5));
    assert!(records[2]["level"].is_null());

    let export = server
        .client
        .get(server.url("/api/export_csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    let csv = export.text().await.unwrap();
    let lines: Vec<&str> = csv.split_terminator("\r\n").collect();
    assert_eq!(lines[2], "Half,s,e,true,2.5");
    assert_eq!(lines[3], "Unset,s,e,false,");
}

#[tokio::test]
async fn loosely_typed_record_keeps_collection_when_quarantine_enabled() {
    let server = TestServer::start_with(CorruptPolicy::Quarantine, |dir| {
        let contents = format!(r#"[{GOOD_RECORD}, {{"name":"Odd","active":"yes","level":2.5}}]"#);
        fs::write(dir.join("licenses.json"), contents).unwrap();
    })
    .await;

    let records = server.list().await;
    assert_eq!(names(&records), vec!["Good", "Odd"]);

    let quarantined = fs::read_dir(server.dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().contains(".corrupt-"))
        .count();
    assert_eq!(quarantined, 0);
}

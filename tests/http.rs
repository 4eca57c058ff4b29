use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    present: u32,
    late: u32,
    left_early: u32,
    absent: u32,
    ncns: u32,
    total: u32,
}

#[derive(Debug, Deserialize)]
struct AttendanceResponse {
    summary: Summary,
    months: Vec<Value>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/profile")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_profile_view"))
        .env("PORT", port.to_string())
        .env("RUST_LOG", "info")
        .env_remove("HOST_CALLBACK_URL")
        .env_remove("PROFILE_VIEW_TEMPLATE")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn load_contact(client: &Client, server: &TestServer, body: String) -> reqwest::Response {
    client
        .post(format!("{}/api/contact", server.base_url))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

async fn profile(client: &Client, server: &TestServer) -> Value {
    client
        .get(format!("{}/api/profile", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn page(client: &Client, server: &TestServer) -> String {
    client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_load_contact_renders_attendance() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let payload = json!({
        "name": "Ada Lovelace",
        "attendance": [
            { "date": "3/1/2024", "type": "Present" },
            { "date": "3/15/2024", "type": "Left Early" }
        ]
    });
    let response = load_contact(&client, &server, payload.to_string()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let attendance: AttendanceResponse = client
        .get(format!("{}/api/attendance", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attendance.summary.present, 1);
    assert_eq!(attendance.summary.late, 0);
    assert_eq!(attendance.summary.left_early, 1);
    assert_eq!(attendance.summary.absent, 0);
    assert_eq!(attendance.summary.ncns, 0);
    assert_eq!(attendance.summary.total, 2);
    assert_eq!(attendance.months.len(), 1);
    assert_eq!(attendance.months[0]["year"], 2024);
    assert_eq!(attendance.months[0]["month"], 3);
    assert_eq!(attendance.months[0]["label"], "March 2024");
    assert_eq!(attendance.months[0]["days"].as_array().unwrap().len(), 42);

    let html = page(&client, &server).await;
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("March 2024"));
    assert!(html.contains(r#"<div class="calendar-day-status">LE</div>"#));
}

#[tokio::test]
async fn http_serialized_text_payload_is_accepted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let inner = json!({ "name": "Grace Hopper" }).to_string();
    let wrapped = serde_json::to_string(&inner).unwrap();
    let response = load_contact(&client, &server, wrapped).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(profile(&client, &server).await["name"], "Grace Hopper");
}

#[tokio::test]
async fn http_malformed_load_keeps_previous_profile() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = load_contact(&client, &server, json!({ "name": "Ada" }).to_string()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = load_contact(&client, &server, "not json".to_string()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(profile(&client, &server).await["name"], "Ada");
    assert!(page(&client, &server).await.contains("Error: Failed to load data"));
}

#[tokio::test]
async fn http_case_note_is_prepended_with_defaults() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let payload = json!({
        "name": "Ada",
        "caseNotes": [{ "date": "1/2/2024", "note": "existing", "subject": "Intake" }]
    });
    load_contact(&client, &server, payload.to_string()).await;

    let note: Value = client
        .post(format!("{}/api/case-notes", server.base_url))
        .body(json!({ "note": "hello" }).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(note["subject"], "General Note");
    assert_eq!(note["user"], "Unknown");
    assert!(!note["date"].as_str().unwrap().is_empty());

    let rejected = client
        .post(format!("{}/api/case-notes", server.base_url))
        .body("42")
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let current = profile(&client, &server).await;
    let notes = current["caseNotes"].as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0]["note"], "hello");
    assert_eq!(notes[1]["note"], "existing");
    assert_eq!(current["name"], "Ada");
}

#[tokio::test]
async fn http_new_case_note_without_host_is_diagnostic() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let dispatch: Value = client
        .post(format!("{}/api/case-notes/new", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dispatch["outcome"], "diagnostic");
    assert!(dispatch["message"]
        .as_str()
        .unwrap()
        .starts_with("Host Script Call: Manage: Staff Mtg"));

    assert!(page(&client, &server).await.contains("Host Script Call: Manage: Staff Mtg"));
}

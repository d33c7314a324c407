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
struct GoalView {
    id: String,
    current: f64,
    target: f64,
    progress: u32,
    bar_width: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayResponse {
    date: String,
    active_mode: String,
    goals: Vec<GoalView>,
}

impl DayResponse {
    fn goal(&self, id: &str) -> &GoalView {
        self.goals
            .iter()
            .find(|goal| goal.id == id)
            .unwrap_or_else(|| panic!("missing goal {id}"))
    }
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

fn unique_path(kind: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "nutrition_tracker_http_{kind}_{}_{}.json",
        std::process::id(),
        nanos
    ));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str, token: Option<&str>) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let mut request = client.get(format!("{base_url}/api/today"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Ok(resp) = request.send().await {
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

async fn spawn_server(token: Option<&str>) -> TestServer {
    let port = pick_free_port();
    let mut command = Command::new(env!("CARGO_BIN_EXE_nutrition_tracker"));
    command
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_path("state"))
        .env("APP_CONFIG_PATH", unique_path("goals"))
        .env("APP_USER", "tester")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(token) = token {
        command.env("APP_ACCESS_TOKEN", token);
    }
    let child = command.spawn().expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url, token).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(None).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn post_action(client: &Client, server: &TestServer, action: Value) -> DayResponse {
    let response = client
        .post(format!("{}/api/actions", server.base_url))
        .json(&action)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "action failed: {action}");
    response.json().await.unwrap()
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: String) -> T {
    let response = client.get(url).send().await.unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_increment_clamps_at_zero() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let day = post_action(
        &client,
        &server,
        json!({ "type": "increment", "date": "2024-01-01", "goal": "water", "amount": 2 }),
    )
    .await;
    assert_eq!(day.date, "2024-01-01");
    assert_eq!(day.goal("water").current, 2.0);
    assert_eq!(day.goal("water").progress, 80);

    let day = post_action(
        &client,
        &server,
        json!({ "type": "increment", "date": "2024-01-01", "goal": "water", "amount": -5 }),
    )
    .await;
    assert_eq!(day.goal("water").current, 0.0);
    assert_eq!(day.goal("water").progress, 0);
}

#[tokio::test]
async fn http_unresolved_day_is_synthesized_without_persisting() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    post_action(
        &client,
        &server,
        json!({ "type": "increment", "date": "2024-02-01", "goal": "water", "amount": 2 }),
    )
    .await;

    let next: DayResponse =
        get_json(&client, format!("{}/api/days/2024-02-02", server.base_url)).await;
    assert_eq!(next.active_mode, "health");
    assert!(next.goals.iter().all(|goal| goal.current == 0.0));

    let state: Value = get_json(&client, format!("{}/api/state", server.base_url)).await;
    assert!(state["dailyLogs"].get("2024-02-01").is_some());
    assert!(state["dailyLogs"].get("2024-02-02").is_none());
}

#[tokio::test]
async fn http_toggle_mode_switches_targets() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let day = post_action(
        &client,
        &server,
        json!({ "type": "increment", "date": "2024-03-01", "goal": "calories", "amount": 1800 }),
    )
    .await;
    assert_eq!(day.active_mode, "health");
    assert_eq!(day.goal("calories").progress, 90);

    let day = post_action(
        &client,
        &server,
        json!({ "type": "toggle_mode", "date": "2024-03-01" }),
    )
    .await;
    assert_eq!(day.active_mode, "diet");
    assert_eq!(day.goal("calories").target, 1800.0);
    assert_eq!(day.goal("calories").progress, 100);

    // Restore so later records keep carrying the health mode forward.
    let day = post_action(
        &client,
        &server,
        json!({ "type": "toggle_mode", "date": "2024-03-01" }),
    )
    .await;
    assert_eq!(day.active_mode, "health");
}

#[tokio::test]
async fn http_set_target_reports_raw_and_bar_progress() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    post_action(
        &client,
        &server,
        json!({ "type": "increment", "date": "2024-04-01", "goal": "protein", "amount": 90 }),
    )
    .await;
    let day = post_action(
        &client,
        &server,
        json!({ "type": "set_target", "date": "2024-04-01", "goal": "protein", "value": 60 }),
    )
    .await;

    let protein = day.goal("protein");
    assert_eq!(protein.target, 60.0);
    assert_eq!(protein.progress, 150);
    assert_eq!(protein.bar_width, 100);
}

#[tokio::test]
async fn http_rejects_unknown_goal_and_bad_target() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/actions", server.base_url))
        .json(&json!({ "type": "increment", "goal": "sugar", "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/actions", server.base_url))
        .json(&json!({ "type": "set_target", "date": "2024-05-01", "goal": "fat", "value": -3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_flattened_logs_carry_owner() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let logs: Vec<Value> =
        get_json(&client, format!("{}/api/days/2024-06-01/logs", server.base_url)).await;
    assert_eq!(logs.len(), 5);
    assert!(logs.iter().all(|log| log["user"] == "tester"));
    assert_eq!(logs[0]["id"], "water");
    assert_eq!(logs[0]["targetValue"], 2.5);
}

#[tokio::test]
async fn http_progress_and_calendar() {
    let server = spawn_server(None).await;
    let client = Client::new();

    for day in ["2024-07-01", "2024-07-02"] {
        post_action(
            &client,
            &server,
            json!({ "type": "increment", "date": day, "goal": "water", "amount": 2.5 }),
        )
        .await;
    }

    let progress: Value = get_json(&client, format!("{}/api/progress", server.base_url)).await;
    assert_eq!(progress["window"], 7);
    let water = progress["averages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|point| point["id"] == "water")
        .unwrap();
    assert!(water["average"].as_u64().unwrap() > 0);

    let calendar: Value = get_json(
        &client,
        format!("{}/api/calendar?year=2024&month=7", server.base_url),
    )
    .await;
    let cells = calendar["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 42);
    // July 2024 starts on a Monday.
    assert!(cells[0].is_null());
    assert_eq!(cells[1]["day"], 1);
    assert_eq!(cells[1]["progress"], 20);
    assert!(cells[3]["progress"].is_null());

    let response = client
        .get(format!("{}/api/calendar?year=2024&month=13", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_goal_config_seeds_new_days() {
    let server = spawn_server(None).await;
    let client = Client::new();

    let mut goals: Vec<Value> = get_json(&client, format!("{}/api/config", server.base_url)).await;
    assert_eq!(goals.len(), 5);
    goals[0]["target"]["health"] = json!(3.0);

    let response = client
        .put(format!("{}/api/config", server.base_url))
        .json(&goals)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let day: DayResponse =
        get_json(&client, format!("{}/api/days/2023-01-01", server.base_url)).await;
    assert_eq!(day.goal("water").target, 3.0);

    let response = client
        .delete(format!("{}/api/config", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let day: DayResponse =
        get_json(&client, format!("{}/api/days/2023-01-01", server.base_url)).await;
    assert_eq!(day.goal("water").target, 2.5);
}

#[tokio::test]
async fn http_requires_token_when_configured() {
    let server = spawn_server(Some("s3cret")).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/state", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/api/state", server.base_url))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

use once_cell::sync::Lazy;
use reqwest::{redirect, Client, StatusCode};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

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

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("workout_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

fn client() -> Client {
    Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

async fn wait_until_ready(base_url: &str) {
    let client = client();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/auth")).send().await {
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
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_workout_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("APP_LIST_MODE", "live")
        .env("RUST_LOG", "info")
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

async fn post_json(client: &Client, url: String, user: &str, body: Value) -> reqwest::Response {
    client
        .post(url)
        .header("x-user-id", user)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn get_json(client: &Client, url: String, user: &str) -> Value {
    client
        .get(url)
        .header("x-user-id", user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn node(value: &Value) -> u64 {
    value["id"].as_u64().expect("node id")
}

/// Builds and submits a one-section workout through the draft API.
async fn create_workout(client: &Client, base: &str, user: &str, name: &str) -> String {
    let created: Value = post_json(client, format!("{base}/api/drafts/workouts"), user, json!({}))
        .await
        .json()
        .await
        .unwrap();
    let draft_id = created["id"].as_str().unwrap().to_string();
    let section = node(&created["draft"]["body"]["sections"][0]);
    let actions_url = format!("{base}/api/drafts/{draft_id}/actions");

    post_json(client, actions_url.clone(), user, json!({ "action": "set_name", "value": name })).await;
    post_json(client, actions_url.clone(), user, json!({ "action": "set_type", "value": "strength" })).await;
    let draft: Value = post_json(
        client,
        actions_url.clone(),
        user,
        json!({ "action": "add_exercise", "parent": section }),
    )
    .await
    .json()
    .await
    .unwrap();
    let exercise = node(&draft["draft"]["body"]["sections"][0]["exercises"][0]);
    for (field, value) in [("name", "Squat"), ("sets", "3"), ("reps", "10")] {
        let resp = post_json(
            client,
            actions_url.clone(),
            user,
            json!({ "action": "set_field", "node": exercise, "field": field, "value": value }),
        )
        .await;
        assert!(resp.status().is_success());
    }

    let submitted = post_json(client, format!("{base}/api/drafts/{draft_id}/submit"), user, json!({})).await;
    assert!(submitted.status().is_success());
    let body: Value = submitted.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn http_pages_redirect_without_user() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();

    for path in ["/programs", "/workouts/new", "/api/workouts"] {
        let response = client
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.headers()["location"], "/auth");
    }
}

#[tokio::test]
async fn http_workout_lifecycle_is_user_scoped() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;

    let id = create_workout(&client, base, "lifecycle-ana", "Leg Day").await;
    create_workout(&client, base, "lifecycle-bo", "Arm Day").await;

    let listed = get_json(&client, format!("{base}/api/workouts"), "lifecycle-ana").await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "Leg Day");
    assert_eq!(listed[0]["sections"][0]["exercises"][0]["sets"], 3);
    assert_eq!(listed[0]["sections"][0]["exercises"][0]["reps"], 10);
    assert_eq!(listed[0]["completed"], false);

    let completed: Value = post_json(&client, format!("{base}/api/workouts/{id}/complete"), "lifecycle-ana", json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(completed["completed"], true);
    assert!(completed["completedAt"].is_string());

    let reopened: Value = post_json(&client, format!("{base}/api/workouts/{id}/incomplete"), "lifecycle-ana", json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reopened["completed"], false);
    assert!(reopened["completedAt"].is_null());

    let foreign = client
        .delete(format!("{base}/api/workouts/{id}"))
        .header("x-user-id", "lifecycle-bo")
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let deleted = client
        .delete(format!("{base}/api/workouts/{id}"))
        .header("x-user-id", "lifecycle-ana")
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let after = get_json(&client, format!("{base}/api/workouts"), "lifecycle-ana").await;
    assert!(after.as_array().unwrap().is_empty());
    let other = get_json(&client, format!("{base}/api/workouts"), "lifecycle-bo").await;
    assert_eq!(other.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn http_last_section_cannot_be_removed() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;

    let created: Value = post_json(&client, format!("{base}/api/drafts/workouts"), "sections-ana", json!({}))
        .await
        .json()
        .await
        .unwrap();
    let draft_id = created["id"].as_str().unwrap();
    let section = node(&created["draft"]["body"]["sections"][0]);

    let response = post_json(
        &client,
        format!("{base}/api/drafts/{draft_id}/actions"),
        "sections-ana",
        json!({ "action": "remove_section", "section": section }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("at least one section"));

    let draft = get_json(&client, format!("{base}/api/drafts/{draft_id}"), "sections-ana").await;
    assert_eq!(draft["draft"]["body"]["sections"].as_array().unwrap().len(), 1);

    let hidden = client
        .get(format!("{base}/api/drafts/{draft_id}"))
        .header("x-user-id", "sections-bo")
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_program_week_without_day_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;
    let user = "program-ana";

    let created: Value = post_json(&client, format!("{base}/api/drafts/programs"), user, json!({ "duration": 2 }))
        .await
        .json()
        .await
        .unwrap();
    let draft_id = created["id"].as_str().unwrap().to_string();
    let weeks = created["draft"]["body"]["weeks"].as_array().unwrap().clone();
    assert_eq!(weeks.len(), 2);
    let actions_url = format!("{base}/api/drafts/{draft_id}/actions");

    post_json(&client, actions_url.clone(), user, json!({ "action": "set_name", "value": "Base" })).await;
    let draft: Value = post_json(
        &client,
        actions_url.clone(),
        user,
        json!({ "action": "add_day", "week": node(&weeks[0]) }),
    )
    .await
    .json()
    .await
    .unwrap();
    let day = node(&draft["draft"]["body"]["weeks"][0]["days"][0]);
    let draft: Value = post_json(&client, actions_url.clone(), user, json!({ "action": "add_exercise", "parent": day }))
        .await
        .json()
        .await
        .unwrap();
    let exercise = node(&draft["draft"]["body"]["weeks"][0]["days"][0]["exercises"][0]);
    post_json(
        &client,
        actions_url.clone(),
        user,
        json!({ "action": "set_field", "node": exercise, "field": "name", "value": "Squat" }),
    )
    .await;

    let rejected = post_json(&client, format!("{base}/api/drafts/{draft_id}/submit"), user, json!({})).await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(rejected.text().await.unwrap().contains("must have at least one day"));
    let programs = get_json(&client, format!("{base}/api/programs"), user).await;
    assert!(programs.as_array().unwrap().is_empty());

    let draft: Value = post_json(
        &client,
        actions_url.clone(),
        user,
        json!({ "action": "add_day", "week": node(&weeks[1]) }),
    )
    .await
    .json()
    .await
    .unwrap();
    let second_day = node(&draft["draft"]["body"]["weeks"][1]["days"][0]);
    let draft: Value = post_json(
        &client,
        actions_url.clone(),
        user,
        json!({ "action": "add_exercise", "parent": second_day }),
    )
    .await
    .json()
    .await
    .unwrap();
    let second = node(&draft["draft"]["body"]["weeks"][1]["days"][0]["exercises"][0]);
    post_json(
        &client,
        actions_url.clone(),
        user,
        json!({ "action": "set_field", "node": second, "field": "name", "value": "Bench" }),
    )
    .await;

    let accepted = post_json(&client, format!("{base}/api/drafts/{draft_id}/submit"), user, json!({})).await;
    assert!(accepted.status().is_success());
    let id = accepted.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();

    let started: Value = post_json(&client, format!("{base}/api/programs/{id}/start"), user, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(started["status"], "in-progress");
    assert_eq!(started["weeks"][1]["weekNumber"], 2);

    let again = post_json(&client, format!("{base}/api/programs/{id}/start"), user, json!({})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn http_form_post_edits_and_submits_draft() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;
    let user = "form-ana";

    let response = client
        .get(format!("{base}/workouts/new"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let draft_path = response.headers()["location"].to_str().unwrap().to_string();
    let draft_id = draft_path.trim_start_matches("/drafts/").to_string();

    let draft = get_json(&client, format!("{base}/api/drafts/{draft_id}"), user).await;
    let section = node(&draft["draft"]["body"]["sections"][0]);

    let added = client
        .post(format!("{base}{draft_path}"))
        .header("x-user-id", user)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("name=Morning&type=cardio&op=add_exercise%3A{section}"))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::SEE_OTHER);

    let draft = get_json(&client, format!("{base}/api/drafts/{draft_id}"), user).await;
    assert_eq!(draft["draft"]["body"]["name"], "Morning");
    let exercise = node(&draft["draft"]["body"]["sections"][0]["exercises"][0]);

    let page = client
        .get(format!("{base}{draft_path}"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains(&format!("n{exercise}.name")));

    let submitted = client
        .post(format!("{base}{draft_path}"))
        .header("x-user-id", user)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!(
            "name=Morning&type=cardio&n{section}.section_type=warmup&n{exercise}.name=Row&n{exercise}.reps=5+min&op=submit"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::SEE_OTHER);
    assert_eq!(submitted.headers()["location"], "/workouts?notice=saved");

    let listed = get_json(&client, format!("{base}/api/workouts"), user).await;
    let workout = &listed.as_array().unwrap()[0];
    assert_eq!(workout["sections"][0]["type"], "warmup");
    assert_eq!(workout["sections"][0]["exercises"][0]["reps"], "5 min");

    let list_page = client
        .get(format!("{base}/workouts?notice=saved"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(list_page.contains("Saved successfully"));
    assert!(list_page.contains("/api/workouts/watch"));
}

#[tokio::test]
async fn http_watch_resolves_after_change() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = server.base_url.clone();
    let user = "watch-ana";

    let watcher = {
        let client = client.clone();
        let base = base.clone();
        tokio::spawn(async move { get_json(&client, format!("{base}/api/workouts/watch"), user).await })
    };
    sleep(Duration::from_millis(200)).await;
    create_workout(&client, &base, user, "Watched").await;

    let listed = tokio::time::timeout(Duration::from_secs(3), watcher)
        .await
        .expect("watch did not resolve")
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Watched");
}

fn timestamp(record: &Value, key: &str) -> chrono::DateTime<chrono::Utc> {
    serde_json::from_value(record[key].clone()).expect("timestamp")
}

/// Builds and submits a one-week, one-day program through the draft API.
async fn create_program(client: &Client, base: &str, user: &str, name: &str) -> String {
    let created: Value = post_json(client, format!("{base}/api/drafts/programs"), user, json!({ "duration": 1 }))
        .await
        .json()
        .await
        .unwrap();
    let draft_id = created["id"].as_str().unwrap().to_string();
    let week = node(&created["draft"]["body"]["weeks"][0]);
    let actions_url = format!("{base}/api/drafts/{draft_id}/actions");

    post_json(client, actions_url.clone(), user, json!({ "action": "set_name", "value": name })).await;
    let draft: Value = post_json(client, actions_url.clone(), user, json!({ "action": "add_day", "week": week }))
        .await
        .json()
        .await
        .unwrap();
    let day = node(&draft["draft"]["body"]["weeks"][0]["days"][0]);
    let draft: Value = post_json(client, actions_url.clone(), user, json!({ "action": "add_exercise", "parent": day }))
        .await
        .json()
        .await
        .unwrap();
    let exercise = node(&draft["draft"]["body"]["weeks"][0]["days"][0]["exercises"][0]);
    post_json(
        client,
        actions_url,
        user,
        json!({ "action": "set_field", "node": exercise, "field": "name", "value": "Squat" }),
    )
    .await;

    let submitted = post_json(client, format!("{base}/api/drafts/{draft_id}/submit"), user, json!({})).await;
    assert!(submitted.status().is_success());
    submitted.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn http_edit_updates_existing_workout() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;
    let user = "edit-ana";

    let id = create_workout(&client, base, user, "Leg Day").await;
    let before = get_json(&client, format!("{base}/api/workouts/{id}"), user).await;
    sleep(Duration::from_millis(20)).await;

    let opened = post_json(&client, format!("{base}/api/drafts/workouts"), user, json!({ "from": id })).await;
    assert_eq!(opened.status(), StatusCode::CREATED);
    let opened: Value = opened.json().await.unwrap();
    assert_eq!(opened["draft"]["recordId"], id.as_str());
    assert_eq!(opened["draft"]["body"]["name"], "Leg Day");
    let draft_id = opened["id"].as_str().unwrap();
    post_json(
        &client,
        format!("{base}/api/drafts/{draft_id}/actions"),
        user,
        json!({ "action": "set_name", "value": "Heavy Leg Day" }),
    )
    .await;

    let submitted = post_json(&client, format!("{base}/api/drafts/{draft_id}/submit"), user, json!({})).await;
    assert!(submitted.status().is_success());
    assert_eq!(submitted.json::<Value>().await.unwrap()["id"], id.as_str());

    let listed = get_json(&client, format!("{base}/api/workouts"), user).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let after = &listed[0];
    assert_eq!(after["id"], id.as_str());
    assert_eq!(after["name"], "Heavy Leg Day");
    assert_eq!(after["sections"][0]["exercises"][0]["name"], "Squat");
    assert_eq!(timestamp(after, "createdAt"), timestamp(&before, "createdAt"));
    assert!(timestamp(after, "updatedAt") > timestamp(&before, "updatedAt"));
}

#[tokio::test]
async fn http_edit_page_updates_existing_program() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;
    let user = "edit-bo";

    let id = create_program(&client, base, user, "Base").await;
    let before = get_json(&client, format!("{base}/api/programs/{id}"), user).await;
    sleep(Duration::from_millis(20)).await;

    let response = client
        .get(format!("{base}/programs/edit?id={id}"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let draft_path = response.headers()["location"].to_str().unwrap().to_string();
    assert!(draft_path.starts_with("/drafts/"));

    let submitted = client
        .post(format!("{base}{draft_path}"))
        .header("x-user-id", user)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Base+Two&duration=1&op=submit")
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::SEE_OTHER);
    assert_eq!(submitted.headers()["location"], format!("/programs/view?id={id}").as_str());

    let listed = get_json(&client, format!("{base}/api/programs"), user).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let after = &listed[0];
    assert_eq!(after["id"], id.as_str());
    assert_eq!(after["name"], "Base Two");
    assert_eq!(after["weeks"][0]["days"][0]["exercises"][0]["name"], "Squat");
    assert_eq!(timestamp(after, "createdAt"), timestamp(&before, "createdAt"));
    assert!(timestamp(after, "updatedAt") > timestamp(&before, "updatedAt"));
}

#[tokio::test]
async fn http_invalid_field_value_is_reported() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = client();
    let base = &server.base_url;
    let user = "invalid-ana";

    let response = client
        .get(format!("{base}/workouts/new"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap();
    let draft_path = response.headers()["location"].to_str().unwrap().to_string();
    let draft_id = draft_path.trim_start_matches("/drafts/").to_string();
    let draft = get_json(&client, format!("{base}/api/drafts/{draft_id}"), user).await;
    let section = node(&draft["draft"]["body"]["sections"][0]);

    let rejected = client
        .post(format!("{base}{draft_path}"))
        .header("x-user-id", user)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("name=Yoga&type=mobility&n{section}.section_type=stretch&n999.name=Ghost&op=submit"))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert!(rejected.text().await.unwrap().contains("for section_type"));

    let listed = get_json(&client, format!("{base}/api/workouts"), user).await;
    assert!(listed.as_array().unwrap().is_empty());
    let draft = get_json(&client, format!("{base}/api/drafts/{draft_id}"), user).await;
    assert_eq!(draft["draft"]["body"]["name"], "Yoga");
}

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chat_relay::{
    AssistantBackend, ChatRelay, MessageContent, PollPolicy, RelayError, Role, Run, RunStatus,
    Step, ThreadId, ThreadMessage,
};
use relay_http::{router, AppState, SESSION_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Backend that echoes the last posted message back as the reply.
#[derive(Default)]
struct EchoBackend {
    threads_created: AtomicU32,
    posted: Mutex<Vec<(String, String)>>,
    run_status: Mutex<Option<RunStatus>>,
    fail_create: bool,
    fail_start: bool,
}

impl EchoBackend {
    fn created(&self) -> u32 {
        self.threads_created.load(Ordering::SeqCst)
    }

    fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantBackend for EchoBackend {
    async fn create_thread(&self) -> Result<ThreadId, RelayError> {
        if self.fail_create {
            return Err(RelayError::upstream(Step::CreateThread, None, "connection refused"));
        }
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ThreadId::new(format!("thread_{n}")))
    }

    async fn post_message(&self, thread: &ThreadId, content: &str) -> Result<(), RelayError> {
        self.posted
            .lock()
            .unwrap()
            .push((thread.to_string(), content.to_string()));
        Ok(())
    }

    async fn start_run(&self, _thread: &ThreadId) -> Result<Run, RelayError> {
        if self.fail_start {
            return Err(RelayError::upstream(
                Step::StartRun,
                Some(400),
                "assistant not found",
            ));
        }
        let status = self.run_status.lock().unwrap().unwrap_or(RunStatus::Completed);
        Ok(Run {
            id: "run_1".to_string(),
            status,
            last_error: None,
        })
    }

    async fn get_run(&self, _thread: &ThreadId, run_id: &str) -> Result<Run, RelayError> {
        let status = self.run_status.lock().unwrap().unwrap_or(RunStatus::Completed);
        Ok(Run {
            id: run_id.to_string(),
            status,
            last_error: None,
        })
    }

    async fn cancel_run(&self, _thread: &ThreadId, _run_id: &str) -> Result<(), RelayError> {
        Ok(())
    }

    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, RelayError> {
        let last = self
            .posted()
            .into_iter()
            .rev()
            .find(|(t, _)| t == thread.as_str())
            .map(|(_, m)| m)
            .unwrap_or_default();
        Ok(vec![ThreadMessage {
            id: "msg_reply".to_string(),
            role: Role::Assistant,
            content: MessageContent::Text(format!("echo: {last}")),
            run_id: Some("run_1".to_string()),
            created_at: 0,
        }])
    }
}

fn app_state(backend: &Arc<EchoBackend>) -> AppState {
    let relay = ChatRelay::new(
        backend.clone(),
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        },
    );
    AppState::new(relay)
}

fn app(backend: &Arc<EchoBackend>) -> Router {
    router(app_state(backend))
}

fn post_json(uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn chat_returns_reply_and_thread() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let (status, body) = send(&app, post_json("/chat", None, json!({"message": "hello"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": "echo: hello", "threadId": "thread_1"}));
    assert_eq!(backend.created(), 1);
}

#[tokio::test]
async fn session_thread_is_reused() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    send(&app, post_json("/chat", None, json!({"message": "one"}))).await;
    let (_, body) = send(&app, post_json("/chat", None, json!({"message": "two"}))).await;

    assert_eq!(body["threadId"], "thread_1");
    assert_eq!(backend.created(), 1);
    assert_eq!(
        backend.posted(),
        vec![
            ("thread_1".to_string(), "one".to_string()),
            ("thread_1".to_string(), "two".to_string()),
        ]
    );
}

#[tokio::test]
async fn supplied_thread_id_skips_creation() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let (status, body) = send(
        &app,
        post_json("/chat", None, json!({"message": "hi", "threadId": "thread_abc"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threadId"], "thread_abc");
    assert_eq!(backend.created(), 0);
}

#[tokio::test]
async fn reset_starts_a_new_thread() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    send(&app, post_json("/chat", None, json!({"message": "one"}))).await;
    let (status, body) = send(&app, post_json("/reset", None, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = send(&app, post_json("/chat", None, json!({"message": "two"}))).await;
    assert_eq!(body["threadId"], "thread_2");
    assert_eq!(backend.created(), 2);
}

#[tokio::test]
async fn reset_without_thread_still_succeeds() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/reset")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn sessions_are_isolated() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let (_, a) = send(&app, post_json("/chat", Some("alice"), json!({"message": "a"}))).await;
    let (_, b) = send(&app, post_json("/chat", Some("bob"), json!({"message": "b"}))).await;
    send(&app, post_json("/reset", Some("alice"), json!({}))).await;
    let (_, b2) = send(&app, post_json("/chat", Some("bob"), json!({"message": "b2"}))).await;

    assert_ne!(a["threadId"], b["threadId"]);
    assert_eq!(b["threadId"], b2["threadId"]);
    assert_eq!(backend.created(), 2);
}

#[tokio::test]
async fn missing_or_empty_message_is_bad_request() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    for body in [json!({}), json!({"message": ""}), json!({"threadId": "thread_1"})] {
        let (status, resp) = send(&app, post_json("/chat", None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "Missing message"}));
    }
    assert_eq!(backend.created(), 0);
    assert!(backend.posted().is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn wrong_method_is_not_allowed() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/chat")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn upstream_failure_is_internal_error() {
    let backend = Arc::new(EchoBackend {
        fail_start: true,
        ..Default::default()
    });
    let app = app(&backend);

    let (status, body) = send(&app, post_json("/chat", None, json!({"message": "hello"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "run assistant error: HTTP 400: assistant not found"})
    );
}

#[tokio::test]
async fn failed_run_is_internal_error() {
    let backend = Arc::new(EchoBackend::default());
    *backend.run_status.lock().unwrap() = Some(RunStatus::Failed);
    let app = app(&backend);

    let (status, body) = send(&app, post_json("/chat", None, json!({"message": "hello"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "assistant run run_1 ended with status failed"
    );
}

#[tokio::test]
async fn thread_kept_after_failed_run() {
    let backend = Arc::new(EchoBackend::default());
    *backend.run_status.lock().unwrap() = Some(RunStatus::Failed);
    let app = app(&backend);

    let (status, _) = send(&app, post_json("/chat", None, json!({"message": "one"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    *backend.run_status.lock().unwrap() = Some(RunStatus::Completed);
    let (status, body) = send(&app, post_json("/chat", None, json!({"message": "two"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threadId"], "thread_1");
    assert_eq!(backend.created(), 1);
}

#[tokio::test]
async fn failed_thread_creation_leaves_no_session() {
    let backend = Arc::new(EchoBackend {
        fail_create: true,
        ..Default::default()
    });
    let state = app_state(&backend);
    let app = router(state.clone());

    for session in ["s-1", "s-2", "s-3"] {
        let (status, body) =
            send(&app, post_json("/chat", Some(session), json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "create thread error: connection refused");
    }
    let (status, _) = send(&app, post_json("/chat", Some("s-4"), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.threads.is_empty());
}

#[tokio::test]
async fn only_sessions_with_a_thread_are_kept() {
    let backend = Arc::new(EchoBackend::default());
    let state = app_state(&backend);
    let app = router(state.clone());

    send(&app, post_json("/chat", Some("alice"), json!({"message": "a"}))).await;
    send(&app, post_json("/chat", Some("bob"), json!({"message": ""}))).await;
    assert_eq!(state.threads.len(), 1);

    send(&app, post_json("/reset", Some("alice"), json!({}))).await;
    assert!(state.threads.is_empty());
}

#[tokio::test]
async fn invalid_thread_id_is_bad_request() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    for thread in ["../assistants/asst_other", "thread_1/runs", "thread 1", "thread%2F1"] {
        let (status, body) = send(
            &app,
            post_json("/chat", None, json!({"message": "hi", "threadId": thread})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid threadId"}));
    }
    assert!(backend.posted().is_empty());
    assert_eq!(backend.created(), 0);
}

#[tokio::test]
async fn stuck_run_times_out() {
    let backend = Arc::new(EchoBackend::default());
    *backend.run_status.lock().unwrap() = Some(RunStatus::InProgress);
    let app = app(&backend);

    let (status, body) = send(&app, post_json("/chat", None, json!({"message": "hello"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "assistant run run_1 still pending after 3 status checks"
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let backend = Arc::new(EchoBackend::default());
    let app = app(&backend);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 0);

    send(&app, post_json("/chat", None, json!({"message": "hello"}))).await;
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["sessions"], 1);
}

//! Fake Nitro appliance for integration tests
//!
//! A real axum server on `127.0.0.1:0` that answers `POST config/login` and any
//! `GET` under `/nitro/v1/` or `/nitro/v2/` from a table of canned payloads,
//! counting every request.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use netscaler_exporter::config::Target;
use netscaler_exporter::netscaler::NitroClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeState {
    pub logins: AtomicUsize,
    pub data_calls: AtomicUsize,
    /// Upcoming data calls answered with errorcode 444
    pub expire_next: AtomicUsize,
    pub always_expire: AtomicBool,
    /// Data calls carrying this session token are answered with errorcode 444
    pub revoked_token: Mutex<Option<String>>,
    pub reject_login: AtomicBool,
    /// Answer every data call with this HTTP status
    pub status: Mutex<Option<u16>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Path (`stat/ns`, `config/hanode`, ...) to JSON body
    payloads: Mutex<HashMap<String, Value>>,
    delays: Mutex<HashMap<String, Duration>>,
    /// Paths requested, in arrival order
    pub requests: Mutex<Vec<String>>,
    /// Cookie header of the last data call
    pub last_cookie: Mutex<Option<String>>,
}

pub struct FakeNitro {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeNitro {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/nitro/v1/config/login", post(login))
            .route("/nitro/v1/{*path}", get(data))
            .route("/nitro/v2/{*path}", get(data))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn target(&self) -> Target {
        Target::new(self.url()).with_credentials("nsroot", "secret")
    }

    pub fn client(&self) -> Arc<NitroClient> {
        Arc::new(NitroClient::new(Arc::new(self.target())).unwrap())
    }

    /// Serve `body` for `path`. A body without `errorcode` gets `errorcode: 0`.
    pub fn respond(&self, path: &str, mut body: Value) {
        if let Some(object) = body.as_object_mut() {
            object.entry("errorcode").or_insert(json!(0));
            object.entry("message").or_insert(json!("Done"));
        }
        self.state
            .payloads
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.state
            .delays
            .lock()
            .unwrap()
            .insert(path.to_string(), delay);
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.state.data_calls.load(Ordering::SeqCst)
    }

    pub fn requests_for(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Json<Value> {
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    if state.reject_login.load(Ordering::SeqCst) || body["login"]["username"] != "nsroot" {
        return Json(json!({
            "errorcode": 354,
            "message": "Invalid username or password",
            "severity": "ERROR"
        }));
    }
    Json(json!({
        "errorcode": 0,
        "message": "Done",
        "sessionid": format!("token-{n}")
    }))
}

async fn data(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.data_calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(path.clone());
    let cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_cookie.lock().unwrap() = cookie.clone();

    if let Some(code) = *state.status.lock().unwrap() {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, "appliance unavailable").into_response();
    }

    let revoked = state
        .revoked_token
        .lock()
        .unwrap()
        .as_ref()
        .map(|token| format!("sessionid={token}"));
    let expired = state.always_expire.load(Ordering::SeqCst)
        || (revoked.is_some() && revoked == cookie)
        || state
            .expire_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
    if expired {
        return Json(json!({
            "errorcode": 444,
            "message": "Invalid session",
            "severity": "ERROR"
        }))
        .into_response();
    }

    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let delay = state.delays.lock().unwrap().get(&path).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let body = state
        .payloads
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| json!({ "errorcode": 0, "message": "Done" }));
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    Json(body).into_response()
}

//! In-process mock of the monitoring backend.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use serde_json::{Value, json};

use wallet_monitor::config::ApiConfig;
use wallet_monitor::http::ApiClient;
use wallet_monitor::notice::RecordingNotifier;
use wallet_monitor::session::SessionStore;
use wallet_monitor::storage::Storage;

pub const ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const UUID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
/// Hardhat account #0, whose address is [`ADDR`].
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Header seen by the server for a logged-out call. The client sends
/// `Bearer ` but the server's header parser trims trailing whitespace.
pub const EMPTY_BEARER: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub authorization: String,
    pub body: Value,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Self::envelope(0, data, "success")
    }

    pub fn envelope(code: i64, data: Value, msg: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "code": code, "data": data, "msg": msg }).to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&Recorded) -> Reply + Send + Sync;

pub struct MockBackend {
    requests: Mutex<Vec<Recorded>>,
    respond: Box<Responder>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(mock): State<Arc<MockBackend>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let recorded = Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let reply = (mock.respond)(&recorded);
    mock.requests.lock().unwrap().push(recorded);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (reply.status, reply.body)
}

/// Start a mock backend on an ephemeral port; returns its base URL.
pub async fn spawn<F>(respond: F) -> (String, Arc<MockBackend>)
where
    F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
{
    let mock = Arc::new(MockBackend {
        requests: Mutex::new(Vec::new()),
        respond: Box::new(respond),
    });
    let app = Router::new().fallback(handle).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

pub fn client(base_url: &str, notifier: Arc<RecordingNotifier>) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    let session = Arc::new(SessionStore::new(Arc::new(Storage::in_memory())));
    Arc::new(ApiClient::new(&config, session, notifier).unwrap())
}

pub fn sign_in(client: &ApiClient) {
    client.session().update_address(ADDR).unwrap();
    client.session().update_user_info(Some(UUID)).unwrap();
}

pub fn watch_item(id: i64, address: &str, active: i32) -> Value {
    json!({
        "id": id,
        "createdDate": 1746018000000i64,
        "updatedDate": 1746018000000i64,
        "customerId": 1,
        "listeningAddress": address,
        "source": "Solana",
        "addressAlias": "",
        "isActive": active
    })
}

pub fn page(list: Vec<Value>) -> Value {
    let total = list.len();
    json!({
        "currPage": 1,
        "list": list,
        "pageSize": 15,
        "totalPage": 1,
        "totalCount": total
    })
}

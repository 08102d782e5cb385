//! Shared utilities for integration testing.
//!
//! `FakeCouch` is an in-process stand-in for the revisioned document database:
//! it keeps documents per database, enforces `rev` preconditions, evaluates
//! the item view, and can be flipped into modes where every request fails or
//! where resource creation is refused.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use todo_backend::config::AppConfig;
use todo_backend::http::HttpServer;
use todo_backend::lifecycle::Shutdown;
use todo_backend::store::Store;

#[derive(Default)]
struct CouchState {
    databases: Mutex<HashMap<String, Database>>,
    failing: AtomicBool,
    reject_creation: AtomicBool,
    next_id: AtomicU64,
    last_authorization: Mutex<Option<String>>,
}

#[derive(Default)]
struct Database {
    docs: BTreeMap<String, Value>,
    design_docs: HashSet<String>,
}

/// Handle to a running fake document database.
pub struct FakeCouch {
    pub addr: SocketAddr,
    state: Arc<CouchState>,
}

impl FakeCouch {
    /// Start on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(CouchState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url_with_credentials(&self, user: &str, password: &str) -> String {
        format!("http://{}:{}@{}", user, password, self.addr)
    }

    /// Make every subsequent request answer 500.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every database or design-document creation answer 500 while
    /// probes and document traffic keep working.
    pub fn set_reject_creation(&self, reject: bool) {
        self.state.reject_creation.store(reject, Ordering::SeqCst);
    }

    /// Create an empty database without the item view.
    pub fn create_database(&self, name: &str) {
        self.state
            .databases
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
    }

    /// Store `doc` under `id` as-is, bypassing revision checks.
    pub fn insert_raw(&self, db: &str, id: &str, mut doc: Value) {
        doc["_id"] = json!(id);
        doc["_rev"] = json!("1-raw");
        self.state
            .databases
            .lock()
            .unwrap()
            .entry(db.to_string())
            .or_default()
            .docs
            .insert(id.to_string(), doc);
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state.databases.lock().unwrap().contains_key(name)
    }

    pub fn has_design_document(&self, db: &str, name: &str) -> bool {
        self.state
            .databases
            .lock()
            .unwrap()
            .get(db)
            .is_some_and(|d| d.design_docs.contains(name))
    }

    /// Raw stored document, including `_rev`.
    pub fn document(&self, db: &str, id: &str) -> Option<Value> {
        self.state
            .databases
            .lock()
            .unwrap()
            .get(db)
            .and_then(|d| d.docs.get(id).cloned())
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

fn error(status: StatusCode, reason: &str) -> Response {
    (status, Json(json!({ "error": reason, "reason": reason }))).into_response()
}

fn query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn next_rev(current: Option<&str>, counter: u64) -> String {
    let generation = current
        .and_then(|r| r.split('-').next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);
    format!("{}-{:032x}", generation + 1, counter)
}

fn current_rev(doc: &Value) -> Option<&str> {
    doc.get("_rev").and_then(Value::as_str)
}

async fn handle(
    State(state): State<Arc<CouchState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        *state.last_authorization.lock().unwrap() = Some(auth.to_string());
    }
    if state.failing.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }

    let segments: Vec<&str> = uri.path().split('/').filter(|s| !s.is_empty()).collect();
    let counter = state.next_id.fetch_add(1, Ordering::SeqCst);
    let reject_creation = state.reject_creation.load(Ordering::SeqCst);
    let mut databases = state.databases.lock().unwrap();

    match (method.as_str(), segments.as_slice()) {
        ("GET", [db]) => match databases.get(*db) {
            Some(d) => Json(json!({ "db_name": db, "doc_count": d.docs.len() })).into_response(),
            None => error(StatusCode::NOT_FOUND, "not_found"),
        },
        ("PUT", [db]) => {
            if reject_creation {
                return error(StatusCode::INTERNAL_SERVER_ERROR, "creation rejected");
            }
            if databases.contains_key(*db) {
                return error(StatusCode::PRECONDITION_FAILED, "file_exists");
            }
            databases.insert(db.to_string(), Database::default());
            (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
        }
        ("POST", [db]) => {
            let Some(d) = databases.get_mut(*db) else {
                return error(StatusCode::NOT_FOUND, "not_found");
            };
            let Ok(mut doc) = serde_json::from_slice::<Value>(&body) else {
                return error(StatusCode::BAD_REQUEST, "bad_request");
            };
            let id = format!("{:032x}", counter);
            let rev = next_rev(None, counter);
            doc["_id"] = json!(id);
            doc["_rev"] = json!(rev);
            d.docs.insert(id.clone(), doc);
            (StatusCode::CREATED, Json(json!({ "ok": true, "id": id, "rev": rev }))).into_response()
        }
        ("GET", [db, "_design", name]) => match databases.get(*db) {
            Some(d) if d.design_docs.contains(*name) => {
                Json(json!({ "_id": format!("_design/{}", name) })).into_response()
            }
            _ => error(StatusCode::NOT_FOUND, "missing"),
        },
        ("PUT", [db, "_design", name]) => match databases.get_mut(*db) {
            Some(_) if reject_creation => {
                error(StatusCode::INTERNAL_SERVER_ERROR, "creation rejected")
            }
            Some(d) => {
                d.design_docs.insert(name.to_string());
                (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
            }
            None => error(StatusCode::NOT_FOUND, "not_found"),
        },
        ("GET", [db, "_design", name, "_view", _view]) => {
            let Some(d) = databases.get(*db).filter(|d| d.design_docs.contains(*name)) else {
                return error(StatusCode::NOT_FOUND, "missing");
            };
            let mut rows: Vec<(Option<i64>, &String, &Value)> = d
                .docs
                .iter()
                .filter(|(_, doc)| {
                    doc.get("title")
                        .and_then(Value::as_str)
                        .is_some_and(|t| !t.is_empty())
                        && doc.get("completed").is_some_and(|c| !c.is_null())
                })
                .map(|(id, doc)| (doc.get("order").and_then(Value::as_i64), id, doc))
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

            if query_param(&uri, "reduce").as_deref() == Some("false") {
                let rows: Vec<Value> = rows
                    .iter()
                    .map(|(key, id, doc)| {
                        json!({
                            "id": id,
                            "key": key,
                            "value": { "title": doc["title"], "completed": doc["completed"] }
                        })
                    })
                    .collect();
                Json(json!({ "total_rows": rows.len(), "offset": 0, "rows": rows })).into_response()
            } else if rows.is_empty() {
                Json(json!({ "rows": [] })).into_response()
            } else {
                Json(json!({ "rows": [{ "key": null, "value": rows.len() }] })).into_response()
            }
        }
        ("GET", [db, id]) => match databases.get(*db).and_then(|d| d.docs.get(*id)) {
            Some(doc) => Json(doc.clone()).into_response(),
            None => error(StatusCode::NOT_FOUND, "missing"),
        },
        ("PUT", [db, id]) => {
            let Some(d) = databases.get_mut(*db) else {
                return error(StatusCode::NOT_FOUND, "not_found");
            };
            let Ok(mut doc) = serde_json::from_slice::<Value>(&body) else {
                return error(StatusCode::BAD_REQUEST, "bad_request");
            };
            let supplied = query_param(&uri, "rev");
            let existing = d.docs.get(*id).and_then(current_rev).map(str::to_string);
            if supplied != existing {
                return error(StatusCode::CONFLICT, "conflict");
            }
            let rev = next_rev(existing.as_deref(), counter);
            doc["_id"] = json!(id);
            doc["_rev"] = json!(rev);
            d.docs.insert(id.to_string(), doc);
            (StatusCode::CREATED, Json(json!({ "ok": true, "id": id, "rev": rev }))).into_response()
        }
        ("DELETE", [db, id]) => {
            let Some(d) = databases.get_mut(*db) else {
                return error(StatusCode::NOT_FOUND, "not_found");
            };
            let Some(existing) = d.docs.get(*id).and_then(current_rev).map(str::to_string) else {
                return error(StatusCode::NOT_FOUND, "deleted");
            };
            if query_param(&uri, "rev").as_deref() != Some(existing.as_str()) {
                return error(StatusCode::CONFLICT, "conflict");
            }
            d.docs.remove(*id);
            let rev = next_rev(Some(&existing), counter);
            Json(json!({ "ok": true, "id": id, "rev": rev })).into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
    }
}

/// A running service instance for HTTP contract tests.
pub struct TestApp {
    pub base_url: String,
    pub shutdown: Shutdown,
}

/// Serve `store` on an ephemeral port.
pub async fn spawn_app(store: Arc<dyn Store>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&AppConfig::default(), store);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    TestApp {
        base_url: format!("http://{}", addr),
        shutdown,
    }
}

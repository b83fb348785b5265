//! Test helper functions for integration tests
//!
//! Procedural helpers and test doubles: a scripted relevance oracle that
//! records every call, recording messaging transports, and HTTP body readers.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use bytes::Bytes;
use http_body_util::BodyExt;
use matutor_listings::{
    config::Config,
    handlers::AppState,
    listing::ListingAssembler,
    messaging::{EmailService, NotificationService},
    metrics::MetricsRegistry,
    model::Record,
    oracle::{OracleBackend, RelevanceOracle, RelevanceOracleClient},
    store::DataStore,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Oracle double returning one fixed answer and recording what it was asked.
pub struct ScriptedOracle {
    answer: Result<String, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl ScriptedOracle {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(profile_tags, candidates)` of the most recent call.
    pub fn last_request(&self) -> Option<(Vec<String>, Vec<String>)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RelevanceOracle for ScriptedOracle {
    async fn rank(&self, profile_tags: &[String], candidates: &[String]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((profile_tags.to_vec(), candidates.to_vec()));
        self.answer.clone().map_err(|msg| anyhow::anyhow!(msg))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Records outbound email and push messages instead of sending them.
#[derive(Default)]
pub struct RecordingMessenger {
    pub emails: Mutex<Vec<(String, String, String)>>,
    pub pushes: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EmailService for RecordingMessenger {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<String> {
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        Ok("250 2.0.0 OK queued".to_string())
    }
}

#[async_trait]
impl NotificationService for RecordingMessenger {
    async fn send(&self, device_token: &str, title: &str, body: &str) -> anyhow::Result<String> {
        self.pushes
            .lock()
            .unwrap()
            .push((device_token.to_string(), title.to_string(), body.to_string()));
        Ok("projects/matutor/messages/0:1".to_string())
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn assembler(store: Arc<dyn DataStore>, oracle: Arc<ScriptedOracle>) -> ListingAssembler {
    ListingAssembler::new(store, RelevanceOracleClient::new(oracle))
}

pub fn app_state(
    store: Arc<dyn DataStore>,
    oracle: Arc<ScriptedOracle>,
) -> (Arc<AppState>, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::default());
    let config = Config {
        oracle_backend: OracleBackend::Mock,
        ..Config::default()
    };
    let metrics = Arc::new(MetricsRegistry::new().expect("metrics registry"));
    let state = AppState {
        config: Arc::new(config),
        listings: assembler(store.clone(), oracle).with_metrics(Arc::clone(&metrics)),
        store,
        email: messenger.clone(),
        push: messenger.clone(),
        metrics,
    };
    (Arc::new(state), messenger)
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// Values of `field` across a listing, in order.
pub fn column(items: &[Record], field: &str) -> Vec<Value> {
    items
        .iter()
        .map(|item| item.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

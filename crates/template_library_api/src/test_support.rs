//! Shared fixtures for handler and route tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use prometheus::Registry;
use secrecy::SecretString;
use serde_json::{json, Value};
use template_library_core::{
    InMemoryDocumentStore, Notification, NotificationError, NotificationSender,
    PrometheusWorkflowMetrics, StaticRoleDirectory, TemplateLibrary, TemplateUrls,
};
use tower::ServiceExt;

use crate::{middleware::Claims, routes::create_router, AppState, TokenVerifier};

pub const SECRET: &str = "test-signing-secret";
pub const ADMIN: &str = "admin@example.com";
pub const AUTHOR: &str = "author@example.com";
pub const STAFF: &str = "staff@example.com";

/// Records notifications and optionally fails every delivery.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sender lock").clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("sender lock")
            .push(notification.clone());
        if self.fail {
            return Err(NotificationError::Rejected { status: 503 });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub sender: Arc<RecordingSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sender(RecordingSender::default())
    }

    pub fn with_sender(sender: RecordingSender) -> Self {
        let sender = Arc::new(sender);
        let store = Arc::new(InMemoryDocumentStore::new("api-tests"));
        let registry = Registry::new();
        let metrics = PrometheusWorkflowMetrics::new(&registry).expect("metrics");
        let library = TemplateLibrary::new(
            store.clone(),
            store,
            Arc::new(StaticRoleDirectory::new([ADMIN])),
            sender.clone(),
            TemplateUrls::new("https://console.example.com").expect("urls"),
        )
        .with_metrics(Arc::new(metrics));

        let state = AppState::new(
            Arc::new(library),
            registry,
            TokenVerifier::new(&SecretString::from(SECRET.to_string())),
        );

        Self {
            router: create_router(state.clone(), Duration::from_secs(30)),
            state,
            sender,
        }
    }

    /// Sends a request as `caller` and returns the status and the JSON body (`Null` when empty).
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        caller: Option<(&str, bool)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((email, staff)) = caller {
            builder = builder.header("authorization", format!("Bearer {}", token(email, staff)));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    /// Creates a template as `email` and returns its id.
    pub async fn create(&self, email: &str, visibility: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/templates",
                Some((email, false)),
                Some(template_body(visibility)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["template"]["reference"]["id"]
            .as_str()
            .expect("template id")
            .to_string()
    }
}

pub fn token(email: &str, internal_staff: bool) -> String {
    token_with_secret(email, internal_staff, SECRET)
}

pub fn token_with_secret(email: &str, internal_staff: bool, secret: &str) -> String {
    let claims = Claims {
        sub: email.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        internal_staff,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token")
}

pub fn template_body(visibility: &str) -> Value {
    json!({
        "name": "Monthly spend",
        "description": "Spend per service",
        "visibility": visibility,
        "categories": ["finops"],
        "cloud": ["google-cloud"],
        "config": { "rows": ["service"], "timeInterval": "month" }
    })
}

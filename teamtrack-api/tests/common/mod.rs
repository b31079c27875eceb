//! Common test utilities for integration tests
//!
//! Each `TestContext` owns a router over a fresh in-memory store, so tests
//! are isolated and need no database. Password hashing uses light Argon2
//! parameters to keep registration fast.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use teamtrack_api::app::{build_router, AppState};
use teamtrack_api::config::{ApiConfig, Config, JwtConfig, LogFormat, StoreConfig};
use teamtrack_shared::auth::access::MemberAddPolicy;
use teamtrack_shared::auth::password::PasswordParams;
use teamtrack_shared::store::memory::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "secret1";

/// Test context containing the app and its store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

/// A registered, logged-in user
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn test_config(policy: MemberAddPolicy) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        store: StoreConfig::Memory,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            expiration_hours: 24,
        },
        member_add_policy: policy,
        password: PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        log_format: LogFormat::Pretty,
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(MemberAddPolicy::default())
    }

    pub fn with_policy(policy: MemberAddPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = test_config(policy);
        let app = build_router(AppState::new(store.clone(), config.clone()));

        Self { app, store, config }
    }

    /// Sends a request and returns status and JSON body (`null` if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a user, returning the raw response
    pub async fn register(&self, name: &str, email: &str, company: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "companyName": company,
            })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers and logs in a user of `company`
    pub async fn user(&self, name: &str, company: &str) -> TestUser {
        let email = format!("{}-{}@example.test", name.to_lowercase(), Uuid::new_v4());

        let (status, body) = self.register(name, &email, company).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id: Uuid = body["userId"].as_str().unwrap().parse().unwrap();

        let (status, body) = self.login(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let token = body["token"].as_str().unwrap().to_string();

        TestUser { id, email, token }
    }

    /// Creates a project owned by `owner`, returning its ID
    pub async fn project(&self, owner: &TestUser, name: &str) -> Uuid {
        let (status, body) = self
            .post("/projects", &owner.token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Creates a task in `project`, returning the response
    pub async fn task(
        &self,
        user: &TestUser,
        project: Uuid,
        title: &str,
        assigned_to: Option<Uuid>,
    ) -> (StatusCode, Value) {
        let mut body = json!({ "title": title, "project": project });
        if let Some(assignee) = assigned_to {
            body["assignedTo"] = json!(assignee);
        }
        self.post("/tasks", &user.token, body).await
    }
}

/// IDs in a JSON array of objects
pub fn ids(list: &Value) -> Vec<Uuid> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().parse().unwrap())
        .collect()
}

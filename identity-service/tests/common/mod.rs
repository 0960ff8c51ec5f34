#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use identity_service::{
    build_router,
    config::{
        Environment, IdentityConfig, MongoConfig, RateLimitConfig, SecurityConfig, TokenSource,
    },
    models::{AccessToken, Organization},
    services::MockStore,
    AppState, Stores,
};
use serde_json::Value;
use tower::util::ServiceExt;

pub const ADMIN_CLIENT: &str = "itsyouonline";

pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "identity_test".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_client_id: ADMIN_CLIENT.to_string(),
            token_source: TokenSource::Headers,
            token_field: "Authorization".to_string(),
        },
        rate_limit: RateLimitConfig {
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub store: Arc<MockStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: IdentityConfig) -> Self {
        let store = Arc::new(MockStore::new());
        let state = AppState::new(config, Stores::shared(store.clone()));
        let router = build_router(state.clone())
            .await
            .expect("router should build");
        Self {
            store,
            state,
            router,
        }
    }

    pub fn seed_org(&self, global_id: &str, owners: &[&str], members: &[&str]) {
        let mut org = Organization::new(global_id);
        org.owners = owners.iter().map(|s| s.to_string()).collect();
        org.members = members.iter().map(|s| s.to_string()).collect();
        self.store.insert_organization(org).unwrap();
    }

    pub fn seed_user(&self, username: &str) {
        self.store.insert_user(username).unwrap();
    }

    pub fn seed_token(
        &self,
        token: &str,
        username: &str,
        client_id: &str,
        scope: &str,
        global_id: Option<&str>,
    ) {
        let now = Utc::now();
        self.store
            .insert_token(AccessToken {
                access_token: token.to_string(),
                username: username.to_string(),
                client_id: client_id.to_string(),
                scope: scope.to_string(),
                global_id: global_id.map(str::to_string),
                created_at: now,
                expires_at: now + Duration::hours(1),
            })
            .unwrap();
    }

    /// Token of the platform client with the `admin` scope.
    pub fn seed_admin_token(&self, token: &str, username: &str) {
        self.seed_token(token, username, ADMIN_CLIENT, "admin", None);
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("token {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

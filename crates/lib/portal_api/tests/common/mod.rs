//! Shared harness: router over the in-memory store, a static directory, and a
//! mock helpdesk.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use httpmock::MockServer;
use portal_api::{AppState, config::ApiConfig};
use portal_core::auth::directory::{StaticAccount, StaticDirectory};
use portal_core::auth::identity::IdentityStore;
use portal_core::auth::password::hash_password;
use portal_core::auth::sessions::SessionManager;
use portal_core::links::{parse_links, seed_links_if_empty};
use portal_core::store::MemoryStore;
use portal_core::tickets::{HelpdeskAuth, HelpdeskConfig, TicketService, ZammadClient};
use serde_json::Value;
use tower::ServiceExt;

pub const DIRECTORY_PASSWORD: &str = "admin123";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub helpdesk: MockServer,
}

pub async fn app() -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let store = Arc::new(MemoryStore::new());
    let hash = hash_password(DIRECTORY_PASSWORD).unwrap();
    let directory = StaticDirectory::new(["admin", "john.doe"].map(|username| StaticAccount {
        username: username.to_string(),
        password_hash: hash.clone(),
        email: Some(format!("{username}@corp.example")),
        full_name: None,
    }));
    seed_links_if_empty(
        store.as_ref(),
        parse_links(
            r#"{"links": [{"name": "Wiki", "url": "https://wiki.corp.example", "icon": "book"}]}"#,
        )
        .unwrap(),
    )
    .await
    .unwrap();

    let helpdesk = MockServer::start_async().await;
    let zammad = Arc::new(
        ZammadClient::new(HelpdeskConfig {
            base_url: helpdesk.base_url(),
            auth: HelpdeskAuth::Token("test-token".into()),
            group: "Users".into(),
        })
        .unwrap(),
    );

    let state = AppState {
        config: ApiConfig::default(),
        store: store.clone(),
        identities: IdentityStore::new(store.clone(), Arc::new(directory)),
        sessions: SessionManager::new(store.clone()),
        tickets: TicketService::new(store.clone(), zammad),
    };

    TestApp {
        router: portal_api::router(state),
        store,
        helpdesk,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("request")
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response<Body> {
        self.send(json_request("POST", uri, body, cookie)).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Log in through `path` and return the `sessionId=…` cookie pair.
    pub async fn login(&self, path: &str, username: &str, password: &str) -> String {
        let resp = self
            .post_json(
                path,
                serde_json::json!({"username": username, "password": password}),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login via {path} failed");
        session_cookie(&resp).expect("session cookie")
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// The `sessionId=<token>` pair from a `Set-Cookie` header, if one was set.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sessionId="))
        .and_then(|v| v.split(';').next())
        .filter(|pair| pair.len() > "sessionId=".len())
        .map(str::to_string)
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

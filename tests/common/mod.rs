use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use circld_backend::config::{AppConfig, JwtConfig};
use circld_backend::mailer::{Mailer, MemoryMailer};
use circld_backend::{build_app, AppState, MIGRATOR};

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub mailer: Arc<MemoryMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        // A single connection so every request sees the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("create in-memory sqlite pool");

        MIGRATOR.run(&pool).await.expect("run migrations");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });
        let mailer = Arc::new(MemoryMailer::default());
        let state = AppState::from_parts(pool.clone(), config, mailer.clone() as Arc<dyn Mailer>);

        Self {
            router: build_app(state),
            db: pool,
            mailer,
        }
    }

    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        self.send("GET", path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Response {
        self.send("POST", path, Some(body), token).await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> Response {
        self.send("PUT", path, Some(body), token).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> Response {
        self.send("PATCH", path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        self.send("DELETE", path, None, token).await
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().uri(path).method(method);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    /// Register, verify with the emailed code, log in. Returns (user id, access token).
    pub async fn signup_and_login(&self, username: &str, email: &str) -> (i64, String) {
        let resp = self
            .post_json(
                "/register",
                json!({
                    "first_name": "Test",
                    "last_name": "User",
                    "username": username,
                    "email": email,
                    "password": "password123",
                    "password2": "password123",
                }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "register should succeed");

        let code = self
            .mailer
            .last_code_for(email)
            .expect("verification code should have been sent");
        let resp = self
            .post_json("/verify-code", json!({ "email": email, "code": code }), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "verify should succeed");

        self.login(username).await
    }

    pub async fn login(&self, identifier: &str) -> (i64, String) {
        let resp = self
            .post_json(
                "/auth/login",
                json!({ "username": identifier, "password": "password123" }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login should succeed");
        let body = body_json(resp).await;
        (
            body["user"]["id"].as_i64().unwrap(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    /// Create a group via the API, returning (group id, invite code).
    pub async fn create_group(&self, token: &str, name: &str) -> (i64, String) {
        let resp = self
            .post_json("/groups", json!({ "name": name }), Some(token))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "create group should succeed");
        let body = body_json(resp).await;
        (
            body["id"].as_i64().unwrap(),
            body["invite_code"].as_str().unwrap().to_string(),
        )
    }
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

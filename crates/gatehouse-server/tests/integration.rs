#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use gatehouse_server::auth::TokenIssuer;
use gatehouse_server::http::{AppState, build_router};
use gatehouse_server::service::AuthService;
use gatehouse_server::storage::AuthDatabase;

struct TestApp {
    router: axum::Router,
    db: AuthDatabase,
}

async fn app() -> TestApp {
    app_with(false).await
}

async fn app_with(trust_proxy: bool) -> TestApp {
    let db = AuthDatabase::open_in_memory().await.unwrap();
    let issuer = TokenIssuer::with_ttls(b"access-secret", b"refresh-secret", 900, 86400).unwrap();
    let router = build_router(AppState {
        auth: Arc::new(AuthService::new(db.clone(), Arc::new(issuer))),
        trust_proxy,
    });
    TestApp { router, db }
}

impl TestApp {
    /// Send a request and return (status, parsed JSON body or `Null`).
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
    }

    async fn get_with_bearer(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::get(uri)
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

fn alice() -> Value {
    json!({ "email": "alice@example.com", "password": "Passw0rd!" })
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect(field).to_owned()
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = app().await;

    let (status, reg) = app.post("/auth/register", &alice()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reg["user"]["email"], "alice@example.com");
    assert_eq!(reg["user"]["role"], "user");
    assert!(reg["user"]["createdAt"].is_string());
    assert!(reg["user"].get("passwordHash").is_none());
    assert!(reg["accessToken"].is_string());

    let (status, login) = app.post("/auth/login", &alice()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["id"], reg["user"]["id"]);
    let login_refresh = token(&login, "refreshToken");
    assert_ne!(login_refresh, token(&reg, "refreshToken"));

    let (status, pair) = app
        .post("/auth/refresh", &json!({ "refreshToken": login_refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(pair["accessToken"].is_string());
    assert!(pair.get("user").is_none());
    let new_refresh = token(&pair, "refreshToken");

    let (status, _) = app
        .post("/auth/refresh", &json!({ "refreshToken": login_refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/auth/logout", &json!({ "refreshToken": new_refresh }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app
        .post("/auth/refresh", &json!({ "refreshToken": new_refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["message"], "Invalid refresh token");
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn duplicate_register_is_conflict() {
    let app = app().await;
    app.post("/auth/register", &alice()).await;

    let (status, body) = app
        .post(
            "/auth/register",
            &json!({ "email": "alice@example.com", "password": "something-else" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["message"], "User with this email already exists");
}

#[tokio::test]
async fn bad_credentials_look_the_same() {
    let app = app().await;
    app.post("/auth/register", &alice()).await;

    let wrong_password = app
        .post(
            "/auth/login",
            &json!({ "email": "alice@example.com", "password": "wrong-password" }),
        )
        .await;
    let unknown_email = app
        .post(
            "/auth/login",
            &json!({ "email": "nobody@example.com", "password": "Passw0rd!" }),
        )
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn invalid_bodies_are_bad_requests() {
    let app = app().await;

    let cases = [
        json!({ "email": "not-an-email", "password": "Passw0rd!" }),
        json!({ "email": "alice@example.com", "password": "short" }),
        json!({ "email": "alice@example.com" }),
        json!({}),
    ];
    for body in &cases {
        let (status, resp) = app.post("/auth/register", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(resp["statusCode"], 400);
        assert_eq!(resp["error"], "Bad Request");
    }

    let (status, _) = app.post_raw("/auth/login", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/auth/refresh", &json!({ "refreshToken": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = app().await;

    let (status, body) = app
        .post(
            "/auth/register",
            &json!({ "email": "alice@example.com", "password": "Passw0rd!", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert!(app.db.find_user_by_email("alice@example.com").await.unwrap().is_none());

    let (_, reg) = app.post("/auth/register", &alice()).await;
    assert_eq!(reg["user"]["role"], "user");

    let mut login = alice();
    login["rememberMe"] = json!(true);
    assert_eq!(app.post("/auth/login", &login).await.0, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/auth/refresh",
            &json!({ "refreshToken": token(&reg, "refreshToken"), "userId": "someone-else" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_ignores_extra_fields() {
    let app = app().await;
    let (_, reg) = app.post("/auth/register", &alice()).await;
    let refresh = token(&reg, "refreshToken");

    let (status, _) = app
        .post("/auth/logout", &json!({ "refreshToken": refresh, "everywhere": false }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post("/auth/refresh", &json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_does_not_reveal_password_policy() {
    let app = app().await;
    app.post("/auth/register", &alice()).await;

    let short_for_known = app
        .post("/auth/login", &json!({ "email": "alice@example.com", "password": "short" }))
        .await;
    let short_for_unknown = app
        .post("/auth/login", &json!({ "email": "nobody@example.com", "password": "short" }))
        .await;

    assert_eq!(short_for_known.0, StatusCode::UNAUTHORIZED);
    assert_eq!(short_for_known.1["message"], "Invalid credentials");
    assert_eq!(short_for_known, short_for_unknown);

    let (status, _) = app
        .post("/auth/login", &json!({ "email": "alice@example.com", "password": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_always_succeeds() {
    let app = app().await;

    for body in [
        "",
        "{not json",
        "{}",
        r#"{"refreshToken":"garbage"}"#,
        r#"{"refreshToken":""}"#,
    ] {
        let (status, resp) = app.post_raw("/auth/logout", body).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "body: {body:?}");
        assert_eq!(resp, Value::Null);
    }

    let (_, reg) = app.post("/auth/register", &alice()).await;
    let refresh = json!({ "refreshToken": token(&reg, "refreshToken") });
    assert_eq!(app.post("/auth/logout", &refresh).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.post("/auth/logout", &refresh).await.0, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn users_me_requires_access_token() {
    let app = app().await;
    let (_, reg) = app.post("/auth/register", &alice()).await;

    let (status, me) = app
        .get_with_bearer("/users/me", &token(&reg, "accessToken"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], reg["user"]["id"]);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["role"], "user");
    assert_eq!(me["createdAt"], reg["user"]["createdAt"]);

    let (status, _) = app
        .get_with_bearer("/users/me", &token(&reg, "refreshToken"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get_with_bearer("/users/me", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Request::get("/users/me").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = app
        .send(
            Request::get("/users/me")
                .header("authorization", "Basic YWxpY2U6cHc=")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_and_bad_bearer_look_the_same() {
    let app = app().await;

    let missing = app
        .send(Request::get("/users/me").body(Body::empty()).unwrap())
        .await;
    let garbage = app.get_with_bearer("/users/me", "garbage").await;

    assert_eq!(missing.0, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.1["message"], "Unauthorized");
    assert_eq!(missing, garbage);
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = app().await;
    let (_, reg) = app.post("/auth/register", &alice()).await;
    let (_, login) = app.post("/auth/login", &alice()).await;

    let (status, _) = app
        .send(
            Request::post("/auth/logout-all")
                .header("authorization", format!("Bearer {}", token(&login, "accessToken")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for refresh in [token(&reg, "refreshToken"), token(&login, "refreshToken")] {
        let (status, _) = app
            .post("/auth/refresh", &json!({ "refreshToken": refresh }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app
        .send(Request::post("/auth/logout-all").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_records_user_agent_and_forwarded_ip() {
    let app = app_with(true).await;

    let (status, reg) = app
        .send(
            Request::post("/auth/register")
                .header("content-type", "application/json")
                .header("user-agent", "gatehouse-test/1.0")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(Body::from(alice().to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let user_id = reg["user"]["id"].as_str().unwrap();
    let sessions = app.db.list_user_sessions(user_id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].user_agent.as_deref(), Some("gatehouse-test/1.0"));
    assert_eq!(sessions[0].ip.as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn forwarded_ip_ignored_without_trust_proxy() {
    let app = app().await;

    let (_, reg) = app
        .send(
            Request::post("/auth/register")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::from(alice().to_string()))
                .unwrap(),
        )
        .await;

    let user_id = reg["user"]["id"].as_str().unwrap();
    let sessions = app.db.list_user_sessions(user_id).await.unwrap();
    assert_eq!(sessions[0].ip, None);
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = app().await;

    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = app
        .send(Request::get("/nope").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cannot GET /nope");
}

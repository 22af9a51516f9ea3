use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use chirpy::auth::{hash_password, issue_access_token, validate_access_token, RefreshTokenState};
use chirpy::configuration::AuthSettings;
use chirpy::error::AppError;
use chirpy::middleware::{AuthenticatedUser, JwtMiddleware};
use chirpy::session::SessionService;
use chirpy::startup::{configure, json_config};
use chirpy::store::{InMemoryStore, RefreshTokenStore, User, UserDirectory};
use serde_json::{json, Value};
use uuid::Uuid;

const SECRET: &str = "integration-test-signing-secret";
const POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";
const EMAIL: &str = "walt@breakingbad.com";
const PASSWORD: &str = "04234";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub user: User,
}

/// Stand-in for a resource handler of the wider API: only the owner may
/// delete.
async fn delete_owned(
    owner_id: web::Path<Uuid>,
    caller: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    caller.ensure_owns(owner_id.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryStore::new());
    let user = store
        .create_user(EMAIL, &hash_password(PASSWORD).unwrap())
        .await
        .expect("Failed to add user");

    let settings = AuthSettings {
        signing_secret: SECRET.to_string(),
        polka_key: POLKA_KEY.to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_days: 60,
    };
    let session = web::Data::new(SessionService::new(store.clone(), store.clone(), settings));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(session.clone())
            .app_data(json_config())
            .configure(configure(session.clone()))
            .service(
                web::scope("/protected")
                    .wrap(JwtMiddleware::new(session.clone()))
                    .route("/owners/{owner_id}", web::delete().to(delete_owned)),
            )
    })
    .listen(listener)
    .expect("Failed to bind address")
    .run();
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        user,
    }
}

impl TestApp {
    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}/api/login", &self.address))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login_ok(&self) -> Value {
        let response = self.login(EMAIL, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn put_user(&self, access_token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .put(&format!("{}/api/users", &self.address))
            .json(&body);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn post_with_auth(&self, path: &str, authorization: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}{}", &self.address, path))
            .header("Authorization", authorization)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_for_valid_credentials() {
    let app = spawn_app().await;

    let body = app.login_ok().await;

    assert_eq!(body["id"], app.user.id.to_string());
    assert_eq!(body["email"], EMAIL);
    assert_eq!(body["is_chirpy_red"], false);

    let access_token = body["token"].as_str().expect("missing access token");
    assert_eq!(validate_access_token(access_token, SECRET).unwrap(), app.user.id);

    let refresh_token = body["refresh_token"].as_str().expect("missing refresh token");
    assert_eq!(refresh_token.len(), 64);
    let record = app.store.lookup(refresh_token).await.expect("refresh token not stored");
    assert_eq!(record.user_id, app.user.id);
    assert_eq!(record.state_at(chrono::Utc::now()), RefreshTokenState::Active);
}

#[tokio::test]
async fn login_does_not_leak_the_password_hash() {
    let app = spawn_app().await;

    let body = app.login_ok().await;

    assert!(body.get("hashed_password").is_none());
    assert!(!body.to_string().contains(&app.user.hashed_password));
}

#[tokio::test]
async fn login_returns_401_for_wrong_password_and_unknown_email() {
    let app = spawn_app().await;

    let wrong_password = app.login(EMAIL, "wrong").await;
    let unknown_email = app.login("jesse@breakingbad.com", PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let first: Value = wrong_password.json().await.unwrap();
    let second: Value = unknown_email.json().await.unwrap();
    assert_eq!(first["message"], second["message"]);
    assert_eq!(first["code"], second["code"]);
}

#[tokio::test]
async fn login_returns_400_for_malformed_json() {
    let app = spawn_app().await;

    let test_cases = vec![
        ("{\"email\": ", "truncated body"),
        ("{\"email\": \"walt@breakingbad.com\"}", "missing password"),
        ("[]", "wrong shape"),
    ];

    for (body, reason) in test_cases {
        let response = reqwest::Client::new()
            .post(&format!("{}/api/login", &app.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "Should reject {}", reason);
        let text = response.text().await.unwrap();
        assert!(!text.contains("missing field"), "Leaked parser detail: {}", text);
    }
}

// --- Users ---

#[tokio::test]
async fn create_user_returns_201_and_allows_login() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/users", &app.address))
        .json(&json!({"email": "kim@wexler.com", "password": "s3cret"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "kim@wexler.com");
    assert_eq!(body["is_chirpy_red"], false);
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("token").is_none());

    let stored = app.store.get_user_by_email("kim@wexler.com").await.unwrap();
    assert_ne!(stored.hashed_password, "s3cret");
    assert_eq!(200, app.login("kim@wexler.com", "s3cret").await.status().as_u16());
}

#[tokio::test]
async fn create_user_rejects_duplicate_and_malformed_input() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/users", &app.address);

    let duplicate = client
        .post(&url)
        .json(&json!({"email": EMAIL, "password": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(409, duplicate.status().as_u16());

    let empty_password = client
        .post(&url)
        .json(&json!({"email": "kim@wexler.com", "password": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, empty_password.status().as_u16());

    let truncated = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(400, truncated.status().as_u16());
}

#[tokio::test]
async fn update_user_changes_the_callers_credentials() {
    let app = spawn_app().await;
    let body = app.login_ok().await;
    let access_token = body["token"].as_str().unwrap();

    let response = app
        .put_user(
            Some(access_token),
            json!({"email": "heisenberg@breakingbad.com", "password": "blue-sky"}),
        )
        .await;

    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["id"], app.user.id.to_string());
    assert_eq!(updated["email"], "heisenberg@breakingbad.com");

    assert_eq!(401, app.login(EMAIL, PASSWORD).await.status().as_u16());
    assert_eq!(
        200,
        app.login("heisenberg@breakingbad.com", "blue-sky")
            .await
            .status()
            .as_u16()
    );
}

#[tokio::test]
async fn update_user_requires_a_valid_access_token() {
    let app = spawn_app().await;
    let new_credentials = json!({"email": "heisenberg@breakingbad.com", "password": "blue-sky"});

    let missing = app.put_user(None, new_credentials.clone()).await;
    assert_eq!(401, missing.status().as_u16());

    let expired = issue_access_token(app.user.id, SECRET, chrono::Duration::seconds(-10)).unwrap();
    let response = app.put_user(Some(expired.as_str()), new_credentials.clone()).await;
    assert_eq!(401, response.status().as_u16());

    let body = app.login_ok().await;
    let refresh_token = body["refresh_token"].as_str().unwrap();
    let response = app.put_user(Some(refresh_token), new_credentials).await;
    assert_eq!(401, response.status().as_u16());

    // The token is checked before the body is read
    let response = reqwest::Client::new()
        .put(&format!("{}/api/users", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let user = app.store.get_user_by_id(app.user.id).await.unwrap();
    assert_eq!(user.email, EMAIL);
}

#[tokio::test]
async fn update_user_rejects_an_email_in_use() {
    let app = spawn_app().await;
    app.store
        .create_user("jesse@breakingbad.com", &hash_password("cap'n").unwrap())
        .await
        .unwrap();
    let body = app.login_ok().await;

    let response = app
        .put_user(
            body["token"].as_str(),
            json!({"email": "jesse@breakingbad.com", "password": "x"}),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_returns_new_access_token() {
    let app = spawn_app().await;
    let body = app.login_ok().await;
    let refresh_token = body["refresh_token"].as_str().unwrap();

    let response = app
        .post_with_auth("/api/refresh", &format!("Bearer {}", refresh_token))
        .await;

    assert_eq!(200, response.status().as_u16());
    let renewed: Value = response.json().await.unwrap();
    let token = renewed["token"].as_str().expect("missing token");
    assert_eq!(validate_access_token(token, SECRET).unwrap(), app.user.id);

    // No rotation: the same refresh token keeps working
    let again = app
        .post_with_auth("/api/refresh", &format!("Bearer {}", refresh_token))
        .await;
    assert_eq!(200, again.status().as_u16());
}

#[tokio::test]
async fn refresh_fails_after_revoke() {
    let app = spawn_app().await;
    let body = app.login_ok().await;
    let authorization = format!("Bearer {}", body["refresh_token"].as_str().unwrap());

    let revoked = app.post_with_auth("/api/revoke", &authorization).await;
    assert_eq!(204, revoked.status().as_u16());

    let response = app.post_with_auth("/api/refresh", &authorization).await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_fails_for_expired_token() {
    let app = spawn_app().await;
    let token = "a".repeat(64);
    app.store
        .store(&token, app.user.id, -1)
        .await
        .expect("Failed to store token");

    let response = app
        .post_with_auth("/api/refresh", &format!("Bearer {}", token))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_bad_authorization_headers() {
    let app = spawn_app().await;

    let missing = reqwest::Client::new()
        .post(&format!("{}/api/refresh", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, missing.status().as_u16());

    let malformed = app.post_with_auth("/api/refresh", "Bearer: abc123").await;
    assert_eq!(400, malformed.status().as_u16());

    let unknown = app.post_with_auth("/api/refresh", "Bearer abc123").await;
    assert_eq!(401, unknown.status().as_u16());
}

// --- Revoke ---

#[tokio::test]
async fn revoke_returns_404_for_unknown_or_repeated_token() {
    let app = spawn_app().await;

    let unknown = app.post_with_auth("/api/revoke", "Bearer abc123").await;
    assert_eq!(404, unknown.status().as_u16());

    let body = app.login_ok().await;
    let authorization = format!("Bearer {}", body["refresh_token"].as_str().unwrap());
    assert_eq!(204, app.post_with_auth("/api/revoke", &authorization).await.status().as_u16());
    assert_eq!(404, app.post_with_auth("/api/revoke", &authorization).await.status().as_u16());
}

// --- Ownership guard ---

#[tokio::test]
async fn owner_can_act_on_own_resource() {
    let app = spawn_app().await;
    let body = app.login_ok().await;

    let response = reqwest::Client::new()
        .delete(&format!("{}/protected/owners/{}", &app.address, app.user.id))
        .bearer_auth(body["token"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
async fn non_owner_gets_403() {
    let app = spawn_app().await;
    let body = app.login_ok().await;

    let response = reqwest::Client::new()
        .delete(&format!("{}/protected/owners/{}", &app.address, Uuid::new_v4()))
        .bearer_auth(body["token"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn protected_route_rejects_missing_expired_and_refresh_tokens() {
    let app = spawn_app().await;
    let url = format!("{}/protected/owners/{}", &app.address, app.user.id);
    let client = reqwest::Client::new();

    let missing = client.delete(&url).send().await.unwrap();
    assert_eq!(401, missing.status().as_u16());

    let expired = issue_access_token(app.user.id, SECRET, chrono::Duration::seconds(-10)).unwrap();
    let response = client.delete(&url).bearer_auth(expired).send().await.unwrap();
    assert_eq!(401, response.status().as_u16());

    let body = app.login_ok().await;
    let response = client
        .delete(&url)
        .bearer_auth(body["refresh_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

// --- Webhook ---

async fn send_webhook(app: &TestApp, authorization: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(&format!("{}/api/polka/webhooks", &app.address))
        .header("Authorization", authorization)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn webhook_upgrades_user() {
    let app = spawn_app().await;

    let response = send_webhook(
        &app,
        &format!("ApiKey {}", POLKA_KEY),
        json!({"event": "user.upgraded", "data": {"user_id": app.user.id}}),
    )
    .await;

    assert_eq!(204, response.status().as_u16());
    let user = app.store.get_user_by_id(app.user.id).await.unwrap();
    assert!(user.is_chirpy_red);
}

#[tokio::test]
async fn webhook_ignores_other_events() {
    let app = spawn_app().await;

    let response = send_webhook(
        &app,
        &format!("ApiKey {}", POLKA_KEY),
        json!({"event": "user.payment_failed", "data": {"user_id": app.user.id}}),
    )
    .await;

    assert_eq!(204, response.status().as_u16());
    let user = app.store.get_user_by_id(app.user.id).await.unwrap();
    assert!(!user.is_chirpy_red);
}

#[tokio::test]
async fn webhook_rejects_wrong_api_key() {
    let app = spawn_app().await;
    let body = json!({"event": "user.upgraded", "data": {"user_id": app.user.id}});

    let wrong_key = send_webhook(&app, "ApiKey not-the-key", body.clone()).await;
    assert_eq!(401, wrong_key.status().as_u16());

    let wrong_scheme = send_webhook(&app, &format!("Bearer {}", POLKA_KEY), body).await;
    assert_eq!(400, wrong_scheme.status().as_u16());

    let user = app.store.get_user_by_id(app.user.id).await.unwrap();
    assert!(!user.is_chirpy_red);
}

async fn send_raw_webhook(
    app: &TestApp,
    authorization: Option<&str>,
    body: &'static str,
) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(&format!("{}/api/polka/webhooks", &app.address))
        .header("Content-Type", "application/json")
        .body(body);
    if let Some(authorization) = authorization {
        request = request.header("Authorization", authorization);
    }
    request.send().await.expect("Failed to execute request.")
}

#[tokio::test]
async fn webhook_checks_the_key_before_the_body() {
    let app = spawn_app().await;

    let no_key = send_raw_webhook(&app, None, "{not json").await;
    assert_eq!(401, no_key.status().as_u16());

    let wrong_key = send_raw_webhook(&app, Some("ApiKey not-the-key"), "{not json").await;
    assert_eq!(401, wrong_key.status().as_u16());

    let authorization = format!("ApiKey {}", POLKA_KEY);
    let right_key = send_raw_webhook(&app, Some(authorization.as_str()), "{not json").await;
    assert_eq!(400, right_key.status().as_u16());
    let text = right_key.text().await.unwrap();
    assert!(!text.contains("key must be a string"), "Leaked parser detail: {}", text);
}

#[tokio::test]
async fn webhook_reports_unknown_or_invalid_user() {
    let app = spawn_app().await;
    let authorization = format!("ApiKey {}", POLKA_KEY);

    let unknown = send_webhook(
        &app,
        &authorization,
        json!({"event": "user.upgraded", "data": {"user_id": Uuid::new_v4()}}),
    )
    .await;
    assert_eq!(404, unknown.status().as_u16());

    let invalid = send_webhook(
        &app,
        &authorization,
        json!({"event": "user.upgraded", "data": {"user_id": "not-a-uuid"}}),
    )
    .await;
    assert_eq!(400, invalid.status().as_u16());
}

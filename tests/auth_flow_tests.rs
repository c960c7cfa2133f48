use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use openblog::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    configure(&mut config);

    let state = openblog::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    openblog::api::router(state).await
}

async fn spawn_app() -> Router {
    spawn_app_with(|_| {}).await
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(openblog::api::SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn form_request(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, username: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": username, "password": password }),
        ))
        .await
        .unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": username, "password": password }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_login_post_logout_flow() {
    let app = spawn_app().await;

    let response = register(&app, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password_hash").is_none());

    let response = login(&app, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("login sets a session cookie");
    let body = body_json(response).await;
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/posts",
            Some(&cookie),
            &json!({ "title": "Hello", "content": "First post" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["author"], "alice");
    assert_eq!(body["data"]["likes"], 0);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/logout", Some(&cookie), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/posts",
            Some(&cookie),
            &json!({ "title": "Again", "content": "Should fail" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_default_config_accepts_short_passwords() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = openblog::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = openblog::api::router(state).await;

    let response = register(&app, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = login(&app, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = register(&app, "bob", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = spawn_app().await;

    assert_eq!(register(&app, "alice", "pw1").await.status(), StatusCode::CREATED);

    let response = register(&app, "alice", "other-password").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);

    // The first credential is untouched
    assert_eq!(login(&app, "alice", "pw1").await.status(), StatusCode::OK);
    assert_eq!(
        login(&app, "alice", "other-password").await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let app = spawn_app().await;
    register(&app, "alice", "pw1").await;

    let wrong = login(&app, "alice", "nope").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&wrong).is_none());
    let wrong_body = body_json(wrong).await;

    let unknown = login(&app, "mallory", "pw1").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = body_json(unknown).await;

    assert_eq!(wrong_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn test_login_rejects_empty_fields() {
    let app = spawn_app().await;

    let response = login(&app, "", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_reports_identity() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(get_request("/api/auth/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["authenticated"], false);
    assert!(body["data"].get("user").is_none());

    register(&app, "alice", "pw1").await;
    let response = login(&app, "alice", "pw1").await;
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/auth/me", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
}

#[tokio::test]
async fn test_logout_without_session_is_ok() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/logout", None, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_is_throttled_after_repeated_failures() {
    let app = spawn_app_with(|config| {
        config.security.login_throttle.max_attempts = 2;
        config.security.login_throttle.lockout_seconds = 60;
    })
    .await;
    register(&app, "alice", "pw1").await;

    assert_eq!(login(&app, "alice", "bad").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(&app, "alice", "bad").await.status(), StatusCode::UNAUTHORIZED);

    let response = login(&app, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_form_register_sets_flash_and_redirects_to_login() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(form_request("/register", None, "username=bob&password=secret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    let cookie = session_cookie(&response).expect("flash needs a session");

    let response = app
        .clone()
        .oneshot(get_request("/api/flash", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["level"], "info");
    assert_eq!(
        body["data"][0]["message"],
        "Registration successful. Please login."
    );

    // Drained on read
    let response = app
        .clone()
        .oneshot(get_request("/api/flash", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_form_login_failure_redirects_back() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(form_request("/login", None, "username=ghost&password=nothing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_form_gated_routes_redirect_to_login() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(form_request("/post/new", None, "title=T&content=C"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login?next=/post/new");

    let response = app
        .clone()
        .oneshot(form_request("/post/1", None, "content=hi"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login?next=/post/1");
}

#[tokio::test]
async fn test_form_login_then_create_post() {
    let app = spawn_app().await;
    register(&app, "carol", "pw1").await;

    let response = app
        .clone()
        .oneshot(form_request("/login", None, "username=carol&password=pw1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .clone()
        .oneshot(form_request(
            "/post/new",
            Some(&cookie),
            "title=From+a+form&content=Body&tags=rust",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let response = app.clone().oneshot(get_request("/api/posts", None)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["title"], "From a form");
    assert_eq!(body["data"][0]["tags"], "rust");
    assert_eq!(body["data"][0]["author"], "carol");

    let response = app
        .clone()
        .oneshot(get_request("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

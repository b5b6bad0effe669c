use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, Response, StatusCode, header},
    routing::get,
};
use axum_typed_sessions::{MemoryStore, SessionHandle, SessionService};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Visits {
    count: u32,
}

async fn visit(handle: SessionHandle<Visits>) -> String {
    let mut session = handle.lock().await;
    let visits = session.payload_mut().unwrap();
    visits.count += 1;
    visits.count.to_string()
}

async fn logout(
    State(sessions): State<SessionService<Visits, MemoryStore>>,
    handle: SessionHandle<Visits>,
) -> StatusCode {
    let mut session = handle.lock().await;
    match sessions.end_session(&mut session).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn app(sessions: SessionService<Visits, MemoryStore>) -> Router {
    Router::new()
        .route("/visit", get(visit))
        .route("/logout", get(logout))
        .layer(sessions.clone())
        .with_state(sessions)
}

fn service() -> SessionService<Visits, MemoryStore> {
    SessionService::builder()
        .store(MemoryStore::new())
        .build::<Visits>()
}

fn request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response carries a session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_owned()
}

fn max_age(response: &Response<Body>) -> Option<i64> {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?;
    raw.split(';').find_map(|attr| {
        attr.trim()
            .strip_prefix("Max-Age=")
            .and_then(|secs| secs.parse().ok())
    })
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn cookieless_request_gets_a_fresh_session() -> anyhow::Result<()> {
    let app = app(service());

    let response = app.oneshot(request("/visit", None)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).starts_with("session="));
    assert_eq!(body_string(response).await, "1");

    Ok(())
}

#[tokio::test]
async fn state_survives_across_requests() -> anyhow::Result<()> {
    let app = app(service());

    let first = app.clone().oneshot(request("/visit", None)).await?;
    let cookie = session_cookie(&first);
    assert_eq!(body_string(first).await, "1");

    let second = app.clone().oneshot(request("/visit", Some(&cookie))).await?;
    assert_eq!(body_string(second).await, "2");

    let third = app.oneshot(request("/visit", Some(&cookie))).await?;
    assert_eq!(body_string(third).await, "3");

    Ok(())
}

#[tokio::test]
async fn unknown_cookie_starts_a_fresh_session() -> anyhow::Result<()> {
    let app = app(service());

    let response = app
        .oneshot(request("/visit", Some("session=forged")))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert_ne!(cookie, "session=forged");
    assert_eq!(body_string(response).await, "1");

    Ok(())
}

#[tokio::test]
async fn logout_sends_a_removal_cookie() -> anyhow::Result<()> {
    let app = app(service());

    let first = app.clone().oneshot(request("/visit", None)).await?;
    let cookie = session_cookie(&first);

    let logout = app
        .clone()
        .oneshot(request("/logout", Some(&cookie)))
        .await?;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);
    assert_eq!(session_cookie(&logout), "session=");
    assert!(max_age(&logout).unwrap() <= 0);

    // The old identifier is gone; replaying it starts over.
    let replay = app.oneshot(request("/visit", Some(&cookie))).await?;
    assert_eq!(body_string(replay).await, "1");

    Ok(())
}

#[tokio::test]
async fn extractor_without_layer_is_an_error() -> anyhow::Result<()> {
    let bare = Router::new().route("/visit", get(visit));

    let response = bare.oneshot(request("/visit", None)).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    Ok(())
}

#[tokio::test]
async fn rotation_reissues_the_cookie_per_request() -> anyhow::Result<()> {
    let sessions = SessionService::builder()
        .store(MemoryStore::new())
        .rotate_ids(true)
        .build::<Visits>();
    let app = app(sessions);

    let first = app.clone().oneshot(request("/visit", None)).await?;
    let issued = session_cookie(&first);
    assert_eq!(body_string(first).await, "1");

    let second = app.clone().oneshot(request("/visit", Some(&issued))).await?;
    let rotated = session_cookie(&second);
    assert_ne!(issued, rotated);
    assert_eq!(body_string(second).await, "2");

    // The pre-rotation identifier no longer resolves.
    let replay = app.oneshot(request("/visit", Some(&issued))).await?;
    assert_eq!(body_string(replay).await, "1");

    Ok(())
}

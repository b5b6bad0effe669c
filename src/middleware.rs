use std::{
    convert::Infallible,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, MutexGuard};
use tower::{Layer, Service};

use crate::{error::SessionError, service::SessionService, session::Session, store::SessionStore};

/// Shared handle to the request's session, inserted into request
/// extensions by [`SessionMiddleware`] and extracted by handlers.
///
/// The middleware saves the record back to the store after the handler
/// returns, so mutations made through [`lock`](SessionHandle::lock)
/// persist without an explicit save.
pub struct SessionHandle<T>(Arc<Mutex<Session<T>>>);

impl<T> SessionHandle<T> {
    fn new(session: Session<T>) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session<T>> {
        self.0.lock().await
    }
}

impl<T> Clone for SessionHandle<T> {
    fn clone(&self) -> Self {
        SessionHandle(self.0.clone())
    }
}

impl<S, T> FromRequestParts<S> for SessionHandle<T>
where
    S: Send + Sync,
    T: Send + 'static,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, StatusCode> {
        // Absent only when the layer is not installed.
        parts
            .extensions
            .get::<SessionHandle<T>>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<SERV, T, S> Layer<SERV> for SessionService<T, S> {
    type Service = SessionMiddleware<T, S, SERV>;

    fn layer(&self, inner: SERV) -> Self::Service {
        SessionMiddleware {
            sessions: self.clone(),
            rest: inner,
        }
    }
}

/// Threads a session through every request: resolves the inbound cookie
/// to a record (creating a fresh `T::default()` session when there is
/// none), hands it to the inner service via [`SessionHandle`], saves it
/// back afterwards and appends the `Set-Cookie` header. Session
/// failures become `500 Internal Server Error`.
pub struct SessionMiddleware<T, S, SERV> {
    sessions: SessionService<T, S>,
    rest: SERV,
}

impl<T, S, SERV> SessionMiddleware<T, S, SERV>
where
    T: Default + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SessionStore,
{
    async fn resolve(&self, headers: &HeaderMap) -> Result<Session<T>, SessionError> {
        let Some(value) = session_cookie_value(headers, self.sessions.cookie_name()) else {
            return self.sessions.create_session(T::default()).await;
        };

        let mut session = self.sessions.resume(value.into());
        match self.sessions.load_session(&mut session).await {
            Ok(()) => Ok(session),
            // A stale or forged identifier starts over with a fresh session.
            Err(err) if err.is_not_found() => self.sessions.create_session(T::default()).await,
            Err(err) => Err(err),
        }
    }
}

impl<T, S, SERV> Service<Request> for SessionMiddleware<T, S, SERV>
where
    SERV: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
    SERV::Response: IntoResponse,
    SERV::Future: Send,
    T: Default + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SessionStore,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.rest.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let mut this = self.clone();
        Box::pin(async move {
            let session = match this.resolve(req.headers()).await {
                Ok(session) => session,
                Err(err) => {
                    tracing::error!(error = %err, "failed to resolve session");
                    return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                }
            };

            let handle = SessionHandle::new(session);
            req.extensions_mut().insert(handle.clone());

            let mut response = this.rest.call(req).await?.into_response();

            let session = handle.lock().await;
            if !session.is_ended()
                && let Err(err) = this.sessions.save_session(&session).await
            {
                tracing::error!(error = %err, "failed to save session");
                return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
            }

            match HeaderValue::from_str(&session.cookie().encoded().to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => {
                    tracing::error!(error = %err, "session cookie is not header-safe");
                    return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                }
            }

            Ok(response)
        })
    }
}

impl<T, S, SERV> Clone for SessionMiddleware<T, S, SERV>
where
    SERV: Clone,
{
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            rest: self.rest.clone(),
        }
    }
}

fn session_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| Cookie::split_parse_encoded(header.to_owned()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

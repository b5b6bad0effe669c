use std::{marker::PhantomData, sync::Arc};

use cookie::{
    Cookie,
    time::{Duration, OffsetDateTime},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{
    builder::SessionServiceBuilder,
    error::{SessionError, StoreError},
    id::{IdGenerator, SessionId},
    session::Session,
    store::SessionStore,
};

/// Drives the session lifecycle against one store: identifier
/// generation, JSON (de)serialization of the typed payload, and the lock
/// that keeps read-modify-write sequences against one identifier
/// consistent.
///
/// One instance per payload type `T`, built once at startup via
/// [`SessionService::builder`] and shared by cloning (an `Arc` handle).
/// Several instances with different payload types may share one store
/// handle; the lock is per-instance, so no ordering holds across them.
pub struct SessionService<T, S> {
    inner: Arc<SessionServiceInner<T, S>>,
}

struct SessionServiceInner<T, S> {
    store: S,
    template: Cookie<'static>,
    generator: IdGenerator,
    rotate: bool,
    lock: Mutex<()>,
    _payload: PhantomData<fn(T) -> T>,
}

impl SessionService<(), ()> {
    pub fn builder() -> SessionServiceBuilder<()> {
        SessionServiceBuilder::new()
    }
}

impl<T, S> SessionService<T, S> {
    pub(crate) fn from_parts(
        store: S,
        template: Cookie<'static>,
        generator: IdGenerator,
        rotate: bool,
    ) -> Self {
        SessionService {
            inner: Arc::new(SessionServiceInner {
                store,
                template,
                generator,
                rotate,
                lock: Mutex::new(()),
                _payload: PhantomData,
            }),
        }
    }

    /// The cookie template with its value set to `id`.
    pub fn cookie_for(&self, id: &SessionId) -> Cookie<'static> {
        let mut cookie = self.inner.template.clone();
        cookie.set_value(id.as_str().to_owned());
        cookie
    }

    /// The configured cookie name, for locating the session cookie on an
    /// inbound request.
    pub fn cookie_name(&self) -> &str {
        self.inner.template.name()
    }

    /// Builds a detached record for an identifier presented by a client.
    /// [`load_session`](Self::load_session) populates it.
    pub fn resume(&self, id: SessionId) -> Session<T> {
        Session::detached(self.cookie_for(&id))
    }
}

impl<T, S> SessionService<T, S>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SessionStore,
{
    /// Starts a session around `payload`: generates a fresh identifier,
    /// writes the payload to the store, and returns a record whose
    /// cookie carries the new identifier.
    ///
    /// Runs outside the service lock — it only ever touches an
    /// identifier no other call can name yet, which is exactly the
    /// freshness the generator must guarantee.
    pub async fn create_session(&self, payload: T) -> Result<Session<T>, SessionError> {
        let id = (self.inner.generator)().map_err(SessionError::Generation)?;
        let bytes = serde_json::to_vec(&payload)?;

        self.inner
            .store
            .create(&id, bytes)
            .await
            .map_err(SessionError::StoreWrite)?;

        tracing::debug!(session = %id, "created session");
        Ok(Session::new(payload, self.cookie_for(&id)))
    }

    /// Refreshes the record's payload from the store, keyed by the
    /// identifier in its cookie. Fails with [`SessionError::NotFound`]
    /// when the identifier resolves to no live session.
    ///
    /// With [`rotate_ids`](SessionServiceBuilder::rotate_ids) enabled
    /// the record comes back under a fresh identifier: the payload is
    /// written under the new key, the old entry deleted and the cookie
    /// value rewritten, all within the same lock acquisition.
    pub async fn load_session(&self, session: &mut Session<T>) -> Result<(), SessionError> {
        let _guard = self.inner.lock.lock().await;

        let id = session.id();
        let bytes = self.inner.store.load(&id).await.map_err(|err| match err {
            StoreError::NotFound => SessionError::NotFound,
            err => SessionError::StoreRead(err),
        })?;
        let payload: T = serde_json::from_slice(&bytes)?;

        if self.inner.rotate {
            let next = (self.inner.generator)().map_err(SessionError::Generation)?;
            self.inner
                .store
                .create(&next, bytes)
                .await
                .map_err(SessionError::StoreWrite)?;
            self.inner
                .store
                .delete(&id)
                .await
                .map_err(SessionError::StoreDelete)?;

            tracing::debug!(old = %id, new = %next, "rotated session id");
            session.cookie_mut().set_value(next.as_str().to_owned());
        }

        session.set_payload(Some(payload));
        Ok(())
    }

    /// Serializes the payload and upserts it under the identifier in the
    /// record's cookie. A record that has already been ended carries no
    /// payload and fails with [`SessionError::NotFound`].
    pub async fn save_session(&self, session: &Session<T>) -> Result<(), SessionError> {
        let _guard = self.inner.lock.lock().await;

        let Some(payload) = session.payload() else {
            return Err(SessionError::NotFound);
        };
        let bytes = serde_json::to_vec(payload)?;

        self.inner
            .store
            .save(&session.id(), bytes)
            .await
            .map_err(SessionError::StoreWrite)?;

        tracing::debug!(session = %session.id(), "saved session");
        Ok(())
    }

    /// Deletes the store entry and invalidates the record in place: the
    /// cookie comes back expired with an empty value and the payload is
    /// gone. Ending an already-ended session succeeds.
    pub async fn end_session(&self, session: &mut Session<T>) -> Result<(), SessionError> {
        let _guard = self.inner.lock.lock().await;

        let id = session.id();
        self.inner
            .store
            .delete(&id)
            .await
            .map_err(SessionError::StoreDelete)?;

        let cookie = session.cookie_mut();
        cookie.set_value("");
        cookie.set_max_age(Duration::seconds(-1));
        cookie.set_expires(OffsetDateTime::now_utc());
        session.set_payload(None);

        tracing::debug!(session = %id, "ended session");
        Ok(())
    }
}

impl<T, S> Clone for SessionService<T, S> {
    fn clone(&self) -> Self {
        SessionService {
            inner: self.inner.clone(),
        }
    }
}

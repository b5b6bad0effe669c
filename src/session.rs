use std::{fmt, hash::Hash};

use cookie::Cookie;

use crate::id::SessionId;

/// One client's session as handed to request-handling code: the typed
/// payload plus the cookie that carries the identifier back to the
/// client.
///
/// The cookie value is always the current identifier; after
/// [`end_session`](crate::SessionService::end_session) it is empty and
/// the payload is gone.
#[derive(Clone)]
pub struct Session<T> {
    payload: Option<T>,
    cookie: Cookie<'static>,
}

impl<T> Session<T> {
    pub(crate) fn new(payload: T, cookie: Cookie<'static>) -> Self {
        Self {
            payload: Some(payload),
            cookie,
        }
    }

    pub(crate) fn detached(cookie: Cookie<'static>) -> Self {
        Self {
            payload: None,
            cookie,
        }
    }

    /// The current identifier, read from the cookie value.
    pub fn id(&self) -> SessionId {
        SessionId::from_cookie(&self.cookie)
    }

    pub fn cookie(&self) -> &Cookie<'static> {
        &self.cookie
    }

    pub(crate) fn cookie_mut(&mut self) -> &mut Cookie<'static> {
        &mut self.cookie
    }

    /// `None` once the session has been ended, or before a detached
    /// record has been loaded.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Mutations are visible to the caller immediately and reach the
    /// store on the next save.
    pub fn payload_mut(&mut self) -> Option<&mut T> {
        self.payload.as_mut()
    }

    pub(crate) fn set_payload(&mut self, payload: Option<T>) {
        self.payload = payload;
    }

    /// `true` when the record carries no payload — ended, or detached
    /// and not yet loaded.
    pub fn is_ended(&self) -> bool {
        self.payload.is_none()
    }
}

impl<T> Hash for Session<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.cookie.value().hash(state)
    }
}

impl<T> Eq for Session<T> {}

impl<T> PartialEq for Session<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cookie.value() == other.cookie.value()
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.cookie.value())
            .field("live", &self.payload.is_some())
            .finish_non_exhaustive()
    }
}

use std::{borrow::Cow, fmt};

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use cookie::Cookie;
use rand::{RngCore as _, rngs::OsRng};
use uuid::Uuid;

use crate::error::BoxError;

/// Produces a fresh identifier for every new session.
///
/// Uniqueness is the generator's responsibility. The service never checks
/// for collisions, so a generator that repeats identifiers hands one
/// client's session to another.
pub type IdGenerator = Box<dyn Fn() -> Result<SessionId, BoxError> + Send + Sync>;

/// Opaque identifier naming one session, transported as the cookie value.
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub struct SessionId(Box<str>);

impl SessionId {
    /// 128 bits from the OS random number generator, URL-safe base64.
    pub fn random() -> Result<SessionId, BoxError> {
        let mut bytes = [0u8; 16];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(SessionId(URL_SAFE.encode(bytes).into_boxed_str()))
    }

    pub fn uuid() -> SessionId {
        SessionId(Uuid::new_v4().to_string().into_boxed_str())
    }

    pub fn from_cookie(cookie: &Cookie) -> Self {
        SessionId(cookie.value().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The default generator: [`SessionId::random`].
pub fn random_ids() -> IdGenerator {
    Box::new(SessionId::random)
}

pub fn uuid_ids() -> IdGenerator {
    Box::new(|| Ok(SessionId::uuid()))
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionId> for Cow<'static, str> {
    fn from(value: SessionId) -> Self {
        Cow::Owned(value.0.into_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

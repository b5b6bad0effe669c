use std::borrow::Cow;

use cookie::{Cookie, CookieBuilder, SameSite};

use crate::{
    error::BoxError,
    id::{self, IdGenerator, SessionId},
    service::SessionService,
    store::SessionStore,
};

static DEFAULT_SESSION_COOKIE_NAME: &str = "session";

/// Assembles a [`SessionService`]: store, cookie template, identifier
/// generator and rotation policy. Fixed once built.
pub struct SessionServiceBuilder<S> {
    store: S,
    name: Cow<'static, str>,
    cookie: CookieBuilder<'static>,
    generator: IdGenerator,
    rotate: bool,
}

impl SessionServiceBuilder<()> {
    pub fn new() -> SessionServiceBuilder<()> {
        Self {
            store: (),
            name: Cow::Borrowed(DEFAULT_SESSION_COOKIE_NAME),
            cookie: Cookie::build((DEFAULT_SESSION_COOKIE_NAME, ""))
                .same_site(SameSite::Strict)
                .http_only(true)
                .secure(true),
            generator: id::random_ids(),
            rotate: false,
        }
    }
}

impl<S> SessionServiceBuilder<S> {
    pub fn cookie_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Customize the cookie template every session cookie derives from.
    /// Attributes the service does not rewrite reach clients verbatim.
    pub fn cookie(
        mut self,
        f: impl FnOnce(CookieBuilder<'static>) -> CookieBuilder<'static>,
    ) -> Self {
        self.cookie = f(self.cookie);
        self
    }

    /// Replace the default generator ([`random_ids`](crate::random_ids)).
    pub fn generator(
        mut self,
        f: impl Fn() -> Result<SessionId, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.generator = Box::new(f);
        self
    }

    /// Rotate the identifier on every load, invalidating the previous
    /// one. Counters session fixation at the cost of a store write per
    /// read.
    pub fn rotate_ids(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    pub fn store<S1>(self, store: S1) -> SessionServiceBuilder<S1> {
        SessionServiceBuilder {
            store,
            name: self.name,
            cookie: self.cookie,
            generator: self.generator,
            rotate: self.rotate,
        }
    }

    pub fn build<T>(self) -> SessionService<T, S>
    where
        S: SessionStore,
    {
        let mut template = self.cookie.build();
        template.set_name(self.name);
        SessionService::from_parts(self.store, template, self.generator, self.rotate)
    }
}

impl Default for SessionServiceBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

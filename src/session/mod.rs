//! Cookie-token sessions: sign-in, sign-out and current-user lookup.
//!
//! # Lifecycle per request
//!
//! ```text
//! Unauthenticated --sign_in / get_user--> Authenticated --sign_out / clear--> Unauthenticated
//! ```
//!
//! The current-user binding lives in the [`RequestContext`], so it is never
//! visible to another request and disappears with the context.
//! [`SessionManager::get_user`] always clears the binding before it looks at
//! the cookie, so a failed lookup never leaves a stale user behind.
//!
//! # Token format
//!
//! A token is `encrypt("<username>;<login-millis>")` under the configured
//! [`CryptoStrategy`]. Any failure to decrypt or split a token is reported as
//! [`SessionError::NotSignedIn`], the same answer as a missing cookie. So is a
//! token whose login time differs from the cached session's, which stops a
//! token from an earlier login working again after the user signs back in.
//!
//! # Stored passwords
//!
//! Passwords on user records go through the password strategy, which is the
//! token strategy unless [`SessionManager::with_password_crypto`] sets
//! another. [`AsymmetricCrypto`](crate::AsymmetricCrypto) output is publicly
//! readable, so a manager signing tokens with it needs a confidential
//! password strategy such as [`SymmetricCrypto`](crate::SymmetricCrypto).

mod config;
mod store;
mod user;

pub use config::{SessionConfig, DEFAULT_MAX_AGE_SECS, DEFAULT_TOKEN_NAME};
pub use store::{InMemoryUserStore, UserLoader};
pub use user::SessionUser;

use std::sync::Arc;

use crate::context::RequestContext;
use crate::cookie::{Cookie, ResponseSink};
use crate::crypto::CryptoStrategy;
use crate::error::{CryptoError, SessionError};
use crate::secret::{constant_time_eq, Secret};

/// Value written over the session cookie on sign-out.
pub const SIGNOUT_SENTINEL: &str = "-";

/// Owns the sign-in / sign-out / current-user lifecycle.
///
/// Encryption of tokens and stored passwords is delegated to injected
/// [`CryptoStrategy`]s, persistence to a [`UserLoader`]. The manager itself is
/// stateless across requests and can be shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use interlock::{
///     Cookie, InMemoryUserStore, RequestContext, SecretKeyStore, SessionConfig,
///     SessionManager, SessionUser, SymmetricCrypto,
/// };
///
/// let crypto = Arc::new(SymmetricCrypto::new(&SecretKeyStore::generate()));
/// let store = Arc::new(InMemoryUserStore::<()>::new());
/// let session = SessionManager::new(SessionConfig::new("example.com"), crypto, store.clone());
///
/// let stored = session.encrypt_password("secret").unwrap();
/// store.insert_user(SessionUser::new("alice").with_password(stored));
///
/// let mut ctx = RequestContext::new("req-1");
/// let mut cookies: Vec<Cookie> = Vec::new();
/// let user = session.sign_in(&mut ctx, "alice", "secret", &mut cookies).unwrap();
/// assert_eq!(user.username(), "alice");
/// assert_eq!(cookies[0].max_age, 604800);
///
/// // A later request presents the cookie.
/// let mut next = RequestContext::new("req-2").with_header("Cookie", format!("mytoken={}", cookies[0].value));
/// assert_eq!(session.get_user(&mut next).unwrap().username(), "alice");
/// ```
pub struct SessionManager<T> {
    config: SessionConfig,
    crypto: Arc<dyn CryptoStrategy>,
    password_crypto: Arc<dyn CryptoStrategy>,
    users: Arc<dyn UserLoader<T>>,
}

impl<T: Send + Sync + 'static> SessionManager<T> {
    /// Creates a session manager. `crypto` protects both tokens and stored
    /// passwords until [`with_password_crypto`](Self::with_password_crypto)
    /// says otherwise.
    pub fn new(
        config: SessionConfig,
        crypto: Arc<dyn CryptoStrategy>,
        users: Arc<dyn UserLoader<T>>,
    ) -> Self {
        Self {
            config,
            password_crypto: Arc::clone(&crypto),
            crypto,
            users,
        }
    }

    /// Uses a separate strategy for stored passwords.
    ///
    /// Required when tokens are signed with
    /// [`AsymmetricCrypto`](crate::AsymmetricCrypto), whose output anyone can
    /// read.
    pub fn with_password_crypto(mut self, crypto: Arc<dyn CryptoStrategy>) -> Self {
        self.password_crypto = crypto;
        self
    }

    /// Returns the cookie configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authenticates `username` with a plaintext password.
    ///
    /// On success the fresh [`SessionUser`] is cached in the user loader,
    /// bound as current user on `ctx`, and a session cookie carrying the token
    /// is queued on `response`. On failure nothing is cached and no cookie is
    /// emitted.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the loader has no such user
    /// - `BadCredentials` if the stored password cannot be decrypted or does
    ///   not match
    /// - `Crypto` if the token cannot be issued
    pub fn sign_in(
        &self,
        ctx: &mut RequestContext,
        username: &str,
        password: &str,
        mut response: impl ResponseSink,
    ) -> Result<Arc<SessionUser<T>>, SessionError> {
        self.clear(ctx);

        let loaded = self.users.load_user(username).ok_or_else(|| {
            ctx.log()
                .debug(format_args!("sign-in rejected: unknown user '{}'", username));
            SessionError::UserNotFound
        })?;

        let stored = match loaded.password() {
            Some(encrypted) => self.decrypt_password(encrypted.expose_secret()),
            None => Err(CryptoError::Malformed),
        };
        let stored = match stored {
            Ok(plain) => Secret::new(plain),
            Err(e) => {
                ctx.log().warn(format_args!(
                    "sign-in rejected: stored password for '{}' unreadable: {}",
                    username, e
                ));
                return Err(SessionError::BadCredentials);
            }
        };
        if !constant_time_eq(stored.expose_secret().as_bytes(), password.as_bytes()) {
            ctx.log()
                .debug(format_args!("sign-in rejected: bad password for '{}'", username));
            return Err(SessionError::BadCredentials);
        }

        let login_user = loaded.signed_in_copy();
        let plain = format!("{};{}", login_user.username(), login_user.last_login_time());
        let token = self.crypto.encrypt(&plain).map_err(SessionError::Crypto)?;
        let login_user = Arc::new(login_user.with_token(token.clone()));

        self.users.set_user_cache(Arc::clone(&login_user));
        response.add_cookie(self.signin_cookie(token));
        ctx.bind_user(login_user.clone());

        ctx.log()
            .info(format_args!("user '{}' signed in", login_user.username()));
        Ok(login_user)
    }

    /// Resolves the signed-in user from the session cookie and binds it as
    /// current user for the rest of the request.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` when there is no cookie, the token does not
    /// decrypt or split, the user is no longer cached, or the token belongs
    /// to a different login than the cached one.
    pub fn get_user(&self, ctx: &mut RequestContext) -> Result<Arc<SessionUser<T>>, SessionError> {
        self.clear(ctx);

        let token = ctx
            .cookie(self.config.token_name())
            .filter(|t| !t.trim().is_empty())
            .ok_or(SessionError::NotSignedIn)?;

        let plain = match self.crypto.decrypt(token) {
            Ok(plain) if !plain.trim().is_empty() => plain,
            Ok(_) => {
                ctx.log().debug(format_args!("session token is blank"));
                return Err(SessionError::NotSignedIn);
            }
            Err(e) => {
                ctx.log().debug(format_args!("session token rejected: {}", e));
                return Err(SessionError::NotSignedIn);
            }
        };

        let (username, login_time) = parse_token(&plain).ok_or_else(|| {
            ctx.log().debug(format_args!("session token has no user key"));
            SessionError::NotSignedIn
        })?;

        let user = self
            .users
            .get_user_from_cache(username)
            .ok_or(SessionError::NotSignedIn)?;
        if user.last_login_time() != login_time {
            ctx.log().debug(format_args!(
                "session token for '{}' is from an earlier login",
                username
            ));
            return Err(SessionError::NotSignedIn);
        }

        ctx.bind_user(user.clone());
        Ok(user)
    }

    /// Returns the user bound by an earlier successful [`get_user`](Self::get_user)
    /// or [`sign_in`](Self::sign_in) on the same context.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` if nothing is bound.
    pub fn current_user(&self, ctx: &RequestContext) -> Result<Arc<SessionUser<T>>, SessionError> {
        ctx.bound_user()
            .cloned()
            .and_then(|user| user.downcast::<SessionUser<T>>().ok())
            .ok_or(SessionError::NotSignedIn)
    }

    /// Signs the requesting user out: evicts them from the cache and
    /// overwrites the session cookie with an expired sentinel.
    ///
    /// # Errors
    ///
    /// Same as [`get_user`](Self::get_user); on error no cookie is emitted.
    pub fn sign_out(
        &self,
        ctx: &mut RequestContext,
        mut response: impl ResponseSink,
    ) -> Result<(), SessionError> {
        let user = self.get_user(ctx)?;
        self.users.remove_user_cache(&user);
        response.add_cookie(self.signout_cookie());
        self.clear(ctx);

        ctx.log()
            .info(format_args!("user '{}' signed out", user.username()));
        Ok(())
    }

    /// Releases the current-user binding without touching the cache.
    pub fn clear(&self, ctx: &mut RequestContext) {
        ctx.unbind_user();
    }

    /// Encrypts a plaintext password into the form stored on user records.
    pub fn encrypt_password(&self, plain: &str) -> Result<String, CryptoError> {
        self.password_crypto.encrypt(plain)
    }

    /// Decrypts a stored password.
    pub fn decrypt_password(&self, encrypted: &str) -> Result<String, CryptoError> {
        self.password_crypto.decrypt(encrypted)
    }

    fn signin_cookie(&self, token: String) -> Cookie {
        let mut cookie = Cookie::new(self.config.token_name(), token);
        cookie.domain = self.config.domain().to_string();
        cookie.max_age = self.config.max_age_secs();
        cookie.http_only = true;
        cookie
    }

    fn signout_cookie(&self) -> Cookie {
        let mut cookie = Cookie::new(self.config.token_name(), SIGNOUT_SENTINEL);
        cookie.domain = self.config.domain().to_string();
        cookie.max_age = 0;
        cookie
    }
}

/// Splits a decrypted token `"<key>;<millis>"` into its user key and login
/// time.
///
/// The key must be non-blank and the timestamp an integer; anything else is
/// treated as a corrupted token.
fn parse_token(plain: &str) -> Option<(&str, i64)> {
    let (key, rest) = plain.split_once(';')?;
    let millis = rest.split(';').next()?.trim().parse::<i64>().ok()?;
    if key.trim().is_empty() {
        return None;
    }
    Some((key, millis))
}

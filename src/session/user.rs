use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::secret::Secret;

/// A signed-in (or loadable) user as seen by the session layer.
///
/// `T` is the caller's own user record. It is opaque here and carried along
/// as the origin user so handlers can reach it from the current-user
/// binding.
///
/// # Examples
///
/// ```
/// use interlock::SessionUser;
///
/// struct Account { email: String }
///
/// let user = SessionUser::new("alice")
///     .with_password("c3RvcmVk")
///     .with_origin(Account { email: "alice@example.com".into() });
///
/// assert_eq!(user.username(), "alice");
/// assert_eq!(user.origin_user().unwrap().email, "alice@example.com");
/// ```
#[derive(Debug)]
pub struct SessionUser<T> {
    id: Option<i64>,
    username: String,
    password: Option<Secret<String>>,
    description: Option<String>,
    last_login_time: i64,
    token: Option<String>,
    origin_user: Option<Arc<T>>,
}

impl<T> SessionUser<T> {
    /// Creates a user with the given key, stamped with the current time.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: None,
            description: None,
            last_login_time: now_millis(),
            token: None,
            origin_user: None,
        }
    }

    /// Sets the numeric id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the stored password, which must already be encrypted with the
    /// session's crypto strategy.
    pub fn with_password(mut self, encrypted: impl Into<String>) -> Self {
        self.password = Some(Secret::new(encrypted.into()));
        self
    }

    /// Sets a free-form description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches the caller's own user record.
    pub fn with_origin(self, origin: T) -> Self {
        self.with_origin_arc(Arc::new(origin))
    }

    /// Attaches an already shared user record.
    pub fn with_origin_arc(mut self, origin: Arc<T>) -> Self {
        self.origin_user = Some(origin);
        self
    }

    /// Overrides the login timestamp.
    pub fn with_last_login_time(mut self, millis: i64) -> Self {
        self.last_login_time = millis;
        self
    }

    pub(crate) fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    /// Returns the numeric id, if any.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Returns the user key.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the stored (encrypted) password.
    pub fn password(&self) -> Option<&Secret<String>> {
        self.password.as_ref()
    }

    /// Returns the description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Login time in milliseconds since the Unix epoch.
    pub fn last_login_time(&self) -> i64 {
        self.last_login_time
    }

    /// Token issued at sign-in, if this user came from a sign-in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the caller's user record.
    pub fn origin_user(&self) -> Option<&T> {
        self.origin_user.as_deref()
    }

    /// Returns a shared handle to the caller's user record.
    pub fn origin_user_arc(&self) -> Option<Arc<T>> {
        self.origin_user.clone()
    }

    /// Builds the fresh signed-in copy of a loaded user: same key, id,
    /// description and origin, a new login time, and no stored password.
    pub(crate) fn signed_in_copy(&self) -> Self {
        Self {
            id: self.id,
            username: self.username.clone(),
            password: None,
            description: self.description.clone(),
            last_login_time: now_millis(),
            token: None,
            origin_user: self.origin_user.clone(),
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_stamped_now() {
        let before = now_millis();
        let user: SessionUser<()> = SessionUser::new("bob");
        assert!(user.last_login_time() >= before);
        assert!(user.token().is_none());
        assert!(user.origin_user().is_none());
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let user: SessionUser<()> = SessionUser::new("bob").with_password("ZW5j");
        let out = format!("{:?}", user);
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("ZW5j"));
    }

    #[test]
    fn signed_in_copy_drops_password_and_keeps_origin() {
        let loaded = SessionUser::new("bob")
            .with_id(7)
            .with_password("ZW5j")
            .with_origin(42u32)
            .with_last_login_time(1);
        let copy = loaded.signed_in_copy();
        assert_eq!(copy.username(), "bob");
        assert_eq!(copy.id(), Some(7));
        assert!(copy.password().is_none());
        assert_eq!(copy.origin_user(), Some(&42));
        assert!(copy.last_login_time() > 1);
    }
}

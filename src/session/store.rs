use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::SessionUser;

/// Loads user records and caches signed-in users.
///
/// The session manager calls [`load_user`](Self::load_user) during sign-in,
/// and the cache methods to register, look up and evict signed-in users by
/// their key. Expiry of cached users is the implementation's business.
pub trait UserLoader<T>: Send + Sync {
    /// Loads the stored user record, including the encrypted password.
    fn load_user(&self, username: &str) -> Option<SessionUser<T>>;

    /// Registers a signed-in user in the shared cache.
    fn set_user_cache(&self, user: Arc<SessionUser<T>>);

    /// Evicts a signed-in user from the shared cache.
    fn remove_user_cache(&self, user: &SessionUser<T>);

    /// Looks up a signed-in user by key.
    fn get_user_from_cache(&self, username: &str) -> Option<Arc<SessionUser<T>>>;
}

struct StoredUser<T> {
    id: Option<i64>,
    password: Option<String>,
    description: Option<String>,
    origin: Option<Arc<T>>,
}

/// An in-process [`UserLoader`] backed by two maps.
///
/// Records are added with [`insert_user`](Self::insert_user). Signed-in users
/// live in a separate cache map until evicted. Both maps are guarded by
/// `parking_lot` read-write locks and may be shared across worker threads.
///
/// ```
/// use interlock::{InMemoryUserStore, SessionUser, UserLoader};
///
/// let store: InMemoryUserStore<()> = InMemoryUserStore::new();
/// store.insert_user(SessionUser::new("alice").with_password("enc"));
///
/// let loaded = store.load_user("alice").unwrap();
/// assert_eq!(loaded.password().unwrap().expose_secret(), "enc");
/// assert!(store.get_user_from_cache("alice").is_none());
/// ```
pub struct InMemoryUserStore<T> {
    records: RwLock<HashMap<String, StoredUser<T>>>,
    cache: RwLock<HashMap<String, Arc<SessionUser<T>>>>,
}

impl<T> InMemoryUserStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a user record.
    pub fn insert_user(&self, user: SessionUser<T>) {
        let stored = StoredUser {
            id: user.id(),
            password: user.password().map(|p| p.expose_secret().clone()),
            description: user.description().map(str::to_string),
            origin: user.origin_user_arc(),
        };
        self.records.write().insert(user.username().to_string(), stored);
    }

    /// Number of users currently signed in.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

impl<T> Default for InMemoryUserStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> UserLoader<T> for InMemoryUserStore<T> {
    fn load_user(&self, username: &str) -> Option<SessionUser<T>> {
        let records = self.records.read();
        let stored = records.get(username)?;

        let mut user = SessionUser::new(username);
        if let Some(id) = stored.id {
            user = user.with_id(id);
        }
        if let Some(password) = &stored.password {
            user = user.with_password(password.clone());
        }
        if let Some(description) = &stored.description {
            user = user.with_description(description.clone());
        }
        if let Some(origin) = &stored.origin {
            user = user.with_origin_arc(Arc::clone(origin));
        }
        Some(user)
    }

    fn set_user_cache(&self, user: Arc<SessionUser<T>>) {
        self.cache
            .write()
            .insert(user.username().to_string(), user);
    }

    fn remove_user_cache(&self, user: &SessionUser<T>) {
        self.cache.write().remove(user.username());
    }

    fn get_user_from_cache(&self, username: &str) -> Option<Arc<SessionUser<T>>> {
        self.cache.read().get(username).cloned()
    }
}

use crate::error::ConfigError;

/// Cookie name used when none is configured.
pub const DEFAULT_TOKEN_NAME: &str = "mytoken";

/// Lifetime of the session cookie: one week.
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600 * 24 * 7;

const ENV_DOMAIN: &str = "INTERLOCK_SESSION_DOMAIN";
const ENV_TOKEN_NAME: &str = "INTERLOCK_SESSION_TOKEN_NAME";
const ENV_MAX_AGE: &str = "INTERLOCK_SESSION_MAX_AGE";

/// Session cookie settings.
///
/// # Examples
///
/// ```
/// use interlock::SessionConfig;
///
/// let config = SessionConfig::new("example.com").with_token_name("sid");
/// assert_eq!(config.token_name(), "sid");
/// assert_eq!(config.max_age_secs(), 604800);
///
/// // Blank names are ignored.
/// let config = config.with_token_name("   ");
/// assert_eq!(config.token_name(), "sid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    domain: String,
    token_name: String,
    max_age_secs: i64,
}

impl SessionConfig {
    /// Creates a config for the given cookie domain with default name and lifetime.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            token_name: DEFAULT_TOKEN_NAME.to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    /// Sets the cookie name. Blank names leave the current name in place.
    pub fn with_token_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.token_name = name;
        }
        self
    }

    /// Sets the sign-in cookie lifetime.
    pub fn with_max_age_secs(mut self, secs: i64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Loads the config from `INTERLOCK_SESSION_DOMAIN` (required),
    /// `INTERLOCK_SESSION_TOKEN_NAME` and `INTERLOCK_SESSION_MAX_AGE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the domain is unset or the max age is not an
    /// integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = lookup(ENV_DOMAIN).ok_or(ConfigError::MissingVar(ENV_DOMAIN))?;
        let mut config = Self::new(domain);

        if let Some(name) = lookup(ENV_TOKEN_NAME) {
            config = config.with_token_name(name);
        }

        if let Some(raw) = lookup(ENV_MAX_AGE) {
            let secs = raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidVar {
                name: ENV_MAX_AGE,
                value: raw.clone(),
            })?;
            config = config.with_max_age_secs(secs);
        }

        Ok(config)
    }

    /// Returns the cookie domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the cookie name.
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// Returns the sign-in cookie lifetime.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }
}

use std::fmt;

use crate::interceptor::Phase;

/// Failure raised by an interceptor callback or by the target operation.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the interlock crate.
#[derive(Debug)]
pub enum Error {
    /// A crypto strategy failed to encrypt or decrypt
    Crypto(CryptoError),
    /// A session operation failed
    Session(SessionError),
    /// Configuration could not be loaded
    Config(ConfigError),
    /// The interceptor pipeline surfaced a failure
    Pipeline(PipelineError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Session(e) => write!(f, "Session error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Pipeline(e) => write!(f, "Pipeline error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Crypto(e) => Some(e),
            Error::Session(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Pipeline(e) => Some(e),
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Error::Crypto(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<PipelineError> for Error {
    fn from(e: PipelineError) -> Self {
        Error::Pipeline(e)
    }
}

/// Failure of a [`CryptoStrategy`](crate::CryptoStrategy).
///
/// Callers on the authentication path must never distinguish between these
/// variants when answering a client; every one of them means "not signed in".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input was not valid base64
    Encoding,
    /// Input decoded but is too short or structurally wrong
    Malformed,
    /// Authenticated decryption failed (wrong key, wrong iv, or tampering)
    Decryption,
    /// Encryption itself failed
    Encryption,
    /// Signature did not verify under the public key
    Signature,
    /// Recovered plaintext is not valid UTF-8
    Utf8,
    /// Key material could not be parsed
    Key(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Encoding => write!(f, "invalid encoding"),
            CryptoError::Malformed => write!(f, "malformed ciphertext"),
            CryptoError::Decryption => write!(f, "decryption failed"),
            CryptoError::Encryption => write!(f, "encryption failed"),
            CryptoError::Signature => write!(f, "signature verification failed"),
            CryptoError::Utf8 => write!(f, "plaintext is not valid UTF-8"),
            CryptoError::Key(msg) => write!(f, "invalid key material: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Authentication outcome reported by the [`SessionManager`](crate::SessionManager).
///
/// `NotSignedIn`, `UserNotFound` and `BadCredentials` are recoverable,
/// user-facing outcomes. The surrounding server maps them to a structured
/// response using [`code`](Self::code) and [`message`](Self::message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No valid session cookie, or the token does not map to a cached user
    NotSignedIn,
    /// Sign-in named a user the store does not know
    UserNotFound,
    /// Sign-in password did not match the stored one
    BadCredentials,
    /// A token could not be issued
    Crypto(CryptoError),
}

impl SessionError {
    /// Numeric status code for the response envelope.
    pub fn code(&self) -> u32 {
        match self {
            SessionError::NotSignedIn => 2001,
            SessionError::UserNotFound => 2002,
            SessionError::BadCredentials => 2003,
            SessionError::Crypto(_) => 500,
        }
    }

    /// Short human-readable message for the response envelope.
    pub fn message(&self) -> &'static str {
        match self {
            SessionError::NotSignedIn => "user not signed in",
            SessionError::UserNotFound => "user does not exist",
            SessionError::BadCredentials => "incorrect password",
            SessionError::Crypto(_) => "internal error",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Crypto(e) => write!(f, "{} ({}): {}", self.message(), self.code(), e),
            _ => write!(f, "{} ({})", self.message(), self.code()),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Crypto(e) => Some(e),
            _ => None,
        }
    }
}

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    MissingVar(&'static str),
    /// An environment variable holds an unusable value
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(name) => write!(f, "missing environment variable {}", name),
            ConfigError::InvalidVar { name, value } => {
                write!(f, "invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A marker asked for a container-managed interceptor that the container
/// could not supply.
///
/// This is non-fatal: the resolver logs it and continues without that
/// interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLookupFailed {
    /// Marker annotation type name
    pub marker: &'static str,
    /// Interceptor type name bound to the marker
    pub class: &'static str,
    /// Component id that was tried first, if any
    pub bean_id: Option<String>,
}

impl fmt::Display for ContainerLookupFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bean_id {
            Some(id) => write!(
                f,
                "no interceptor for marker {} in container (id='{}', class={})",
                self.marker, id, self.class
            ),
            None => write!(
                f,
                "no interceptor for marker {} in container (class={})",
                self.marker, self.class
            ),
        }
    }
}

impl std::error::Error for ContainerLookupFailed {}

/// One interceptor's failure inside a non-short-circuiting phase.
#[derive(Debug)]
pub struct InterceptorFailure {
    /// Name of the interceptor that failed
    pub interceptor: &'static str,
    /// The error it raised
    pub source: HandlerError,
}

/// All failures collected while running one phase over every interceptor.
#[derive(Debug)]
pub struct PhaseFailures {
    /// The phase that was running
    pub phase: Phase,
    /// Failures in invocation order
    pub failures: Vec<InterceptorFailure>,
}

impl fmt::Display for PhaseFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} interceptor(s) failed in {}", self.failures.len(), self.phase)?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.interceptor, failure.source)?;
        }
        Ok(())
    }
}

/// Failure surfaced by the [`InterceptorPipeline`](crate::InterceptorPipeline).
#[derive(Debug)]
pub enum PipelineError {
    /// An interceptor failed in `pre_handle`; the target did not run
    PreHandle {
        /// Name of the failing interceptor
        interceptor: &'static str,
        /// The error it raised
        source: HandlerError,
    },
    /// The target operation itself failed
    TargetInvocation(HandlerError),
    /// One or more interceptors failed in `post_handle` or `after_completion`
    Phase(PhaseFailures),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::PreHandle { interceptor, source } => {
                write!(f, "{} failed in pre-handle: {}", interceptor, source)
            }
            PipelineError::TargetInvocation(e) => write!(f, "target operation failed: {}", e),
            PipelineError::Phase(failures) => write!(f, "{}", failures),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::PreHandle { source, .. } => Some(source.as_ref()),
            PipelineError::TargetInvocation(e) => Some(e.as_ref()),
            PipelineError::Phase(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_codes_match_envelope_statuses() {
        assert_eq!(SessionError::NotSignedIn.code(), 2001);
        assert_eq!(SessionError::UserNotFound.code(), 2002);
        assert_eq!(SessionError::BadCredentials.code(), 2003);
        assert_eq!(SessionError::Crypto(CryptoError::Encryption).code(), 500);
    }

    #[test]
    fn session_display_includes_code() {
        let out = format!("{}", SessionError::NotSignedIn);
        assert!(out.contains("2001"));
        assert!(out.contains("not signed in"));
    }

    #[test]
    fn crate_error_wraps_session_error() {
        let err: Error = SessionError::BadCredentials.into();
        assert!(matches!(err, Error::Session(SessionError::BadCredentials)));
        assert!(format!("{}", err).starts_with("Session error"));
    }

    #[test]
    fn phase_failures_list_each_interceptor() {
        let failures = PhaseFailures {
            phase: Phase::AfterCompletion,
            failures: vec![
                InterceptorFailure {
                    interceptor: "audit",
                    source: "disk full".into(),
                },
                InterceptorFailure {
                    interceptor: "metrics",
                    source: "closed".into(),
                },
            ],
        };
        let out = format!("{}", PipelineError::Phase(failures));
        assert!(out.contains("2 interceptor(s)"));
        assert!(out.contains("audit: disk full"));
        assert!(out.contains("metrics: closed"));
    }

    #[test]
    fn container_lookup_failure_names_bean_id() {
        let err = ContainerLookupFailed {
            marker: "Audited",
            class: "AuditInterceptor",
            bean_id: Some("auditBean".to_string()),
        };
        assert!(format!("{}", err).contains("auditBean"));
    }
}

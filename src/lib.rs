//! Marker-driven request interceptors and cookie-token sessions.
//!
//! This crate provides the request-processing core of a web server add-on:
//! - **Interceptors**: marker annotations on handler types and methods select
//!   interceptors, which are resolved once per operation, ordered, and run
//!   around the target in pre, post and after-completion phases
//! - **Sessions**: sign-in, sign-out and current-user lookup backed by an
//!   encrypted cookie token and a pluggable [`CryptoStrategy`]
//!
//! HTTP parsing, routing and rendering belong to the surrounding server. It
//! hands this crate a [`RequestContext`] and a [`HandlerMethod`], and receives
//! [`Cookie`]s through a [`ResponseSink`].
//!
//! # Core Types
//!
//! - [`SessionManager`]: sign-in / sign-out / current-user lifecycle
//! - [`SymmetricCrypto`] and [`AsymmetricCrypto`]: the two crypto strategies
//! - [`InterceptorResolver`]: memoized, ordered interceptor resolution
//! - [`InterceptorPipeline`]: drives the three interceptor phases
//! - [`Secret<T>`]: wrapper that redacts sensitive values in logs/output
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use interlock::{
//!     Cookie, InMemoryUserStore, RequestContext, SecretKeyStore, SessionConfig, SessionError,
//!     SessionManager, SessionUser, SymmetricCrypto,
//! };
//!
//! let crypto = Arc::new(SymmetricCrypto::new(&SecretKeyStore::generate()));
//! let store = Arc::new(InMemoryUserStore::<()>::new());
//! let session = SessionManager::new(SessionConfig::new("example.com"), crypto, store.clone());
//! store.insert_user(SessionUser::new("alice").with_password(session.encrypt_password("secret").unwrap()));
//!
//! let mut ctx = RequestContext::new("req-1");
//! let mut cookies: Vec<Cookie> = Vec::new();
//!
//! let err = session.sign_in(&mut ctx, "alice", "wrong", &mut cookies).unwrap_err();
//! assert_eq!(err, SessionError::BadCredentials);
//! assert!(cookies.is_empty());
//!
//! session.sign_in(&mut ctx, "alice", "secret", &mut cookies).unwrap();
//! assert_eq!(session.current_user(&ctx).unwrap().username(), "alice");
//! session.clear(&mut ctx);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod cookie;
pub mod crypto;
mod error;
mod interceptor;
mod logging;
mod secret;
mod session;

pub use context::RequestContext;
pub use cookie::{Cookie, ResponseSink};
pub use crypto::{AsymmetricCrypto, CryptoStrategy, KeyPairStore, SecretKeyStore, SymmetricCrypto};
pub use error::{
    ConfigError, ContainerLookupFailed, CryptoError, Error, HandlerError, InterceptorFailure,
    PhaseFailures, PipelineError, SessionError,
};
pub use interceptor::{
    Annotation, ComponentContainer, Dispatch, HandlerMethod, HandlerType, Interceptor,
    InterceptorBinding, InterceptorPipeline, InterceptorResolver, MarkerRegistry, OperationId,
    Phase, ResolvedInterceptors, StaticContainer, ViewResult, HANDLER_ATTRIBUTE,
};
pub use logging::RequestLog;
pub use secret::Secret;
pub use session::{
    InMemoryUserStore, SessionConfig, SessionManager, SessionUser, UserLoader,
    DEFAULT_MAX_AGE_SECS, DEFAULT_TOKEN_NAME, SIGNOUT_SENTINEL,
};

//! Marker-driven interceptors around a handler method.
//!
//! A handler type or method is tagged with [`Annotation`]s. Annotation types
//! registered in a [`MarkerRegistry`] select an [`Interceptor`]; the
//! [`InterceptorResolver`] collects them (type-level first, then
//! method-level), stable-sorts by [`Interceptor::order`] and memoizes the list
//! per [`OperationId`]. The [`InterceptorPipeline`] then drives the three
//! phases:
//!
//! ```text
//! pre_handle (stops at first veto) -> target -> post_handle (all) -> after_completion (all)
//! ```
//!
//! `after_completion` runs for every resolved interceptor, including after a
//! veto or a failed target.

mod handler;
mod pipeline;
mod registry;
mod resolver;

pub use handler::{Annotation, HandlerMethod, HandlerType, OperationId};
pub use pipeline::{Dispatch, InterceptorPipeline, Phase, HANDLER_ATTRIBUTE};
pub use registry::{ComponentContainer, InterceptorBinding, MarkerRegistry, StaticContainer};
pub use resolver::{InterceptorResolver, ResolvedInterceptors};

use std::collections::HashMap;

use crate::context::RequestContext;
use crate::error::HandlerError;

/// Model and view name produced by a target operation, handed to
/// [`Interceptor::post_handle`] for inspection or modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResult {
    /// Logical view name, if the operation renders one
    pub view_name: Option<String>,
    /// Model entries
    pub model: HashMap<String, String>,
}

impl ViewResult {
    /// Creates an empty result for a named view.
    pub fn named(view_name: impl Into<String>) -> Self {
        Self {
            view_name: Some(view_name.into()),
            model: HashMap::new(),
        }
    }
}

/// A cross-cutting handler invoked around a target operation.
///
/// One instance is shared by every operation whose markers select it, and by
/// every concurrent request, so implementations must not keep per-request
/// mutable state. Request-scoped data belongs in the [`RequestContext`].
///
/// All callbacks have pass-through defaults.
///
/// # Examples
///
/// ```
/// use interlock::{HandlerError, HandlerMethod, Interceptor, RequestContext};
///
/// struct RequireHeader;
///
/// impl Interceptor for RequireHeader {
///     fn pre_handle(
///         &self,
///         ctx: &mut RequestContext,
///         _handler: &HandlerMethod,
///     ) -> Result<bool, HandlerError> {
///         Ok(ctx.header("x-api-key").is_some())
///     }
///
///     fn order(&self) -> i32 {
///         -10
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    /// Runs before the target. Returning `Ok(false)` vetoes the request: the
    /// remaining `pre_handle` calls and the target are skipped.
    fn pre_handle(
        &self,
        _ctx: &mut RequestContext,
        _handler: &HandlerMethod,
    ) -> Result<bool, HandlerError> {
        Ok(true)
    }

    /// Runs after a successful target, before rendering.
    fn post_handle(
        &self,
        _ctx: &mut RequestContext,
        _handler: &HandlerMethod,
        _view: Option<&mut ViewResult>,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Runs at the end of every dispatch, with the target's failure if any.
    fn after_completion(
        &self,
        _ctx: &mut RequestContext,
        _handler: &HandlerMethod,
        _error: Option<&HandlerError>,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Sort key; lower runs first. Ties keep discovery order.
    fn order(&self) -> i32 {
        0
    }

    /// Name used in logs and error reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

use std::fmt;
use std::sync::Arc;

use super::{HandlerMethod, Interceptor, InterceptorResolver, ViewResult};
use crate::context::RequestContext;
use crate::error::{HandlerError, InterceptorFailure, PhaseFailures, PipelineError};

/// Request attribute holding the operation id of the dispatched handler.
pub const HANDLER_ATTRIBUTE: &str = "interlock.handler";

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the target
    PreHandle,
    /// After a successful target
    PostHandle,
    /// End of dispatch
    AfterCompletion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreHandle => write!(f, "pre-handle"),
            Phase::PostHandle => write!(f, "post-handle"),
            Phase::AfterCompletion => write!(f, "after-completion"),
        }
    }
}

/// Outcome of [`InterceptorPipeline::execute`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The target ran; carries its view result
    Completed(Option<ViewResult>),
    /// An interceptor vetoed in `pre_handle`; the target did not run
    Vetoed,
}

/// Drives resolved interceptors through the pre, post and after-completion
/// phases.
///
/// `pre_handle` stops at the first veto or error. `post_handle` and
/// `after_completion` call every interceptor; individual failures are logged
/// and collected into a single [`PipelineError::Phase`].
///
/// Most callers use [`execute`](Self::execute). The per-phase methods exist
/// for servers that run the target themselves.
#[derive(Debug, Clone)]
pub struct InterceptorPipeline {
    resolver: Arc<InterceptorResolver>,
}

impl InterceptorPipeline {
    /// Creates a pipeline over a shared resolver.
    pub fn new(resolver: Arc<InterceptorResolver>) -> Self {
        Self { resolver }
    }

    /// Runs `pre_handle` in order. Returns `Ok(false)` on the first veto.
    ///
    /// Also records the handler's operation id under [`HANDLER_ATTRIBUTE`].
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::PreHandle` for the first interceptor that
    /// fails; later interceptors do not run.
    pub fn pre_handle(
        &self,
        ctx: &mut RequestContext,
        handler: &HandlerMethod,
    ) -> Result<bool, PipelineError> {
        ctx.set_attribute(HANDLER_ATTRIBUTE, handler.id().to_string());

        for interceptor in self.resolver.resolve(handler).iter() {
            match interceptor.pre_handle(ctx, handler) {
                Ok(true) => {}
                Ok(false) => {
                    ctx.log().debug(format_args!(
                        "{} vetoed by {}",
                        handler,
                        interceptor.name()
                    ));
                    return Ok(false);
                }
                Err(source) => {
                    return Err(PipelineError::PreHandle {
                        interceptor: interceptor.name(),
                        source,
                    })
                }
            }
        }
        Ok(true)
    }

    /// Runs `post_handle` on every interceptor.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Phase` listing every interceptor that failed.
    pub fn post_handle(
        &self,
        ctx: &mut RequestContext,
        handler: &HandlerMethod,
        mut view: Option<&mut ViewResult>,
    ) -> Result<(), PipelineError> {
        self.run_all(ctx, handler, Phase::PostHandle, |interceptor, ctx| {
            interceptor.post_handle(ctx, handler, view.as_deref_mut())
        })
    }

    /// Runs `after_completion` on every interceptor, passing the target's
    /// failure if there was one.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Phase` listing every interceptor that failed.
    pub fn after_completion(
        &self,
        ctx: &mut RequestContext,
        handler: &HandlerMethod,
        error: Option<&HandlerError>,
    ) -> Result<(), PipelineError> {
        self.run_all(ctx, handler, Phase::AfterCompletion, |interceptor, ctx| {
            interceptor.after_completion(ctx, handler, error)
        })
    }

    /// Calls every resolved interceptor, logging and collecting failures.
    fn run_all<F>(
        &self,
        ctx: &mut RequestContext,
        handler: &HandlerMethod,
        phase: Phase,
        mut call: F,
    ) -> Result<(), PipelineError>
    where
        F: FnMut(&dyn Interceptor, &mut RequestContext) -> Result<(), HandlerError>,
    {
        let mut failures = Vec::new();
        for interceptor in self.resolver.resolve(handler).iter() {
            if let Err(source) = call(&**interceptor, ctx) {
                ctx.log().error(format_args!(
                    "{} failed in {} for {}: {}",
                    interceptor.name(),
                    phase,
                    handler,
                    source
                ));
                failures.push(InterceptorFailure {
                    interceptor: interceptor.name(),
                    source,
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Phase(PhaseFailures { phase, failures }))
        }
    }

    /// Dispatches one request: pre-handle, target, post-handle and
    /// after-completion.
    ///
    /// `after_completion` runs in every case, including a veto, a pre-handle
    /// failure and a target failure. When several things fail, the earliest
    /// is returned and the rest are logged.
    ///
    /// # Errors
    ///
    /// - `PreHandle` if an interceptor failed before the target
    /// - `TargetInvocation` if the target failed
    /// - `Phase` if any post-handle or after-completion callback failed
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use interlock::{
    ///     Dispatch, HandlerMethod, HandlerType, InterceptorPipeline, InterceptorResolver,
    ///     MarkerRegistry, RequestContext, ViewResult,
    /// };
    ///
    /// let pipeline = InterceptorPipeline::new(Arc::new(InterceptorResolver::new(MarkerRegistry::new())));
    /// let handler = HandlerMethod::new(&Arc::new(HandlerType::new("Home")), "index");
    ///
    /// let mut ctx = RequestContext::new("req-1");
    /// let outcome = pipeline
    ///     .execute(&mut ctx, &handler, |_ctx| Ok(Some(ViewResult::named("home"))))
    ///     .unwrap();
    /// assert_eq!(outcome, Dispatch::Completed(Some(ViewResult::named("home"))));
    /// ```
    pub fn execute<F>(
        &self,
        ctx: &mut RequestContext,
        handler: &HandlerMethod,
        target: F,
    ) -> Result<Dispatch, PipelineError>
    where
        F: FnOnce(&mut RequestContext) -> Result<Option<ViewResult>, HandlerError>,
    {
        match self.pre_handle(ctx, handler) {
            Ok(true) => {}
            Ok(false) => {
                self.after_completion(ctx, handler, None)?;
                return Ok(Dispatch::Vetoed);
            }
            Err(PipelineError::PreHandle {
                interceptor,
                source,
            }) => {
                if let Err(e) = self.after_completion(ctx, handler, Some(&source)) {
                    ctx.log().warn(format_args!("{}", e));
                }
                return Err(PipelineError::PreHandle {
                    interceptor,
                    source,
                });
            }
            Err(other) => return Err(other),
        }

        match target(ctx) {
            Ok(mut view) => {
                let post = self.post_handle(ctx, handler, view.as_mut());
                let after = self.after_completion(ctx, handler, None);
                match (post, after) {
                    (Err(e), after) => {
                        if let Err(later) = after {
                            ctx.log().warn(format_args!("{}", later));
                        }
                        Err(e)
                    }
                    (Ok(()), Err(e)) => Err(e),
                    (Ok(()), Ok(())) => Ok(Dispatch::Completed(view)),
                }
            }
            Err(failure) => {
                ctx.log()
                    .debug(format_args!("{} failed: {}", handler, failure));
                if let Err(e) = self.after_completion(ctx, handler, Some(&failure)) {
                    ctx.log().warn(format_args!("{}", e));
                }
                Err(PipelineError::TargetInvocation(failure))
            }
        }
    }
}

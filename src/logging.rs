use std::fmt;

/// A request-scoped logging handle.
///
/// `RequestLog` is obtained from [`RequestContext::log`](crate::RequestContext::log)
/// and is lifetime-bound to the context it came from. Every event it emits
/// carries the request id as a structured `request_id` field.
///
/// Pass sensitive values through [`Secret`](crate::Secret) before logging
/// them; its `Debug` and `Display` output is always redacted.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// ```
    /// # use interlock::{RequestContext, Secret};
    /// let ctx = RequestContext::new("req-1");
    /// let token = Secret::new("opaque-token");
    /// ctx.log().info(format_args!("issued {:?}", token));
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_handle_exposes_request_id() {
        let log = RequestLog::new("req-42");
        assert_eq!(log.request_id(), "req-42");
    }

    #[test]
    fn logging_without_subscriber_is_a_no_op() {
        let log = RequestLog::new("req-43");
        log.info(format_args!("hello {}", 1));
        log.warn(format_args!("careful"));
        log.error(format_args!("boom"));
        log.debug(format_args!("details"));
    }
}

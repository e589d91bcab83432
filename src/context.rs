use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::logging::RequestLog;

/// Per-request state threaded through the interceptor pipeline and the
/// session manager.
///
/// `RequestContext` holds plain owned data so that it does not couple to any
/// particular HTTP framework. Framework integration code builds one per
/// incoming request from the framework's own request type.
///
/// It carries:
/// - the request id, attached to every log event
/// - request headers (names are case-insensitive)
/// - cookies parsed from the `Cookie` header
/// - string attributes that interceptors may read and write
/// - the current-user binding set by the session manager
///
/// Nothing here is shared between requests. Dropping the context drops the
/// current-user binding with it.
///
/// # Examples
///
/// ```
/// use interlock::RequestContext;
///
/// let ctx = RequestContext::new("req-12345")
///     .with_header("User-Agent", "curl/8.0")
///     .with_header("Cookie", "theme=dark; mytoken=abc");
///
/// assert_eq!(ctx.header("user-agent"), Some("curl/8.0"));
/// assert_eq!(ctx.cookie("mytoken"), Some("abc"));
/// ```
#[derive(Debug, Default)]
pub struct RequestContext {
    request_id: String,
    headers: HashMap<String, String>,
    cookies: Option<Vec<(String, String)>>,
    attributes: HashMap<String, String>,
    current_user: UserSlot,
}

impl RequestContext {
    /// Creates an empty context with the given request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Builder-style [`add_header`](Self::add_header).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Adds a request header.
    ///
    /// A `Cookie` header is also parsed into individual cookies. Repeated
    /// `Cookie` headers accumulate.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        if name == "cookie" {
            let cookies = self.cookies.get_or_insert_with(Vec::new);
            cookies.extend(parse_cookie_header(&value));
        }
        self.headers.insert(name, value);
    }

    /// Adds a single cookie as if it had arrived in the `Cookie` header.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the value of the first cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .as_ref()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a string attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Sets a string attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(key.into(), value.into())
    }

    pub(crate) fn bind_user(&mut self, user: Arc<dyn Any + Send + Sync>) {
        self.current_user.0 = Some(user);
    }

    pub(crate) fn bound_user(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.current_user.0.as_ref()
    }

    pub(crate) fn unbind_user(&mut self) {
        self.current_user.0 = None;
    }

    /// Returns a logger that tags every event with this request's id.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id)
    }
}

/// Splits a `Cookie` header into `(name, value)` pairs.
///
/// Entries without `=` are skipped. Values wrapped in double quotes are
/// unquoted.
fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Type-erased current user; the session manager knows the concrete type.
#[derive(Default)]
struct UserSlot(Option<Arc<dyn Any + Send + Sync>>);

impl fmt::Debug for UserSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "bound" } else { "unbound" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_no_cookies() {
        let ctx = RequestContext::new("req-test");
        assert_eq!(ctx.request_id(), "req-test");
        assert_eq!(ctx.cookie("mytoken"), None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let ctx = RequestContext::new("req-1").with_header("X-Custom", "value");
        assert_eq!(ctx.header("x-custom"), Some("value"));
        assert_eq!(ctx.header("X-CUSTOM"), Some("value"));
    }

    #[test]
    fn cookie_header_is_parsed() {
        let ctx = RequestContext::new("req-1").with_header("Cookie", "a=1; b = 2 ;c=\"3\"; junk");
        assert_eq!(ctx.cookie("a"), Some("1"));
        assert_eq!(ctx.cookie("b"), Some("2"));
        assert_eq!(ctx.cookie("c"), Some("3"));
        assert_eq!(ctx.cookie("junk"), None);
    }

    #[test]
    fn first_cookie_with_name_wins() {
        let mut ctx = RequestContext::new("req-1").with_header("Cookie", "t=first; t=second");
        ctx.add_cookie("t", "third");
        assert_eq!(ctx.cookie("t"), Some("first"));
    }

    #[test]
    fn cookie_values_may_contain_equals() {
        let ctx = RequestContext::new("req-1").with_header("Cookie", "t=abc==");
        assert_eq!(ctx.cookie("t"), Some("abc=="));
    }

    #[test]
    fn attributes_round_trip() {
        let mut ctx = RequestContext::new("req-1");
        assert_eq!(ctx.set_attribute("k", "v"), None);
        assert_eq!(ctx.attribute("k"), Some("v"));
        assert_eq!(ctx.set_attribute("k", "w"), Some("v".to_string()));
        assert_eq!(ctx.attribute("k"), Some("w"));
    }

    #[test]
    fn user_slot_binds_and_unbinds() {
        let mut ctx = RequestContext::new("req-1");
        assert!(ctx.bound_user().is_none());
        ctx.bind_user(Arc::new(7u32));
        assert_eq!(ctx.bound_user().and_then(|u| u.downcast_ref::<u32>()), Some(&7));
        assert!(!format!("{:?}", ctx).contains("unbound"));
        ctx.unbind_user();
        assert!(ctx.bound_user().is_none());
    }

    #[test]
    fn log_carries_request_id() {
        let ctx = RequestContext::new("req-log");
        assert_eq!(ctx.log().request_id(), "req-log");
    }
}

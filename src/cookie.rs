/// A cookie to be emitted in a `Set-Cookie` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// `Domain` attribute, omitted when empty
    pub domain: String,
    /// `Path` attribute
    pub path: String,
    /// `Max-Age` in seconds; zero expires the cookie immediately
    pub max_age: i64,
    /// Whether the `HttpOnly` flag is set
    pub http_only: bool,
    /// Cookie version attribute
    pub version: u8,
}

impl Cookie {
    /// Creates a version-1 cookie with path `/`, no domain and session lifetime.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            max_age: -1,
            http_only: false,
            version: 1,
        }
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    ///
    /// A negative `max_age` omits the attribute (browser-session cookie).
    ///
    /// ```
    /// use interlock::Cookie;
    ///
    /// let mut c = Cookie::new("mytoken", "abc");
    /// c.domain = "example.com".to_string();
    /// c.max_age = 60;
    /// c.http_only = true;
    /// assert_eq!(
    ///     c.to_header_value(),
    ///     "mytoken=abc; Version=1; Domain=example.com; Path=/; Max-Age=60; HttpOnly"
    /// );
    /// ```
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}; Version={}", self.name, self.value, self.version);
        if !self.domain.is_empty() {
            out.push_str("; Domain=");
            out.push_str(&self.domain);
        }
        if !self.path.is_empty() {
            out.push_str("; Path=");
            out.push_str(&self.path);
        }
        if self.max_age >= 0 {
            out.push_str(&format!("; Max-Age={}", self.max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Receives cookies the session manager wants to send back to the client.
///
/// Framework integration code implements this over its own response type.
/// A `Vec<Cookie>` works as a sink for tests and for collecting cookies to
/// attach later.
pub trait ResponseSink {
    /// Queues a cookie on the response.
    fn add_cookie(&mut self, cookie: Cookie);
}

impl ResponseSink for Vec<Cookie> {
    fn add_cookie(&mut self, cookie: Cookie) {
        self.push(cookie);
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn add_cookie(&mut self, cookie: Cookie) {
        (**self).add_cookie(cookie);
    }
}

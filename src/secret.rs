use std::fmt;

/// A wrapper that keeps passwords and token material out of logs.
///
/// Stored passwords on a [`SessionUser`](crate::SessionUser) and plaintext
/// passwords handed to sign-in are held as `Secret<String>`. The inner value
/// is reachable only through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use interlock::Secret;
///
/// let stored = Secret::new("q1w2e3".to_string());
///
/// assert_eq!(format!("{:?}", stored), "[REDACTED]");
/// assert_eq!(stored.expose_secret(), "q1w2e3");
/// ```
// Do NOT derive Clone, Copy or Default; duplicating a secret must be explicit.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// The returned reference must not be logged or displayed.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}


/// Compares two byte strings by content in time independent of where they
/// first differ.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_redacts_debug() {
        let password = Secret::new("hunter2".to_string());
        let debug_output = format!("{:?}", password);

        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("String"));
    }

    #[test]
    fn secret_exposes_when_explicit() {
        let secret = Secret::new(42u32);
        assert_eq!(*secret.expose_secret(), 42);
    }

    #[test]
    fn constant_time_eq_compares_content() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secrets"));
        assert!(constant_time_eq(b"", b""));
    }
}

//! Pluggable reversible encryption for token payloads and stored passwords.
//!
//! The [`SessionManager`](crate::SessionManager) never knows which cipher
//! family it is using. It holds an `Arc<dyn CryptoStrategy>` and calls
//! [`encrypt`](CryptoStrategy::encrypt) / [`decrypt`](CryptoStrategy::decrypt).
//!
//! Two strategies ship with the crate:
//! - [`SymmetricCrypto`]: ChaCha20-Poly1305 under a shared key, with the
//!   configured iv bound to every ciphertext. Output is confidential.
//! - [`AsymmetricCrypto`]: ed25519. The private key signs, the public key
//!   verifies and recovers the plaintext. Output is authentic but publicly
//!   readable.
//!
//! Both produce URL-safe base64 without padding, so results can be placed in
//! a cookie value unescaped.

mod asymmetric;
mod symmetric;

pub use asymmetric::{read_unverified, AsymmetricCrypto, KeyPairStore};
pub use symmetric::{SecretKeyStore, SymmetricCrypto};

use base64::{engine::general_purpose, Engine as _};

use crate::error::CryptoError;

/// Reversible string encryption.
///
/// Implementations must satisfy `decrypt(encrypt(p)) == p` for every `p` they
/// accept. Malformed input, a foreign key or any tampering must yield
/// `Err(CryptoError)`, never a different plaintext.
pub trait CryptoStrategy: Send + Sync {
    /// Encrypts (or signs) a plaintext.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Decrypts (or verifies) a ciphertext produced by [`encrypt`](Self::encrypt).
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}

/// Parses 32 bytes of key material from hex, base64url, base64, or raw text.
pub fn parse_key_material(raw: &str) -> Option<[u8; 32]> {
    let trimmed = raw.trim();

    if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = decode_hex(trimmed)?;
        return bytes.as_slice().try_into().ok();
    }

    if let Ok(bytes) = general_purpose::URL_SAFE_NO_PAD.decode(trimmed) {
        if bytes.len() == 32 {
            return bytes.as_slice().try_into().ok();
        }
    }

    if let Ok(bytes) = general_purpose::STANDARD.decode(trimmed) {
        if bytes.len() == 32 {
            return bytes.as_slice().try_into().ok();
        }
    }

    let raw_bytes = trimmed.as_bytes();
    if raw_bytes.len() == 32 {
        return raw_bytes.try_into().ok();
    }

    None
}

pub(crate) fn encode(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(text.trim())
        .map_err(|_| CryptoError::Encoding)
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(input.len() / 2);
    let mut chars = input.chars();
    while let (Some(h), Some(l)) = (chars.next(), chars.next()) {
        let hi = h.to_digit(16)?;
        let lo = l.to_digit(16)?;
        bytes.push(((hi << 4) | lo) as u8);
    }
    Some(bytes)
}

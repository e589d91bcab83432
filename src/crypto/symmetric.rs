use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use super::{decode, encode, parse_key_material, CryptoStrategy};
use crate::error::CryptoError;
use crate::secret::Secret;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Shared secret key and initialization vector for [`SymmetricCrypto`].
pub struct SecretKeyStore {
    key: Secret<[u8; 32]>,
    iv: Vec<u8>,
}

impl SecretKeyStore {
    /// Creates a key store from raw key bytes and an iv.
    pub fn new(key: [u8; 32], iv: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Secret::new(key),
            iv: iv.into(),
        }
    }

    /// Parses the key with [`parse_key_material`]; the iv is taken as UTF-8 bytes.
    pub fn from_strings(key: &str, iv: &str) -> Result<Self, CryptoError> {
        let key = parse_key_material(key)
            .ok_or_else(|| CryptoError::Key("expected 32 bytes of key material".to_string()))?;
        Ok(Self::new(key, iv.as_bytes()))
    }

    /// Generates a random key with a random 16-byte iv.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; 32];
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self::new(key, iv)
    }

    /// Returns the iv.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

impl fmt::Debug for SecretKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyStore")
            .field("key", &self.key)
            .field("iv_len", &self.iv.len())
            .finish()
    }
}

/// ChaCha20-Poly1305 strategy keyed by a [`SecretKeyStore`].
///
/// Each ciphertext is `nonce || sealed(plaintext)` in URL-safe base64, where
/// the nonce is freshly random and the iv is the associated data. Decrypting
/// under a different key or iv fails.
///
/// ```
/// use interlock::{CryptoStrategy, SecretKeyStore, SymmetricCrypto};
///
/// let crypto = SymmetricCrypto::new(&SecretKeyStore::new([9u8; 32], *b"fixed-iv"));
/// let token = crypto.encrypt("alice;1700000000000").unwrap();
/// assert_eq!(crypto.decrypt(&token).unwrap(), "alice;1700000000000");
/// ```
pub struct SymmetricCrypto {
    cipher: ChaCha20Poly1305,
    iv: Vec<u8>,
}

impl SymmetricCrypto {
    /// Builds the strategy from a key store.
    pub fn new(store: &SecretKeyStore) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(store.key.expose_secret())),
            iv: store.iv.clone(),
        }
    }
}

impl fmt::Debug for SymmetricCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricCrypto([REDACTED])")
    }
}

impl CryptoStrategy for SymmetricCrypto {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &self.iv,
                },
            )
            .map_err(|_| CryptoError::Encryption)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);
        Ok(encode(&payload))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let payload = decode(ciphertext)?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Malformed);
        }

        let (nonce_bytes, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: sealed,
                    aad: &self.iv,
                },
            )
            .map_err(|_| CryptoError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }
}

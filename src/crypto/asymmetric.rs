use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SIGNATURE_LENGTH};
use rand::RngCore;

use super::{decode, encode, parse_key_material, CryptoStrategy};
use crate::error::CryptoError;

/// An ed25519 key pair for [`AsymmetricCrypto`].
///
/// A node that only verifies tokens holds the public half alone.
pub struct KeyPairStore {
    signing: Option<SigningKey>,
    verifying: VerifyingKey,
}

impl KeyPairStore {
    /// Creates a full key pair from a 32-byte private seed.
    pub fn from_private_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        Self {
            signing: Some(signing),
            verifying,
        }
    }

    /// Creates a verify-only store from a 32-byte public key.
    pub fn from_public_key(public: [u8; 32]) -> Result<Self, CryptoError> {
        let verifying = VerifyingKey::from_bytes(&public)
            .map_err(|e| CryptoError::Key(e.to_string()))?;
        Ok(Self {
            signing: None,
            verifying,
        })
    }

    /// Parses a private seed with [`parse_key_material`].
    pub fn from_private_str(raw: &str) -> Result<Self, CryptoError> {
        parse_key_material(raw)
            .map(Self::from_private_seed)
            .ok_or_else(|| CryptoError::Key("expected a 32-byte private seed".to_string()))
    }

    /// Parses a public key with [`parse_key_material`].
    pub fn from_public_str(raw: &str) -> Result<Self, CryptoError> {
        let public = parse_key_material(raw)
            .ok_or_else(|| CryptoError::Key("expected a 32-byte public key".to_string()))?;
        Self::from_public_key(public)
    }

    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_private_seed(seed)
    }

    /// Returns the public key bytes for distribution to verifiers.
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying.to_bytes()
    }

    /// Returns `true` if this store can sign.
    pub fn can_sign(&self) -> bool {
        self.signing.is_some()
    }
}

impl fmt::Debug for KeyPairStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairStore")
            .field("public_key", &encode(&self.verifying.to_bytes()))
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

/// ed25519 strategy: the private key signs, the public key verifies.
///
/// `encrypt` yields `plaintext || signature` in URL-safe base64. `decrypt`
/// checks the signature against the public key and returns the plaintext.
/// This gives authenticity of server-issued tokens, not confidentiality:
/// anyone can read a token with [`read_unverified`], only the private key
/// holder can mint one.
pub struct AsymmetricCrypto {
    keys: KeyPairStore,
}

impl AsymmetricCrypto {
    /// Builds the strategy from a key pair store.
    pub fn new(keys: KeyPairStore) -> Self {
        Self { keys }
    }

    /// Returns the underlying key store.
    pub fn keys(&self) -> &KeyPairStore {
        &self.keys
    }
}

impl fmt::Debug for AsymmetricCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricCrypto")
            .field("keys", &self.keys)
            .finish()
    }
}

impl CryptoStrategy for AsymmetricCrypto {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let signing = self
            .keys
            .signing
            .as_ref()
            .ok_or_else(|| CryptoError::Key("no private key to sign with".to_string()))?;

        let signature = signing.sign(plaintext.as_bytes());
        let mut payload = Vec::with_capacity(plaintext.len() + SIGNATURE_LENGTH);
        payload.extend_from_slice(plaintext.as_bytes());
        payload.extend_from_slice(&signature.to_bytes());
        Ok(encode(&payload))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let (message, signature) = split_signed(ciphertext)?;
        let signature = Signature::from_slice(&signature).map_err(|_| CryptoError::Malformed)?;
        self.keys
            .verifying
            .verify_strict(&message, &signature)
            .map_err(|_| CryptoError::Signature)?;
        String::from_utf8(message).map_err(|_| CryptoError::Utf8)
    }
}

/// Reads the plaintext of an [`AsymmetricCrypto`] token without checking
/// its signature. For diagnostics only; never authenticate with it.
pub fn read_unverified(token: &str) -> Result<String, CryptoError> {
    let (message, _) = split_signed(token)?;
    String::from_utf8(message).map_err(|_| CryptoError::Utf8)
}

fn split_signed(token: &str) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let mut payload = decode(token)?;
    if payload.len() < SIGNATURE_LENGTH {
        return Err(CryptoError::Malformed);
    }
    let signature = payload.split_off(payload.len() - SIGNATURE_LENGTH);
    Ok((payload, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto(seed: u8) -> AsymmetricCrypto {
        AsymmetricCrypto::new(KeyPairStore::from_private_seed([seed; 32]))
    }

    #[test]
    fn round_trips() {
        let c = crypto(1);
        for p in ["", "secret", "alice;1700000000000", "ünïcødé ✓"] {
            assert_eq!(c.decrypt(&c.encrypt(p).unwrap()).unwrap(), p);
        }
    }

    #[test]
    fn public_key_alone_verifies() {
        let signer = crypto(1);
        let verifier = AsymmetricCrypto::new(
            KeyPairStore::from_public_key(signer.keys().public_key()).unwrap(),
        );
        let token = signer.encrypt("alice;1").unwrap();
        assert_eq!(verifier.decrypt(&token).unwrap(), "alice;1");
    }

    #[test]
    fn verify_only_store_cannot_sign() {
        let verifier = AsymmetricCrypto::new(
            KeyPairStore::from_public_key(crypto(1).keys().public_key()).unwrap(),
        );
        assert!(!verifier.keys().can_sign());
        assert!(matches!(verifier.encrypt("x"), Err(CryptoError::Key(_))));
    }

    #[test]
    fn foreign_key_fails() {
        let token = crypto(1).encrypt("alice;1").unwrap();
        assert_eq!(crypto(2).decrypt(&token), Err(CryptoError::Signature));
    }

    #[test]
    fn tampered_message_fails() {
        let c = crypto(1);
        let mut bytes = decode(&c.encrypt("alice;1").unwrap()).unwrap();
        bytes[0] = b'b';
        assert_eq!(c.decrypt(&encode(&bytes)), Err(CryptoError::Signature));
    }

    #[test]
    fn tokens_are_publicly_readable() {
        let token = crypto(1).encrypt("alice;1700000000000").unwrap();
        assert_eq!(read_unverified(&token).unwrap(), "alice;1700000000000");
    }

    #[test]
    fn short_input_fails() {
        assert_eq!(crypto(1).decrypt(&encode(b"tiny")), Err(CryptoError::Malformed));
    }

    #[test]
    fn key_store_parses_strings() {
        let store = KeyPairStore::from_private_str(&"11".repeat(32)).unwrap();
        assert!(store.can_sign());
        assert!(KeyPairStore::from_private_str("nope").is_err());
        let public = encode(&store.public_key());
        assert!(!KeyPairStore::from_public_str(&public).unwrap().can_sign());
    }
}

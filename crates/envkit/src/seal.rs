//! Sealed-box encryption of secret values.
//!
//! GitHub expects secret values encrypted with libsodium's
//! `crypto_box_seal` under the environment public key, base64 encoded.

use crate::error::{Error, Result};
use crate::types::{PublicKeyInfo, SecretValue};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sodiumoxide::crypto::{box_, sealedbox};

/// Decode a base64 public key into a curve25519 key.
pub fn decode_public_key(key_b64: &str) -> Result<box_::PublicKey> {
    let bytes = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| Error::InvalidKey(format!("not base64: {e}")))?;
    box_::PublicKey::from_slice(&bytes).ok_or_else(|| {
        Error::InvalidKey(format!(
            "expected {} bytes, got {}",
            box_::PUBLICKEYBYTES,
            bytes.len()
        ))
    })
}

/// Seal a plaintext value for the holder of `key_b64`, returning base64.
///
/// # Example
///
/// ```
/// use base64::Engine;
/// use sodiumoxide::crypto::box_;
///
/// sodiumoxide::init().unwrap();
/// let (pk, _sk) = box_::gen_keypair();
/// let key = base64::engine::general_purpose::STANDARD.encode(pk.0);
/// let sealed = envkit::seal::seal_secret("hunter2", &key).unwrap();
/// assert!(!sealed.contains("hunter2"));
/// ```
pub fn seal_secret(value: &str, key_b64: &str) -> Result<String> {
    sodiumoxide::init().map_err(|()| Error::Other("failed to initialise libsodium".to_string()))?;
    let public_key = decode_public_key(key_b64)?;
    let sealed = sealedbox::seal(value.as_bytes(), &public_key);
    Ok(STANDARD.encode(sealed))
}

/// A public key decoded once and reused for every secret of a run.
#[derive(Debug, Clone)]
pub struct Sealer {
    key: box_::PublicKey,
    key_id: String,
}

impl Sealer {
    /// Prepare a sealer from a fetched public key.
    pub fn new(info: &PublicKeyInfo) -> Result<Self> {
        sodiumoxide::init()
            .map_err(|()| Error::Other("failed to initialise libsodium".to_string()))?;
        Ok(Self {
            key: decode_public_key(&info.key)?,
            key_id: info.key_id.clone(),
        })
    }

    /// Key id to send along with sealed values.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Seal one value, returning base64 ciphertext.
    #[must_use]
    pub fn seal(&self, value: &SecretValue) -> String {
        STANDARD.encode(sealedbox::seal(value.expose().as_bytes(), &self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (String, box_::PublicKey, box_::SecretKey) {
        sodiumoxide::init().unwrap();
        let (pk, sk) = box_::gen_keypair();
        (STANDARD.encode(pk.0), pk, sk)
    }

    #[test]
    fn test_seal_secret_opens_with_private_key() {
        let (key, pk, sk) = keypair();
        let sealed = seal_secret("s3cr3t value", &key).unwrap();

        let bytes = STANDARD.decode(sealed).unwrap();
        let opened = sealedbox::open(&bytes, &pk, &sk).unwrap();
        assert_eq!(opened, b"s3cr3t value");
    }

    #[test]
    fn test_seal_is_randomized() {
        let (key, _, _) = keypair();
        assert_ne!(seal_secret("x", &key).unwrap(), seal_secret("x", &key).unwrap());
    }

    #[test]
    fn test_sealer_reuses_key() {
        let (key, pk, sk) = keypair();
        let sealer = Sealer::new(&PublicKeyInfo {
            key,
            key_id: "kid-1".to_string(),
        })
        .unwrap();

        assert_eq!(sealer.key_id(), "kid-1");
        let sealed = sealer.seal(&SecretValue::new(""));
        let opened = sealedbox::open(&STANDARD.decode(sealed).unwrap(), &pk, &sk).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn test_invalid_base64_key() {
        let err = seal_secret("x", "***").unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_wrong_key_length() {
        let err = decode_public_key(&STANDARD.encode([0u8; 16])).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 16"));
    }
}

//! Timestamped HMAC signatures for cookies and nonces.
//!
//! Signed form: `value:timestamp:signature`, where `signature` is the
//! base64url (unpadded) HMAC-SHA256 of `salt`, `value` and `timestamp` under
//! the server secret. The value itself is not encrypted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, TikibarError};

type HmacSha256 = Hmac<Sha256>;

const SEP: char = ':';

#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, salt: &str, value: &str, timestamp: u64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TikibarError::Internal(format!("hmac key: {e}")))?;
        mac.update(salt.as_bytes());
        mac.update(b"signer");
        mac.update(value.as_bytes());
        mac.update(&[SEP as u8]);
        mac.update(timestamp.to_string().as_bytes());
        Ok(mac)
    }

    /// Sign `value` at time `now` (epoch seconds).
    pub fn sign(&self, value: &str, salt: &str, now: u64) -> Result<String> {
        let tag = self.mac(salt, value, now)?.finalize().into_bytes();
        Ok(format!(
            "{value}{SEP}{now}{SEP}{}",
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Verify a signed value and return the payload.
    ///
    /// With `max_age`, values signed more than that many seconds before `now`
    /// are rejected as expired.
    pub fn unsign(
        &self,
        signed: &str,
        salt: &str,
        max_age: Option<u64>,
        now: u64,
    ) -> Result<String> {
        let mut parts = signed.rsplitn(3, SEP);
        let (Some(sig), Some(ts), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TikibarError::InvalidSignature);
        };

        let timestamp: u64 = ts.parse().map_err(|_| TikibarError::InvalidSignature)?;
        let tag = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| TikibarError::InvalidSignature)?;
        self.mac(salt, value, timestamp)?
            .verify_slice(&tag)
            .map_err(|_| TikibarError::InvalidSignature)?;

        if let Some(max_age) = max_age {
            if now.saturating_sub(timestamp) > max_age {
                return Err(TikibarError::SignatureExpired);
            }
        }
        Ok(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_signature() {
        let s = Signer::new("0123456789abcdef");
        let signed = s.sign("token:with:colons", "salt", 1_000).unwrap();
        assert_eq!(s.unsign(&signed, "salt", Some(10), 1_005).unwrap(), "token:with:colons");
    }

    #[test]
    fn rejects_tampering_and_wrong_salt() {
        let s = Signer::new("0123456789abcdef");
        let signed = s.sign("abc", "salt", 1_000).unwrap();
        let tampered = signed.replacen("abc", "abd", 1);
        assert!(matches!(s.unsign(&tampered, "salt", None, 1_000), Err(TikibarError::InvalidSignature)));
        assert!(matches!(s.unsign(&signed, "other", None, 1_000), Err(TikibarError::InvalidSignature)));
        assert!(matches!(s.unsign("garbage", "salt", None, 1_000), Err(TikibarError::InvalidSignature)));
    }

    #[test]
    fn rejects_expired() {
        let s = Signer::new("0123456789abcdef");
        let signed = s.sign("abc", "", 1_000).unwrap();
        assert!(matches!(s.unsign(&signed, "", Some(10), 1_011), Err(TikibarError::SignatureExpired)));
        assert!(s.unsign(&signed, "", None, 9_999_999).is_ok());
    }

    #[test]
    fn other_secret_does_not_verify() {
        let a = Signer::new("0123456789abcdef");
        let b = Signer::new("fedcba9876543210");
        let signed = a.sign("abc", "", 1_000).unwrap();
        assert!(b.unsign(&signed, "", None, 1_000).is_err());
    }
}

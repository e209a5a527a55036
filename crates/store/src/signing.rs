//! Signed, expiring artifact URLs.
//!
//! Execution contexts fetch artifacts by URL. The URL carries an HMAC
//! over the path and an expiry timestamp, so a leaked URL stops working
//! after its window and a path cannot be swapped under an old signature.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default signed-URL lifetime.
pub const DEFAULT_URL_TTL_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignedUrlError {
    #[error("Signed URL is malformed")]
    Malformed,

    #[error("Signed URL expired at {0}")]
    Expired(i64),

    #[error("Signed URL signature does not match")]
    BadSignature,
}

/// Signs and verifies artifact URLs with a shared secret.
pub struct UrlSigner {
    key: Vec<u8>,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Secret from `ARTIFACT_URL_SECRET`, TTL from `ARTIFACT_URL_TTL_SECS`
    /// (default 3600).
    pub fn from_env() -> Self {
        let secret = std::env::var("ARTIFACT_URL_SECRET")
            .expect("ARTIFACT_URL_SECRET must be set to sign artifact URLs");
        let ttl_secs: i64 = std::env::var("ARTIFACT_URL_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_URL_TTL_SECS.to_string())
            .parse()
            .expect("ARTIFACT_URL_TTL_SECS must be a valid i64");
        Self::new(secret, ttl_secs)
    }

    /// Sign `url`, producing `url?expires=<unix>&sig=<hex>`.
    pub fn sign_at(&self, url: &str, now: DateTime<Utc>) -> String {
        let expires = (now + self.ttl).timestamp();
        let sig = self.signature(url, expires);
        format!("{url}?expires={expires}&sig={sig}")
    }

    pub fn sign(&self, url: &str) -> String {
        self.sign_at(url, Utc::now())
    }

    /// Verify a signed URL, returning the bare artifact URL on success.
    pub fn verify_at(&self, signed: &str, now: DateTime<Utc>) -> Result<String, SignedUrlError> {
        let (url, query) = signed.split_once('?').ok_or(SignedUrlError::Malformed)?;
        let (expires_part, sig_part) =
            query.split_once('&').ok_or(SignedUrlError::Malformed)?;

        let expires: i64 = expires_part
            .strip_prefix("expires=")
            .ok_or(SignedUrlError::Malformed)?
            .parse()
            .map_err(|_| SignedUrlError::Malformed)?;
        let sig = sig_part
            .strip_prefix("sig=")
            .ok_or(SignedUrlError::Malformed)?;

        // Signature check before expiry so a forged URL never learns
        // whether its timestamp was plausible.
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| SignedUrlError::Malformed)?;
        mac.update(url.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        let expected = hex(&mac.finalize().into_bytes());
        if expected != sig {
            return Err(SignedUrlError::BadSignature);
        }

        if now.timestamp() > expires {
            return Err(SignedUrlError::Expired(expires));
        }

        Ok(url.to_string())
    }

    pub fn verify(&self, signed: &str) -> Result<String, SignedUrlError> {
        self.verify_at(signed, Utc::now())
    }

    fn signature(&self, url: &str, expires: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(url.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        hex(&mac.finalize().into_bytes())
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("test-secret", 3600)
    }

    #[test]
    fn sign_then_verify_roundtrips() {
        let now = Utc::now();
        let signed = signer().sign_at("artifacts/p/abc.csc", now);
        let url = signer().verify_at(&signed, now).unwrap();
        assert_eq!(url, "artifacts/p/abc.csc");
    }

    #[test]
    fn expired_url_is_rejected() {
        let now = Utc::now();
        let signed = signer().sign_at("artifacts/p/abc.csc", now);
        let later = now + Duration::seconds(3601);
        assert!(matches!(
            signer().verify_at(&signed, later),
            Err(SignedUrlError::Expired(_))
        ));
    }

    #[test]
    fn tampered_path_is_rejected() {
        let now = Utc::now();
        let signed = signer().sign_at("artifacts/p/abc.csc", now);
        let tampered = signed.replace("abc", "def");
        assert_eq!(
            signer().verify_at(&tampered, now),
            Err(SignedUrlError::BadSignature)
        );
    }

    #[test]
    fn tampered_expiry_is_rejected() {
        let now = Utc::now();
        let signed = signer().sign_at("artifacts/p/abc.csc", now);
        let expires = (now + Duration::seconds(3600)).timestamp();
        let tampered = signed.replace(&expires.to_string(), &(expires + 9999).to_string());
        assert_eq!(
            signer().verify_at(&tampered, now),
            Err(SignedUrlError::BadSignature)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let signed = signer().sign_at("artifacts/p/abc.csc", now);
        let other = UrlSigner::new("other-secret", 3600);
        assert_eq!(
            other.verify_at(&signed, now),
            Err(SignedUrlError::BadSignature)
        );
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let now = Utc::now();
        for bad in [
            "artifacts/p/abc.csc",
            "artifacts/p/abc.csc?expires=123",
            "artifacts/p/abc.csc?sig=ff&expires=123",
            "artifacts/p/abc.csc?expires=notanumber&sig=ff",
        ] {
            assert!(signer().verify_at(bad, now).is_err(), "{bad}");
        }
    }
}

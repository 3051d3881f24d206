//! Expiring signed URLs for backends without native presigning.
//!
//! URL: `{base_url}/{urlencoded key}?expires={unix_ts}&signature={hex}` where
//! the signature is HMAC-SHA256(secret, "{key}\n{expires}").

use crate::traits::{StorageError, StorageResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSigner {
    mac: HmacSha256,
    base_url: String,
}

impl UrlSigner {
    pub fn new(secret: &[u8], base_url: impl Into<String>) -> StorageResult<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing secret: {}", e)))?;
        Ok(Self {
            mac,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn signature(&self, key: &str, expires: i64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    pub fn sign(&self, key: &str, expires_in: Duration) -> String {
        let expires = chrono::Utc::now().timestamp() + expires_in.as_secs() as i64;
        self.sign_until(key, expires)
    }

    fn sign_until(&self, key: &str, expires: i64) -> String {
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            urlencoding::encode(key),
            expires,
            hex::encode(self.signature(key, expires))
        )
    }

    /// Check a signature produced by [`UrlSigner::sign`] and that it has not expired.
    pub fn verify(&self, key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        let provided = hex::decode(signature)
            .map_err(|_| StorageError::InvalidSignature("Malformed signature".to_string()))?;

        let mut mac = self.mac.clone();
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| StorageError::InvalidSignature("Signature mismatch".to_string()))?;

        if chrono::Utc::now().timestamp() > expires {
            return Err(StorageError::InvalidSignature(
                "Signed URL has expired".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new(b"0123456789abcdef0123456789abcdef", "http://localhost:3000/files/").unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[test]
    fn test_signed_url_verifies() {
        let signer = signer();
        let url = signer.sign("1_abc_cat.png", Duration::from_secs(3600));
        assert!(url.starts_with("http://localhost:3000/files/1_abc_cat.png?expires="));

        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");
        assert!(signer.verify("1_abc_cat.png", expires, signature).is_ok());
    }

    #[test]
    fn test_signature_bound_to_key() {
        let signer = signer();
        let url = signer.sign("1_abc_cat.png", Duration::from_secs(3600));
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");
        assert!(signer.verify("1_abc_dog.png", expires, signature).is_err());
    }

    #[test]
    fn test_expired_url_rejected() {
        let signer = signer();
        let expires = chrono::Utc::now().timestamp() - 10;
        let url = signer.sign_until("k", expires);
        let signature = query_param(&url, "signature");
        assert!(matches!(
            signer.verify("k", expires, signature),
            Err(StorageError::InvalidSignature(_))
        ));
    }
}

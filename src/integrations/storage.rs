//! Signed URLs for product images kept in the object storage bucket.
//!
//! A signed URL has the form
//! `{public_url}/object/sign/{bucket}/{path}?token=<jwt>`; the HS256 token
//! carries `url = "{bucket}/{path}"` and an expiry.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::IntegrationError;
use crate::infrastructure::config::StorageConfig;

#[derive(Debug, Serialize, Deserialize)]
struct SignedObjectClaims {
    url: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct StorageSigner {
    public_url: String,
    bucket: String,
    secret: String,
    ttl_secs: i64,
}

impl StorageSigner {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            public_url: config.public_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            secret: config.jwt_secret.clone(),
            ttl_secs: config.url_ttl_secs,
        }
    }

    fn validate_path(path: &str) -> Result<(), IntegrationError> {
        if path.is_empty()
            || path.starts_with('/')
            || path.contains('\\')
            || path.split('/').any(|segment| segment.is_empty() || segment == "..")
        {
            return Err(IntegrationError::InvalidInput(format!(
                "invalid object path: {}",
                path
            )));
        }
        Ok(())
    }

    /// Signed URL valid for the configured TTL.
    pub fn sign(&self, path: &str) -> Result<String, IntegrationError> {
        self.sign_for(path, self.ttl_secs)
    }

    pub fn sign_for(&self, path: &str, expires_in: i64) -> Result<String, IntegrationError> {
        Self::validate_path(path)?;

        let now = Utc::now().timestamp();
        let claims = SignedObjectClaims {
            url: format!("{}/{}", self.bucket, path),
            iat: now,
            exp: now + expires_in,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IntegrationError::InvalidInput(e.to_string()))?;

        let mut url = Url::parse(&self.public_url)
            .map_err(|e| IntegrationError::InvalidInput(format!("storage URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| IntegrationError::InvalidInput("storage URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["object", "sign", self.bucket.as_str()])
            .extend(path.split('/'));
        url.query_pairs_mut().append_pair("token", &token);

        Ok(url.to_string())
    }

    /// Object (`bucket/path`) a token grants access to, if still valid.
    pub fn verify(&self, token: &str) -> Result<String, IntegrationError> {
        decode::<SignedObjectClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims.url)
        .map_err(|e| IntegrationError::Signature(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> StorageSigner {
        StorageSigner::new(&StorageConfig {
            public_url: "https://cdn.example.it/storage/v1/".into(),
            bucket: "product-images".into(),
            jwt_secret: "s3cret".into(),
            url_ttl_secs: 600,
        })
    }

    #[test]
    fn signed_url_points_at_object_and_verifies() {
        let signer = signer();
        let signed = signer.sign("trapani/bosch 500.jpg").unwrap();
        let url = Url::parse(&signed).unwrap();

        assert_eq!(
            url.path(),
            "/storage/v1/object/sign/product-images/trapani/bosch%20500.jpg"
        );
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            signer.verify(&token).unwrap(),
            "product-images/trapani/bosch 500.jpg"
        );
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let signer = signer();
        for path in ["", "/etc/passwd", "a/../b", "a//b", "a\\b"] {
            assert!(signer.sign(path).is_err(), "{path} should be rejected");
        }
    }

    #[test]
    fn expired_token_fails_verification() {
        let signer = signer();
        let signed = signer.sign_for("a.jpg", -3600).unwrap();
        let token = signed.split("token=").nth(1).unwrap();
        assert!(signer.verify(token).is_err());
    }
}

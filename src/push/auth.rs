//! Signing keys for push notifications.
//!
//! Each [`PushNotificationAuth`] owns one secp256k1 key pair generated at
//! construction. The public half is published as a JWKS; every outbound
//! request carries a compact JWS (`ES256K`) whose claims bind it to the exact
//! request body through a SHA-256 hash.

use crate::errors::{TaskError, TaskResult};
use a2a_types::{JsonWebKey, JsonWebKeySet};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::{EncodedPoint, FieldBytes};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "ES256K";

/// Claims carried by every push notification token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushClaims {
    /// Issue time, seconds since the epoch.
    pub iat: i64,
    /// Hex SHA-256 of the request body.
    pub request_body_sha256: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwsHeader {
    alg: String,
    typ: String,
    kid: String,
}

pub struct PushNotificationAuth {
    signing_key: SigningKey,
    kid: String,
}

impl std::fmt::Debug for PushNotificationAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushNotificationAuth")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl PushNotificationAuth {
    /// Generates a fresh key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let kid = uuid::Uuid::new_v4().simple().to_string();
        tracing::info!(kid = %kid, "generated push notification signing key");
        Self { signing_key, kid }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The public key as a JWK.
    pub fn jwk(&self) -> JsonWebKey {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let encode = |coordinate: Option<&FieldBytes>| {
            coordinate
                .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
                .unwrap_or_default()
        };

        JsonWebKey {
            kty: "EC".to_string(),
            crv: "secp256k1".to_string(),
            x: encode(point.x()),
            y: encode(point.y()),
            kid: self.kid.clone(),
            alg: ALGORITHM.to_string(),
            key_use: "sig".to_string(),
        }
    }

    pub fn jwks(&self) -> JsonWebKeySet {
        JsonWebKeySet {
            keys: vec![self.jwk()],
        }
    }

    /// Signs a token for a request with the given body.
    pub fn sign(&self, body: &[u8]) -> TaskResult<String> {
        let header = JwsHeader {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
            kid: self.kid.clone(),
        };
        let claims = PushClaims {
            iat: chrono::Utc::now().timestamp(),
            request_body_sha256: body_sha256(body),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Verifies a token against a key set and the body it claims to cover.
    ///
    /// This is what a notification receiver does after fetching the sender's
    /// JWKS.
    pub fn verify(jwks: &JsonWebKeySet, token: &str, body: &[u8]) -> TaskResult<PushClaims> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(invalid_token("expected three segments"));
        };

        let header: JwsHeader = serde_json::from_slice(&decode(header_b64)?)?;
        if header.alg != ALGORITHM {
            return Err(invalid_token(format!("unsupported alg {}", header.alg)));
        }
        let jwk = jwks
            .find(&header.kid)
            .ok_or_else(|| invalid_token(format!("unknown kid {}", header.kid)))?;
        let verifying_key = verifying_key(jwk)?;

        let signature = Signature::from_slice(&decode(signature_b64)?)
            .map_err(|e| invalid_token(format!("malformed signature: {e}")))?;
        let signing_input = format!("{header_b64}.{claims_b64}");
        verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| invalid_token("signature mismatch"))?;

        let claims: PushClaims = serde_json::from_slice(&decode(claims_b64)?)?;
        if claims.request_body_sha256 != body_sha256(body) {
            return Err(invalid_token("body hash mismatch"));
        }
        Ok(claims)
    }
}

fn body_sha256(body: &[u8]) -> String {
    format!("{:x}", Sha256::digest(body))
}

fn decode(segment: &str) -> TaskResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| invalid_token(format!("bad base64: {e}")))
}

fn verifying_key(jwk: &JsonWebKey) -> TaskResult<VerifyingKey> {
    let x = decode(&jwk.x)?;
    let y = decode(&jwk.y)?;
    if x.len() != 32 || y.len() != 32 {
        return Err(invalid_token("coordinates must be 32 bytes"));
    }

    let point = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&x),
        FieldBytes::from_slice(&y),
        false,
    );
    VerifyingKey::from_encoded_point(&point).map_err(|e| invalid_token(format!("bad key: {e}")))
}

fn invalid_token(reason: impl std::fmt::Display) -> TaskError {
    TaskError::internal("push_auth", format!("invalid token: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwk_describes_secp256k1_key() {
        let auth = PushNotificationAuth::generate();
        let jwk = auth.jwk();
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv, "secp256k1");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(URL_SAFE_NO_PAD.decode(&jwk.x).unwrap().len(), 32);
        assert_eq!(auth.jwks().find(auth.kid()), Some(&jwk));
    }

    #[test]
    fn token_verifies_against_published_keys() {
        let auth = PushNotificationAuth::generate();
        let body = br#"{"id":"task-1"}"#;
        let token = auth.sign(body).unwrap();

        let claims = PushNotificationAuth::verify(&auth.jwks(), &token, body).unwrap();
        assert_eq!(claims.request_body_sha256.len(), 64);
    }

    #[test]
    fn token_is_bound_to_body_and_key() {
        let auth = PushNotificationAuth::generate();
        let token = auth.sign(b"original").unwrap();

        assert!(PushNotificationAuth::verify(&auth.jwks(), &token, b"tampered").is_err());

        let stranger = PushNotificationAuth::generate();
        assert!(PushNotificationAuth::verify(&stranger.jwks(), &token, b"original").is_err());
    }

    #[test]
    fn empty_body_hash_is_well_known() {
        assert_eq!(
            body_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

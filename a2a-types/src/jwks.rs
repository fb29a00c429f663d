//! JSON Web Key Set published at `/.well-known/jwks.json` so push
//! notification receivers can verify the tokens attached to each delivery.

use serde::{Deserialize, Serialize};

/// A single public key (RFC 7517). Only elliptic-curve keys are produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWebKey {
    pub kty: String,
    pub crv: String,
    /// Base64url-encoded affine x coordinate.
    pub x: String,
    /// Base64url-encoded affine y coordinate.
    pub y: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

//! JWKS parsing and JWK-to-RSA-key conversion.

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::error::Error;

/// A provider's published key set, as served by its JWKS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid JSON or doesn't match the expected JWKS shape.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// One published key. Only RSA keys are usable here; entries of other key
/// types parse but fail conversion, so a provider adding an EC key to its
/// set does not break verification of RSA-signed tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Build a JWK from an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be converted to a JWK.
    pub fn from_rsa_public_key(
        public_key: &RsaPublicKey,
        kid: impl Into<String>,
    ) -> Result<Self, Error> {
        let n = Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be());
        let e = Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be());
        Ok(Self {
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n: Some(n),
            e: Some(e),
        })
    }

    /// Convert this JWK to an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not an RSA key, the base64url
    /// values cannot be decoded, or the RSA key is invalid.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, Error> {
        if self.kty != "RSA" {
            return Err(Error::KeyMaterial);
        }
        let n = self.n.as_deref().ok_or(Error::KeyMaterial)?;
        let e = self.e.as_deref().ok_or(Error::KeyMaterial)?;
        let n_bytes = Base64UrlUnpadded::decode_vec(n).map_err(|_| Error::Base64)?;
        let e_bytes = Base64UrlUnpadded::decode_vec(e).map_err(|_| Error::Base64)?;
        let n = BigUint::from_bytes_be(&n_bytes);
        let e = BigUint::from_bytes_be(&e_bytes);
        RsaPublicKey::new(n, e).map_err(|_| Error::KeyMaterial)
    }
}

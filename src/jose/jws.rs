use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::crypto::{SignatureAlgorithm, Signer};
use crate::{Error, Result};

/// JWA name of the only signature scheme the protocol uses.
pub const ES256: &str = "ES256";

#[derive(Serialize, Deserialize, Debug)]
struct JwsHeader {
    alg: String,
}

/// A flattened JWS object: `payload`, `protected` and `signature`, all
/// base64url segments.
///
/// Three of these nest inside every log token (shared header, SharedLog,
/// AccessLog); the signature always covers the segments exactly as
/// transmitted, so the struct keeps them encoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlattenedJws {
    pub payload: String,
    pub protected: String,
    pub signature: String,
}

impl FlattenedJws {
    /// Signs the canonical JSON of `claims` with `ES256`.
    ///
    /// `signing_key` is the raw 32-byte P-256 scalar of the signer.
    pub fn sign<T: Serialize>(claims: &T, signing_key: &[u8]) -> Result<Self> {
        let payload = base64_url::encode(
            &serde_json::to_vec(claims).map_err(|e| Error::SigningFailed(e.to_string()))?,
        );
        let protected = base64_url::encode(
            &serde_json::to_vec(&JwsHeader { alg: ES256.into() })
                .map_err(|e| Error::SigningFailed(e.to_string()))?,
        );
        let signing_input = format!("{}.{}", protected, payload);
        let signer = SignatureAlgorithm::Es256.signer();
        let signature = signer(signing_key, signing_input.as_bytes())
            .map_err(|e| Error::SigningFailed(e.to_string()))?;
        Ok(FlattenedJws {
            payload,
            protected,
            signature: base64_url::encode(&signature),
        })
    }

    /// Validates the signature against a SEC1-encoded P-256 point.
    ///
    /// `Ok(false)` means the token is well-formed but was not signed by the
    /// holder of `verification_key`.
    pub fn verify(&self, verification_key: &[u8]) -> Result<bool> {
        let header_json = base64_url::decode(&self.protected)
            .map_err(|_| Error::MalformedData("protected header is not base64url".into()))?;
        let header: JwsHeader = serde_json::from_slice(&header_json)
            .map_err(|_| Error::MalformedData("protected header is not valid JSON".into()))?;
        let algorithm = SignatureAlgorithm::try_from(header.alg.as_str())?;

        let signature = match base64_url::decode(&self.signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        let signing_input = format!("{}.{}", self.protected, self.payload);
        let validator = algorithm.validator();
        validator(verification_key, signing_input.as_bytes(), &signature)
    }

    /// Decoded payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        base64_url::decode(&self.payload)
            .map_err(|_| Error::MalformedData("payload is not base64url".into()))
    }
}

#[cfg(test)]
mod jws_tests {
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;
    use serde_json::json;

    use super::*;

    #[test]
    fn sign_and_verify_test() -> Result<()> {
        // Arrange
        let sk = SigningKey::random(&mut OsRng);
        let claims = json!({"creator": "owner", "recipients": ["receiver"]});
        // Act
        let jws = FlattenedJws::sign(&claims, sk.to_bytes().as_slice())?;
        let valid = jws.verify(&sk.verifying_key().to_sec1_bytes())?;
        // Assert
        assert!(valid);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&jws.payload_bytes()?)?,
            claims
        );
        Ok(())
    }

    #[test]
    fn verify_rejects_other_key_test() -> Result<()> {
        let sk = SigningKey::random(&mut OsRng);
        let other = SigningKey::random(&mut OsRng);
        let jws = FlattenedJws::sign(&json!({"id": 1}), sk.to_bytes().as_slice())?;
        assert!(!jws.verify(&other.verifying_key().to_sec1_bytes())?);
        Ok(())
    }

    #[test]
    fn verify_rejects_tampered_payload_test() -> Result<()> {
        let sk = SigningKey::random(&mut OsRng);
        let mut jws = FlattenedJws::sign(&json!({"id": 1}), sk.to_bytes().as_slice())?;
        jws.payload = base64_url::encode(br#"{"id":2}"#);
        assert!(!jws.verify(&sk.verifying_key().to_sec1_bytes())?);
        Ok(())
    }

    #[test]
    fn verify_rejects_unexpected_algorithm_test() -> Result<()> {
        let sk = SigningKey::random(&mut OsRng);
        let mut jws = FlattenedJws::sign(&json!({"id": 1}), sk.to_bytes().as_slice())?;
        jws.protected = base64_url::encode(br#"{"alg":"none"}"#);
        assert!(jws.verify(&sk.verifying_key().to_sec1_bytes()).is_err());
        Ok(())
    }
}

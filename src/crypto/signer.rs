use std::convert::TryFrom;

use super::*;
use crate::Error;

/// Signature batteries for the protocol tokens.
///
/// Every layer of a log token (access log, shared log, shared header) is
/// signed with `ES256`; the enum mirrors the JWA registry name so envelope
/// headers can select the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// `ECDSA/P-256` NIST signature
    Es256,
}

impl Signer for SignatureAlgorithm {
    /// Builds signer closure, which performs signing.
    ///
    /// The key is the raw 32-byte P-256 scalar; the produced signature is
    /// the 64-byte `r || s` form used by JWS.
    fn signer(&self) -> SigningMethod {
        match self {
            SignatureAlgorithm::Es256 => {
                Box::new(|key: &[u8], message: &[u8]| -> Result<Vec<u8>> {
                    use p256::ecdsa::{signature::Signer, Signature, SigningKey};
                    let sk = SigningKey::from_slice(key)
                        .map_err(|_| Error::BadKey("p256 invalid signing key size".into()))?;
                    let signature: Signature = sk.sign(message);
                    Ok(signature.to_bytes().to_vec())
                })
            }
        }
    }

    /// Builds validator closure, which performs signature validation.
    ///
    /// The key is a SEC1-encoded P-256 point. A structurally broken
    /// signature yields `Ok(false)`, same as a mismatching one.
    fn validator(&self) -> ValidationMethod {
        match self {
            SignatureAlgorithm::Es256 => Box::new(
                |key: &[u8], message: &[u8], signature: &[u8]| -> Result<bool> {
                    use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
                    let key = VerifyingKey::from_sec1_bytes(key)
                        .map_err(|_| Error::BadKey("p256 invalid verification key".into()))?;
                    Ok(match Signature::from_slice(signature) {
                        Ok(s) => key.verify(message, &s).is_ok(),
                        Err(_) => false,
                    })
                },
            ),
        }
    }
}

impl TryFrom<&str> for SignatureAlgorithm {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "ES256" => Ok(Self::Es256),
            other => Err(Error::MalformedData(format!(
                "unsupported signature algorithm '{}'",
                other
            ))),
        }
    }
}

#[test]
fn es256_test() {
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;
    // Arrange
    let sk = SigningKey::random(&mut OsRng);
    let vk = sk.verifying_key();
    let m = b"this is the message we're signing in this test...";
    // Act
    let signer = SignatureAlgorithm::Es256.signer();
    let validator = SignatureAlgorithm::Es256.validator();
    let signature = signer(sk.to_bytes().as_slice(), m).unwrap();
    let validation = validator(&vk.to_sec1_bytes(), m, &signature);
    // Assert
    assert!(validation.unwrap());
}

#[test]
fn es256_rejects_foreign_signature_test() {
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;
    // Arrange
    let sk = SigningKey::random(&mut OsRng);
    let other = SigningKey::random(&mut OsRng);
    let m = b"signed by somebody else entirely";
    // Act
    let signature = SignatureAlgorithm::Es256.signer()(other.to_bytes().as_slice(), m).unwrap();
    let validation =
        SignatureAlgorithm::Es256.validator()(&sk.verifying_key().to_sec1_bytes(), m, &signature);
    // Assert
    assert!(!validation.unwrap());
}

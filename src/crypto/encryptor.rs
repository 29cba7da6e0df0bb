use std::convert::TryFrom;

use super::*;
use crate::Error;

/// Content encryption batteries for the JWE layer.
///
/// The protocol pins `A256GCM` as its AEAD. Instances are cheap and
/// should be created per invocation so no key material outlives a call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CryptoAlgorithm {
    A256Gcm,
}

impl Cypher for CryptoAlgorithm {
    /// Generates + invokes crypto of `SymmetricCypherMethod` which performs
    /// encryption. Output is `ciphertext || tag`.
    fn encryptor(&self) -> SymmetricCypherMethod {
        match self {
            CryptoAlgorithm::A256Gcm => Box::new(
                |nonce: &[u8], key: &[u8], message: &[u8], aad: &[u8]| -> Result<Vec<u8>> {
                    check_nonce(nonce, 12)?;
                    check_key(key, 32)?;
                    use aes_gcm::{
                        aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
                        Aes256Gcm,
                    };
                    let nonce = GenericArray::from_slice(&nonce[..12]);
                    let aead = Aes256Gcm::new(GenericArray::from_slice(key));
                    aead.encrypt(nonce, Payload { msg: message, aad })
                        .map_err(|_| Error::CryptoFailure("AEAD encryption failed".into()))
                },
            ),
        }
    }

    /// Generates + invokes crypto of `SymmetricCypherMethod` which performs
    /// decryption. Expects `ciphertext || tag` as the message.
    fn decrypter(&self) -> SymmetricCypherMethod {
        match self {
            CryptoAlgorithm::A256Gcm => Box::new(
                |nonce: &[u8], key: &[u8], message: &[u8], aad: &[u8]| -> Result<Vec<u8>> {
                    check_nonce(nonce, 12)?;
                    check_key(key, 32)?;
                    use aes_gcm::{
                        aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
                        Aes256Gcm,
                    };
                    let nonce = GenericArray::from_slice(&nonce[..12]);
                    let aead = Aes256Gcm::new(GenericArray::from_slice(key));
                    aead.decrypt(nonce, Payload { msg: message, aad })
                        .map_err(|_| Error::DecryptionFailed)
                },
            ),
        }
    }
}

impl TryFrom<&str> for CryptoAlgorithm {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "A256GCM" => Ok(Self::A256Gcm),
            other => Err(Error::MalformedJwe(format!(
                "unsupported content encryption '{}'",
                other
            ))),
        }
    }
}

// inner helper functions
fn check_nonce(nonce: &[u8], expected_len: usize) -> Result<()> {
    if nonce.len() < expected_len {
        return Err(Error::CryptoFailure("nonce is too short".into()));
    }
    Ok(())
}

fn check_key(key: &[u8], expected_len: usize) -> Result<()> {
    if key.len() != expected_len {
        return Err(Error::BadKey("expected 256 bit (32 byte) key".into()));
    }
    Ok(())
}

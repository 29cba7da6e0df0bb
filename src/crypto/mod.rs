//! Cryptographic batteries for the log-sharing protocol.
//!
//! Primitives are exposed as closure generators so the envelope code never
//! touches algorithm-specific types. Underlying algorithms are implemented
//! by the Rust-crypto crate family.

mod agreement;
mod encryptor;
mod signer;

pub use agreement::{unwrap_content_key, wrap_content_key, EphemeralPublicKey, ECDH_ES_A256KW};
pub use encryptor::CryptoAlgorithm;
pub use signer::SignatureAlgorithm;

use crate::Result;

/// Symmetric AEAD closure: `(nonce, key, message, aad)`.
pub type SymmetricCypherMethod = Box<dyn Fn(&[u8], &[u8], &[u8], &[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Signing closure: `(key, message)`.
pub type SigningMethod = Box<dyn Fn(&[u8], &[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Signature validation closure: `(key, message, signature)`.
pub type ValidationMethod = Box<dyn Fn(&[u8], &[u8], &[u8]) -> Result<bool> + Send + Sync>;

/// Content encryption cipher selected by a JWE `enc` header.
pub trait Cypher {
    fn encryptor(&self) -> SymmetricCypherMethod;
    fn decrypter(&self) -> SymmetricCypherMethod;
}

/// Signature scheme selected by a JWS `alg` header.
pub trait Signer {
    fn signer(&self) -> SigningMethod;
    fn validator(&self) -> ValidationMethod;
}

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds of the log-sharing protocol.
///
/// Every variant carries a stable human-readable message; downstream test
/// suites assert on substrings of these messages, so changing the phrasing
/// is a breaking change.
#[derive(Debug, Error)]
pub enum Error {
    /// The outer envelope fails structural parsing.
    #[error("Malformed JWE: {0}")]
    MalformedJwe(String),

    /// No recipient entry resolves a content key, or the AEAD tag does not
    /// authenticate.
    #[error("Decryption failed: no recipient key matched or the ciphertext is not authentic")]
    DecryptionFailed,

    /// The decrypted plaintext is not a signed SharedLog.
    #[error("Malformed SharedLog: {0}")]
    MalformedSharedLog(String),

    /// The embedded token is not a signed AccessLog.
    #[error("Malformed AccessLog: {0}")]
    MalformedAccessLog(String),

    /// The resolver cannot find a claimed principal.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The signer of an AccessLog lacks monitor authority.
    #[error("Unauthorized monitor: user '{0}' is not allowed to sign access logs")]
    UnauthorizedMonitor(String),

    #[error("Invalid signature of SharedLog")]
    SharedLogSignatureInvalid,

    #[error("Invalid signature of AccessLog")]
    AccessLogSignatureInvalid,

    /// A cross-layer invariant between the JWE header and the signed
    /// claims does not hold; the message names the violated invariant.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Encryption was requested without any receiver.
    #[error("No recipients provided to encrypt to")]
    NoRecipients,

    /// A receiver cannot be encrypted to.
    #[error("Key unavailable: user '{0}' has no encryption certificate")]
    KeyUnavailable(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Key or certificate material failed to import.
    #[error("Bad key material: {0}")]
    BadKey(String),

    /// A low-level primitive failed outside any of the named paths.
    #[error("Cryptographic operation failed: {0}")]
    CryptoFailure(String),

    /// Plain JSON failure outside the protocol-specific parse paths.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A facade operation was called before any user logged in.
    #[error("No user is logged in")]
    NotAuthenticated,
}

//! Protocol participants and the directory lookup contract.

use std::collections::HashMap;

use async_trait::async_trait;
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use p256::{PublicKey, SecretKey};
use uuid::Uuid;
use x509_parser::pem::parse_x509_pem;

use crate::logs::{AccessLog, SignedLog};
use crate::{decryption, encryption, Error, Result};

/// Public view of a participant, as handed out by a [`UserResolver`].
///
/// The certificate fields hold the keys extracted from the user's X.509
/// certificates; trust in those certificates is the resolver's concern.
#[derive(Debug, Clone)]
pub struct RemoteUser {
    pub id: String,
    /// ES256 verification key from the user's signing certificate.
    pub verification_certificate: VerifyingKey,
    /// ECDH-P256 key agreement key; `None` for users that cannot receive
    /// encrypted logs.
    pub encryption_certificate: Option<PublicKey>,
    /// Whether this user is authorized to originate access logs.
    pub is_monitor: bool,
}

impl RemoteUser {
    /// Imports a user from PEM-encoded X.509 certificates.
    pub fn import(
        id: &str,
        verification_certificate: &str,
        is_monitor: bool,
        encryption_certificate: Option<&str>,
    ) -> Result<Self> {
        let verification_certificate = verification_key_from_pem(verification_certificate)?;
        let encryption_certificate = match encryption_certificate {
            Some(pem) => Some(agreement_key_from_pem(pem)?),
            None => None,
        };
        Ok(RemoteUser {
            id: id.into(),
            verification_certificate,
            encryption_certificate,
            is_monitor,
        })
    }
}

/// A participant holding private keys: can sign access logs, share them
/// and decrypt tokens addressed to it.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub verification_certificate: VerifyingKey,
    pub encryption_certificate: PublicKey,
    pub is_monitor: bool,
    pub(crate) signing_key: SigningKey,
    pub(crate) decryption_key: SecretKey,
}

impl AuthenticatedUser {
    /// Imports a fully keyed user from PEM material. Certificates are
    /// X.509, private keys PKCS#8.
    pub fn import(
        id: &str,
        verification_certificate: &str,
        encryption_certificate: &str,
        signing_key: &str,
        decryption_key: &str,
    ) -> Result<Self> {
        let signing_key = SecretKey::from_pkcs8_pem(signing_key)
            .map_err(|e| Error::BadKey(format!("invalid signing key PEM: {}", e)))?;
        let decryption_key = SecretKey::from_pkcs8_pem(decryption_key)
            .map_err(|e| Error::BadKey(format!("invalid decryption key PEM: {}", e)))?;
        Ok(AuthenticatedUser {
            id: id.into(),
            verification_certificate: verification_key_from_pem(verification_certificate)?,
            encryption_certificate: agreement_key_from_pem(encryption_certificate)?,
            is_monitor: false,
            signing_key: SigningKey::from(&signing_key),
            decryption_key,
        })
    }

    /// Marks the user as a monitor. Chained setter.
    pub fn as_monitor(mut self) -> Self {
        self.is_monitor = true;
        self
    }

    /// Creates a user with fresh P-256 keypairs and self-signed X.509
    /// certificates, routed through [`AuthenticatedUser::import`] so the
    /// PEM paths are exercised. Intended for tests and bootstrapping.
    pub fn generate() -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let signing = rcgen::generate_simple_self_signed(vec![id.clone()])
            .map_err(|e| Error::BadKey(e.to_string()))?;
        let encryption = rcgen::generate_simple_self_signed(vec![id.clone()])
            .map_err(|e| Error::BadKey(e.to_string()))?;
        Self::import(
            &id,
            &signing.cert.pem(),
            &encryption.cert.pem(),
            &signing.key_pair.serialize_pem(),
            &encryption.key_pair.serialize_pem(),
        )
    }

    /// Signs `log`, producing the token other parties will verify against
    /// this user's verification certificate.
    pub fn sign_access_log(&self, log: &AccessLog) -> Result<SignedLog> {
        let jws = crate::jose::FlattenedJws::sign(log, self.signing_key.to_bytes().as_slice())?;
        SignedLog::new(jws)
    }

    /// Shares a signed log with `receivers`. See [`encryption::encrypt`].
    pub async fn encrypt_log(&self, log: &SignedLog, receivers: &[RemoteUser]) -> Result<String> {
        encryption::encrypt(log, self, receivers).await
    }

    /// Decrypts and verifies a received token. See [`decryption::decrypt`].
    pub async fn decrypt_log(
        &self,
        token: &str,
        resolver: &dyn UserResolver,
    ) -> Result<SignedLog> {
        decryption::decrypt(token, self, resolver).await
    }
}

impl From<&AuthenticatedUser> for RemoteUser {
    fn from(user: &AuthenticatedUser) -> Self {
        RemoteUser {
            id: user.id.clone(),
            verification_certificate: user.verification_certificate,
            encryption_certificate: Some(user.encryption_certificate),
            is_monitor: user.is_monitor,
        }
    }
}

/// Directory lookup contract: maps a claimed user id to its public view.
///
/// Injected per decrypt call; implementations may hit the network, which
/// is why resolution is asynchronous. The protocol only requires that one
/// call sees consistent data.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Resolves `id`, failing with [`Error::UnknownUser`] when the
    /// directory has no such user.
    async fn resolve(&self, id: &str) -> Result<RemoteUser>;
}

/// Map-backed resolver for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    users: HashMap<String, RemoteUser>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: RemoteUser) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserResolver for InMemoryResolver {
    async fn resolve(&self, id: &str) -> Result<RemoteUser> {
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownUser(id.to_string()))
    }
}

fn verification_key_from_pem(pem: &str) -> Result<VerifyingKey> {
    let certificate = parse_certificate_key_bytes(pem)?;
    VerifyingKey::from_sec1_bytes(&certificate)
        .map_err(|_| Error::BadKey("certificate does not carry a P-256 verification key".into()))
}

fn agreement_key_from_pem(pem: &str) -> Result<PublicKey> {
    let certificate = parse_certificate_key_bytes(pem)?;
    PublicKey::from_sec1_bytes(&certificate)
        .map_err(|_| Error::BadKey("certificate does not carry a P-256 agreement key".into()))
}

fn parse_certificate_key_bytes(pem: &str) -> Result<Vec<u8>> {
    let (_, pem) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| Error::BadKey(format!("invalid certificate PEM: {}", e)))?;
    let certificate = pem
        .parse_x509()
        .map_err(|e| Error::BadKey(format!("invalid X.509 certificate: {}", e)))?;
    Ok(certificate.public_key().subject_public_key.data.to_vec())
}

use std::convert::TryFrom;

use log::trace;
use p256::{PublicKey, SecretKey};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    unwrap_content_key, wrap_content_key, CryptoAlgorithm, Cypher, EphemeralPublicKey,
    ECDH_ES_A256KW,
};
use crate::jose::FlattenedJws;
use crate::{Error, Result};

/// JWA name of the content encryption algorithm.
pub const A256GCM: &str = "A256GCM";

const CEK_LENGTH: usize = 32;
const IV_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Cleartext view of a log token's protected header.
///
/// `owner` and `recipients` are duplicated here so parties can route a
/// token before decrypting it; the whole header is bound into the AEAD tag,
/// and `shared_header` repeats the same claims under the sharer's signature.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JweProtected {
    pub enc: String,
    #[serde(rename = "sharedHeader")]
    pub shared_header: FlattenedJws,
    pub owner: String,
    pub recipients: Vec<String>,
}

/// Per-recipient JOSE header carrying the key agreement parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecipientHeader {
    pub alg: String,
    pub epk: EphemeralPublicKey,
}

/// One entry of the `recipients` array.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JweRecipient {
    pub encrypted_key: String,
    pub header: RecipientHeader,
}

/// General JSON serialization of a JWE.
///
/// Sibling implementations flatten single-recipient tokens, hoisting
/// `encrypted_key` and `header` to the top level and dropping the
/// `recipients` array; [`JweEnvelope::parse`] folds that shape back into
/// the general form so the rest of the pipeline only ever sees one shape.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JweEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<JweRecipient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RecipientHeader>,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
}

impl JweEnvelope {
    /// Parses a serialized token and normalizes it to the general form.
    pub fn parse(token: &str) -> Result<Self> {
        serde_json::from_str::<JweEnvelope>(token)
            .map_err(|e| Error::MalformedJwe(e.to_string()))?
            .normalize()
    }

    /// Folds the flattened single-recipient shape into the `recipients`
    /// array. Applied unconditionally; a token that carries neither shape
    /// is rejected here.
    fn normalize(mut self) -> Result<Self> {
        if self.recipients.is_none() {
            let encrypted_key = self.encrypted_key.take().ok_or_else(|| {
                Error::MalformedJwe("neither 'recipients' nor 'encrypted_key' present".into())
            })?;
            let header = self
                .header
                .take()
                .ok_or_else(|| Error::MalformedJwe("flattened token without 'header'".into()))?;
            self.recipients = Some(vec![JweRecipient { encrypted_key, header }]);
        }
        Ok(self)
    }
}

/// Seals `plaintext` into a general JWE addressed to `receivers`, wrapping
/// a fresh content key once per receiver.
pub(crate) fn seal(
    plaintext: &[u8],
    protected: &JweProtected,
    receivers: &[(String, PublicKey)],
) -> Result<String> {
    let mut content_key = [0u8; CEK_LENGTH];
    OsRng.fill_bytes(&mut content_key);
    let mut iv = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut iv);

    let protected_b64 = base64_url::encode(
        &serde_json::to_vec(protected).map_err(|e| Error::MalformedJwe(e.to_string()))?,
    );

    let mut recipients = Vec::with_capacity(receivers.len());
    for (id, key) in receivers {
        trace!("wrapping content key for recipient {}", id);
        let (wrapped, epk) = wrap_content_key(&content_key, key)?;
        recipients.push(JweRecipient {
            encrypted_key: base64_url::encode(&wrapped),
            header: RecipientHeader {
                alg: ECDH_ES_A256KW.into(),
                epk,
            },
        });
    }

    let sealed = CryptoAlgorithm::A256Gcm.encryptor()(
        &iv,
        &content_key,
        plaintext,
        protected_b64.as_bytes(),
    )?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);

    let envelope = JweEnvelope {
        protected: Some(protected_b64),
        recipients: Some(recipients),
        encrypted_key: None,
        header: None,
        iv: base64_url::encode(&iv),
        ciphertext: base64_url::encode(ciphertext),
        tag: base64_url::encode(tag),
    };
    serde_json::to_string(&envelope).map_err(|e| Error::MalformedJwe(e.to_string()))
}

/// AEAD-opens a normalized envelope with the receiver's key agreement
/// secret. Returns the plaintext and the raw protected segment for the
/// caller's cross-layer checks.
pub(crate) fn open(
    envelope: &JweEnvelope,
    decryption_key: &SecretKey,
) -> Result<(Vec<u8>, Option<String>)> {
    let recipients = envelope
        .recipients
        .as_ref()
        .ok_or_else(|| Error::MalformedJwe("missing 'recipients'".into()))?;

    let algorithm = match &envelope.protected {
        Some(protected) => {
            let header_json = base64_url::decode(protected)
                .map_err(|_| Error::MalformedJwe("protected header is not base64url".into()))?;
            let header: ContentEncryptionOnly = serde_json::from_slice(&header_json)
                .map_err(|e| Error::MalformedJwe(e.to_string()))?;
            CryptoAlgorithm::try_from(header.enc.as_str())?
        }
        None => CryptoAlgorithm::A256Gcm,
    };

    let iv = base64_url::decode(&envelope.iv)
        .map_err(|_| Error::MalformedJwe("'iv' is not base64url".into()))?;
    let ciphertext = base64_url::decode(&envelope.ciphertext)
        .map_err(|_| Error::MalformedJwe("'ciphertext' is not base64url".into()))?;
    let tag = base64_url::decode(&envelope.tag)
        .map_err(|_| Error::MalformedJwe("'tag' is not base64url".into()))?;

    let mut content_key = None;
    for recipient in recipients {
        if recipient.header.alg != ECDH_ES_A256KW {
            continue;
        }
        let wrapped = match base64_url::decode(&recipient.encrypted_key) {
            Ok(wrapped) => wrapped,
            Err(_) => continue,
        };
        if let Ok(key) = unwrap_content_key(&wrapped, &recipient.header.epk, decryption_key) {
            content_key = Some(key);
            break;
        }
    }
    let content_key = content_key.ok_or(Error::DecryptionFailed)?;

    let aad = envelope.protected.clone().unwrap_or_default();
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);
    let plaintext = algorithm.decrypter()(&iv, &content_key, &sealed, aad.as_bytes())?;
    Ok((plaintext, envelope.protected.clone()))
}

#[derive(Deserialize)]
struct ContentEncryptionOnly {
    enc: String,
}

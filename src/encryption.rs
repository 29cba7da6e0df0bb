//! Sealing of signed logs for a set of receivers (the sharing act).

use log::debug;
use uuid::Uuid;

use crate::jose::{self, FlattenedJws, JweProtected, A256GCM};
use crate::logs::{SharedHeader, SharedLog, SignedLog};
use crate::user::{AuthenticatedUser, RemoteUser};
use crate::{Error, Result};

/// Wraps `signed_log` into a freshly signed [`SharedLog`] and seals both
/// into a general-JSON JWE addressed to `receivers`.
///
/// The protected header duplicates the signed shared header (id, owner,
/// recipients), binding the routing metadata into the AEAD tag; decrypters
/// cross-check it against the signed claims.
pub async fn encrypt(
    signed_log: &SignedLog,
    sender: &AuthenticatedUser,
    receivers: &[RemoteUser],
) -> Result<String> {
    if receivers.is_empty() {
        return Err(Error::NoRecipients);
    }

    let mut keyed_receivers = Vec::with_capacity(receivers.len());
    for receiver in receivers {
        let key = receiver
            .encryption_certificate
            .ok_or_else(|| Error::KeyUnavailable(receiver.id.clone()))?;
        keyed_receivers.push((receiver.id.clone(), key));
    }
    let recipient_ids: Vec<String> = receivers.iter().map(|r| r.id.clone()).collect();

    let access_log = signed_log.extract();
    let shared_log = SharedLog {
        log: signed_log.jws().clone(),
        creator: sender.id.clone(),
        owner: access_log.owner,
        recipients: recipient_ids.clone(),
        id: Uuid::new_v4().to_string(),
    };
    debug!(
        "sharing log {} as {} with {} recipient(s)",
        shared_log.id,
        shared_log.creator,
        recipient_ids.len()
    );

    let signing_key = sender.signing_key.to_bytes();
    let jws_shared_log = FlattenedJws::sign(&shared_log, signing_key.as_slice())?;
    let shared_header = SharedHeader {
        id: shared_log.id.clone(),
        owner: shared_log.owner.clone(),
        recipients: recipient_ids.clone(),
    };
    let jws_shared_header = FlattenedJws::sign(&shared_header, signing_key.as_slice())?;

    let protected = JweProtected {
        enc: A256GCM.into(),
        shared_header: jws_shared_header,
        owner: shared_log.owner.clone(),
        recipients: recipient_ids,
    };
    let plaintext = serde_json::to_vec(&jws_shared_log)
        .map_err(|e| Error::CryptoFailure(e.to_string()))?;
    jose::seal(&plaintext, &protected, &keyed_receivers)
}

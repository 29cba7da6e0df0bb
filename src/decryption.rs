//! Opening of received tokens: the verification state machine.
//!
//! A token is only handed back to the caller once both inner signatures
//! verify against resolved principals and the cleartext routing metadata
//! matches the signed claims. Every step either advances or fails the call
//! with the error naming what broke; no partial result ever escapes.

use log::debug;

use crate::jose::{self, FlattenedJws, JweEnvelope, JweProtected};
use crate::logs::{AccessLog, SharedLog, SignedLog};
use crate::user::{AuthenticatedUser, UserResolver};
use crate::{Error, Result};

/// Decrypts `token` for `receiver` and verifies it end to end:
/// AEAD-decrypt, verify the SharedLog signature of its claimed creator,
/// verify the AccessLog signature of its claimed (and authorized) monitor,
/// then enforce the cross-layer invariants between the JWE header and the
/// signed claims.
pub async fn decrypt(
    token: &str,
    receiver: &AuthenticatedUser,
    resolver: &dyn UserResolver,
) -> Result<SignedLog> {
    let envelope = JweEnvelope::parse(token)?;
    let (plaintext, protected_b64) = jose::open(&envelope, &receiver.decryption_key)?;

    let jws_shared_log: FlattenedJws = serde_json::from_slice(&plaintext)
        .map_err(|e| Error::MalformedSharedLog(e.to_string()))?;
    let payload = jws_shared_log
        .payload_bytes()
        .map_err(|_| Error::MalformedSharedLog("payload is not base64url".into()))?;
    let shared_log = SharedLog::from_bytes(&payload)?;

    debug!(
        "verifying SharedLog {} created by {}",
        shared_log.id, shared_log.creator
    );
    let creator = resolver.resolve(&shared_log.creator).await?;
    match jws_shared_log.verify(&creator.verification_certificate.to_sec1_bytes()) {
        Ok(true) => {}
        _ => return Err(Error::SharedLogSignatureInvalid),
    }

    let jws_access_log = shared_log.log.clone();
    let payload = jws_access_log
        .payload_bytes()
        .map_err(|_| Error::MalformedAccessLog("payload is not base64url".into()))?;
    let access_log = AccessLog::from_bytes(&payload)?;

    debug!(
        "verifying AccessLog {} monitored by {}",
        access_log.id, access_log.monitor
    );
    let monitor = resolver.resolve(&access_log.monitor).await?;
    if !monitor.is_monitor {
        return Err(Error::UnauthorizedMonitor(monitor.id));
    }
    match jws_access_log.verify(&monitor.verification_certificate.to_sec1_bytes()) {
        Ok(true) => {}
        _ => return Err(Error::AccessLogSignatureInvalid),
    }

    enforce_binding(&shared_log, &access_log, &receiver.id, protected_b64)?;

    SignedLog::new(jws_access_log)
}

/// Cross-layer invariants between the AEAD-authenticated header and the
/// signed claims. The recipient comparison is order-sensitive on purpose:
/// sibling implementations compare the serialized sequences.
fn enforce_binding(
    shared_log: &SharedLog,
    access_log: &AccessLog,
    receiver_id: &str,
    protected_b64: Option<String>,
) -> Result<()> {
    let protected_b64 =
        protected_b64.ok_or_else(|| Error::MalformedData("missing protected JWE header".into()))?;
    let header_json = base64_url::decode(&protected_b64)
        .map_err(|e| Error::MalformedJwe(e.to_string()))?;
    let protected: JweProtected =
        serde_json::from_slice(&header_json).map_err(|e| Error::MalformedJwe(e.to_string()))?;

    if shared_log.recipients != protected.recipients {
        return Err(Error::MalformedData(
            "recipients of the SharedLog and the JWE header do not match".into(),
        ));
    }
    if !shared_log.recipients.iter().any(|r| r == receiver_id) {
        return Err(Error::MalformedData(
            "decrypting user is not among the recipients".into(),
        ));
    }
    if access_log.owner != protected.owner {
        return Err(Error::MalformedData(
            "owner of the AccessLog and the JWE header do not match".into(),
        ));
    }
    if shared_log.creator != access_log.owner && shared_log.creator != access_log.monitor {
        return Err(Error::MalformedData(
            "creator of the SharedLog is neither owner nor monitor of the AccessLog".into(),
        ));
    }
    if shared_log.creator == access_log.monitor
        && shared_log.recipients != [access_log.owner.clone()]
    {
        return Err(Error::MalformedData(
            "monitors may only share an AccessLog with its owner".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod crafted_token_tests {
    use uuid::Uuid;

    use super::*;
    use crate::jose::{JweProtected, A256GCM};
    use crate::logs::SharedHeader;
    use crate::user::{InMemoryResolver, RemoteUser};

    /// Seals `shared_log` exactly like the encryption service, except that
    /// the protected header and the wrap targets are chosen by the test.
    fn craft_token(
        sender: &AuthenticatedUser,
        shared_log: &SharedLog,
        header_recipients: Vec<String>,
        wrap_for: &[&AuthenticatedUser],
    ) -> Result<String> {
        let signing_key = sender.signing_key.to_bytes();
        let jws_shared_log = FlattenedJws::sign(shared_log, signing_key.as_slice())?;
        let shared_header = SharedHeader {
            id: shared_log.id.clone(),
            owner: shared_log.owner.clone(),
            recipients: header_recipients.clone(),
        };
        let protected = JweProtected {
            enc: A256GCM.into(),
            shared_header: FlattenedJws::sign(&shared_header, signing_key.as_slice())?,
            owner: shared_log.owner.clone(),
            recipients: header_recipients,
        };
        let plaintext = serde_json::to_vec(&jws_shared_log).unwrap();
        let keys: Vec<_> = wrap_for
            .iter()
            .map(|user| (user.id.clone(), user.encryption_certificate))
            .collect();
        jose::seal(&plaintext, &protected, &keys)
    }

    fn resolver_for(users: &[&AuthenticatedUser]) -> InMemoryResolver {
        let mut resolver = InMemoryResolver::new();
        for user in users {
            resolver.insert(RemoteUser::from(*user));
        }
        resolver
    }

    #[tokio::test]
    async fn rejects_receiver_missing_from_recipient_list_test() -> Result<()> {
        // Arrange: key is wrapped for `receiver`, yet both the signed
        // SharedLog and the header only name `other`.
        let monitor = AuthenticatedUser::generate()?.as_monitor();
        let receiver = AuthenticatedUser::generate()?;
        let other = AuthenticatedUser::generate()?;
        let log = AccessLog::new(&monitor.id, &other.id, "tool", "audit", "direct", vec![]);
        let signed = monitor.sign_access_log(&log)?;
        let shared_log = SharedLog {
            log: signed.jws().clone(),
            creator: monitor.id.clone(),
            owner: other.id.clone(),
            recipients: vec![other.id.clone()],
            id: Uuid::new_v4().to_string(),
        };
        let token = craft_token(
            &monitor,
            &shared_log,
            vec![other.id.clone()],
            &[&receiver],
        )?;
        // Act
        let result = decrypt(&token, &receiver, &resolver_for(&[&monitor, &receiver, &other])).await;
        // Assert
        match result {
            Err(Error::MalformedData(message)) => {
                assert!(message.contains("not among the recipients"))
            }
            other => panic!("expected MalformedData, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejects_permuted_header_recipients_test() -> Result<()> {
        // Arrange: same recipient set, different order in the header than
        // in the signed SharedLog.
        let monitor = AuthenticatedUser::generate()?.as_monitor();
        let owner = AuthenticatedUser::generate()?;
        let receiver = AuthenticatedUser::generate()?;
        let log = AccessLog::new(&monitor.id, &owner.id, "tool", "audit", "direct", vec![]);
        let signed = monitor.sign_access_log(&log)?;
        let shared_log = SharedLog {
            log: signed.jws().clone(),
            creator: owner.id.clone(),
            owner: owner.id.clone(),
            recipients: vec![owner.id.clone(), receiver.id.clone()],
            id: Uuid::new_v4().to_string(),
        };
        let token = craft_token(
            &owner,
            &shared_log,
            vec![receiver.id.clone(), owner.id.clone()],
            &[&owner, &receiver],
        )?;
        // Act
        let result = decrypt(&token, &receiver, &resolver_for(&[&monitor, &owner, &receiver])).await;
        // Assert
        match result {
            Err(Error::MalformedData(message)) => assert!(message.contains("do not match")),
            other => panic!("expected MalformedData, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejects_header_owner_mismatch_test() -> Result<()> {
        // Arrange: header claims a different owner than the verified log.
        let monitor = AuthenticatedUser::generate()?.as_monitor();
        let owner = AuthenticatedUser::generate()?;
        let log = AccessLog::new(&monitor.id, &owner.id, "tool", "audit", "direct", vec![]);
        let signed = monitor.sign_access_log(&log)?;
        let shared_log = SharedLog {
            log: signed.jws().clone(),
            creator: owner.id.clone(),
            owner: "somebody-else".to_string(),
            recipients: vec![owner.id.clone()],
            id: Uuid::new_v4().to_string(),
        };
        let token = craft_token(&owner, &shared_log, vec![owner.id.clone()], &[&owner])?;
        // Act
        let result = decrypt(&token, &owner, &resolver_for(&[&monitor, &owner])).await;
        // Assert
        match result {
            Err(Error::MalformedData(message)) => {
                assert!(message.contains("owner of the AccessLog"))
            }
            other => panic!("expected MalformedData, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }
}

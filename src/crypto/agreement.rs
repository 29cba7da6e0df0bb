use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{ecdh, EncodedPoint, FieldBytes, PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// JWA name of the per-recipient key management algorithm.
pub const ECDH_ES_A256KW: &str = "ECDH-ES+A256KW";

const KW_BLOCK: usize = 8;

/// Ephemeral P-256 public key as embedded in a recipient header (JWK).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EphemeralPublicKey {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl EphemeralPublicKey {
    fn from_public_key(key: &PublicKey) -> Result<Self> {
        let point = key.to_encoded_point(false);
        let (x, y) = match (point.x(), point.y()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(Error::CryptoFailure("ephemeral key has no coordinates".into())),
        };
        Ok(EphemeralPublicKey {
            kty: "EC".into(),
            crv: "P-256".into(),
            x: base64_url::encode(x),
            y: base64_url::encode(y),
        })
    }

    fn to_public_key(&self) -> Result<PublicKey> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(Error::MalformedJwe(format!(
                "unsupported ephemeral key type {}/{}",
                self.kty, self.crv
            )));
        }
        let x = decode_coordinate(&self.x)?;
        let y = decode_coordinate(&self.y)?;
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&x),
            FieldBytes::from_slice(&y),
            false,
        );
        Option::from(PublicKey::from_encoded_point(&point))
            .ok_or_else(|| Error::MalformedJwe("ephemeral key is not a point on P-256".into()))
    }
}

fn decode_coordinate(value: &str) -> Result<Vec<u8>> {
    let bytes = base64_url::decode(value)
        .map_err(|_| Error::MalformedJwe("ephemeral key coordinate is not base64url".into()))?;
    if bytes.len() != 32 {
        return Err(Error::MalformedJwe("ephemeral key coordinate must be 32 bytes".into()));
    }
    Ok(bytes)
}

/// Concat KDF of RFC 7518 §4.6.2 with SHA-256.
///
/// A single digest round covers key sizes up to 256 bit, which is all this
/// protocol ever derives. `apu`/`apv` are absent on the wire and therefore
/// contribute empty-length fields.
fn concat_kdf(shared_secret: &[u8], algorithm: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(shared_secret);
    hasher.update((algorithm.len() as u32).to_be_bytes());
    hasher.update(algorithm.as_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(256u32.to_be_bytes());
    hasher.finalize().into()
}

/// Wraps `content_key` for one receiver: fresh ephemeral-static ECDH over
/// P-256, Concat KDF, AES-256 key wrap. Returns the wrapped key and the
/// ephemeral public key to publish in the recipient header.
pub fn wrap_content_key(
    content_key: &[u8],
    receiver_key: &PublicKey,
) -> Result<(Vec<u8>, EphemeralPublicKey)> {
    let ephemeral = ecdh::EphemeralSecret::random(&mut OsRng);
    let epk = EphemeralPublicKey::from_public_key(&ephemeral.public_key())?;
    let shared = ephemeral.diffie_hellman(receiver_key);
    let kek = aes_kw::KekAes256::from(concat_kdf(
        shared.raw_secret_bytes().as_slice(),
        ECDH_ES_A256KW,
    ));
    let mut wrapped = vec![0u8; content_key.len() + KW_BLOCK];
    kek.wrap(content_key, &mut wrapped)
        .map_err(|e| Error::CryptoFailure(format!("key wrap failed: {}", e)))?;
    Ok((wrapped, epk))
}

/// Recovers the content key of one recipient entry, failing when the
/// receiver's key does not match the wrap.
pub fn unwrap_content_key(
    wrapped: &[u8],
    epk: &EphemeralPublicKey,
    receiver_secret: &SecretKey,
) -> Result<Vec<u8>> {
    if wrapped.len() < 2 * KW_BLOCK || wrapped.len() % KW_BLOCK != 0 {
        return Err(Error::DecryptionFailed);
    }
    let public = epk.to_public_key()?;
    let shared = ecdh::diffie_hellman(receiver_secret.to_nonzero_scalar(), public.as_affine());
    let kek = aes_kw::KekAes256::from(concat_kdf(
        shared.raw_secret_bytes().as_slice(),
        ECDH_ES_A256KW,
    ));
    let mut content_key = vec![0u8; wrapped.len() - KW_BLOCK];
    kek.unwrap(wrapped, &mut content_key)
        .map_err(|_| Error::DecryptionFailed)?;
    Ok(content_key)
}

#[cfg(test)]
mod agreement_tests {
    use super::*;

    #[test]
    fn wrap_unwrap_roundtrip_test() -> Result<()> {
        // Arrange
        let receiver = SecretKey::random(&mut OsRng);
        let content_key = [7u8; 32];
        // Act
        let (wrapped, epk) = wrap_content_key(&content_key, &receiver.public_key())?;
        let unwrapped = unwrap_content_key(&wrapped, &epk, &receiver)?;
        let foreign = unwrap_content_key(&wrapped, &epk, &SecretKey::random(&mut OsRng));
        // Assert
        assert_eq!(unwrapped, content_key.to_vec());
        assert_eq!(wrapped.len(), 40);
        assert!(foreign.is_err());
        Ok(())
    }

    #[test]
    fn ephemeral_key_is_a_p256_jwk_test() -> Result<()> {
        let receiver = SecretKey::random(&mut OsRng);
        let (_, epk) = wrap_content_key(&[0u8; 32], &receiver.public_key())?;
        assert_eq!(epk.kty, "EC");
        assert_eq!(epk.crv, "P-256");
        assert_eq!(base64_url::decode(&epk.x).unwrap().len(), 32);
        assert_eq!(base64_url::decode(&epk.y).unwrap().len(), 32);
        Ok(())
    }

    #[test]
    fn tampered_wrap_is_rejected_test() -> Result<()> {
        let receiver = SecretKey::random(&mut OsRng);
        let (mut wrapped, epk) = wrap_content_key(&[3u8; 32], &receiver.public_key())?;
        wrapped[0] ^= 1;
        assert!(unwrap_content_key(&wrapped, &epk, &receiver).is_err());
        Ok(())
    }
}

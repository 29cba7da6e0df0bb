//! Typed JOSE envelopes as they appear on the wire.

mod jwe;
mod jws;

pub use jwe::{JweEnvelope, JweProtected, JweRecipient, RecipientHeader, A256GCM};
pub use jws::FlattenedJws;

pub(crate) use jwe::{open, seal};

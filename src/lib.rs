//! End-to-end encrypted log sharing for the inverse-transparency
//! toolchain.
//!
//! A monitor records that a tool accessed a data owner's personal data,
//! signs the record and shares it confidentially with the owner; the owner
//! may later re-share it with further receivers. A token nests three JOSE
//! structures: a signed [`AccessLog`] (JWS) inside a signed
//! [`logs::SharedLog`] (JWS) inside a multi-recipient JWE whose protected
//! header repeats the recipient list, so the routing metadata is covered
//! by the AEAD tag and cross-checked against the signed claims on every
//! decryption.
//!
//! Tokens interoperate with the sibling implementations in Go, Python and
//! JavaScript, including their flattened serialization of single-recipient
//! tokens.
//!
//! ```
//! use rs_it_crypto::{AccessLog, AuthenticatedUser, InMemoryResolver, RemoteUser};
//!
//! # fn main() -> rs_it_crypto::Result<()> {
//! #     tokio::runtime::Builder::new_current_thread()
//! #         .build()
//! #         .unwrap()
//! #         .block_on(demo())
//! # }
//! # async fn demo() -> rs_it_crypto::Result<()> {
//! let monitor = AuthenticatedUser::generate()?.as_monitor();
//! let owner = AuthenticatedUser::generate()?;
//!
//! let log = AccessLog::new(
//!     &monitor.id,
//!     &owner.id,
//!     "cloud-dashboard",
//!     "support ticket 4711",
//!     "direct",
//!     vec!["email".into()],
//! );
//! let signed = monitor.sign_access_log(&log)?;
//! let token = monitor.encrypt_log(&signed, &[RemoteUser::from(&owner)]).await?;
//!
//! let mut resolver = InMemoryResolver::new();
//! resolver.insert(RemoteUser::from(&monitor));
//! resolver.insert(RemoteUser::from(&owner));
//!
//! let received = owner.decrypt_log(&token, &resolver).await?;
//! assert_eq!(received.extract().justification, "support ticket 4711");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod decryption;
pub mod encryption;
mod error;
mod it_crypto;
pub mod jose;
pub mod logs;
pub mod user;

pub use error::{Error, Result};
pub use it_crypto::ItCrypto;
pub use logs::{AccessLog, SharedHeader, SharedLog, SignedLog};
pub use user::{AuthenticatedUser, InMemoryResolver, RemoteUser, UserResolver};

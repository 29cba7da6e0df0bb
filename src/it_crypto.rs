//! Stateful convenience facade mirroring the sibling libraries.

use crate::logs::{AccessLog, SignedLog};
use crate::user::{AuthenticatedUser, RemoteUser, UserResolver};
use crate::{Error, Result};

/// Entry point for applications: log a user in once, then sign, share and
/// decrypt without threading the user through every call.
pub struct ItCrypto {
    pub user: Option<AuthenticatedUser>,
}

impl ItCrypto {
    pub fn new() -> Self {
        match env_logger::try_init() {
            Ok(_) | Err(_) => (),
        }
        ItCrypto { user: None }
    }

    /// Logs a user in from PEM key material.
    pub fn login(
        &mut self,
        id: &str,
        verification_certificate: &str,
        encryption_certificate: &str,
        signing_key: &str,
        decryption_key: &str,
    ) -> Result<()> {
        self.user = Some(AuthenticatedUser::import(
            id,
            verification_certificate,
            encryption_certificate,
            signing_key,
            decryption_key,
        )?);
        Ok(())
    }

    /// Logs an already imported user in.
    pub fn login_user(&mut self, user: AuthenticatedUser) {
        self.user = Some(user);
    }

    fn user(&self) -> Result<&AuthenticatedUser> {
        self.user.as_ref().ok_or(Error::NotAuthenticated)
    }

    pub fn sign_access_log(&self, log: &AccessLog) -> Result<SignedLog> {
        self.user()?.sign_access_log(log)
    }

    pub async fn encrypt_log(&self, log: &SignedLog, receivers: &[RemoteUser]) -> Result<String> {
        self.user()?.encrypt_log(log, receivers).await
    }

    pub async fn decrypt_log(
        &self,
        token: &str,
        resolver: &dyn UserResolver,
    ) -> Result<SignedLog> {
        self.user()?.decrypt_log(token, resolver).await
    }
}

impl Default for ItCrypto {
    fn default() -> Self {
        Self::new()
    }
}

//! In-memory owner of the signed-in user, mirrored to durable storage.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::dto::{Credentials, ProfileUpdate};
use crate::domain::entities::{AuthToken, User};
use crate::domain::errors::SessionError;
use crate::domain::ports::SessionStoragePort;

/// Storage key of the persisted user record.
pub const SESSION_KEY: &str = "session-user";

/// Owns the current [`User`].
///
/// Every mutation updates memory first, publishes the new user to
/// subscribers, then writes the full record before returning. A returned
/// error therefore only means the record on disk is stale.
pub struct SessionStore {
    user: User,
    storage: Arc<dyn SessionStoragePort>,
    tx: watch::Sender<User>,
}

impl SessionStore {
    /// Restores the persisted user, falling back to the anonymous default.
    ///
    /// Missing, unreadable or malformed records are never reported to the
    /// caller; they only show up in the log.
    #[must_use]
    pub fn load(storage: Arc<dyn SessionStoragePort>) -> Self {
        let user = match storage.read(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!(
                        name = %user.display_name(),
                        authenticated = user.is_authenticated(),
                        "Restored persisted session"
                    );
                    user
                }
                Err(e) => {
                    warn!(error = %e, "Persisted session is malformed, starting signed out");
                    User::anonymous()
                }
            },
            Ok(None) => {
                debug!("No persisted session");
                User::anonymous()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting signed out");
                User::anonymous()
            }
        };

        let (tx, _) = watch::channel(user.clone());
        Self { user, storage, tx }
    }

    /// The current player.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// The held token, if signed in.
    #[must_use]
    pub const fn token(&self) -> Option<&AuthToken> {
        self.user.token()
    }

    /// Whether a token is held.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.user.is_authenticated()
    }

    /// Watches the current player.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<User> {
        self.tx.subscribe()
    }

    /// Merges `credentials` into the current user and stores the token.
    ///
    /// # Errors
    /// Returns error if the record cannot be persisted.
    pub fn login(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        let Credentials {
            token,
            name,
            avatar,
            stats,
        } = credentials;

        if let Some(name) = name {
            self.user.set_name(name);
        }
        if let Some(avatar) = avatar {
            self.user.set_avatar(avatar);
        }
        if let Some(stats) = stats {
            self.user.set_stats(stats);
        }

        info!(name = %self.user.display_name(), token = %token, "Signed in");
        self.user.set_token(token);

        self.publish();
        self.persist()
    }

    /// Resets to the anonymous user and deletes the persisted record.
    ///
    /// Safe to call when already signed out.
    ///
    /// # Errors
    /// Returns error if the persisted record cannot be removed.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if self.user != User::anonymous() {
            info!(name = %self.user.display_name(), "Signed out");
            self.user = User::anonymous();
            self.publish();
        }

        self.storage.remove(SESSION_KEY)?;
        Ok(())
    }

    /// Applies profile changes. The token is never touched.
    ///
    /// # Errors
    /// Returns error if the record cannot be persisted.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), SessionError> {
        let ProfileUpdate {
            name,
            avatar,
            stats,
        } = update;

        if let Some(name) = name {
            self.user.set_name(name);
        }
        if let Some(avatar) = avatar {
            self.user.set_avatar(avatar);
        }
        if let Some(stats) = stats {
            self.user.set_stats(stats);
        }

        debug!(name = %self.user.display_name(), "Profile updated");
        self.publish();
        self.persist()
    }

    /// Drops a token the server rejected.
    ///
    /// Profile fields stay in memory, but the persisted record is deleted so
    /// the rejected session is not restored on the next start.
    ///
    /// # Errors
    /// Returns error if the persisted record cannot be removed.
    pub fn revoke_token(&mut self) -> Result<(), SessionError> {
        if self.user.is_authenticated() {
            warn!(name = %self.user.display_name(), "Token revoked");
            self.user.clear_token();
            self.publish();
        }

        self.storage.remove(SESSION_KEY)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), SessionError> {
        let record = serde_json::to_string(&self.user)?;
        self.storage.write(SESSION_KEY, &record)?;
        Ok(())
    }

    fn publish(&self) {
        self.tx.send_replace(self.user.clone());
    }
}

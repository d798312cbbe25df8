//! Session input DTOs.

use crate::domain::entities::{AuthToken, UserStats};

/// Login data: a token plus whatever profile fields the server returned.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access token issued by the server.
    pub token: AuthToken,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Win/loss record.
    pub stats: Option<UserStats>,
}

impl Credentials {
    /// Creates credentials carrying only a token.
    #[must_use]
    pub const fn new(token: AuthToken) -> Self {
        Self {
            token,
            name: None,
            avatar: None,
            stats: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Sets the win/loss record.
    #[must_use]
    pub const fn with_stats(mut self, stats: UserStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

/// Partial profile change. Carries no token, so it cannot sign anyone in or out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New avatar URL.
    pub avatar: Option<String>,
    /// Replacement win/loss record.
    pub stats: Option<UserStats>,
}

impl ProfileUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Sets the win/loss record.
    #[must_use]
    pub const fn with_stats(mut self, stats: UserStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Returns whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none() && self.stats.is_none()
    }
}

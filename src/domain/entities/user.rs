//! Player profile entity.

use serde::{Deserialize, Serialize};

use super::AuthToken;

/// Avatar shown until the server or the player supplies one.
pub const DEFAULT_AVATAR: &str = "https://i.imgur.com/default-avatar.png";

/// Win/loss record as reported by the game server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Games won.
    #[serde(default)]
    pub wins: u32,
    /// Games lost.
    #[serde(default)]
    pub losses: u32,
    /// Games played.
    #[serde(default)]
    pub total_games: u32,
}

impl UserStats {
    /// Creates a record.
    #[must_use]
    pub const fn new(wins: u32, losses: u32, total_games: u32) -> Self {
        Self {
            wins,
            losses,
            total_games,
        }
    }
}

/// The signed-in player, or the anonymous default when no token is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    name: String,
    #[serde(default = "default_avatar")]
    avatar: String,
    #[serde(default, with = "crate::domain::serde_utils::optional_token")]
    token: Option<AuthToken>,
    #[serde(default)]
    stats: UserStats,
}

fn default_avatar() -> String {
    DEFAULT_AVATAR.to_string()
}

impl User {
    /// Returns the signed-out user: no name, default avatar, zero stats.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            avatar: default_avatar(),
            token: None,
            stats: UserStats::default(),
        }
    }

    /// Display name as stored, possibly empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Avatar URL.
    #[must_use]
    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    /// The held token.
    #[must_use]
    pub const fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    /// Win/loss record.
    #[must_use]
    pub const fn stats(&self) -> UserStats {
        self.stats
    }

    /// A user is authenticated exactly when a token is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Name to show, `guest` when none is set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "guest"
        } else {
            &self.name
        }
    }

    /// Replaces the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replaces the avatar URL.
    pub fn set_avatar(&mut self, avatar: impl Into<String>) {
        self.avatar = avatar.into();
    }

    /// Replaces the win/loss record.
    pub const fn set_stats(&mut self, stats: UserStats) {
        self.stats = stats;
    }

    /// Stores a token.
    pub fn set_token(&mut self, token: AuthToken) {
        self.token = Some(token);
    }

    /// Drops the token; the profile is kept.
    pub fn clear_token(&mut self) {
        self.token = None;
    }
}

impl Default for User {
    fn default() -> Self {
        Self::anonymous()
    }
}

//! Authentication gate for navigation.
//!
//! Pure functions only: callers re-run [`decide`] on every navigation and
//! every token change.

/// Sign-in screen path.
pub const LOGIN_PATH: &str = "/auth";
/// Lobby path, the landing page for signed-in players.
pub const HOME_PATH: &str = "/";

/// How a path is treated by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Lobby, game rooms, profile: signed-in players only.
    Protected,
    /// The sign-in screen: signed-out players only.
    Login,
    /// Everything else, e.g. the not-found page.
    Public,
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Show the requested path.
    Allow,
    /// Navigate to this path instead.
    RedirectTo(&'static str),
}

impl AccessDecision {
    /// Whether the requested path may be shown.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where to navigate instead, if anywhere.
    #[must_use]
    pub const fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectTo(path) => Some(*path),
        }
    }
}

/// Decides whether `path` may be shown given the current token presence.
#[must_use]
pub fn decide(has_token: bool, path: &str) -> AccessDecision {
    match (classify(path), has_token) {
        (RouteKind::Protected, false) => AccessDecision::RedirectTo(LOGIN_PATH),
        (RouteKind::Login, true) => AccessDecision::RedirectTo(HOME_PATH),
        _ => AccessDecision::Allow,
    }
}

/// Classifies `path`, ignoring ASCII case, query string, fragment and
/// trailing slashes.
#[must_use]
pub fn classify(path: &str) -> RouteKind {
    let path = normalize(path);
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let is = |segment: &str, name: &str| segment.eq_ignore_ascii_case(name);

    match (segments.next(), segments.next(), segments.next()) {
        (None, _, _) => RouteKind::Protected,
        (Some(first), None, _) if is(first, "profile") => RouteKind::Protected,
        (Some(first), Some(_), None) if is(first, "room") => RouteKind::Protected,
        (Some(first), None, _) if is(first, "auth") => RouteKind::Login,
        _ => RouteKind::Public,
    }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = path[..end].trim();
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() { HOME_PATH } else { trimmed }
}

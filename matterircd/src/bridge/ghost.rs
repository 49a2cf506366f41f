//! Ghost nick construction and lazy ghost registration.
//!
//! The multi-team suffix is carried but always `None` on the single-team
//! path this bridge runs today — see the "Open Questions" note in
//! DESIGN.md for what happens when it's eventually turned on.

use chat_client::model::UserId;

use crate::irc::registry::{Registry, UserEntry};

pub fn ghost_nick(username: &str, team_suffix: Option<&str>) -> String {
    match team_suffix {
        Some(suffix) => format!("{username}-{suffix}"),
        None => username.to_string(),
    }
}

/// Strips a known team suffix from a nick before it's used in any Chat
/// API call. A no-op when the suffix feature is off (the only path this
/// bridge exercises), or when the nick doesn't carry the given suffix.
pub fn strip_team_suffix<'a>(nick: &'a str, team_suffix: Option<&str>) -> &'a str {
    match team_suffix {
        Some(suffix) => {
            let marker = format!("-{suffix}");
            nick.strip_suffix(marker.as_str()).unwrap_or(nick)
        }
        None => nick,
    }
}

/// Returns the existing ghost for `user_id` if one is registered,
/// otherwise creates and registers it. Never creates a ghost for the
/// self user (invariant: the real user never appears as a ghost of
/// itself).
pub fn ensure_ghost(
    registry: &Registry,
    host: &str,
    user_id: &UserId,
    username: &str,
    team_suffix: Option<&str>,
) -> UserEntry {
    let nick = ghost_nick(username, team_suffix);
    if let Some(existing) = registry.get_user(&nick) {
        return existing;
    }
    let entry = UserEntry {
        nick: nick.clone(),
        user: user_id.clone(),
        real: "ghost".to_string(),
        host: host.to_string(),
        is_ghost: true,
    };
    registry.add_user(entry.clone());
    entry
}

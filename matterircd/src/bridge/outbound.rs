//! Outbound Command Handler: translates IRC-originated commands into
//! Chat calls.
//!
//! `JOIN` of a channel the bridge hasn't materialized yet runs the same
//! per-channel slice the initial materialization does, so a late join
//! gets the same backfill treatment as a channel seen at login.

use chat_client::model::UserId;

use crate::bridge::directory::ChannelInfo;
use crate::bridge::error::{BridgeError, Result};
use crate::bridge::ghost;
use crate::bridge::materializer::materialize_channel;
use crate::bridge::session::Session;
use crate::bridge::{irc_channel_name, resolve_channel_id};

/// `name` is the bare Chat channel name (without the leading `#`).
pub async fn handle_join(session: &Session, name: &str) -> Result<()> {
    let client = session.client();
    let channel_id = resolve_channel_id(&session.directory, &client, name)
        .await
        .ok_or_else(|| BridgeError::NotFound(format!("no such channel: {name}")))?;

    client.join_channel(&channel_id).await?;
    session.directory.refresh_channels(&client).await?;

    let last_viewed_at = session.directory.last_viewed_at(&channel_id);
    let channel = ChannelInfo {
        id: channel_id,
        name: name.to_string(),
        last_viewed_at,
    };
    materialize_channel(session, &channel).await
}

/// `irc_channel` carries the leading `#`; Chat's own channel names never
/// do.
pub async fn handle_privmsg_channel(session: &Session, irc_channel: &str, text: &str) -> Result<()> {
    let name = irc_channel.strip_prefix('#').unwrap_or(irc_channel);
    let client = session.client();
    let channel_id = resolve_channel_id(&session.directory, &client, name)
        .await
        .ok_or_else(|| BridgeError::NotFound(format!("no such channel: {name}")))?;
    client.create_post(&channel_id, text).await?;
    let me = session.me();
    let irc_name = irc_channel_name(name);
    session.registry.join(&irc_name, &me.name, &me.id, client.host());
    Ok(())
}

/// The DM pseudo-channel name for a pair of Chat user ids: lexicographic
/// `min__max`, independent of argument order.
pub fn dm_channel_name(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}__{b}")
    } else {
        format!("{b}__{a}")
    }
}

/// A `PRIVMSG` to a nick: resolve the ghost back to a Chat user id, then
/// either post into the DM channel the Directory Cache already knows
/// about, or create one through Chat and refresh before posting. The DM
/// channel is created lazily on first message, matching the "DM
/// pseudo-channels are never pre-created" rule.
pub async fn handle_privmsg_user(session: &Session, target_nick: &str, text: &str) -> Result<()> {
    let target_id = resolve_target_user_id(session, target_nick).await?;
    let me = session.me();
    let name = dm_channel_name(&me.id, &target_id);
    let client = session.client();

    let channel_id = match session.directory.lookup_channel_id(&name) {
        Some(id) => id,
        None => {
            client.create_direct_channel(&target_id).await?;
            session.directory.refresh_channels(&client).await?;
            session
                .directory
                .lookup_channel_id(&name)
                .ok_or_else(|| BridgeError::Internal(format!("direct channel {name} missing after create+refresh")))?
        }
    };
    client.create_post(&channel_id, text).await?;
    Ok(())
}

/// Resolves an IRC nick to a Chat user id. A registered ghost already
/// carries the id in its `user` field (the canonical lookup); otherwise
/// the nick is treated as a bare Chat username, stripping a team suffix
/// first (a no-op today — multi-team suffixing is disabled — but this is
/// where that stripping must happen once it's turned on, since the
/// suffix never reaches Chat's own username).
async fn resolve_target_user_id(session: &Session, target_nick: &str) -> Result<UserId> {
    if let Some(entry) = session.registry.get_user(target_nick) {
        if entry.is_ghost {
            return Ok(entry.user);
        }
    }
    let username = ghost::strip_team_suffix(target_nick, None);
    if let Some(id) = session.directory.lookup_user_id(username) {
        return Ok(id);
    }
    let client = session.client();
    session.directory.refresh_users(&client).await?;
    session
        .directory
        .lookup_user_id(username)
        .ok_or_else(|| BridgeError::NotFound(format!("no such user: {target_nick}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_channel_name_is_order_independent() {
        assert_eq!(dm_channel_name("U1", "U2"), "U1__U2");
        assert_eq!(dm_channel_name("U2", "U1"), "U1__U2");
    }

    #[test]
    fn dm_channel_name_is_lexicographic_not_numeric() {
        assert_eq!(dm_channel_name("alice-id", "bob-id"), "alice-id__bob-id");
        assert_eq!(dm_channel_name("bob-id", "alice-id"), "alice-id__bob-id");
    }
}

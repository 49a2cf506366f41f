//! Namespace Materializer: makes the IRC view consistent with the Chat
//! view after login, and (via [`materialize_channel`]) re-syncs a single
//! channel on demand — reused by an outbound `JOIN` and by reconnection.
//!
//! Channel kickoffs are throttled to one per second to be gentle on the
//! upstream API; the fetch-and-join work for channels already kicked off
//! runs concurrently. Live events are never throttled — the throttle
//! belongs to this module only.

use std::time::Duration;

use crate::bridge::directory::{is_dm_channel_name, ChannelInfo};
use crate::bridge::ghost;
use crate::bridge::session::Session;
use crate::bridge::{irc_channel_name, resolve_username};

use super::error::Result;

/// Full materialization: refresh the directory, join+populate every
/// non-DM joined channel (with backfill), then pre-register a
/// disconnected ghost for every other known user so nick completion for
/// DM targets works immediately.
pub async fn materialize_all(session: &Session) -> Result<()> {
    let client = session.client();
    let me = session.me();

    session.directory.refresh_channels(&client).await?;
    session.directory.refresh_users(&client).await?;

    let channels = channels_to_materialize(session.directory.joined_channels());

    let mut throttle = tokio::time::interval(Duration::from_secs(1));
    let mut tasks = Vec::with_capacity(channels.len());
    for channel in channels {
        throttle.tick().await;
        let client = client.clone();
        let me = me.clone();
        let directory = session.directory.clone();
        let registry = session.registry.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = materialize_channel_raw(&client, &me, &directory, &registry, &channel).await {
                tracing::warn!(channel = %channel.name, error = %e, "failed to materialize channel");
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }

    for user_id in session.directory.all_user_ids() {
        let already_ghosted = session.registry.find_ghost_by_chat_id(&user_id).is_some();
        if !needs_disconnected_ghost(&user_id, &me.id, already_ghosted) {
            continue;
        }
        if let Some(username) = session.directory.lookup_username(&user_id) {
            ghost::ensure_ghost(&session.registry, client.host(), &user_id, &username, None);
        }
    }

    Ok(())
}

/// Joined channels `materialize_all` should join+populate: every channel
/// that isn't a DM pseudo-channel.
fn channels_to_materialize(channels: Vec<ChannelInfo>) -> Vec<ChannelInfo> {
    channels.into_iter().filter(|c| !is_dm_channel_name(&c.name)).collect()
}

/// True if `user_id` needs a disconnected ghost pre-registered during the
/// second pass: not self, and not already represented by a ghost from the
/// per-channel pass.
fn needs_disconnected_ghost(user_id: &str, me_id: &str, already_ghosted: bool) -> bool {
    user_id != me_id && !already_ghosted
}

/// The per-channel slice: join self, join/create ghosts for the current
/// membership, backfill posts since the channel's last-viewed marker,
/// then advance that marker. Reused verbatim by an outbound `JOIN` of a
/// channel the bridge hasn't materialized yet, and by reconnection.
pub async fn materialize_channel(session: &Session, channel: &ChannelInfo) -> Result<()> {
    let client = session.client();
    let me = session.me();
    materialize_channel_raw(&client, &me, &session.directory, &session.registry, channel).await
}

async fn materialize_channel_raw(
    client: &chat_client::Client,
    me: &crate::bridge::session::SelfIdentity,
    directory: &crate::bridge::directory::DirectoryCache,
    registry: &crate::irc::registry::Registry,
    channel: &ChannelInfo,
) -> Result<()> {
    let irc_name = irc_channel_name(&channel.name);
    registry.ensure_channel(&irc_name);
    registry.join(&irc_name, &me.name, &me.id, client.host());

    let extra = client.get_channel_extra_info(&channel.id).await?;
    for member in &extra.members {
        if member.id == me.id {
            continue;
        }
        let entry = ghost::ensure_ghost(registry, client.host(), &member.id, &member.username, None);
        registry.join(&irc_name, &entry.nick, &entry.user, &entry.host);
    }

    let posts = client.get_posts_since(&channel.id, channel.last_viewed_at).await?;
    let mut newest_seen = channel.last_viewed_at;
    for post in posts.in_delivery_order() {
        let username = resolve_username(directory, client, &post.user_id)
            .await
            .unwrap_or_else(|| post.user_id.clone());
        for line in post.message.split('\n') {
            registry.channel_spoof(&irc_name, &username, &post.user_id, client.host(), line);
        }
        newest_seen = newest_seen.max(post.create_at);
    }

    if directory.advance_last_viewed(&channel.id, newest_seen).is_some() {
        if let Err(e) = client.update_last_viewed_at(&channel.id).await {
            tracing::warn!(channel = %channel.name, error = %e, "failed to update last-viewed marker");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan(id: &str, name: &str) -> ChannelInfo {
        ChannelInfo {
            id: id.to_string(),
            name: name.to_string(),
            last_viewed_at: 0,
        }
    }

    #[test]
    fn channels_to_materialize_drops_dm_pseudo_channels() {
        let channels = vec![chan("C1", "town-square"), chan("C2", "U1__U2"), chan("C3", "off-topic")];
        let kept: Vec<&str> = channels_to_materialize(channels).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(kept, vec!["C1", "C3"]);
    }

    #[test]
    fn needs_disconnected_ghost_skips_self() {
        assert!(!needs_disconnected_ghost("U1", "U1", false));
    }

    #[test]
    fn needs_disconnected_ghost_skips_already_ghosted_user() {
        assert!(!needs_disconnected_ghost("U2", "U1", true));
    }

    #[test]
    fn needs_disconnected_ghost_true_for_new_remote_user() {
        assert!(needs_disconnected_ghost("U2", "U1", false));
    }
}

//! The bridge engine: everything spec-internal that materializes Chat as
//! an IRC namespace and translates between the two.
//!
//! - [`session`] — credential/session establishment and reconnect
//! - [`directory`] — the Directory Cache
//! - [`ghost`] — ghost nick construction and lazy registration
//! - [`materializer`] — initial namespace materialization and backfill
//! - [`translator`] — the live event-stream read loop
//! - [`outbound`] — IRC-originated commands translated to Chat calls
//! - [`servicebot`] — the `mattermost` service user's LOGIN command

pub mod directory;
pub mod error;
pub mod ghost;
pub mod materializer;
pub mod outbound;
pub mod servicebot;
pub mod session;
pub mod translator;

use chat_client::Client;

use crate::bridge::directory::DirectoryCache;

/// Look up a channel name by id, refreshing the channel list once on a
/// miss before giving up. A persistent miss is the caller's to log and
/// drop.
pub async fn resolve_channel_name(
    directory: &DirectoryCache,
    client: &Client,
    channel_id: &str,
) -> Option<String> {
    if let Some(name) = directory.lookup_channel_name(channel_id) {
        return Some(name);
    }
    if directory.refresh_channels(client).await.is_err() {
        return None;
    }
    directory.lookup_channel_name(channel_id)
}

/// Look up a channel id by name, refreshing once on a miss.
pub async fn resolve_channel_id(
    directory: &DirectoryCache,
    client: &Client,
    name: &str,
) -> Option<String> {
    if let Some(id) = directory.lookup_channel_id(name) {
        return Some(id);
    }
    if directory.refresh_channels(client).await.is_err() {
        return None;
    }
    directory.lookup_channel_id(name)
}

/// Look up a username by user id, refreshing the user list once on a
/// miss.
pub async fn resolve_username(
    directory: &DirectoryCache,
    client: &Client,
    user_id: &str,
) -> Option<String> {
    if let Some(name) = directory.lookup_username(user_id) {
        return Some(name);
    }
    if directory.refresh_users(client).await.is_err() {
        return None;
    }
    directory.lookup_username(user_id)
}

pub fn irc_channel_name(chat_channel_name: &str) -> String {
    format!("#{chat_channel_name}")
}

pub use error::{BridgeError, Result as BridgeResult};

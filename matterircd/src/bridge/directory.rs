//! The Directory Cache: a copy-on-replace snapshot of Chat users and
//! channels.
//!
//! Refresh* calls replace whole collections rather than mutating them in
//! place, so a reader never observes a half-updated snapshot — the
//! `parking_lot::RwLock` here guards a plain swap, never fine-grained
//! field mutation.

use std::collections::HashMap;

use chat_client::model::{ChannelId, UserId};
use chat_client::Client;

use crate::bridge::error::{BridgeError, Result};

#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub last_viewed_at: i64,
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, String>,
    joined: Vec<ChannelInfo>,
    other: Vec<ChannelInfo>,
}

#[derive(Default)]
pub struct DirectoryCache {
    inner: parking_lot::RwLock<Inner>,
}

/// A Chat channel name containing `__` is a DM pseudo-channel and must
/// never be exposed as an IRC channel.
pub fn is_dm_channel_name(name: &str) -> bool {
    name.contains("__")
}

impl DirectoryCache {
    pub async fn refresh_users(&self, client: &Client) -> Result<()> {
        let team_id = client
            .team_id
            .clone()
            .ok_or_else(|| BridgeError::Internal("refresh_users before team is known".into()))?;
        let profiles = client.get_profiles(&team_id).await?;
        let mut inner = self.inner.write();
        inner.users = profiles.into_iter().map(|(id, u)| (id, u.username)).collect();
        Ok(())
    }

    pub async fn refresh_channels(&self, client: &Client) -> Result<()> {
        let joined_list = client.get_channels().await?;
        let other_list = client.get_more_channels().await?;
        let joined: Vec<ChannelInfo> = joined_list
            .channels
            .into_iter()
            .map(|c| {
                let last_viewed_at = joined_list
                    .members
                    .get(&c.id)
                    .map(|m| m.last_viewed_at)
                    .unwrap_or(0);
                ChannelInfo {
                    id: c.id,
                    name: c.name,
                    last_viewed_at,
                }
            })
            .collect();
        let other: Vec<ChannelInfo> = other_list
            .channels
            .into_iter()
            .map(|c| ChannelInfo {
                id: c.id,
                name: c.name,
                last_viewed_at: 0,
            })
            .collect();
        let mut inner = self.inner.write();
        inner.joined = joined;
        inner.other = other;
        Ok(())
    }

    pub fn lookup_channel_name(&self, id: &str) -> Option<String> {
        let inner = self.inner.read();
        inner
            .joined
            .iter()
            .chain(inner.other.iter())
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    /// First match wins; a channel present in both lists is treated as
    /// joined.
    pub fn lookup_channel_id(&self, name: &str) -> Option<String> {
        let inner = self.inner.read();
        inner
            .joined
            .iter()
            .chain(inner.other.iter())
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    pub fn lookup_user_id(&self, username: &str) -> Option<UserId> {
        let inner = self.inner.read();
        inner
            .users
            .iter()
            .find(|(_, name)| name.as_str() == username)
            .map(|(id, _)| id.clone())
    }

    pub fn lookup_username(&self, id: &str) -> Option<String> {
        self.inner.read().users.get(id).cloned()
    }

    pub fn joined_channels(&self) -> Vec<ChannelInfo> {
        self.inner.read().joined.clone()
    }

    pub fn all_user_ids(&self) -> Vec<UserId> {
        self.inner.read().users.keys().cloned().collect()
    }

    pub fn last_viewed_at(&self, channel_id: &str) -> i64 {
        self.inner
            .read()
            .joined
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.last_viewed_at)
            .unwrap_or(0)
    }

    /// Advances the local marker to `max(current, at_least)`. Returns the
    /// new value if it moved forward. The marker must never move
    /// backward.
    pub fn advance_last_viewed(&self, channel_id: &str, at_least: i64) -> Option<i64> {
        let mut inner = self.inner.write();
        let entry = inner.joined.iter_mut().find(|c| c.id == channel_id)?;
        if at_least > entry.last_viewed_at {
            entry.last_viewed_at = at_least;
            Some(at_least)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_for_test(&self, users: Vec<(UserId, String)>, joined: Vec<ChannelInfo>, other: Vec<ChannelInfo>) {
        let mut inner = self.inner.write();
        inner.users = users.into_iter().collect();
        inner.joined = joined;
        inner.other = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan(id: &str, name: &str, lva: i64) -> ChannelInfo {
        ChannelInfo {
            id: id.to_string(),
            name: name.to_string(),
            last_viewed_at: lva,
        }
    }

    #[test]
    fn dm_channel_names_are_recognized() {
        assert!(is_dm_channel_name("U1__U2"));
        assert!(!is_dm_channel_name("town-square"));
    }

    #[test]
    fn joined_channel_wins_over_discoverable_with_same_name() {
        let cache = DirectoryCache::default();
        cache.seed_for_test(
            vec![],
            vec![chan("C1", "town-square", 0)],
            vec![chan("C2", "town-square", 0)],
        );
        assert_eq!(cache.lookup_channel_id("town-square"), Some("C1".to_string()));
    }

    #[test]
    fn lookup_falls_back_to_discoverable_channels() {
        let cache = DirectoryCache::default();
        cache.seed_for_test(vec![], vec![], vec![chan("C3", "off-topic", 0)]);
        assert_eq!(cache.lookup_channel_id("off-topic"), Some("C3".to_string()));
        assert_eq!(cache.lookup_channel_name("C3"), Some("off-topic".to_string()));
    }

    #[test]
    fn advance_last_viewed_never_moves_backward() {
        let cache = DirectoryCache::default();
        cache.seed_for_test(vec![], vec![chan("C1", "town-square", 100)], vec![]);
        assert_eq!(cache.advance_last_viewed("C1", 50), None);
        assert_eq!(cache.last_viewed_at("C1"), 100);
        assert_eq!(cache.advance_last_viewed("C1", 150), Some(150));
        assert_eq!(cache.last_viewed_at("C1"), 150);
    }

    #[test]
    fn lookup_user_id_by_username() {
        let cache = DirectoryCache::default();
        cache.seed_for_test(vec![("U2".to_string(), "bob".to_string())], vec![], vec![]);
        assert_eq!(cache.lookup_user_id("bob"), Some("U2".to_string()));
        assert_eq!(cache.lookup_username("U2"), Some("bob".to_string()));
        assert_eq!(cache.lookup_user_id("carol"), None);
    }
}

//! The IRC-visible namespace: users, channels, and membership.
//!
//! Scoped to a single `Session` (one per connected IRC client, each with
//! its own fresh registry on login), so there is no cross-session
//! sharing to worry about. All mutation goes through a single lock;
//! reads and writes from the materializer, translator, and outbound
//! handler are all short, so this is not a contention hot spot.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::irc::codec;

#[derive(Debug, Clone)]
pub struct UserEntry {
    pub nick: String,
    /// For ghosts, this holds the remote ChatUserId: the canonical outbound
    /// lookup from IRC nick back to Chat user id.
    pub user: String,
    pub real: String,
    pub host: String,
    pub is_ghost: bool,
}

#[derive(Default)]
struct ChannelEntry {
    members: HashSet<String>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserEntry>,
    channels: HashMap<String, ChannelEntry>,
}

/// The one real IRC client's line sink, plus the namespace it observes.
pub struct Registry {
    inner: RwLock<Inner>,
    out: mpsc::UnboundedSender<String>,
    real_nick: RwLock<String>,
    server_name: String,
}

impl Registry {
    pub fn new(out: mpsc::UnboundedSender<String>, real_nick: &str, server_name: &str) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            out,
            real_nick: RwLock::new(real_nick.to_string()),
            server_name: server_name.to_string(),
        }
    }

    pub fn real_nick(&self) -> String {
        self.real_nick.read().clone()
    }

    pub fn set_real_nick(&self, nick: &str) {
        *self.real_nick.write() = nick.to_string();
    }

    fn send(&self, line: String) {
        let _ = self.out.send(line);
    }

    pub fn has_user(&self, nick: &str) -> bool {
        self.inner.read().users.contains_key(&nick.to_lowercase())
    }

    pub fn get_user(&self, nick: &str) -> Option<UserEntry> {
        self.inner.read().users.get(&nick.to_lowercase()).cloned()
    }

    /// Look up a ghost by its Chat user id (the `user` field). Used by
    /// outbound DM routing to go from a resolved nick back to confirm the
    /// id, and vice versa from id to nick.
    pub fn find_ghost_by_chat_id(&self, chat_user_id: &str) -> Option<UserEntry> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.is_ghost && u.user == chat_user_id)
            .cloned()
    }

    /// Registers a user (ghost or real) if absent. Returns false if a
    /// user with that nick already existed.
    pub fn add_user(&self, entry: UserEntry) -> bool {
        let key = entry.nick.to_lowercase();
        let mut inner = self.inner.write();
        if inner.users.contains_key(&key) {
            return false;
        }
        inner.users.insert(key, entry);
        true
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.inner.read().channels.contains_key(&name.to_lowercase())
    }

    /// Creates the channel if absent. Idempotent.
    pub fn ensure_channel(&self, name: &str) {
        self.inner
            .write()
            .channels
            .entry(name.to_lowercase())
            .or_default();
    }

    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.inner
            .read()
            .channels
            .get(&channel.to_lowercase())
            .is_some_and(|c| c.members.contains(&nick.to_lowercase()))
    }

    /// Joins `nick` to `channel`, emitting a JOIN line to the real client
    /// if this is a newly-observed membership. No-op (and no line) if
    /// already a member, so reconnection and re-materialization never
    /// duplicate join lines.
    pub fn join(&self, channel: &str, nick: &str, user_field: &str, host: &str) -> bool {
        self.ensure_channel(channel);
        let key = channel.to_lowercase();
        let nick_key = nick.to_lowercase();
        let mut inner = self.inner.write();
        let entry = inner.channels.entry(key).or_default();
        if !entry.members.insert(nick_key) {
            return false;
        }
        drop(inner);
        self.send(codec::format_prefixed(nick, user_field, host, "JOIN", &[], channel));
        true
    }

    pub fn part(&self, channel: &str, nick: &str, user_field: &str, host: &str, reason: &str) -> bool {
        let key = channel.to_lowercase();
        let nick_key = nick.to_lowercase();
        let mut inner = self.inner.write();
        let removed = inner
            .channels
            .get_mut(&key)
            .map(|c| c.members.remove(&nick_key))
            .unwrap_or(false);
        drop(inner);
        if removed {
            self.send(codec::format_prefixed(nick, user_field, host, "PART", &[channel], reason));
        }
        removed
    }

    /// Live delivery: a `PRIVMSG` from `from` to `channel`.
    pub fn channel_message(&self, channel: &str, from: &UserEntry, text: &str) {
        self.send(codec::format_prefixed(&from.nick, &from.user, &from.host, "PRIVMSG", &[channel], text));
    }

    /// Backfill delivery: a `PRIVMSG` as if sent by `from_nick`, which may
    /// not be a currently-registered user.
    pub fn channel_spoof(&self, channel: &str, from_nick: &str, from_user: &str, host: &str, text: &str) {
        self.send(codec::format_prefixed(from_nick, from_user, host, "PRIVMSG", &[channel], text));
    }

    /// A private message to the real user from any named sender (ghost or
    /// the service bot).
    pub fn privmsg_to_real_user(&self, from_nick: &str, from_user: &str, host: &str, text: &str) {
        let target = self.real_nick();
        self.send(codec::format_prefixed(from_nick, from_user, host, "PRIVMSG", &[&target], text));
    }

    pub fn raw(&self, line: String) {
        self.send(line);
    }
}

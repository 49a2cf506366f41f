//! Wire types for the chat service's REST and event-stream APIs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type ChannelId = String;
pub type TeamId = String;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A single joined or discoverable channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
}

/// Per-member metadata for a joined channel, keyed by channel id.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChannelMember {
    pub last_viewed_at: i64,
}

/// Response shape of "get joined channels": the channel list plus each
/// channel's last-viewed marker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChannelList {
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: HashMap<ChannelId, ChannelMember>,
}

/// A channel member as returned by "get channel extra info".
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelMemberInfo {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChannelExtra {
    pub members: Vec<ChannelMemberInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    pub id: String,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub message: String,
    /// Ordering key used for backfill (and for deciding delivery order).
    pub create_at: i64,
}

/// Response shape of "get posts since": posts keyed by id plus the order
/// they should be delivered in.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PostList {
    pub order: Vec<String>,
    pub posts: HashMap<String, Post>,
}

impl PostList {
    /// Posts in the delivery order given by `order` itself.
    pub fn in_delivery_order(&self) -> Vec<&Post> {
        self.order.iter().filter_map(|id| self.posts.get(id)).collect()
    }
}

/// Actions recognized on the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Posted,
    UserAdded,
    UserRemoved,
    #[serde(other)]
    Unknown,
}

/// A raw event-stream message: `{Action, UserId, ChannelId, Props}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEvent {
    pub action: Action,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub channel_id: ChannelId,
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
}

impl StreamEvent {
    /// Pull the nested post out of `Props["post"]` for `posted` events.
    pub fn post(&self) -> Option<Post> {
        let raw = self.props.get("post")?;
        let raw = match raw {
            serde_json::Value::String(s) => serde_json::from_str(s).ok()?,
            other => other.clone(),
        };
        serde_json::from_value(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
            message: "hi".to_string(),
            create_at: 1,
        }
    }

    #[test]
    fn in_delivery_order_follows_order_field_not_insertion() {
        let mut posts = HashMap::new();
        posts.insert("p2".to_string(), post("p2"));
        posts.insert("p1".to_string(), post("p1"));
        let list = PostList {
            order: vec!["p1".to_string(), "p2".to_string()],
            posts,
        };
        let ids: Vec<&str> = list.in_delivery_order().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn in_delivery_order_skips_ids_missing_from_posts() {
        let mut posts = HashMap::new();
        posts.insert("p1".to_string(), post("p1"));
        let list = PostList {
            order: vec!["p1".to_string(), "missing".to_string()],
            posts,
        };
        let ids: Vec<&str> = list.in_delivery_order().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn stream_event_post_parses_nested_json_object() {
        let mut props = HashMap::new();
        props.insert("post".to_string(), serde_json::to_value(post("p1")).unwrap());
        let event = StreamEvent {
            action: Action::Posted,
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
            props,
        };
        assert_eq!(event.post().unwrap().id, "p1");
    }

    #[test]
    fn stream_event_post_parses_double_encoded_string() {
        let mut props = HashMap::new();
        let encoded = serde_json::to_string(&post("p1")).unwrap();
        props.insert("post".to_string(), serde_json::Value::String(encoded));
        let event = StreamEvent {
            action: Action::Posted,
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
            props,
        };
        assert_eq!(event.post().unwrap().id, "p1");
    }

    #[test]
    fn stream_event_post_missing_returns_none() {
        let event = StreamEvent {
            action: Action::Posted,
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
            props: HashMap::new(),
        };
        assert!(event.post().is_none());
    }
}

//! Event Translator: the live event-stream read loop that keeps the IRC
//! namespace in sync with Chat after materialization.
//!
//! A dropped stream reconnects (via [`Session::reconnect`]) and then
//! re-runs full materialization, since a gap in the stream may have
//! hidden channel/user changes that only a fresh snapshot can recover.

use std::sync::Arc;

use chat_client::model::{Action, StreamEvent};

use crate::bridge::directory::is_dm_channel_name;
use crate::bridge::materializer;
use crate::bridge::session::Session;
use crate::bridge::{ghost, irc_channel_name, resolve_channel_name, resolve_username};

/// Runs the translator loop for the lifetime of the session. Returns only
/// if the caller's task is cancelled. Takes the session behind an `Arc`
/// because outbound command handling (driven by the IRC reader task)
/// needs to reach the same session concurrently.
pub async fn run(session: Arc<Session>) {
    let mut stream = session.open_event_stream().await;
    loop {
        match stream.next_event().await {
            Ok(event) => {
                if let Err(e) = handle_event(&session, &event).await {
                    tracing::warn!(error = %e, "failed to handle event");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "event stream lost");
                stream = session.reconnect().await;
                if let Err(e) = materializer::materialize_all(&session).await {
                    tracing::warn!(error = %e, "re-materialization after reconnect failed");
                }
            }
        }
    }
}

async fn handle_event(session: &Session, event: &StreamEvent) -> super::error::Result<()> {
    match event.action {
        Action::Posted => handle_posted(session, event).await,
        Action::UserAdded => handle_user_added(session, event).await,
        Action::UserRemoved => handle_user_removed(session, event).await,
        Action::Unknown => Ok(()),
    }
}

async fn handle_posted(session: &Session, event: &StreamEvent) -> super::error::Result<()> {
    let post = event
        .post()
        .ok_or_else(|| super::error::BridgeError::Malformed("posted event missing post payload".into()))?;

    let me = session.me();
    if post.user_id == me.id {
        return Ok(());
    }

    let client = session.client();
    let host = client.host();

    let Some(chat_name) = resolve_channel_name(&session.directory, &client, &post.channel_id).await else {
        return Ok(());
    };

    if is_dm_channel_name(&chat_name) {
        handle_dm_post(session, &chat_name, &post.user_id, &post.message).await?;
    } else {
        let irc_name = irc_channel_name(&chat_name);

        let username = resolve_username(&session.directory, &client, &post.user_id)
            .await
            .unwrap_or_else(|| post.user_id.clone());
        let entry = ghost::ensure_ghost(&session.registry, host, &post.user_id, &username, None);
        session.registry.join(&irc_name, &entry.nick, &entry.user, &entry.host);

        for line in post.message.split('\n') {
            session.registry.channel_message(&irc_name, &entry, line);
        }
    }

    if session.directory.advance_last_viewed(&post.channel_id, post.create_at).is_some() {
        if let Err(e) = client.update_last_viewed_at(&post.channel_id).await {
            tracing::warn!(channel = %post.channel_id, error = %e, "failed to update last-viewed marker");
        }
    }
    Ok(())
}

/// DM channel names are `{lowerId}__{higherId}`. Splits on `__` and
/// requires self to be one of the two halves; if not, the channel name
/// doesn't actually belong to this session and the event is dropped as
/// an invariant violation rather than routed to the wrong party.
async fn handle_dm_post(session: &Session, chat_name: &str, author_id: &str, message: &str) -> super::error::Result<()> {
    let me = session.me();
    match chat_name.split("__").collect::<Vec<&str>>().as_slice() {
        [a, b] if *a == me.id || *b == me.id => {}
        _ => {
            return Err(super::error::BridgeError::Internal(format!(
                "self not a party to DM channel {chat_name}"
            )))
        }
    }

    let client = session.client();
    let host = client.host();
    let username = resolve_username(&session.directory, &client, author_id)
        .await
        .unwrap_or_else(|| author_id.to_string());
    let entry = ghost::ensure_ghost(&session.registry, host, &author_id.to_string(), &username, None);
    for line in message.split('\n') {
        session.registry.privmsg_to_real_user(&entry.nick, &entry.user, &entry.host, line);
    }
    Ok(())
}

async fn handle_user_added(session: &Session, event: &StreamEvent) -> super::error::Result<()> {
    let client = session.client();
    let Some(chat_name) = resolve_channel_name(&session.directory, &client, &event.channel_id).await else {
        return Ok(());
    };
    if is_dm_channel_name(&chat_name) {
        return Ok(());
    }
    let irc_name = irc_channel_name(&chat_name);

    let me = session.me();
    if event.user_id == me.id {
        session.registry.join(&irc_name, &me.name, &me.id, client.host());
        return Ok(());
    }

    let username = resolve_username(&session.directory, &client, &event.user_id)
        .await
        .unwrap_or_else(|| event.user_id.clone());
    let entry = ghost::ensure_ghost(&session.registry, client.host(), &event.user_id, &username, None);
    session.registry.join(&irc_name, &entry.nick, &entry.user, &entry.host);
    Ok(())
}

async fn handle_user_removed(session: &Session, event: &StreamEvent) -> super::error::Result<()> {
    let client = session.client();
    let Some(chat_name) = resolve_channel_name(&session.directory, &client, &event.channel_id).await else {
        return Ok(());
    };
    if is_dm_channel_name(&chat_name) {
        return Ok(());
    }
    let irc_name = irc_channel_name(&chat_name);

    let me = session.me();
    let (nick, user_field, host) = if event.user_id == me.id {
        (me.name.clone(), me.id.clone(), client.host().to_string())
    } else if let Some(entry) = session.registry.find_ghost_by_chat_id(&event.user_id) {
        (entry.nick, entry.user, entry.host)
    } else {
        return Ok(());
    };

    session.registry.part(&irc_name, &nick, &user_field, &host, "removed from channel");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chat_client::model::Post;
    use tokio::sync::mpsc;

    use crate::bridge::directory::{ChannelInfo, DirectoryCache};
    use crate::bridge::session::SelfIdentity;
    use crate::irc::registry::Registry;

    use super::*;

    const SELF_ID: &str = "U1";

    fn build_session(
        joined: Vec<ChannelInfo>,
        users: Vec<(String, String)>,
    ) -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Registry::new(tx, "alice", "matterircd"));
        let directory = Arc::new(DirectoryCache::default());
        directory.seed_for_test(users, joined, vec![]);
        let me = SelfIdentity {
            id: SELF_ID.to_string(),
            name: "alice".to_string(),
            team_id: "T1".to_string(),
            team_name: "team1".to_string(),
        };
        (Arc::new(Session::for_test(me, directory, registry)), rx)
    }

    fn chan(id: &str, name: &str) -> ChannelInfo {
        ChannelInfo {
            id: id.to_string(),
            name: name.to_string(),
            last_viewed_at: i64::MAX,
        }
    }

    fn posted_event(channel_id: &str, user_id: &str, message: &str) -> StreamEvent {
        let post = Post {
            id: "P1".to_string(),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            message: message.to_string(),
            create_at: 1,
        };
        let mut props = HashMap::new();
        props.insert("post".to_string(), serde_json::to_value(&post).unwrap());
        StreamEvent {
            action: Action::Posted,
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            props,
        }
    }

    fn membership_event(action: Action, channel_id: &str, user_id: &str) -> StreamEvent {
        StreamEvent {
            action,
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            props: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn posted_in_channel_joins_ghost_and_delivers_each_line() {
        let (session, mut rx) = build_session(
            vec![chan("C1", "town-square")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        let event = posted_event("C1", "U2", "hi\nthere");
        handle_event(&session, &event).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), ":bob!U2@chat.example JOIN #town-square");
        assert_eq!(rx.try_recv().unwrap(), ":bob!U2@chat.example PRIVMSG #town-square :hi");
        assert_eq!(rx.try_recv().unwrap(), ":bob!U2@chat.example PRIVMSG #town-square :there");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn posted_from_self_is_dropped() {
        let (session, mut rx) = build_session(vec![chan("C1", "town-square")], vec![]);
        let event = posted_event("C1", SELF_ID, "echo");
        handle_event(&session, &event).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn posted_to_dm_channel_delivers_private_message() {
        let (session, mut rx) = build_session(
            vec![chan("C2", "U1__U2")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        let event = posted_event("C2", "U2", "hey");
        handle_event(&session, &event).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), ":bob!U2@chat.example PRIVMSG alice :hey");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn posted_to_dm_channel_without_self_is_rejected() {
        let (session, mut rx) = build_session(
            vec![chan("C3", "U3__U4")],
            vec![("U3".to_string(), "carol".to_string())],
        );
        let event = posted_event("C3", "U3", "hey");
        assert!(handle_event(&session, &event).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_added_for_other_user_joins_ghost() {
        let (session, mut rx) = build_session(
            vec![chan("C1", "town-square")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        let event = membership_event(Action::UserAdded, "C1", "U2");
        handle_event(&session, &event).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), ":bob!U2@chat.example JOIN #town-square");
    }

    #[tokio::test]
    async fn user_added_for_self_just_joins_self() {
        let (session, mut rx) = build_session(vec![chan("C1", "town-square")], vec![]);
        let event = membership_event(Action::UserAdded, "C1", SELF_ID);
        handle_event(&session, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            format!(":alice!{SELF_ID}@chat.example JOIN #town-square")
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_added_for_dm_channel_is_ignored() {
        let (session, mut rx) = build_session(
            vec![chan("C2", "U1__U2")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        let event = membership_event(Action::UserAdded, "C2", "U2");
        handle_event(&session, &event).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_removed_for_other_user_parts_ghost() {
        let (session, mut rx) = build_session(
            vec![chan("C1", "town-square")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        session.registry.join("#town-square", "bob", "U2", "chat.example");
        let _ = rx.try_recv();
        let event = membership_event(Action::UserRemoved, "C1", "U2");
        handle_event(&session, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            ":bob!U2@chat.example PART #town-square :removed from channel"
        );
    }

    #[tokio::test]
    async fn user_removed_for_self_parts_self() {
        let (session, mut rx) = build_session(vec![chan("C1", "town-square")], vec![]);
        session.registry.join("#town-square", "alice", SELF_ID, "chat.example");
        let _ = rx.try_recv();
        let event = membership_event(Action::UserRemoved, "C1", SELF_ID);
        handle_event(&session, &event).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            format!(":alice!{SELF_ID}@chat.example PART #town-square :removed from channel")
        );
    }

    #[tokio::test]
    async fn user_removed_for_unregistered_ghost_is_a_no_op() {
        let (session, mut rx) = build_session(
            vec![chan("C1", "town-square")],
            vec![("U2".to_string(), "bob".to_string())],
        );
        let event = membership_event(Action::UserRemoved, "C1", "U2");
        handle_event(&session, &event).await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}

//! The `mattermost` service bot's command parsing, exercised without a
//! real Chat server: every case here takes the "malformed input" branch,
//! which never makes a network call.
//!
//! Covers:
//! - usage reply on anything that isn't exactly `LOGIN <4 args>`
//! - usage reply on a well-formed line whose first token isn't `login`
//! - case-insensitivity of the `LOGIN` keyword is accepted (still dials
//!   out — not exercised here since that needs a real server)

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use matterircd::bridge::servicebot::{handle_command, SERVICE_BOT_NICK};
use matterircd::irc::registry::Registry;

fn registry() -> (Arc<Registry>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Registry::new(tx, "alice", "matterircd")), rx)
}

#[tokio::test]
async fn too_few_tokens_gets_usage_reply() {
    let (registry, mut rx) = registry();
    let slot = Arc::new(RwLock::new(None));
    handle_command(registry, slot, "login chat.example team1 alice").await;
    let line = rx.try_recv().expect("expected a reply");
    assert!(line.contains(&format!("{SERVICE_BOT_NICK}!")));
    assert!(line.contains("usage:"));
}

#[tokio::test]
async fn unknown_command_gets_usage_reply() {
    let (registry, mut rx) = registry();
    let slot = Arc::new(RwLock::new(None));
    handle_command(registry, slot, "help me please now").await;
    let line = rx.try_recv().expect("expected a reply");
    assert!(line.contains("usage:"));
}

#[tokio::test]
async fn too_many_tokens_gets_usage_reply() {
    let (registry, mut rx) = registry();
    let slot = Arc::new(RwLock::new(None));
    handle_command(registry, slot, "login chat.example team1 alice pw extra").await;
    let line = rx.try_recv().expect("expected a reply");
    assert!(line.contains("usage:"));
}

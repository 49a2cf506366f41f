//! The `mattermost` service user: the only command it understands is
//! `LOGIN <server> <team> <login> <password>`, sent as a `PRIVMSG` to
//! that nick. A successful login materializes the namespace, hands the
//! session to the translator, and only then replies "login OK" — the
//! user shouldn't see that reply before channels and ghosts exist. A
//! failed login replies over IRC without touching anything.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::bridge::materializer::materialize_all;
use crate::bridge::session::{Credentials, Session};
use crate::bridge::translator;
use crate::irc::registry::Registry;

pub const SERVICE_BOT_NICK: &str = "mattermost";

const USAGE: &str = "usage: LOGIN <server> <team> <login> <password>";

/// Holds the session for a connection once LOGIN succeeds. `None` before
/// login and for the lifetime of a connection that never logs in. The
/// outbound command handler reads this to reach the same session the
/// translator loop is driving.
pub type SessionSlot = Arc<RwLock<Option<Arc<Session>>>>;

/// Handles one line of text sent to the service bot. Blocks on initial
/// materialization before replying, so "login OK" never arrives before
/// the channels and ghosts it implies; the translator loop itself is
/// still spawned rather than awaited.
pub async fn handle_command(registry: Arc<Registry>, slot: SessionSlot, text: &str) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 5 || !tokens[0].eq_ignore_ascii_case("login") {
        reply(&registry, USAGE);
        return;
    }

    let credentials = Credentials {
        server: tokens[1].to_string(),
        team: tokens[2].to_string(),
        login: tokens[3].to_string(),
        password: tokens[4].to_string(),
    };

    match Session::authenticate(credentials, Arc::clone(&registry)).await {
        Ok(session) => {
            let session = Arc::new(session);
            registry.set_real_nick(&session.me().name);
            *slot.write() = Some(Arc::clone(&session));
            if let Err(e) = materialize_all(&session).await {
                tracing::warn!(error = %e, "initial materialization failed");
            }
            tokio::spawn(translator::run(Arc::clone(&session)));
            reply(&registry, "login OK");
        }
        Err(e) => {
            tracing::info!(error = %e, "login failed");
            reply(&registry, "login failed");
        }
    }
}

fn reply(registry: &Registry, text: &str) {
    let host = "service";
    registry.privmsg_to_real_user(SERVICE_BOT_NICK, SERVICE_BOT_NICK, host, text);
}

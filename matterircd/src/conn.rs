//! Per-TCP-connection IRC handler.
//!
//! This is the thin sliver of "IRC command dispatcher" the bridge design
//! treats as an external collaborator (see [`crate::bridge`]'s module
//! docs) — just enough registration (NICK/USER) and command routing to
//! drive LOGIN, JOIN, and PRIVMSG into the bridge engine. It carries no
//! bridge state of its own beyond the [`SessionSlot`] the service bot
//! fills in on a successful LOGIN.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::bridge::outbound;
use crate::bridge::servicebot::{self, SessionSlot, SERVICE_BOT_NICK};
use crate::irc::codec::{self, Line};
use crate::irc::registry::{Registry, UserEntry};

/// Process-lifetime server identity: name plus the instant the listener
/// came up, used for the 003 welcome line and `TIME`-style replies.
pub struct ServerInfo {
    pub name: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ServerInfo {
    pub fn new(name: String) -> Self {
        Self {
            name,
            started_at: chrono::Utc::now(),
        }
    }
}

/// Accepts one client connection end to end: registration, welcome burst,
/// then the command loop until the client disconnects.
pub async fn handle(stream: TcpStream, server: Arc<ServerInfo>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(peer = %peer, "client connected");
    if let Err(e) = run(stream, &server).await {
        tracing::info!(peer = %peer, error = %e, "connection closed");
    } else {
        tracing::info!(peer = %peer, "connection closed");
    }
}

async fn run(stream: TcpStream, server: &ServerInfo) -> anyhow::Result<()> {
    let server_name = server.name.as_str();
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if write_half.write_all(b"\r\n").await.is_err() {
                break;
            }
        }
    });

    let Some(nick) = register(&mut lines).await? else {
        writer.abort();
        return Ok(());
    };

    let registry = Arc::new(Registry::new(tx, &nick, server_name));
    registry.add_user(UserEntry {
        nick: nick.clone(),
        user: nick.clone(),
        real: "matterircd user".to_string(),
        host: server_name.to_string(),
        is_ghost: false,
    });
    registry.add_user(UserEntry {
        nick: SERVICE_BOT_NICK.to_string(),
        user: SERVICE_BOT_NICK.to_string(),
        real: "matterircd service bot".to_string(),
        host: server_name.to_string(),
        is_ghost: false,
    });
    send_welcome_burst(&registry, server, &nick);

    let slot: SessionSlot = Arc::new(RwLock::new(None));

    while let Some(raw) = lines.next_line().await? {
        let Some(parsed) = Line::parse(&raw) else {
            continue;
        };
        match parsed.command.as_str() {
            "PING" => {
                let token = parsed.params.first().cloned().unwrap_or_default();
                registry.raw(format!("PONG {server_name} :{token}"));
            }
            "JOIN" => dispatch_join(&registry, &slot, &parsed.params).await,
            "PRIVMSG" => dispatch_privmsg(&registry, &slot, &parsed.params).await,
            "TIME" => {
                let now = chrono::Utc::now().format("%a %b %d %Y %H:%M:%S UTC").to_string();
                registry.raw(codec::format_server(server_name, "391", &[&nick, server_name], Some(&now)));
            }
            "QUIT" => break,
            _ => {}
        }
    }

    writer.abort();
    Ok(())
}

/// Waits for `NICK` (and tolerates `USER`/`CAP`/`PASS` arriving in either
/// order, as most clients send them together). Returns `None` if the
/// connection closes before registration completes.
async fn register(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> anyhow::Result<Option<String>> {
    let mut nick = None;
    loop {
        let Some(raw) = lines.next_line().await? else {
            return Ok(None);
        };
        let Some(parsed) = Line::parse(&raw) else {
            continue;
        };
        match parsed.command.as_str() {
            "NICK" => nick = parsed.params.first().cloned(),
            "QUIT" => return Ok(None),
            "USER" | "CAP" | "PASS" => {}
            _ => {}
        }
        if let Some(n) = &nick {
            if !n.is_empty() {
                return Ok(Some(n.clone()));
            }
        }
    }
}

async fn dispatch_join(registry: &Arc<Registry>, slot: &SessionSlot, params: &[String]) {
    let Some(target) = params.first() else {
        return;
    };
    let name = target.strip_prefix('#').unwrap_or(target);
    let Some(session) = slot.read().clone() else {
        notice(registry, "not logged in: PRIVMSG mattermost :LOGIN <server> <team> <login> <password>");
        return;
    };
    if let Err(e) = outbound::handle_join(&session, name).await {
        tracing::info!(error = %e, channel = %name, "join failed");
        notice(registry, &format!("join failed: {e}"));
    }
}

async fn dispatch_privmsg(registry: &Arc<Registry>, slot: &SessionSlot, params: &[String]) {
    let Some(target) = params.first() else {
        return;
    };
    let Some(text) = params.get(1) else {
        return;
    };

    if target.eq_ignore_ascii_case(SERVICE_BOT_NICK) {
        servicebot::handle_command(Arc::clone(registry), Arc::clone(slot), text).await;
        return;
    }

    let Some(session) = slot.read().clone() else {
        notice(registry, "not logged in: PRIVMSG mattermost :LOGIN <server> <team> <login> <password>");
        return;
    };

    let result = if target.starts_with('#') {
        outbound::handle_privmsg_channel(&session, target, text).await
    } else {
        outbound::handle_privmsg_user(&session, target, text).await
    };
    if let Err(e) = result {
        tracing::info!(error = %e, target = %target, "outbound privmsg failed");
        notice(registry, &format!("privmsg to {target} failed: {e}"));
    }
}

fn notice(registry: &Registry, text: &str) {
    registry.privmsg_to_real_user(SERVICE_BOT_NICK, SERVICE_BOT_NICK, "service", text);
}

fn send_welcome_burst(registry: &Registry, server: &ServerInfo, nick: &str) {
    let server_name = server.name.as_str();
    let created = server.started_at.format("%a %b %d %Y %H:%M:%S UTC").to_string();
    registry.raw(codec::format_server(server_name, "001", &[nick], Some(&format!("Welcome to matterircd, {nick}"))));
    registry.raw(codec::format_server(
        server_name,
        "002",
        &[nick],
        Some(&format!("Your host is {server_name}, running matterircd")),
    ));
    registry.raw(codec::format_server(
        server_name,
        "003",
        &[nick],
        Some(&format!("This server was created {created}")),
    ));
    registry.raw(codec::format_server(server_name, "004", &[nick, server_name, "matterircd-0.1", "o", "o"], None));
    registry.raw(codec::format_server(
        server_name,
        "375",
        &[nick],
        Some(&format!("- {server_name} Message of the day -")),
    ));
    registry.raw(codec::format_server(
        server_name,
        "372",
        &[nick],
        Some("- PRIVMSG mattermost :LOGIN <server> <team> <login> <password> to connect."),
    ));
    registry.raw(codec::format_server(server_name, "376", &[nick], Some("End of /MOTD command")));
}

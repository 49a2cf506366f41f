use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use matterircd::conn::{self, ServerInfo};

/// IRC gateway onto a team-chat service. Connect with any IRC client,
/// then `PRIVMSG mattermost :LOGIN <server> <team> <login> <password>`.
#[derive(Parser)]
#[command(name = "matterircd", about = "Bridge a team-chat service into a local IRC namespace")]
struct Args {
    /// Address to listen for IRC clients on.
    #[arg(long, env = "MATTERIRCD_LISTEN", default_value = "127.0.0.1:6667")]
    listen: String,

    /// Server name reported in IRC replies and used as the default host
    /// for locally-originated messages before a Chat server is known.
    #[arg(long, env = "MATTERIRCD_SERVER_NAME", default_value = "matterircd")]
    server_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("MATTERIRCD_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("matterircd=info"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args = Args::parse();
    let server = Arc::new(ServerInfo::new(args.server_name.clone()));

    let listener = TcpListener::bind(&args.listen).await?;
    tracing::info!(listen = %args.listen, server_name = %args.server_name, "matterircd listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            conn::handle(stream, server).await;
        });
    }
}

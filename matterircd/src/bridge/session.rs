//! Credential & session establishment: authenticate against Chat, open
//! the event stream, and reconnect with unbounded exponential backoff.
//!
//! The retry loop never gives up — a transient Chat outage is not a
//! reason to tear down the IRC side, so it just stalls until the
//! upstream comes back.
//!
//! `client` and `me` live behind a lock because both the translator loop
//! (which may replace them on reconnect) and outbound command handling
//! (which reads them to make REST calls) run concurrently against the
//! same session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use chat_client::model::{TeamId, UserId};
use chat_client::{Backoff, Client, EventStream};

use crate::bridge::directory::DirectoryCache;
use crate::bridge::error::BridgeError;
use crate::irc::registry::Registry;

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub server: String,
    pub team: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SelfIdentity {
    pub id: UserId,
    pub name: String,
    pub team_id: TeamId,
    pub team_name: String,
}

struct Shared {
    client: Client,
    me: SelfIdentity,
}

pub struct Session {
    pub credentials: Credentials,
    shared: RwLock<Shared>,
    pub directory: Arc<DirectoryCache>,
    pub registry: Arc<Registry>,
}

/// Authenticate against Chat, retrying with backoff until it succeeds.
/// There is no failure return: a caller that wants to give up should wrap
/// this in a timeout externally, but the bridge itself never does.
async fn login_with_retry(credentials: &Credentials) -> (Client, SelfIdentity) {
    let mut backoff = Backoff::new(MIN_BACKOFF, MAX_BACKOFF);
    let mut client = Client::new(&credentials.server);
    loop {
        match client
            .login_by_email(&credentials.team, &credentials.login, &credentials.password)
            .await
        {
            Ok(user) => match client.get_my_team().await {
                Ok(team) => {
                    return (
                        client,
                        SelfIdentity {
                            id: user.id,
                            name: user.username,
                            team_id: team.id,
                            team_name: team.name,
                        },
                    );
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::info!(error = %e, ?delay, "fetching primary team failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            },
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::info!(error = %e, ?delay, "login failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn open_stream_with_retry(client: &Client) -> EventStream {
    let mut backoff = Backoff::new(MIN_BACKOFF, MAX_BACKOFF);
    loop {
        let token = client.bearer_token().unwrap_or_default();
        match EventStream::connect(client.host(), token).await {
            Ok(stream) => return stream,
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::info!(error = %e, ?delay, "event stream connect failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Session {
    pub async fn authenticate(
        credentials: Credentials,
        registry: Arc<Registry>,
    ) -> Result<Session, BridgeError> {
        let (client, me) = login_with_retry(&credentials).await;
        Ok(Session {
            credentials,
            shared: RwLock::new(Shared { client, me }),
            directory: Arc::new(DirectoryCache::default()),
            registry,
        })
    }

    /// A cheap clone of the current client: `reqwest::Client` is an `Arc`
    /// internally, so this is safe to call on every outbound command
    /// without holding the lock across an `.await`.
    pub fn client(&self) -> Client {
        self.shared.read().client.clone()
    }

    pub fn me(&self) -> SelfIdentity {
        self.shared.read().me.clone()
    }

    pub async fn open_event_stream(&self) -> EventStream {
        open_stream_with_retry(&self.client()).await
    }

    /// Re-authenticates and reopens the stream, leaving `directory` and
    /// `registry` untouched so re-materialization sees the same namespace
    /// and can be idempotent about it.
    pub async fn reconnect(&self) -> EventStream {
        tracing::warn!("event stream dropped, reconnecting");
        let (client, me) = login_with_retry(&self.credentials).await;
        *self.shared.write() = Shared { client: client.clone(), me };
        open_stream_with_retry(&client).await
    }

    /// Builds a session around an already-known identity and a client that
    /// has never dialed out, skipping `authenticate`'s network retry loop.
    /// Event-handler logic can be exercised directly as long as the test
    /// never forces a directory-cache miss (which would trigger a real
    /// REST refresh).
    #[cfg(test)]
    pub(crate) fn for_test(me: SelfIdentity, directory: Arc<DirectoryCache>, registry: Arc<Registry>) -> Session {
        Session {
            credentials: Credentials {
                server: "chat.example".to_string(),
                team: "team1".to_string(),
                login: "alice".to_string(),
                password: "pw".to_string(),
            },
            shared: RwLock::new(Shared {
                client: Client::new("chat.example"),
                me,
            }),
            directory,
            registry,
        }
    }
}

//! Event-stream client.
//!
//! An outbound `tokio-tungstenite` websocket connection: dial,
//! authenticate via a bearer header, read a JSON message per frame.

use futures_util::stream::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::model::StreamEvent;

pub struct EventStream {
    socket: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl EventStream {
    pub async fn connect(host: &str, token: &str) -> Result<Self> {
        let url = format!("wss://{host}/api/v3/users/websocket");
        let mut request = url
            .into_client_request()
            .map_err(|e| Error::Stream(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            format!("BEARER {token}")
                .parse()
                .map_err(|_| Error::Stream("invalid token header".into()))?,
        );
        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(Self { socket })
    }

    /// Blocks until the next event arrives, or returns an error on stream
    /// failure. Non-JSON or ping/pong frames are skipped.
    pub async fn next_event(&mut self) -> Result<StreamEvent> {
        loop {
            let msg = self
                .socket
                .next()
                .await
                .ok_or_else(|| Error::Stream("event stream closed".into()))?
                .map_err(|e| Error::Stream(e.to_string()))?;
            match msg {
                WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
                WsMessage::Close(_) => return Err(Error::Stream("event stream closed".into())),
                _ => continue,
            }
        }
    }
}

//! WebSocket relay client.
//!
//! Opens a fresh connection per operation. Publishing waits for the relay's
//! `OK`; querying collects events until `EOSE`.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::transport::RelayConnection;
use crate::types::{ClientMessage, Filter, RelayEvent, RelayMessage};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Once;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

static CRYPTO_PROVIDER: Once = Once::new();

fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Another provider may already be installed by the host process.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// A relay reached over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct WebSocketRelay {
    url: String,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl WebSocketRelay {
    pub fn new(url: impl Into<String>, config: &RelayConfig) -> Self {
        install_crypto_provider();
        Self {
            url: url.into(),
            connect_timeout: config.connect_timeout(),
            response_timeout: config.response_timeout(),
        }
    }

    async fn connect(&self) -> RelayResult<WsStream> {
        let connecting = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws, _) = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| RelayError::Timeout {
                relay: self.url.clone(),
                operation: "connect",
            })?
            .map_err(|e| RelayError::Connect {
                relay: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(ws)
    }

    async fn send(&self, ws: &mut WsStream, message: &ClientMessage) -> RelayResult<()> {
        let text = message.to_json()?;
        ws.send(Message::text(text))
            .await
            .map_err(|e| RelayError::protocol(&self.url, e.to_string()))
    }

    /// Next parseable relay frame. Pings and unknown frames are skipped.
    async fn recv(&self, ws: &mut WsStream, operation: &'static str) -> RelayResult<RelayMessage> {
        loop {
            let next = tokio::time::timeout(self.response_timeout, ws.next())
                .await
                .map_err(|_| RelayError::Timeout {
                    relay: self.url.clone(),
                    operation,
                })?;
            match next {
                Some(Ok(Message::Text(text))) => match RelayMessage::from_json(&text) {
                    Some(message) => return Ok(message),
                    None => debug!(relay = %self.url, "ignoring unrecognised frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(RelayError::protocol(&self.url, "connection closed"));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(RelayError::protocol(&self.url, e.to_string())),
            }
        }
    }

    async fn await_ok(&self, ws: &mut WsStream, event_id: &str) -> RelayResult<()> {
        loop {
            match self.recv(ws, "publish").await? {
                RelayMessage::Ok {
                    event_id: id,
                    accepted,
                    message,
                } if id == event_id => {
                    return if accepted {
                        Ok(())
                    } else {
                        Err(RelayError::Rejected {
                            relay: self.url.clone(),
                            message,
                        })
                    };
                }
                RelayMessage::Notice { message } => {
                    debug!(relay = %self.url, notice = %message, "relay notice");
                }
                _ => {}
            }
        }
    }

    async fn collect(
        &self,
        ws: &mut WsStream,
        subscription_id: &str,
    ) -> RelayResult<Vec<RelayEvent>> {
        let mut events = Vec::new();
        loop {
            match self.recv(ws, "query").await? {
                RelayMessage::Event {
                    subscription_id: sub,
                    event,
                } if sub == subscription_id => events.push(event),
                RelayMessage::Eose {
                    subscription_id: sub,
                } if sub == subscription_id => return Ok(events),
                RelayMessage::Closed {
                    subscription_id: sub,
                    message,
                } if sub == subscription_id => {
                    return Err(RelayError::SubscriptionClosed {
                        relay: self.url.clone(),
                        message,
                    });
                }
                RelayMessage::Notice { message } => {
                    debug!(relay = %self.url, notice = %message, "relay notice");
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl RelayConnection for WebSocketRelay {
    fn url(&self) -> &str {
        &self.url
    }

    async fn publish(&self, event: &RelayEvent) -> RelayResult<()> {
        let mut ws = self.connect().await?;
        self.send(&mut ws, &ClientMessage::Event(event.clone()))
            .await?;
        let outcome = self.await_ok(&mut ws, &event.id).await;
        let _ = ws.close(None).await;
        outcome
    }

    async fn query(&self, filter: &Filter) -> RelayResult<Vec<RelayEvent>> {
        let mut ws = self.connect().await?;
        let subscription_id = uuid::Uuid::new_v4().simple().to_string();
        self.send(
            &mut ws,
            &ClientMessage::Req {
                subscription_id: subscription_id.clone(),
                filter: filter.clone(),
            },
        )
        .await?;
        let outcome = self.collect(&mut ws, &subscription_id).await;
        if outcome.is_ok() {
            let _ = self
                .send(&mut ws, &ClientMessage::Close { subscription_id })
                .await;
        }
        let _ = ws.close(None).await;
        outcome
    }
}

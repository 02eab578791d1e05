// src/connectors/stream.rs
use crate::connectors::messages::{StreamFrame, SubscribeRequest};
use crate::core::ledger::PriceLedger;
use crate::error::{PortfolioError, Result};
use crate::types::Tick;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cloneable, idempotent close request shared between the stream loop and
/// whoever wants it stopped (signal handler, UI).
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn close(&self) {
        if !self.tx.send_replace(true) {
            info!("Shutdown requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Tick(Tick),
    /// Heartbeats, acks, pings and anything else that is not a ticker update.
    Skip,
    End,
}

pub struct StreamSession {
    writer: SplitSink<WsStream, Message>,
    reader: SplitStream<WsStream>,
    shutdown: watch::Receiver<bool>,
    released: bool,
}

impl StreamSession {
    pub async fn connect(ws_url: &str, shutdown: &ShutdownHandle) -> Result<Self> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        info!("WebSocket connected to {}", ws_url);

        let (writer, reader) = ws_stream.split();
        Ok(Self {
            writer,
            reader,
            shutdown: shutdown.subscribe(),
            released: false,
        })
    }

    /// One ticker subscription for all pairs; nothing is sent for an empty list.
    pub async fn subscribe(&mut self, pairs: &[String]) -> Result<()> {
        if pairs.is_empty() {
            info!("No priced instruments held, skipping subscription");
            return Ok(());
        }

        let payload = serde_json::to_string(&SubscribeRequest::ticker(pairs))?;
        self.writer.send(Message::Text(payload)).await?;
        info!("Subscribed to ticker for {:?}", pairs);
        Ok(())
    }

    /// Waits for the next frame. A valid ticker update is applied to `ledger`
    /// before it is returned. Returns `End` once shutdown has been requested,
    /// even while a read is in flight.
    pub async fn next_message(&mut self, ledger: &mut PriceLedger) -> Result<StreamEvent> {
        if *self.shutdown.borrow() {
            return Ok(StreamEvent::End);
        }

        let message = tokio::select! {
            _ = self.shutdown.changed() => return Ok(StreamEvent::End),
            message = self.reader.next() => message,
        };

        match message {
            None => {
                info!("WebSocket stream ended");
                Ok(StreamEvent::End)
            }
            Some(Err(e)) => Err(PortfolioError::Stream(e.to_string())),
            Some(Ok(Message::Text(text))) => match StreamFrame::decode(&text) {
                StreamFrame::Ticker { pair, price } => {
                    ledger.update(&pair, price);
                    Ok(StreamEvent::Tick(Tick { pair, price }))
                }
                StreamFrame::Ignored => {
                    debug!("Ignoring frame: {}", text);
                    Ok(StreamEvent::Skip)
                }
            },
            Some(Ok(Message::Close(frame))) => {
                info!("Server closed the stream: {:?}", frame);
                Ok(StreamEvent::End)
            }
            Some(Ok(_)) => Ok(StreamEvent::Skip),
        }
    }

    /// Best-effort close handshake. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.writer.send(Message::Close(None)).await {
            debug!("Close frame not sent: {}", e);
        }
        if let Err(e) = self.writer.close().await {
            debug!("WebSocket sink close failed: {}", e);
        }
        info!("WebSocket released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_ws_server;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn subscribes_and_decodes_ticks() {
        let (sub_tx, sub_rx) = tokio::sync::oneshot::channel();
        let url = spawn_ws_server(|mut ws| async move {
            let first = ws.next().await.unwrap().unwrap();
            sub_tx.send(first.into_text().unwrap()).ok();
            ws.send(Message::Text(r#"{"event":"heartbeat"}"#.into())).await.unwrap();
            ws.send(Message::Text(
                r#"[0, {"c":["3050.5","1.2"]}, "ticker", "ETH/USD"]"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.ok();
        })
        .await;

        let shutdown = ShutdownHandle::new();
        let mut session = StreamSession::connect(&url, &shutdown).await.unwrap();
        session.subscribe(&["ETH/USD".to_string()]).await.unwrap();

        let sub: serde_json::Value = serde_json::from_str(&sub_rx.await.unwrap()).unwrap();
        assert_eq!(sub["event"], "subscribe");
        assert_eq!(sub["pair"], serde_json::json!(["ETH/USD"]));
        assert_eq!(sub["subscription"]["name"], "ticker");

        let mut ledger = PriceLedger::new();
        assert_eq!(session.next_message(&mut ledger).await.unwrap(), StreamEvent::Skip);

        let price = Decimal::from_str("3050.5").unwrap();
        assert_eq!(
            session.next_message(&mut ledger).await.unwrap(),
            StreamEvent::Tick(Tick {
                pair: "ETH/USD".to_string(),
                price
            })
        );
        assert_eq!(ledger.read("ETH/USD"), (price, Decimal::ZERO));

        assert_eq!(session.next_message(&mut ledger).await.unwrap(), StreamEvent::End);
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_pending_read() {
        let url = spawn_ws_server(|mut ws| async move {
            // Never sends anything; just waits for the client to go away.
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let shutdown = ShutdownHandle::new();
        let mut session = StreamSession::connect(&url, &shutdown).await.unwrap();

        let remote = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            remote.close();
        });

        let mut ledger = PriceLedger::new();
        let event = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            session.next_message(&mut ledger),
        )
        .await
        .expect("read did not observe shutdown")
        .unwrap();
        assert_eq!(event, StreamEvent::End);

        session.close().await;
        session.close().await;
    }

    #[tokio::test]
    async fn dropped_connection_is_a_stream_error() {
        let url = spawn_ws_server(|ws| async move {
            // Drop the socket without a close handshake.
            drop(ws);
        })
        .await;

        let shutdown = ShutdownHandle::new();
        let mut session = StreamSession::connect(&url, &shutdown).await.unwrap();
        let mut ledger = PriceLedger::new();

        let err = session.next_message(&mut ledger).await.unwrap_err();
        assert!(matches!(err, PortfolioError::Stream(_)), "{:?}", err);
    }

    #[test]
    fn shutdown_handle_is_idempotent() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_closed());
        clone.close();
        clone.close();
        assert!(handle.is_closed());
    }
}

//! Broker link: a persistent connection with automatic reconnection.
//!
//! Frames are newline-delimited JSON. Outbound frames are publications
//! (topic, payload, retain flag) for the broker bridge to fan out; every
//! inbound line is a payload from the device's command topic.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

/// Events emitted by the broker link.
#[derive(Debug)]
pub enum BrokerEvent {
    /// Connection established; retained announcements should be (re)sent.
    Connected,
    /// Connection lost; the link keeps reconnecting on its own.
    Disconnected { reason: String },
    /// One inbound frame from the command topic.
    Received(String),
}

/// An outbound frame.
#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub topic: String,
    pub payload: Value,
    pub retain: bool,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub addr: String,
    pub connect_timeout: Duration,
    /// Initial reconnection delay; doubles up to the maximum.
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".into(),
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

/// Handle to the connection task. Dropping the handle tears the task down.
pub struct BrokerLink {
    outbound_tx: mpsc::UnboundedSender<Publication>,
    event_rx: mpsc::Receiver<BrokerEvent>,
}

/// Clonable outbound half of a [`BrokerLink`].
#[derive(Clone)]
pub struct BrokerPublisher {
    tx: mpsc::UnboundedSender<Publication>,
}

impl BrokerPublisher {
    /// Queue a publication. Never blocks.
    pub fn publish(&self, publication: Publication) {
        let _ = self.tx.send(publication);
    }
}

impl BrokerLink {
    /// Start the connection loop. Connection failures surface as events, not
    /// errors; the loop retries with capped exponential backoff forever.
    pub fn connect(config: BrokerConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(100);

        tokio::spawn(async move {
            connection_loop(config, outbound_rx, event_tx).await;
        });

        Self {
            outbound_tx,
            event_rx,
        }
    }

    /// Queue a publication. Never blocks; frames queued while offline are
    /// flushed once the connection is back.
    pub fn publish(&self, publication: Publication) {
        let _ = self.outbound_tx.send(publication);
    }

    /// Split off an outbound handle that can publish while this side is
    /// borrowed for receiving events.
    pub fn publisher(&self) -> BrokerPublisher {
        BrokerPublisher {
            tx: self.outbound_tx.clone(),
        }
    }

    /// Receive the next link event.
    pub async fn recv(&mut self) -> Option<BrokerEvent> {
        self.event_rx.recv().await
    }
}

async fn connection_loop(
    config: BrokerConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<Publication>,
    event_tx: mpsc::Sender<BrokerEvent>,
) {
    let mut reconnect_delay = config.reconnect_delay;

    loop {
        match timeout(config.connect_timeout, TcpStream::connect(&config.addr)).await {
            Ok(Ok(stream)) => {
                reconnect_delay = config.reconnect_delay;

                if event_tx.send(BrokerEvent::Connected).await.is_err() {
                    return;
                }

                match handle_connection(stream, &mut outbound_rx, &event_tx).await {
                    // The owning gateway dropped its handle.
                    Ok(()) => return,
                    Err(reason) => {
                        let event = BrokerEvent::Disconnected {
                            reason: reason.to_string(),
                        };
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Ok(Err(err)) => {
                debug!(%err, addr = %config.addr, "broker connect failed");
            }
            Err(_) => {
                debug!(addr = %config.addr, "broker connect timed out");
            }
        }

        tokio::time::sleep(reconnect_delay).await;
        reconnect_delay = std::cmp::min(reconnect_delay * 2, config.max_reconnect_delay);
    }
}

/// Drive one established connection. `Ok` means the owning gateway went
/// away; `Err` is a connection failure worth reporting and retrying.
async fn handle_connection(
    stream: TcpStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<Publication>,
    event_tx: &mpsc::Sender<BrokerEvent>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            maybe = outbound_rx.recv() => match maybe {
                Some(publication) => {
                    let mut frame = serde_json::to_vec(&publication)
                        .map_err(|err| anyhow!("encoding publication: {err}"))?;
                    frame.push(b'\n');
                    writer.write_all(&frame).await?;
                }
                None => return Ok(()),
            },
            maybe = lines.next_line() => match maybe {
                Ok(Some(line)) => {
                    if event_tx.send(BrokerEvent::Received(line)).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => return Err(anyhow!("broker closed the connection")),
                Err(err) => return Err(anyhow!("read error: {err}")),
            },
        }
    }
}

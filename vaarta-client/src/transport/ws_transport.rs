use crate::engine::{CallEngine, CallHandle, ClientEvent};
use crate::media::MediaPeerFactory;
use crate::transport::ClientConfig;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use vaarta_core::{RoomId, SignalMessage};

/// A running client: the control handle, its event stream and the task
/// driving the engine. The task ends when the socket closes.
pub struct CallClient {
    pub handle: CallHandle,
    pub events: mpsc::UnboundedReceiver<ClientEvent>,
    pub task: JoinHandle<()>,
    display_label: String,
}

impl CallClient {
    /// Joins `room_id` under the configured display label.
    pub fn join(&self, room_id: impl Into<RoomId>) -> bool {
        self.handle.join(room_id, self.display_label.clone())
    }
}

/// Opens the signaling socket and starts a [`CallEngine`] on it.
pub async fn connect(
    config: &ClientConfig,
    factory: Arc<dyn MediaPeerFactory>,
) -> Result<CallClient> {
    let (ws_stream, _) = connect_async(config.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", config.url))?;
    info!("Connected to relay at {}", config.url);

    let (mut write, mut read) = ws_stream.split();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SignalMessage>();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SignalMessage>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize {}: {:?}", msg.event_name(), e);
                    continue;
                }
            };
            if write.send(Message::text(json)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Signaling socket error: {:?}", e);
                    break;
                }
            };

            match SignalMessage::from_json(text.as_str()) {
                Ok(msg) => {
                    debug!("Received {}", msg.event_name());
                    if inbound_tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Dropping unparseable frame: {}", e),
            }
        }
    });

    let (engine, handle, events) = CallEngine::new(factory, inbound_rx, outbound_tx);

    let task = tokio::spawn(async move {
        engine.run().await;

        // The engine stops when the relay goes away or every handle is
        // dropped; either way the socket is done.
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
        info!("Signaling connection closed");
    });

    Ok(CallClient {
        handle,
        events,
        task,
        display_label: config.display_label.clone(),
    })
}

use crate::config::ServerConfig;
use crate::registry::{ConnectionRegistry, Participant};
use crate::relay::SignalingRelay;
use crate::room::RoomDirectory;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vaarta_core::{IceServerConfig, ParticipantId, SignalError, SignalMessage, SignalingMessage};

struct SignalingInner {
    registry: ConnectionRegistry,
    relay: SignalingRelay,
    ice_servers: Vec<IceServerConfig>,
}

/// Entry point for everything a connected socket sends. Cloned into every
/// connection task and used as axum state.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(config: &ServerConfig) -> Self {
        let registry = ConnectionRegistry::new();
        let relay = SignalingRelay::new(registry.clone());

        Self {
            inner: Arc::new(SignalingInner {
                registry,
                relay,
                ice_servers: config.ice_servers.clone(),
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn directory(&self) -> &RoomDirectory {
        self.inner.registry.directory()
    }

    /// Registers a socket and greets it with its id and the ICE servers.
    pub fn connect(&self, tx: mpsc::UnboundedSender<SignalMessage>) -> ParticipantId {
        let participant_id = self.inner.registry.register(tx.clone());

        let _ = tx.send(SignalMessage::Welcome { participant_id });
        let _ = tx.send(SignalMessage::IceConfig {
            ice_servers: self.get_ice_servers(),
        });

        participant_id
    }

    pub fn disconnect(&self, participant_id: &ParticipantId) -> Option<Participant> {
        self.inner.registry.unregister(participant_id)
    }

    /// Handles one raw text frame. Failures go back to the sender as an
    /// `error` frame and never end the connection.
    pub fn receive_text(&self, from: ParticipantId, text: &str) {
        let result = match SignalMessage::from_json(text) {
            Ok(msg) => self.handle_message(from, msg),
            Err(e) => {
                warn!("Invalid SignalMessage from {}: {}", from, e);
                Err(SignalError::malformed(e.to_string()))
            }
        };

        if let Err(e) = result {
            self.send_signal(&from, e.to_signal());
        }
    }

    pub fn handle_message(&self, from: ParticipantId, msg: SignalMessage) -> Result<(), SignalError> {
        debug!("{} from {}", msg.event_name(), from);

        match msg {
            SignalMessage::RoomJoin {
                room_id,
                display_label,
                ..
            } => {
                let roster = self
                    .directory()
                    .join(from, room_id.clone(), display_label.clone())?;

                self.send_signal(
                    &from,
                    SignalMessage::RoomJoin {
                        room_id,
                        participant_id: Some(from),
                        display_label,
                        roster,
                    },
                );
                Ok(())
            }

            SignalMessage::RoomLeave {} => {
                self.directory().leave(&from);
                Ok(())
            }

            other => match SignalingMessage::from_signal(other) {
                Ok(mut peer_msg) => {
                    if peer_msg.from != from {
                        warn!(
                            "{} claimed to be {}, rewriting sender",
                            from, peer_msg.from
                        );
                        peer_msg.from = from;
                    }
                    if peer_msg.to == from {
                        return Err(SignalError::malformed(format!(
                            "{} addressed to its own sender",
                            peer_msg.kind()
                        )));
                    }
                    self.inner.relay.deliver(peer_msg)
                }
                Err(control) => Err(SignalError::malformed(format!(
                    "{} cannot be sent by a client",
                    control.event_name()
                ))),
            },
        }
    }

    pub fn send_signal(&self, participant_id: &ParticipantId, msg: SignalMessage) {
        match self.inner.registry.lookup(participant_id) {
            Some(conn) => {
                if !conn.send(msg) {
                    warn!("Send task for {} already closed", participant_id);
                }
            }
            None => warn!(
                "Attempted to send signal to disconnected participant {}",
                participant_id
            ),
        }
    }
}

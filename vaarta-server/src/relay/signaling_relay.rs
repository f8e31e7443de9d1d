use crate::registry::ConnectionRegistry;
use tracing::{debug, warn};
use vaarta_core::{SignalError, SignalingMessage};

/// Forwards peer messages to the addressed participant's connection.
///
/// The body is never inspected. An unknown recipient drops the message; only
/// offers and answers report that back to the sender.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: ConnectionRegistry,
}

impl SignalingRelay {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn deliver(&self, msg: SignalingMessage) -> Result<(), SignalError> {
        let kind = msg.kind();
        let (from, to) = (msg.from, msg.to);

        let delivered = match self.registry.lookup(&to) {
            Some(conn) => conn.send(msg.into_signal()),
            None => false,
        };

        if delivered {
            debug!("Relayed {} {} -> {}", kind, from, to);
            return Ok(());
        }

        if kind.reports_unreachable() {
            warn!("Cannot relay {} from {}: {} is unreachable", kind, from, to);
            return Err(SignalError::PeerUnreachable { peer: to, kind });
        }

        debug!("Dropped {} from {} for departed {}", kind, from, to);
        Ok(())
    }
}

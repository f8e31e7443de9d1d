use tokio::sync::mpsc;
use vaarta_core::{ParticipantId, SignalMessage};

/// Sending half of one participant's socket. Frames queued here are written
/// to the socket in order by the connection's send task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    participant_id: ParticipantId,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

impl ConnectionHandle {
    pub fn new(participant_id: ParticipantId, tx: mpsc::UnboundedSender<SignalMessage>) -> Self {
        Self { participant_id, tx }
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Returns `false` if the socket's send task is already gone.
    pub fn send(&self, msg: SignalMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

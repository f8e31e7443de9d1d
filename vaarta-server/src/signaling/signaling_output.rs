use vaarta_core::{ParticipantId, SignalMessage};

/// Outbound side of the relay: pushes a frame onto a participant's socket.
///
/// Implemented by the connection table so the room directory can notify
/// members without owning their connections.
pub trait SignalingOutput: Send + Sync {
    /// Queues `msg` for `participant_id`. Returns `false` when that
    /// participant has no live connection.
    fn send(&self, participant_id: &ParticipantId, msg: SignalMessage) -> bool;
}

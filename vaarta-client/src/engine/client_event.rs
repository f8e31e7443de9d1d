use crate::negotiation::NegotiationState;
use vaarta_core::{ErrorKind, MemberInfo, ParticipantId, RoomId};

/// Everything the UI layer can observe about a participant's client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The relay assigned us an id.
    Connected { participant_id: ParticipantId },
    /// We are in `room_id`; `roster` lists who was there before us.
    Joined {
        room_id: RoomId,
        roster: Vec<MemberInfo>,
    },
    MemberJoined(MemberInfo),
    MemberLeft(MemberInfo),
    /// A call session changed state.
    CallState {
        remote_id: ParticipantId,
        state: NegotiationState,
    },
    /// A call could not be set up or broke down. The session is back to idle.
    CallFailed {
        remote_id: ParticipantId,
        reason: String,
    },
    RemoteTrack {
        remote_id: ParticipantId,
        track_id: String,
        stream_id: String,
    },
    Chat {
        from: ParticipantId,
        text: String,
    },
    /// The relay rejected something we sent.
    Error {
        kind: ErrorKind,
        message: String,
    },
    /// The signaling connection is gone.
    Disconnected,
}

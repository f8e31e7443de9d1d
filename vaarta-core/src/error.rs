use crate::model::{MessageKind, ParticipantId, RoomId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire form of [`SignalError`], carried in `error` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    AlreadyJoined,
    NoRemotePeer,
    UnexpectedPeer,
    PeerUnreachable,
    MalformedMessage,
}

/// Recoverable signaling failures. None of these ends a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("participant {participant} already joined room '{room}'")]
    AlreadyJoined {
        participant: ParticipantId,
        room: RoomId,
    },

    #[error("participant {0} is not a known member of the room")]
    NoRemotePeer(ParticipantId),

    #[error("expected a message from {expected}, got one from {actual}")]
    UnexpectedPeer {
        expected: ParticipantId,
        actual: ParticipantId,
    },

    #[error("{kind} for {peer} could not be delivered")]
    PeerUnreachable {
        peer: ParticipantId,
        kind: MessageKind,
    },

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

impl SignalError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyJoined { .. } => ErrorKind::AlreadyJoined,
            Self::NoRemotePeer(_) => ErrorKind::NoRemotePeer,
            Self::UnexpectedPeer { .. } => ErrorKind::UnexpectedPeer,
            Self::PeerUnreachable { .. } => ErrorKind::PeerUnreachable,
            Self::MalformedMessage(_) => ErrorKind::MalformedMessage,
        }
    }

    /// Participant the error is about, if there is one.
    pub fn peer(&self) -> Option<ParticipantId> {
        match self {
            Self::NoRemotePeer(peer) | Self::PeerUnreachable { peer, .. } => Some(*peer),
            Self::UnexpectedPeer { actual, .. } => Some(*actual),
            Self::AlreadyJoined { .. } | Self::MalformedMessage(_) => None,
        }
    }

    /// `error` frame sent back to whoever caused this.
    pub fn to_signal(&self) -> crate::model::SignalMessage {
        crate::model::SignalMessage::Error {
            kind: self.kind(),
            message: self.to_string(),
            peer: self.peer(),
        }
    }
}

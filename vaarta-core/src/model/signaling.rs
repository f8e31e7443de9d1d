use crate::error::ErrorKind;
use crate::model::participant::{MemberInfo, ParticipantId};
use crate::model::room::RoomId;
use crate::model::session::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }

    /// `turn:` and `turns:` URLs need credentials.
    pub fn is_turn(url: &str) -> bool {
        url.starts_with("turn:") || url.starts_with("turns:")
    }
}

/// Every frame carried over the signaling socket, in both directions.
///
/// Encoded as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    #[serde(rename = "session:welcome")]
    Welcome { participant_id: ParticipantId },

    #[serde(rename = "ice:config")]
    IceConfig { ice_servers: Vec<IceServerConfig> },

    /// Sent by a client to enter a room. The relay answers the joiner with the
    /// same event, its assigned id and the roster as it was before the join.
    #[serde(rename = "room:join")]
    RoomJoin {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_id: Option<ParticipantId>,
        display_label: String,
        #[serde(default)]
        roster: Vec<MemberInfo>,
    },

    #[serde(rename = "room:leave")]
    RoomLeave {},

    #[serde(rename = "member:joined")]
    MemberJoined {
        participant_id: ParticipantId,
        display_label: String,
    },

    #[serde(rename = "member:left")]
    MemberLeft {
        participant_id: ParticipantId,
        display_label: String,
    },

    #[serde(rename = "call:offer")]
    CallOffer {
        to: ParticipantId,
        from: ParticipantId,
        offer: SessionDescription,
    },

    #[serde(rename = "call:answer")]
    CallAnswer {
        to: ParticipantId,
        from: ParticipantId,
        answer: SessionDescription,
    },

    #[serde(rename = "ice:candidate")]
    IceCandidate {
        to: ParticipantId,
        from: ParticipantId,
        candidate: IceCandidate,
    },

    #[serde(rename = "renego:offer")]
    RenegoOffer {
        to: ParticipantId,
        from: ParticipantId,
        description: SessionDescription,
    },

    #[serde(rename = "renego:answer")]
    RenegoAnswer {
        to: ParticipantId,
        from: ParticipantId,
        description: SessionDescription,
    },

    #[serde(rename = "chat:message")]
    ChatMessage {
        to: ParticipantId,
        from: ParticipantId,
        text: String,
    },

    #[serde(rename = "error")]
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peer: Option<ParticipantId>,
    },
}

impl SignalMessage {
    /// Wire name of the event, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "session:welcome",
            Self::IceConfig { .. } => "ice:config",
            Self::RoomJoin { .. } => "room:join",
            Self::RoomLeave {} => "room:leave",
            Self::MemberJoined { .. } => "member:joined",
            Self::MemberLeft { .. } => "member:left",
            Self::CallOffer { .. } => "call:offer",
            Self::CallAnswer { .. } => "call:answer",
            Self::IceCandidate { .. } => "ice:candidate",
            Self::RenegoOffer { .. } => "renego:offer",
            Self::RenegoAnswer { .. } => "renego:answer",
            Self::ChatMessage { .. } => "chat:message",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

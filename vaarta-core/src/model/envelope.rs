use crate::model::participant::ParticipantId;
use crate::model::session::{IceCandidate, SessionDescription};
use crate::model::signaling::SignalMessage;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Offer,
    Answer,
    IceCandidate,
    RenegoOffer,
    RenegoAnswer,
    Chat,
}

impl MessageKind {
    /// Kinds whose loss a waiting user has to hear about.
    pub fn reports_unreachable(self) -> bool {
        matches!(self, Self::Offer | Self::Answer)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::RenegoOffer => "renego-offer",
            Self::RenegoAnswer => "renego-answer",
            Self::Chat => "chat",
        };
        f.write_str(name)
    }
}

/// Payload carried between two peers. The relay never looks inside.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerBody {
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
    RenegoOffer(SessionDescription),
    RenegoAnswer(SessionDescription),
    Chat(String),
}

/// A peer-to-peer message as the relay sees it: who, to whom, and an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalingMessage {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub body: PeerBody,
}

impl SignalingMessage {
    pub fn new(from: ParticipantId, to: ParticipantId, body: PeerBody) -> Self {
        Self { from, to, body }
    }

    pub fn kind(&self) -> MessageKind {
        match self.body {
            PeerBody::Offer(_) => MessageKind::Offer,
            PeerBody::Answer(_) => MessageKind::Answer,
            PeerBody::IceCandidate(_) => MessageKind::IceCandidate,
            PeerBody::RenegoOffer(_) => MessageKind::RenegoOffer,
            PeerBody::RenegoAnswer(_) => MessageKind::RenegoAnswer,
            PeerBody::Chat(_) => MessageKind::Chat,
        }
    }

    /// Splits a peer event off the wire enum. Room and control events are
    /// handed back unchanged in `Err`.
    pub fn from_signal(msg: SignalMessage) -> Result<Self, SignalMessage> {
        let (from, to, body) = match msg {
            SignalMessage::CallOffer { to, from, offer } => (from, to, PeerBody::Offer(offer)),
            SignalMessage::CallAnswer { to, from, answer } => (from, to, PeerBody::Answer(answer)),
            SignalMessage::IceCandidate {
                to,
                from,
                candidate,
            } => (from, to, PeerBody::IceCandidate(candidate)),
            SignalMessage::RenegoOffer {
                to,
                from,
                description,
            } => (from, to, PeerBody::RenegoOffer(description)),
            SignalMessage::RenegoAnswer {
                to,
                from,
                description,
            } => (from, to, PeerBody::RenegoAnswer(description)),
            SignalMessage::ChatMessage { to, from, text } => (from, to, PeerBody::Chat(text)),
            other => return Err(other),
        };

        Ok(Self { from, to, body })
    }

    pub fn into_signal(self) -> SignalMessage {
        let Self { from, to, body } = self;
        match body {
            PeerBody::Offer(offer) => SignalMessage::CallOffer { to, from, offer },
            PeerBody::Answer(answer) => SignalMessage::CallAnswer { to, from, answer },
            PeerBody::IceCandidate(candidate) => SignalMessage::IceCandidate {
                to,
                from,
                candidate,
            },
            PeerBody::RenegoOffer(description) => SignalMessage::RenegoOffer {
                to,
                from,
                description,
            },
            PeerBody::RenegoAnswer(description) => SignalMessage::RenegoAnswer {
                to,
                from,
                description,
            },
            PeerBody::Chat(text) => SignalMessage::ChatMessage { to, from, text },
        }
    }
}

impl From<SignalingMessage> for SignalMessage {
    fn from(msg: SignalingMessage) -> Self {
        msg.into_signal()
    }
}

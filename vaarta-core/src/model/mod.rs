mod envelope;
mod participant;
mod room;
mod session;
mod signaling;

pub use envelope::{MessageKind, PeerBody, SignalingMessage};
pub use participant::{MemberInfo, ParticipantId};
pub use room::RoomId;
pub use session::{IceCandidate, SdpType, SessionDescription};
pub use signaling::{IceServerConfig, SignalMessage};

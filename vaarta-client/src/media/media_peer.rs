use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use vaarta_core::{IceCandidate, IceServerConfig, ParticipantId, SessionDescription};
use webrtc::track::track_local::TrackLocal;

/// A local media source that can be sent to a remote.
pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// Notifications raised by the platform peer connection.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The session description has to be renewed, e.g. a track was added.
    NegotiationNeeded,
    /// A remote media track arrived.
    TrackReceived { track_id: String, stream_id: String },
    /// Trickle ICE: a local candidate to send to the remote.
    LocalCandidate(IceCandidate),
    /// The underlying transport failed or was closed.
    ConnectionLost,
}

/// Identifies one peer connection: the remote it talks to and which of the
/// successive sessions with that remote created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTag {
    pub remote_id: ParticipantId,
    pub generation: u64,
}

/// Routes one peer connection's notifications into the engine, tagged with
/// the session they belong to.
#[derive(Debug, Clone)]
pub struct MediaEventSink {
    tag: SessionTag,
    tx: mpsc::UnboundedSender<(SessionTag, MediaEvent)>,
}

impl MediaEventSink {
    pub fn new(tag: SessionTag, tx: mpsc::UnboundedSender<(SessionTag, MediaEvent)>) -> Self {
        Self { tag, tx }
    }

    pub fn remote_id(&self) -> ParticipantId {
        self.tag.remote_id
    }

    pub fn tag(&self) -> SessionTag {
        self.tag
    }

    pub fn emit(&self, event: MediaEvent) {
        let _ = self.tx.send((self.tag, event));
    }
}

/// The narrow slice of a platform peer connection that negotiation drives.
#[async_trait]
pub trait MediaPeer: Send + Sync {
    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Applies `remote` (an offer) and returns the local answer, already
    /// applied as the local description.
    async fn create_answer(&self, remote: &SessionDescription) -> Result<SessionDescription>;

    async fn set_remote_description(&self, description: &SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<()>;

    /// Starts sending `track`. The platform raises
    /// [`MediaEvent::NegotiationNeeded`] once the description has to change.
    async fn add_track(&self, track: LocalTrack) -> Result<()>;

    /// Discards a local offer that was never answered, returning the
    /// connection to a stable signaling state.
    async fn rollback(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates one [`MediaPeer`] per remote participant.
#[async_trait]
pub trait MediaPeerFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: MediaEventSink,
    ) -> Result<Arc<dyn MediaPeer>>;
}

use crate::registry::ConnectionHandle;
use crate::room::RoomDirectory;
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use vaarta_core::{ParticipantId, RoomId, SignalMessage};

/// Snapshot of a registered participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_label: Option<String>,
    pub room_id: Option<RoomId>,
}

/// Live connections keyed by participant id.
#[derive(Default)]
pub struct ConnectionTable {
    connections: DashMap<ParticipantId, ConnectionHandle>,
}

impl ConnectionTable {
    pub fn get(&self, participant_id: &ParticipantId) -> Option<ConnectionHandle> {
        self.connections.get(participant_id).map(|c| c.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl SignalingOutput for ConnectionTable {
    fn send(&self, participant_id: &ParticipantId, msg: SignalMessage) -> bool {
        match self.connections.get(participant_id) {
            Some(conn) => conn.send(msg),
            None => false,
        }
    }
}

struct RegistryInner {
    table: Arc<ConnectionTable>,
    directory: RoomDirectory,
}

/// Owns every live connection and its room binding.
///
/// Unregistering a participant removes it from its room before returning, so
/// a departed participant is never visible as a room member afterwards.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let table = Arc::new(ConnectionTable::default());
        let directory = RoomDirectory::new(table.clone());

        Self {
            inner: Arc::new(RegistryInner { table, directory }),
        }
    }

    /// Registers a new connection and assigns it a fresh id.
    pub fn register(&self, tx: mpsc::UnboundedSender<SignalMessage>) -> ParticipantId {
        let participant_id = ParticipantId::new();
        let handle = ConnectionHandle::new(participant_id, tx);
        self.inner.table.connections.insert(participant_id, handle);

        info!("Registered connection {}", participant_id);
        participant_id
    }

    /// Drops the connection and its room membership. Returns what was known
    /// about the participant, or `None` if it was not registered.
    pub fn unregister(&self, participant_id: &ParticipantId) -> Option<Participant> {
        let (_, _handle) = self.inner.table.connections.remove(participant_id)?;

        let member = self.inner.directory.member(participant_id);
        let room_id = self.inner.directory.leave(participant_id);

        info!(
            "Unregistered connection {} (room: {:?})",
            participant_id, room_id
        );

        Some(Participant {
            id: *participant_id,
            display_label: member.map(|m| m.display_label),
            room_id,
        })
    }

    pub fn lookup(&self, participant_id: &ParticipantId) -> Option<ConnectionHandle> {
        let handle = self.inner.table.get(participant_id);
        if handle.is_none() {
            debug!("Lookup miss for {}", participant_id);
        }
        handle
    }

    pub fn participant(&self, participant_id: &ParticipantId) -> Option<Participant> {
        if !self.inner.table.connections.contains_key(participant_id) {
            return None;
        }

        let member = self.inner.directory.member(participant_id);
        Some(Participant {
            id: *participant_id,
            room_id: self.inner.directory.room_of(participant_id),
            display_label: member.map(|m| m.display_label),
        })
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.inner.directory
    }

    pub fn connection_count(&self) -> usize {
        self.inner.table.len()
    }
}

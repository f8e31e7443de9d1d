use crate::room::Room;
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use vaarta_core::{MemberInfo, ParticipantId, RoomId, SignalError, SignalMessage};

struct DirectoryInner {
    rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    memberships: DashMap<ParticipantId, RoomId>,
    output: Arc<dyn SignalingOutput>,
}

/// Maps room ids to their members and tells members about each other.
///
/// Each room has its own lock, so membership changes within a room are
/// serialized while unrelated rooms proceed independently.
#[derive(Clone)]
pub struct RoomDirectory {
    inner: Arc<DirectoryInner>,
}

impl RoomDirectory {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                rooms: DashMap::new(),
                memberships: DashMap::new(),
                output,
            }),
        }
    }

    /// Admits `participant_id` into `room_id` and returns the roster as it was
    /// before the join. Every prior member receives `member:joined`.
    pub fn join(
        &self,
        participant_id: ParticipantId,
        room_id: RoomId,
        display_label: impl Into<String>,
    ) -> Result<Vec<MemberInfo>, SignalError> {
        if room_id.as_str().trim().is_empty() {
            return Err(SignalError::malformed("room id must not be empty"));
        }

        match self.inner.memberships.entry(participant_id) {
            Entry::Occupied(e) => {
                return Err(SignalError::AlreadyJoined {
                    participant: participant_id,
                    room: e.get().clone(),
                });
            }
            Entry::Vacant(e) => {
                e.insert(room_id.clone());
            }
        }

        let member = MemberInfo::new(participant_id, display_label);

        loop {
            let room = self
                .inner
                .rooms
                .entry(room_id.clone())
                .or_insert_with(|| {
                    info!("Creating new room: {}", room_id);
                    Arc::new(Mutex::new(Room::new(room_id.clone())))
                })
                .clone();

            let mut guard = lock(&room);
            if guard.is_closed() {
                continue;
            }

            let roster = guard.members().to_vec();
            for existing in &roster {
                let notice = SignalMessage::MemberJoined {
                    participant_id,
                    display_label: member.display_label.clone(),
                };
                if !self.inner.output.send(&existing.participant_id, notice) {
                    debug!(
                        "member:joined for {} not delivered, connection already gone",
                        existing.participant_id
                    );
                }
            }
            guard.insert(member);

            info!(
                "Participant {} joined room '{}' ({} members)",
                participant_id,
                guard.id(),
                guard.members().len()
            );
            return Ok(roster);
        }
    }

    /// Removes `participant_id` from its room. A no-op when it is not in one.
    /// Returns the room it left.
    pub fn leave(&self, participant_id: &ParticipantId) -> Option<RoomId> {
        let (_, room_id) = self.inner.memberships.remove(participant_id)?;

        let Some(room) = self.inner.rooms.get(&room_id).map(|r| Arc::clone(r.value())) else {
            return Some(room_id);
        };

        let mut guard = lock(&room);
        let Some(departed) = guard.remove(participant_id) else {
            return Some(room_id);
        };

        for remaining in guard.members() {
            let notice = SignalMessage::MemberLeft {
                participant_id: departed.participant_id,
                display_label: departed.display_label.clone(),
            };
            self.inner.output.send(&remaining.participant_id, notice);
        }

        info!("Participant {} left room '{}'", participant_id, room_id);

        if guard.is_empty() {
            guard.close();
            self.inner
                .rooms
                .remove_if(&room_id, |_, current| Arc::ptr_eq(current, &room));
            info!("Room '{}' is empty, removed", guard.id());
        }

        Some(room_id)
    }

    pub fn room_of(&self, participant_id: &ParticipantId) -> Option<RoomId> {
        self.inner
            .memberships
            .get(participant_id)
            .map(|r| r.value().clone())
    }

    /// Current members of `room_id` in join order, or `None` if the room
    /// does not exist.
    pub fn roster(&self, room_id: &RoomId) -> Option<Vec<MemberInfo>> {
        let room = self.inner.rooms.get(room_id).map(|r| Arc::clone(r.value()))?;
        let guard = lock(&room);
        Some(guard.members().to_vec())
    }

    pub fn member(&self, participant_id: &ParticipantId) -> Option<MemberInfo> {
        let room_id = self.room_of(participant_id)?;
        self.roster(&room_id)?
            .into_iter()
            .find(|m| &m.participant_id == participant_id)
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}

fn lock(room: &Mutex<Room>) -> MutexGuard<'_, Room> {
    room.lock().unwrap_or_else(PoisonError::into_inner)
}

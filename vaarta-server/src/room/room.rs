use vaarta_core::{MemberInfo, ParticipantId, RoomId};

/// Membership of one room. Always accessed under the room's own lock.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: Vec<MemberInfo>,
    closed: bool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Vec::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Members in join order.
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.members
            .iter()
            .any(|m| &m.participant_id == participant_id)
    }

    pub fn insert(&mut self, member: MemberInfo) {
        if !self.contains(&member.participant_id) {
            self.members.push(member);
        }
    }

    pub fn remove(&mut self, participant_id: &ParticipantId) -> Option<MemberInfo> {
        let idx = self
            .members
            .iter()
            .position(|m| &m.participant_id == participant_id)?;
        Some(self.members.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A closed room has been unlinked from the directory; joiners that raced
    /// with the last leave must retry against a fresh entry.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

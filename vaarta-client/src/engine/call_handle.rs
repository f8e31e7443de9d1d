use futures::future::AbortHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use crate::media::LocalTrack;
use vaarta_core::{ParticipantId, RoomId};

/// Commands from the UI into the engine.
#[derive(Clone)]
pub enum Command {
    Join { room_id: RoomId, display_label: String },
    Leave,
    Call(ParticipantId),
    EndCall(ParticipantId),
    Chat { to: ParticipantId, text: String },
    AddTrack { remote_id: ParticipantId, track: LocalTrack },
}

/// In-flight `start_call`/`receive_offer` work, keyed by remote.
pub(crate) type InFlight = Arc<Mutex<HashMap<ParticipantId, AbortHandle>>>;

/// UI-facing control surface of a [`crate::CallEngine`]. Cheap to clone.
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::UnboundedSender<Command>,
    in_flight: InFlight,
}

impl CallHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, in_flight: InFlight) -> Self {
        Self {
            commands,
            in_flight,
        }
    }

    /// Returns `false` once the engine has stopped.
    fn send(&self, cmd: Command) -> bool {
        self.commands.send(cmd).is_ok()
    }

    pub fn join(&self, room_id: impl Into<RoomId>, display_label: impl Into<String>) -> bool {
        self.send(Command::Join {
            room_id: room_id.into(),
            display_label: display_label.into(),
        })
    }

    pub fn leave(&self) -> bool {
        self.send(Command::Leave)
    }

    pub fn call(&self, remote_id: ParticipantId) -> bool {
        self.send(Command::Call(remote_id))
    }

    /// Aborts any offer/answer generation still running for `remote_id`,
    /// then tears the session down.
    pub fn end_call(&self, remote_id: ParticipantId) -> bool {
        if let Some(abort) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&remote_id)
        {
            abort.abort();
        }
        self.send(Command::EndCall(remote_id))
    }

    /// Starts sending `track` on the call with `remote_id`; the call is
    /// renegotiated once the platform asks for it.
    pub fn add_track(&self, remote_id: ParticipantId, track: LocalTrack) -> bool {
        self.send(Command::AddTrack { remote_id, track })
    }

    pub fn send_chat(&self, to: ParticipantId, text: impl Into<String>) -> bool {
        self.send(Command::Chat {
            to,
            text: text.into(),
        })
    }
}

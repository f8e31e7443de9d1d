use crate::engine::{CallHandle, ClientEvent, Command, InFlight};
use crate::media::{MediaEvent, MediaEventSink, MediaPeerFactory, SessionTag};
use crate::negotiation::{NegotiationError, NegotiationSession, NegotiationState, Outbox};
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vaarta_core::{
    ErrorKind, IceServerConfig, MemberInfo, ParticipantId, PeerBody, RoomId, SignalError,
    SignalMessage, SignalingMessage,
};

/// One participant's client: roster, one negotiation session per remote, and
/// the glue between relay frames, UI commands and the platform peers.
///
/// Runs as a single task; all session work happens in arrival order.
pub struct CallEngine {
    local_id: Option<ParticipantId>,
    room_id: Option<RoomId>,
    roster: Vec<MemberInfo>,
    sessions: HashMap<ParticipantId, NegotiationSession>,
    generations: HashMap<ParticipantId, u64>,
    next_generation: u64,
    ice_servers: Vec<IceServerConfig>,
    factory: Arc<dyn MediaPeerFactory>,
    inbound: mpsc::UnboundedReceiver<SignalMessage>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    commands: mpsc::UnboundedReceiver<Command>,
    media_tx: mpsc::UnboundedSender<(SessionTag, MediaEvent)>,
    media_rx: mpsc::UnboundedReceiver<(SessionTag, MediaEvent)>,
    events: mpsc::UnboundedSender<ClientEvent>,
    in_flight: InFlight,
}

impl CallEngine {
    /// `inbound` carries frames from the relay, `outbound` takes frames for it.
    pub fn new(
        factory: Arc<dyn MediaPeerFactory>,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
    ) -> (Self, CallHandle, mpsc::UnboundedReceiver<ClientEvent>) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));

        let engine = Self {
            local_id: None,
            room_id: None,
            roster: Vec::new(),
            sessions: HashMap::new(),
            generations: HashMap::new(),
            next_generation: 0,
            ice_servers: Vec::new(),
            factory,
            inbound,
            outbound,
            commands,
            media_tx,
            media_rx,
            events,
            in_flight: in_flight.clone(),
        };

        (engine, CallHandle::new(command_tx, in_flight), events_rx)
    }

    pub async fn run(mut self) {
        info!("Call engine started");

        loop {
            tokio::select! {
                msg = self.inbound.recv() => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            info!("Signaling channel closed. Stopping call engine.");
                            break;
                        }
                    }
                }

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All call handles dropped. Stopping call engine.");
                            break;
                        }
                    }
                }

                Some((tag, event)) = self.media_rx.recv() => {
                    self.handle_media_event(tag, event).await;
                }
            }
        }

        self.shutdown().await;
        info!("Call engine finished");
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        match msg {
            SignalMessage::Welcome { participant_id } => {
                info!("Relay assigned participant id {}", participant_id);
                self.local_id = Some(participant_id);
                self.emit(ClientEvent::Connected { participant_id });
            }

            SignalMessage::IceConfig { ice_servers } => {
                debug!("Received ICE config: {} servers", ice_servers.len());
                self.ice_servers = ice_servers;
            }

            SignalMessage::RoomJoin {
                room_id, roster, ..
            } => {
                info!("Joined room '{}' with {} members", room_id, roster.len());
                self.room_id = Some(room_id.clone());
                self.roster = roster.clone();
                self.emit(ClientEvent::Joined { room_id, roster });
            }

            SignalMessage::MemberJoined {
                participant_id,
                display_label,
            } => {
                let member = MemberInfo::new(participant_id, display_label);
                if !self.is_member(&participant_id) {
                    self.roster.push(member.clone());
                }
                self.emit(ClientEvent::MemberJoined(member));
            }

            SignalMessage::MemberLeft {
                participant_id,
                display_label,
            } => {
                self.roster.retain(|m| m.participant_id != participant_id);
                if let Some(mut session) = self.take_session(&participant_id) {
                    session.peer_disconnected().await;
                    self.emit(ClientEvent::CallState {
                        remote_id: participant_id,
                        state: NegotiationState::Idle,
                    });
                }
                self.emit(ClientEvent::MemberLeft(MemberInfo::new(
                    participant_id,
                    display_label,
                )));
            }

            SignalMessage::Error {
                kind,
                message,
                peer,
            } => {
                warn!("Relay reported {:?}: {}", kind, message);
                if kind == ErrorKind::PeerUnreachable {
                    if let Some(remote_id) = peer {
                        self.fail_session(remote_id, message.clone()).await;
                    }
                }
                self.emit(ClientEvent::Error { kind, message });
            }

            other => match SignalingMessage::from_signal(other) {
                Ok(peer_msg) => self.handle_peer_message(peer_msg).await,
                Err(other) => warn!("Unexpected {} from relay", other.event_name()),
            },
        }
    }

    async fn handle_peer_message(&mut self, msg: SignalingMessage) {
        if self.local_id != Some(msg.to) {
            warn!("Dropping {} addressed to {}", msg.kind(), msg.to);
            return;
        }
        let from = msg.from;

        match msg.body {
            PeerBody::Chat(text) => self.emit(ClientEvent::Chat { from, text }),

            PeerBody::Offer(offer) => {
                if let Err(e) = self.ensure_session(from).await {
                    self.settle(from, NegotiationState::Idle, Err(e)).await;
                    return;
                }
                let registration = self.track_in_flight(from);
                let Some(session) = self.sessions.get_mut(&from) else {
                    return;
                };
                let before = session.state();
                let result = Abortable::new(session.receive_offer(from, offer), registration)
                    .await
                    .unwrap_or(Err(NegotiationError::Cancelled));
                self.clear_in_flight(&from);
                self.settle(from, before, result).await;
            }

            PeerBody::Answer(answer) => {
                let Some(session) = self.sessions.get_mut(&from) else {
                    warn!("call:answer from {} with no call in progress", from);
                    return;
                };
                let before = session.state();
                let result = session.receive_answer(from, answer).await;
                self.settle(from, before, result).await;
            }

            PeerBody::RenegoOffer(description) => {
                let Some(session) = self.sessions.get_mut(&from) else {
                    warn!("renego:offer from {} with no call in progress", from);
                    return;
                };
                let before = session.state();
                let result = session.receive_renego_offer(from, description).await;
                self.settle(from, before, result).await;
            }

            PeerBody::RenegoAnswer(description) => {
                let Some(session) = self.sessions.get_mut(&from) else {
                    warn!("renego:answer from {} with no call in progress", from);
                    return;
                };
                let before = session.state();
                let result = session.receive_renego_answer(from, description).await;
                self.settle(from, before, result).await;
            }

            PeerBody::IceCandidate(candidate) => {
                let Some(session) = self.sessions.get_mut(&from) else {
                    debug!("Dropped candidate from {}: no call in progress", from);
                    return;
                };
                if let Err(e) = session.receive_ice_candidate(from, candidate).await {
                    warn!("Ignoring candidate from {}: {}", from, e);
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Join {
                room_id,
                display_label,
            } => self.send_signal(SignalMessage::RoomJoin {
                room_id,
                participant_id: self.local_id,
                display_label,
                roster: vec![],
            }),

            Command::Leave => {
                self.send_signal(SignalMessage::RoomLeave {});
                self.room_id = None;
                self.roster.clear();
            }

            Command::Call(remote_id) => self.start_call(remote_id).await,

            Command::EndCall(remote_id) => {
                if let Some(mut session) = self.take_session(&remote_id) {
                    session.end().await;
                    self.emit(ClientEvent::CallState {
                        remote_id,
                        state: NegotiationState::Idle,
                    });
                }
            }

            Command::Chat { to, text } => {
                let Some(from) = self.local_id else {
                    warn!("Chat dropped: not connected yet");
                    return;
                };
                self.send_signal(SignalMessage::ChatMessage { to, from, text });
            }

            Command::AddTrack { remote_id, track } => {
                let Some(session) = self.sessions.get_mut(&remote_id) else {
                    warn!("Cannot add track: no call with {}", remote_id);
                    self.emit(ClientEvent::CallFailed {
                        remote_id,
                        reason: format!("no call in progress with {remote_id}"),
                    });
                    return;
                };
                let before = session.state();
                let result = session.add_track(track).await.map(|()| Vec::new());
                self.settle(remote_id, before, result).await;
            }
        }
    }

    async fn start_call(&mut self, remote_id: ParticipantId) {
        if !self.is_member(&remote_id) {
            let err = SignalError::NoRemotePeer(remote_id);
            warn!("Cannot call: {}", err);
            self.emit(ClientEvent::CallFailed {
                remote_id,
                reason: err.to_string(),
            });
            return;
        }

        if let Err(e) = self.ensure_session(remote_id).await {
            self.settle(remote_id, NegotiationState::Idle, Err(e)).await;
            return;
        }

        let registration = self.track_in_flight(remote_id);
        let Some(session) = self.sessions.get_mut(&remote_id) else {
            return;
        };
        let before = session.state();
        let result = Abortable::new(session.start_call(), registration)
            .await
            .unwrap_or(Err(NegotiationError::Cancelled));
        self.clear_in_flight(&remote_id);
        self.settle(remote_id, before, result).await;
    }

    async fn handle_media_event(&mut self, tag: SessionTag, event: MediaEvent) {
        let remote_id = tag.remote_id;
        if self.generations.get(&remote_id) != Some(&tag.generation) {
            debug!(
                "Dropped {:?} from a replaced peer connection with {}",
                event, remote_id
            );
            return;
        }

        match event {
            MediaEvent::NegotiationNeeded => {
                let Some(session) = self.sessions.get_mut(&remote_id) else {
                    return;
                };
                let before = session.state();
                let result = session.negotiation_needed().await;
                self.settle(remote_id, before, result).await;
            }

            MediaEvent::TrackReceived {
                track_id,
                stream_id,
            } => {
                info!("Remote track {} from {}", track_id, remote_id);
                self.emit(ClientEvent::RemoteTrack {
                    remote_id,
                    track_id,
                    stream_id,
                });
            }

            MediaEvent::LocalCandidate(candidate) => {
                let (Some(from), Some(session)) = (self.local_id, self.sessions.get(&remote_id))
                else {
                    return;
                };
                if session.state().accepts_candidates() {
                    self.send_signal(SignalMessage::IceCandidate {
                        to: remote_id,
                        from,
                        candidate,
                    });
                }
            }

            MediaEvent::ConnectionLost => {
                self.fail_session(remote_id, "peer connection lost".to_owned())
                    .await;
            }
        }
    }

    async fn ensure_session(&mut self, remote_id: ParticipantId) -> Result<(), NegotiationError> {
        if self.sessions.contains_key(&remote_id) {
            return Ok(());
        }
        let Some(local_id) = self.local_id else {
            return Err(SignalError::malformed("no participant id assigned yet").into());
        };

        self.next_generation += 1;
        let tag = SessionTag {
            remote_id,
            generation: self.next_generation,
        };
        let sink = MediaEventSink::new(tag, self.media_tx.clone());
        let media = self
            .factory
            .create(&self.ice_servers, sink)
            .await
            .map_err(NegotiationError::Media)?;

        self.generations.insert(remote_id, tag.generation);
        self.sessions
            .insert(remote_id, NegotiationSession::new(local_id, remote_id, media));
        Ok(())
    }

    /// Removes the session and forgets its generation, so anything its peer
    /// connection still reports is ignored.
    fn take_session(&mut self, remote_id: &ParticipantId) -> Option<NegotiationSession> {
        self.generations.remove(remote_id);
        self.sessions.remove(remote_id)
    }

    /// Sends what a session produced, or reacts to why it could not.
    async fn settle(
        &mut self,
        remote_id: ParticipantId,
        before: NegotiationState,
        result: Result<Outbox, NegotiationError>,
    ) {
        match result {
            Ok(outbox) => {
                for msg in outbox {
                    self.send_signal(msg);
                }
            }
            Err(NegotiationError::Signal(e)) => {
                warn!("Ignoring message in call with {}: {}", remote_id, e);
            }
            Err(NegotiationError::Cancelled) => {
                info!("Call work with {} cancelled", remote_id);
            }
            Err(NegotiationError::Media(e)) => {
                error!("Call with {} failed: {:#}", remote_id, e);
                self.fail_session(remote_id, format!("{e:#}")).await;
                return;
            }
        }

        if let Some(session) = self.sessions.get(&remote_id) {
            if session.state() != before {
                self.emit(ClientEvent::CallState {
                    remote_id,
                    state: session.state(),
                });
            }
        }
    }

    /// Drops the session so the next call starts from `Idle`.
    async fn fail_session(&mut self, remote_id: ParticipantId, reason: String) {
        if let Some(mut session) = self.take_session(&remote_id) {
            session.end().await;
        }
        self.emit(ClientEvent::CallFailed { remote_id, reason });
    }

    async fn shutdown(&mut self) {
        self.generations.clear();
        for (_, mut session) in self.sessions.drain() {
            session.end().await;
        }
        self.emit(ClientEvent::Disconnected);
    }

    fn track_in_flight(&self, remote_id: ParticipantId) -> AbortRegistration {
        let (handle, registration) = AbortHandle::new_pair();
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(remote_id, handle);
        registration
    }

    fn clear_in_flight(&self, remote_id: &ParticipantId) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(remote_id);
    }

    fn is_member(&self, participant_id: &ParticipantId) -> bool {
        self.roster
            .iter()
            .any(|m| &m.participant_id == participant_id)
    }

    fn send_signal(&self, msg: SignalMessage) {
        debug!("Sending {}", msg.event_name());
        if self.outbound.send(msg).is_err() {
            warn!("Signaling connection closed, frame dropped");
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

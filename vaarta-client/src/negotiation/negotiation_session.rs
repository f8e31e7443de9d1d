use crate::media::{LocalTrack, MediaPeer};
use crate::negotiation::{NegotiationError, NegotiationState};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vaarta_core::{IceCandidate, ParticipantId, SessionDescription, SignalError, SignalMessage};

/// Frames a session wants sent to its remote, in order.
pub type Outbox = Vec<SignalMessage>;

/// One side of a call with a single remote participant.
///
/// Every handler validates first and mutates after, so a rejected message
/// (`NegotiationError::Signal`) never changes the state.
pub struct NegotiationSession {
    local_id: ParticipantId,
    remote_id: ParticipantId,
    state: NegotiationState,
    pending_local_offer: bool,
    pending_remote_offer: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    renegotiate_when_connected: bool,
    media: Arc<dyn MediaPeer>,
}

impl NegotiationSession {
    pub fn new(local_id: ParticipantId, remote_id: ParticipantId, media: Arc<dyn MediaPeer>) -> Self {
        Self {
            local_id,
            remote_id,
            state: NegotiationState::Idle,
            pending_local_offer: false,
            pending_remote_offer: None,
            remote_description: None,
            renegotiate_when_connected: false,
            media,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    pub fn remote_id(&self) -> ParticipantId {
        self.remote_id
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn has_pending_local_offer(&self) -> bool {
        self.pending_local_offer
    }

    /// Last description received from the remote and applied.
    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    /// Smaller participant id keeps its offer when both sides offer at once.
    pub fn wins_glare(&self) -> bool {
        self.local_id < self.remote_id
    }

    /// `Idle -> OfferSent`.
    pub async fn start_call(&mut self) -> Result<Outbox, NegotiationError> {
        if self.state != NegotiationState::Idle {
            return Err(SignalError::malformed(format!(
                "cannot start a call with {} while {}",
                self.remote_id, self.state
            ))
            .into());
        }

        let offer = self
            .media
            .create_offer()
            .await
            .map_err(NegotiationError::Media)?;

        self.pending_local_offer = true;
        self.transition(NegotiationState::OfferSent);

        Ok(vec![SignalMessage::CallOffer {
            to: self.remote_id,
            from: self.local_id,
            offer,
        }])
    }

    /// `Idle -> OfferReceived -> Connected`, answering the remote's offer.
    ///
    /// In `OfferSent` both sides called each other; the glare rule decides
    /// whose offer survives.
    pub async fn receive_offer(
        &mut self,
        from: ParticipantId,
        offer: SessionDescription,
    ) -> Result<Outbox, NegotiationError> {
        self.check_sender(from)?;
        if !offer.is_offer() {
            return Err(SignalError::malformed("call:offer carried an answer").into());
        }

        match self.state {
            NegotiationState::Idle | NegotiationState::Connected => {}
            NegotiationState::OfferSent => {
                if self.wins_glare() {
                    info!(
                        "Call glare with {}: keeping our offer, ignoring theirs",
                        self.remote_id
                    );
                    return Ok(vec![]);
                }
                info!(
                    "Call glare with {}: dropping our offer to answer theirs",
                    self.remote_id
                );
                self.discard_local_offer().await?;
            }
            NegotiationState::OfferReceived | NegotiationState::Renegotiating => {
                return Err(SignalError::malformed(format!(
                    "call:offer from {} while {}",
                    from, self.state
                ))
                .into());
            }
        }

        self.pending_remote_offer = Some(offer.clone());
        self.transition(NegotiationState::OfferReceived);

        let answer = match self.media.create_answer(&offer).await {
            Ok(answer) => answer,
            Err(e) => {
                self.pending_remote_offer = None;
                self.transition(NegotiationState::Idle);
                return Err(NegotiationError::Media(e));
            }
        };

        self.pending_remote_offer = None;
        self.remote_description = Some(offer);
        self.transition(NegotiationState::Connected);

        let mut outbox = vec![SignalMessage::CallAnswer {
            to: self.remote_id,
            from: self.local_id,
            answer,
        }];
        outbox.extend(self.flush_deferred_renegotiation().await?);
        Ok(outbox)
    }

    /// `OfferSent -> Connected`.
    pub async fn receive_answer(
        &mut self,
        from: ParticipantId,
        answer: SessionDescription,
    ) -> Result<Outbox, NegotiationError> {
        self.check_sender(from)?;
        if self.state != NegotiationState::OfferSent || !self.pending_local_offer {
            return Err(SignalError::malformed(format!(
                "call:answer from {} with no outstanding offer ({})",
                from, self.state
            ))
            .into());
        }

        self.media
            .set_remote_description(&answer)
            .await
            .map_err(NegotiationError::Media)?;

        self.pending_local_offer = false;
        self.remote_description = Some(answer);
        self.transition(NegotiationState::Connected);

        self.flush_deferred_renegotiation().await
    }

    /// The platform asked for a new description.
    ///
    /// Only a connected session renegotiates right away. While the initial
    /// exchange or another renegotiation is in flight the request is held
    /// until the session is connected again.
    pub async fn negotiation_needed(&mut self) -> Result<Outbox, NegotiationError> {
        match self.state {
            NegotiationState::Idle => {
                debug!("Negotiation needed with {} ignored, no call", self.remote_id);
                Ok(vec![])
            }
            NegotiationState::OfferSent
            | NegotiationState::OfferReceived
            | NegotiationState::Renegotiating => {
                debug!(
                    "Negotiation needed with {} deferred while {}",
                    self.remote_id, self.state
                );
                self.renegotiate_when_connected = true;
                Ok(vec![])
            }
            NegotiationState::Connected => self.send_renegotiation_offer().await,
        }
    }

    /// A `renego:offer` from the remote.
    pub async fn receive_renego_offer(
        &mut self,
        from: ParticipantId,
        description: SessionDescription,
    ) -> Result<Outbox, NegotiationError> {
        self.check_sender(from)?;

        match self.state {
            NegotiationState::Connected => {}
            NegotiationState::Renegotiating if self.pending_local_offer => {
                if self.wins_glare() {
                    info!(
                        "Renegotiation glare with {}: keeping our offer",
                        self.remote_id
                    );
                    return Ok(vec![]);
                }
                info!(
                    "Renegotiation glare with {}: answering their offer instead",
                    self.remote_id
                );
                self.discard_local_offer().await?;
            }
            _ => {
                return Err(SignalError::malformed(format!(
                    "renego:offer from {} while {}",
                    from, self.state
                ))
                .into());
            }
        }

        let answer = self
            .media
            .create_answer(&description)
            .await
            .map_err(NegotiationError::Media)?;

        self.remote_description = Some(description);
        self.transition(NegotiationState::Connected);

        Ok(vec![SignalMessage::RenegoAnswer {
            to: self.remote_id,
            from: self.local_id,
            description: answer,
        }])
    }

    /// `Renegotiating -> Connected`.
    pub async fn receive_renego_answer(
        &mut self,
        from: ParticipantId,
        description: SessionDescription,
    ) -> Result<Outbox, NegotiationError> {
        self.check_sender(from)?;
        if self.state != NegotiationState::Renegotiating || !self.pending_local_offer {
            return Err(SignalError::malformed(format!(
                "renego:answer from {} with no outstanding offer ({})",
                from, self.state
            ))
            .into());
        }

        self.media
            .set_remote_description(&description)
            .await
            .map_err(NegotiationError::Media)?;

        self.pending_local_offer = false;
        self.remote_description = Some(description);
        self.transition(NegotiationState::Connected);

        self.flush_deferred_renegotiation().await
    }

    /// Sends `track` to the remote. The platform follows up with
    /// negotiation-needed, which renegotiates the live call.
    pub async fn add_track(&mut self, track: LocalTrack) -> Result<(), NegotiationError> {
        info!("Adding local track {} for {}", track.id(), self.remote_id);
        self.media
            .add_track(track)
            .await
            .map_err(NegotiationError::Media)
    }

    /// Candidates for a call that never started are dropped; a platform
    /// refusal is logged and ignored.
    pub async fn receive_ice_candidate(
        &mut self,
        from: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        if !self.state.accepts_candidates() {
            debug!("Dropped candidate from {}: no call in progress", from);
            return Ok(());
        }
        self.check_sender(from)?;

        if let Err(e) = self.media.add_ice_candidate(&candidate).await {
            warn!("Failed to add ICE candidate from {}: {:?}", from, e);
        }
        Ok(())
    }

    /// The remote left. Any pending offer is discarded.
    pub async fn peer_disconnected(&mut self) {
        info!("Peer {} disconnected", self.remote_id);
        self.reset().await;
    }

    /// Ends the call locally.
    pub async fn end(&mut self) {
        info!("Ending call with {}", self.remote_id);
        self.reset().await;
    }

    async fn reset(&mut self) {
        self.pending_local_offer = false;
        self.pending_remote_offer = None;
        self.renegotiate_when_connected = false;
        self.transition(NegotiationState::Idle);

        if let Err(e) = self.media.close().await {
            warn!("Failed to close peer connection with {}: {:?}", self.remote_id, e);
        }
    }

    async fn send_renegotiation_offer(&mut self) -> Result<Outbox, NegotiationError> {
        let offer = self
            .media
            .create_offer()
            .await
            .map_err(NegotiationError::Media)?;

        self.pending_local_offer = true;
        self.transition(NegotiationState::Renegotiating);

        Ok(vec![SignalMessage::RenegoOffer {
            to: self.remote_id,
            from: self.local_id,
            description: offer,
        }])
    }

    async fn flush_deferred_renegotiation(&mut self) -> Result<Outbox, NegotiationError> {
        if self.state != NegotiationState::Connected || !self.renegotiate_when_connected {
            return Ok(vec![]);
        }
        self.renegotiate_when_connected = false;
        self.send_renegotiation_offer().await
    }

    async fn discard_local_offer(&mut self) -> Result<(), NegotiationError> {
        self.media
            .rollback()
            .await
            .map_err(NegotiationError::Media)?;
        self.pending_local_offer = false;
        Ok(())
    }

    fn check_sender(&self, from: ParticipantId) -> Result<(), SignalError> {
        if from != self.remote_id {
            return Err(SignalError::UnexpectedPeer {
                expected: self.remote_id,
                actual: from,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: NegotiationState) {
        if self.state != next {
            debug!(
                "Session {} -> {}: {} -> {}",
                self.local_id, self.remote_id, self.state, next
            );
            self.state = next;
        }
    }
}

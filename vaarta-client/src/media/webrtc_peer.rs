use crate::media::{LocalTrack, MediaEvent, MediaEventSink, MediaPeer, MediaPeerFactory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use vaarta_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use webrtc::api::{API, APIBuilder};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// [`MediaPeer`] backed by a webrtc-rs `RTCPeerConnection`.
///
/// webrtc-rs cannot roll back a local offer, so a withdrawn offer is handled
/// here: a connection that never completed a negotiation is replaced by a
/// fresh one, and a live connection settles the offer against the remote's
/// current description.
pub struct WebrtcMediaPeer {
    api: API,
    config: RTCConfiguration,
    events: MediaEventSink,
    connection: RwLock<Connection>,
    tracks: Mutex<Vec<LocalTrack>>,
}

/// One underlying peer connection. Its handlers go quiet once `live` is
/// cleared.
struct Connection {
    peer_connection: Arc<RTCPeerConnection>,
    live: Arc<AtomicBool>,
}

impl Connection {
    fn retire(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl WebrtcMediaPeer {
    pub async fn new(ice_servers: &[IceServerConfig], events: MediaEventSink) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let connection = open_connection(&api, config.clone(), &events).await?;

        Ok(Self {
            api,
            config,
            events,
            connection: RwLock::new(connection),
            tracks: Mutex::new(Vec::new()),
        })
    }

    /// The connection currently carrying the session. A withdrawn initial
    /// offer replaces it.
    pub async fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&self.connection.read().await.peer_connection)
    }

    /// Swaps in a fresh connection with the same configuration and local
    /// tracks, closing the old one without reporting it as lost.
    async fn replace_connection(&self) -> Result<()> {
        let fresh = open_connection(&self.api, self.config.clone(), &self.events).await?;
        for track in self.tracks.lock().await.iter() {
            fresh
                .peer_connection
                .add_track(Arc::clone(track))
                .await
                .context("Failed to re-add track")?;
        }

        let old = {
            let mut connection = self.connection.write().await;
            std::mem::replace(&mut *connection, fresh)
        };
        old.retire();
        if let Err(e) = old.peer_connection.close().await {
            warn!("Failed to close replaced peer connection: {:?}", e);
        }
        Ok(())
    }
}

async fn open_connection(
    api: &API,
    config: RTCConfiguration,
    events: &MediaEventSink,
) -> Result<Connection> {
    let peer_connection = Arc::new(
        api.new_peer_connection(config)
            .await
            .context("Failed to create peer connection")?,
    );
    let live = Arc::new(AtomicBool::new(true));
    let remote = events.remote_id();

    let (state_events, state_live) = (events.clone(), Arc::clone(&live));
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let events = state_events.clone();
            let live = Arc::clone(&state_live);
            Box::pin(async move {
                if !live.load(Ordering::SeqCst) {
                    return;
                }
                info!("Peer connection with {} is {:?}", remote, s);
                if matches!(
                    s,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    events.emit(MediaEvent::ConnectionLost);
                }
            })
        },
    ));

    let (ice_events, ice_live) = (events.clone(), Arc::clone(&live));
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let events = ice_events.clone();
        let live = Arc::clone(&ice_live);
        Box::pin(async move {
            let Some(candidate) = c else { return };
            if !live.load(Ordering::SeqCst) {
                return;
            }
            let Ok(init) = candidate.to_json() else {
                return;
            };
            events.emit(MediaEvent::LocalCandidate(IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
            }));
        })
    }));

    let (nego_events, nego_live) = (events.clone(), Arc::clone(&live));
    peer_connection.on_negotiation_needed(Box::new(move || {
        let events = nego_events.clone();
        let live = Arc::clone(&nego_live);
        Box::pin(async move {
            if !live.load(Ordering::SeqCst) {
                return;
            }
            debug!("Negotiation needed with {}", remote);
            events.emit(MediaEvent::NegotiationNeeded);
        })
    }));

    let (track_events, track_live) = (events.clone(), Arc::clone(&live));
    peer_connection.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            let events = track_events.clone();
            let live = Arc::clone(&track_live);
            Box::pin(async move {
                if !live.load(Ordering::SeqCst) {
                    return;
                }
                events.emit(MediaEvent::TrackReceived {
                    track_id: track.id(),
                    stream_id: track.stream_id(),
                });
            })
        },
    ));

    Ok(Connection {
        peer_connection,
        live,
    })
}

fn to_rtc(description: &SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp.clone())?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp.clone())?,
    };
    Ok(desc)
}

#[async_trait]
impl MediaPeer for WebrtcMediaPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let pc = self.peer_connection().await;
        let offer = pc.create_offer(None).await?;
        pc.set_local_description(offer.clone()).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self, remote: &SessionDescription) -> Result<SessionDescription> {
        let pc = self.peer_connection().await;
        pc.set_remote_description(to_rtc(remote)?)
            .await
            .context("Failed to apply remote offer")?;

        let answer = pc.create_answer(None).await?;
        pc.set_local_description(answer.clone()).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, description: &SessionDescription) -> Result<()> {
        self.peer_connection()
            .await
            .set_remote_description(to_rtc(description)?)
            .await
            .context("Failed to apply remote description")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.peer_connection().await.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        self.peer_connection()
            .await
            .add_track(Arc::clone(&track))
            .await
            .context("Failed to add track")?;
        self.tracks.lock().await.push(track);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let pc = self.peer_connection().await;
        if pc.signaling_state() != RTCSignalingState::HaveLocalOffer {
            debug!("No pending local offer to withdraw");
            return Ok(());
        }

        match pc.current_remote_description().await {
            None => {
                debug!("Replacing peer connection to withdraw the initial offer");
                self.replace_connection()
                    .await
                    .context("Failed to withdraw initial offer")
            }
            Some(current) => {
                // Settling against the remote's current description leaves
                // the negotiated session as it was before the offer.
                let settle = RTCSessionDescription::answer(current.sdp)?;
                pc.set_remote_description(settle)
                    .await
                    .context("Failed to withdraw renegotiation offer")?;
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection().await.close().await?;
        Ok(())
    }
}

/// Builds a [`WebrtcMediaPeer`] per remote and attaches the configured local
/// tracks to each.
#[derive(Default, Clone)]
pub struct WebrtcPeerFactory {
    local_tracks: Vec<LocalTrack>,
}

impl WebrtcPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, track: LocalTrack) -> Self {
        self.local_tracks.push(track);
        self
    }
}

#[async_trait]
impl MediaPeerFactory for WebrtcPeerFactory {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: MediaEventSink,
    ) -> Result<Arc<dyn MediaPeer>> {
        let peer = WebrtcMediaPeer::new(ice_servers, events).await?;
        for track in &self.local_tracks {
            if let Err(e) = peer.add_track(Arc::clone(track)).await {
                warn!("Skipping local track: {:?}", e);
            }
        }
        Ok(Arc::new(peer))
    }
}

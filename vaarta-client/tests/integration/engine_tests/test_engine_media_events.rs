use crate::utils::{FakeFactory, audio_track};
use vaarta_client::{ClientEvent, MediaEvent, NegotiationState};
use vaarta_core::{IceCandidate, MemberInfo, SessionDescription, SignalMessage};

use super::EngineHarness;
use crate::integration::{init_tracing, ordered_ids, wait_for};

#[tokio::test]
async fn test_local_candidates_are_sent_to_the_remote() {
    init_tracing();

    let mut h = EngineHarness::start(FakeFactory::new());
    let (local, remote) = ordered_ids();
    h.enter_room(local, vec![MemberInfo::new(remote, "bob")]).await;

    h.handle.call(remote);
    assert!(matches!(h.next_outbound().await, SignalMessage::CallOffer { .. }));

    let candidate = IceCandidate::new("candidate:1 1 UDP 1 10.0.0.1 4000 typ host");
    h.factory.peers()[0].emit(MediaEvent::LocalCandidate(candidate.clone()));

    assert_eq!(
        h.next_outbound().await,
        SignalMessage::IceCandidate {
            to: remote,
            from: local,
            candidate,
        }
    );
}

#[tokio::test]
async fn test_negotiation_needed_triggers_renego_offer() {
    init_tracing();

    let mut h = EngineHarness::start(FakeFactory::new());
    let (local, remote) = ordered_ids();
    h.enter_room(local, vec![MemberInfo::new(remote, "bob")]).await;

    h.inbound
        .send(SignalMessage::CallOffer {
            to: local,
            from: remote,
            offer: SessionDescription::offer("v=0 bob"),
        })
        .unwrap();
    assert!(matches!(h.next_outbound().await, SignalMessage::CallAnswer { .. }));

    h.factory.peers()[0].emit(MediaEvent::NegotiationNeeded);

    assert!(matches!(
        h.next_outbound().await,
        SignalMessage::RenegoOffer { to, .. } if to == remote
    ));
    wait_for(&mut h.events, |e| {
        matches!(e, ClientEvent::CallState { state: NegotiationState::Renegotiating, .. })
    })
    .await;
}

#[tokio::test]
async fn test_remote_tracks_and_lost_connections_surface_as_events() {
    init_tracing();

    let mut h = EngineHarness::start(FakeFactory::new());
    let (local, remote) = ordered_ids();
    h.enter_room(local, vec![MemberInfo::new(remote, "bob")]).await;

    h.handle.call(remote);
    assert!(matches!(h.next_outbound().await, SignalMessage::CallOffer { .. }));
    let peer = h.factory.peers()[0].clone();

    peer.emit(MediaEvent::TrackReceived {
        track_id: "audio".into(),
        stream_id: "bob-stream".into(),
    });
    let event = wait_for(&mut h.events, |e| matches!(e, ClientEvent::RemoteTrack { .. })).await;
    assert_eq!(
        event,
        ClientEvent::RemoteTrack {
            remote_id: remote,
            track_id: "audio".into(),
            stream_id: "bob-stream".into(),
        }
    );

    peer.emit(MediaEvent::ConnectionLost);
    wait_for(&mut h.events, |e| {
        matches!(e, ClientEvent::CallFailed { remote_id, .. } if *remote_id == remote)
    })
    .await;
    assert!(peer.called("close"));
}

#[tokio::test]
async fn test_adding_a_track_renegotiates_the_call() {
    init_tracing();

    let mut h = EngineHarness::start(FakeFactory::new());
    let (local, remote) = ordered_ids();
    h.enter_room(local, vec![MemberInfo::new(remote, "bob")]).await;

    h.inbound
        .send(SignalMessage::CallOffer {
            to: local,
            from: remote,
            offer: SessionDescription::offer("v=0 bob"),
        })
        .unwrap();
    assert!(matches!(h.next_outbound().await, SignalMessage::CallAnswer { .. }));

    assert!(h.handle.add_track(remote, audio_track("mic")));

    assert!(matches!(
        h.next_outbound().await,
        SignalMessage::RenegoOffer { to, from, .. } if to == remote && from == local
    ));
    assert!(h.factory.peers()[0].called("add_track mic"));

    h.inbound
        .send(SignalMessage::RenegoAnswer {
            to: local,
            from: remote,
            description: SessionDescription::answer("v=0 bob with mic"),
        })
        .unwrap();
    wait_for(&mut h.events, |e| {
        matches!(e, ClientEvent::CallState { state: NegotiationState::Renegotiating, .. })
    })
    .await;
    wait_for(&mut h.events, |e| {
        matches!(e, ClientEvent::CallState { state: NegotiationState::Connected, .. })
    })
    .await;
    assert!(h.factory.peers()[0].called("set_remote_description v=0 bob with mic"));
}

#[tokio::test]
async fn test_adding_a_track_without_a_call_fails() {
    init_tracing();

    let mut h = EngineHarness::start(FakeFactory::new());
    let (local, remote) = ordered_ids();
    h.enter_room(local, vec![MemberInfo::new(remote, "bob")]).await;

    h.handle.add_track(remote, audio_track("mic"));

    let event = wait_for(&mut h.events, |e| matches!(e, ClientEvent::CallFailed { .. })).await;
    assert!(matches!(event, ClientEvent::CallFailed { remote_id, .. } if remote_id == remote));
    assert!(h.outbound.try_recv().is_err());
}

use crate::utils::{FakeBehavior, FakeMediaPeer};
use vaarta_client::{NegotiationError, NegotiationSession, NegotiationState};
use vaarta_core::{ErrorKind, IceCandidate, ParticipantId, SessionDescription};

use super::session;
use crate::integration::{init_tracing, ordered_ids};

fn signal_kind(err: NegotiationError) -> ErrorKind {
    match err {
        NegotiationError::Signal(e) => e.kind(),
        other => panic!("expected a signal error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_answer_without_offer_is_malformed() {
    init_tracing();

    let (a, b) = ordered_ids();
    let (mut s, media) = session(a, b, "a");

    let err = s
        .receive_answer(b, SessionDescription::answer("v=0"))
        .await
        .unwrap_err();

    assert_eq!(signal_kind(err), ErrorKind::MalformedMessage);
    assert_eq!(s.state(), NegotiationState::Idle);
    assert!(media.calls().is_empty());
}

#[tokio::test]
async fn test_offer_from_a_stranger_is_rejected() {
    init_tracing();

    let (a, b) = ordered_ids();
    let (mut s, _) = session(a, b, "a");
    s.start_call().await.unwrap();

    let stranger = ParticipantId::new();
    let err = s
        .receive_offer(stranger, SessionDescription::offer("v=0"))
        .await
        .unwrap_err();

    assert_eq!(signal_kind(err), ErrorKind::UnexpectedPeer);
    assert_eq!(s.state(), NegotiationState::OfferSent);
    assert!(s.has_pending_local_offer());
}

#[tokio::test]
async fn test_candidate_from_a_stranger_is_rejected_during_a_call() {
    init_tracing();

    let (a, b) = ordered_ids();
    let (mut s, media) = session(a, b, "a");
    s.start_call().await.unwrap();

    let err = s
        .receive_ice_candidate(ParticipantId::new(), IceCandidate::new("candidate:x"))
        .await
        .unwrap_err();

    assert_eq!(signal_kind(err), ErrorKind::UnexpectedPeer);
    assert!(!media.called("add_ice_candidate"));
}

#[tokio::test]
async fn test_second_start_call_is_rejected() {
    init_tracing();

    let (a, b) = ordered_ids();
    let (mut s, _) = session(a, b, "a");
    s.start_call().await.unwrap();

    let err = s.start_call().await.unwrap_err();
    assert_eq!(signal_kind(err), ErrorKind::MalformedMessage);
    assert_eq!(s.state(), NegotiationState::OfferSent);
}

#[tokio::test]
async fn test_renego_offer_outside_a_call_is_rejected() {
    init_tracing();

    let (a, b) = ordered_ids();
    let (mut s, _) = session(a, b, "a");

    let err = s
        .receive_renego_offer(b, SessionDescription::offer("v=0"))
        .await
        .unwrap_err();

    assert_eq!(signal_kind(err), ErrorKind::MalformedMessage);
    assert_eq!(s.state(), NegotiationState::Idle);
}

#[tokio::test]
async fn test_failed_offer_leaves_session_idle() {
    init_tracing();

    let (a, b) = ordered_ids();
    let media = FakeMediaPeer::with_behavior(
        "a",
        FakeBehavior {
            fail_offers: true,
            ..Default::default()
        },
        None,
    );
    let mut s = NegotiationSession::new(a, b, media);

    let err = s.start_call().await.unwrap_err();
    assert!(matches!(err, NegotiationError::Media(_)));
    assert_eq!(s.state(), NegotiationState::Idle);
    assert!(!s.has_pending_local_offer());
}

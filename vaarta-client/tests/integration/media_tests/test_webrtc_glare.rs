use std::time::Duration;
use vaarta_client::{MediaEvent, MediaPeer, NegotiationState};
use vaarta_core::SignalMessage;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

use super::webrtc_session;
use crate::integration::negotiation_tests::description;
use crate::integration::{init_tracing, ordered_ids};

#[tokio::test]
async fn test_glare_loser_answers_over_webrtc() {
    init_tracing();

    let (low, high) = ordered_ids();
    let (mut winner, winner_peer, _winner_events) = webrtc_session(low, high).await;
    let (mut loser, loser_peer, mut loser_events) = webrtc_session(high, low).await;

    let winner_offer = description(&winner.start_call().await.unwrap()[0]);
    let loser_offer = description(&loser.start_call().await.unwrap()[0]);
    assert_eq!(
        loser_peer.peer_connection().await.signaling_state(),
        RTCSignalingState::HaveLocalOffer
    );

    let outbox = loser.receive_offer(low, winner_offer).await.unwrap();
    assert!(matches!(outbox[0], SignalMessage::CallAnswer { .. }));
    assert_eq!(loser.state(), NegotiationState::Connected);
    assert_eq!(
        loser_peer.peer_connection().await.signaling_state(),
        RTCSignalingState::Stable
    );

    assert!(winner.receive_offer(high, loser_offer).await.unwrap().is_empty());
    winner
        .receive_answer(high, description(&outbox[0]))
        .await
        .unwrap();
    assert_eq!(winner.state(), NegotiationState::Connected);
    assert_eq!(
        winner_peer.peer_connection().await.signaling_state(),
        RTCSignalingState::Stable
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok((_, event)) = loser_events.try_recv() {
        assert_ne!(event, MediaEvent::ConnectionLost);
    }

    winner_peer.close().await.unwrap();
    loser_peer.close().await.unwrap();
}

#[tokio::test]
async fn test_renegotiation_glare_loser_answers_over_webrtc() {
    init_tracing();

    let (low, high) = ordered_ids();
    let (mut winner, winner_peer, _winner_events) = webrtc_session(low, high).await;
    let (mut loser, loser_peer, _loser_events) = webrtc_session(high, low).await;

    let offer = description(&winner.start_call().await.unwrap()[0]);
    let answer = description(&loser.receive_offer(low, offer).await.unwrap()[0]);
    winner.receive_answer(high, answer).await.unwrap();

    let winner_renego = description(&winner.negotiation_needed().await.unwrap()[0]);
    let loser_renego = description(&loser.negotiation_needed().await.unwrap()[0]);

    let outbox = loser
        .receive_renego_offer(low, winner_renego)
        .await
        .unwrap();
    assert!(matches!(outbox[0], SignalMessage::RenegoAnswer { .. }));
    assert_eq!(loser.state(), NegotiationState::Connected);

    assert!(winner.receive_renego_offer(high, loser_renego).await.unwrap().is_empty());
    winner
        .receive_renego_answer(high, description(&outbox[0]))
        .await
        .unwrap();

    assert_eq!(winner.state(), NegotiationState::Connected);
    assert_eq!(
        winner_peer.peer_connection().await.signaling_state(),
        RTCSignalingState::Stable
    );
    assert_eq!(
        loser_peer.peer_connection().await.signaling_state(),
        RTCSignalingState::Stable
    );

    winner_peer.close().await.unwrap();
    loser_peer.close().await.unwrap();
}

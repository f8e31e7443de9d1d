use vaarta_client::{NegotiationSession, NegotiationState};
use vaarta_core::{ParticipantId, SessionDescription};

use super::{description, session};
use crate::integration::{init_tracing, ordered_ids};

/// Which side processes the other's offer first. Frames between one pair
/// stay in order, so the loser's offer always reaches the winner before the
/// loser's answer does.
#[derive(Debug, Clone, Copy)]
enum Arrival {
    WinnerFirst,
    LoserFirst,
}

#[derive(Debug, PartialEq)]
struct Outcome {
    winner_state: NegotiationState,
    loser_state: NegotiationState,
    winner_remote: Option<SessionDescription>,
    loser_remote: Option<SessionDescription>,
    winner_pending: bool,
    loser_pending: bool,
}

impl Outcome {
    fn of(winner: &NegotiationSession, loser: &NegotiationSession) -> Self {
        Self {
            winner_state: winner.state(),
            loser_state: loser.state(),
            winner_remote: winner.remote_description().cloned(),
            loser_remote: loser.remote_description().cloned(),
            winner_pending: winner.has_pending_local_offer(),
            loser_pending: loser.has_pending_local_offer(),
        }
    }
}

fn glare_pair() -> (ParticipantId, ParticipantId, NegotiationSession, NegotiationSession) {
    let (low, high) = ordered_ids();
    let (winner, _) = session(low, high, "low");
    let (loser, _) = session(high, low, "high");
    assert!(winner.wins_glare());
    assert!(!loser.wins_glare());
    (low, high, winner, loser)
}

async fn initial_call_glare(arrival: Arrival) -> Outcome {
    let (low, high, mut winner, mut loser) = glare_pair();

    let winner_offer = description(&winner.start_call().await.unwrap()[0]);
    let loser_offer = description(&loser.start_call().await.unwrap()[0]);

    let answer = match arrival {
        Arrival::WinnerFirst => {
            assert!(winner.receive_offer(high, loser_offer).await.unwrap().is_empty());
            assert_eq!(winner.state(), NegotiationState::OfferSent);
            description(&loser.receive_offer(low, winner_offer).await.unwrap()[0])
        }
        Arrival::LoserFirst => {
            let answer = description(&loser.receive_offer(low, winner_offer).await.unwrap()[0]);
            assert_eq!(loser.state(), NegotiationState::Connected);
            // The loser's own offer is still ahead of its answer on the wire.
            assert!(winner.receive_offer(high, loser_offer).await.unwrap().is_empty());
            assert_eq!(winner.state(), NegotiationState::OfferSent);
            answer
        }
    };

    assert!(winner.receive_answer(high, answer).await.unwrap().is_empty());
    Outcome::of(&winner, &loser)
}

async fn renegotiation_glare(arrival: Arrival) -> Outcome {
    let (low, high, mut winner, mut loser) = glare_pair();

    let offer = description(&winner.start_call().await.unwrap()[0]);
    let answer = description(&loser.receive_offer(low, offer).await.unwrap()[0]);
    winner.receive_answer(high, answer).await.unwrap();

    let winner_renego = description(&winner.negotiation_needed().await.unwrap()[0]);
    let loser_renego = description(&loser.negotiation_needed().await.unwrap()[0]);
    assert_eq!(winner.state(), NegotiationState::Renegotiating);
    assert_eq!(loser.state(), NegotiationState::Renegotiating);

    let answer = match arrival {
        Arrival::WinnerFirst => {
            assert!(winner.receive_renego_offer(high, loser_renego).await.unwrap().is_empty());
            assert_eq!(winner.state(), NegotiationState::Renegotiating);
            description(&loser.receive_renego_offer(low, winner_renego).await.unwrap()[0])
        }
        Arrival::LoserFirst => {
            let answer =
                description(&loser.receive_renego_offer(low, winner_renego).await.unwrap()[0]);
            assert_eq!(loser.state(), NegotiationState::Connected);
            assert!(winner.receive_renego_offer(high, loser_renego).await.unwrap().is_empty());
            assert_eq!(winner.state(), NegotiationState::Renegotiating);
            answer
        }
    };

    assert!(winner.receive_renego_answer(high, answer).await.unwrap().is_empty());
    Outcome::of(&winner, &loser)
}

#[tokio::test]
async fn test_simultaneous_calls_settle_on_the_smaller_id() {
    init_tracing();

    let winner_first = initial_call_glare(Arrival::WinnerFirst).await;
    let loser_first = initial_call_glare(Arrival::LoserFirst).await;

    assert_eq!(winner_first.winner_state, NegotiationState::Connected);
    assert_eq!(winner_first.loser_state, NegotiationState::Connected);
    assert!(!winner_first.winner_pending && !winner_first.loser_pending);
    // The winner's offer is what the loser applied.
    assert_eq!(
        winner_first.loser_remote.as_ref().map(|d| d.sdp.as_str()),
        Some("offer low #1")
    );
    assert_eq!(
        winner_first.winner_remote.as_ref().map(|d| d.sdp.as_str()),
        Some("answer high to offer low #1")
    );

    assert_eq!(winner_first, loser_first);
}

#[tokio::test]
async fn test_simultaneous_renegotiations_settle_on_the_smaller_id() {
    init_tracing();

    let winner_first = renegotiation_glare(Arrival::WinnerFirst).await;
    let loser_first = renegotiation_glare(Arrival::LoserFirst).await;

    assert_eq!(winner_first.winner_state, NegotiationState::Connected);
    assert_eq!(winner_first.loser_state, NegotiationState::Connected);
    assert!(!winner_first.winner_pending && !winner_first.loser_pending);
    assert_eq!(
        winner_first.loser_remote.as_ref().map(|d| d.sdp.as_str()),
        Some("offer low #2")
    );
    assert_eq!(
        winner_first.winner_remote.as_ref().map(|d| d.sdp.as_str()),
        Some("answer high to offer low #2")
    );

    assert_eq!(winner_first, loser_first);
}

#[tokio::test]
async fn test_only_the_loser_rolls_back() {
    init_tracing();

    let (low, high) = ordered_ids();
    let (mut winner, winner_media) = session(low, high, "low");
    let (mut loser, loser_media) = session(high, low, "high");

    let winner_offer = description(&winner.start_call().await.unwrap()[0]);
    let loser_offer = description(&loser.start_call().await.unwrap()[0]);

    winner.receive_offer(high, loser_offer).await.unwrap();
    loser.receive_offer(low, winner_offer).await.unwrap();

    assert!(!winner_media.called("rollback"));
    assert!(!winner_media.called("create_answer"));
    assert!(loser_media.called("rollback"));
    assert!(loser_media.called("create_answer offer low #1"));
}

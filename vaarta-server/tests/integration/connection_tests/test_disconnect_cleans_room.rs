use vaarta_core::{RoomId, SignalMessage};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::TestConnection;

#[tokio::test]
async fn test_disconnect_removes_member_and_notifies_peer() {
    init_tracing();

    let service = create_test_service();
    let mut alice = TestConnection::connect(&service).await.unwrap();
    let mut bob = TestConnection::connect(&service).await.unwrap();

    alice.join("r1", "alice").await.unwrap();
    bob.join("r1", "bob").await.unwrap();
    assert!(matches!(
        alice.recv().await.unwrap(),
        SignalMessage::MemberJoined { .. }
    ));

    let bob_id = bob.id;
    bob.disconnect();

    assert_eq!(
        alice.recv().await.unwrap(),
        SignalMessage::MemberLeft {
            participant_id: bob_id,
            display_label: "bob".into(),
        }
    );

    let roster = service.directory().roster(&RoomId::from("r1")).unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].participant_id, alice.id);
    assert!(service.registry().lookup(&bob_id).is_none());
}

#[tokio::test]
async fn test_last_disconnect_deletes_room() {
    init_tracing();

    let service = create_test_service();
    let mut alice = TestConnection::connect(&service).await.unwrap();
    alice.join("lonely", "alice").await.unwrap();

    alice.disconnect();

    assert!(!service.directory().contains_room(&RoomId::from("lonely")));
    assert_eq!(service.registry().connection_count(), 0);
}

//! Connect/disconnect side effects of the gateway: the presence snapshot sent
//! to a new connection, the online announcement, and offline only when a
//! user's last live connection drops.

mod common;

use chat_service::middleware::guards::AuthUser;
use chat_service::websocket::events::{ServerEvent, UserStatus};
use chat_service::websocket::handlers::{close_session, open_session, Session};
use common::{next_event, session, test_state};
use uuid::Uuid;

fn device_of(user: &AuthUser) -> Session {
    Session {
        user: user.clone(),
        conn_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn new_connection_receives_the_presence_snapshot() {
    let state = test_state();

    let alice = session("alice");
    let mut alice_rx = open_session(&state, &alice).await;

    // First frame on a fresh connection is the full membership snapshot,
    // which already includes the connecting user.
    match next_event(&mut alice_rx) {
        ServerEvent::OnlineUsers { user_ids } => assert_eq!(user_ids, vec![alice.user.id]),
        other => panic!("expected online_users first, got {other:?}"),
    }
    // The online announcement is a broadcast, so it reaches alice too.
    match next_event(&mut alice_rx) {
        ServerEvent::UserStatus { user_id, status } => {
            assert_eq!(user_id, alice.user.id);
            assert_eq!(status, UserStatus::Online);
        }
        other => panic!("expected user_status, got {other:?}"),
    }

    let bob = session("bob");
    let mut bob_rx = open_session(&state, &bob).await;

    match next_event(&mut bob_rx) {
        ServerEvent::OnlineUsers { mut user_ids } => {
            user_ids.sort();
            let mut expected = vec![alice.user.id, bob.user.id];
            expected.sort();
            assert_eq!(user_ids, expected, "snapshot covers everyone online");
        }
        other => panic!("expected online_users first, got {other:?}"),
    }

    // Already-connected peers learn about bob incrementally.
    match next_event(&mut alice_rx) {
        ServerEvent::UserStatus { user_id, status } => {
            assert_eq!(user_id, bob.user.id);
            assert_eq!(status, UserStatus::Online);
        }
        other => panic!("expected user_status for bob, got {other:?}"),
    }
}

#[tokio::test]
async fn offline_is_announced_only_when_the_last_connection_drops() {
    let state = test_state();

    let alice = AuthUser {
        id: Uuid::new_v4(),
        name: "alice".into(),
    };
    let phone = device_of(&alice);
    let laptop = device_of(&alice);
    let bob = session("bob");

    let _phone_rx = open_session(&state, &phone).await;
    let _laptop_rx = open_session(&state, &laptop).await;
    let mut bob_rx = open_session(&state, &bob).await;
    while bob_rx.try_recv().is_ok() {} // drain connect-time traffic

    close_session(&state, &phone).await;
    assert!(state.presence.is_online(alice.id).await);
    assert!(
        bob_rx.try_recv().is_err(),
        "no offline while another device is live"
    );

    close_session(&state, &laptop).await;
    match next_event(&mut bob_rx) {
        ServerEvent::UserStatus { user_id, status } => {
            assert_eq!(user_id, alice.id);
            assert_eq!(status, UserStatus::Offline);
        }
        other => panic!("expected user_status offline, got {other:?}"),
    }
    assert!(!state.presence.is_online(alice.id).await);
}

#[tokio::test]
async fn close_session_drops_room_subscriptions() {
    let state = test_state();
    let alice = session("alice");
    let conversation = Uuid::new_v4();

    let _rx = open_session(&state, &alice).await;
    state.rooms.join(conversation, alice.conn_id).await;
    assert_eq!(state.rooms.room_size(conversation).await, 1);

    close_session(&state, &alice).await;
    assert_eq!(state.rooms.room_size(conversation).await, 0);
}

//! Drives the connection-level event dispatch with raw JSON frames, the way
//! the socket loop feeds it.

mod common;

use chat_service::store::ConversationStore;
use chat_service::websocket::events::ServerEvent;
use chat_service::websocket::handlers::handle_client_frame;
use common::{connect, next_event, session, test_state};
use uuid::Uuid;

#[tokio::test]
async fn join_and_send_over_the_wire_format() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let (conversation, _) = state
        .store
        .create_or_get(alice.user.id, bob.user.id)
        .await
        .unwrap();

    let _alice_rx = connect(&state, &alice).await;
    let mut bob_rx = connect(&state, &bob).await;

    let join = format!(r#"{{"type":"join","conversation_id":"{}"}}"#, conversation.id);
    handle_client_frame(&state, &bob, &join).await;
    assert_eq!(state.rooms.room_size(conversation.id).await, 1);

    let send = format!(
        r#"{{"type":"send","conversation_id":"{}","content":"Hi"}}"#,
        conversation.id
    );
    handle_client_frame(&state, &alice, &send).await;

    match next_event(&mut bob_rx) {
        ServerEvent::MessageReceived { message, .. } => {
            assert_eq!(message.content, "Hi");
            assert!(!message.read);
        }
        other => panic!("expected message_received, got {other:?}"),
    }
}

#[tokio::test]
async fn non_participant_join_gets_a_local_error_and_no_subscription() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let stranger = session("stranger");
    let (conversation, _) = state
        .store
        .create_or_get(alice.user.id, bob.user.id)
        .await
        .unwrap();

    let mut stranger_rx = connect(&state, &stranger).await;

    let join = format!(r#"{{"type":"join","conversation_id":"{}"}}"#, conversation.id);
    handle_client_frame(&state, &stranger, &join).await;

    assert_eq!(state.rooms.room_size(conversation.id).await, 0);
    match next_event(&mut stranger_rx) {
        ServerEvent::Error { .. } => {}
        other => panic!("expected a local error event, got {other:?}"),
    }
}

#[tokio::test]
async fn typing_is_relayed_tagged_and_never_persisted() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let (conversation, _) = state
        .store
        .create_or_get(alice.user.id, bob.user.id)
        .await
        .unwrap();

    let mut bob_rx = connect(&state, &bob).await;
    state.rooms.join(conversation.id, bob.conn_id).await;

    let typing = format!(r#"{{"type":"typing","conversation_id":"{}"}}"#, conversation.id);
    handle_client_frame(&state, &alice, &typing).await;

    match next_event(&mut bob_rx) {
        ServerEvent::Typing {
            conversation_id,
            user_id,
        } => {
            assert_eq!(conversation_id, conversation.id);
            assert_eq!(user_id, alice.user.id);
        }
        other => panic!("expected typing, got {other:?}"),
    }

    let stop = format!(
        r#"{{"type":"stop_typing","conversation_id":"{}"}}"#,
        conversation.id
    );
    handle_client_frame(&state, &alice, &stop).await;
    match next_event(&mut bob_rx) {
        ServerEvent::StopTyping { user_id, .. } => assert_eq!(user_id, alice.user.id),
        other => panic!("expected stop_typing, got {other:?}"),
    }

    // Ephemeral: nothing about typing reaches the durable log.
    assert!(state.store.messages(conversation.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn disconnect_mid_typing_sends_no_stop_typing() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let (conversation, _) = state
        .store
        .create_or_get(alice.user.id, bob.user.id)
        .await
        .unwrap();

    let _alice_rx = connect(&state, &alice).await;
    let mut bob_rx = connect(&state, &bob).await;
    state.rooms.join(conversation.id, bob.conn_id).await;

    let typing = format!(r#"{{"type":"typing","conversation_id":"{}"}}"#, conversation.id);
    handle_client_frame(&state, &alice, &typing).await;
    assert!(matches!(
        next_event(&mut bob_rx),
        ServerEvent::Typing { .. }
    ));

    // Alice drops without stop_typing: the gateway's cleanup path.
    chat_service::websocket::handlers::close_session(&state, &alice).await;
    assert!(!state.presence.is_online(alice.user.id).await);

    // Bob sees the presence transition, never a stop_typing; his client's
    // own timeout clears the stale indicator.
    loop {
        let Ok(msg) = bob_rx.try_recv() else { break };
        match common::decode(msg) {
            ServerEvent::StopTyping { .. } => panic!("server must not synthesize stop_typing"),
            _ => {}
        }
    }
}

#[tokio::test]
async fn mark_read_frame_drives_the_synchronizer() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let (conversation, _) = state
        .store
        .create_or_get(alice.user.id, bob.user.id)
        .await
        .unwrap();

    let send = format!(
        r#"{{"type":"send","conversation_id":"{}","content":"unread"}}"#,
        conversation.id
    );
    handle_client_frame(&state, &alice, &send).await;

    let mark = format!(
        r#"{{"type":"mark_read","conversation_id":"{}"}}"#,
        conversation.id
    );
    handle_client_frame(&state, &bob, &mark).await;

    let log = state.store.messages(conversation.id).await.unwrap();
    assert!(log.iter().all(|m| m.read));
}

#[tokio::test]
async fn malformed_and_unknown_frames_are_dropped() {
    let state = test_state();
    let alice = session("alice");
    let mut alice_rx = connect(&state, &alice).await;

    handle_client_frame(&state, &alice, "not json at all").await;
    handle_client_frame(&state, &alice, r#"{"type":"format_disk"}"#).await;
    handle_client_frame(&state, &alice, r#"{"type":"join"}"#).await;

    assert!(
        alice_rx.try_recv().is_err(),
        "invalid frames produce no events, only a log line"
    );
}

#[tokio::test]
async fn send_error_is_reported_to_the_acting_connection_only() {
    let state = test_state();
    let alice = session("alice");
    let bob = session("bob");
    let mut alice_rx = connect(&state, &alice).await;
    let mut bob_rx = connect(&state, &bob).await;

    // Unknown conversation: a local error event for alice, silence for bob.
    let send = format!(
        r#"{{"type":"send","conversation_id":"{}","content":"Hi"}}"#,
        Uuid::new_v4()
    );
    handle_client_frame(&state, &alice, &send).await;

    match next_event(&mut alice_rx) {
        ServerEvent::Error { message } => assert!(!message.is_empty()),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(bob_rx.try_recv().is_err());
}

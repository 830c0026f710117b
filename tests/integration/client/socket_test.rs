//! Client socket listener table under churn and server frame handling

use boardsync::client::features::card_details;
use boardsync::client::ClientSocket;
use boardsync::shared::{ClientFrame, Topic, TopicId};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_thousand_on_off_cycles_leave_no_listeners() {
    let (socket, _outbox) = ClientSocket::new();
    let hits = Rc::new(Cell::new(0));

    for i in 0..1000 {
        let counter = hits.clone();
        let event = format!("board:card:details-changed:c{}", i % 7);
        let id = socket.on(&event, move |_| counter.set(counter.get() + 1));
        socket.dispatch(&event, &json!({}));
        assert!(socket.off(&event, id));
    }

    assert_eq!(hits.get(), 1000);
    assert_eq!(socket.total_listeners(), 0);
}

#[test]
fn test_thousand_subscription_lifetimes_leave_no_listeners() {
    let (socket, _outbox) = ClientSocket::new();

    for _ in 0..1000 {
        let mut subscription = card_details(&socket, "c1");
        subscription.on(|_| {});
        assert_eq!(socket.listener_count("board:card:details-changed:c1"), 1);
    }

    assert_eq!(socket.total_listeners(), 0);
}

#[test]
fn test_server_text_frames_reach_listeners() {
    let (socket, _outbox) = ClientSocket::new();
    let seen = Rc::new(Cell::new(0));
    let counter = seen.clone();
    socket.on("board:card:deleted:c1", move |data| {
        assert_eq!(data, &json!({"uid": "c1"}));
        counter.set(counter.get() + 1);
    });

    let text = json!({
        "type": "event",
        "topic": "board-card",
        "topic_id": "c1",
        "event": "board:card:deleted:c1",
        "data": {"uid": "c1"},
        "timestamp": "2026-01-01T00:00:00Z",
    })
    .to_string();
    socket.handle_text(&text).unwrap();
    socket.handle_text(r#"{"type": "pong"}"#).unwrap();

    assert_eq!(seen.get(), 1);
    assert!(socket.handle_text("not a frame").is_err());
}

#[test]
fn test_join_and_leave_go_to_the_outbox() {
    let (socket, mut outbox) = ClientSocket::new();
    socket.join(Topic::Board, "b1").unwrap();
    socket.leave(Topic::Board, "b1").unwrap();

    let topic_id = TopicId::new("b1");
    assert_eq!(
        outbox.try_recv().unwrap(),
        ClientFrame::Join {
            topic: Topic::Board,
            topic_id: topic_id.clone()
        }
    );
    assert_eq!(
        outbox.try_recv().unwrap(),
        ClientFrame::Leave {
            topic: Topic::Board,
            topic_id
        }
    );
}

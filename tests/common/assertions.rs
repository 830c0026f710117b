//! Frame assertion macros
//!
//! Shorthand for pulling the next frame off a session receiver and checking
//! it, with readable failure messages.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Take the next frame from `$rx`, assert it is an event named `$name` and
/// return its payload.
#[macro_export]
macro_rules! assert_event {
    ($rx:expr, $name:expr) => {
        match $rx.try_recv() {
            Ok(boardsync::shared::ServerFrame::Event(event)) => {
                assert_eq!(event.event, $name, "unexpected event name");
                event.data
            }
            Ok(other) => panic!("Expected event {}, got frame {:?}", $name, other),
            Err(e) => panic!("Expected event {}, got nothing: {:?}", $name, e),
        }
    };
}

/// Assert that no frame is waiting on `$rx`.
#[macro_export]
macro_rules! assert_no_frame {
    ($rx:expr) => {
        if let Ok(frame) = $rx.try_recv() {
            panic!("Expected no frame, got {:?}", frame);
        }
    };
}

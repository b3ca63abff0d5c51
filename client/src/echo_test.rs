use super::*;
use crate::clock::ManualClock;

fn suppressor() -> (EchoSuppressor<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (EchoSuppressor::with_clock(clock.clone(), DEFAULT_ECHO_WINDOW), clock)
}

#[test]
fn marked_id_is_applying_until_window_elapses() {
    let (mut echo, clock) = suppressor();
    echo.mark_applying("e1");

    assert!(echo.is_applying("e1"));
    clock.advance(Duration::from_millis(99));
    assert!(echo.is_applying("e1"));
    clock.advance(Duration::from_millis(1));
    assert!(!echo.is_applying("e1"), "mark expires at the window without an explicit clear");
}

#[test]
fn unmarked_id_is_not_applying() {
    let (echo, _clock) = suppressor();
    assert!(!echo.is_applying("e1"));
}

#[test]
fn explicit_clear_unmarks_immediately() {
    let (mut echo, _clock) = suppressor();
    echo.mark_applying("e1");
    echo.clear("e1");
    assert!(!echo.is_applying("e1"));
    assert!(echo.is_empty());
}

#[test]
fn observe_local_suppresses_once_and_consumes_mark() {
    let (mut echo, _clock) = suppressor();
    echo.mark_applying("e1");

    assert!(echo.observe_local("e1"), "echo of the remote apply is suppressed");
    assert!(!echo.observe_local("e1"), "a later genuine edit goes through");
}

#[test]
fn observe_local_after_expiry_lets_edit_through() {
    let (mut echo, clock) = suppressor();
    echo.mark_applying("e1");
    clock.advance(Duration::from_millis(150));

    assert!(!echo.observe_local("e1"));
    assert!(echo.is_empty());
}

#[test]
fn remark_extends_deadline() {
    let (mut echo, clock) = suppressor();
    echo.mark_applying("e1");
    clock.advance(Duration::from_millis(80));
    echo.mark_applying("e1");
    clock.advance(Duration::from_millis(80));

    assert!(echo.is_applying("e1"));
}

#[test]
fn marks_are_per_element() {
    let (mut echo, _clock) = suppressor();
    echo.mark_applying("e1");
    assert!(!echo.is_applying("e2"));
    assert!(!echo.observe_local("e2"));
    assert!(echo.is_applying("e1"));
}

#[test]
fn sweep_removes_only_expired_marks() {
    let (mut echo, clock) = suppressor();
    echo.mark_applying("old");
    clock.advance(Duration::from_millis(60));
    echo.mark_applying("fresh");
    clock.advance(Duration::from_millis(60));

    assert_eq!(echo.sweep(), 1);
    assert_eq!(echo.len(), 1);
    assert!(echo.is_applying("fresh"));
}

#[test]
fn new_marks_prune_expired_ones() {
    let (mut echo, clock) = suppressor();
    for i in 0..20 {
        echo.mark_applying(&format!("e{i}"));
    }
    assert_eq!(echo.len(), 20);

    clock.advance(Duration::from_millis(100));
    echo.mark_applying("late");

    assert_eq!(echo.len(), 1);
    assert!(echo.is_applying("late"));
}

#[test]
fn default_window_is_100ms() {
    assert_eq!(EchoSuppressor::new().window(), Duration::from_millis(100));
}

use super::*;
use crate::clock::ManualClock;
use crate::echo::DEFAULT_ECHO_WINDOW;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

type Elements = BTreeMap<String, Value>;

#[derive(Default)]
struct MapScene {
    elements: Elements,
}

impl Scene for MapScene {
    type Snapshot = Elements;

    fn snapshot(&self) -> Elements {
        self.elements.clone()
    }

    fn restore(&mut self, snapshot: &Elements) {
        self.elements.clone_from(snapshot);
    }

    fn apply_added(&mut self, element_id: &str, element_data: &Value) {
        self.elements.insert(element_id.to_owned(), element_data.clone());
    }

    fn apply_modified(&mut self, element_id: &str, element_data: &Value) {
        self.elements.insert(element_id.to_owned(), element_data.clone());
    }

    fn apply_removed(&mut self, element_id: &str) {
        self.elements.remove(element_id);
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn load(&mut self, scene_data: &Value) {
        self.elements = scene_data
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
    }
}

struct RecordingSink {
    sent: RefCell<Vec<ClientMessage>>,
    accepting: Cell<bool>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self { sent: RefCell::default(), accepting: Cell::new(true) }
    }
}

impl EventSink for RecordingSink {
    fn send(&self, message: ClientMessage) -> bool {
        if self.accepting.get() {
            self.sent.borrow_mut().push(message);
        }
        self.accepting.get()
    }
}

type TestBridge = SceneBridge<MapScene, RecordingSink, ManualClock>;

fn bridge() -> (TestBridge, ManualClock) {
    let clock = ManualClock::new();
    let echo = EchoSuppressor::with_clock(clock.clone(), DEFAULT_ECHO_WINDOW);
    let bridge = SceneBridge::with_parts(MapScene::default(), RecordingSink::default(), echo, History::new());
    (bridge, clock)
}

/// Host-side edit: mutate the scene, then report it like a change listener would.
fn user_adds(bridge: &mut TestBridge, id: &str, data: Value) -> EditOutcome {
    bridge.scene.apply_added(id, &data);
    bridge.local_edit(LocalEdit::Added { element_id: id.into(), element_data: data })
}

fn remote_added(id: &str, data: Value) -> ServerMessage {
    ServerMessage::ElementAdded {
        connection_id: Uuid::new_v4(),
        user_id: "user-b".into(),
        element_id: id.into(),
        element_data: data,
    }
}

fn sent(bridge: &TestBridge) -> Vec<ClientMessage> {
    bridge.sink().sent.borrow().clone()
}

#[test]
fn new_bridge_starts_with_baseline_entry() {
    let (bridge, _) = bridge();
    assert_eq!(bridge.history().len(), 1);
    assert!(!bridge.history().can_undo());
}

#[test]
fn local_edit_commits_then_sends() {
    let (mut bridge, _) = bridge();

    assert_eq!(user_adds(&mut bridge, "e1", json!({"x": 1})), EditOutcome::Sent);

    assert_eq!(bridge.history().len(), 2);
    assert_eq!(
        sent(&bridge),
        vec![ClientMessage::ElementAdded { element_id: "e1".into(), element_data: json!({"x": 1}) }]
    );
}

#[test]
fn remote_apply_suppresses_the_local_echo() {
    let (mut bridge, _) = bridge();

    assert!(bridge.apply_remote(&remote_added("e1", json!({"x": 1}))));
    assert!(bridge.echo().is_applying("e1"));
    // the scene's change hook fires for the remote apply
    let outcome = bridge.local_edit(LocalEdit::Added { element_id: "e1".into(), element_data: json!({"x": 1}) });

    assert_eq!(outcome, EditOutcome::Suppressed);
    assert!(sent(&bridge).is_empty(), "remote change must not be re-broadcast");
    assert_eq!(bridge.history().len(), 1, "remote change must not be committed");
    assert_eq!(bridge.scene().elements.get("e1"), Some(&json!({"x": 1})));
}

#[test]
fn echo_mark_is_consumed_by_the_first_local_observation() {
    let (mut bridge, _) = bridge();
    bridge.apply_remote(&remote_added("e1", json!({"x": 1})));

    bridge.local_edit(LocalEdit::Modified { element_id: "e1".into(), element_data: json!({"x": 1}) });
    let outcome = bridge.local_edit(LocalEdit::Modified { element_id: "e1".into(), element_data: json!({"x": 2}) });

    assert_eq!(outcome, EditOutcome::Sent);
}

#[test]
fn user_edit_after_the_window_is_sent() {
    let (mut bridge, clock) = bridge();
    bridge.apply_remote(&remote_added("e1", json!({"x": 1})));

    clock.advance(DEFAULT_ECHO_WINDOW + Duration::from_millis(1));

    assert!(!bridge.echo().is_applying("e1"));
    let outcome = bridge.local_edit(LocalEdit::Removed { element_id: "e1".into() });
    assert_eq!(outcome, EditOutcome::Sent);
}

#[test]
fn marks_on_other_elements_do_not_suppress() {
    let (mut bridge, _) = bridge();
    bridge.apply_remote(&remote_added("e1", json!({})));

    assert_eq!(user_adds(&mut bridge, "e2", json!({})), EditOutcome::Sent);
}

#[test]
fn remote_scene_clear_suppresses_local_clear_echo() {
    let (mut bridge, _) = bridge();
    user_adds(&mut bridge, "e1", json!({}));

    let cleared = ServerMessage::SceneCleared { connection_id: Uuid::new_v4(), user_id: "user-b".into() };
    assert!(bridge.apply_remote(&cleared));

    assert!(bridge.scene().elements.is_empty());
    assert_eq!(bridge.local_edit(LocalEdit::Cleared), EditOutcome::Suppressed);
    assert_eq!(sent(&bridge).len(), 1);
}

#[test]
fn undo_and_redo_replace_the_scene_without_sending() {
    let (mut bridge, _) = bridge();
    user_adds(&mut bridge, "e1", json!({"x": 1}));
    user_adds(&mut bridge, "e2", json!({"x": 2}));
    let before = sent(&bridge).len();

    assert!(bridge.undo());
    assert_eq!(bridge.scene().elements.keys().collect::<Vec<_>>(), vec!["e1"]);
    assert!(bridge.undo());
    assert!(bridge.scene().elements.is_empty());
    assert!(!bridge.undo(), "baseline is the oldest entry");

    assert!(bridge.redo());
    assert!(bridge.redo());
    assert_eq!(bridge.scene().elements.len(), 2);
    assert!(!bridge.redo());

    assert_eq!(sent(&bridge).len(), before, "history replay is local only");
    assert_eq!(bridge.history().len(), 3, "history replay is never committed");
}

#[test]
fn edit_after_undo_discards_redo_branch() {
    let (mut bridge, _) = bridge();
    user_adds(&mut bridge, "e1", json!({}));
    user_adds(&mut bridge, "e2", json!({}));
    bridge.undo();

    user_adds(&mut bridge, "e3", json!({}));

    assert!(!bridge.redo());
    assert_eq!(bridge.history().len(), 3);
    assert_eq!(bridge.scene().elements.keys().collect::<Vec<_>>(), vec!["e1", "e3"]);
}

#[test]
fn sync_load_resets_history_to_the_loaded_scene() {
    let (mut bridge, _) = bridge();
    user_adds(&mut bridge, "mine", json!({}));

    let sync = ServerMessage::SyncResponse { scene_data: json!({"s1": {"x": 1}, "s2": {"x": 2}}) };
    assert!(bridge.apply_remote(&sync));

    assert_eq!(bridge.scene().elements.len(), 2);
    assert_eq!(bridge.history().len(), 1);
    assert!(!bridge.undo(), "cannot undo past a sync load");
    assert_eq!(bridge.history().current().map(|e| e.snapshot.len()), Some(2));
}

#[test]
fn non_scene_frames_are_ignored() {
    let (mut bridge, _) = bridge();
    let frames = [
        ServerMessage::UserLeft { connection_id: Uuid::new_v4() },
        ServerMessage::error("boom"),
    ];
    for frame in &frames {
        assert!(!bridge.apply_remote(frame), "{} should not touch the scene", frame.kind());
    }
    assert!(bridge.echo().is_empty());
}

#[test]
fn refused_send_still_commits() {
    let (mut bridge, _) = bridge();
    bridge.sink().accepting.set(false);

    assert_eq!(user_adds(&mut bridge, "e1", json!({})), EditOutcome::Unsent);
    assert_eq!(bridge.history().len(), 2);
}

#[test]
fn sweep_drops_expired_marks() {
    let (mut bridge, clock) = bridge();
    bridge.apply_remote(&remote_added("e1", json!({})));
    bridge.apply_remote(&remote_added("e2", json!({})));

    assert_eq!(bridge.sweep(), 0);
    clock.advance(DEFAULT_ECHO_WINDOW);
    assert_eq!(bridge.sweep(), 2);
    assert!(bridge.echo().is_empty());
}

#[test]
fn remote_stream_does_not_accumulate_marks() {
    let (mut bridge, clock) = bridge();
    for i in 0..50 {
        clock.advance(DEFAULT_ECHO_WINDOW);
        bridge.apply_remote(&remote_added(&format!("e{i}"), json!({})));
    }

    assert_eq!(bridge.echo().len(), 1);
    assert!(bridge.echo().is_applying("e49"));
}

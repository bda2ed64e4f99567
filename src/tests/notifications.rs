use std::thread;
use std::time::Duration;

use imf_core::types::{
    Configuration, Direction, EnterKeyType, FunctionKey, InputWindowInfo, InputWindowStatus,
    KeyboardStatus, TextInputType, CURSOR_DIRECTION_BASE_VALUE,
};
use imf_core::stub::ChannelCode;
use imf_core::{ImfError, MessageOption};

use super::*;

#[test]
fn editing_commands_reach_listener_in_order() {
    let f = Fixture::attached();
    f.service.insert_text("你好").unwrap();
    f.service.send_function_key(EnterKeyType::Done).unwrap();
    f.service.move_cursor(Direction::Left).unwrap();
    f.service.handle_extend_action(3).unwrap();
    let events = f.wait_events(4);
    assert_eq!(
        events,
        vec![
            TextEvent::Insert("你好".into()),
            TextEvent::FunctionKey(FunctionKey {
                enter_key_type: EnterKeyType::Done
            }),
            TextEvent::MoveCursor(Direction::Left),
            TextEvent::ExtendAction(3),
        ]
    );
}

#[test]
fn delete_directions_are_mirrored() {
    let f = Fixture::attached();
    f.service.delete_forward(1).unwrap();
    f.service.delete_backward(2).unwrap();
    let events = f.wait_events(2);
    assert_eq!(
        events,
        vec![TextEvent::DeleteBackward(1), TextEvent::DeleteForward(2)]
    );
}

#[test]
fn commands_are_dropped_when_not_editable() {
    let f = Fixture::attached();
    f.controller.hide_text_input().unwrap();
    f.service.insert_text("lost").unwrap();
    // The query is answered after the insert has been drained.
    assert_eq!(f.service.get_text_index_at_cursor().unwrap(), -1);
    f.controller.show_text_input().unwrap();
    f.service.insert_text("kept").unwrap();
    let events = f.wait_events(1);
    assert_eq!(events, vec![TextEvent::Insert("kept".into())]);
}

#[test]
fn keyboard_status_reaches_listener() {
    let f = Fixture::attached();
    f.service.send_keyboard_status(KeyboardStatus::Hide).unwrap();
    let events = f.wait_events(1);
    assert_eq!(events, vec![TextEvent::KeyboardStatus(KeyboardStatus::Hide)]);
}

#[test]
fn select_by_movement_adds_direction_base() {
    let f = Fixture::attached();
    f.controller.set_controller_listener(f.listener.clone());
    f.service.select_by_movement(1, 2).unwrap();
    let events = f.wait_events(2);
    assert_eq!(
        events,
        vec![
            TextEvent::Select(CURSOR_DIRECTION_BASE_VALUE + 1, 2),
            TextEvent::SelectByMovement(1),
        ]
    );
}

#[test]
fn select_by_range_reaches_both_listeners() {
    let f = Fixture::attached();
    f.controller.set_controller_listener(f.listener.clone());
    f.service.select_by_range(2, 5).unwrap();
    let events = f.wait_events(2);
    assert_eq!(
        events,
        vec![TextEvent::SetSelection(2, 5), TextEvent::SelectByRange(2, 5)]
    );
}

#[test]
fn controller_listener_hears_selection_without_text_listener() {
    let f = Fixture::new();
    f.controller.set_controller_listener(f.listener.clone());
    f.controller.update_listen_event_flag("imeShow", true).unwrap();
    f.service.select_by_range(0, 1).unwrap();
    let events = f.wait_events(1);
    assert_eq!(events, vec![TextEvent::SelectByRange(0, 1)]);
}

#[test]
fn input_stop_clears_session() {
    let f = Fixture::attached();
    f.controller.on_selection_change("abc", 1, 1).unwrap();
    f.service.stop_input().unwrap();
    assert!(wait_until(|| !f.controller.was_attached()));
    assert!(!f.controller.is_editable());
    assert!(!f.controller.has_agent());
    assert_eq!(f.controller.editor_snapshot().text, "");
}

#[test]
fn panel_status_reaches_setting_listener() {
    let f = Fixture::attached();
    f.controller.set_setting_listener(Some(f.listener.clone()));
    f.service
        .panel_status_change(
            InputWindowStatus::Hide,
            vec![InputWindowInfo {
                name: "keyboard".into(),
                width: 1080,
                height: 600,
                ..InputWindowInfo::default()
            }],
        )
        .unwrap();
    let events = f.wait_events(1);
    assert_eq!(events, vec![TextEvent::PanelStatus(InputWindowStatus::Hide, 1)]);
}

#[test]
fn restarted_input_keeps_agent() {
    let f = Fixture::attached();
    let agent = f.service.agent();
    f.controller.on_cursor_update(cursor(1.0, 1.0)).unwrap();
    // StartInput hands out the same agent again; it must not be reinstalled.
    f.controller.show_text_input().unwrap();
    thread::sleep(Duration::from_millis(20));
    f.controller.on_cursor_update(cursor(1.0, 1.0)).unwrap();
    assert!(f.controller.has_agent());
    assert_eq!(agent.cursor_updates(), 1);
}

#[test]
fn malformed_insert_is_dropped_and_worker_keeps_going() {
    let f = Fixture::attached();
    // Claims ten UTF-16 units but carries none.
    f.service
        .push_channel(ChannelCode::InsertText, MessageOption::Async, |p| {
            p.write_i32(10)
        })
        .unwrap();
    f.service.insert_text("ok").unwrap();
    let events = f.wait_events(1);
    assert_eq!(events, vec![TextEvent::Insert("ok".into())]);
    // A query behind both pushes proves nothing else is still queued.
    f.service.get_text_index_at_cursor().unwrap();
    assert_eq!(f.listener.events(), vec![TextEvent::Insert("ok".into())]);
}

#[test]
fn data_channel_text_queries() {
    let f = Fixture::attached();
    f.controller.on_selection_change("hello", 3, 3).unwrap();
    assert_eq!(f.service.get_text_before_cursor(2).unwrap(), "el");
    assert_eq!(f.service.get_text_after_cursor(9).unwrap(), "lo");
    assert_eq!(f.service.get_text_index_at_cursor().unwrap(), 3);
}

#[test]
fn data_channel_prefers_listener_answer() {
    let f = Fixture::new();
    f.controller
        .attach(RecordingListener::with_left_text("from app"))
        .unwrap();
    assert!(wait_until(|| f.controller.has_agent()));
    f.controller.on_selection_change("hello", 3, 3).unwrap();
    assert_eq!(f.service.get_text_before_cursor(2).unwrap(), "from app");
    assert_eq!(f.service.get_text_after_cursor(2).unwrap(), "lo");
}

#[test]
fn data_channel_config_queries() {
    let f = Fixture::attached();
    f.controller
        .on_configuration_change(Configuration {
            enter_key_type: EnterKeyType::Send,
            text_input_type: TextInputType::Url,
        })
        .unwrap();
    assert_eq!(f.service.get_enter_key_type().unwrap(), EnterKeyType::Send.as_i32());
    assert_eq!(f.service.get_input_pattern().unwrap(), 6);
}

#[test]
fn data_channel_query_answers_defaults_when_not_editable() {
    let f = Fixture::attached();
    f.controller.hide_text_input().unwrap();
    assert_eq!(f.service.get_text_before_cursor(2).unwrap(), "");
    assert_eq!(f.service.get_text_index_at_cursor().unwrap(), -1);
}

#[test]
fn pushes_without_session_are_not_bound() {
    let f = Fixture::new();
    assert!(matches!(f.service.insert_text("x"), Err(ImfError::NotBound)));
    assert!(matches!(f.service.stop_input(), Err(ImfError::NotBound)));
}

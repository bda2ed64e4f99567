//! Callbacks the controller fans notifications out to.
//!
//! Text and controller listeners are only ever invoked from the controller's
//! worker thread. The setting listener is invoked from the same thread.

use imf_core::types::{
    Direction, FunctionKey, InputWindowInfo, InputWindowStatus, KeyboardStatus, Property,
    SubProperty,
};

/// Editing commands from the input method, bound to one attach.
pub trait TextListener: Send + Sync {
    fn insert_text(&self, text: &str);
    fn delete_forward(&self, length: i32);
    fn delete_backward(&self, length: i32);
    fn send_keyboard_status(&self, status: KeyboardStatus);
    fn send_function_key(&self, key: FunctionKey);
    fn move_cursor(&self, direction: Direction);
    fn handle_set_selection(&self, start: i32, end: i32);
    fn handle_extend_action(&self, action: i32);
    /// `key_code` is `CURSOR_DIRECTION_BASE_VALUE + direction`.
    fn handle_select(&self, key_code: i32, cursor_move_skip: i32);

    /// Text before the caret. `None` answers from the controller's cached
    /// editor content instead.
    fn get_left_text_of_cursor(&self, _number: i32) -> Option<String> {
        None
    }

    /// Text after the caret. `None` answers from the cache.
    fn get_right_text_of_cursor(&self, _number: i32) -> Option<String> {
        None
    }

    /// Caret offset in UTF-16 units. `None` answers from the cache.
    fn get_text_index_at_cursor(&self) -> Option<i32> {
        None
    }
}

/// Process-wide input method events (`imeChange`, panel visibility).
pub trait SettingListener: Send + Sync {
    fn on_ime_change(&self, property: &Property, sub_property: &SubProperty);
    fn on_panel_status_change(&self, status: InputWindowStatus, windows: &[InputWindowInfo]);
}

/// Selection requests, delivered whether or not a text listener is attached.
pub trait ControllerListener: Send + Sync {
    fn on_select_by_range(&self, start: i32, end: i32);
    fn on_select_by_movement(&self, direction: i32);
}

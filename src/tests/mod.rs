mod notifications;
mod proptest_agent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use imf_core::settings::Settings;
use imf_core::types::{
    CursorInfo, Direction, FunctionKey, InputWindowInfo, InputWindowStatus, KeyboardStatus,
    Property, SubProperty,
};

use crate::listener::{ControllerListener, SettingListener, TextListener};
use crate::loopback::{LoopbackRegistry, LoopbackService};
use crate::InputMethodController;

/// Everything a text listener was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TextEvent {
    Insert(String),
    DeleteForward(i32),
    DeleteBackward(i32),
    KeyboardStatus(KeyboardStatus),
    FunctionKey(FunctionKey),
    MoveCursor(Direction),
    SetSelection(i32, i32),
    ExtendAction(i32),
    Select(i32, i32),
    ImeChange(String, String),
    PanelStatus(InputWindowStatus, usize),
    SelectByRange(i32, i32),
    SelectByMovement(i32),
}

#[derive(Default)]
pub(super) struct RecordingListener {
    events: Mutex<Vec<TextEvent>>,
    left_text: Option<String>,
}

impl RecordingListener {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn with_left_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            left_text: Some(text.to_string()),
            ..Self::default()
        })
    }

    pub(super) fn events(&self) -> Vec<TextEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: TextEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl TextListener for RecordingListener {
    fn insert_text(&self, text: &str) {
        self.push(TextEvent::Insert(text.to_string()));
    }
    fn delete_forward(&self, length: i32) {
        self.push(TextEvent::DeleteForward(length));
    }
    fn delete_backward(&self, length: i32) {
        self.push(TextEvent::DeleteBackward(length));
    }
    fn send_keyboard_status(&self, status: KeyboardStatus) {
        self.push(TextEvent::KeyboardStatus(status));
    }
    fn send_function_key(&self, key: FunctionKey) {
        self.push(TextEvent::FunctionKey(key));
    }
    fn move_cursor(&self, direction: Direction) {
        self.push(TextEvent::MoveCursor(direction));
    }
    fn handle_set_selection(&self, start: i32, end: i32) {
        self.push(TextEvent::SetSelection(start, end));
    }
    fn handle_extend_action(&self, action: i32) {
        self.push(TextEvent::ExtendAction(action));
    }
    fn handle_select(&self, key_code: i32, cursor_move_skip: i32) {
        self.push(TextEvent::Select(key_code, cursor_move_skip));
    }
    fn get_left_text_of_cursor(&self, _number: i32) -> Option<String> {
        self.left_text.clone()
    }
}

impl SettingListener for RecordingListener {
    fn on_ime_change(&self, property: &Property, sub_property: &SubProperty) {
        self.push(TextEvent::ImeChange(
            property.name.clone(),
            sub_property.id.clone(),
        ));
    }
    fn on_panel_status_change(&self, status: InputWindowStatus, windows: &[InputWindowInfo]) {
        self.push(TextEvent::PanelStatus(status, windows.len()));
    }
}

impl ControllerListener for RecordingListener {
    fn on_select_by_range(&self, start: i32, end: i32) {
        self.push(TextEvent::SelectByRange(start, end));
    }
    fn on_select_by_movement(&self, direction: i32) {
        self.push(TextEvent::SelectByMovement(direction));
    }
}

/// Text listener whose `insert_text` parks the worker until `open()`.
#[derive(Default)]
pub(super) struct GatedListener {
    entered: AtomicBool,
    open: Mutex<bool>,
    opened: Condvar,
    inserted: Mutex<Vec<String>>,
}

impl GatedListener {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub(super) fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    pub(super) fn inserted(&self) -> Vec<String> {
        self.inserted.lock().unwrap().clone()
    }
}

impl TextListener for GatedListener {
    fn insert_text(&self, text: &str) {
        self.entered.store(true, Ordering::SeqCst);
        let open = self.open.lock().unwrap();
        drop(self.opened.wait_while(open, |open| !*open).unwrap());
        self.inserted.lock().unwrap().push(text.to_string());
    }
    fn delete_forward(&self, _length: i32) {}
    fn delete_backward(&self, _length: i32) {}
    fn send_keyboard_status(&self, _status: KeyboardStatus) {}
    fn send_function_key(&self, _key: FunctionKey) {}
    fn move_cursor(&self, _direction: Direction) {}
    fn handle_set_selection(&self, _start: i32, _end: i32) {}
    fn handle_extend_action(&self, _action: i32) {}
    fn handle_select(&self, _key_code: i32, _cursor_move_skip: i32) {}
}

pub(super) fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.recovery.base_delay_ms = 20;
    settings.channel.result_timeout_ms = 500;
    settings
}

pub(super) struct Fixture {
    pub service: Arc<LoopbackService>,
    pub registry: Arc<LoopbackRegistry>,
    pub controller: Arc<InputMethodController>,
    pub listener: Arc<RecordingListener>,
}

impl Fixture {
    pub(super) fn new() -> Self {
        let settings = test_settings();
        let service = LoopbackService::new();
        let registry =
            LoopbackRegistry::new(settings.service.system_ability_id, Arc::clone(&service));
        let controller = InputMethodController::new(registry.clone(), settings).unwrap();
        Self {
            service,
            registry,
            controller,
            listener: RecordingListener::new(),
        }
    }

    /// Attach with the fixture's listener and wait for the agent.
    pub(super) fn attached() -> Self {
        let f = Self::new();
        f.controller.attach(f.listener.clone()).unwrap();
        assert!(wait_until(|| f.controller.has_agent()));
        f
    }

    /// Wait until the listener has recorded `n` events.
    pub(super) fn wait_events(&self, n: usize) -> Vec<TextEvent> {
        assert!(
            wait_until(|| self.listener.events().len() >= n),
            "expected {n} events, got {:?}",
            self.listener.events()
        );
        self.listener.events()
    }
}

pub(super) fn cursor(left: f64, top: f64) -> CursorInfo {
    CursorInfo {
        left,
        top,
        width: 1.0,
        height: 20.0,
    }
}

/// Poll `cond` for up to two seconds.
pub(super) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

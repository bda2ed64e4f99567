//! Scripted sessions against the in-process loopback service.
//!
//! A script is a TOML file with a list of `[[steps]]`, each naming an
//! `action`. Application-side actions call the controller; input-method-side
//! actions push through the loopback service. After every step the runner
//! waits for the worker to go quiet and records what the listeners and the
//! agent observed.
//!
//! ```toml
//! [[steps]]
//! action = "attach"
//!
//! [[steps]]
//! action = "selection"
//! text = "hello"
//! start = 5
//! end = 5
//!
//! [[steps]]
//! action = "insert_text"
//! text = "!"
//! ```

use std::fs;
use std::process;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use imf_client::listener::{ControllerListener, SettingListener, TextListener};
use imf_client::loopback::{LoopbackRegistry, LoopbackService};
use imf_client::{ImfError, InputMethodController, Settings};
use imf_core::types::{
    CursorInfo, Direction, EnterKeyType, FunctionKey, InputWindowInfo, InputWindowStatus,
    KeyEvent, KeyboardStatus, Property, SubProperty,
};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Settings(#[from] imf_core::settings::SettingsError),
    #[error("failed to start controller: {0}")]
    Controller(#[from] ImfError),
}

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Settings TOML to run with instead of the defaults.
    #[serde(default)]
    pub settings: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardArg {
    None,
    Hide,
    Show,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionArg {
    Up,
    Down,
    Left,
    Right,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    // Application side
    Attach {
        #[serde(default = "default_true")]
        show_keyboard: bool,
    },
    Close,
    ShowTextInput,
    HideTextInput,
    StopInputSession,
    Cursor {
        left: f64,
        top: f64,
        #[serde(default = "default_height")]
        height: f64,
    },
    Selection {
        text: String,
        start: i32,
        end: i32,
    },
    CallingWindow {
        window_id: u32,
    },
    Key {
        key_code: i32,
        #[serde(default)]
        key_action: i32,
    },
    Subscribe {
        event: String,
        #[serde(default = "default_true")]
        on: bool,
    },
    Switch {
        name: String,
        #[serde(default)]
        subtype: String,
    },
    ListInputMethods,

    // Input method side
    InsertText {
        text: String,
    },
    DeleteForward {
        length: i32,
    },
    DeleteBackward {
        length: i32,
    },
    KeyboardStatus {
        status: KeyboardArg,
    },
    FunctionKey {
        enter_key_type: i32,
    },
    MoveCursor {
        direction: DirectionArg,
    },
    SelectByRange {
        start: i32,
        end: i32,
    },
    SelectByMovement {
        direction: i32,
        #[serde(default)]
        skip: i32,
    },
    ExtendAction {
        action_code: i32,
    },
    PanelStatus {
        show: bool,
    },
    TextBefore {
        number: i32,
    },
    TextAfter {
        number: i32,
    },
    TextIndex,
    StopInput,

    // Service lifecycle
    Kill,
    Restart,
    Sleep {
        ms: u64,
    },
}

fn default_height() -> f64 {
    20.0
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Attach { .. } => "attach",
            Step::Close => "close",
            Step::ShowTextInput => "show_text_input",
            Step::HideTextInput => "hide_text_input",
            Step::StopInputSession => "stop_input_session",
            Step::Cursor { .. } => "cursor",
            Step::Selection { .. } => "selection",
            Step::CallingWindow { .. } => "calling_window",
            Step::Key { .. } => "key",
            Step::Subscribe { .. } => "subscribe",
            Step::Switch { .. } => "switch",
            Step::ListInputMethods => "list_input_methods",
            Step::InsertText { .. } => "insert_text",
            Step::DeleteForward { .. } => "delete_forward",
            Step::DeleteBackward { .. } => "delete_backward",
            Step::KeyboardStatus { .. } => "keyboard_status",
            Step::FunctionKey { .. } => "function_key",
            Step::MoveCursor { .. } => "move_cursor",
            Step::SelectByRange { .. } => "select_by_range",
            Step::SelectByMovement { .. } => "select_by_movement",
            Step::ExtendAction { .. } => "extend_action",
            Step::PanelStatus { .. } => "panel_status",
            Step::TextBefore { .. } => "text_before",
            Step::TextAfter { .. } => "text_after",
            Step::TextIndex => "text_index",
            Step::StopInput => "stop_input",
            Step::Kill => "kill",
            Step::Restart => "restart",
            Step::Sleep { .. } => "sleep",
        }
    }
}

/// What one step did and what it caused.
#[derive(Debug, Serialize)]
pub struct StepLog {
    pub index: usize,
    pub action: &'static str,
    pub result: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

/// Listener that renders every callback as one log line.
#[derive(Default)]
struct EventLog {
    lines: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, line: String) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }

    fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl TextListener for EventLog {
    fn insert_text(&self, text: &str) {
        self.push(format!("insert_text {text:?}"));
    }
    fn delete_forward(&self, length: i32) {
        self.push(format!("delete_forward {length}"));
    }
    fn delete_backward(&self, length: i32) {
        self.push(format!("delete_backward {length}"));
    }
    fn send_keyboard_status(&self, status: KeyboardStatus) {
        self.push(format!("keyboard_status {status:?}"));
    }
    fn send_function_key(&self, key: FunctionKey) {
        self.push(format!("function_key {:?}", key.enter_key_type));
    }
    fn move_cursor(&self, direction: Direction) {
        self.push(format!("move_cursor {direction:?}"));
    }
    fn handle_set_selection(&self, start: i32, end: i32) {
        self.push(format!("set_selection {start}..{end}"));
    }
    fn handle_extend_action(&self, action: i32) {
        self.push(format!("extend_action {action}"));
    }
    fn handle_select(&self, key_code: i32, cursor_move_skip: i32) {
        self.push(format!("select key_code={key_code} skip={cursor_move_skip}"));
    }
}

impl SettingListener for EventLog {
    fn on_ime_change(&self, property: &Property, sub_property: &SubProperty) {
        self.push(format!("ime_change {} {}", property.name, sub_property.id));
    }
    fn on_panel_status_change(&self, status: InputWindowStatus, windows: &[InputWindowInfo]) {
        self.push(format!("panel_status {status:?} windows={}", windows.len()));
    }
}

impl ControllerListener for EventLog {
    fn on_select_by_range(&self, start: i32, end: i32) {
        self.push(format!("controller select_by_range {start}..{end}"));
    }
    fn on_select_by_movement(&self, direction: i32) {
        self.push(format!("controller select_by_movement {direction}"));
    }
}

pub fn parse_script(content: &str) -> Result<Script, ScriptError> {
    Ok(toml::from_str(content)?)
}

struct Runner {
    service: Arc<LoopbackService>,
    controller: Arc<InputMethodController>,
    log: Arc<EventLog>,
    agent_seen: usize,
}

impl Runner {
    fn new(settings: Settings) -> Result<Self, ScriptError> {
        let service = LoopbackService::new();
        let registry =
            LoopbackRegistry::new(settings.service.system_ability_id, Arc::clone(&service));
        let controller = InputMethodController::new(registry, settings)?;
        let log = Arc::new(EventLog::default());
        controller.set_setting_listener(Some(log.clone()));
        controller.set_controller_listener(log.clone());
        Ok(Self {
            service,
            controller,
            log,
            agent_seen: 0,
        })
    }

    fn step(&mut self, step: &Step) -> Result<String, ImfError> {
        let c = &self.controller;
        let s = &self.service;
        let ok = |()| "ok".to_string();
        match step {
            Step::Attach { show_keyboard } => {
                c.attach_with(self.log.clone(), *show_keyboard).map(ok)
            }
            Step::Close => c.close().map(ok),
            Step::ShowTextInput => c.show_text_input().map(ok),
            Step::HideTextInput => c.hide_text_input().map(ok),
            Step::StopInputSession => c.stop_input_session().map(ok),
            Step::Cursor { left, top, height } => c
                .on_cursor_update(CursorInfo {
                    left: *left,
                    top: *top,
                    width: 1.0,
                    height: *height,
                })
                .map(ok),
            Step::Selection { text, start, end } => {
                c.on_selection_change(text, *start, *end).map(ok)
            }
            Step::CallingWindow { window_id } => c.set_calling_window(*window_id).map(ok),
            Step::Key {
                key_code,
                key_action,
            } => c
                .dispatch_key_event(KeyEvent {
                    key_code: *key_code,
                    key_action: *key_action,
                })
                .map(|consumed| format!("consumed={consumed}")),
            Step::Subscribe { event, on } => c.update_listen_event_flag(event, *on).map(ok),
            Step::Switch { name, subtype } => c.switch_input_method(name, subtype).map(ok),
            Step::ListInputMethods => c.list_input_method().map(|props| {
                props
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            Step::InsertText { text } => s.insert_text(text).map(ok),
            Step::DeleteForward { length } => s.delete_forward(*length).map(ok),
            Step::DeleteBackward { length } => s.delete_backward(*length).map(ok),
            Step::KeyboardStatus { status } => {
                let status = match status {
                    KeyboardArg::None => KeyboardStatus::None,
                    KeyboardArg::Hide => KeyboardStatus::Hide,
                    KeyboardArg::Show => KeyboardStatus::Show,
                };
                s.send_keyboard_status(status).map(ok)
            }
            Step::FunctionKey { enter_key_type } => {
                let key = EnterKeyType::from_i32(*enter_key_type).ok_or_else(|| {
                    ImfError::BadParameters(format!("enter key type {enter_key_type}"))
                })?;
                s.send_function_key(key).map(ok)
            }
            Step::MoveCursor { direction } => {
                let direction = match direction {
                    DirectionArg::Up => Direction::Up,
                    DirectionArg::Down => Direction::Down,
                    DirectionArg::Left => Direction::Left,
                    DirectionArg::Right => Direction::Right,
                };
                s.move_cursor(direction).map(ok)
            }
            Step::SelectByRange { start, end } => s.select_by_range(*start, *end).map(ok),
            Step::SelectByMovement { direction, skip } => {
                s.select_by_movement(*direction, *skip).map(ok)
            }
            Step::ExtendAction { action_code } => s.handle_extend_action(*action_code).map(ok),
            Step::PanelStatus { show } => {
                let status = if *show {
                    InputWindowStatus::Show
                } else {
                    InputWindowStatus::Hide
                };
                s.panel_status_change(status, Vec::new()).map(ok)
            }
            Step::TextBefore { number } => s
                .get_text_before_cursor(*number)
                .map(|t| format!("{t:?}")),
            Step::TextAfter { number } => s
                .get_text_after_cursor(*number)
                .map(|t| format!("{t:?}")),
            Step::TextIndex => s.get_text_index_at_cursor().map(|i| i.to_string()),
            Step::StopInput => s.stop_input().map(ok),
            Step::Kill => {
                s.kill();
                Ok("ok".into())
            }
            Step::Restart => {
                s.restart();
                self.agent_seen = 0;
                Ok("ok".into())
            }
            Step::Sleep { ms } => {
                thread::sleep(Duration::from_millis(*ms));
                Ok("ok".into())
            }
        }
    }

    /// Wait until no new listener callback has arrived for a few polls and
    /// an editable session has its agent.
    fn settle(&self) {
        let deadline = Instant::now() + Duration::from_millis(500);
        let mut last = self.log.len();
        let mut quiet = 0;
        let awaiting_agent = || self.controller.is_editable() && !self.controller.has_agent();
        while (quiet < 4 || awaiting_agent()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            let now = self.log.len();
            if now == last {
                quiet += 1;
            } else {
                quiet = 0;
                last = now;
            }
        }
    }

    fn drain_events(&mut self) -> Vec<String> {
        let mut events = self.log.take();
        let calls = self.service.agent().calls();
        for call in calls.iter().skip(self.agent_seen) {
            events.push(format!("agent {call:?}"));
        }
        self.agent_seen = calls.len();
        events
    }
}

/// Run every step in order. Step failures are recorded, not fatal.
pub fn run_script(script: &Script) -> Result<Vec<StepLog>, ScriptError> {
    let settings = match &script.settings {
        Some(content) => imf_core::settings::parse_settings_toml(content)?,
        None => Settings::default(),
    };
    let mut runner = Runner::new(settings)?;
    let mut logs = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let result = match runner.step(step) {
            Ok(result) => result,
            Err(e) => format!("error {}: {e}", e.code()),
        };
        runner.settle();
        logs.push(StepLog {
            index,
            action: step.name(),
            result,
            events: runner.drain_events(),
        });
    }
    runner.controller.quit_work_thread();
    Ok(logs)
}

pub fn format_text(logs: &[StepLog]) -> String {
    let mut out = String::new();
    for log in logs {
        out.push_str(&format!("[{}] {}: {}\n", log.index, log.action, log.result));
        for event in &log.events {
            out.push_str(&format!("      {event}\n"));
        }
    }
    out
}

pub fn simulate(file: &str, json: bool) {
    let logs = fs::read_to_string(file)
        .map_err(ScriptError::from)
        .and_then(|content| parse_script(&content))
        .and_then(|script| run_script(&script))
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            process::exit(1);
        });
    if json {
        match serde_json::to_string_pretty(&logs) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    } else {
        print!("{}", format_text(&logs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(toml: &str) -> Vec<StepLog> {
        run_script(&parse_script(toml).unwrap()).unwrap()
    }

    #[test]
    fn typing_session() {
        let logs = run(r#"
            [[steps]]
            action = "attach"

            [[steps]]
            action = "selection"
            text = "hello"
            start = 5
            end = 5

            [[steps]]
            action = "insert_text"
            text = "!"

            [[steps]]
            action = "delete_forward"
            length = 1

            [[steps]]
            action = "text_before"
            number = 2
        "#);
        assert_eq!(logs.len(), 5);
        assert!(logs.iter().all(|l| !l.result.starts_with("error")));
        assert_eq!(logs[2].events, vec!["insert_text \"!\"".to_string()]);
        assert_eq!(logs[3].events, vec!["delete_backward 1".to_string()]);
        assert_eq!(logs[4].result, "\"lo\"");
        assert!(logs[1].events.iter().any(|e| e.starts_with("agent Selection")));
    }

    #[test]
    fn errors_are_recorded_per_step() {
        let logs = run(r#"
            [[steps]]
            action = "show_text_input"

            [[steps]]
            action = "subscribe"
            event = "bogus"
        "#);
        assert!(logs[0].result.starts_with("error 3:"));
        assert!(logs[1].result.starts_with("error 6:"));
    }

    #[test]
    fn recovery_replays_to_new_agent() {
        let logs = run(r#"
            settings = """
            [service]
            system_ability_id = 3703
            [recovery]
            max_attempts = 5
            base_delay_ms = 10
            [channel]
            capacity = 16
            result_timeout_ms = 500
            [parcel]
            max_capacity = 204800
            """

            [[steps]]
            action = "attach"

            [[steps]]
            action = "cursor"
            left = 3
            top = 4

            [[steps]]
            action = "kill"

            [[steps]]
            action = "restart"

            [[steps]]
            action = "sleep"
            ms = 150
        "#);
        // The replay lands on the fresh agent after the restart.
        let replayed: Vec<&String> = logs[3..].iter().flat_map(|l| &l.events).collect();
        assert_eq!(
            replayed
                .iter()
                .filter(|e| e.starts_with("agent Cursor"))
                .count(),
            1,
            "{replayed:?}"
        );
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let err = parse_script("[[steps]]\naction = \"dance\"\n").unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }

    #[test]
    fn reads_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.toml");
        fs::write(&path, "[[steps]]\naction = \"list_input_methods\"\n").unwrap();
        let script = parse_script(&fs::read_to_string(&path).unwrap()).unwrap();
        let logs = run_script(&script).unwrap();
        assert_eq!(logs[0].result, "com.example.loopback");
    }
}

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ImfError;
use crate::parcel::{Parcel, ParcelError};
use crate::remote::{MessageOption, RemoteObject};
use crate::types::KeyEvent;

pub const AGENT_DESCRIPTOR: &str = "ohos.miscservices.inputmethod.IInputMethodAgent";

/// Operation codes understood by the input method agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCode {
    DispatchKeyEvent = 0,
    OnCursorUpdate = 1,
    OnSelectionChange = 2,
    SetCallingWindow = 3,
}

impl AgentCode {
    pub const ALL: &'static [AgentCode] = &[
        AgentCode::DispatchKeyEvent,
        AgentCode::OnCursorUpdate,
        AgentCode::OnSelectionChange,
        AgentCode::SetCallingWindow,
    ];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u32() == code)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DispatchKeyEvent => "DISPATCH_KEY_EVENT",
            Self::OnCursorUpdate => "ON_CURSOR_UPDATE",
            Self::OnSelectionChange => "ON_SELECTION_CHANGE",
            Self::SetCallingWindow => "SET_CALLING_WINDOW",
        }
    }
}

/// Proxy for the agent the input method hands back on `OnInputReady`.
///
/// Editor state updates are one-way; only key dispatch waits for a reply.
#[derive(Clone)]
pub struct AgentProxy {
    remote: Arc<dyn RemoteObject>,
}

impl AgentProxy {
    pub fn new(remote: Arc<dyn RemoteObject>) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteObject> {
        &self.remote
    }

    /// Returns whether the input method consumed the key.
    pub fn dispatch_key_event(&self, event: KeyEvent) -> Result<bool, ImfError> {
        let mut reply = self.send(AgentCode::DispatchKeyEvent, MessageOption::Sync, |data| {
            data.write_i32(event.key_code)?;
            data.write_i32(event.key_action)
        })?;
        let status = reply.read_i32().map_err(ImfError::Decode)?;
        ImfError::check_status(status)?;
        reply.read_bool().map_err(ImfError::Decode)
    }

    /// The wire carries whole pixels; callers truncate their coordinates.
    pub fn on_cursor_update(&self, left: i32, top: i32, height: i32) -> Result<(), ImfError> {
        self.send(AgentCode::OnCursorUpdate, MessageOption::Async, |data| {
            data.write_i32(left)?;
            data.write_i32(top)?;
            data.write_i32(height)
        })
        .map(drop)
    }

    pub fn on_selection_change(
        &self,
        text: &str,
        old_begin: i32,
        old_end: i32,
        new_begin: i32,
        new_end: i32,
    ) -> Result<(), ImfError> {
        self.send(AgentCode::OnSelectionChange, MessageOption::Async, |data| {
            data.write_string16(text)?;
            data.write_i32(old_begin)?;
            data.write_i32(old_end)?;
            data.write_i32(new_begin)?;
            data.write_i32(new_end)
        })
        .map(drop)
    }

    pub fn set_calling_window(&self, window_id: u32) -> Result<(), ImfError> {
        self.send(AgentCode::SetCallingWindow, MessageOption::Async, |data| {
            data.write_u32(window_id)
        })
        .map(drop)
    }

    fn send<F>(&self, code: AgentCode, option: MessageOption, encode: F) -> Result<Parcel, ImfError>
    where
        F: FnOnce(&mut Parcel) -> Result<(), ParcelError>,
    {
        let mut data = Parcel::new();
        let mut reply = Parcel::new();
        data.write_interface_token(AGENT_DESCRIPTOR)
            .map_err(|_| ImfError::InterfaceToken)?;
        encode(&mut data).map_err(ImfError::Encode)?;
        self.remote
            .send_request(code.as_u32(), &mut data, &mut reply, option)
            .map_err(|e| {
                error!(op = code.name(), "agent request failed: {e}");
                ImfError::Transport(e)
            })?;
        debug!(op = code.name(), "agent request sent");
        Ok(reply)
    }
}

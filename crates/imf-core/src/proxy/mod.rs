//! Client-side proxies for the input method system ability and for the
//! per-session agent.
//!
//! Every system-ability operation funnels through
//! [`SystemAbilityProxy::send_request`]: interface token, optional encoder,
//! one blocking call, leading status, optional decoder. Operations differ
//! only in their op code and the closures they pass.

mod agent;

pub use agent::{AgentCode, AgentProxy, AGENT_DESCRIPTOR};

use std::sync::Arc;

use tracing::{debug, debug_span, error};

use crate::client_info::ClientInfo;
use crate::error::ImfError;
use crate::event_flag::EventType;
use crate::parcel::{Parcel, ParcelError, Parcelable, DEFAULT_MAX_CAPACITY};
use crate::remote::{MessageOption, RemoteObject};
use crate::types::{InputMethodStatus, Property, SubProperty};

pub const SYSTEM_ABILITY_DESCRIPTOR: &str =
    "ohos.miscservices.inputmethod.IInputMethodSystemAbility";

macro_rules! ability_codes {
    ($($variant:ident = $value:literal => $name:literal),+ $(,)?) => {
        /// Operation codes understood by the input method system ability.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AbilityCode {
            $($variant = $value),+
        }

        impl AbilityCode {
            pub const ALL: &'static [AbilityCode] = &[$(AbilityCode::$variant),+];

            pub fn from_u32(code: u32) -> Option<Self> {
                match code {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

ability_codes! {
    PrepareInput = 0 => "PREPARE_INPUT",
    ReleaseInput = 1 => "RELEASE_INPUT",
    StartInput = 2 => "START_INPUT",
    StopInput = 3 => "STOP_INPUT",
    HideCurrentInput = 4 => "HIDE_CURRENT_INPUT",
    ShowCurrentInput = 5 => "SHOW_CURRENT_INPUT",
    GetKeyboardWindowHeight = 8 => "GET_KEYBOARD_WINDOW_HEIGHT",
    GetCurrentInputMethod = 9 => "GET_CURRENT_INPUT_METHOD",
    ListInputMethod = 11 => "LIST_INPUT_METHOD",
    SetCoreAndAgent = 13 => "SET_CORE_AND_AGENT",
    DisplayOptionalInputMethod = 14 => "DISPLAY_OPTIONAL_INPUT_METHOD",
    SwitchInputMethod = 15 => "SWITCH_INPUT_METHOD",
    ShowCurrentInputDeprecated = 16 => "SHOW_CURRENT_INPUT_DEPRECATED",
    HideCurrentInputDeprecated = 17 => "HIDE_CURRENT_INPUT_DEPRECATED",
    DisplayOptionalInputMethodDeprecated = 18 => "DISPLAY_OPTIONAL_INPUT_METHOD_DEPRECATED",
    SetCoreAndAgentDeprecated = 19 => "SET_CORE_AND_AGENT_DEPRECATED",
    GetCurrentInputMethodSubtype = 20 => "GET_CURRENT_INPUT_METHOD_SUBTYPE",
    ListInputMethodSubtype = 21 => "LIST_INPUT_METHOD_SUBTYPE",
    ListCurrentInputMethodSubtype = 22 => "LIST_CURRENT_INPUT_METHOD_SUBTYPE",
    UpdateListenEventFlag = 23 => "UPDATE_LISTEN_EVENT_FLAG",
    StopInputSession = 24 => "STOP_INPUT_SESSION",
}

impl AbilityCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Writes the operation-specific request body.
pub type ParcelWriter<'a> = &'a dyn Fn(&mut Parcel) -> Result<(), ParcelError>;
/// Reads the operation-specific reply body after a successful status.
pub type ParcelReader<'a> = &'a mut dyn FnMut(&mut Parcel) -> Result<(), ParcelError>;

pub struct SystemAbilityProxy {
    remote: Arc<dyn RemoteObject>,
    max_capacity: usize,
}

impl SystemAbilityProxy {
    pub fn new(remote: Arc<dyn RemoteObject>) -> Self {
        Self::with_max_capacity(remote, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_max_capacity(remote: Arc<dyn RemoteObject>, max_capacity: usize) -> Self {
        Self {
            remote,
            max_capacity,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteObject> {
        &self.remote
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    pub fn prepare_input(&self, info: &ClientInfo) -> Result<(), ImfError> {
        self.send_request(AbilityCode::PrepareInput, Some(&|data| info.marshal(data)), None)
    }

    pub fn start_input(
        &self,
        client: &Arc<dyn RemoteObject>,
        is_show_keyboard: bool,
    ) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::StartInput,
            Some(&|data| {
                data.write_remote_object(Some(client))?;
                data.write_bool(is_show_keyboard)
            }),
            None,
        )
    }

    pub fn stop_input(&self, client: &Arc<dyn RemoteObject>) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::StopInput,
            Some(&|data| data.write_remote_object(Some(client))),
            None,
        )
    }

    pub fn release_input(&self, client: &Arc<dyn RemoteObject>) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::ReleaseInput,
            Some(&|data| data.write_remote_object(Some(client))),
            None,
        )
    }

    pub fn stop_input_session(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::StopInputSession, None, None)
    }

    pub fn update_listen_event_flag(
        &self,
        info: &ClientInfo,
        event: EventType,
    ) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::UpdateListenEventFlag,
            Some(&|data| {
                info.marshal(data)?;
                data.write_u32(event.as_u32())
            }),
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Keyboard visibility
    // -----------------------------------------------------------------------

    pub fn show_current_input(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::ShowCurrentInput, None, None)
    }

    pub fn hide_current_input(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::HideCurrentInput, None, None)
    }

    pub fn show_current_input_deprecated(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::ShowCurrentInputDeprecated, None, None)
    }

    pub fn hide_current_input_deprecated(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::HideCurrentInputDeprecated, None, None)
    }

    pub fn display_optional_input_method(&self) -> Result<(), ImfError> {
        self.send_request(AbilityCode::DisplayOptionalInputMethod, None, None)
    }

    pub fn display_optional_input_method_deprecated(&self) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::DisplayOptionalInputMethodDeprecated,
            None,
            None,
        )
    }

    pub fn get_keyboard_window_height(&self) -> Result<i32, ImfError> {
        let mut height = 0;
        self.send_request(
            AbilityCode::GetKeyboardWindowHeight,
            None,
            Some(&mut |reply| {
                height = reply.read_i32()?;
                Ok(())
            }),
        )?;
        Ok(height)
    }

    // -----------------------------------------------------------------------
    // Input method core registration (input method side)
    // -----------------------------------------------------------------------

    pub fn set_core_and_agent(
        &self,
        core: &Arc<dyn RemoteObject>,
        agent: &Arc<dyn RemoteObject>,
    ) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::SetCoreAndAgent,
            Some(&|data| {
                data.write_remote_object(Some(core))?;
                data.write_remote_object(Some(agent))
            }),
            None,
        )
    }

    pub fn set_core_and_agent_deprecated(
        &self,
        core: &Arc<dyn RemoteObject>,
        agent: &Arc<dyn RemoteObject>,
    ) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::SetCoreAndAgentDeprecated,
            Some(&|data| {
                data.write_remote_object(Some(core))?;
                data.write_remote_object(Some(agent))
            }),
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Input method inventory
    // -----------------------------------------------------------------------

    pub fn get_current_input_method(&self) -> Result<Property, ImfError> {
        self.query(AbilityCode::GetCurrentInputMethod, None)
    }

    pub fn get_current_input_method_subtype(&self) -> Result<SubProperty, ImfError> {
        self.query(AbilityCode::GetCurrentInputMethodSubtype, None)
    }

    pub fn list_input_method(&self, status: InputMethodStatus) -> Result<Vec<Property>, ImfError> {
        self.query(
            AbilityCode::ListInputMethod,
            Some(&|data| data.write_u32(status.as_i32() as u32)),
        )
    }

    pub fn list_input_method_subtype(&self, name: &str) -> Result<Vec<SubProperty>, ImfError> {
        self.query(
            AbilityCode::ListInputMethodSubtype,
            Some(&|data| data.write_string(name)),
        )
    }

    pub fn list_current_input_method_subtype(&self) -> Result<Vec<SubProperty>, ImfError> {
        self.query(AbilityCode::ListCurrentInputMethodSubtype, None)
    }

    pub fn switch_input_method(&self, name: &str, sub_name: &str) -> Result<(), ImfError> {
        self.send_request(
            AbilityCode::SwitchInputMethod,
            Some(&|data| {
                data.write_string(name)?;
                data.write_string(sub_name)
            }),
            None,
        )
    }

    /// Request whose reply body is a single [`Parcelable`] value.
    fn query<T: Parcelable>(
        &self,
        code: AbilityCode,
        input: Option<ParcelWriter<'_>>,
    ) -> Result<T, ImfError> {
        let mut value = None;
        self.send_request(
            code,
            input,
            Some(&mut |reply| {
                value = Some(T::unmarshal(reply)?);
                Ok(())
            }),
        )?;
        value.ok_or(ImfError::Decode(ParcelError::Underflow {
            needed: T::MIN_WIRE_SIZE,
            available: 0,
        }))
    }

    /// The one request/reply primitive every operation goes through.
    pub fn send_request(
        &self,
        code: AbilityCode,
        input: Option<ParcelWriter<'_>>,
        output: Option<ParcelReader<'_>>,
    ) -> Result<(), ImfError> {
        let _span = debug_span!("send_request", op = code.name()).entered();
        let mut data = Parcel::with_max_capacity(self.max_capacity);
        let mut reply = Parcel::with_max_capacity(self.max_capacity);

        if let Err(e) = data.write_interface_token(SYSTEM_ABILITY_DESCRIPTOR) {
            error!("write interface token failed: {e}");
            return Err(ImfError::InterfaceToken);
        }
        if let Some(input) = input {
            input(&mut data).map_err(|e| {
                error!("write data failed: {e}");
                ImfError::Encode(e)
            })?;
        }

        self.remote
            .send_request(code.as_u32(), &mut data, &mut reply, MessageOption::Sync)
            .map_err(|e| {
                error!("send request failed: {e}");
                ImfError::Transport(e)
            })?;

        let status = reply.read_i32().map_err(|e| {
            error!("reply carries no status: {e}");
            ImfError::Decode(e)
        })?;
        if let Err(e) = ImfError::check_status(status) {
            error!("reply error, status {status}");
            return Err(e);
        }

        if let Some(output) = output {
            output(&mut reply).map_err(|e| {
                error!("reply parcel error: {e}");
                match e {
                    ParcelError::LengthOutOfRange { .. } => ImfError::BadParameters(e.to_string()),
                    other => ImfError::Decode(other),
                }
            })?;
        }
        debug!("request completed");
        Ok(())
    }
}

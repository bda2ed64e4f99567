//! In-process stand-in for the input method system ability.
//!
//! [`LoopbackService`] speaks the same request/reply protocol as the real
//! service, hands out a [`LoopbackAgent`] on `StartInput`, and can play the
//! input method's side of the conversation (insert text, select, query the
//! editor) through the client's stubs. [`LoopbackRegistry`] resolves it by
//! id and can simulate lookup failure. Used by tests and by `imftool
//! simulate`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use imf_core::client_info::RemoteClientInfo;
use imf_core::error::code;
use imf_core::event_flag::{EventFlags, EventType};
use imf_core::proxy::{AbilityCode, AgentCode, AGENT_DESCRIPTOR, SYSTEM_ABILITY_DESCRIPTOR};
use imf_core::remote::{BAD_REQUEST, DEAD_OBJECT, UNKNOWN_TRANSACTION};
use imf_core::stub::{
    ChannelCode, ClientCode, INPUT_CLIENT_DESCRIPTOR, INPUT_DATA_CHANNEL_DESCRIPTOR,
};
use imf_core::types::{
    Direction, EnterKeyType, InputAttribute, InputMethodStatus, InputWindowInfo,
    InputWindowStatus, KeyEvent, KeyboardStatus, Property, SubProperty,
};
use imf_core::{
    DeathRecipient, ImfError, MessageOption, Parcel, ParcelError, Parcelable, RemoteObject,
    SystemAbilityManager, TransportError,
};
use tracing::{debug, info, warn};

use crate::controller::lock;

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// One request received by a [`LoopbackAgent`].
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCall {
    Cursor {
        left: i32,
        top: i32,
        height: i32,
    },
    Selection {
        text: String,
        old_begin: i32,
        old_end: i32,
        new_begin: i32,
        new_end: i32,
    },
    CallingWindow(u32),
    Key(KeyEvent),
}

/// Agent object that records what the controller sends it and consumes
/// every key.
#[derive(Default)]
pub struct LoopbackAgent {
    calls: Mutex<Vec<AgentCall>>,
}

impl LoopbackAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        lock(&self.calls).clone()
    }

    pub fn cursor_updates(&self) -> usize {
        self.count(|c| matches!(c, AgentCall::Cursor { .. }))
    }

    pub fn selection_updates(&self) -> usize {
        self.count(|c| matches!(c, AgentCall::Selection { .. }))
    }

    fn count(&self, pred: impl Fn(&AgentCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn decode(code: AgentCode, data: &mut Parcel) -> Result<AgentCall, ParcelError> {
        Ok(match code {
            AgentCode::DispatchKeyEvent => AgentCall::Key(KeyEvent {
                key_code: data.read_i32()?,
                key_action: data.read_i32()?,
            }),
            AgentCode::OnCursorUpdate => AgentCall::Cursor {
                left: data.read_i32()?,
                top: data.read_i32()?,
                height: data.read_i32()?,
            },
            AgentCode::OnSelectionChange => AgentCall::Selection {
                text: data.read_string16()?,
                old_begin: data.read_i32()?,
                old_end: data.read_i32()?,
                new_begin: data.read_i32()?,
                new_end: data.read_i32()?,
            },
            AgentCode::SetCallingWindow => AgentCall::CallingWindow(data.read_u32()?),
        })
    }
}

impl RemoteObject for LoopbackAgent {
    fn descriptor(&self) -> &str {
        AGENT_DESCRIPTOR
    }

    fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> Result<(), TransportError> {
        let op = AgentCode::from_u32(code).ok_or(TransportError(UNKNOWN_TRANSACTION))?;
        data.enforce_interface(AGENT_DESCRIPTOR)
            .map_err(|_| TransportError(BAD_REQUEST))?;
        let call = Self::decode(op, data).map_err(|_| TransportError(BAD_REQUEST))?;
        debug!(op = op.name(), "agent received");
        lock(&self.calls).push(call);
        if option == MessageOption::Sync {
            let bad = |_| TransportError(BAD_REQUEST);
            reply.write_i32(code::NO_ERROR).map_err(bad)?;
            if op == AgentCode::DispatchKeyEvent {
                reply.write_bool(true).map_err(bad)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Session {
    client: Option<Arc<dyn RemoteObject>>,
    channel: Option<Arc<dyn RemoteObject>>,
    attribute: InputAttribute,
    event_flag: EventFlags,
    last_event: Option<u32>,
}

struct ServiceState {
    session: Session,
    show_keyboard: bool,
    methods: Vec<(Property, bool)>,
    subtypes: Vec<SubProperty>,
    current: usize,
    current_subtype: Option<SubProperty>,
    keyboard_height: i32,
    calls: Vec<AbilityCode>,
    failures: HashMap<AbilityCode, i32>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            session: Session::default(),
            show_keyboard: false,
            methods: vec![(
                Property {
                    name: "com.example.loopback".into(),
                    id: "default".into(),
                    label: "Loopback".into(),
                    ..Property::default()
                },
                true,
            )],
            subtypes: vec![SubProperty {
                name: "com.example.loopback".into(),
                id: "default".into(),
                mode: "lower".into(),
                locale: "en-US".into(),
                language: "english".into(),
                ..SubProperty::default()
            }],
            current: 0,
            current_subtype: None,
            keyboard_height: 0,
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }
}

/// In-process input method system ability.
pub struct LoopbackService {
    alive: AtomicBool,
    state: Mutex<ServiceState>,
    agent: Mutex<Arc<LoopbackAgent>>,
    recipients: Mutex<Vec<Arc<dyn DeathRecipient>>>,
    /// `Some` while `OnInputReady` pushes are held back.
    held_ready: Mutex<Option<Vec<Arc<dyn RemoteObject>>>>,
}

impl Default for LoopbackService {
    fn default() -> Self {
        Self {
            alive: AtomicBool::new(true),
            state: Mutex::new(ServiceState::default()),
            agent: Mutex::new(Arc::new(LoopbackAgent::new())),
            recipients: Mutex::new(Vec::new()),
            held_ready: Mutex::new(None),
        }
    }
}

impl LoopbackService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// The agent handed out on the next `StartInput`.
    pub fn agent(&self) -> Arc<LoopbackAgent> {
        Arc::clone(&lock(&self.agent))
    }

    /// Op codes received so far, in order.
    pub fn calls(&self) -> Vec<AbilityCode> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, code: AbilityCode) -> usize {
        lock(&self.state).calls.iter().filter(|c| **c == code).count()
    }

    /// Answer every future `code` request with `status` until cleared.
    pub fn fail(&self, code: AbilityCode, status: i32) {
        lock(&self.state).failures.insert(code, status);
    }

    pub fn clear_failure(&self, code: AbilityCode) {
        lock(&self.state).failures.remove(&code);
    }

    pub fn show_keyboard(&self) -> bool {
        lock(&self.state).show_keyboard
    }

    pub fn event_flag(&self) -> EventFlags {
        lock(&self.state).session.event_flag
    }

    /// Event type carried by the last `UpdateListenEventFlag`.
    pub fn last_event(&self) -> Option<u32> {
        lock(&self.state).session.last_event
    }

    pub fn attribute(&self) -> InputAttribute {
        lock(&self.state).session.attribute
    }

    pub fn set_keyboard_height(&self, height: i32) {
        lock(&self.state).keyboard_height = height;
    }

    pub fn add_input_method(&self, property: Property, enabled: bool, subtypes: Vec<SubProperty>) {
        let mut state = lock(&self.state);
        state.methods.push((property, enabled));
        state.subtypes.extend(subtypes);
    }

    /// Queue `OnInputReady` pushes instead of sending them.
    pub fn hold_input_ready(&self) {
        lock(&self.held_ready).get_or_insert_with(Vec::new);
    }

    /// Send every held `OnInputReady` push and stop holding.
    pub fn release_input_ready(&self) {
        let held = lock(&self.held_ready).take().unwrap_or_default();
        for client in held {
            self.deliver(Push::InputReady(client));
        }
    }

    /// Simulate the service process dying: refuse every request and fire
    /// the registered death recipients.
    pub fn kill(&self) {
        info!("loopback service killed");
        self.alive.store(false, Ordering::SeqCst);
        let recipients = std::mem::take(&mut *lock(&self.recipients));
        for recipient in recipients {
            recipient.on_remote_died();
        }
    }

    /// Bring the service back with a fresh session and a fresh agent.
    pub fn restart(&self) {
        info!("loopback service restarted");
        lock(&self.state).session = Session::default();
        *lock(&self.agent) = Arc::new(LoopbackAgent::new());
        self.alive.store(true, Ordering::SeqCst);
    }

    fn handle(
        &self,
        op: AbilityCode,
        data: &mut Parcel,
        reply: &mut Parcel,
    ) -> Result<Option<Push>, ParcelError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        state.calls.push(op);
        if let Some(status) = state.failures.get(&op).copied() {
            reply.write_i32(status)?;
            return Ok(None);
        }

        let mut status = code::NO_ERROR;
        let mut push = None;
        let mut answer = Answer::Empty;
        match op {
            AbilityCode::PrepareInput => {
                let info = RemoteClientInfo::unmarshal(data)?;
                state.session.client = info.client;
                state.session.channel = info.channel;
                state.session.attribute = info.attribute;
                state.session.event_flag = info.event_flag;
                state.show_keyboard = info.is_show_keyboard;
            }
            AbilityCode::StartInput => {
                let client = data.read_remote_object()?;
                state.show_keyboard = data.read_bool()?;
                match client.or_else(|| state.session.client.clone()) {
                    Some(client) => push = Some(Push::InputReady(client)),
                    None => status = code::ERROR_CLIENT_NOT_BOUND,
                }
            }
            AbilityCode::StopInput => {
                data.read_remote_object()?;
                state.show_keyboard = false;
            }
            AbilityCode::ReleaseInput => {
                data.read_remote_object()?;
                state.session = Session::default();
                state.show_keyboard = false;
            }
            AbilityCode::ShowCurrentInput | AbilityCode::ShowCurrentInputDeprecated => {
                state.show_keyboard = true;
            }
            AbilityCode::HideCurrentInput | AbilityCode::HideCurrentInputDeprecated => {
                state.show_keyboard = false;
            }
            AbilityCode::StopInputSession => {
                state.show_keyboard = false;
            }
            AbilityCode::GetKeyboardWindowHeight => answer = Answer::Int(state.keyboard_height),
            AbilityCode::GetCurrentInputMethod => match state.methods.get(state.current) {
                Some((property, _)) => answer = Answer::Method(property.clone()),
                None => status = code::ERROR_BAD_PARAMETERS,
            },
            AbilityCode::GetCurrentInputMethodSubtype => {
                match Self::current_subtype(state) {
                    Some(sub) => answer = Answer::Subtype(sub),
                    None => status = code::ERROR_BAD_PARAMETERS,
                }
            }
            AbilityCode::ListInputMethod => {
                let filter = data.read_u32()?;
                let props: Vec<Property> = state
                    .methods
                    .iter()
                    .filter(|(_, enabled)| match InputMethodStatus::from_i32(filter as i32) {
                        Some(InputMethodStatus::Enable) => *enabled,
                        Some(InputMethodStatus::Disable) => !*enabled,
                        _ => true,
                    })
                    .map(|(p, _)| p.clone())
                    .collect();
                answer = Answer::Methods(props);
            }
            AbilityCode::ListInputMethodSubtype => {
                let name = data.read_string()?;
                let subs: Vec<SubProperty> = state
                    .subtypes
                    .iter()
                    .filter(|s| s.name == name)
                    .cloned()
                    .collect();
                answer = Answer::Subtypes(subs);
            }
            AbilityCode::ListCurrentInputMethodSubtype => {
                let name = state
                    .methods
                    .get(state.current)
                    .map(|(p, _)| p.name.clone())
                    .unwrap_or_default();
                let subs: Vec<SubProperty> = state
                    .subtypes
                    .iter()
                    .filter(|s| s.name == name)
                    .cloned()
                    .collect();
                answer = Answer::Subtypes(subs);
            }
            AbilityCode::SwitchInputMethod => {
                let name = data.read_string()?;
                let sub_name = data.read_string()?;
                match state.methods.iter().position(|(p, _)| p.name == name) {
                    Some(index) => {
                        state.current = index;
                        state.current_subtype = state
                            .subtypes
                            .iter()
                            .find(|s| s.name == name && (sub_name.is_empty() || s.id == sub_name))
                            .cloned();
                        let property = state.methods[index].0.clone();
                        let sub = Self::current_subtype(state).unwrap_or_default();
                        if state.session.event_flag.contains(EventType::ImeChange) {
                            if let Some(client) = state.session.client.clone() {
                                push = Some(Push::Switch(client, property, sub));
                            }
                        }
                    }
                    None => status = code::ERROR_BAD_PARAMETERS,
                }
            }
            AbilityCode::UpdateListenEventFlag => {
                let info = RemoteClientInfo::unmarshal(data)?;
                let event = data.read_u32()?;
                state.session.event_flag = info.event_flag;
                state.session.last_event = Some(event);
                if state.session.client.is_none() {
                    state.session.client = info.client;
                    state.session.channel = info.channel;
                }
            }
            AbilityCode::SetCoreAndAgent | AbilityCode::SetCoreAndAgentDeprecated => {
                data.read_remote_object()?;
                data.read_remote_object()?;
            }
            AbilityCode::DisplayOptionalInputMethod
            | AbilityCode::DisplayOptionalInputMethodDeprecated => {}
        }

        reply.write_i32(status)?;
        if status == code::NO_ERROR {
            match answer {
                Answer::Empty => {}
                Answer::Int(value) => reply.write_i32(value)?,
                Answer::Method(property) => property.marshal(reply)?,
                Answer::Subtype(sub) => sub.marshal(reply)?,
                Answer::Methods(props) => props.marshal(reply)?,
                Answer::Subtypes(subs) => subs.marshal(reply)?,
            }
        }
        Ok(push)
    }

    fn current_subtype(state: &ServiceState) -> Option<SubProperty> {
        if let Some(sub) = state.current_subtype.clone() {
            return Some(sub);
        }
        let (property, _) = state.methods.get(state.current)?;
        state
            .subtypes
            .iter()
            .find(|s| s.name == property.name)
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Input method side: pushes through the client's stubs
    // -----------------------------------------------------------------------

    fn session(&self) -> Session {
        lock(&self.state).session.clone()
    }

    /// Send one data-channel request with a caller-written body.
    pub fn push_channel(
        &self,
        code: ChannelCode,
        option: MessageOption,
        body: impl FnOnce(&mut Parcel) -> Result<(), ParcelError>,
    ) -> Result<Parcel, ImfError> {
        let channel = self.session().channel.ok_or(ImfError::NotBound)?;
        let mut data = Parcel::new();
        data.write_interface_token(INPUT_DATA_CHANNEL_DESCRIPTOR)
            .map_err(ImfError::Encode)?;
        body(&mut data).map_err(ImfError::Encode)?;
        let mut reply = Parcel::new();
        channel.send_request(code.as_u32(), &mut data, &mut reply, option)?;
        Ok(reply)
    }

    fn push_client(
        client: &Arc<dyn RemoteObject>,
        code: ClientCode,
        body: impl FnOnce(&mut Parcel) -> Result<(), ParcelError>,
    ) -> Result<(), ImfError> {
        let mut data = Parcel::new();
        data.write_interface_token(INPUT_CLIENT_DESCRIPTOR)
            .map_err(ImfError::Encode)?;
        body(&mut data).map_err(ImfError::Encode)?;
        client.send_request(code.as_u32(), &mut data, &mut Parcel::new(), MessageOption::Async)?;
        Ok(())
    }

    fn deliver(&self, push: Push) {
        let result = match push {
            Push::InputReady(client) => {
                if let Some(held) = lock(&self.held_ready).as_mut() {
                    held.push(client);
                    return;
                }
                let agent: Arc<dyn RemoteObject> = self.agent();
                Self::push_client(&client, ClientCode::OnInputReady, |p| {
                    p.write_remote_object(Some(&agent))
                })
            }
            Push::Switch(client, property, sub) => {
                Self::push_client(&client, ClientCode::OnSwitchInput, |p| {
                    property.marshal(p)?;
                    sub.marshal(p)
                })
            }
        };
        if let Err(e) = result {
            warn!("push to client failed: {e}");
        }
    }

    pub fn insert_text(&self, text: &str) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::InsertText, MessageOption::Async, |p| {
            p.write_string16(text)
        })
        .map(drop)
    }

    pub fn delete_forward(&self, length: i32) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::DeleteForward, MessageOption::Async, |p| {
            p.write_i32(length)
        })
        .map(drop)
    }

    pub fn delete_backward(&self, length: i32) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::DeleteBackward, MessageOption::Async, |p| {
            p.write_i32(length)
        })
        .map(drop)
    }

    pub fn send_keyboard_status(&self, status: KeyboardStatus) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::SendKeyboardStatus, MessageOption::Async, |p| {
            status.marshal(p)
        })
        .map(drop)
    }

    pub fn send_function_key(&self, key: EnterKeyType) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::SendFunctionKey, MessageOption::Async, |p| {
            key.marshal(p)
        })
        .map(drop)
    }

    pub fn move_cursor(&self, direction: Direction) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::MoveCursor, MessageOption::Async, |p| {
            direction.marshal(p)
        })
        .map(drop)
    }

    pub fn select_by_range(&self, start: i32, end: i32) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::SelectByRange, MessageOption::Async, |p| {
            p.write_i32(start)?;
            p.write_i32(end)
        })
        .map(drop)
    }

    pub fn select_by_movement(&self, direction: i32, cursor_move_skip: i32) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::SelectByMovement, MessageOption::Async, |p| {
            p.write_i32(direction)?;
            p.write_i32(cursor_move_skip)
        })
        .map(drop)
    }

    pub fn handle_extend_action(&self, action: i32) -> Result<(), ImfError> {
        self.push_channel(ChannelCode::HandleExtendAction, MessageOption::Async, |p| {
            p.write_i32(action)
        })
        .map(drop)
    }

    pub fn get_text_before_cursor(&self, number: i32) -> Result<String, ImfError> {
        let mut reply = self.push_channel(
            ChannelCode::GetTextBeforeCursor,
            MessageOption::Sync,
            |p| p.write_i32(number),
        )?;
        Self::read_text_reply(&mut reply)
    }

    pub fn get_text_after_cursor(&self, number: i32) -> Result<String, ImfError> {
        let mut reply = self.push_channel(
            ChannelCode::GetTextAfterCursor,
            MessageOption::Sync,
            |p| p.write_i32(number),
        )?;
        Self::read_text_reply(&mut reply)
    }

    pub fn get_text_index_at_cursor(&self) -> Result<i32, ImfError> {
        let mut reply = self.push_channel(
            ChannelCode::GetTextIndexAtCursor,
            MessageOption::Sync,
            |_| Ok(()),
        )?;
        Self::read_index_reply(&mut reply)
    }

    pub fn get_enter_key_type(&self) -> Result<i32, ImfError> {
        let mut reply =
            self.push_channel(ChannelCode::GetEnterKeyType, MessageOption::Sync, |_| Ok(()))?;
        Self::read_index_reply(&mut reply)
    }

    pub fn get_input_pattern(&self) -> Result<i32, ImfError> {
        let mut reply =
            self.push_channel(ChannelCode::GetInputPattern, MessageOption::Sync, |_| Ok(()))?;
        Self::read_index_reply(&mut reply)
    }

    fn read_text_reply(reply: &mut Parcel) -> Result<String, ImfError> {
        ImfError::check_status(reply.read_i32().map_err(ImfError::Decode)?)?;
        reply.read_string16().map_err(ImfError::Decode)
    }

    fn read_index_reply(reply: &mut Parcel) -> Result<i32, ImfError> {
        ImfError::check_status(reply.read_i32().map_err(ImfError::Decode)?)?;
        reply.read_i32().map_err(ImfError::Decode)
    }

    /// Tell the client its input session ended.
    pub fn stop_input(&self) -> Result<(), ImfError> {
        let client = self.session().client.ok_or(ImfError::NotBound)?;
        Self::push_client(&client, ClientCode::OnInputStop, |_| Ok(()))
    }

    pub fn panel_status_change(
        &self,
        status: InputWindowStatus,
        windows: Vec<InputWindowInfo>,
    ) -> Result<(), ImfError> {
        let client = self.session().client.ok_or(ImfError::NotBound)?;
        Self::push_client(&client, ClientCode::OnPanelStatusChange, |p| {
            p.write_u32(status.as_i32() as u32)?;
            windows.marshal(p)
        })
    }
}

/// Reply body following the status word.
enum Answer {
    Empty,
    Int(i32),
    Method(Property),
    Subtype(SubProperty),
    Methods(Vec<Property>),
    Subtypes(Vec<SubProperty>),
}

enum Push {
    InputReady(Arc<dyn RemoteObject>),
    Switch(Arc<dyn RemoteObject>, Property, SubProperty),
}

impl RemoteObject for LoopbackService {
    fn descriptor(&self) -> &str {
        SYSTEM_ABILITY_DESCRIPTOR
    }

    fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError(DEAD_OBJECT));
        }
        let op = AbilityCode::from_u32(code).ok_or(TransportError(UNKNOWN_TRANSACTION))?;
        data.enforce_interface(SYSTEM_ABILITY_DESCRIPTOR)
            .map_err(|_| TransportError(BAD_REQUEST))?;
        debug!(op = op.name(), "loopback service received");
        // Pushes go out after the state lock is released.
        let push = self.handle(op, data, reply).map_err(|e| {
            warn!(op = op.name(), "malformed request: {e}");
            TransportError(BAD_REQUEST)
        })?;
        if let Some(push) = push {
            self.deliver(push);
        }
        Ok(())
    }

    fn is_proxy(&self) -> bool {
        true
    }

    fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        if !self.is_alive() {
            return false;
        }
        lock(&self.recipients).push(recipient);
        true
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry that knows exactly one service id.
pub struct LoopbackRegistry {
    id: i32,
    service: Arc<LoopbackService>,
    available: AtomicBool,
}

impl LoopbackRegistry {
    pub fn new(id: i32, service: Arc<LoopbackService>) -> Arc<Self> {
        Arc::new(Self {
            id,
            service,
            available: AtomicBool::new(true),
        })
    }

    pub fn service(&self) -> &Arc<LoopbackService> {
        &self.service
    }

    /// Make lookups fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl SystemAbilityManager for LoopbackRegistry {
    fn get_system_ability(&self, id: i32) -> Option<Arc<dyn RemoteObject>> {
        if id != self.id || !self.available.load(Ordering::SeqCst) || !self.service.is_alive() {
            return None;
        }
        let service: Arc<dyn RemoteObject> = Arc::clone(&self.service) as Arc<dyn RemoteObject>;
        Some(service)
    }
}

//! The input method controller: one editing session between an application
//! and the input method system ability.
//!
//! State is split across small independently locked pieces (client info,
//! agent, text listener, editor cache, configuration) plus two atomic flags.
//! Application calls validate the flags, talk to the service through
//! [`SystemAbilityProxy`], and update state. Service pushes arrive on the
//! stubs, are queued, and are applied by a single worker thread
//! (see `dispatch`). Service death triggers bounded background recovery
//! (see `recovery`).

mod dispatch;
mod recovery;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::thread::{self, JoinHandle};

use imf_core::client_info::ClientInfo;
use imf_core::event_flag::EventType;
use imf_core::message::{self, Message, MessageHandler};
use imf_core::proxy::{AgentProxy, SystemAbilityProxy};
use imf_core::remote::{DeathRecipient, RemoteObject, SystemAbilityManager};
use imf_core::settings::Settings;
use imf_core::stub::{InputClientStub, InputDataChannelStub};
use imf_core::types::{
    Configuration, CursorInfo, EnterKeyType, InputAttribute, InputMethodStatus, KeyEvent,
    Property, SubProperty, TextInputType,
};
use imf_core::ImfError;
use imf_session::{ConfigCache, EditorCache, EditorSnapshot, RetryFamily, SessionFlags};
use tracing::{debug, error, info, warn};

use crate::listener::{ControllerListener, SettingListener, TextListener};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The agent handed back by the input method, plus whether cached editor
/// state still has to be replayed to it after a reattach.
#[derive(Default)]
struct AgentSlot {
    proxy: Option<AgentProxy>,
    object: Option<Arc<dyn RemoteObject>>,
    pending_replay: bool,
}

impl AgentSlot {
    fn clear(&mut self) {
        self.proxy = None;
        self.object = None;
        self.pending_replay = false;
    }
}

pub struct InputMethodController {
    settings: Settings,
    registry: Arc<dyn SystemAbilityManager>,
    self_ref: Weak<InputMethodController>,

    ability: Mutex<Option<Arc<SystemAbilityProxy>>>,
    death_recipient: Arc<dyn DeathRecipient>,

    client_info: Mutex<ClientInfo>,
    flags: SessionFlags,
    agent: Mutex<AgentSlot>,
    text_listener: Mutex<Option<Arc<dyn TextListener>>>,
    setting_listener: Mutex<Option<Arc<dyn SettingListener>>>,
    controller_listener: OnceLock<Arc<dyn ControllerListener>>,
    editor: EditorCache,
    config: ConfigCache,

    handler: MessageHandler,
    stop: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,

    listen_retry: Arc<RetryFamily>,
    attach_retry: Arc<RetryFamily>,
}

impl InputMethodController {
    /// Build a controller and start its worker thread.
    pub fn new(
        registry: Arc<dyn SystemAbilityManager>,
        settings: Settings,
    ) -> Result<Arc<Self>, ImfError> {
        let (handler, receiver) = message::channel(settings.channel.capacity);
        let client: Arc<dyn RemoteObject> = Arc::new(InputClientStub::new(handler.clone()));
        let channel: Arc<dyn RemoteObject> = Arc::new(InputDataChannelStub::new(
            handler.clone(),
            settings.channel.result_timeout(),
        ));

        let controller = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            settings,
            registry,
            self_ref: weak.clone(),
            ability: Mutex::new(None),
            death_recipient: Arc::new(ServiceDeathRecipient {
                controller: weak.clone(),
            }),
            client_info: Mutex::new(ClientInfo::new(client, channel)),
            flags: SessionFlags::new(),
            agent: Mutex::new(AgentSlot::default()),
            text_listener: Mutex::new(None),
            setting_listener: Mutex::new(None),
            controller_listener: OnceLock::new(),
            editor: EditorCache::new(),
            config: ConfigCache::new(),
            handler,
            stop: AtomicBool::new(false),
            worker: Mutex::new(None),
            listen_retry: Arc::new(RetryFamily::new("restore-listen")),
            attach_retry: Arc::new(RetryFamily::new("restore-attach")),
        });

        let weak = Arc::downgrade(&controller);
        let handle = thread::Builder::new()
            .name("imc-worker".into())
            .spawn(move || dispatch::work_loop(weak, receiver))
            .map_err(|e| ImfError::Spawn(e.to_string()))?;
        *lock(&controller.worker) = Some(handle);
        info!("input method controller created");
        Ok(controller)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Service lookup
    // -----------------------------------------------------------------------

    /// Cached proxy, or a fresh lookup with a death watch attached.
    fn system_ability(&self) -> Result<Arc<SystemAbilityProxy>, ImfError> {
        let mut ability = lock(&self.ability);
        if let Some(proxy) = ability.as_ref() {
            return Ok(Arc::clone(proxy));
        }
        debug!("get input method service proxy");
        let Some(remote) = self
            .registry
            .get_system_ability(self.settings.service.system_ability_id)
        else {
            error!("system ability is unavailable");
            return Err(ImfError::ServiceUnavailable);
        };
        if remote.is_proxy() && !remote.add_death_recipient(Arc::clone(&self.death_recipient)) {
            error!("failed to add death recipient");
            return Err(ImfError::ServiceUnavailable);
        }
        let proxy = Arc::new(SystemAbilityProxy::with_max_capacity(
            remote,
            self.settings.parcel.max_capacity,
        ));
        *ability = Some(Arc::clone(&proxy));
        Ok(proxy)
    }

    fn client_object(&self) -> Arc<dyn RemoteObject> {
        Arc::clone(&lock(&self.client_info).client)
    }

    fn set_show_keyboard(&self, show: bool) {
        lock(&self.client_info).is_show_keyboard = show;
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Attach with the keyboard shown and a plain-text field.
    pub fn attach(&self, listener: Arc<dyn TextListener>) -> Result<(), ImfError> {
        self.attach_with(listener, true)
    }

    pub fn attach_with(
        &self,
        listener: Arc<dyn TextListener>,
        show_keyboard: bool,
    ) -> Result<(), ImfError> {
        self.attach_with_attribute(listener, show_keyboard, InputAttribute::default())
    }

    /// Register the client with the service and start input. Both flags are
    /// set on success regardless of `show_keyboard`; on failure they are
    /// left as they were.
    pub fn attach_with_attribute(
        &self,
        listener: Arc<dyn TextListener>,
        show_keyboard: bool,
        attribute: InputAttribute,
    ) -> Result<(), ImfError> {
        info!(show_keyboard, "attach");
        *lock(&self.text_listener) = Some(listener);
        let info = {
            let mut info = lock(&self.client_info);
            info.is_show_keyboard = show_keyboard;
            info.attribute = attribute;
            info.clone()
        };

        let proxy = self.system_ability()?;
        if let Err(e) = proxy.prepare_input(&info) {
            error!("failed to prepare input: {e}");
            return Err(e);
        }
        if let Err(e) = proxy.start_input(&info.client, show_keyboard) {
            error!("failed to start input: {e}");
            return Err(e);
        }
        self.flags.set_attached();
        info!("bound to input method service, editable");
        Ok(())
    }

    pub fn show_text_input(&self) -> Result<(), ImfError> {
        info!("show text input");
        self.flags.check_bound()?;
        self.set_show_keyboard(true);
        let client = self.client_object();
        self.system_ability()?.start_input(&client, true)?;
        self.flags.set_editable(true);
        info!("enter editable state");
        Ok(())
    }

    pub fn hide_text_input(&self) -> Result<(), ImfError> {
        info!("hide text input");
        self.flags.check_bound()?;
        self.flags.set_editable(false);
        let client = self.client_object();
        self.system_ability()?.stop_input(&client)
    }

    pub fn show_current_input(&self) -> Result<(), ImfError> {
        self.flags.check_editable()?;
        let proxy = self.system_ability()?;
        self.set_show_keyboard(true);
        proxy.show_current_input_deprecated()
    }

    pub fn hide_current_input(&self) -> Result<(), ImfError> {
        self.flags.check_editable()?;
        let proxy = self.system_ability()?;
        self.set_show_keyboard(false);
        proxy.hide_current_input_deprecated()
    }

    pub fn show_soft_keyboard(&self) -> Result<(), ImfError> {
        self.flags.check_editable()?;
        let proxy = self.system_ability()?;
        self.set_show_keyboard(true);
        proxy.show_current_input()
    }

    pub fn hide_soft_keyboard(&self) -> Result<(), ImfError> {
        self.flags.check_editable()?;
        let proxy = self.system_ability()?;
        self.set_show_keyboard(false);
        proxy.hide_current_input()
    }

    /// Leave the editable state and ask the service to end the input
    /// session. The client stays bound.
    pub fn stop_input_session(&self) -> Result<(), ImfError> {
        info!("stop input session");
        self.flags.set_editable(false);
        self.system_ability()?.stop_input_session()
    }

    /// Detach. Clears both flags, the listener, the agent and the editor
    /// cache before telling the service. Safe to call when detached.
    pub fn close(&self) -> Result<(), ImfError> {
        info!("close");
        self.flags.clear();
        self.attach_retry.cancel();
        *lock(&self.text_listener) = None;
        lock(&self.agent).clear();
        self.editor.clear();
        let client = self.client_object();
        self.system_ability()?.release_input(&client)
    }

    pub fn was_attached(&self) -> bool {
        self.flags.is_bound()
    }

    pub fn is_editable(&self) -> bool {
        self.flags.is_editable()
    }

    // -----------------------------------------------------------------------
    // Editor state updates
    // -----------------------------------------------------------------------

    pub fn on_cursor_update(&self, cursor: CursorInfo) -> Result<(), ImfError> {
        self.flags.check_bound_editable()?;
        let agent = lock(&self.agent);
        let Some(proxy) = agent.proxy.as_ref() else {
            warn!("agent is null");
            return Err(ImfError::NullAgent);
        };
        if !self.editor.update_cursor(cursor) {
            return Ok(());
        }
        proxy.on_cursor_update(cursor.left as i32, cursor.top as i32, cursor.height as i32)
    }

    /// `start`/`end` are UTF-16 offsets into `text`.
    pub fn on_selection_change(&self, text: &str, start: i32, end: i32) -> Result<(), ImfError> {
        debug!(size = text.len(), start, end, "selection change");
        self.flags.check_bound_editable()?;
        let agent = lock(&self.agent);
        let Some(proxy) = agent.proxy.as_ref() else {
            warn!("agent is null");
            return Err(ImfError::NullAgent);
        };
        let Some(change) = self.editor.update_selection(text, start, end) else {
            return Ok(());
        };
        proxy.on_selection_change(
            &change.text,
            change.old_begin,
            change.old_end,
            change.new_begin,
            change.new_end,
        )
    }

    /// Always succeeds; the configuration outlives attach and detach.
    pub fn on_configuration_change(&self, config: Configuration) -> Result<(), ImfError> {
        debug!(?config, "configuration change");
        self.config.update(config);
        Ok(())
    }

    pub fn get_enter_key_type(&self) -> Result<EnterKeyType, ImfError> {
        self.flags.check_editable()?;
        Ok(self.config.enter_key_type())
    }

    pub fn get_input_pattern(&self) -> Result<TextInputType, ImfError> {
        self.flags.check_editable()?;
        Ok(self.config.input_pattern())
    }

    pub fn set_calling_window(&self, window_id: u32) -> Result<(), ImfError> {
        self.flags.check_bound_editable()?;
        info!(window_id, "set calling window");
        let agent = lock(&self.agent);
        let Some(proxy) = agent.proxy.as_ref() else {
            error!("agent is null");
            return Err(ImfError::NullAgent);
        };
        proxy.set_calling_window(window_id)
    }

    /// Forward a key to the input method. Returns whether it was consumed.
    pub fn dispatch_key_event(&self, event: KeyEvent) -> Result<bool, ImfError> {
        self.flags.check_editable()?;
        let agent = lock(&self.agent);
        let Some(proxy) = agent.proxy.as_ref() else {
            warn!("agent is null");
            return Err(ImfError::NullAgent);
        };
        proxy.dispatch_key_event(event)
    }

    /// Whether the input method has handed back its agent for this session.
    pub fn has_agent(&self) -> bool {
        lock(&self.agent).proxy.is_some()
    }

    pub fn editor_snapshot(&self) -> EditorSnapshot {
        self.editor.snapshot()
    }

    // -----------------------------------------------------------------------
    // Text queries (answered locally; the data channel asks these on the
    // worker thread)
    // -----------------------------------------------------------------------

    pub fn get_text_before_cursor(&self, number: i32) -> Result<String, ImfError> {
        let listener = lock(&self.text_listener).clone();
        self.text_before_cursor_with(listener.as_ref(), number)
    }

    pub fn get_text_after_cursor(&self, number: i32) -> Result<String, ImfError> {
        let listener = lock(&self.text_listener).clone();
        self.text_after_cursor_with(listener.as_ref(), number)
    }

    pub fn get_text_index_at_cursor(&self) -> Result<i32, ImfError> {
        let listener = lock(&self.text_listener).clone();
        self.text_index_at_cursor_with(listener.as_ref())
    }

    fn text_before_cursor_with(
        &self,
        listener: Option<&Arc<dyn TextListener>>,
        number: i32,
    ) -> Result<String, ImfError> {
        self.flags.check_editable()?;
        let listener = listener.ok_or(ImfError::NotBound)?;
        if let Some(text) = listener.get_left_text_of_cursor(number) {
            return Ok(text);
        }
        self.editor
            .text_before_cursor(number)
            .ok_or_else(|| ImfError::BadParameters(format!("text before cursor, number {number}")))
    }

    fn text_after_cursor_with(
        &self,
        listener: Option<&Arc<dyn TextListener>>,
        number: i32,
    ) -> Result<String, ImfError> {
        self.flags.check_editable()?;
        let listener = listener.ok_or(ImfError::NotBound)?;
        if let Some(text) = listener.get_right_text_of_cursor(number) {
            return Ok(text);
        }
        self.editor
            .text_after_cursor(number)
            .ok_or_else(|| ImfError::BadParameters(format!("text after cursor, number {number}")))
    }

    fn text_index_at_cursor_with(
        &self,
        listener: Option<&Arc<dyn TextListener>>,
    ) -> Result<i32, ImfError> {
        self.flags.check_editable()?;
        let listener = listener.ok_or(ImfError::NotBound)?;
        if let Some(index) = listener.get_text_index_at_cursor() {
            return Ok(index);
        }
        self.editor
            .index_at_cursor()
            .ok_or_else(|| ImfError::BadParameters("text index at cursor".into()))
    }

    // -----------------------------------------------------------------------
    // Input method inventory and switching
    // -----------------------------------------------------------------------

    pub fn switch_input_method(&self, name: &str, sub_name: &str) -> Result<(), ImfError> {
        info!(name, sub_name, "switch input method");
        self.system_ability()?.switch_input_method(name, sub_name)
    }

    pub fn list_input_method(&self) -> Result<Vec<Property>, ImfError> {
        self.system_ability()?
            .list_input_method(InputMethodStatus::All)
    }

    /// Enabled (`true`) or disabled (`false`) input methods only.
    pub fn list_input_method_by_status(&self, enable: bool) -> Result<Vec<Property>, ImfError> {
        let status = if enable {
            InputMethodStatus::Enable
        } else {
            InputMethodStatus::Disable
        };
        self.system_ability()?.list_input_method(status)
    }

    pub fn list_input_method_subtype(
        &self,
        property: &Property,
    ) -> Result<Vec<SubProperty>, ImfError> {
        self.system_ability()?
            .list_input_method_subtype(&property.name)
    }

    pub fn list_current_input_method_subtype(&self) -> Result<Vec<SubProperty>, ImfError> {
        self.system_ability()?.list_current_input_method_subtype()
    }

    pub fn get_current_input_method(&self) -> Result<Property, ImfError> {
        self.system_ability()?.get_current_input_method()
    }

    pub fn get_current_input_method_subtype(&self) -> Result<SubProperty, ImfError> {
        self.system_ability()?.get_current_input_method_subtype()
    }

    pub fn display_optional_input_method(&self) -> Result<(), ImfError> {
        self.system_ability()?
            .display_optional_input_method_deprecated()
    }

    pub fn show_optional_input_method(&self) -> Result<(), ImfError> {
        self.system_ability()?.display_optional_input_method()
    }

    pub fn keyboard_window_height(&self) -> Result<i32, ImfError> {
        self.system_ability()?.get_keyboard_window_height()
    }

    // -----------------------------------------------------------------------
    // Listeners and event subscriptions
    // -----------------------------------------------------------------------

    /// Replace the setting listener. `None` removes it.
    pub fn set_setting_listener(&self, listener: Option<Arc<dyn SettingListener>>) {
        *lock(&self.setting_listener) = listener;
    }

    /// Install the controller listener. Only the first call has an effect.
    pub fn set_controller_listener(&self, listener: Arc<dyn ControllerListener>) {
        if self.controller_listener.set(listener).is_err() {
            debug!("controller listener already set");
        }
    }

    /// Turn one service event (`imeChange`, `imeShow`, `imeHide`) on or off.
    /// A failed enable rolls the local subscription set back.
    pub fn update_listen_event_flag(&self, event: &str, on: bool) -> Result<(), ImfError> {
        let Some(event_type) = EventType::from_name(event) else {
            return Err(ImfError::BadParameters(format!("unknown event type {event}")));
        };
        let proxy = self.system_ability()?;
        let mut info = lock(&self.client_info);
        let old = info.event_flag;
        info.event_flag = old.with(event_type, on);
        let result = proxy.update_listen_event_flag(&info, event_type);
        if result.is_err() && on {
            info.event_flag = old;
        }
        result
    }

    /// Resend the whole subscription set to a (restarted) service.
    pub fn restore_listen_event_flag(&self) -> Result<(), ImfError> {
        let proxy = self.system_ability()?;
        let info = lock(&self.client_info).clone();
        proxy.update_listen_event_flag(&info, EventType::None)
    }

    // -----------------------------------------------------------------------
    // Worker shutdown
    // -----------------------------------------------------------------------

    /// Stop the worker thread and wait for it. Idempotent.
    ///
    /// When called on the worker itself (last reference dropped there) this
    /// only raises the stop flag; the loop exits after the current message.
    pub fn quit_work_thread(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.listen_retry.cancel();
        self.attach_retry.cancel();
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle.as_ref() {
            if handle.thread().id() == thread::current().id() {
                debug!("quit requested from worker thread");
                return;
            }
        }
        match self.handler.try_send_message(Message::quit()) {
            Ok(true) => {}
            Ok(false) => debug!("queue full, worker stops on flag"),
            Err(e) => debug!("{e}"),
        }
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }

    fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Agent
    // -----------------------------------------------------------------------

    /// Install the agent from `OnInputReady`. A repeated identical object is
    /// ignored. Replays cached editor state if a reattach asked for it.
    fn on_input_ready(&self, object: Option<Arc<dyn RemoteObject>>) {
        let mut agent = lock(&self.agent);
        let Some(object) = object else {
            error!("agent object is null");
            return;
        };
        if let Some(current) = agent.object.as_ref() {
            if imf_core::remote::same_object(current, &object) {
                info!("agent has already been set");
                return;
            }
        }
        let proxy = AgentProxy::new(Arc::clone(&object));
        agent.object = Some(object);
        if agent.pending_replay {
            agent.pending_replay = false;
            self.replay_editor_state(&proxy);
        }
        agent.proxy = Some(proxy);
        info!("agent installed");
    }

    /// Push the cached cursor and selection unconditionally.
    fn replay_editor_state(&self, proxy: &AgentProxy) {
        let snapshot = self.editor.snapshot();
        info!("replay editor state to new agent");
        let cursor = snapshot.cursor;
        if let Err(e) =
            proxy.on_cursor_update(cursor.left as i32, cursor.top as i32, cursor.height as i32)
        {
            warn!("replay cursor failed: {e}");
        }
        if let Err(e) = proxy.on_selection_change(
            &snapshot.text,
            snapshot.selection_begin,
            snapshot.selection_end,
            snapshot.selection_begin,
            snapshot.selection_end,
        ) {
            warn!("replay selection failed: {e}");
        }
    }

    fn clear_agent(&self) {
        lock(&self.agent).clear();
    }
}

impl Drop for InputMethodController {
    fn drop(&mut self) {
        self.quit_work_thread();
    }
}

struct ServiceDeathRecipient {
    controller: Weak<InputMethodController>,
}

impl DeathRecipient for ServiceDeathRecipient {
    fn on_remote_died(&self) {
        if let Some(controller) = self.controller.upgrade() {
            controller.on_remote_sa_died();
        }
    }
}

/// Caller-held home for a process-wide controller. The first successful
/// `get_or_init` wins; later calls return the same instance.
pub struct ControllerSlot {
    inner: Mutex<Option<Arc<InputMethodController>>>,
}

impl ControllerSlot {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub fn get_or_init<F>(&self, init: F) -> Result<Arc<InputMethodController>, ImfError>
    where
        F: FnOnce() -> Result<Arc<InputMethodController>, ImfError>,
    {
        let mut inner = lock(&self.inner);
        if let Some(controller) = inner.as_ref() {
            return Ok(Arc::clone(controller));
        }
        let controller = init()?;
        *inner = Some(Arc::clone(&controller));
        Ok(controller)
    }

    pub fn get(&self) -> Option<Arc<InputMethodController>> {
        lock(&self.inner).clone()
    }

    /// Remove the instance; it shuts down once the last handle is dropped.
    pub fn take(&self) -> Option<Arc<InputMethodController>> {
        lock(&self.inner).take()
    }
}

impl Default for ControllerSlot {
    fn default() -> Self {
        Self::new()
    }
}

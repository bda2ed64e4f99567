//! Worker thread: drains the notification queue and applies each message
//! while holding the text-listener lock.

use std::sync::{Arc, Weak};

use imf_core::message::{Message, MessageId, MessageReceiver, ResultHandler};
use imf_core::types::{
    Direction, EnterKeyType, FunctionKey, InputWindowInfo, InputWindowStatus, KeyboardStatus,
    Property, SubProperty, CURSOR_DIRECTION_BASE_VALUE,
};
use imf_core::{Parcel, ParcelError, Parcelable};
use tracing::{debug, debug_span, error, info};

use super::{lock, InputMethodController};
use crate::listener::TextListener;

pub(super) fn work_loop(controller: Weak<InputMethodController>, receiver: MessageReceiver) {
    debug!("worker started");
    loop {
        let Some(msg) = receiver.get_message() else {
            debug!("message queue closed");
            break;
        };
        if msg.id == MessageId::QuitWorkerThread {
            debug!("quit message received");
            break;
        }
        let Some(controller) = controller.upgrade() else {
            break;
        };
        if controller.is_stopping() {
            break;
        }
        controller.handle_message(msg);
    }
    debug!("worker stopped");
}

/// Payload of a message, or an empty parcel when none was attached.
fn content(msg: &mut Message) -> Parcel {
    msg.content.take().unwrap_or_default()
}

impl InputMethodController {
    fn handle_message(&self, mut msg: Message) {
        let _span = debug_span!("handle_message", id = ?msg.id).entered();
        let mut data = content(&mut msg);
        let mut listener = lock(&self.text_listener);

        // Queries must always answer, or the data channel waits out its
        // timeout.
        match (msg.id, msg.result.take()) {
            (MessageId::GetTextBeforeCursor, Some(ResultHandler::Text(slot))) => {
                let text = data
                    .read_i32()
                    .map_err(|e| error!("failed to read message parcel: {e}"))
                    .ok()
                    .and_then(|n| self.text_before_cursor_with(listener.as_ref(), n).ok());
                slot.set_value(text.unwrap_or_default());
                return;
            }
            (MessageId::GetTextAfterCursor, Some(ResultHandler::Text(slot))) => {
                let text = data
                    .read_i32()
                    .map_err(|e| error!("failed to read message parcel: {e}"))
                    .ok()
                    .and_then(|n| self.text_after_cursor_with(listener.as_ref(), n).ok());
                slot.set_value(text.unwrap_or_default());
                return;
            }
            (MessageId::GetTextIndexAtCursor, Some(ResultHandler::Index(slot))) => {
                let index = self.text_index_at_cursor_with(listener.as_ref());
                slot.set_value(index.unwrap_or(-1));
                return;
            }
            (MessageId::GetEnterKeyType, Some(ResultHandler::Index(slot))) => {
                let value = self.get_enter_key_type().map(EnterKeyType::as_i32);
                slot.set_value(value.unwrap_or(-1));
                return;
            }
            (MessageId::GetInputPattern, Some(ResultHandler::Index(slot))) => {
                let value = self.get_input_pattern().map(|p| p.as_i32());
                slot.set_value(value.unwrap_or(-1));
                return;
            }
            (_, Some(_)) => {
                error!("result handler attached to a non-query message");
                return;
            }
            (_, None) => {}
        }

        if let Err(e) = self.apply(msg.id, &mut data, &mut listener) {
            error!("dropping message: {e}");
        }
    }

    fn apply(
        &self,
        id: MessageId,
        data: &mut Parcel,
        listener: &mut Option<Arc<dyn TextListener>>,
    ) -> Result<(), ParcelError> {
        match id {
            MessageId::InsertText => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                text_listener.insert_text(&data.read_string16()?);
            }
            // The wire directions are swapped for compatibility.
            MessageId::DeleteForward => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                text_listener.delete_backward(data.read_i32()?);
            }
            MessageId::DeleteBackward => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                text_listener.delete_forward(data.read_i32()?);
            }
            MessageId::OnInputReady => {
                let object = data.read_remote_object()?;
                self.on_input_ready(object);
            }
            MessageId::OnInputStop => {
                info!("input stop");
                self.flags.clear();
                *listener = None;
                self.clear_agent();
                self.editor.clear();
            }
            MessageId::SendKeyboardStatus => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                let status = KeyboardStatus::unmarshal(data)?;
                text_listener.send_keyboard_status(status);
                if status == KeyboardStatus::Hide {
                    self.set_show_keyboard(false);
                }
            }
            MessageId::SendFunctionKey => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                let key = FunctionKey {
                    enter_key_type: EnterKeyType::unmarshal(data)?,
                };
                text_listener.send_function_key(key);
            }
            MessageId::MoveCursor => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                text_listener.move_cursor(Direction::unmarshal(data)?);
            }
            MessageId::OnSwitchInput => {
                let property = Property::unmarshal(data)?;
                let sub_property = SubProperty::unmarshal(data)?;
                info!(name = %property.name, "input method switched");
                match lock(&self.setting_listener).as_ref() {
                    Some(setting) => setting.on_ime_change(&property, &sub_property),
                    None => debug!("setting listener is null"),
                }
            }
            MessageId::OnPanelStatusChange => {
                let raw = data.read_u32()?;
                let status = i32::try_from(raw)
                    .ok()
                    .and_then(InputWindowStatus::from_i32)
                    .ok_or(ParcelError::InvalidEnum {
                        kind: "window status",
                        value: raw as i32,
                    })?;
                let windows = Vec::<InputWindowInfo>::unmarshal(data)?;
                match lock(&self.setting_listener).as_ref() {
                    Some(setting) => setting.on_panel_status_change(status, &windows),
                    None => debug!("setting listener is null"),
                }
            }
            MessageId::SelectByRange => {
                let start = data.read_i32()?;
                let end = data.read_i32()?;
                if let Some(text_listener) = self.editable_listener(listener) {
                    text_listener.handle_set_selection(start, end);
                }
                match self.controller_listener.get() {
                    Some(controller) => controller.on_select_by_range(start, end),
                    None => debug!("controller listener is null"),
                }
            }
            MessageId::SelectByMovement => {
                let direction = data.read_i32()?;
                let cursor_move_skip = data.read_i32()?;
                if let Some(text_listener) = self.editable_listener(listener) {
                    text_listener
                        .handle_select(CURSOR_DIRECTION_BASE_VALUE + direction, cursor_move_skip);
                }
                match self.controller_listener.get() {
                    Some(controller) => controller.on_select_by_movement(direction),
                    None => debug!("controller listener is null"),
                }
            }
            MessageId::HandleExtendAction => {
                let Some(text_listener) = self.editable_listener(listener) else {
                    return Ok(());
                };
                text_listener.handle_extend_action(data.read_i32()?);
            }
            MessageId::GetTextBeforeCursor
            | MessageId::GetTextAfterCursor
            | MessageId::GetTextIndexAtCursor
            | MessageId::GetEnterKeyType
            | MessageId::GetInputPattern => {
                error!(?id, "query without result handler");
            }
            MessageId::QuitWorkerThread => {}
        }
        Ok(())
    }

    /// The text listener, when the session is editable and one is attached.
    fn editable_listener(
        &self,
        listener: &Option<Arc<dyn TextListener>>,
    ) -> Option<Arc<dyn TextListener>> {
        if !self.flags.is_editable() {
            debug!("not editable, notification ignored");
            return None;
        }
        let listener = listener.clone();
        if listener.is_none() {
            debug!("text listener is null");
        }
        listener
    }
}

//! Client-side receivers the service pushes notifications through.
//!
//! Both stubs only validate the interface token and enqueue; decoding and
//! listener fan-out happen on the controller's worker thread. The data
//! channel additionally answers a handful of synchronous queries by waiting
//! on a [`BlockData`] slot the worker fills.
//!
//! Request bodies, after the token:
//!
//! | message                 | body                                   |
//! |-------------------------|----------------------------------------|
//! | insert text             | `string16 text`                        |
//! | delete forward/backward | `i32 length`                           |
//! | input ready             | `object agent`                         |
//! | keyboard status         | `i32 status`                           |
//! | function key            | `i32 enter_key_type`                   |
//! | move cursor             | `i32 direction`                        |
//! | switch input            | `Property, SubProperty`                |
//! | panel status change     | `u32 status, Vec<InputWindowInfo>`     |
//! | select by range         | `i32 start, i32 end`                   |
//! | select by movement      | `i32 direction, i32 cursor_move_skip`  |
//! | extend action           | `i32 action`                           |
//! | text before/after       | `i32 number`                           |

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::code;
use crate::message::{BlockData, Message, MessageHandler, MessageId, ResultHandler};
use crate::parcel::Parcel;
use crate::remote::{MessageOption, RemoteObject, TransportError, BAD_REQUEST, UNKNOWN_TRANSACTION};

pub const INPUT_CLIENT_DESCRIPTOR: &str = "ohos.miscservices.inputmethod.InputClient";
pub const INPUT_DATA_CHANNEL_DESCRIPTOR: &str = "ohos.miscservices.inputmethod.InputDataChannel";

/// Operation codes of the client stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    OnInputReady = 0,
    OnInputStop = 1,
    OnSwitchInput = 2,
    OnPanelStatusChange = 3,
}

impl ClientCode {
    pub const ALL: &'static [ClientCode] = &[
        ClientCode::OnInputReady,
        ClientCode::OnInputStop,
        ClientCode::OnSwitchInput,
        ClientCode::OnPanelStatusChange,
    ];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u32() == code)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OnInputReady => "ON_INPUT_READY",
            Self::OnInputStop => "ON_INPUT_STOP",
            Self::OnSwitchInput => "ON_SWITCH_INPUT",
            Self::OnPanelStatusChange => "ON_PANEL_STATUS_CHANGE",
        }
    }

    fn message_id(self) -> MessageId {
        match self {
            Self::OnInputReady => MessageId::OnInputReady,
            Self::OnInputStop => MessageId::OnInputStop,
            Self::OnSwitchInput => MessageId::OnSwitchInput,
            Self::OnPanelStatusChange => MessageId::OnPanelStatusChange,
        }
    }
}

/// Operation codes of the data-channel stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCode {
    InsertText = 0,
    DeleteForward = 1,
    DeleteBackward = 2,
    GetTextBeforeCursor = 3,
    GetTextAfterCursor = 4,
    GetEnterKeyType = 5,
    GetInputPattern = 6,
    SendKeyboardStatus = 7,
    SendFunctionKey = 8,
    MoveCursor = 9,
    SelectByRange = 10,
    SelectByMovement = 11,
    HandleExtendAction = 12,
    GetTextIndexAtCursor = 13,
}

impl ChannelCode {
    pub const ALL: &'static [ChannelCode] = &[
        ChannelCode::InsertText,
        ChannelCode::DeleteForward,
        ChannelCode::DeleteBackward,
        ChannelCode::GetTextBeforeCursor,
        ChannelCode::GetTextAfterCursor,
        ChannelCode::GetEnterKeyType,
        ChannelCode::GetInputPattern,
        ChannelCode::SendKeyboardStatus,
        ChannelCode::SendFunctionKey,
        ChannelCode::MoveCursor,
        ChannelCode::SelectByRange,
        ChannelCode::SelectByMovement,
        ChannelCode::HandleExtendAction,
        ChannelCode::GetTextIndexAtCursor,
    ];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u32() == code)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InsertText => "INSERT_TEXT",
            Self::DeleteForward => "DELETE_FORWARD",
            Self::DeleteBackward => "DELETE_BACKWARD",
            Self::GetTextBeforeCursor => "GET_TEXT_BEFORE_CURSOR",
            Self::GetTextAfterCursor => "GET_TEXT_AFTER_CURSOR",
            Self::GetEnterKeyType => "GET_ENTER_KEY_TYPE",
            Self::GetInputPattern => "GET_INPUT_PATTERN",
            Self::SendKeyboardStatus => "SEND_KEYBOARD_STATUS",
            Self::SendFunctionKey => "SEND_FUNCTION_KEY",
            Self::MoveCursor => "MOVE_CURSOR",
            Self::SelectByRange => "SELECT_BY_RANGE",
            Self::SelectByMovement => "SELECT_BY_MOVEMENT",
            Self::HandleExtendAction => "HANDLE_EXTEND_ACTION",
            Self::GetTextIndexAtCursor => "GET_TEXT_INDEX_AT_CURSOR",
        }
    }

    fn message_id(self) -> MessageId {
        match self {
            Self::InsertText => MessageId::InsertText,
            Self::DeleteForward => MessageId::DeleteForward,
            Self::DeleteBackward => MessageId::DeleteBackward,
            Self::GetTextBeforeCursor => MessageId::GetTextBeforeCursor,
            Self::GetTextAfterCursor => MessageId::GetTextAfterCursor,
            Self::GetEnterKeyType => MessageId::GetEnterKeyType,
            Self::GetInputPattern => MessageId::GetInputPattern,
            Self::SendKeyboardStatus => MessageId::SendKeyboardStatus,
            Self::SendFunctionKey => MessageId::SendFunctionKey,
            Self::MoveCursor => MessageId::MoveCursor,
            Self::SelectByRange => MessageId::SelectByRange,
            Self::SelectByMovement => MessageId::SelectByMovement,
            Self::HandleExtendAction => MessageId::HandleExtendAction,
            Self::GetTextIndexAtCursor => MessageId::GetTextIndexAtCursor,
        }
    }

    /// Queries block the caller until the worker answers.
    fn query_kind(self) -> Option<QueryKind> {
        match self {
            Self::GetTextBeforeCursor | Self::GetTextAfterCursor => Some(QueryKind::Text),
            Self::GetTextIndexAtCursor | Self::GetEnterKeyType | Self::GetInputPattern => {
                Some(QueryKind::Index)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum QueryKind {
    Text,
    Index,
}

/// Check the token and hand the rest of the body to the worker.
fn enqueue(
    handler: &MessageHandler,
    descriptor: &str,
    op: &'static str,
    id: MessageId,
    data: &mut Parcel,
    result: Option<ResultHandler>,
) -> Result<bool, TransportError> {
    if let Err(e) = data.enforce_interface(descriptor) {
        warn!(op, "rejecting request: {e}");
        return Err(TransportError(BAD_REQUEST));
    }
    let content = Some(data.split_remaining());
    let msg = match result {
        Some(result) => Message::with_result(id, content, result),
        None => Message::new(id, content),
    };
    match handler.send_message(msg) {
        Ok(()) => {
            debug!(op, "notification queued");
            Ok(true)
        }
        Err(e) => {
            warn!(op, "{e}");
            Ok(false)
        }
    }
}

fn write_status(reply: &mut Parcel, option: MessageOption, queued: bool) -> Result<(), TransportError> {
    if option == MessageOption::Async {
        return Ok(());
    }
    let status = if queued {
        code::NO_ERROR
    } else {
        code::ERROR_STATUS_UNKNOWN
    };
    reply.write_i32(status).map_err(|_| TransportError(BAD_REQUEST))
}

/// Receives session lifecycle notifications from the service.
pub struct InputClientStub {
    handler: MessageHandler,
}

impl InputClientStub {
    pub fn new(handler: MessageHandler) -> Self {
        Self { handler }
    }
}

impl RemoteObject for InputClientStub {
    fn descriptor(&self) -> &str {
        INPUT_CLIENT_DESCRIPTOR
    }

    fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> Result<(), TransportError> {
        let Some(op) = ClientCode::from_u32(code) else {
            warn!(code, "unknown client op code");
            return Err(TransportError(UNKNOWN_TRANSACTION));
        };
        let queued = enqueue(
            &self.handler,
            INPUT_CLIENT_DESCRIPTOR,
            op.name(),
            op.message_id(),
            data,
            None,
        )?;
        write_status(reply, option, queued)
    }
}

/// Receives editing commands and text queries from the input method.
pub struct InputDataChannelStub {
    handler: MessageHandler,
    result_timeout: Duration,
}

impl InputDataChannelStub {
    pub fn new(handler: MessageHandler, result_timeout: Duration) -> Self {
        Self {
            handler,
            result_timeout,
        }
    }
}

impl RemoteObject for InputDataChannelStub {
    fn descriptor(&self) -> &str {
        INPUT_DATA_CHANNEL_DESCRIPTOR
    }

    fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> Result<(), TransportError> {
        let Some(op) = ChannelCode::from_u32(code) else {
            warn!(code, "unknown data channel op code");
            return Err(TransportError(UNKNOWN_TRANSACTION));
        };
        let encode_err = |_| TransportError(BAD_REQUEST);

        match op.query_kind() {
            None => {
                let queued = enqueue(
                    &self.handler,
                    INPUT_DATA_CHANNEL_DESCRIPTOR,
                    op.name(),
                    op.message_id(),
                    data,
                    None,
                )?;
                write_status(reply, option, queued)
            }
            Some(QueryKind::Text) => {
                let slot = Arc::new(BlockData::<String>::new());
                let queued = enqueue(
                    &self.handler,
                    INPUT_DATA_CHANNEL_DESCRIPTOR,
                    op.name(),
                    op.message_id(),
                    data,
                    Some(ResultHandler::Text(Arc::clone(&slot))),
                )?;
                let value = if queued {
                    slot.get_value(self.result_timeout)
                } else {
                    None
                };
                if value.is_none() {
                    warn!(op = op.name(), "no answer from worker");
                }
                let status = if value.is_some() {
                    code::NO_ERROR
                } else {
                    code::ERROR_STATUS_UNKNOWN
                };
                reply.write_i32(status).map_err(encode_err)?;
                reply
                    .write_string16(&value.unwrap_or_default())
                    .map_err(encode_err)
            }
            Some(QueryKind::Index) => {
                let slot = Arc::new(BlockData::<i32>::new());
                let queued = enqueue(
                    &self.handler,
                    INPUT_DATA_CHANNEL_DESCRIPTOR,
                    op.name(),
                    op.message_id(),
                    data,
                    Some(ResultHandler::Index(Arc::clone(&slot))),
                )?;
                let value = if queued {
                    slot.get_value(self.result_timeout)
                } else {
                    None
                };
                if value.is_none() {
                    warn!(op = op.name(), "no answer from worker");
                }
                let status = if value.is_some() {
                    code::NO_ERROR
                } else {
                    code::ERROR_STATUS_UNKNOWN
                };
                reply.write_i32(status).map_err(encode_err)?;
                reply.write_i32(value.unwrap_or(-1)).map_err(encode_err)
            }
        }
    }
}

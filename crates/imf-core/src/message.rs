//! Notification queue between the IPC stubs and the controller's worker
//! thread.
//!
//! Stubs run on arbitrary transport threads and only enqueue; exactly one
//! consumer drains the queue, so every notification is handled on a single
//! logical timeline in the order it was enqueued.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::parcel::Parcel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    InsertText,
    DeleteForward,
    DeleteBackward,
    OnInputReady,
    OnInputStop,
    SendKeyboardStatus,
    SendFunctionKey,
    MoveCursor,
    OnSwitchInput,
    OnPanelStatusChange,
    SelectByRange,
    SelectByMovement,
    HandleExtendAction,
    GetTextBeforeCursor,
    GetTextAfterCursor,
    GetTextIndexAtCursor,
    GetEnterKeyType,
    GetInputPattern,
    QuitWorkerThread,
}

/// Single-assignment slot a producer blocks on until the consumer answers.
#[derive(Debug)]
pub struct BlockData<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> BlockData<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Store the value and wake waiters. Later calls are ignored.
    pub fn set_value(&self, value: T) {
        let mut slot = self.value.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(value);
            self.ready.notify_all();
        }
    }

    /// Wait up to `timeout` for the value.
    pub fn get_value(&self, timeout: Duration) -> Option<T> {
        let slot = self.value.lock().unwrap_or_else(|e| e.into_inner());
        let (slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |v| v.is_none())
            .unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    pub fn is_set(&self) -> bool {
        self.value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl<T: Clone> Default for BlockData<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed answer slot carried by query messages.
#[derive(Debug, Clone)]
pub enum ResultHandler {
    Text(Arc<BlockData<String>>),
    Index(Arc<BlockData<i32>>),
}

#[derive(Debug)]
pub struct Message {
    pub id: MessageId,
    pub content: Option<Parcel>,
    pub result: Option<ResultHandler>,
}

impl Message {
    pub fn new(id: MessageId, content: Option<Parcel>) -> Self {
        Self {
            id,
            content,
            result: None,
        }
    }

    pub fn with_result(id: MessageId, content: Option<Parcel>, result: ResultHandler) -> Self {
        Self {
            id,
            content,
            result: Some(result),
        }
    }

    pub fn quit() -> Self {
        Self::new(MessageId::QuitWorkerThread, None)
    }
}

/// Producer side of the notification queue. Cheap to clone; every stub
/// holds one.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    tx: SyncSender<Message>,
}

/// Consumer side, owned by the worker thread.
#[derive(Debug)]
pub struct MessageReceiver {
    rx: Receiver<Message>,
}

/// The consumer is gone; the message was not delivered.
#[derive(Debug, thiserror::Error)]
#[error("message queue closed, dropped {0:?}")]
pub struct QueueClosed(pub MessageId);

/// Create a bounded queue holding at most `capacity` pending messages.
pub fn channel(capacity: usize) -> (MessageHandler, MessageReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (MessageHandler { tx }, MessageReceiver { rx })
}

impl MessageHandler {
    /// Enqueue a message, blocking while the queue is full.
    pub fn send_message(&self, msg: Message) -> Result<(), QueueClosed> {
        let id = msg.id;
        self.tx.send(msg).map_err(|_| QueueClosed(id))
    }

    /// Enqueue without blocking. Returns `Ok(false)` when the queue is full.
    pub fn try_send_message(&self, msg: Message) -> Result<bool, QueueClosed> {
        let id = msg.id;
        match self.tx.try_send(msg) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(QueueClosed(id)),
        }
    }
}

impl MessageReceiver {
    /// Block until the next message arrives. `None` once every producer has
    /// been dropped.
    pub fn get_message(&self) -> Option<Message> {
        self.rx.recv().ok()
    }

    pub fn get_message_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order() {
        let (handler, receiver) = channel(8);
        handler
            .send_message(Message::new(MessageId::InsertText, None))
            .unwrap();
        handler
            .send_message(Message::new(MessageId::MoveCursor, None))
            .unwrap();
        handler.send_message(Message::quit()).unwrap();
        let ids: Vec<_> = std::iter::from_fn(|| receiver.get_message())
            .take(3)
            .map(|m| m.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                MessageId::InsertText,
                MessageId::MoveCursor,
                MessageId::QuitWorkerThread
            ]
        );
    }

    #[test]
    fn block_data_is_single_assignment() {
        let slot = BlockData::new();
        slot.set_value(1);
        slot.set_value(2);
        assert_eq!(slot.get_value(Duration::ZERO), Some(1));
    }

    #[test]
    fn block_data_times_out() {
        let slot: BlockData<String> = BlockData::new();
        assert_eq!(slot.get_value(Duration::from_millis(10)), None);
        assert!(!slot.is_set());
    }

    #[test]
    fn block_data_wakes_waiter() {
        let slot = Arc::new(BlockData::new());
        let producer = Arc::clone(&slot);
        let t = thread::spawn(move || producer.set_value("abc".to_string()));
        assert_eq!(
            slot.get_value(Duration::from_secs(5)),
            Some("abc".to_string())
        );
        t.join().unwrap();
    }

    #[test]
    fn try_send_reports_full_queue() {
        let (handler, receiver) = channel(1);
        assert!(handler
            .try_send_message(Message::new(MessageId::InsertText, None))
            .unwrap());
        assert!(!handler.try_send_message(Message::quit()).unwrap());
        assert_eq!(receiver.get_message().unwrap().id, MessageId::InsertText);
        drop(receiver);
        assert!(handler.try_send_message(Message::quit()).is_err());
    }

    #[test]
    fn send_after_consumer_dropped_fails() {
        let (handler, receiver) = channel(1);
        drop(receiver);
        let err = handler.send_message(Message::quit()).unwrap_err();
        assert_eq!(err.0, MessageId::QuitWorkerThread);
    }
}

//! Cached editor state: caret rectangle, text and selection spans.
//!
//! Offsets are UTF-16 code units, matching what the input method sees.

use std::sync::Mutex;

use imf_core::types::CursorInfo;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EditorContent {
    text: Vec<u16>,
    old_begin: i32,
    old_end: i32,
    new_begin: i32,
    new_end: i32,
}

/// What to push to the agent after a selection update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub text: String,
    pub old_begin: i32,
    pub old_end: i32,
    pub new_begin: i32,
    pub new_end: i32,
}

/// Point-in-time copy of the whole cache, used to replay state after a
/// reattach.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub cursor: CursorInfo,
    pub text: String,
    pub selection_begin: i32,
    pub selection_end: i32,
}

/// Cursor and content live behind separate locks; neither is ever held while
/// taking the other.
#[derive(Debug, Default)]
pub struct EditorCache {
    cursor: Mutex<CursorInfo>,
    content: Mutex<EditorContent>,
}

impl EditorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `info` if it differs from the cached rectangle. Returns whether
    /// anything changed.
    pub fn update_cursor(&self, info: CursorInfo) -> bool {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        if *cursor == info {
            debug!("same to last cursor update");
            return false;
        }
        *cursor = info;
        true
    }

    pub fn cursor(&self) -> CursorInfo {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a new text/selection. The previous "new" span becomes the
    /// "old" span. `None` when nothing changed.
    pub fn update_selection(&self, text: &str, start: i32, end: i32) -> Option<SelectionChange> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        if content.text == units && content.new_begin == start && content.new_end == end {
            debug!("same to last selection update");
            return None;
        }
        content.text = units;
        content.old_begin = content.new_begin;
        content.old_end = content.new_end;
        content.new_begin = start;
        content.new_end = end;
        Some(SelectionChange {
            text: text.to_string(),
            old_begin: content.old_begin,
            old_end: content.old_end,
            new_begin: content.new_begin,
            new_end: content.new_end,
        })
    }

    /// Validate a query length against the cached selection, swapping an
    /// inverted span in place. Fails on negative values or an end past the
    /// text.
    pub fn check_param(&self, number: i32) -> bool {
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        Self::normalize(&mut content, number)
    }

    fn normalize(content: &mut EditorContent, number: i32) -> bool {
        if i32::try_from(content.text.len()).is_err()
            || number < 0
            || content.new_begin < 0
            || content.new_end < 0
        {
            warn!(
                number,
                begin = content.new_begin,
                end = content.new_end,
                "param error"
            );
            return false;
        }
        if content.new_begin > content.new_end {
            std::mem::swap(&mut content.new_begin, &mut content.new_end);
        }
        if content.new_end as usize > content.text.len() {
            warn!(
                end = content.new_end,
                size = content.text.len(),
                "selection end past text"
            );
            return false;
        }
        true
    }

    /// Up to `number` units immediately before the selection start.
    pub fn text_before_cursor(&self, number: i32) -> Option<String> {
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        if !Self::normalize(&mut content, number) {
            return None;
        }
        let end = content.new_begin as usize;
        let start = end.saturating_sub(number as usize);
        Some(String::from_utf16_lossy(&content.text[start..end]))
    }

    /// Up to `number` units immediately after the selection end.
    pub fn text_after_cursor(&self, number: i32) -> Option<String> {
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        if !Self::normalize(&mut content, number) {
            return None;
        }
        let start = content.new_end as usize;
        let end = start
            .saturating_add(number as usize)
            .min(content.text.len());
        Some(String::from_utf16_lossy(&content.text[start..end]))
    }

    /// Caret position (selection start), or `None` when the cached span is
    /// invalid.
    pub fn index_at_cursor(&self) -> Option<i32> {
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        Self::normalize(&mut content, 0).then_some(content.new_begin)
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        let cursor = self.cursor();
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        EditorSnapshot {
            cursor,
            text: String::from_utf16_lossy(&content.text),
            selection_begin: content.new_begin,
            selection_end: content.new_end,
        }
    }

    /// Reset text, both spans and the cursor rectangle.
    pub fn clear(&self) {
        debug!("clear editor content cache");
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = EditorContent::default();
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner()) = CursorInfo::default();
    }
}

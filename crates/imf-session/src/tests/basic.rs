use imf_core::types::{Configuration, EnterKeyType, TextInputType};
use imf_core::ImfError;

use super::cursor;
use crate::{ConfigCache, EditorCache, SessionFlags};

#[test]
fn flags_start_detached() {
    let flags = SessionFlags::new();
    assert!(!flags.is_bound());
    assert!(!flags.is_editable());
    assert!(matches!(flags.check_bound_editable(), Err(ImfError::NotBound)));
}

#[test]
fn not_bound_wins_over_not_editable() {
    let flags = SessionFlags::new();
    flags.set_editable(true);
    assert!(matches!(flags.check_bound_editable(), Err(ImfError::NotBound)));
    flags.set_bound(true);
    flags.set_editable(false);
    assert!(matches!(
        flags.check_bound_editable(),
        Err(ImfError::NotEditable)
    ));
    flags.set_attached();
    assert!(flags.check_bound_editable().is_ok());
    flags.clear();
    assert!(!flags.is_bound() && !flags.is_editable());
}

#[test]
fn cursor_dedupes_on_full_equality() {
    let cache = EditorCache::new();
    assert!(cache.update_cursor(cursor(1.0, 2.0)));
    assert!(!cache.update_cursor(cursor(1.0, 2.0)));
    let mut wider = cursor(1.0, 2.0);
    wider.width = 3.0;
    assert!(cache.update_cursor(wider));
    assert_eq!(cache.cursor(), wider);
}

#[test]
fn selection_rotates_new_into_old() {
    let cache = EditorCache::new();
    let first = cache.update_selection("hello", 1, 2).unwrap();
    assert_eq!((first.old_begin, first.old_end), (0, 0));
    assert_eq!((first.new_begin, first.new_end), (1, 2));

    assert!(cache.update_selection("hello", 1, 2).is_none());

    let second = cache.update_selection("hello", 3, 3).unwrap();
    assert_eq!((second.old_begin, second.old_end), (1, 2));
    assert_eq!((second.new_begin, second.new_end), (3, 3));
    assert_eq!(second.text, "hello");
}

#[test]
fn same_span_new_text_is_an_update() {
    let cache = EditorCache::new();
    cache.update_selection("ab", 1, 1).unwrap();
    assert!(cache.update_selection("ac", 1, 1).is_some());
}

#[test]
fn check_param_swaps_inverted_span() {
    let cache = EditorCache::new();
    cache.update_selection("abcdef", 4, 2);
    assert!(cache.check_param(1));
    let snap = cache.snapshot();
    assert_eq!((snap.selection_begin, snap.selection_end), (2, 4));
}

#[test]
fn check_param_rejects_bad_input() {
    let cache = EditorCache::new();
    cache.update_selection("abc", 0, 5);
    assert!(!cache.check_param(1));

    let cache = EditorCache::new();
    cache.update_selection("abc", 0, 1);
    assert!(!cache.check_param(-1));

    let cache = EditorCache::new();
    cache.update_selection("abc", -1, 1);
    assert!(!cache.check_param(0));
}

#[test]
fn offsets_are_utf16_units() {
    let cache = EditorCache::new();
    // U+1F600 is two UTF-16 units.
    cache.update_selection("a\u{1F600}bc", 3, 3);
    assert!(cache.check_param(0));
    assert_eq!(cache.text_before_cursor(2).as_deref(), Some("\u{1F600}"));
    assert_eq!(cache.text_after_cursor(10).as_deref(), Some("bc"));
    assert_eq!(cache.index_at_cursor(), Some(3));
}

#[test]
fn text_around_selection() {
    let cache = EditorCache::new();
    cache.update_selection("hello world", 5, 6);
    assert_eq!(cache.text_before_cursor(3).as_deref(), Some("llo"));
    assert_eq!(cache.text_before_cursor(100).as_deref(), Some("hello"));
    assert_eq!(cache.text_after_cursor(3).as_deref(), Some("wor"));
    assert_eq!(cache.text_after_cursor(-1), None);
}

#[test]
fn clear_resets_everything() {
    let cache = EditorCache::new();
    cache.update_cursor(cursor(5.0, 5.0));
    cache.update_selection("abc", 1, 2);
    cache.clear();
    let snap = cache.snapshot();
    assert_eq!(snap.cursor, Default::default());
    assert!(snap.text.is_empty());
    assert_eq!((snap.selection_begin, snap.selection_end), (0, 0));
    // The cleared state is the baseline again, so re-sending it is a no-op.
    assert!(cache.update_selection("", 0, 0).is_none());
}

#[test]
fn config_cache_keeps_last_value() {
    let cache = ConfigCache::new();
    assert_eq!(cache.enter_key_type(), EnterKeyType::Unspecified);
    assert_eq!(cache.input_pattern(), TextInputType::Text);
    cache.update(Configuration {
        enter_key_type: EnterKeyType::Search,
        text_input_type: TextInputType::Url,
    });
    assert_eq!(cache.enter_key_type(), EnterKeyType::Search);
    assert_eq!(cache.input_pattern(), TextInputType::Url);
}

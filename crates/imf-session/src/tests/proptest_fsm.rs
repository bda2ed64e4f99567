//! Property-based tests for the editor cache and retry bookkeeping.
//!
//! Random update sequences are replayed against a small reference model and
//! the cache is checked after every step.

use proptest::prelude::*;

use super::cursor;
use crate::{EditorCache, RetryFamily, RetryOutcome, RetryPolicy};

#[derive(Debug, Clone)]
enum Action {
    Cursor(u8),
    Select { text: u8, start: i32, end: i32 },
    Clear,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0u8..4).prop_map(Action::Cursor),
        6 => (0u8..3, -2i32..8, -2i32..8)
            .prop_map(|(text, start, end)| Action::Select { text, start, end }),
        1 => Just(Action::Clear),
    ]
}

const TEXTS: [&str; 3] = ["", "hello", "a\u{1F600}b"];

#[derive(Debug, Default)]
struct Model {
    cursor: Option<u8>,
    text: &'static str,
    new_span: (i32, i32),
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn editor_cache_matches_model(actions in prop::collection::vec(arb_action(), 1..60)) {
        let cache = EditorCache::new();
        let mut model = Model::default();

        for action in &actions {
            match *action {
                Action::Cursor(n) => {
                    let changed = cache.update_cursor(cursor(f64::from(n), 0.0));
                    prop_assert_eq!(changed, model.cursor != Some(n), "cursor dedupe after {:?}", action);
                    model.cursor = Some(n);
                }
                Action::Select { text, start, end } => {
                    let text = TEXTS[text as usize];
                    let change = cache.update_selection(text, start, end);
                    let same = model.text == text && model.new_span == (start, end);
                    prop_assert_eq!(change.is_none(), same, "selection dedupe after {:?}", action);
                    if let Some(change) = change {
                        prop_assert_eq!((change.old_begin, change.old_end), model.new_span);
                        prop_assert_eq!((change.new_begin, change.new_end), (start, end));
                    }
                    model.text = text;
                    model.new_span = (start, end);
                }
                Action::Clear => {
                    cache.clear();
                    model = Model::default();
                }
            }

            // Validation either fails or leaves an ordered span inside the text.
            let valid = cache.check_param(0);
            let snap = cache.snapshot();
            if valid {
                prop_assert!(snap.selection_begin <= snap.selection_end);
                prop_assert!(snap.selection_end as usize <= snap.text.encode_utf16().count());
            }
            // A non-negative inverted span is swapped in place, even when the
            // end then turns out to lie past the text.
            let (b, e) = model.new_span;
            if b >= 0 && e >= 0 {
                model.new_span = (b.min(e), b.max(e));
            }
            prop_assert_eq!((snap.selection_begin, snap.selection_end), model.new_span);
        }
    }

    #[test]
    fn retry_runs_at_most_max_and_stops_on_success(
        max in 1u32..8,
        succeed_at in prop::option::of(0u32..10),
    ) {
        let family = RetryFamily::new("prop");
        let generation = family.begin();
        let policy = RetryPolicy::new(max, std::time::Duration::ZERO);
        let mut calls = 0u32;
        let outcome = family.run(generation, &policy, |n| {
            calls += 1;
            Some(n) == succeed_at
        });
        match succeed_at {
            Some(k) if k < max => {
                prop_assert_eq!(outcome, RetryOutcome::Succeeded { attempt: k });
                prop_assert_eq!(calls, k + 1);
            }
            _ => {
                prop_assert_eq!(outcome, RetryOutcome::Exhausted { attempts: max });
                prop_assert_eq!(calls, max);
            }
        }
    }

    #[test]
    fn retry_schedule_is_increasing(max in 1u32..16, base_ms in 1u64..500) {
        let policy = RetryPolicy::new(max, std::time::Duration::from_millis(base_ms));
        let schedule: Vec<_> = policy.schedule().collect();
        prop_assert_eq!(schedule.len(), max as usize);
        prop_assert!(schedule.windows(2).all(|w| w[0] < w[1]));
    }
}

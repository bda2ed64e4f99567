//! Property tests for what reaches the agent.
//!
//! Each case spins up a controller and a loopback service, so the case count
//! is kept small.

use proptest::prelude::*;

use super::*;
use crate::loopback::AgentCall;

#[derive(Debug, Clone)]
enum Update {
    Cursor(u8),
    Selection(u8, i32),
}

fn arb_update() -> impl Strategy<Value = Update> {
    prop_oneof![
        (0u8..3).prop_map(Update::Cursor),
        (0u8..2, 0i32..4).prop_map(|(text, pos)| Update::Selection(text, pos)),
    ]
}

const TEXTS: [&str; 2] = ["abc", "xyz"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn agent_sees_only_changes(updates in prop::collection::vec(arb_update(), 1..20)) {
        let f = Fixture::attached();
        let agent = f.service.agent();
        let mut expected = Vec::new();
        let mut last_cursor = None;
        let mut last_selection = (String::new(), 0, 0);

        for update in &updates {
            match *update {
                Update::Cursor(x) => {
                    f.controller.on_cursor_update(cursor(f64::from(x) + 1.0, 0.0)).unwrap();
                    if last_cursor != Some(x) {
                        last_cursor = Some(x);
                        expected.push(AgentCall::Cursor { left: i32::from(x) + 1, top: 0, height: 20 });
                    }
                }
                Update::Selection(text, pos) => {
                    let text = TEXTS[usize::from(text)];
                    f.controller.on_selection_change(text, pos, pos).unwrap();
                    let (old_text, old_begin, old_end) = &last_selection;
                    if old_text != text || *old_begin != pos || *old_end != pos {
                        expected.push(AgentCall::Selection {
                            text: text.to_string(),
                            old_begin: *old_begin,
                            old_end: *old_end,
                            new_begin: pos,
                            new_end: pos,
                        });
                        last_selection = (text.to_string(), pos, pos);
                    }
                }
            }
        }
        prop_assert_eq!(agent.calls(), expected);
    }
}

mod basic;
mod proptest_fsm;
mod retry;

use imf_core::types::CursorInfo;

pub(super) fn cursor(left: f64, top: f64) -> CursorInfo {
    CursorInfo {
        left,
        top,
        width: 1.0,
        height: 20.0,
    }
}

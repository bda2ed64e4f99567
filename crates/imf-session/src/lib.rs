//! Client-side session state for the input method controller.
//!
//! Everything here is plain shared state with its own lock or atomic: the
//! bound/editable flags, the editor content and cursor caches, the cached
//! editor configuration, and the retry bookkeeping used after the service
//! dies. None of it performs IPC; the controller composes these pieces and
//! decides when to talk to the service.

mod config;
mod editor;
mod flags;
mod retry;

#[cfg(test)]
mod tests;

pub use config::ConfigCache;
pub use editor::{EditorCache, EditorSnapshot, SelectionChange};
pub use flags::SessionFlags;
pub use retry::{RetryFamily, RetryOutcome, RetryPolicy};

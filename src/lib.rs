//! Client side of the input method framework.
//!
//! [`InputMethodController`] owns one editing session: it attaches a text
//! field to the input method system ability, forwards cursor and selection
//! updates to the input method's agent, and applies editing commands pushed
//! back by the service on a dedicated worker thread. Wire types, proxies and
//! stubs live in `imf_core`; session caches and retry bookkeeping in
//! `imf_session`.

pub mod controller;
pub mod listener;
pub mod loopback;
pub mod trace_init;

#[cfg(test)]
mod tests;

pub use controller::{ControllerSlot, InputMethodController};
pub use imf_core::settings::Settings;
pub use imf_core::ImfError;
pub use listener::{ControllerListener, SettingListener, TextListener};

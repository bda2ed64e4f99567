//! Service death handling.
//!
//! The death notice arrives on a transport thread, so it only drops cached
//! handles and hands the actual recovery to short-lived background threads,
//! one per retry family.

use std::sync::{Arc, Weak};
use std::thread;

use imf_session::{RetryFamily, RetryOutcome, RetryPolicy};
use tracing::{debug, error, info, warn};

use super::{lock, InputMethodController};

impl InputMethodController {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.settings.recovery.max_attempts,
            self.settings.recovery.base_delay(),
        )
    }

    /// Forget the dead service and start recovery: restore event
    /// subscriptions if any are on, and re-attach if the session was
    /// editable.
    pub fn on_remote_sa_died(&self) {
        error!("input method service died");
        *lock(&self.ability) = None;
        self.clear_agent();
        if self.is_stopping() {
            return;
        }
        self.restore_listen_info_after_death();
        self.restore_attach_info_after_death();
    }

    fn restore_listen_info_after_death(&self) {
        if lock(&self.client_info).event_flag.is_empty() {
            debug!("no event subscriptions to restore");
            return;
        }
        self.spawn_family("imc-restore-listen", Arc::clone(&self.listen_retry), |c| {
            match c.restore_listen_event_flag() {
                Ok(()) => true,
                Err(e) => {
                    debug!("restore listen failed: {e}");
                    false
                }
            }
        });
    }

    fn restore_attach_info_after_death(&self) {
        if !self.flags.is_editable() {
            debug!("not in editable state, nothing to re-attach");
            return;
        }
        self.spawn_family("imc-restore-attach", Arc::clone(&self.attach_retry), |c| {
            c.try_restore_attach()
        });
    }

    /// Re-attach with the last listener and attribute. On success the cached
    /// cursor and selection go to the new agent exactly once.
    fn try_restore_attach(&self) -> bool {
        let Some(listener) = lock(&self.text_listener).clone() else {
            warn!("text listener gone, skip re-attach");
            return false;
        };
        let (show_keyboard, attribute) = {
            let info = lock(&self.client_info);
            (info.is_show_keyboard, info.attribute)
        };
        if let Err(e) = self.attach_with_attribute(listener, show_keyboard, attribute) {
            debug!("re-attach failed: {e}");
            return false;
        }
        // The agent may already be back if OnInputReady won the race.
        let mut agent = lock(&self.agent);
        match agent.proxy.clone() {
            Some(proxy) => self.replay_editor_state(&proxy),
            None => agent.pending_replay = true,
        }
        true
    }

    fn spawn_family<F>(&self, thread_name: &str, family: Arc<RetryFamily>, attempt: F)
    where
        F: Fn(&InputMethodController) -> bool + Send + 'static,
    {
        let generation = family.begin();
        let policy = self.retry_policy();
        let controller: Weak<InputMethodController> = self.self_ref.clone();
        let spawned = thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                let outcome = family.run(generation, &policy, |_| {
                    let Some(controller) = controller.upgrade() else {
                        family.cancel();
                        return false;
                    };
                    attempt(&controller)
                });
                if let RetryOutcome::Succeeded { attempt } = outcome {
                    info!(family = family.name(), attempt, "recovered after service death");
                }
            });
        if let Err(e) = spawned {
            error!("failed to spawn {thread_name}: {e}");
        }
    }
}

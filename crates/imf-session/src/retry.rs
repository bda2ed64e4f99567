//! Bounded, delayed retries for work that must eventually succeed once.
//!
//! A [`RetryFamily`] is one kind of recovery work (for example "re-attach").
//! Each death notice starts a new generation; attempts from an older
//! generation stop as soon as they notice, and a family stops for good after
//! its first successful attempt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Attempt `n` (0-based) runs `base_delay * (n + 1)` after the family starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Offset of attempt `attempt` from the start of the family.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }

    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(|n| self.delay_for(n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Attempt `attempt` (0-based) succeeded.
    Succeeded { attempt: u32 },
    /// Every attempt ran and failed.
    Exhausted { attempts: u32 },
    /// A newer generation started, or the family was cancelled.
    Superseded,
}

#[derive(Debug)]
pub struct RetryFamily {
    name: &'static str,
    generation: AtomicU64,
    succeeded: AtomicBool,
}

impl RetryFamily {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: AtomicU64::new(0),
            succeeded: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start a new generation and clear the success flag. Returns the
    /// generation the caller passes to [`run`](Self::run).
    pub fn begin(&self) -> u64 {
        self.succeeded.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate every in-flight generation.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn has_succeeded(&self) -> bool {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Run attempts on the calling thread until one returns `true`, the
    /// policy is exhausted, or the generation goes stale.
    pub fn run<F>(&self, generation: u64, policy: &RetryPolicy, mut attempt: F) -> RetryOutcome
    where
        F: FnMut(u32) -> bool,
    {
        let start = Instant::now();
        for n in 0..policy.max_attempts {
            let due = start + policy.delay_for(n);
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
            if !self.is_current(generation) {
                debug!(family = self.name, "retry superseded");
                return RetryOutcome::Superseded;
            }
            if self.has_succeeded() {
                return RetryOutcome::Succeeded { attempt: n };
            }
            if attempt(n) {
                self.succeeded.store(true, Ordering::SeqCst);
                info!(family = self.name, attempt = n, "retry succeeded");
                return RetryOutcome::Succeeded { attempt: n };
            }
            debug!(family = self.name, attempt = n, "retry attempt failed");
        }
        warn!(
            family = self.name,
            attempts = policy.max_attempts,
            "retries exhausted"
        );
        RetryOutcome::Exhausted {
            attempts: policy.max_attempts,
        }
    }
}

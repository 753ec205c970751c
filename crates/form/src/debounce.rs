//! Per-field debounce timers.
//!
//! The engine does not own a clock or a runtime. The host passes `now` in,
//! asks for the next deadline, and polls due evaluations. Re-arming a field
//! replaces its pending evaluation, so at most one is ever scheduled per
//! field.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// An evaluation waiting for its debounce delay to elapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingValidation {
    /// Field to evaluate.
    pub field: String,
    /// Value captured when the timer was armed.
    pub value: Option<String>,
    /// Registration generation of the field when armed.
    pub generation: u64,
    /// When the evaluation becomes due.
    pub deadline: Instant,
}

/// Pending evaluations by field.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: HashMap<String, PendingValidation>,
}

impl Debouncer {
    /// Creates an idle debouncer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an evaluation of `field` after `delay`, replacing any
    /// pending one. Returns whether one was replaced.
    pub fn arm(
        &mut self,
        field: &str,
        value: Option<String>,
        generation: u64,
        now: Instant,
        delay: Duration,
    ) -> bool {
        let deadline = now + delay;
        let replaced = self
            .pending
            .insert(
                field.to_owned(),
                PendingValidation {
                    field: field.to_owned(),
                    value,
                    generation,
                    deadline,
                },
            )
            .is_some();
        tracing::trace!(
            field = %field,
            delay_ms = delay.as_millis(),
            replaced,
            "armed debounce timer"
        );
        replaced
    }

    /// Cancels the pending evaluation of `field`.
    pub fn cancel(&mut self, field: &str) -> Option<PendingValidation> {
        let cancelled = self.pending.remove(field);
        if cancelled.is_some() {
            tracing::trace!(field = %field, "cancelled debounce timer");
        }
        cancelled
    }

    /// Cancels every pending evaluation, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        if count > 0 {
            tracing::trace!(count, "cancelled all debounce timers");
        }
        count
    }

    /// Pending evaluation of `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&PendingValidation> {
        self.pending.get(field)
    }

    /// Whether `field` has a pending evaluation.
    #[must_use]
    pub fn is_pending(&self, field: &str) -> bool {
        self.pending.contains_key(field)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Removes and returns every evaluation due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingValidation> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(field, _)| field.clone())
            .collect();

        let mut fired: Vec<_> = due
            .iter()
            .filter_map(|field| self.pending.remove(field))
            .collect();
        fired.sort_by_key(|p| p.deadline);
        fired
    }

    /// Number of pending evaluations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

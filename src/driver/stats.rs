//! Transfer statistics and the error escalation policy.

use crate::internal::constants::{ERROR_POLICY_CONSECUTIVE, ERROR_POLICY_TOTAL};

/// Counters kept for the current acquisition run.
///
/// Reset at every `start`; readable after a forced stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Errors since the last `start`
    pub errors: u32,
    /// Errors since the last successful transfer
    pub consecutive_errors: u32,
    /// Successful transfers
    pub done: u32,
    /// Pages dropped because a transfer was still in flight
    pub pages_lost: u32,
}

impl Stats {
    /// Zeroed counters
    pub const fn new() -> Self {
        Self {
            errors: 0,
            consecutive_errors: 0,
            done: 0,
            pages_lost: 0,
        }
    }

    /// A transfer completed successfully
    pub fn record_success(&mut self) {
        self.done = self.done.saturating_add(1);
        self.consecutive_errors = 0;
    }

    /// Something failed (transfer, setup or a dropped page)
    pub fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
    }

    /// A page arrived while a transfer was in flight
    pub fn record_page_lost(&mut self) {
        self.pages_lost = self.pages_lost.saturating_add(1);
        self.record_error();
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Decides when accumulated errors force a stop.
///
/// Both conditions must hold: a run of consecutive failures, and enough
/// lifetime failures that the run is not a one-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorPolicy {
    /// Consecutive errors required
    pub consecutive: u32,
    /// Lifetime errors required
    pub total: u32,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorPolicy {
    /// Policy with the default thresholds
    pub const fn new() -> Self {
        Self {
            consecutive: ERROR_POLICY_CONSECUTIVE,
            total: ERROR_POLICY_TOTAL,
        }
    }

    /// `true` if the counters call for a forced stop
    pub fn should_stop(&self, stats: &Stats) -> bool {
        stats.consecutive_errors >= self.consecutive && stats.errors >= self.total
    }
}

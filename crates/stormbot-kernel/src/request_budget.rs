//! [`RequestBudget`] – daily oracle-call quota with a local-midnight reset.
//!
//! `allow` performs the rollover check and tests the quota; `consume` is
//! called once per *successful* oracle call only, so rate-limited or failed
//! requests never burn budget. Limiting can be disabled entirely via
//! configuration, in which case `allow` always passes.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Days, Local};
use tracing::info;

/// What is left of today's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Count(u32),
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Unlimited => write!(f, "unlimited"),
            Remaining::Count(n) => write!(f, "{n}"),
        }
    }
}

struct BudgetState {
    count: u32,
    reset_at: DateTime<Local>,
}

/// Daily quota gating oracle calls across all producers.
///
/// Producers poll [`allow`][RequestBudget::allow] without holding the busy
/// gate, so the counter and the rollover check sit behind an internal lock.
pub struct RequestBudget {
    limit: u32,
    enabled: bool,
    state: Mutex<BudgetState>,
}

impl RequestBudget {
    pub fn new(limit: u32, enabled: bool) -> Self {
        Self {
            limit,
            enabled,
            state: Mutex::new(BudgetState {
                count: 0,
                reset_at: next_local_midnight(Local::now()),
            }),
        }
    }

    /// Roll the counter over if local midnight has passed, then test the
    /// quota. Always `true` when limiting is disabled.
    pub fn allow(&self) -> bool {
        self.allow_at(Local::now())
    }

    fn allow_at(&self, now: DateTime<Local>) -> bool {
        if !self.enabled {
            return true;
        }
        let mut state = self.lock_state();
        if now >= state.reset_at {
            state.count = 0;
            state.reset_at = next_local_midnight(now);
            info!("daily request quota reset");
        }
        state.count < self.limit
    }

    /// Record one successful oracle call.
    pub fn consume(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.lock_state();
        state.count = state.count.saturating_add(1);
    }

    pub fn remaining(&self) -> Remaining {
        if !self.enabled {
            return Remaining::Unlimited;
        }
        let state = self.lock_state();
        Remaining::Count(self.limit.saturating_sub(state.count))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Start of the next local calendar day.
fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    (now.date_naive() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .unwrap_or_else(|| now + chrono::Duration::days(1))
}

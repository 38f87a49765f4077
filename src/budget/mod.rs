// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Spend accounting for hosted-planner calls.
//!
//! Every hosted attempt must hold a [`ReservationTicket`] before the request
//! goes out. A reservation counts against the ceiling immediately, so two
//! concurrent requests can never jointly overshoot it. Tickets are consumed by
//! value via [`ReservationTicket::finalize`] or [`ReservationTicket::release`];
//! a ticket dropped on an error path releases its hold automatically.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Actual spend may exceed the estimate slightly (token counts are only known
/// after the response). Finalization accepts up to this factor over the
/// reservation and clamps anything beyond it.
const FINALIZE_OVERRUN_FACTOR: f64 = 1.25;

#[derive(Debug, Clone, PartialEq)]
pub enum BudgetError {
    Exhausted { requested_usd: f64, available_usd: f64 },
    InvalidAmount { amount_usd: f64 },
}

impl fmt::Display for BudgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { requested_usd, available_usd } => write!(
                f,
                "budget exhausted: requested ${requested_usd:.4}, only ${available_usd:.4} available"
            ),
            Self::InvalidAmount { amount_usd } => {
                write!(f, "budget amount must be a non-negative finite number, got {amount_usd}")
            }
        }
    }
}

impl std::error::Error for BudgetError {}

#[derive(Debug, Default)]
struct BudgetState {
    spent_usd: f64,
    reserved_usd: f64,
}

/// Shared, clonable ledger with a hard spend ceiling.
#[derive(Debug, Clone)]
pub struct BudgetController {
    ceiling_usd: f64,
    state: Arc<Mutex<BudgetState>>,
}

impl BudgetController {
    pub fn new(ceiling_usd: f64) -> Self {
        Self { ceiling_usd, state: Arc::new(Mutex::new(BudgetState::default())) }
    }

    pub fn ceiling_usd(&self) -> f64 {
        self.ceiling_usd
    }

    pub fn spent_usd(&self) -> f64 {
        self.state.lock().expect("budget lock").spent_usd
    }

    pub fn reserved_usd(&self) -> f64 {
        self.state.lock().expect("budget lock").reserved_usd
    }

    /// Ceiling minus committed and in-flight spend. Never negative.
    pub fn available_usd(&self) -> f64 {
        let state = self.state.lock().expect("budget lock");
        (self.ceiling_usd - state.spent_usd - state.reserved_usd).max(0.0)
    }

    /// Reserves `estimated_usd` against the ceiling. Fails closed: if the
    /// estimate does not fit the remaining headroom, no hosted call happens.
    pub fn reserve(&self, estimated_usd: f64) -> Result<ReservationTicket, BudgetError> {
        if !estimated_usd.is_finite() || estimated_usd < 0.0 {
            return Err(BudgetError::InvalidAmount { amount_usd: estimated_usd });
        }
        let mut state = self.state.lock().expect("budget lock");
        let available = (self.ceiling_usd - state.spent_usd - state.reserved_usd).max(0.0);
        if estimated_usd > available {
            return Err(BudgetError::Exhausted {
                requested_usd: estimated_usd,
                available_usd: available,
            });
        }
        state.reserved_usd += estimated_usd;
        Ok(ReservationTicket {
            state: Arc::clone(&self.state),
            reserved_usd: estimated_usd,
            consumed: false,
        })
    }
}

/// A hold on budget headroom. Exactly one of [`finalize`](Self::finalize) or
/// [`release`](Self::release) settles it; dropping an unsettled ticket
/// releases the hold.
#[derive(Debug)]
pub struct ReservationTicket {
    state: Arc<Mutex<BudgetState>>,
    reserved_usd: f64,
    consumed: bool,
}

impl ReservationTicket {
    pub fn reserved_usd(&self) -> f64 {
        self.reserved_usd
    }

    /// Converts the hold into committed spend. The recorded amount is clamped
    /// at 1.25x the reservation so a wild provider-side number cannot blow
    /// through the ceiling retroactively. Returns the amount recorded.
    pub fn finalize(mut self, actual_usd: f64) -> f64 {
        let recorded = if actual_usd.is_finite() && actual_usd >= 0.0 {
            actual_usd.min(self.reserved_usd * FINALIZE_OVERRUN_FACTOR)
        } else {
            self.reserved_usd
        };
        let mut state = self.state.lock().expect("budget lock");
        state.reserved_usd -= self.reserved_usd;
        state.spent_usd += recorded;
        self.consumed = true;
        recorded
    }

    /// Drops the hold without recording any spend.
    pub fn release(mut self) {
        let mut state = self.state.lock().expect("budget lock");
        state.reserved_usd -= self.reserved_usd;
        self.consumed = true;
    }
}

impl Drop for ReservationTicket {
    fn drop(&mut self) {
        if !self.consumed {
            let mut state = self.state.lock().expect("budget lock");
            state.reserved_usd -= self.reserved_usd;
        }
    }
}

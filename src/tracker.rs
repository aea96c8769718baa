//! Per-product availability state with restock cooldown
//!
//! Only an out-of-stock to in-stock flip is notify-worthy, and only when the
//! product is outside the cooldown started by its previous notification.
//! Going out of stock updates state silently.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityState {
    pub product_id: String,
    pub last_known_in_stock: bool,
    /// End of the cooldown started by the last notification, if any.
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// Outcome of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Restocked outside any cooldown: notify.
    Notify,
    /// Restocked, but an earlier notification's cooldown is still running.
    CooldownActive { until: DateTime<Utc> },
    StillInStock,
    StillOutOfStock,
    WentOutOfStock,
}

impl Decision {
    pub fn is_notify(&self) -> bool {
        matches!(self, Decision::Notify)
    }
}

#[derive(Debug)]
pub struct AvailabilityTracker {
    cooldown: chrono::Duration,
    states: HashMap<String, AvailabilityState>,
}

impl AvailabilityTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: chrono::Duration::from_std(cooldown)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
            states: HashMap::new(),
        }
    }

    /// Record the availability seen for `product_id` at `now`.
    ///
    /// Unknown products start as out of stock, so a product that is in stock
    /// on first sight notifies.
    pub fn observe(&mut self, product_id: &str, in_stock: bool, now: DateTime<Utc>) -> Decision {
        let state = self
            .states
            .entry(product_id.to_string())
            .or_insert_with(|| AvailabilityState {
                product_id: product_id.to_string(),
                last_known_in_stock: false,
                cooldown_until: None,
            });

        let was_in_stock = state.last_known_in_stock;
        state.last_known_in_stock = in_stock;

        match (was_in_stock, in_stock) {
            (true, true) => Decision::StillInStock,
            (false, false) => Decision::StillOutOfStock,
            (true, false) => Decision::WentOutOfStock,
            (false, true) => match state.cooldown_until {
                Some(until) if now < until => Decision::CooldownActive { until },
                _ => {
                    state.cooldown_until =
                        Some(now.checked_add_signed(self.cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC));
                    Decision::Notify
                }
            },
        }
    }

    /// Move a product's state to a new identifier after an identifier change.
    pub fn rekey(&mut self, from: &str, to: &str) {
        if let Some(mut state) = self.states.remove(from) {
            state.product_id = to.to_string();
            self.states.insert(to.to_string(), state);
        }
    }

    pub fn state(&self, product_id: &str) -> Option<&AvailabilityState> {
        self.states.get(product_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

//! Hourly earnings throttle.
//!
//! A coarse defense against scripted currency farming: one counter per
//! player, reset to zero for everyone at once on a global hourly timer
//! rather than a per-player sliding window. Only the earn path consults it;
//! spends, sets and admin grants are never throttled.

use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::farm::types::PlayerId;

/// Per-player rolling-hour earnings accounting.
pub struct EarningsThrottle {
    max_coins_per_hour: u64,
    earned: Mutex<HashMap<PlayerId, u64>>,
}

impl EarningsThrottle {
    pub fn new(max_coins_per_hour: u64) -> Self {
        Self {
            max_coins_per_hour,
            earned: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_coins_per_hour(&self) -> u64 {
        self.max_coins_per_hour
    }

    /// Atomically check headroom and commit the reservation. Returns false
    /// (and commits nothing) when `earned + amount` would exceed the cap.
    pub fn try_reserve(&self, player: PlayerId, amount: u64) -> bool {
        let mut earned = self.earned.lock().expect("throttle mutex poisoned");
        let current = earned.entry(player).or_insert(0);
        if current.saturating_add(amount) > self.max_coins_per_hour {
            return false;
        }
        *current += amount;
        true
    }

    /// Coins earned by this player in the current window.
    pub fn earned(&self, player: PlayerId) -> u64 {
        self.earned
            .lock()
            .expect("throttle mutex poisoned")
            .get(&player)
            .copied()
            .unwrap_or(0)
    }

    /// Headroom remaining before the cap rejects further grants.
    pub fn remaining(&self, player: PlayerId) -> u64 {
        self.max_coins_per_hour.saturating_sub(self.earned(player))
    }

    /// Global window edge: zero every player's counter simultaneously.
    pub fn reset_all(&self) {
        let mut earned = self.earned.lock().expect("throttle mutex poisoned");
        let tracked = earned.len();
        earned.clear();
        debug!("hourly earnings counters reset for {} players", tracked);
    }

    /// Install a persisted counter value (session restore). The window
    /// stays closed across leave/rejoin until the next global reset.
    pub fn seed(&self, player: PlayerId, amount: u64) {
        self.earned
            .lock()
            .expect("throttle mutex poisoned")
            .insert(player, amount);
    }
}

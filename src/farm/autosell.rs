//! Auto-sell queue: entitlement-gated FIFO conversion of harvested items
//! into coins.
//!
//! Each scheduler tick sells at most one queued item per player, through the
//! same ledger path a manual sale uses, which bounds per-tick economic
//! injection no matter how deep a queue grows. A sale the ledger rejects
//! (cap exceeded) drops the entry rather than retrying it; the loss is
//! deliberate policy, logged at warn.

use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::farm::hooks::{Entitlements, Notifier, PriceTable};
use crate::farm::ledger::CurrencyLedger;
use crate::farm::types::{AutoSellEntry, Notification, NotificationCategory, PlayerId};

/// Outcome of one queue drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSellTickReport {
    /// Entries successfully converted to coins.
    pub sold: u32,
    /// Entries dropped (unknown item price or ledger rejection).
    pub dropped: u32,
}

/// Per-player FIFO queues of harvests awaiting automatic sale.
pub struct AutoSellQueue {
    queues: Mutex<HashMap<PlayerId, VecDeque<AutoSellEntry>>>,
}

impl Default for AutoSellQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoSellQueue {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a harvested item for automatic sale. Returns false without
    /// queueing when the player lacks the auto-sell entitlement.
    pub fn enqueue(
        &self,
        player: PlayerId,
        plot_id: u64,
        item_id: &str,
        entitlements: &dyn Entitlements,
    ) -> bool {
        if !entitlements.is_auto_sell_entitled(player) {
            return false;
        }
        let mut queues = self.queues.lock().expect("autosell mutex poisoned");
        queues
            .entry(player)
            .or_default()
            .push_back(AutoSellEntry::new(plot_id, item_id));
        true
    }

    /// Pending entries for one player.
    pub fn queue_len(&self, player: PlayerId) -> usize {
        self.queues
            .lock()
            .expect("autosell mutex poisoned")
            .get(&player)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Drop a player's queue entirely (session teardown).
    pub fn forget(&self, player: PlayerId) {
        self.queues
            .lock()
            .expect("autosell mutex poisoned")
            .remove(&player);
    }

    /// Drain pass: dequeue exactly one head entry per player with a
    /// non-empty queue and attempt the sale.
    pub fn process_tick(
        &self,
        ledger: &CurrencyLedger,
        prices: &dyn PriceTable,
        notifier: &dyn Notifier,
    ) -> AutoSellTickReport {
        let batch: Vec<(PlayerId, AutoSellEntry)> = {
            let mut queues = self.queues.lock().expect("autosell mutex poisoned");
            let batch = queues
                .iter_mut()
                .filter_map(|(player, queue)| queue.pop_front().map(|e| (*player, e)))
                .collect();
            queues.retain(|_, queue| !queue.is_empty());
            batch
        };

        let mut report = AutoSellTickReport::default();
        for (player, entry) in batch {
            let Some(price) = prices.sell_price(&entry.item_id) else {
                warn!(
                    "auto-sell: no sell price for '{}', dropping entry from {}",
                    entry.item_id, player
                );
                report.dropped += 1;
                continue;
            };
            match ledger.add_coins(player, price as i64, "auto_sell") {
                Ok(balance) => {
                    debug!(
                        "auto-sell: {} sold '{}' from plot {} for {} (balance {})",
                        player, entry.item_id, entry.plot_id, price, balance
                    );
                    notifier.notify(
                        player,
                        Notification::new(
                            "Auto-Sell",
                            &format!("Sold {} for {} coins", entry.item_id, price),
                            NotificationCategory::Economy,
                        )
                        .with_icon("coin_stack"),
                    );
                    report.sold += 1;
                }
                Err(err) => {
                    // Lossy on failure: the entry is gone, not requeued.
                    warn!(
                        "auto-sell: sale of '{}' for {} failed, entry dropped: {}",
                        entry.item_id, player, err
                    );
                    report.dropped += 1;
                }
            }
        }
        report
    }
}

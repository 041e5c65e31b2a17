//! Currency ledger: per-player balances, validated mutations, bounded
//! transaction history.
//!
//! Every mutating operation is atomic with respect to one player's wallet:
//! the read-modify-write happens inside that wallet's own critical section,
//! so no partial update is observable. Distinct players' wallets are
//! independent locks and mutate concurrently.

use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::farm::errors::FarmError;
use crate::farm::stats::EconomyStats;
use crate::farm::throttle::EarningsThrottle;
use crate::farm::types::{
    PlayerId, PlayerWallet, Transaction, TransactionKind, WalletSnapshot,
    TRANSACTION_HISTORY_LIMIT,
};

/// The authoritative in-session coin ledger.
pub struct CurrencyLedger {
    wallets: RwLock<HashMap<PlayerId, Arc<Mutex<PlayerWallet>>>>,
    throttle: EarningsThrottle,
    stats: EconomyStats,
    starting_balance: u64,
    history_limit: usize,
}

impl CurrencyLedger {
    pub fn new(starting_balance: u64, max_coins_per_hour: u64) -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            throttle: EarningsThrottle::new(max_coins_per_hour),
            stats: EconomyStats::new(),
            starting_balance,
            history_limit: TRANSACTION_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn throttle(&self) -> &EarningsThrottle {
        &self.throttle
    }

    pub fn stats(&self) -> &EconomyStats {
        &self.stats
    }

    /// Get or lazily create the wallet handle for a player. Creation injects
    /// the starting balance into circulation, so the circulation counter
    /// always equals the sum of tracked balances.
    fn wallet(&self, player: PlayerId) -> Arc<Mutex<PlayerWallet>> {
        if let Some(wallet) = self
            .wallets
            .read()
            .expect("wallet map lock poisoned")
            .get(&player)
        {
            return Arc::clone(wallet);
        }
        let mut wallets = self.wallets.write().expect("wallet map lock poisoned");
        if let Some(wallet) = wallets.get(&player) {
            return Arc::clone(wallet);
        }
        self.stats.record_delta(self.starting_balance as i64);
        let wallet = Arc::new(Mutex::new(PlayerWallet::new(player, self.starting_balance)));
        wallets.insert(player, Arc::clone(&wallet));
        wallet
    }

    /// Earn coins through the throttled path. Returns the new balance.
    pub fn add_coins(
        &self,
        player: PlayerId,
        amount: i64,
        reason: &str,
    ) -> Result<u64, FarmError> {
        if amount <= 0 {
            return Err(FarmError::InvalidAmount(amount));
        }
        let amount_u = amount as u64;
        if !self.throttle.try_reserve(player, amount_u) {
            return Err(FarmError::EarningsCapExceeded {
                requested: amount_u,
                remaining: self.throttle.remaining(player),
            });
        }

        let wallet = self.wallet(player);
        let mut wallet = wallet.lock().expect("wallet lock poisoned");
        wallet.coins = wallet.coins.saturating_add(amount_u);
        let balance = wallet.coins;
        wallet.record(
            Transaction::new(TransactionKind::Earn, amount, reason, balance),
            self.history_limit,
        );
        self.stats.record_delta(amount);
        Ok(balance)
    }

    /// Debit coins. Fails without partial debit when the balance is short.
    pub fn spend_coins(
        &self,
        player: PlayerId,
        amount: i64,
        reason: &str,
    ) -> Result<u64, FarmError> {
        if amount <= 0 {
            return Err(FarmError::InvalidAmount(amount));
        }
        let amount_u = amount as u64;

        let wallet = self.wallet(player);
        let mut wallet = wallet.lock().expect("wallet lock poisoned");
        if wallet.coins < amount_u {
            return Err(FarmError::InsufficientFunds {
                needed: amount_u,
                available: wallet.coins,
            });
        }
        wallet.coins -= amount_u;
        let balance = wallet.coins;
        wallet.record(
            Transaction::new(TransactionKind::Spend, -amount, reason, balance),
            self.history_limit,
        );
        self.stats.record_delta(-amount);
        Ok(balance)
    }

    /// Administrative overwrite; clamps to zero, bypasses the earnings cap.
    pub fn set_coins(&self, player: PlayerId, amount: i64) -> u64 {
        let target = amount.max(0) as u64;

        let wallet = self.wallet(player);
        let mut wallet = wallet.lock().expect("wallet lock poisoned");
        let delta = target as i64 - wallet.coins as i64;
        wallet.coins = target;
        wallet.record(
            Transaction::new(TransactionKind::Set, delta, "set_coins", target),
            self.history_limit,
        );
        self.stats.record_delta(delta);
        info!("set_coins {}: balance forced to {} (delta {})", player, target, delta);
        target
    }

    /// Cap-bypassing grant used for quest rewards and admin tooling.
    pub fn grant_coins(
        &self,
        player: PlayerId,
        amount: i64,
        reason: &str,
    ) -> Result<u64, FarmError> {
        if amount <= 0 {
            return Err(FarmError::InvalidAmount(amount));
        }

        let wallet = self.wallet(player);
        let mut wallet = wallet.lock().expect("wallet lock poisoned");
        wallet.coins = wallet.coins.saturating_add(amount as u64);
        let balance = wallet.coins;
        wallet.record(
            Transaction::new(TransactionKind::AdminAdd, amount, reason, balance),
            self.history_limit,
        );
        self.stats.record_delta(amount);
        Ok(balance)
    }

    /// Pure affordability read.
    pub fn can_afford(&self, player: PlayerId, amount: u64) -> bool {
        self.balance(player) >= amount
    }

    pub fn balance(&self, player: PlayerId) -> u64 {
        self.wallet(player).lock().expect("wallet lock poisoned").coins
    }

    /// Recent transactions, oldest first.
    pub fn history(&self, player: PlayerId) -> Vec<Transaction> {
        self.wallet(player)
            .lock()
            .expect("wallet lock poisoned")
            .history
            .iter()
            .cloned()
            .collect()
    }

    /// Current balances of every tracked wallet (for stats refresh).
    pub fn balances(&self) -> Vec<u64> {
        let wallets = self.wallets.read().expect("wallet map lock poisoned");
        wallets
            .values()
            .map(|w| w.lock().expect("wallet lock poisoned").coins)
            .collect()
    }

    pub fn tracked_players(&self) -> Vec<PlayerId> {
        self.wallets
            .read()
            .expect("wallet map lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Serializable copy of one wallet, if tracked, with the current hourly
    /// earnings folded in.
    pub fn snapshot(&self, player: PlayerId) -> Option<WalletSnapshot> {
        let wallets = self.wallets.read().expect("wallet map lock poisoned");
        wallets.get(&player).map(|w| {
            let mut snap = w.lock().expect("wallet lock poisoned").clone();
            snap.hourly_earned = self.throttle.earned(player);
            snap
        })
    }

    /// Serializable copies of every tracked wallet.
    pub fn snapshot_all(&self) -> Vec<WalletSnapshot> {
        let wallets = self.wallets.read().expect("wallet map lock poisoned");
        wallets
            .values()
            .map(|w| {
                let mut snap = w.lock().expect("wallet lock poisoned").clone();
                snap.hourly_earned = self.throttle.earned(snap.player);
                snap
            })
            .collect()
    }

    /// Install a previously persisted wallet, replacing any tracked state.
    /// Re-seeds the earnings throttle from the snapshot and adjusts
    /// circulation by the balance delta, so the derived view stays equal to
    /// the sum of tracked balances.
    pub fn restore(&self, snapshot: WalletSnapshot) {
        let player = snapshot.player;
        let mut delta = snapshot.coins as i64;
        self.throttle.seed(player, snapshot.hourly_earned);
        let mut wallets = self.wallets.write().expect("wallet map lock poisoned");
        if let Some(old) = wallets.insert(player, Arc::new(Mutex::new(snapshot))) {
            delta -= old.lock().expect("wallet lock poisoned").coins as i64;
        }
        self.stats.record_delta(delta);
    }

    /// Drop a player's in-memory wallet (session teardown), returning the
    /// final snapshot for best-effort persistence. The hourly earnings
    /// counter is kept so a rejoin inside the window gets no fresh headroom;
    /// the next global reset clears it.
    pub fn evict(&self, player: PlayerId) -> Option<WalletSnapshot> {
        let snap = {
            let mut wallets = self.wallets.write().expect("wallet map lock poisoned");
            wallets
                .remove(&player)
                .map(|w| w.lock().expect("wallet lock poisoned").clone())
        };
        snap.map(|mut snap| {
            snap.hourly_earned = self.throttle.earned(player);
            self.stats.record_delta(-(snap.coins as i64));
            snap
        })
    }

    /// Recompute the derived stats view from current balances.
    pub fn refresh_stats(&self) {
        self.stats.refresh(&self.balances());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CurrencyLedger {
        CurrencyLedger::new(0, 1000)
    }

    #[test]
    fn add_rejects_non_positive_amounts() {
        let ledger = ledger();
        let p = PlayerId(1);
        assert!(matches!(
            ledger.add_coins(p, 0, "x"),
            Err(FarmError::InvalidAmount(0))
        ));
        assert!(matches!(
            ledger.add_coins(p, -5, "x"),
            Err(FarmError::InvalidAmount(-5))
        ));
        assert_eq!(ledger.balance(p), 0);
    }

    #[test]
    fn hourly_cap_rejects_over_cap_grant_without_mutation() {
        let ledger = ledger();
        let p = PlayerId(7);
        assert_eq!(ledger.add_coins(p, 700, "harvest_sale").unwrap(), 700);
        let err = ledger.add_coins(p, 400, "harvest_sale").unwrap_err();
        assert!(matches!(err, FarmError::EarningsCapExceeded { requested: 400, remaining: 300 }));
        assert_eq!(ledger.balance(p), 700, "balance unchanged on rejection");
        assert_eq!(ledger.add_coins(p, 300, "harvest_sale").unwrap(), 1000);
    }

    #[test]
    fn spend_without_funds_fails_atomically() {
        let ledger = CurrencyLedger::new(500, 10_000);
        let p = PlayerId(2);
        let err = ledger.spend_coins(p, 600, "shop_purchase").unwrap_err();
        assert!(matches!(
            err,
            FarmError::InsufficientFunds { needed: 600, available: 500 }
        ));
        assert_eq!(ledger.balance(p), 500);
    }

    #[test]
    fn spend_then_add_round_trips() {
        let ledger = CurrencyLedger::new(500, 10_000);
        let p = PlayerId(3);
        ledger.spend_coins(p, 200, "seeds").unwrap();
        ledger.add_coins(p, 200, "seeds").unwrap();
        assert_eq!(ledger.balance(p), 500);
        // Circulation counts the starting grant plus the net of the round
        // trip, i.e. exactly the tracked balance.
        assert_eq!(ledger.stats().circulation(), 500);
    }

    #[test]
    fn set_coins_clamps_and_logs_signed_delta() {
        let ledger = CurrencyLedger::new(250, 10_000);
        let p = PlayerId(4);
        assert_eq!(ledger.set_coins(p, -50), 0);
        let history = ledger.history(p);
        let last = history.last().unwrap();
        assert_eq!(last.kind, TransactionKind::Set);
        assert_eq!(last.reason, "set_coins");
        assert_eq!(last.amount, -250);
        assert_eq!(last.balance_after, 0);
    }

    #[test]
    fn set_and_grant_bypass_the_cap() {
        let ledger = CurrencyLedger::new(0, 100);
        let p = PlayerId(5);
        assert_eq!(ledger.add_coins(p, 100, "harvest_sale").unwrap(), 100);
        assert!(ledger.add_coins(p, 1, "harvest_sale").is_err());
        assert_eq!(ledger.grant_coins(p, 500, "quest_reward").unwrap(), 600);
        assert_eq!(ledger.set_coins(p, 50), 50);
    }

    #[test]
    fn history_is_a_bounded_ring_buffer() {
        let ledger = CurrencyLedger::new(0, u64::MAX).with_history_limit(5);
        let p = PlayerId(6);
        for i in 1..=8 {
            ledger.add_coins(p, i, "harvest_sale").unwrap();
        }
        let history = ledger.history(p);
        assert_eq!(history.len(), 5);
        assert_eq!(history.first().unwrap().amount, 4, "oldest entries evicted");
        assert_eq!(history.last().unwrap().amount, 8);
    }

    #[test]
    fn balance_never_negative_across_mixed_operations() {
        let ledger = CurrencyLedger::new(100, u64::MAX);
        let p = PlayerId(8);
        let _ = ledger.spend_coins(p, 40, "a");
        let _ = ledger.spend_coins(p, 500, "b");
        let _ = ledger.add_coins(p, 10, "c");
        let _ = ledger.spend_coins(p, 70, "d");
        assert_eq!(ledger.balance(p), 0);
    }

    #[test]
    fn circulation_is_reconstructable_from_balances() {
        let ledger = CurrencyLedger::new(100, u64::MAX);
        let a = PlayerId(10);
        let b = PlayerId(11);
        ledger.add_coins(a, 250, "harvest_sale").unwrap();
        ledger.spend_coins(b, 60, "shop_purchase").unwrap();
        ledger.set_coins(a, 400);
        let balances = ledger.balances();
        let reconstructed = EconomyStats::reconstruct_circulation(&balances, 0);
        assert_eq!(reconstructed, ledger.stats().circulation());
    }

    #[test]
    fn circulation_stays_reconstructable_across_evict_and_restore() {
        let ledger = CurrencyLedger::new(0, u64::MAX);
        let p = PlayerId(13);
        ledger.add_coins(p, 500, "harvest_sale").unwrap();

        let snap = ledger.evict(p).expect("snapshot");
        assert_eq!(
            ledger.stats().circulation(),
            EconomyStats::reconstruct_circulation(&ledger.balances(), 0),
            "eviction removes the balance from circulation"
        );

        ledger.restore(snap);
        assert_eq!(ledger.stats().circulation(), 500);
        assert_eq!(
            ledger.stats().circulation(),
            EconomyStats::reconstruct_circulation(&ledger.balances(), 0)
        );
    }

    #[test]
    fn restore_over_a_live_wallet_does_not_double_count() {
        let ledger = CurrencyLedger::new(100, u64::MAX);
        let p = PlayerId(14);
        ledger.add_coins(p, 400, "harvest_sale").unwrap();
        let snap = ledger.snapshot(p).expect("snapshot");

        // Replacing tracked state with the same snapshot is a no-op for
        // circulation.
        ledger.restore(snap);
        assert_eq!(ledger.balance(p), 500);
        assert_eq!(ledger.stats().circulation(), 500);
    }

    #[test]
    fn hourly_cap_survives_evict_and_restore() {
        let ledger = CurrencyLedger::new(0, 1000);
        let p = PlayerId(15);
        assert_eq!(ledger.add_coins(p, 1000, "harvest_sale").unwrap(), 1000);
        assert!(ledger.add_coins(p, 1, "harvest_sale").is_err());

        let snap = ledger.evict(p).expect("snapshot");
        assert_eq!(snap.hourly_earned, 1000, "window state travels with the snapshot");

        ledger.restore(snap);
        let err = ledger.add_coins(p, 1000, "harvest_sale").unwrap_err();
        assert!(matches!(
            err,
            FarmError::EarningsCapExceeded { requested: 1000, remaining: 0 }
        ));
        assert_eq!(ledger.balance(p), 1000);

        ledger.throttle().reset_all();
        assert_eq!(ledger.add_coins(p, 1000, "harvest_sale").unwrap(), 2000);
    }

    #[test]
    fn evict_returns_final_snapshot_and_restore_reinstates() {
        let ledger = CurrencyLedger::new(0, u64::MAX);
        let p = PlayerId(12);
        ledger.grant_coins(p, 750, "quest_reward").unwrap();
        let snap = ledger.evict(p).expect("snapshot");
        assert_eq!(snap.coins, 750);
        assert!(ledger.snapshot(p).is_none());
        ledger.restore(snap);
        assert_eq!(ledger.balance(p), 750);
    }
}

//! Session-facing façade over the economy and quest subsystems.
//!
//! One `FarmService` lives for the whole server session. It owns the wiring
//! between the ledger, the auto-sell queue, the quest engine, and the reset
//! tracker, and is the only type the scheduler and the platform adapter talk
//! to. Persistence is best-effort: a store failure on leave or flush is
//! logged, never surfaced to gameplay.

use chrono::Utc;
use log::{info, warn};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::farm::autosell::{AutoSellQueue, AutoSellTickReport};
use crate::farm::catalog::QuestCatalog;
use crate::farm::errors::FarmError;
use crate::farm::hooks::{
    AllowAllEntitlements, EmptySessionRegistry, Entitlements, LogNotifier, Notifier, PriceTable,
    SessionRegistry,
};
use crate::farm::ledger::CurrencyLedger;
use crate::farm::quests::QuestEngine;
use crate::farm::reset::{DueResets, ResetTracker};
use crate::farm::rewards::{LedgerRewardSink, RewardDistributor};
use crate::farm::seed::{default_sell_prices, starter_quest_templates};
use crate::farm::stats::StatsSnapshot;
use crate::farm::types::{
    ActionKind, GameAction, PlayerId, QuestInstance, QuestTemplate, Transaction,
};
use crate::storage::FarmStore;

const META_RESET_TRACKER: &str = "reset_tracker";

/// Builder for a fully wired [`FarmService`].
pub struct FarmServiceBuilder {
    starting_balance: u64,
    max_coins_per_hour: u64,
    history_limit: Option<usize>,
    templates: Option<Vec<QuestTemplate>>,
    prices: Option<Arc<dyn PriceTable>>,
    entitlements: Option<Arc<dyn Entitlements>>,
    notifier: Option<Arc<dyn Notifier>>,
    sessions: Option<Arc<dyn SessionRegistry>>,
    store: Option<Arc<FarmStore>>,
}

impl FarmServiceBuilder {
    pub fn new(starting_balance: u64, max_coins_per_hour: u64) -> Self {
        Self {
            starting_balance,
            max_coins_per_hour,
            history_limit: None,
            templates: None,
            prices: None,
            entitlements: None,
            notifier: None,
            sessions: None,
            store: None,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn with_templates(mut self, templates: Vec<QuestTemplate>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_prices(mut self, prices: Arc<dyn PriceTable>) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn with_entitlements(mut self, entitlements: Arc<dyn Entitlements>) -> Self {
        self.entitlements = Some(entitlements);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_store(mut self, store: Arc<FarmStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> FarmService {
        let mut ledger = CurrencyLedger::new(self.starting_balance, self.max_coins_per_hour);
        if let Some(limit) = self.history_limit {
            ledger = ledger.with_history_limit(limit);
        }
        let ledger = Arc::new(ledger);

        let notifier: Arc<dyn Notifier> = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
        let prices: Arc<dyn PriceTable> = self
            .prices
            .unwrap_or_else(|| Arc::new(default_sell_prices()));
        let entitlements: Arc<dyn Entitlements> = self
            .entitlements
            .unwrap_or_else(|| Arc::new(AllowAllEntitlements));

        let mut catalog = QuestCatalog::new();
        for template in self.templates.unwrap_or_else(starter_quest_templates) {
            catalog.insert(template);
        }

        let rewards = RewardDistributor::new(
            Arc::new(LedgerRewardSink::new(Arc::clone(&ledger))),
            Arc::clone(&notifier),
        );
        let quests = QuestEngine::new(Arc::new(catalog), rewards, Arc::clone(&notifier));

        // Resume the reset watermarks from disk when a store is attached,
        // otherwise anchor them to the current window.
        let tracker = self
            .store
            .as_ref()
            .and_then(|store| match store.load_meta::<ResetTracker>(META_RESET_TRACKER) {
                Ok(tracker) => tracker,
                Err(err) => {
                    warn!("reset tracker load failed, re-anchoring: {}", err);
                    None
                }
            })
            .unwrap_or_else(|| ResetTracker::new(Utc::now()));

        FarmService {
            ledger,
            autosell: AutoSellQueue::new(),
            quests,
            reset: Mutex::new(tracker),
            prices,
            entitlements,
            notifier,
            sessions: self
                .sessions
                .unwrap_or_else(|| Arc::new(EmptySessionRegistry)),
            store: self.store,
        }
    }
}

/// The session-lifetime economy and quest service.
pub struct FarmService {
    ledger: Arc<CurrencyLedger>,
    autosell: AutoSellQueue,
    quests: QuestEngine,
    reset: Mutex<ResetTracker>,
    prices: Arc<dyn PriceTable>,
    entitlements: Arc<dyn Entitlements>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<dyn SessionRegistry>,
    store: Option<Arc<FarmStore>>,
}

impl FarmService {
    pub fn ledger(&self) -> &CurrencyLedger {
        &self.ledger
    }

    pub fn quests(&self) -> &QuestEngine {
        &self.quests
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Load persisted state (if any), begin tracking the player, and apply
    /// any resets the player missed while offline.
    pub fn player_join(&self, player: PlayerId) {
        let now = Utc::now();

        if let Some(store) = &self.store {
            match store.load_wallet(player) {
                Ok(Some(wallet)) => self.ledger.restore(wallet),
                Ok(None) => {}
                Err(err) => warn!("wallet load for {} failed, starting fresh: {}", player, err),
            }
            match store.load_quest_state(player) {
                Ok(Some(state)) => self.quests.restore(state),
                Ok(None) => {}
                Err(err) => warn!("quest load for {} failed, starting fresh: {}", player, err),
            }
        }

        self.quests.register(player, now);

        // Catch up on windows that opened while the player was offline. The
        // player watermark lags the tracker's after a load from disk.
        let (daily_mark, weekly_mark) = {
            let tracker = self.reset.lock().expect("reset tracker lock poisoned");
            (tracker.daily_watermark(), tracker.weekly_watermark())
        };
        if let Some(state) = self.quests.snapshot(player) {
            if state.last_daily_reset < daily_mark {
                self.quests.reassign_category(
                    player,
                    crate::farm::types::QuestCategory::Daily,
                    daily_mark,
                    now,
                );
            }
            if state.last_weekly_reset < weekly_mark {
                self.quests.reassign_category(
                    player,
                    crate::farm::types::QuestCategory::Weekly,
                    weekly_mark,
                    now,
                );
            }
        }
        info!("{} joined: balance {}", player, self.ledger.balance(player));
    }

    /// Persist and drop the player's in-memory state.
    pub fn player_leave(&self, player: PlayerId) {
        self.autosell.forget(player);

        let wallet = self.ledger.evict(player);
        let quest_state = self.quests.evict(player);

        if let Some(store) = &self.store {
            if let Some(wallet) = &wallet {
                if let Err(err) = store.save_wallet(wallet) {
                    warn!("wallet persist for {} failed: {}", player, err);
                }
            }
            if let Some(state) = &quest_state {
                if let Err(err) = store.save_quest_state(state) {
                    warn!("quest persist for {} failed: {}", player, err);
                }
            }
        }
        info!("{} left", player);
    }

    // ------------------------------------------------------------------
    // Gameplay operations
    // ------------------------------------------------------------------

    /// Report a gameplay event to the quest engine. Returns instance ids
    /// that completed inside this call.
    pub fn report_action(&self, player: PlayerId, action: &GameAction) -> Vec<Uuid> {
        self.quests.update_progress(player, action)
    }

    /// Earn coins through the throttled path, then drive coin-earn quest
    /// objectives by the amount actually credited.
    pub fn earn(&self, player: PlayerId, amount: i64, reason: &str) -> Result<u64, FarmError> {
        let balance = self.ledger.add_coins(player, amount, reason)?;
        self.report_action(
            player,
            &GameAction::new(ActionKind::EarnCoins).with_amount(amount as u64),
        );
        Ok(balance)
    }

    /// Spend coins, then drive coin-spend quest objectives.
    pub fn spend(&self, player: PlayerId, amount: i64, reason: &str) -> Result<u64, FarmError> {
        let balance = self.ledger.spend_coins(player, amount, reason)?;
        self.report_action(
            player,
            &GameAction::new(ActionKind::SpendCoins).with_amount(amount as u64),
        );
        Ok(balance)
    }

    /// Record a harvest: advances harvest objectives and, when the player
    /// holds the auto-sell entitlement, queues the item for automatic sale.
    /// Returns true when the item was queued.
    pub fn harvest(&self, player: PlayerId, plot_id: u64, item_id: &str) -> bool {
        self.report_action(player, &GameAction::new(ActionKind::HarvestCrop));
        self.autosell
            .enqueue(player, plot_id, item_id, self.entitlements.as_ref())
    }

    /// Manual sale at the configured sell price, through the throttled path.
    pub fn sell_item(&self, player: PlayerId, item_id: &str) -> Result<u64, FarmError> {
        let price = self
            .prices
            .sell_price(item_id)
            .ok_or_else(|| FarmError::Internal(format!("no sell price for '{}'", item_id)))?;
        self.earn(player, price as i64, "harvest_sale")
    }

    pub fn abandon_quest(&self, player: PlayerId, instance_id: Uuid) -> Result<(), FarmError> {
        self.quests.abandon(player, instance_id)
    }

    pub fn active_quests(&self, player: PlayerId) -> Vec<QuestInstance> {
        self.quests.active_quests(player)
    }

    pub fn balance(&self, player: PlayerId) -> u64 {
        self.ledger.balance(player)
    }

    pub fn transaction_history(&self, player: PlayerId) -> Vec<Transaction> {
        self.ledger.history(player)
    }

    pub fn autosell_queue_len(&self, player: PlayerId) -> usize {
        self.autosell.queue_len(player)
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.ledger.stats().snapshot()
    }

    // ------------------------------------------------------------------
    // Scheduler entry points
    // ------------------------------------------------------------------

    /// Clear the hourly earnings counters for everyone.
    pub fn run_hourly_reset(&self) {
        self.ledger.throttle().reset_all();
        info!("hourly earnings counters cleared");
    }

    /// Drain one auto-sell entry per player.
    pub fn run_autosell_tick(&self) -> AutoSellTickReport {
        self.autosell
            .process_tick(&self.ledger, self.prices.as_ref(), self.notifier.as_ref())
    }

    /// Fail active quests whose deadline has passed.
    pub fn run_expiry_sweep(&self) -> usize {
        self.quests.sweep_expired(Utc::now())
    }

    /// Advance the reset watermarks and reassign due cadences for every
    /// tracked player.
    pub fn run_reset_check(&self) -> DueResets {
        let now = Utc::now();
        let due = {
            let mut tracker = self.reset.lock().expect("reset tracker lock poisoned");
            tracker.check(now)
        };
        if due.is_empty() {
            return due;
        }

        // Everyone with tracked quest state, plus anyone the platform says
        // is online but hasn't reported an event yet this session.
        let mut players = self.quests.tracked_players();
        for player in self.sessions.current_players() {
            if !players.contains(&player) {
                players.push(player);
            }
        }
        for player in players {
            if let Some(watermark) = due.daily {
                self.quests.reassign_category(
                    player,
                    crate::farm::types::QuestCategory::Daily,
                    watermark,
                    now,
                );
            }
            if let Some(watermark) = due.weekly {
                self.quests.reassign_category(
                    player,
                    crate::farm::types::QuestCategory::Weekly,
                    watermark,
                    now,
                );
            }
        }

        if let Some(store) = &self.store {
            let tracker = *self.reset.lock().expect("reset tracker lock poisoned");
            if let Err(err) = store.save_meta(META_RESET_TRACKER, &tracker) {
                warn!("reset tracker persist failed: {}", err);
            }
        }
        due
    }

    /// Rebuild the derived economy view from current balances.
    pub fn run_stats_refresh(&self) {
        self.ledger.refresh_stats();
    }

    /// Persist every tracked player and the reset watermarks. Used by the
    /// periodic flush and the shutdown path.
    pub fn persist_all(&self) {
        let Some(store) = &self.store else {
            return;
        };
        for wallet in self.ledger.snapshot_all() {
            if let Err(err) = store.save_wallet(&wallet) {
                warn!("wallet flush for {} failed: {}", wallet.player, err);
            }
        }
        for player in self.quests.tracked_players() {
            if let Some(state) = self.quests.snapshot(player) {
                if let Err(err) = store.save_quest_state(&state) {
                    warn!("quest flush for {} failed: {}", player, err);
                }
            }
        }
        let tracker = *self.reset.lock().expect("reset tracker lock poisoned");
        if let Err(err) = store.save_meta(META_RESET_TRACKER, &tracker) {
            warn!("reset tracker persist failed: {}", err);
        }
        if let Err(err) = store.flush() {
            warn!("store flush failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::types::{ObjectiveKind, ObjectiveSpec, QuestCategory};
    use crate::storage::FarmStoreBuilder;
    use tempfile::TempDir;

    fn earn_quest() -> QuestTemplate {
        QuestTemplate::new("daily_earn", "Earner", "Earn coins", QuestCategory::Daily)
            .with_objective(ObjectiveSpec::new("Earn", ObjectiveKind::Harvest, 3))
            .with_reward_coins(10)
    }

    #[test]
    fn earn_and_spend_flow_through_the_ledger() {
        let service = FarmServiceBuilder::new(100, 10_000)
            .with_templates(vec![])
            .build();
        let p = PlayerId(1);
        service.player_join(p);
        assert_eq!(service.balance(p), 100);
        service.earn(p, 50, "harvest_sale").unwrap();
        service.spend(p, 30, "shop_purchase").unwrap();
        assert_eq!(service.balance(p), 120);
        assert_eq!(service.transaction_history(p).len(), 2);
    }

    #[test]
    fn harvest_queues_for_entitled_players_and_tick_sells() {
        let service = FarmServiceBuilder::new(0, 10_000)
            .with_templates(vec![])
            .build();
        let p = PlayerId(2);
        service.player_join(p);

        assert!(service.harvest(p, 1, "carrot"));
        assert!(service.harvest(p, 2, "carrot"));
        assert_eq!(service.autosell_queue_len(p), 2);

        let report = service.run_autosell_tick();
        assert_eq!(report.sold, 1);
        assert_eq!(service.balance(p), 12, "built-in carrot price");
        assert_eq!(service.autosell_queue_len(p), 1);
    }

    #[test]
    fn state_round_trips_through_leave_and_join() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FarmStoreBuilder::new(dir.path()).open().unwrap());

        let service = FarmServiceBuilder::new(0, 10_000)
            .with_templates(vec![earn_quest()])
            .with_store(Arc::clone(&store))
            .build();
        let p = PlayerId(3);
        service.player_join(p);
        service.earn(p, 500, "harvest_sale").unwrap();
        service.player_leave(p);
        assert_eq!(service.balance(p), 0, "fresh wallet after eviction");

        service.player_join(p);
        assert_eq!(service.balance(p), 500, "persisted balance restored");
    }

    #[test]
    fn sell_item_rejects_unknown_items() {
        let service = FarmServiceBuilder::new(0, 10_000)
            .with_templates(vec![])
            .build();
        assert!(service.sell_item(PlayerId(4), "mystery_fruit").is_err());
        assert_eq!(service.sell_item(PlayerId(4), "pumpkin").unwrap(), 40);
    }

    #[test]
    fn hourly_reset_reopens_the_earning_window() {
        let service = FarmServiceBuilder::new(0, 100)
            .with_templates(vec![])
            .build();
        let p = PlayerId(5);
        service.earn(p, 100, "harvest_sale").unwrap();
        assert!(service.earn(p, 1, "harvest_sale").is_err());
        service.run_hourly_reset();
        assert_eq!(service.earn(p, 1, "harvest_sale").unwrap(), 101);
    }
}

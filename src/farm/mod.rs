//! Farm economy and quest progression engine.
//!
//! This module owns the authoritative in-session gameplay state: the coin
//! ledger with its anti-abuse earning cap, the auto-sell pipeline, the quest
//! catalog and per-player quest state machine, periodic daily/weekly resets,
//! and reward distribution. The [`service::FarmService`] façade wires the
//! pieces together; [`scheduler::SimScheduler`] drives the periodic work.

pub mod autosell;
pub mod catalog;
pub mod errors;
pub mod hooks;
pub mod ledger;
pub mod quests;
pub mod reset;
pub mod rewards;
pub mod scheduler;
pub mod seed;
pub mod service;
pub mod stats;
pub mod throttle;
pub mod types;

pub use autosell::{AutoSellQueue, AutoSellTickReport};
pub use catalog::QuestCatalog;
pub use errors::FarmError;
pub use hooks::{
    AllowAllEntitlements, EmptySessionRegistry, Entitlements, LogNotifier, Notifier, PriceTable,
    RewardSink, SessionRegistry, StaticPriceTable,
};
pub use ledger::CurrencyLedger;
pub use quests::QuestEngine;
pub use reset::{daily_window_start, weekly_window_start, DueResets, ResetTracker};
pub use rewards::{LedgerRewardSink, RewardDistributor};
pub use scheduler::{SchedulerIntervals, SimScheduler};
pub use seed::{
    default_sell_prices, load_sell_prices_from_json, load_templates_from_json,
    starter_quest_templates,
};
pub use service::{FarmService, FarmServiceBuilder};
pub use stats::{EconomyStats, StatsSnapshot, WealthDistribution};
pub use throttle::EarningsThrottle;
pub use types::{
    ActionKind, AutoSellEntry, GameAction, Notification, NotificationCategory, ObjectiveKind,
    ObjectiveProgress, ObjectiveSpec, PlayerId, PlayerQuestState, PlayerWallet, QuestCategory,
    QuestHistoryEntry, QuestInstance, QuestOutcome, QuestRarity, QuestStatus, QuestTemplate,
    RewardBundle, Transaction, TransactionKind, WalletSnapshot, TRANSACTION_HISTORY_LIMIT,
};

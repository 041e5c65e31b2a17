//! Collaborator contracts the core calls out through.
//!
//! The surrounding game managers (plot placement, shop NPCs, UI relay,
//! social systems) implement these traits and are injected once at startup
//! in dependency order; the core never reaches for them through globals.

use log::info;
use std::collections::HashMap;

use crate::farm::errors::FarmError;
use crate::farm::types::{Notification, PlayerId};

/// Applies reward components. Failures are logged by the caller and never
/// retried; they do not roll back the quest or ledger state that triggered
/// them.
pub trait RewardSink: Send + Sync {
    fn grant_currency(&self, player: PlayerId, amount: u64) -> Result<(), FarmError>;
    fn grant_experience(&self, player: PlayerId, amount: u64) -> Result<(), FarmError>;
    fn grant_item(&self, player: PlayerId, item_id: &str, quantity: u32) -> Result<(), FarmError>;
}

/// Pure entitlement queries backed by the platform's monetization layer.
pub trait Entitlements: Send + Sync {
    fn is_auto_sell_entitled(&self, player: PlayerId) -> bool;
    fn is_premium_entitled(&self, player: PlayerId) -> bool;
}

/// Static, config-driven item price lookup.
pub trait PriceTable: Send + Sync {
    fn sell_price(&self, item_id: &str) -> Option<u64>;
    fn buy_price(&self, item_id: &str) -> Option<u64>;
}

/// Fire-and-forget client notification emission; no acknowledgment.
pub trait Notifier: Send + Sync {
    fn notify(&self, player: PlayerId, notification: Notification);
}

/// Read-only view of the platform session registry.
pub trait SessionRegistry: Send + Sync {
    fn current_players(&self) -> Vec<PlayerId>;
}

// ============================================================================
// Built-in implementations
// ============================================================================

/// Map-backed price table seeded from config or the built-in defaults.
#[derive(Debug, Default)]
pub struct StaticPriceTable {
    sell: HashMap<String, u64>,
    buy: HashMap<String, u64>,
}

impl StaticPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sell_price(mut self, item_id: &str, price: u64) -> Self {
        self.sell.insert(item_id.to_string(), price);
        self
    }

    pub fn with_buy_price(mut self, item_id: &str, price: u64) -> Self {
        self.buy.insert(item_id.to_string(), price);
        self
    }

    pub fn from_sell_prices(prices: HashMap<String, u64>) -> Self {
        Self {
            sell: prices,
            buy: HashMap::new(),
        }
    }
}

impl PriceTable for StaticPriceTable {
    fn sell_price(&self, item_id: &str) -> Option<u64> {
        self.sell.get(item_id).copied()
    }

    fn buy_price(&self, item_id: &str) -> Option<u64> {
        self.buy.get(item_id).copied()
    }
}

/// Notifier that only writes to the log; useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, player: PlayerId, notification: Notification) {
        info!(
            "notify {} [{:?}] {}: {}",
            player, notification.category, notification.title, notification.body
        );
    }
}

/// Entitlements stub that grants everything; handy for local development.
#[derive(Debug, Default)]
pub struct AllowAllEntitlements;

impl Entitlements for AllowAllEntitlements {
    fn is_auto_sell_entitled(&self, _player: PlayerId) -> bool {
        true
    }

    fn is_premium_entitled(&self, _player: PlayerId) -> bool {
        true
    }
}

/// Session registry with no external platform: nobody is online.
#[derive(Debug, Default)]
pub struct EmptySessionRegistry;

impl SessionRegistry for EmptySessionRegistry {
    fn current_players(&self) -> Vec<PlayerId> {
        Vec::new()
    }
}

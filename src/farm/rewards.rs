//! Reward distribution glue.
//!
//! Applies a reward bundle through the collaborator sinks. Sink failures are
//! logged and skipped; a half-applied bundle is accepted rather than rolling
//! back the quest state that earned it.

use log::{info, warn};
use std::sync::Arc;

use crate::farm::errors::FarmError;
use crate::farm::hooks::{Notifier, RewardSink};
use crate::farm::ledger::CurrencyLedger;
use crate::farm::types::{Notification, NotificationCategory, PlayerId, RewardBundle};

/// Applies reward bundles on quest completion.
pub struct RewardDistributor {
    sink: Arc<dyn RewardSink>,
    notifier: Arc<dyn Notifier>,
}

impl RewardDistributor {
    pub fn new(sink: Arc<dyn RewardSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self { sink, notifier }
    }

    /// Push every component of the bundle through the sinks, logging (not
    /// propagating) individual failures, then notify the player.
    pub fn distribute(&self, player: PlayerId, quest_name: &str, rewards: &RewardBundle) {
        if rewards.coins > 0 {
            if let Err(err) = self.sink.grant_currency(player, rewards.coins) {
                warn!("reward currency grant failed for {}: {}", player, err);
            }
        }
        if rewards.experience > 0 {
            if let Err(err) = self.sink.grant_experience(player, rewards.experience) {
                warn!("reward experience grant failed for {}: {}", player, err);
            }
        }
        for (item_id, quantity) in &rewards.items {
            if let Err(err) = self.sink.grant_item(player, item_id, *quantity) {
                warn!(
                    "reward item grant '{}' x{} failed for {}: {}",
                    item_id, quantity, player, err
                );
            }
        }

        info!(
            "quest rewards for {}: '{}' -> {} coins, {} xp, {} item stacks",
            player,
            quest_name,
            rewards.coins,
            rewards.experience,
            rewards.items.len()
        );
        self.notifier.notify(
            player,
            Notification::new(
                "Quest Complete!",
                &format!("{}: rewards delivered", quest_name),
                NotificationCategory::Quest,
            )
            .with_icon("quest_banner"),
        );
    }
}

/// Reward sink that routes coin rewards back into the ledger through the
/// cap-bypassing grant path. Experience and items are acknowledged in the
/// log only; in production those route to the progression and inventory
/// managers.
pub struct LedgerRewardSink {
    ledger: Arc<CurrencyLedger>,
}

impl LedgerRewardSink {
    pub fn new(ledger: Arc<CurrencyLedger>) -> Self {
        Self { ledger }
    }
}

impl RewardSink for LedgerRewardSink {
    fn grant_currency(&self, player: PlayerId, amount: u64) -> Result<(), FarmError> {
        self.ledger
            .grant_coins(player, amount as i64, "quest_reward")?;
        Ok(())
    }

    fn grant_experience(&self, player: PlayerId, amount: u64) -> Result<(), FarmError> {
        info!("xp grant for {}: {}", player, amount);
        Ok(())
    }

    fn grant_item(&self, player: PlayerId, item_id: &str, quantity: u32) -> Result<(), FarmError> {
        info!("item grant for {}: {} x{}", player, item_id, quantity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::hooks::LogNotifier;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakySink {
        granted: Mutex<Vec<String>>,
        fail_currency: bool,
    }

    impl RewardSink for FlakySink {
        fn grant_currency(&self, _player: PlayerId, amount: u64) -> Result<(), FarmError> {
            if self.fail_currency {
                return Err(FarmError::Internal("currency backend down".into()));
            }
            self.granted.lock().unwrap().push(format!("coins:{}", amount));
            Ok(())
        }
        fn grant_experience(&self, _player: PlayerId, amount: u64) -> Result<(), FarmError> {
            self.granted.lock().unwrap().push(format!("xp:{}", amount));
            Ok(())
        }
        fn grant_item(&self, _player: PlayerId, item_id: &str, quantity: u32) -> Result<(), FarmError> {
            self.granted
                .lock()
                .unwrap()
                .push(format!("item:{}x{}", item_id, quantity));
            Ok(())
        }
    }

    fn bundle() -> RewardBundle {
        RewardBundle {
            coins: 100,
            experience: 25,
            items: vec![("ribbon".to_string(), 2)],
        }
    }

    #[test]
    fn full_bundle_reaches_the_sink() {
        let sink = Arc::new(FlakySink::default());
        let distributor = RewardDistributor::new(sink.clone(), Arc::new(LogNotifier));
        distributor.distribute(PlayerId(1), "Green Thumb", &bundle());
        let granted = sink.granted.lock().unwrap();
        assert_eq!(
            *granted,
            vec!["coins:100".to_string(), "xp:25".to_string(), "item:ribbonx2".to_string()]
        );
    }

    #[test]
    fn sink_failure_does_not_block_remaining_components() {
        let sink = Arc::new(FlakySink {
            fail_currency: true,
            ..Default::default()
        });
        let distributor = RewardDistributor::new(sink.clone(), Arc::new(LogNotifier));
        distributor.distribute(PlayerId(1), "Green Thumb", &bundle());
        let granted = sink.granted.lock().unwrap();
        assert_eq!(*granted, vec!["xp:25".to_string(), "item:ribbonx2".to_string()]);
    }

    #[test]
    fn ledger_sink_grants_bypass_the_cap() {
        let ledger = Arc::new(CurrencyLedger::new(0, 10));
        let sink = LedgerRewardSink::new(ledger.clone());
        sink.grant_currency(PlayerId(2), 5000).unwrap();
        assert_eq!(ledger.balance(PlayerId(2)), 5000);
    }
}

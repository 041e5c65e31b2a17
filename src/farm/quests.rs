//! Quest instance engine.
//!
//! Owns per-player quest state and drives the instance state machine:
//! `active -> {completed, failed(expired), abandoned}`, all terminal states
//! final. Completion is resolved synchronously inside the progress update
//! that reaches full progress, not deferred to a polling loop.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::farm::catalog::QuestCatalog;
use crate::farm::errors::FarmError;
use crate::farm::hooks::Notifier;
use crate::farm::rewards::RewardDistributor;
use crate::farm::types::{
    objective_kind_for, GameAction, Notification, NotificationCategory, PlayerId,
    PlayerQuestState, QuestCategory, QuestHistoryEntry, QuestInstance, QuestOutcome, QuestStatus,
};

/// Per-player quest state machine over an immutable catalog.
pub struct QuestEngine {
    catalog: Arc<QuestCatalog>,
    rewards: RewardDistributor,
    notifier: Arc<dyn Notifier>,
    players: RwLock<HashMap<PlayerId, Arc<Mutex<PlayerQuestState>>>>,
}

impl QuestEngine {
    pub fn new(
        catalog: Arc<QuestCatalog>,
        rewards: RewardDistributor,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            rewards,
            notifier,
            players: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    fn state(&self, player: PlayerId) -> Arc<Mutex<PlayerQuestState>> {
        if let Some(state) = self
            .players
            .read()
            .expect("quest map lock poisoned")
            .get(&player)
        {
            return Arc::clone(state);
        }
        let mut players = self.players.write().expect("quest map lock poisoned");
        Arc::clone(
            players
                .entry(player)
                .or_insert_with(|| Arc::new(Mutex::new(PlayerQuestState::new(player, Utc::now())))),
        )
    }

    pub fn tracked_players(&self) -> Vec<PlayerId> {
        self.players
            .read()
            .expect("quest map lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Begin tracking a player and evaluate story eligibility immediately.
    pub fn register(&self, player: PlayerId, now: DateTime<Utc>) {
        let state = self.state(player);
        let mut state = state.lock().expect("quest state lock poisoned");
        self.assign_eligible_story_quests(&mut state, now);
    }

    /// Advance every matching objective of every active instance from one
    /// gameplay event. Instances whose progress reaches 1.0 complete
    /// synchronously within this call; their ids are returned.
    pub fn update_progress(&self, player: PlayerId, action: &GameAction) -> Vec<Uuid> {
        let objective_kind = objective_kind_for(action.kind);
        let amount = action.amount.max(1);
        let now = Utc::now();

        let state = self.state(player);
        let mut state = state.lock().expect("quest state lock poisoned");

        let mut newly_complete = Vec::new();
        for instance in state.active.values_mut() {
            if !instance.status.is_active() {
                continue;
            }
            let mut touched = false;
            for objective in instance
                .objectives
                .iter_mut()
                .filter(|o| o.kind == objective_kind)
            {
                objective.apply(amount, action.unique_key.as_deref());
                touched = true;
            }
            if touched && instance.all_objectives_complete() {
                newly_complete.push(instance.instance_id);
            }
        }

        for instance_id in &newly_complete {
            self.complete_instance(&mut state, *instance_id, now);
        }
        if !newly_complete.is_empty() {
            // Completions may have satisfied a story prerequisite.
            self.assign_eligible_story_quests(&mut state, now);
        }
        newly_complete
    }

    /// Terminal transition to `completed`: rewards, set migration, history.
    fn complete_instance(
        &self,
        state: &mut PlayerQuestState,
        instance_id: Uuid,
        now: DateTime<Utc>,
    ) {
        let Some(mut instance) = state.active.remove(&instance_id) else {
            return;
        };
        let progress = instance.progress();
        instance.status = QuestStatus::Completed { completed_at: now };
        info!(
            "{} completed quest '{}' ({})",
            state.player, instance.name, instance.template_id
        );
        self.rewards
            .distribute(state.player, &instance.name, &instance.rewards);
        state.history.push(QuestHistoryEntry {
            instance_id,
            template_id: instance.template_id.clone(),
            outcome: QuestOutcome::Completed,
            progress,
            recorded_at: now,
        });
        state.completed.insert(instance_id, instance);
    }

    /// Abandon an active quest. Story quests refuse with `NotAbandonable`.
    pub fn abandon(&self, player: PlayerId, instance_id: Uuid) -> Result<(), FarmError> {
        let now = Utc::now();
        let state = self.state(player);
        let mut state = state.lock().expect("quest state lock poisoned");

        let Some(instance) = state.active.get(&instance_id) else {
            return Err(FarmError::QuestNotFound(instance_id.to_string()));
        };
        if instance.category == QuestCategory::Story {
            return Err(FarmError::NotAbandonable(instance.name.clone()));
        }

        let mut instance = state
            .active
            .remove(&instance_id)
            .expect("instance checked above");
        let progress = instance.progress();
        instance.status = QuestStatus::Abandoned { abandoned_at: now };
        debug!(
            "{} abandoned quest '{}' at {:.0}%",
            player,
            instance.name,
            progress * 100.0
        );
        state.history.push(QuestHistoryEntry {
            instance_id,
            template_id: instance.template_id,
            outcome: QuestOutcome::Abandoned,
            progress,
            recorded_at: now,
        });
        Ok(())
    }

    /// Fail every active instance whose deadline has passed. One player's
    /// issue never aborts the sweep for the rest.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut failed = 0usize;
        for player in self.tracked_players() {
            let state = self.state(player);
            let mut state = state.lock().expect("quest state lock poisoned");

            let expired: Vec<Uuid> = state
                .active
                .values()
                .filter(|q| q.is_expired(now))
                .map(|q| q.instance_id)
                .collect();
            for instance_id in expired {
                let Some(mut instance) = state.active.remove(&instance_id) else {
                    continue;
                };
                let progress = instance.progress();
                instance.status = QuestStatus::Failed {
                    failed_at: now,
                    reason: "expired".to_string(),
                };
                warn!(
                    "{} quest '{}' expired at {:.0}%",
                    player,
                    instance.name,
                    progress * 100.0
                );
                state.history.push(QuestHistoryEntry {
                    instance_id,
                    template_id: instance.template_id.clone(),
                    outcome: QuestOutcome::Expired,
                    progress,
                    recorded_at: now,
                });
                self.notifier.notify(
                    player,
                    Notification::new(
                        "Quest Expired",
                        &format!("{} ran out of time", instance.name),
                        NotificationCategory::Quest,
                    ),
                );
                failed += 1;
            }
        }
        failed
    }

    /// Destructively replace one player's active quests of a cadence with a
    /// fresh catalog-derived set, stamping the player's reset watermark.
    pub fn reassign_category(
        &self,
        player: PlayerId,
        category: QuestCategory,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let state = self.state(player);
        let mut state = state.lock().expect("quest state lock poisoned");

        let before = state.active.len();
        state.active.retain(|_, q| q.category != category);
        let cleared = before - state.active.len();
        if cleared > 0 {
            debug!("{}: cleared {} {:?} quests for reset", player, cleared, category);
        }

        let mut rng = rand::thread_rng();
        for template in self.catalog.templates_for(category) {
            match self.catalog.create_instance(&template.id, now, &mut rng) {
                Ok(instance) => {
                    state.active.insert(instance.instance_id, instance);
                }
                Err(err) => warn!("reset reassignment of '{}' failed: {}", template.id, err),
            }
        }
        match category {
            QuestCategory::Daily => state.last_daily_reset = watermark,
            QuestCategory::Weekly => state.last_weekly_reset = watermark,
            QuestCategory::Story => {}
        }
    }

    /// Auto-assign story templates the player qualifies for: not already
    /// held or completed, prerequisite (if any) completed.
    fn assign_eligible_story_quests(&self, state: &mut PlayerQuestState, now: DateTime<Utc>) {
        let completed = state.completed_template_ids();
        let mut rng = rand::thread_rng();
        // A single pass suffices: newly assigned instances start Active, so
        // the completed set cannot grow mid-assignment. Several dependents of
        // the same finished prerequisite all unlock together.
        for template in self.catalog.templates_for(QuestCategory::Story) {
            if completed.contains(&template.id) || state.holds_template(&template.id) {
                continue;
            }
            if let Some(prereq) = &template.prerequisite {
                if !completed.contains(prereq) {
                    continue;
                }
            }
            match self.catalog.create_instance(&template.id, now, &mut rng) {
                Ok(instance) => {
                    info!("{}: story quest '{}' unlocked", state.player, instance.name);
                    state.active.insert(instance.instance_id, instance);
                }
                Err(err) => warn!("story assignment of '{}' failed: {}", template.id, err),
            }
        }
    }

    /// Quests currently in flight for a player.
    pub fn active_quests(&self, player: PlayerId) -> Vec<QuestInstance> {
        let state = self.state(player);
        let state = state.lock().expect("quest state lock poisoned");
        state.active.values().cloned().collect()
    }

    pub fn completed_quests(&self, player: PlayerId) -> Vec<QuestInstance> {
        let state = self.state(player);
        let state = state.lock().expect("quest state lock poisoned");
        state.completed.values().cloned().collect()
    }

    pub fn history(&self, player: PlayerId) -> Vec<QuestHistoryEntry> {
        let state = self.state(player);
        let state = state.lock().expect("quest state lock poisoned");
        state.history.clone()
    }

    /// Serializable copy of one player's quest state, if tracked.
    pub fn snapshot(&self, player: PlayerId) -> Option<PlayerQuestState> {
        let players = self.players.read().expect("quest map lock poisoned");
        players
            .get(&player)
            .map(|s| s.lock().expect("quest state lock poisoned").clone())
    }

    /// Install a previously persisted quest state.
    pub fn restore(&self, snapshot: PlayerQuestState) {
        let mut players = self.players.write().expect("quest map lock poisoned");
        players.insert(snapshot.player, Arc::new(Mutex::new(snapshot)));
    }

    /// Drop in-memory state for a player, returning the final snapshot.
    pub fn evict(&self, player: PlayerId) -> Option<PlayerQuestState> {
        let mut players = self.players.write().expect("quest map lock poisoned");
        players
            .remove(&player)
            .map(|s| s.lock().expect("quest state lock poisoned").clone())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use uuid::Uuid;

pub const WALLET_SCHEMA_VERSION: u8 = 1;
pub const QUEST_STATE_SCHEMA_VERSION: u8 = 1;

/// Default cap on retained ledger entries per player; oldest evicted first.
pub const TRANSACTION_HISTORY_LIMIT: usize = 100;

/// Stable numeric identity of a player session, assigned by the platform.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

// ============================================================================
// Currency Ledger
// ============================================================================

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Normal earning path, subject to the hourly cap.
    Earn,
    /// Debit for a purchase or fee.
    Spend,
    /// Administrative balance overwrite.
    Set,
    /// Cap-bypassing grant (rewards, admin tooling).
    AdminAdd,
}

/// One audit entry in a player's bounded transaction history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub kind: TransactionKind,
    /// Signed delta applied to the balance.
    pub amount: i64,
    /// Free-text category, e.g. "harvest_sale", "auto_sell", "shop_purchase".
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    /// Balance immediately after this entry applied.
    pub balance_after: u64,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: i64, reason: &str, balance_after: u64) -> Self {
        Self {
            kind,
            amount,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            balance_after,
        }
    }
}

/// In-memory wallet for one tracked player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerWallet {
    pub player: PlayerId,
    /// Non-negative by construction; all debits are checked first.
    pub coins: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ring buffer of recent transactions, newest last.
    pub history: VecDeque<Transaction>,
    /// Coins accepted by the earn path in the current hourly window.
    /// Authoritative in the throttle while the wallet is live; synced into
    /// the record whenever a snapshot is taken so rejoining cannot reopen
    /// the window.
    #[serde(default)]
    pub hourly_earned: u64,
    pub schema_version: u8,
}

impl PlayerWallet {
    pub fn new(player: PlayerId, starting_balance: u64) -> Self {
        let now = Utc::now();
        Self {
            player,
            coins: starting_balance,
            created_at: now,
            updated_at: now,
            history: VecDeque::new(),
            hourly_earned: 0,
            schema_version: WALLET_SCHEMA_VERSION,
        }
    }

    /// Append a transaction, evicting the oldest entry past `limit`.
    pub fn record(&mut self, tx: Transaction, limit: usize) {
        self.history.push_back(tx);
        while self.history.len() > limit {
            self.history.pop_front();
        }
        self.updated_at = Utc::now();
    }
}

/// Serializable wallet snapshot handed to the persistence collaborator.
pub type WalletSnapshot = PlayerWallet;

// ============================================================================
// Auto-Sell Queue
// ============================================================================

/// One harvested item waiting for automatic conversion to coins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoSellEntry {
    /// Plot the harvest came from.
    pub plot_id: u64,
    /// Item catalog id, e.g. "carrot", "golden_pumpkin".
    pub item_id: String,
    pub enqueued_at: DateTime<Utc>,
}

impl AutoSellEntry {
    pub fn new(plot_id: u64, item_id: &str) -> Self {
        Self {
            plot_id,
            item_id: item_id.to_string(),
            enqueued_at: Utc::now(),
        }
    }
}

// ============================================================================
// Game Actions
// ============================================================================

/// Gameplay events reported into the progression engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PlantSeed,
    HarvestCrop,
    EarnCoins,
    SpendCoins,
    VisitFarm,
    LevelUp,
    SocialInteract,
    CollectItem,
}

/// A single reported gameplay event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameAction {
    pub kind: ActionKind,
    /// Contribution size; 1 for simple events, the coin amount for earn/spend.
    pub amount: u64,
    /// Distinct-contribution key for unique-tracking objectives
    /// (e.g. the seed type planted, the farm visited).
    pub unique_key: Option<String>,
}

impl GameAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            amount: 1,
            unique_key: None,
        }
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_unique_key(mut self, key: &str) -> Self {
        self.unique_key = Some(key.to_string());
        self
    }
}

// ============================================================================
// Quest Templates
// ============================================================================

/// Cadence and lifecycle class of a quest template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestCategory {
    Daily,
    Weekly,
    Story,
}

/// Rarity tier; scales coin/xp rewards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
}

impl QuestRarity {
    /// Reward multiplier applied (floored) to coin and xp rewards.
    pub fn reward_multiplier(&self) -> f64 {
        match self {
            QuestRarity::Common => 1.0,
            QuestRarity::Uncommon => 1.25,
            QuestRarity::Rare => 1.5,
            QuestRarity::Epic => 2.0,
        }
    }
}

/// Measurable objective classes a quest can track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    Plant,
    Harvest,
    EarnCoins,
    SpendCoins,
    Visit,
    ReachLevel,
    Social,
    Collect,
}

/// Total mapping from reported actions to the objective class they advance.
/// Every action kind must map somewhere; adding a variant without updating
/// this match is a compile error, not a silent no-op.
pub fn objective_kind_for(action: ActionKind) -> ObjectiveKind {
    match action {
        ActionKind::PlantSeed => ObjectiveKind::Plant,
        ActionKind::HarvestCrop => ObjectiveKind::Harvest,
        ActionKind::EarnCoins => ObjectiveKind::EarnCoins,
        ActionKind::SpendCoins => ObjectiveKind::SpendCoins,
        ActionKind::VisitFarm => ObjectiveKind::Visit,
        ActionKind::LevelUp => ObjectiveKind::ReachLevel,
        ActionKind::SocialInteract => ObjectiveKind::Social,
        ActionKind::CollectItem => ObjectiveKind::Collect,
    }
}

/// Immutable objective description inside a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectiveSpec {
    pub description: String,
    pub kind: ObjectiveKind,
    pub target: u64,
    /// Count distinct contributed keys instead of raw increments.
    #[serde(default)]
    pub track_unique: bool,
}

impl ObjectiveSpec {
    pub fn new(description: &str, kind: ObjectiveKind, target: u64) -> Self {
        Self {
            description: description.to_string(),
            kind,
            target: target.max(1),
            track_unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.track_unique = true;
        self
    }
}

/// Rewards granted on quest completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RewardBundle {
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub experience: u64,
    /// (item id, quantity) pairs.
    #[serde(default)]
    pub items: Vec<(String, u32)>,
}

impl RewardBundle {
    pub fn is_empty(&self) -> bool {
        self.coins == 0 && self.experience == 0 && self.items.is_empty()
    }
}

/// Immutable quest template registered in the catalog. Instances are deep
/// copies; no mutable structure is shared between template and instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    pub id: String,
    pub name: String,
    /// May contain a `{target}` placeholder resolved at instantiation.
    pub description: String,
    pub category: QuestCategory,
    pub rarity: QuestRarity,
    pub objectives: Vec<ObjectiveSpec>,
    pub rewards: RewardBundle,
    /// Seconds until an instance expires; None = no expiry.
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
    /// Story-chain gate: template that must be completed first.
    #[serde(default)]
    pub prerequisite: Option<String>,
}

impl QuestTemplate {
    pub fn new(id: &str, name: &str, description: &str, category: QuestCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category,
            rarity: QuestRarity::Common,
            objectives: Vec::new(),
            rewards: RewardBundle::default(),
            time_limit_secs: None,
            prerequisite: None,
        }
    }

    pub fn with_rarity(mut self, rarity: QuestRarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveSpec) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_reward_coins(mut self, coins: u64) -> Self {
        self.rewards.coins = coins;
        self
    }

    pub fn with_reward_experience(mut self, experience: u64) -> Self {
        self.rewards.experience = experience;
        self
    }

    pub fn with_reward_item(mut self, item_id: &str, quantity: u32) -> Self {
        self.rewards.items.push((item_id.to_string(), quantity));
        self
    }

    pub fn with_time_limit_secs(mut self, secs: i64) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    pub fn with_prerequisite(mut self, template_id: &str) -> Self {
        self.prerequisite = Some(template_id.to_string());
        self
    }
}

// ============================================================================
// Quest Instances
// ============================================================================

/// Terminal outcome recorded in a player's quest history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestOutcome {
    Completed,
    Expired,
    Abandoned,
}

/// Lifecycle state of a quest instance. Terminal states are final.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed { completed_at: DateTime<Utc> },
    Failed { failed_at: DateTime<Utc>, reason: String },
    Abandoned { abandoned_at: DateTime<Utc> },
}

impl QuestStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, QuestStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// Mutable per-instance copy of one objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectiveProgress {
    pub description: String,
    pub kind: ObjectiveKind,
    /// Resolved target (after any instantiation variance), never below 1.
    pub target: u64,
    pub current: u64,
    pub track_unique: bool,
    /// Distinct contribution keys; `current` mirrors its cardinality when
    /// `track_unique` is set.
    #[serde(default)]
    pub contributed_keys: HashSet<String>,
}

impl ObjectiveProgress {
    pub fn from_spec(spec: &ObjectiveSpec, resolved_target: u64) -> Self {
        Self {
            description: spec.description.clone(),
            kind: spec.kind,
            target: resolved_target.max(1),
            current: 0,
            track_unique: spec.track_unique,
            contributed_keys: HashSet::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.target
    }

    /// Advance this objective from a matching action. Unique-tracking
    /// objectives count distinct keys; everything else sums amounts.
    /// `current` is clamped to `target` in both modes.
    pub fn apply(&mut self, amount: u64, unique_key: Option<&str>) {
        if self.track_unique {
            let key = unique_key.unwrap_or("_anonymous");
            self.contributed_keys.insert(key.to_string());
            self.current = (self.contributed_keys.len() as u64).min(self.target);
        } else {
            self.current = self.current.saturating_add(amount).min(self.target);
        }
    }
}

/// A concrete, player-owned quest generated from a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestInstance {
    pub instance_id: Uuid,
    pub template_id: String,
    pub name: String,
    /// Description with placeholders already resolved.
    pub description: String,
    pub category: QuestCategory,
    pub rarity: QuestRarity,
    pub objectives: Vec<ObjectiveProgress>,
    /// Rewards with the rarity multiplier already folded in.
    pub rewards: RewardBundle,
    pub status: QuestStatus,
    pub started_at: DateTime<Utc>,
    /// Wall-clock expiry; None = never expires.
    pub ends_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    /// Fraction of total objective progress in [0, 1].
    pub fn progress(&self) -> f64 {
        let total: u64 = self.objectives.iter().map(|o| o.target).sum();
        if total == 0 {
            return 0.0;
        }
        let current: u64 = self.objectives.iter().map(|o| o.current).sum();
        (current as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn all_objectives_complete(&self) -> bool {
        !self.objectives.is_empty() && self.objectives.iter().all(|o| o.is_complete())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ends_at, Some(ends) if ends <= now)
    }
}

/// Terminal event appended to a player's quest history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestHistoryEntry {
    pub instance_id: Uuid,
    pub template_id: String,
    pub outcome: QuestOutcome,
    /// Progress at the moment the instance went terminal.
    pub progress: f64,
    pub recorded_at: DateTime<Utc>,
}

/// All quest state tracked for one player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerQuestState {
    pub player: PlayerId,
    pub active: HashMap<Uuid, QuestInstance>,
    pub completed: HashMap<Uuid, QuestInstance>,
    pub history: Vec<QuestHistoryEntry>,
    /// Copies of the global watermarks at last reassignment; when these fall
    /// behind the global values the player is due a fresh quest set.
    pub last_daily_reset: DateTime<Utc>,
    pub last_weekly_reset: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerQuestState {
    pub fn new(player: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            player,
            active: HashMap::new(),
            completed: HashMap::new(),
            history: Vec::new(),
            last_daily_reset: now,
            last_weekly_reset: now,
            schema_version: QUEST_STATE_SCHEMA_VERSION,
        }
    }

    /// Template ids of everything the player has ever completed.
    pub fn completed_template_ids(&self) -> HashSet<String> {
        let mut ids: HashSet<String> = self
            .completed
            .values()
            .map(|q| q.template_id.clone())
            .collect();
        for entry in &self.history {
            if entry.outcome == QuestOutcome::Completed {
                ids.insert(entry.template_id.clone());
            }
        }
        ids
    }

    /// Whether any active instance derives from the given template.
    pub fn holds_template(&self, template_id: &str) -> bool {
        self.active.values().any(|q| q.template_id == template_id)
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Category hint for client-side notification routing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Economy,
    Quest,
    System,
}

/// Fire-and-forget toast pushed to a player's client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Icon asset id; empty for the client default.
    pub icon: String,
    pub category: NotificationCategory,
}

impl Notification {
    pub fn new(title: &str, body: &str, category: NotificationCategory) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: String::new(),
            category,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }
}

use thiserror::Error;

/// Errors that can arise in the economy and quest engine.
#[derive(Debug, Error)]
pub enum FarmError {
    /// Amount passed to a ledger mutation was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Player balance is too small to cover a debit.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Hourly anti-cheat earnings cap would be exceeded by this grant.
    #[error("earnings cap exceeded: {requested} over remaining headroom {remaining}")]
    EarningsCapExceeded { requested: u64, remaining: u64 },

    /// Quest template id is not present in the catalog.
    #[error("unknown quest template: {0}")]
    UnknownTemplate(String),

    /// Story quests cannot be abandoned.
    #[error("quest not abandonable: {0}")]
    NotAbandonable(String),

    /// Referenced quest instance does not exist for this player.
    #[error("quest not found: {0}")]
    QuestNotFound(String),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Internal error (task join errors, unexpected conditions).
    #[error("internal error: {0}")]
    Internal(String),
}

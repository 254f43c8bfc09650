use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{GameId, LegId, WagerId};

/// Errors surfaced by a [`crate::store::Store`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("failed to persist ledger: {0}")]
    Persist(String),
}

impl StoreError {
    pub fn is_not_found(&self, kind: &str) -> bool {
        matches!(self, StoreError::NotFound { kind: k, .. } if *k == kind)
    }
}

/// Fatal, per-wager failures of the payout calculation.
///
/// A pending leg is not an error; it yields a `None` payout instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("leg {leg_id} of wager {wager_id} cannot be evaluated (missing game or unknown pick)")]
    InvalidLeg { wager_id: WagerId, leg_id: LegId },

    #[error("no multiplier configured for a {arity}-leg wager with {wins} win(s)")]
    UnmappedOutcomes { arity: usize, wins: usize },

    #[error("payout of wager {wager_id} is out of range")]
    PayoutOverflow { wager_id: WagerId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validation failures raised while creating or editing ledger entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("player name {0:?} is already taken")]
    DuplicatePlayer(String),

    #[error("no player named {0:?}")]
    UnknownPlayer(String),

    #[error("team names must not be empty")]
    EmptyTeamName,

    #[error("favorite {favorite:?} matches neither {team_a:?} nor {team_b:?}")]
    InvalidFavorite {
        favorite: String,
        team_a: String,
        team_b: String,
    },

    #[error("spread must be non-negative, got {0}")]
    NegativeSpread(Decimal),

    #[error("{field} takes at most one decimal place, got {value}")]
    TooPrecise { field: &'static str, value: Decimal },

    #[error("{team_a} vs {team_b} on {date} is already in the ledger")]
    DuplicateGame {
        team_a: String,
        team_b: String,
        date: chrono::NaiveDate,
    },

    #[error("team {team:?} is not playing in game {game_id}")]
    TeamNotInGame { team: String, game_id: GameId },

    #[error("a wager takes between 1 and {max} legs, got {got}")]
    LegCount { got: usize, max: usize },

    #[error("leg {0} is used more than once in the same wager")]
    DuplicateLeg(LegId),

    #[error("stake must be between 0.01 and 99999999.99 in whole cents, got {0}")]
    InvalidStake(Decimal),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

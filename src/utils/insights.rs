use crate::error::StoreError;
use crate::models::{Wager, WagerKind};
use crate::store::Store;
use rust_decimal::Decimal;
use serde::Serialize;

/// Counts and money per wager kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub count: usize,
    pub total_stake: Decimal,
    pub total_payout: Decimal,
}

impl KindSummary {
    fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            count: 0,
            total_stake: Decimal::new(0, 2),
            total_payout: Decimal::new(0, 2),
        }
    }

    fn add(&mut self, wager: &Wager) {
        self.count += 1;
        self.total_stake += wager.stake;
        self.total_payout += wager.payout.unwrap_or_default();
    }

    pub fn format(&self) -> String {
        format!(
            "{:<14} {:>5} bets | staked {:>10.2} | payout {:>10.2}",
            self.kind, self.count, self.total_stake, self.total_payout
        )
    }
}

/// Per-kind totals from persisted payouts, followed by an "All Bet Types" row
///
/// Reads the stored payouts as they are; run a settlement pass first for
/// current numbers. Wagers with an unsupported leg count only appear in the
/// combined row.
pub fn summarize<S: Store>(store: &S) -> Result<Vec<KindSummary>, StoreError> {
    let mut rows: Vec<KindSummary> = WagerKind::ALL
        .iter()
        .map(|kind| KindSummary::new(kind.to_string()))
        .collect();
    let mut all = KindSummary::new("All Bet Types");

    for wager in store.all::<Wager>()? {
        if let Some(kind) = wager.kind() {
            rows[kind.arity() - 1].add(&wager);
        }
        all.add(&wager);
    }

    rows.push(all);
    Ok(rows)
}

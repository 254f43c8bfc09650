use crate::error::SettlementError;
use crate::models::{Wager, WagerId};
use crate::store::Store;
use crate::utils::payout::{calculate_payout, PayoutTable};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Result of one settlement pass over every wager
#[derive(Debug, Clone, Default)]
pub struct SettlementReport {
    pub settled: Vec<(WagerId, Decimal)>,
    pub pending: Vec<WagerId>,
    pub failed: Vec<(WagerId, SettlementError)>,
}

/// One line of a settlement report, as exported to CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementRow {
    pub wager_id: WagerId,
    pub status: String,
    pub payout: Option<Decimal>,
}

impl SettlementReport {
    pub fn total(&self) -> usize {
        self.settled.len() + self.pending.len() + self.failed.len()
    }

    pub fn format(&self) -> String {
        format!(
            "{} wagers | settled: {} | pending: {} | failed: {}",
            self.total(),
            self.settled.len(),
            self.pending.len(),
            self.failed.len()
        )
    }

    /// Rows in wager id order. Failures are labelled so they cannot be
    /// mistaken for pending wagers.
    pub fn rows(&self) -> Vec<SettlementRow> {
        let mut rows: Vec<SettlementRow> = self
            .settled
            .iter()
            .map(|(id, payout)| SettlementRow {
                wager_id: *id,
                status: "settled".to_string(),
                payout: Some(*payout),
            })
            .chain(self.pending.iter().map(|id| SettlementRow {
                wager_id: *id,
                status: "pending".to_string(),
                payout: None,
            }))
            .chain(self.failed.iter().map(|(id, err)| SettlementRow {
                wager_id: *id,
                status: format!("error: {}", err),
                payout: None,
            }))
            .collect();
        rows.sort_by_key(|row| row.wager_id);
        rows
    }
}

/// Recompute and persist the payout of every wager
///
/// Wagers are independent: a wager that fails to settle is logged and
/// recorded in the report, and the pass carries on. Wagers deleted while the
/// pass runs are skipped.
pub fn settle_all<S: Store>(
    store: &mut S,
    table: &PayoutTable,
) -> Result<SettlementReport, SettlementError> {
    let ids: Vec<WagerId> = store.all::<Wager>()?.iter().map(|w| w.id).collect();
    let mut report = SettlementReport::default();

    for id in ids {
        let mut wager: Wager = match store.get(id) {
            Ok(wager) => wager,
            Err(e) if e.is_not_found("wager") => continue,
            Err(e) => {
                warn!(wager_id = id, error = %e, "failed to load wager");
                report.failed.push((id, e.into()));
                continue;
            }
        };

        match calculate_payout(store, table, &mut wager) {
            Ok(Some(payout)) => report.settled.push((id, payout)),
            Ok(None) => report.pending.push(id),
            Err(SettlementError::Store(e)) if e.is_not_found("wager") => continue,
            Err(e) => {
                warn!(wager_id = id, error = %e, "failed to settle wager");
                report.failed.push((id, e));
            }
        }
    }

    info!(
        settled = report.settled.len(),
        pending = report.pending.len(),
        failed = report.failed.len(),
        "settlement pass complete"
    );
    Ok(report)
}

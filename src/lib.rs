pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;
pub mod utils;

pub use api::*;
pub use config::Config;
pub use error::{ConfigError, LedgerError, SettlementError, StoreError};
pub use ledger::{Ledger, NewGame};
pub use models::*;
pub use store::{MemoryStore, Store};
pub use utils::*;

use anyhow::{Context, Result};
use utils::sync::{apply_feed, unfinished_dates, SyncSummary};

/// Pull results for every date with unfinished games in a league and apply
/// them to the ledger
pub async fn sync_league<S: Store>(
    config: &Config,
    store: &mut S,
    league: League,
) -> Result<SyncSummary> {
    let client = ScoreFeedClient::new(
        config.scores_api_host.clone(),
        config.scores_api_key()?.to_string(),
    );

    let mut summary = SyncSummary::default();
    for date in unfinished_dates(store, league)? {
        let feed_games = client
            .fetch_games_by_date(league, date)
            .await
            .with_context(|| format!("Failed to fetch {} games for {}", league, date))?;

        let applied = apply_feed(store, &feed_games, &config.finished_statuses)?;
        summary.updated += applied.updated;
        summary.finished += applied.finished;
    }

    Ok(summary)
}

use crate::api::FeedGame;
use crate::error::StoreError;
use crate::models::{Game, League, Side};
use crate::store::Store;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub updated: usize,
    pub finished: usize,
}

/// Whether a feed status string means the game is over
pub fn is_finished_status(finished_statuses: &[String], status: &str) -> bool {
    finished_statuses.iter().any(|s| s == status)
}

/// Find the feed game for a stored game, in either team order. The returned
/// side says which stored team the feed lists as its team A.
fn match_feed<'a>(game: &Game, feed: &'a [FeedGame]) -> Option<(&'a FeedGame, Side)> {
    feed.iter().find_map(|f| {
        if f.date != game.game_date {
            None
        } else if f.team_a == game.team_a && f.team_b == game.team_b {
            Some((f, Side::TeamA))
        } else if f.team_a == game.team_b && f.team_b == game.team_a {
            Some((f, Side::TeamB))
        } else {
            None
        }
    })
}

/// Copy scores and finished status from the feed onto unfinished stored games
///
/// Null feed scores leave the stored score alone. Games already marked
/// finished are never touched; corrections to those go through manual edits.
pub fn apply_feed<S: Store>(
    store: &mut S,
    feed: &[FeedGame],
    finished_statuses: &[String],
) -> Result<SyncSummary, StoreError> {
    let mut summary = SyncSummary::default();

    for mut game in store.find(|g: &Game| !g.is_finished)? {
        let Some((feed_game, feed_a_side)) = match_feed(&game, feed) else {
            continue;
        };

        let mut changed = false;
        for (side, score) in [
            (feed_a_side, feed_game.score_a),
            (feed_a_side.other(), feed_game.score_b),
        ] {
            if score.is_some() && game.score(side) != score {
                game.set_score(side, score);
                changed = true;
            }
        }

        if is_finished_status(finished_statuses, &feed_game.status) {
            game.is_finished = true;
            summary.finished += 1;
            changed = true;
        }

        if changed {
            store.save(&game)?;
            summary.updated += 1;
            debug!(game = %game, status = %feed_game.status, "game updated from feed");
        }
    }

    info!(
        updated = summary.updated,
        finished = summary.finished,
        "applied score feed"
    );
    Ok(summary)
}

/// Pair each feed game with whether the ledger already tracks it
pub fn mark_tracked<'a, S: Store>(
    store: &S,
    feed: &'a [FeedGame],
) -> Result<Vec<(&'a FeedGame, bool)>, StoreError> {
    let games: Vec<Game> = store.all()?;
    Ok(feed
        .iter()
        .map(|f| {
            let tracked = games
                .iter()
                .any(|g| g.same_matchup(&f.team_a, &f.team_b, f.date));
            (f, tracked)
        })
        .collect())
}

/// Distinct dates with unfinished games in a league
pub fn unfinished_dates<S: Store>(
    store: &S,
    league: League,
) -> Result<BTreeSet<NaiveDate>, StoreError> {
    Ok(store
        .find(|g: &Game| !g.is_finished && g.league == league)?
        .into_iter()
        .map(|g| g.game_date)
        .collect())
}

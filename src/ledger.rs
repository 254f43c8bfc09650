use crate::api::FeedGame;
use crate::error::{LedgerError, SettlementError};
use crate::models::{
    same_team, Game, GameId, League, Leg, LegId, Pick, Player, PlayerId, Side, Wager, WagerId,
    WagerKind,
};
use crate::store::Store;
use crate::utils::payout::PayoutTable;
use crate::utils::settlement::{settle_all, SettlementReport};
use crate::utils::sync::is_finished_status;
use crate::utils::totals::{total_paid_out, total_staked};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Largest stake a single wager may carry
pub const MAX_STAKE: Decimal = dec!(99999999.99);

/// Fields needed to add a game by hand
#[derive(Debug, Clone)]
pub struct NewGame {
    pub team_a: String,
    pub team_b: String,
    pub league: League,
    pub game_date: NaiveDate,
    /// Must name one of the two teams, case-insensitively
    pub favorite: String,
    pub favorite_spread: Decimal,
    pub over_under_line: Decimal,
}

/// Validated entry points for editing the ledger and settling wagers
pub struct Ledger<S: Store> {
    store: S,
    table: PayoutTable,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_table(store, PayoutTable::standard())
    }

    pub fn with_table(store: S, table: PayoutTable) -> Self {
        Self { store, table }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn table(&self) -> &PayoutTable {
        &self.table
    }

    pub fn add_player(&mut self, name: &str) -> Result<Player, LedgerError> {
        let name = name.trim();
        if !self.store.find(|p: &Player| p.name == name)?.is_empty() {
            return Err(LedgerError::DuplicatePlayer(name.to_string()));
        }
        Ok(self.store.insert(Player::new(name))?)
    }

    pub fn rename_player(&mut self, id: PlayerId, name: &str) -> Result<Player, LedgerError> {
        let name = name.trim();
        if !self
            .store
            .find(|p: &Player| p.name == name && p.id != id)?
            .is_empty()
        {
            return Err(LedgerError::DuplicatePlayer(name.to_string()));
        }
        let mut player: Player = self.store.get(id)?;
        player.name = name.to_string();
        self.store.save(&player)?;
        Ok(player)
    }

    pub fn player_by_name(&self, name: &str) -> Result<Player, LedgerError> {
        self.store
            .find(|p: &Player| p.name == name)?
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::UnknownPlayer(name.to_string()))
    }

    /// Delete a player together with every wager they own
    pub fn delete_player(&mut self, id: PlayerId) -> Result<(), LedgerError> {
        self.store.get::<Player>(id)?;
        for wager in self.store.find(|w: &Wager| w.player_id == id)? {
            self.store.delete::<Wager>(wager.id)?;
        }
        self.store.delete::<Player>(id)?;
        Ok(())
    }

    pub fn add_game(&mut self, new: NewGame) -> Result<Game, LedgerError> {
        let team_a = new.team_a.trim();
        let team_b = new.team_b.trim();
        if team_a.is_empty() || team_b.is_empty() {
            return Err(LedgerError::EmptyTeamName);
        }
        if new.favorite_spread.is_sign_negative() {
            return Err(LedgerError::NegativeSpread(new.favorite_spread));
        }
        for (field, value) in [
            ("spread", new.favorite_spread),
            ("over/under line", new.over_under_line),
        ] {
            if value.normalize().scale() > 1 {
                return Err(LedgerError::TooPrecise { field, value });
            }
        }
        if !self
            .store
            .find(|g: &Game| g.same_matchup(team_a, team_b, new.game_date))?
            .is_empty()
        {
            return Err(LedgerError::DuplicateGame {
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
                date: new.game_date,
            });
        }

        let favorite = if same_team(&new.favorite, team_a) {
            Side::TeamA
        } else if same_team(&new.favorite, team_b) {
            Side::TeamB
        } else {
            return Err(LedgerError::InvalidFavorite {
                favorite: new.favorite,
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
            });
        };

        let game = Game::new(
            team_a,
            team_b,
            new.league,
            new.game_date,
            favorite,
            new.favorite_spread,
            new.over_under_line,
        );
        let game = self.store.insert(game)?;
        info!(game = %game, id = game.id, "game added");
        Ok(game)
    }

    /// Add a game reported by the score feed, with lines supplied by the user.
    /// Scores are copied and the game is marked finished when the feed status
    /// is one of `finished_statuses`.
    pub fn add_feed_game(
        &mut self,
        feed_game: &FeedGame,
        league: League,
        favorite: &str,
        favorite_spread: Decimal,
        over_under_line: Decimal,
        finished_statuses: &[String],
    ) -> Result<Game, LedgerError> {
        let mut game = self.add_game(NewGame {
            team_a: feed_game.team_a.clone(),
            team_b: feed_game.team_b.clone(),
            league,
            game_date: feed_game.date,
            favorite: favorite.to_string(),
            favorite_spread,
            over_under_line,
        })?;
        game.set_scores(feed_game.score_a, feed_game.score_b);
        game.is_finished = is_finished_status(finished_statuses, &feed_game.status);
        self.store.save(&game)?;
        Ok(game)
    }

    /// Set scores and finished flag. Stored payouts stay as they are until
    /// the next settlement pass.
    pub fn record_scores(
        &mut self,
        id: GameId,
        score_a: Option<Decimal>,
        score_b: Option<Decimal>,
        is_finished: bool,
    ) -> Result<Game, LedgerError> {
        let mut game: Game = self.store.get(id)?;
        game.set_scores(score_a, score_b);
        game.is_finished = is_finished;
        self.store.save(&game)?;
        Ok(game)
    }

    /// Delete a game, its legs, and every wager using one of those legs
    pub fn delete_game(&mut self, id: GameId) -> Result<(), LedgerError> {
        self.store.get::<Game>(id)?;
        let legs: HashSet<LegId> = self
            .store
            .find(|l: &Leg| l.game_id == id)?
            .into_iter()
            .map(|l| l.id)
            .collect();
        for wager in self
            .store
            .find(|w: &Wager| w.legs().iter().any(|l| legs.contains(l)))?
        {
            self.store.delete::<Wager>(wager.id)?;
        }
        for leg in &legs {
            self.store.delete::<Leg>(*leg)?;
        }
        self.store.delete::<Game>(id)?;
        Ok(())
    }

    pub fn add_leg(&mut self, game_id: GameId, pick: Pick) -> Result<Leg, LedgerError> {
        let game: Game = self.store.get(game_id)?;
        let pick = match pick {
            Pick::Winner { team } => match game.side_of(&team) {
                Some(side) => Pick::Winner {
                    team: game.team_name(side).to_string(),
                },
                None => return Err(LedgerError::TeamNotInGame { team, game_id }),
            },
            other => other,
        };
        Ok(self.store.insert(Leg::new(game_id, pick))?)
    }

    pub fn place_wager(
        &mut self,
        player_id: PlayerId,
        legs: &[LegId],
        stake: Decimal,
    ) -> Result<Wager, LedgerError> {
        let max = self.table.max_legs();
        if legs.is_empty() || legs.len() > max {
            return Err(LedgerError::LegCount {
                got: legs.len(),
                max,
            });
        }
        if stake <= Decimal::ZERO || stake > MAX_STAKE || stake.normalize().scale() > 2 {
            return Err(LedgerError::InvalidStake(stake));
        }

        let mut seen = HashSet::new();
        for leg in legs {
            if !seen.insert(*leg) {
                return Err(LedgerError::DuplicateLeg(*leg));
            }
            self.store.get::<Leg>(*leg)?;
        }
        self.store.get::<Player>(player_id)?;

        let mut stake = stake;
        stake.rescale(2);
        let wager = self.store.insert(Wager::new(player_id, legs.to_vec(), stake))?;
        info!(wager_id = wager.id, player_id, %stake, legs = legs.len(), "wager placed");
        Ok(wager)
    }

    pub fn delete_wager(&mut self, id: WagerId) -> Result<(), LedgerError> {
        Ok(self.store.delete::<Wager>(id)?)
    }

    pub fn wagers_for(&self, player_id: PlayerId) -> Result<Vec<Wager>, LedgerError> {
        Ok(self.store.find(|w: &Wager| w.player_id == player_id)?)
    }

    /// Number of wagers the player holds of each kind
    pub fn wager_counts(
        &self,
        player_id: PlayerId,
    ) -> Result<BTreeMap<WagerKind, usize>, LedgerError> {
        let mut counts: BTreeMap<WagerKind, usize> =
            WagerKind::ALL.iter().map(|k| (*k, 0)).collect();
        for wager in self.wagers_for(player_id)? {
            if let Some(kind) = wager.kind() {
                *counts.entry(kind).or_default() += 1;
            }
        }
        Ok(counts)
    }

    pub fn settle_all(&mut self) -> Result<SettlementReport, SettlementError> {
        settle_all(&mut self.store, &self.table)
    }

    /// Recompute and store a player's staked and paid-out totals
    pub fn refresh_totals(&mut self, player_id: PlayerId) -> Result<Player, SettlementError> {
        total_staked(&mut self.store, player_id)?;
        total_paid_out(&mut self.store, &self.table, player_id)?;
        Ok(self.store.get(player_id)?)
    }
}

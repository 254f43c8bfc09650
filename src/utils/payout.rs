use crate::error::SettlementError;
use crate::models::{Leg, Outcome, Wager};
use crate::store::Store;
use crate::utils::outcome::evaluate_leg;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

/// Multipliers for one wager arity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplierRule {
    /// Applied when any leg loses; includes the commission
    pub on_loss: Decimal,
    /// Indexed by number of winning legs, every other leg being a tie
    pub by_wins: Vec<Decimal>,
}

/// Payout multipliers keyed by number of legs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutTable {
    rules: BTreeMap<usize, MultiplierRule>,
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PayoutTable {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Straight, action, parlay 3 and parlay 4 multipliers
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(
                1,
                MultiplierRule {
                    on_loss: dec!(-1.05),
                    by_wins: vec![dec!(0), dec!(1)],
                },
            )
            .with_rule(
                2,
                MultiplierRule {
                    on_loss: dec!(-1.10),
                    by_wins: vec![dec!(0), dec!(2), dec!(4)],
                },
            )
            .with_rule(
                3,
                MultiplierRule {
                    on_loss: dec!(-1.00),
                    by_wins: vec![dec!(0), dec!(1), dec!(4), dec!(6)],
                },
            )
            .with_rule(
                4,
                MultiplierRule {
                    on_loss: dec!(-1.00),
                    by_wins: vec![dec!(0), dec!(1), dec!(4), dec!(6), dec!(10)],
                },
            )
    }

    pub fn with_rule(mut self, arity: usize, rule: MultiplierRule) -> Self {
        self.rules.insert(arity, rule);
        self
    }

    pub fn rule(&self, arity: usize) -> Option<&MultiplierRule> {
        self.rules.get(&arity)
    }

    /// Largest number of legs a wager may have
    pub fn max_legs(&self) -> usize {
        self.rules.keys().next_back().copied().unwrap_or(0)
    }

    /// Multiplier for a set of settled leg outcomes
    ///
    /// A loss anywhere takes precedence; otherwise every leg must be a win or a
    /// tie and the multiplier is looked up by win count. Returns `None` when the
    /// combination is not covered. Pending legs must be filtered out by the
    /// caller before reaching this point.
    pub fn multiplier(&self, outcomes: &[Outcome]) -> Option<Decimal> {
        let rule = self.rule(outcomes.len())?;

        if outcomes.contains(&Outcome::Loss) {
            return Some(rule.on_loss);
        }

        if !outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Win | Outcome::Tie))
        {
            return None;
        }

        let wins = outcomes.iter().filter(|o| **o == Outcome::Win).count();
        rule.by_wins.get(wins).copied()
    }
}

/// Round money to the cent, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Recompute and persist the payout of a compound wager
///
/// Every leg is evaluated fresh. If any leg is pending the stored payout is
/// cleared and `Ok(None)` is returned. Combinations without a multiplier are
/// reported as errors and leave the stored payout untouched.
pub fn calculate_payout<S: Store>(
    store: &mut S,
    table: &PayoutTable,
    wager: &mut Wager,
) -> Result<Option<Decimal>, SettlementError> {
    let mut outcomes = Vec::with_capacity(wager.arity());
    for leg_id in wager.legs() {
        let leg: Leg = store.get(*leg_id)?;
        outcomes.push(evaluate_leg(store, &leg)?);
    }

    if outcomes.contains(&Outcome::Pending) {
        wager.payout = None;
        store.save(&*wager)?;
        debug!(wager_id = wager.id, "wager pending");
        return Ok(None);
    }

    let multiplier = match table.multiplier(&outcomes) {
        Some(multiplier) => multiplier,
        None => return Err(unmapped(wager, &outcomes)),
    };

    let payout = wager
        .stake
        .checked_mul(multiplier)
        .map(round_money)
        .ok_or(SettlementError::PayoutOverflow { wager_id: wager.id })?;
    wager.payout = Some(payout);
    store.save(&*wager)?;
    debug!(wager_id = wager.id, %multiplier, %payout, "wager settled");

    Ok(Some(payout))
}

fn unmapped(wager: &Wager, outcomes: &[Outcome]) -> SettlementError {
    if let Some(index) = outcomes.iter().position(|o| *o == Outcome::Invalid) {
        return SettlementError::InvalidLeg {
            wager_id: wager.id,
            leg_id: wager.legs()[index],
        };
    }
    SettlementError::UnmappedOutcomes {
        arity: outcomes.len(),
        wins: outcomes.iter().filter(|o| **o == Outcome::Win).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, League, Pick, Side};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use Outcome::{Invalid, Loss, Tie, Win};

    /// Decided, pushed and unfinished games with legs covering every outcome
    struct Fixture {
        store: MemoryStore,
        pending_game: Game,
        win: u64,
        win2: u64,
        win3: u64,
        win4: u64,
        tie: u64,
        tie2: u64,
        tie3: u64,
        tie4: u64,
        loss: u64,
        pending: u64,
        invalid: u64,
    }

    fn fixture() -> Fixture {
        let mut store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();

        // Eagles favored by 3, win 27-20: Eagles cover, total 47 over 45.5
        let mut decided = Game::new(
            "Philadelphia Eagles",
            "Baltimore Ravens",
            League::Nfl,
            date,
            Side::TeamA,
            dec!(3.0),
            dec!(45.5),
        );
        decided.set_scores(Some(dec!(27)), Some(dec!(20)));
        decided.is_finished = true;
        let decided = store.insert(decided).unwrap();

        // Spread and total both push
        let mut push = Game::new(
            "Dallas Cowboys",
            "New York Giants",
            League::Nfl,
            date,
            Side::TeamA,
            dec!(7.0),
            dec!(27.0),
        );
        push.set_scores(Some(dec!(17)), Some(dec!(10)));
        push.is_finished = true;
        let push = store.insert(push).unwrap();

        let pending_game = store
            .insert(Game::new(
                "Buffalo Bills",
                "San Francisco 49ers",
                League::Nfl,
                date,
                Side::TeamB,
                dec!(1.5),
                dec!(44.5),
            ))
            .unwrap();

        let mut leg = |game_id: u64, pick: Pick| store.insert(Leg::new(game_id, pick)).unwrap().id;
        let winner = |team: &str| Pick::Winner { team: team.into() };
        let over = |is_over: bool| Pick::OverUnder { is_over };

        let win = leg(decided.id, winner("Philadelphia Eagles"));
        let win2 = leg(decided.id, over(true));
        let win3 = leg(decided.id, winner("philadelphia eagles"));
        let win4 = leg(decided.id, winner("PHILADELPHIA EAGLES"));
        let tie = leg(push.id, winner("Dallas Cowboys"));
        let tie2 = leg(push.id, winner("New York Giants"));
        let tie3 = leg(push.id, over(true));
        let tie4 = leg(push.id, over(false));
        let loss = leg(decided.id, winner("Baltimore Ravens"));
        let pending = leg(pending_game.id, over(true));
        let invalid = leg(9_999, over(true));

        Fixture {
            store,
            pending_game,
            win,
            win2,
            win3,
            win4,
            tie,
            tie2,
            tie3,
            tie4,
            loss,
            pending,
            invalid,
        }
    }

    fn place(fx: &mut Fixture, legs: Vec<u64>, stake: Decimal) -> Wager {
        fx.store.insert(Wager::new(1, legs, stake)).unwrap()
    }

    fn settle(
        fx: &mut Fixture,
        legs: Vec<u64>,
        stake: Decimal,
    ) -> Result<Option<Decimal>, SettlementError> {
        let mut wager = place(fx, legs, stake);
        calculate_payout(&mut fx.store, &PayoutTable::standard(), &mut wager)
    }

    #[test]
    fn test_standard_table_completeness() {
        let table = PayoutTable::standard();
        let expected: [(usize, &[Decimal]); 4] = [
            (1, &[dec!(0), dec!(1)]),
            (2, &[dec!(0), dec!(2), dec!(4)]),
            (3, &[dec!(0), dec!(1), dec!(4), dec!(6)]),
            (4, &[dec!(0), dec!(1), dec!(4), dec!(6), dec!(10)]),
        ];
        for (arity, multipliers) in expected {
            for (wins, multiplier) in multipliers.iter().enumerate() {
                // Wins and ties interleaved to show order does not matter
                let outcomes: Vec<Outcome> = (0..arity)
                    .map(|i| if (i * 7 + wins) % arity < wins { Win } else { Tie })
                    .collect();
                assert_eq!(outcomes.iter().filter(|o| **o == Win).count(), wins);
                assert_eq!(table.multiplier(&outcomes), Some(*multiplier));
            }
        }
    }

    #[test]
    fn test_loss_overrides_wins_and_ties() {
        let table = PayoutTable::standard();
        assert_eq!(table.multiplier(&[Loss]), Some(dec!(-1.05)));
        assert_eq!(table.multiplier(&[Win, Loss]), Some(dec!(-1.10)));
        assert_eq!(table.multiplier(&[Tie, Win, Loss]), Some(dec!(-1.00)));
        assert_eq!(table.multiplier(&[Win, Win, Win, Loss]), Some(dec!(-1.00)));
        assert_eq!(table.multiplier(&[Loss, Loss, Loss, Loss]), Some(dec!(-1.00)));
    }

    #[test]
    fn test_unmapped_combinations() {
        let table = PayoutTable::standard();
        assert_eq!(table.multiplier(&[Win, Invalid]), None);
        assert_eq!(table.multiplier(&[Win, Win, Win, Win, Win]), None);
        assert_eq!(table.multiplier(&[]), None);
    }

    #[test]
    fn test_custom_five_leg_rule() {
        let table = PayoutTable::standard().with_rule(
            5,
            MultiplierRule {
                on_loss: dec!(-1),
                by_wins: vec![dec!(0), dec!(1), dec!(4), dec!(6), dec!(10), dec!(20)],
            },
        );
        assert_eq!(table.max_legs(), 5);
        assert_eq!(table.multiplier(&[Win; 5]), Some(dec!(20)));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.00) * dec!(-1.05)), dec!(-10.50));
        // Banker's rounding would give -0.10 here
        assert_eq!(round_money(dec!(0.10) * dec!(-1.05)), dec!(-0.11));
        assert_eq!(round_money(dec!(0.15) * dec!(-1.10)), dec!(-0.17));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(0.124)), dec!(0.12));
    }

    #[test]
    fn test_scenario_straight_loss() {
        let mut fx = fixture();
        let legs = vec![fx.loss];
        assert_eq!(settle(&mut fx, legs, dec!(100.00)).unwrap(), Some(dec!(-105.00)));
    }

    #[test]
    fn test_scenario_action_win_tie() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.tie];
        assert_eq!(settle(&mut fx, legs, dec!(50.00)).unwrap(), Some(dec!(100.00)));
    }

    #[test]
    fn test_scenario_parlay3_all_win() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.win2, fx.win3];
        assert_eq!(settle(&mut fx, legs, dec!(20.00)).unwrap(), Some(dec!(120.00)));
    }

    #[test]
    fn test_scenario_parlay4_all_tie() {
        let mut fx = fixture();
        let legs = vec![fx.tie, fx.tie2, fx.tie3, fx.tie4];
        assert_eq!(settle(&mut fx, legs, dec!(10.00)).unwrap(), Some(dec!(0.00)));
    }

    #[test]
    fn test_parlay4_all_win() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.win2, fx.win3, fx.win4];
        assert_eq!(settle(&mut fx, legs, dec!(10.00)).unwrap(), Some(dec!(100.00)));
    }

    #[test]
    fn test_scenario_pending_leg_clears_payout() {
        let mut fx = fixture();
        let legs_by_arity = [
            vec![fx.pending],
            vec![fx.win, fx.pending],
            vec![fx.win, fx.pending, fx.win2],
            vec![fx.pending, fx.win, fx.win2, fx.win3],
        ];
        for legs in legs_by_arity {
            let mut wager = place(&mut fx, legs, dec!(25.00));
            wager.payout = Some(dec!(1.00));
            fx.store.save(&wager).unwrap();

            let payout =
                calculate_payout(&mut fx.store, &PayoutTable::standard(), &mut wager).unwrap();
            assert_eq!(payout, None);
            assert_eq!(fx.store.get::<Wager>(wager.id).unwrap().payout, None);
        }
    }

    #[test]
    fn test_pending_takes_precedence_over_loss() {
        let mut fx = fixture();
        let legs = vec![fx.loss, fx.pending];
        assert_eq!(settle(&mut fx, legs, dec!(10.00)).unwrap(), None);
    }

    #[test]
    fn test_invalid_leg_is_fatal_and_not_persisted() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.invalid];
        let mut wager = place(&mut fx, legs, dec!(10.00));
        wager.payout = Some(dec!(3.00));
        fx.store.save(&wager).unwrap();

        let err = calculate_payout(&mut fx.store, &PayoutTable::standard(), &mut wager)
            .unwrap_err();
        assert_eq!(
            err,
            SettlementError::InvalidLeg {
                wager_id: wager.id,
                leg_id: fx.invalid,
            }
        );
        assert_eq!(fx.store.get::<Wager>(wager.id).unwrap().payout, Some(dec!(3.00)));
    }

    #[test]
    fn test_missing_rule_is_a_configuration_error() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.tie];
        let mut wager = place(&mut fx, legs, dec!(10.00));
        let table = PayoutTable::standard().with_rule(
            2,
            MultiplierRule {
                on_loss: dec!(-1.10),
                by_wins: vec![dec!(0)],
            },
        );
        let err = calculate_payout(&mut fx.store, &table, &mut wager).unwrap_err();
        assert_eq!(err, SettlementError::UnmappedOutcomes { arity: 2, wins: 1 });
    }

    #[test]
    fn test_recalculation_is_idempotent_and_tracks_score_changes() {
        let mut fx = fixture();
        let legs = vec![fx.pending];
        let mut wager = place(&mut fx, legs, dec!(33.33));
        let table = PayoutTable::standard();
        assert_eq!(calculate_payout(&mut fx.store, &table, &mut wager).unwrap(), None);

        // Bills win 24-21 as underdogs, total 45 goes over 44.5
        let mut game = fx.pending_game.clone();
        game.set_scores(Some(dec!(24)), Some(dec!(21)));
        game.is_finished = true;
        fx.store.save(&game).unwrap();

        let first = calculate_payout(&mut fx.store, &table, &mut wager).unwrap();
        let second = calculate_payout(&mut fx.store, &table, &mut wager).unwrap();
        assert_eq!(first, Some(dec!(33.33)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_oversized_stake_fails_without_panicking() {
        let mut fx = fixture();
        let legs = vec![fx.win, fx.loss];
        let mut wager = place(&mut fx, legs, Decimal::MAX);
        let err = calculate_payout(&mut fx.store, &PayoutTable::standard(), &mut wager)
            .unwrap_err();
        assert_eq!(err, SettlementError::PayoutOverflow { wager_id: wager.id });
        assert_eq!(fx.store.get::<Wager>(wager.id).unwrap().payout, None);
    }

    #[test]
    fn test_missing_leg_propagates_not_found() {
        let mut fx = fixture();
        let err = settle(&mut fx, vec![424_242], dec!(10.00)).unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Store(crate::error::StoreError::NotFound { kind: "leg", .. })
        ));
    }
}

use crate::error::{SettlementError, StoreError};
use crate::models::{Player, PlayerId, Wager};
use crate::store::Store;
use crate::utils::payout::{calculate_payout, PayoutTable};
use rust_decimal::Decimal;

fn zero() -> Decimal {
    Decimal::new(0, 2)
}

/// Sum of stakes across every wager the player owns, stored on the player
pub fn total_staked<S: Store>(store: &mut S, player_id: PlayerId) -> Result<Decimal, StoreError> {
    let mut player: Player = store.get(player_id)?;

    let total = store
        .find(|w: &Wager| w.player_id == player_id)?
        .iter()
        .fold(zero(), |acc, w| acc + w.stake);

    player.total_staked = total;
    store.save(&player)?;
    Ok(total)
}

/// Sum of freshly recomputed payouts across every wager the player owns
///
/// Pending wagers contribute nothing. The sum is not clamped, so losing
/// wagers pull it below zero.
pub fn total_paid_out<S: Store>(
    store: &mut S,
    table: &PayoutTable,
    player_id: PlayerId,
) -> Result<Decimal, SettlementError> {
    let mut player: Player = store.get(player_id)?;

    let mut total = zero();
    for mut wager in store.find(|w: &Wager| w.player_id == player_id)? {
        if let Some(payout) = calculate_payout(store, table, &mut wager)? {
            total += payout;
        }
    }

    player.total_payout = total;
    store.save(&player)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, League, Leg, Pick, Side};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Book {
        store: MemoryStore,
        player: PlayerId,
        win: u64,
        loss: u64,
        pending: u64,
    }

    fn book() -> Book {
        let mut store = MemoryStore::new();
        let player = store.insert(Player::new("frank")).unwrap().id;

        let mut game = Game::new(
            "Michigan Wolverines",
            "Ohio State Buckeyes",
            League::Ncaa,
            NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
            Side::TeamB,
            dec!(20.5),
            dec!(41.5),
        );
        game.set_scores(Some(dec!(13)), Some(dec!(10)));
        game.is_finished = true;
        let game = store.insert(game).unwrap();

        let later = store
            .insert(Game::new(
                "Texas Longhorns",
                "Texas A&M Aggies",
                League::Ncaa,
                NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
                Side::TeamA,
                dec!(4.5),
                dec!(47.5),
            ))
            .unwrap();

        let win = store
            .insert(Leg::new(game.id, Pick::Winner { team: "Michigan Wolverines".into() }))
            .unwrap()
            .id;
        let loss = store
            .insert(Leg::new(game.id, Pick::OverUnder { is_over: true }))
            .unwrap()
            .id;
        let pending = store
            .insert(Leg::new(later.id, Pick::OverUnder { is_over: false }))
            .unwrap()
            .id;

        Book {
            store,
            player,
            win,
            loss,
            pending,
        }
    }

    #[test]
    fn test_totals_with_no_wagers_are_zero() {
        let mut book = book();
        let table = PayoutTable::standard();
        assert_eq!(total_staked(&mut book.store, book.player).unwrap(), dec!(0.00));
        assert_eq!(
            total_paid_out(&mut book.store, &table, book.player).unwrap(),
            dec!(0.00)
        );
        let player: Player = book.store.get(book.player).unwrap();
        assert_eq!(player.total_staked.to_string(), "0.00");
    }

    #[test]
    fn test_totals_sum_all_arities_and_skip_pending() {
        let mut book = book();
        let table = PayoutTable::standard();
        let other = book.store.insert(Player::new("grace")).unwrap().id;

        let wagers = [
            (book.player, vec![book.win], dec!(10.00)),             // +10.00
            (book.player, vec![book.win, book.loss], dec!(20.00)),  // -22.00
            (book.player, vec![book.win, book.pending], dec!(5.00)), // pending
            (other, vec![book.win], dec!(1000.00)),
        ];
        for (player, legs, stake) in wagers {
            book.store.insert(Wager::new(player, legs, stake)).unwrap();
        }

        assert_eq!(total_staked(&mut book.store, book.player).unwrap(), dec!(35.00));
        assert_eq!(
            total_paid_out(&mut book.store, &table, book.player).unwrap(),
            dec!(-12.00)
        );

        let player: Player = book.store.get(book.player).unwrap();
        assert_eq!(player.total_staked, dec!(35.00));
        assert_eq!(player.total_payout, dec!(-12.00));

        // Recomputing converges on the same values
        assert_eq!(
            total_paid_out(&mut book.store, &table, book.player).unwrap(),
            dec!(-12.00)
        );
    }

    #[test]
    fn test_totals_grow_with_winning_wagers() {
        let mut book = book();
        let table = PayoutTable::standard();
        let mut last_staked = dec!(0);
        let mut last_paid = dec!(0);
        for stake in [dec!(1.00), dec!(2.50), dec!(40.00)] {
            book.store
                .insert(Wager::new(book.player, vec![book.win], stake))
                .unwrap();
            let staked = total_staked(&mut book.store, book.player).unwrap();
            let paid = total_paid_out(&mut book.store, &table, book.player).unwrap();
            assert!(staked > last_staked);
            assert!(paid > last_paid);
            last_staked = staked;
            last_paid = paid;
        }
        assert_eq!(last_paid, dec!(43.50));
    }

    #[test]
    fn test_unknown_player() {
        let mut store = MemoryStore::new();
        assert!(total_staked(&mut store, 77).unwrap_err().is_not_found("player"));
    }
}

use crate::error::StoreError;
use crate::models::{same_team, Game, Leg, Outcome, Pick, Side, Total, Winner};
use crate::store::Store;
use std::cmp::Ordering;

/// Determine the spread-adjusted winner of a game
///
/// The spread is subtracted from the favorite's score and the adjusted scores
/// are compared. Returns `None` while the game is unfinished or a score is
/// missing.
pub fn resolve_winner(game: &Game) -> Option<Winner> {
    if !game.is_finished {
        return None;
    }

    let score_a = game.score_a()?;
    let score_b = game.score_b()?;

    let (adjusted_a, adjusted_b) = match game.favorite {
        Side::TeamA => (score_a - game.favorite_spread, score_b),
        Side::TeamB => (score_a, score_b - game.favorite_spread),
    };

    Some(match adjusted_a.cmp(&adjusted_b) {
        Ordering::Greater => Winner::TeamA,
        Ordering::Less => Winner::TeamB,
        Ordering::Equal => Winner::Tie,
    })
}

/// Compare the combined score with the over/under line
pub fn resolve_over_under(game: &Game) -> Option<Total> {
    if !game.is_finished {
        return None;
    }

    let total = game.total_points()?;
    Some(match total.cmp(&game.over_under_line) {
        Ordering::Greater => Total::Over,
        Ordering::Less => Total::Under,
        Ordering::Equal => Total::Tie,
    })
}

/// Evaluate a single leg against the current state of its game
pub fn evaluate(leg: &Leg, game: Option<&Game>) -> Outcome {
    let Some(game) = game else {
        return Outcome::Invalid;
    };

    match &leg.pick {
        Pick::Winner { team } => match resolve_winner(game) {
            None => Outcome::Pending,
            Some(Winner::Tie) => Outcome::Tie,
            Some(Winner::TeamA) => pick_result(same_team(&game.team_a, team)),
            Some(Winner::TeamB) => pick_result(same_team(&game.team_b, team)),
        },
        Pick::OverUnder { is_over } => match resolve_over_under(game) {
            None => Outcome::Pending,
            Some(Total::Tie) => Outcome::Tie,
            Some(Total::Over) => pick_result(*is_over),
            Some(Total::Under) => pick_result(!*is_over),
        },
        Pick::Unrecognized => Outcome::Invalid,
    }
}

fn pick_result(won: bool) -> Outcome {
    if won {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

/// Load the leg's game and evaluate it. A missing game is `Invalid`, not an error.
pub fn evaluate_leg<S: Store>(store: &S, leg: &Leg) -> Result<Outcome, StoreError> {
    match store.get::<Game>(leg.game_id) {
        Ok(game) => Ok(evaluate(leg, Some(&game))),
        Err(e) if e.is_not_found("game") => Ok(Outcome::Invalid),
        Err(e) => Err(e),
    }
}

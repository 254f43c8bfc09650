use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PlayerId = u64;
pub type GameId = u64;
pub type LegId = u64;
pub type WagerId = u64;

/// League a game belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum League {
    #[serde(rename = "NFL")]
    Nfl,
    #[serde(rename = "NCAA")]
    Ncaa,
}

impl League {
    /// League id used by the api-sports american football feed
    pub fn feed_id(&self) -> &'static str {
        match self {
            League::Nfl => "1",
            League::Ncaa => "2",
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            League::Nfl => write!(f, "NFL"),
            League::Ncaa => write!(f, "NCAA"),
        }
    }
}

impl FromStr for League {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NFL" => Ok(League::Nfl),
            "NCAA" => Ok(League::Ncaa),
            other => Err(format!("unknown league {other:?} (expected NFL or NCAA)")),
        }
    }
}

/// One of the two teams of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    TeamA,
    TeamB,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::TeamA => Side::TeamB,
            Side::TeamB => Side::TeamA,
        }
    }
}

/// Case-insensitive team name comparison
pub fn same_team(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Scores, spreads and lines carry one fractional digit
pub fn to_tenths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// A game between two teams with a point spread on the favorite and an
/// over/under line on the combined score.
///
/// Scores can only be changed through [`Game::set_score`] and
/// [`Game::set_scores`], which keep `total_points` equal to the sum of both
/// scores whenever both are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GameRecord")]
pub struct Game {
    pub id: GameId,
    pub team_a: String,
    pub team_b: String,
    pub league: League,
    pub game_date: NaiveDate,
    pub favorite: Side,
    pub favorite_spread: Decimal,
    score_a: Option<Decimal>,
    score_b: Option<Decimal>,
    total_points: Option<Decimal>,
    pub over_under_line: Decimal,
    pub is_finished: bool,
}

impl Game {
    pub fn new(
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        league: League,
        game_date: NaiveDate,
        favorite: Side,
        favorite_spread: Decimal,
        over_under_line: Decimal,
    ) -> Self {
        Self {
            id: 0,
            team_a: team_a.into(),
            team_b: team_b.into(),
            league,
            game_date,
            favorite,
            favorite_spread: to_tenths(favorite_spread),
            score_a: None,
            score_b: None,
            total_points: None,
            over_under_line: to_tenths(over_under_line),
            is_finished: false,
        }
    }

    pub fn team_name(&self, side: Side) -> &str {
        match side {
            Side::TeamA => &self.team_a,
            Side::TeamB => &self.team_b,
        }
    }

    /// Which side a free-text team name refers to, if any
    pub fn side_of(&self, team: &str) -> Option<Side> {
        if same_team(team, &self.team_a) {
            Some(Side::TeamA)
        } else if same_team(team, &self.team_b) {
            Some(Side::TeamB)
        } else {
            None
        }
    }

    pub fn favorite_name(&self) -> &str {
        self.team_name(self.favorite)
    }

    pub fn score(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::TeamA => self.score_a,
            Side::TeamB => self.score_b,
        }
    }

    pub fn score_a(&self) -> Option<Decimal> {
        self.score_a
    }

    pub fn score_b(&self) -> Option<Decimal> {
        self.score_b
    }

    pub fn total_points(&self) -> Option<Decimal> {
        self.total_points
    }

    pub fn set_score(&mut self, side: Side, score: Option<Decimal>) {
        let score = score.map(to_tenths);
        match side {
            Side::TeamA => self.score_a = score,
            Side::TeamB => self.score_b = score,
        }
        self.total_points = match (self.score_a, self.score_b) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };
    }

    pub fn set_scores(&mut self, score_a: Option<Decimal>, score_b: Option<Decimal>) {
        self.set_score(Side::TeamA, score_a);
        self.set_score(Side::TeamB, score_b);
    }

    /// Short display name built from the last word of each team name
    pub fn short_name(&self) -> String {
        let short = |team: &str| team.split_whitespace().last().unwrap_or(team).to_string();
        format!("{}@{}", short(&self.team_a), short(&self.team_b))
    }

    /// True if this game is the same matchup on the same date, in either team order
    pub fn same_matchup(&self, team_a: &str, team_b: &str, date: NaiveDate) -> bool {
        self.game_date == date
            && ((self.team_a == team_a && self.team_b == team_b)
                || (self.team_a == team_b && self.team_b == team_a))
    }
}

/// Stored form of a [`Game`]. Any persisted `total_points` is ignored and
/// rebuilt from the two scores.
#[derive(Deserialize)]
struct GameRecord {
    id: GameId,
    team_a: String,
    team_b: String,
    league: League,
    game_date: NaiveDate,
    favorite: Side,
    favorite_spread: Decimal,
    score_a: Option<Decimal>,
    score_b: Option<Decimal>,
    over_under_line: Decimal,
    is_finished: bool,
}

impl From<GameRecord> for Game {
    fn from(record: GameRecord) -> Self {
        let mut game = Game {
            id: record.id,
            team_a: record.team_a,
            team_b: record.team_b,
            league: record.league,
            game_date: record.game_date,
            favorite: record.favorite,
            favorite_spread: record.favorite_spread,
            score_a: None,
            score_b: None,
            total_points: None,
            over_under_line: record.over_under_line,
            is_finished: record.is_finished,
        };
        game.set_scores(record.score_a, record.score_b);
        game
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// What a single leg bets on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pick {
    /// Spread-adjusted winner of the game
    Winner { team: String },
    /// Combined score against the over/under line
    OverUnder { is_over: bool },
    /// A persisted pick kind this build does not know about
    #[serde(other)]
    Unrecognized,
}

/// An elementary wager on a single game. Its outcome is always derived from
/// the current game state and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub id: LegId,
    pub game_id: GameId,
    pub pick: Pick,
}

impl Leg {
    pub fn new(game_id: GameId, pick: Pick) -> Self {
        Self { id: 0, game_id, pick }
    }

    pub fn describe(&self, game: Option<&Game>) -> String {
        let game_name = game
            .map(|g| g.short_name())
            .unwrap_or_else(|| format!("game #{}", self.game_id));
        match (&self.pick, game) {
            (Pick::Winner { team }, _) => format!("{}: WINNER {}", game_name, team),
            (Pick::OverUnder { is_over }, Some(game)) => format!(
                "{}: {} {}",
                game_name,
                if *is_over { "OVER" } else { "UNDER" },
                game.over_under_line
            ),
            (Pick::OverUnder { is_over }, None) => {
                format!("{}: {}", game_name, if *is_over { "OVER" } else { "UNDER" })
            }
            (Pick::Unrecognized, _) => format!("{}: Unknown Bet Type", game_name),
        }
    }
}

/// Spread-adjusted result of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    TeamA,
    TeamB,
    Tie,
}

/// Combined score against the over/under line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Total {
    Over,
    Under,
    Tie,
}

/// Evaluated outcome of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
    Pending,
    Invalid,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Win => "Win",
            Outcome::Loss => "Loss",
            Outcome::Tie => "Tie",
            Outcome::Pending => "Pending",
            Outcome::Invalid => "Invalid",
        };
        write!(f, "{}", s)
    }
}

/// Compound wager names by number of legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WagerKind {
    Straight,
    Action,
    Parlay3,
    Parlay4,
}

impl WagerKind {
    pub const ALL: [WagerKind; 4] = [
        WagerKind::Straight,
        WagerKind::Action,
        WagerKind::Parlay3,
        WagerKind::Parlay4,
    ];

    pub fn from_arity(legs: usize) -> Option<Self> {
        match legs {
            1 => Some(WagerKind::Straight),
            2 => Some(WagerKind::Action),
            3 => Some(WagerKind::Parlay3),
            4 => Some(WagerKind::Parlay4),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            WagerKind::Straight => 1,
            WagerKind::Action => 2,
            WagerKind::Parlay3 => 3,
            WagerKind::Parlay4 => 4,
        }
    }
}

impl fmt::Display for WagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A compound wager: a stake placed on an ordered set of distinct legs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub player_id: PlayerId,
    legs: Vec<LegId>,
    pub stake: Decimal,
    /// `None` until settled, or while any leg is pending
    pub payout: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Wager {
    pub fn new(player_id: PlayerId, legs: Vec<LegId>, stake: Decimal) -> Self {
        Self {
            id: 0,
            player_id,
            legs,
            stake,
            payout: None,
            created_at: Utc::now(),
        }
    }

    pub fn legs(&self) -> &[LegId] {
        &self.legs
    }

    pub fn arity(&self) -> usize {
        self.legs.len()
    }

    pub fn kind(&self) -> Option<WagerKind> {
        WagerKind::from_arity(self.arity())
    }

    /// Payout as shown to users
    pub fn payout_label(&self) -> String {
        match self.payout {
            Some(payout) => format!("{:.2}", payout),
            None => "pending".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub total_staked: Decimal,
    pub total_payout: Decimal,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            total_staked: Decimal::new(0, 2),
            total_payout: Decimal::new(0, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn game() -> Game {
        Game::new(
            "Kansas City Chiefs",
            "Baltimore Ravens",
            League::Nfl,
            NaiveDate::from_ymd_opt(2024, 9, 5).unwrap(),
            Side::TeamB,
            dec!(3.0),
            dec!(46.5),
        )
    }

    #[test]
    fn test_total_points_follows_scores() {
        let mut game = game();
        assert_eq!(game.total_points(), None);

        game.set_score(Side::TeamA, Some(dec!(27)));
        assert_eq!(game.total_points(), None);

        game.set_score(Side::TeamB, Some(dec!(20)));
        assert_eq!(game.total_points(), Some(dec!(47)));

        // Score corrections keep the total in sync
        game.set_scores(Some(dec!(24)), Some(dec!(20)));
        assert_eq!(game.total_points(), Some(dec!(44)));

        game.set_score(Side::TeamB, None);
        assert_eq!(game.total_points(), None);
    }

    #[test]
    fn test_loaded_game_rebuilds_total_points() {
        let mut game = game();
        game.set_scores(Some(dec!(27)), Some(dec!(20)));

        let mut json = serde_json::to_value(&game).unwrap();
        json["total_points"] = serde_json::json!("99");
        let loaded: Game = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.total_points(), Some(dec!(47)));
        assert_eq!(loaded, game);

        let mut json = serde_json::to_value(&game).unwrap();
        json["score_b"] = serde_json::Value::Null;
        let loaded: Game = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.total_points(), None);
    }

    #[test]
    fn test_short_name_and_sides() {
        let game = game();
        assert_eq!(game.short_name(), "Chiefs@Ravens");
        assert_eq!(game.side_of("baltimore ravens"), Some(Side::TeamB));
        assert_eq!(game.side_of("Ravens"), None);
        assert_eq!(game.favorite_name(), "Baltimore Ravens");
    }

    #[test]
    fn test_same_matchup_either_order() {
        let game = game();
        let date = NaiveDate::from_ymd_opt(2024, 9, 5).unwrap();
        assert!(game.same_matchup("Kansas City Chiefs", "Baltimore Ravens", date));
        assert!(game.same_matchup("Baltimore Ravens", "Kansas City Chiefs", date));
        assert!(!game.same_matchup(
            "Baltimore Ravens",
            "Kansas City Chiefs",
            date.succ_opt().unwrap()
        ));
    }

    #[test]
    fn test_unknown_pick_kind_deserializes() {
        let leg: Leg =
            serde_json::from_str(r#"{"id":1,"game_id":2,"pick":{"kind":"moneyline"}}"#).unwrap();
        assert_eq!(leg.pick, Pick::Unrecognized);

        let leg: Leg = serde_json::from_str(
            r#"{"id":1,"game_id":2,"pick":{"kind":"over_under","is_over":false}}"#,
        )
        .unwrap();
        assert_eq!(leg.pick, Pick::OverUnder { is_over: false });
    }

    #[test]
    fn test_payout_label() {
        let mut wager = Wager::new(1, vec![1, 2], dec!(50.00));
        assert_eq!(wager.payout_label(), "pending");
        wager.payout = Some(dec!(100.00));
        assert_eq!(wager.payout_label(), "100.00");
        assert_eq!(wager.kind(), Some(WagerKind::Action));
    }
}

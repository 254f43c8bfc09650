use crate::models::League;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "v1.american-football.api-sports.io";
const TIMEZONE: &str = "America/New_York";

/// Top-level response from the api-sports games endpoint
#[derive(Debug, Deserialize)]
struct GamesResponse {
    #[serde(default)]
    response: Option<Vec<ApiGame>>,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    game: ApiGameInfo,
    league: ApiLeague,
    teams: ApiTeams,
    scores: ApiScores,
}

#[derive(Debug, Deserialize)]
struct ApiGameInfo {
    date: ApiDate,
    status: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct ApiDate {
    date: NaiveDate,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    long: String,
}

#[derive(Debug, Deserialize)]
struct ApiLeague {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTeams {
    away: ApiTeam,
    home: ApiTeam,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiScores {
    away: ApiScore,
    home: ApiScore,
}

#[derive(Debug, Deserialize)]
struct ApiScore {
    total: Option<Decimal>,
}

/// A game as reported by the score feed. The away team is team A and the
/// home team is team B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedGame {
    pub league: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub team_a: String,
    pub team_b: String,
    pub status: String,
    pub score_a: Option<Decimal>,
    pub score_b: Option<Decimal>,
}

impl From<ApiGame> for FeedGame {
    fn from(api_game: ApiGame) -> Self {
        Self {
            league: api_game.league.name,
            date: api_game.game.date.date,
            time: api_game.game.date.time,
            team_a: api_game.teams.away.name,
            team_b: api_game.teams.home.name,
            status: api_game.game.status.long,
            score_a: api_game.scores.away.total,
            score_b: api_game.scores.home.total,
        }
    }
}

/// Parse a raw games response body into feed games
pub fn parse_games(body: &str) -> Result<Vec<FeedGame>> {
    let response: GamesResponse =
        serde_json::from_str(body).context("Failed to parse score feed response")?;
    Ok(response
        .response
        .unwrap_or_default()
        .into_iter()
        .map(FeedGame::from)
        .collect())
}

pub struct ScoreFeedClient {
    client: Client,
    host: String,
    api_key: String,
}

impl ScoreFeedClient {
    pub fn new(host: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            host,
            api_key,
        }
    }

    /// Fetch every game of a league on one date
    pub async fn fetch_games_by_date(
        &self,
        league: League,
        date: NaiveDate,
    ) -> Result<Vec<FeedGame>> {
        let url = format!("https://{}/games", self.host);
        let date = date.format("%Y-%m-%d").to_string();

        tracing::info!(%league, %date, "fetching games from score feed");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("league", league.feed_id()),
                ("date", date.as_str()),
                ("timezone", TIMEZONE),
            ])
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch games from score feed")?;

        if !response.status().is_success() {
            anyhow::bail!("Score feed returned error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read score feed response")?;
        parse_games(&body)
    }
}

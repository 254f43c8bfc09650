use anyhow::{bail, Context, Result};
use betbook_ledger::data::{save_rows_to_csv, JsonFileStore};
use betbook_ledger::insights::summarize;
use betbook_ledger::outcome::evaluate_leg;
use betbook_ledger::sync::{apply_feed, mark_tracked};
use betbook_ledger::{
    sync_league, Config, Game, GameId, League, Ledger, Leg, LegId, NewGame, Pick, Player,
    ScoreFeedClient, Store, Wager, WagerId,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "betbook", about = "Sports betting ledger with wager settlement")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage players
    Player {
        #[command(subcommand)]
        action: PlayerCommand,
    },
    /// Manage games and scores
    Game {
        #[command(subcommand)]
        action: GameCommand,
    },
    /// Manage single-game picks
    Leg {
        #[command(subcommand)]
        action: LegCommand,
    },
    /// Place, list and delete wagers
    Bet {
        #[command(subcommand)]
        action: BetCommand,
    },
    /// Recompute the payout of every wager
    Settle {
        /// Also write the settlement report to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Recompute staked and paid-out totals for every player
    Totals,
    /// Bet counts and money per wager kind
    Insights {
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Pull scores from the score feed for unfinished games
    Sync {
        #[arg(long)]
        league: League,
        /// Only this date; otherwise every date with unfinished games
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum PlayerCommand {
    Add { name: String },
    List,
    Show { name: String },
    Rename { name: String, new_name: String },
    /// Delete a player and all of their wagers
    Delete { name: String },
}

#[derive(Subcommand)]
enum GameCommand {
    Add {
        team_a: String,
        team_b: String,
        #[arg(long)]
        league: League,
        #[arg(long)]
        date: NaiveDate,
        /// Name of the favored team
        #[arg(long)]
        favorite: String,
        #[arg(long)]
        spread: Decimal,
        /// Over/under line on total points
        #[arg(long)]
        line: Decimal,
    },
    /// Add a game listed by the score feed, copying its scores and status
    AddFromFeed {
        #[arg(long)]
        league: League,
        #[arg(long)]
        date: NaiveDate,
        /// Position of the game in `sync --date` output, starting at 1
        #[arg(long)]
        index: usize,
        #[arg(long)]
        favorite: String,
        #[arg(long)]
        spread: Decimal,
        #[arg(long)]
        line: Decimal,
    },
    /// Record or correct final scores
    Score {
        id: GameId,
        score_a: Decimal,
        score_b: Decimal,
        /// Mark the game as finished
        #[arg(long)]
        finished: bool,
    },
    List {
        #[arg(long)]
        unfinished: bool,
    },
    /// Delete a game with its legs and the wagers using them
    Delete { id: GameId },
}

#[derive(Subcommand)]
enum LegCommand {
    Add {
        game: GameId,
        /// Team picked to win against the spread
        #[arg(long, conflicts_with_all = ["over", "under"])]
        winner: Option<String>,
        #[arg(long, conflicts_with = "under")]
        over: bool,
        #[arg(long)]
        under: bool,
    },
    List,
}

#[derive(Subcommand)]
enum BetCommand {
    Place {
        #[arg(long)]
        player: String,
        #[arg(long)]
        stake: Decimal,
        /// Leg ids, 1 to 4
        #[arg(required = true, num_args = 1..)]
        legs: Vec<LegId>,
    },
    List {
        #[arg(long)]
        player: Option<String>,
    },
    Delete { id: WagerId },
}

fn describe_game(game: &Game) -> String {
    let result = match (game.score_a(), game.score_b()) {
        (Some(a), Some(b)) => format!(
            "{} {} - {} {}{}",
            game.team_a,
            a,
            b,
            game.team_b,
            if game.is_finished { " (final)" } else { "" }
        ),
        _ => format!("{} vs {}", game.team_a, game.team_b),
    };
    format!(
        "#{} {} {} | {} -{} | O/U {} | {}",
        game.id,
        game.league,
        game.game_date,
        game.favorite_name(),
        game.favorite_spread,
        game.over_under_line,
        result
    )
}

fn describe_leg<S: Store>(store: &S, leg: &Leg) -> Result<String> {
    let game = store.get::<Game>(leg.game_id).ok();
    let outcome = evaluate_leg(store, leg)?;
    Ok(format!("leg #{} {} [{}]", leg.id, leg.describe(game.as_ref()), outcome))
}

fn print_wager<S: Store>(store: &S, wager: &Wager) -> Result<()> {
    let owner = store
        .get::<Player>(wager.player_id)
        .map(|p| p.name)
        .unwrap_or_else(|_| format!("player #{}", wager.player_id));
    let kind = wager
        .kind()
        .map(|k| k.to_string())
        .unwrap_or_else(|| format!("{}-leg", wager.arity()));
    println!(
        "#{} {} | {} | stake {:.2} | payout {} | {}",
        wager.id,
        kind,
        owner,
        wager.stake,
        wager.payout_label(),
        wager.created_at.format("%Y-%m-%d %H:%M")
    );
    for leg_id in wager.legs() {
        match store.get::<Leg>(*leg_id) {
            Ok(leg) => println!("    {}", describe_leg(store, &leg)?),
            Err(e) => println!("    {}", e),
        }
    }
    Ok(())
}

fn run_player(ledger: &mut Ledger<JsonFileStore>, action: PlayerCommand) -> Result<()> {
    match action {
        PlayerCommand::Add { name } => {
            let player = ledger.add_player(&name)?;
            println!("Added player #{} {}", player.id, player.name);
        }
        PlayerCommand::List => {
            for player in ledger.store().all::<Player>()? {
                println!(
                    "#{} {} | staked {:.2} | payout {:.2}",
                    player.id, player.name, player.total_staked, player.total_payout
                );
            }
        }
        PlayerCommand::Show { name } => {
            let player = ledger.player_by_name(&name)?;
            let player = ledger.refresh_totals(player.id)?;
            println!("{}", player.name);
            println!("Total staked: {:.2}", player.total_staked);
            println!("Total payout: {:.2}", player.total_payout);
            for (kind, count) in ledger.wager_counts(player.id)? {
                println!("{}: {}", kind, count);
            }
            println!();
            for wager in ledger.wagers_for(player.id)? {
                print_wager(ledger.store(), &wager)?;
            }
        }
        PlayerCommand::Rename { name, new_name } => {
            let player = ledger.player_by_name(&name)?;
            ledger.rename_player(player.id, &new_name)?;
            println!("Renamed {} to {}", name, new_name);
        }
        PlayerCommand::Delete { name } => {
            let player = ledger.player_by_name(&name)?;
            ledger.delete_player(player.id)?;
            println!("Deleted player {}", name);
        }
    }
    Ok(())
}

async fn run_game(
    ledger: &mut Ledger<JsonFileStore>,
    config: &Config,
    action: GameCommand,
) -> Result<()> {
    match action {
        GameCommand::Add {
            team_a,
            team_b,
            league,
            date,
            favorite,
            spread,
            line,
        } => {
            let game = ledger.add_game(NewGame {
                team_a,
                team_b,
                league,
                game_date: date,
                favorite,
                favorite_spread: spread,
                over_under_line: line,
            })?;
            println!("Added {}", describe_game(&game));
        }
        GameCommand::AddFromFeed {
            league,
            date,
            index,
            favorite,
            spread,
            line,
        } => {
            let client = ScoreFeedClient::new(
                config.scores_api_host.clone(),
                config.scores_api_key()?.to_string(),
            );
            let feed_games = client
                .fetch_games_by_date(league, date)
                .await
                .context("Failed to fetch games")?;
            let Some(feed_game) = index.checked_sub(1).and_then(|i| feed_games.get(i)) else {
                bail!(
                    "No feed game #{} on {} ({} listed)",
                    index,
                    date,
                    feed_games.len()
                );
            };
            let game = ledger.add_feed_game(
                feed_game,
                league,
                &favorite,
                spread,
                line,
                &config.finished_statuses,
            )?;
            println!("Added {}", describe_game(&game));
        }
        GameCommand::Score {
            id,
            score_a,
            score_b,
            finished,
        } => {
            let game = ledger.record_scores(id, Some(score_a), Some(score_b), finished)?;
            println!("Updated {}", describe_game(&game));
            println!("Run `settle` to refresh payouts.");
        }
        GameCommand::List { unfinished } => {
            for game in ledger.store().find(|g: &Game| !unfinished || !g.is_finished)? {
                println!("{}", describe_game(&game));
            }
        }
        GameCommand::Delete { id } => {
            ledger.delete_game(id)?;
            println!("Deleted game #{}", id);
        }
    }
    Ok(())
}

fn run_leg(ledger: &mut Ledger<JsonFileStore>, action: LegCommand) -> Result<()> {
    match action {
        LegCommand::Add {
            game,
            winner,
            over,
            under,
        } => {
            let pick = match (winner, over, under) {
                (Some(team), false, false) => Pick::Winner { team },
                (None, true, false) => Pick::OverUnder { is_over: true },
                (None, false, true) => Pick::OverUnder { is_over: false },
                _ => bail!("Pick exactly one of --winner <TEAM>, --over or --under"),
            };
            let leg = ledger.add_leg(game, pick)?;
            println!("Added {}", describe_leg(ledger.store(), &leg)?);
        }
        LegCommand::List => {
            for leg in ledger.store().all::<Leg>()? {
                println!("{}", describe_leg(ledger.store(), &leg)?);
            }
        }
    }
    Ok(())
}

fn run_bet(ledger: &mut Ledger<JsonFileStore>, action: BetCommand) -> Result<()> {
    match action {
        BetCommand::Place { player, stake, legs } => {
            let player = ledger.player_by_name(&player)?;
            let wager = ledger.place_wager(player.id, &legs, stake)?;
            print_wager(ledger.store(), &wager)?;
        }
        BetCommand::List { player } => {
            let wagers = match player {
                Some(name) => {
                    let player = ledger.player_by_name(&name)?;
                    ledger.wagers_for(player.id)?
                }
                None => ledger.store().all::<Wager>()?,
            };
            if wagers.is_empty() {
                println!("No wagers found.");
            }
            for wager in wagers {
                print_wager(ledger.store(), &wager)?;
            }
        }
        BetCommand::Delete { id } => {
            ledger.delete_wager(id)?;
            println!("Deleted wager #{}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (also reads .env)
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = JsonFileStore::open(&config.data_path)
        .with_context(|| format!("Failed to open ledger {}", config.data_path.display()))?;
    let mut ledger = Ledger::new(store);

    match cli.command {
        Command::Player { action } => run_player(&mut ledger, action)?,
        Command::Game { action } => run_game(&mut ledger, &config, action).await?,
        Command::Leg { action } => run_leg(&mut ledger, action)?,
        Command::Bet { action } => run_bet(&mut ledger, action)?,
        Command::Settle { csv } => {
            let report = ledger.settle_all()?;
            for row in report.rows() {
                match row.payout {
                    Some(payout) => println!("#{}: {:.2}", row.wager_id, payout),
                    None => println!("#{}: {}", row.wager_id, row.status),
                }
            }
            println!("\n{}", report.format());
            if let Some(path) = csv {
                save_rows_to_csv(&report.rows(), &path)?;
                println!("Saved settlement report to {}", path.display());
            }
        }
        Command::Totals => {
            for player in ledger.store().all::<Player>()? {
                match ledger.refresh_totals(player.id) {
                    Ok(player) => println!(
                        "{}: staked {:.2} | payout {:.2}",
                        player.name, player.total_staked, player.total_payout
                    ),
                    Err(e) => println!("{}: error: {}", player.name, e),
                }
            }
        }
        Command::Insights { csv } => {
            let rows = summarize(ledger.store())?;
            for row in &rows {
                println!("{}", row.format());
            }
            if let Some(path) = csv {
                save_rows_to_csv(&rows, &path)?;
                println!("\nSaved insights to {}", path.display());
            }
        }
        Command::Sync { league, date } => match date {
            Some(date) => {
                let client = ScoreFeedClient::new(
                    config.scores_api_host.clone(),
                    config.scores_api_key()?.to_string(),
                );
                let feed_games = client
                    .fetch_games_by_date(league, date)
                    .await
                    .context("Failed to fetch games")?;

                let listing = mark_tracked(ledger.store(), &feed_games)?;
                for (i, (game, tracked)) in listing.into_iter().enumerate() {
                    println!(
                        "[{}] {} @ {} | {} | {}-{}{}",
                        i + 1,
                        game.team_a,
                        game.team_b,
                        game.status,
                        game.score_a.map(|s| s.to_string()).unwrap_or_default(),
                        game.score_b.map(|s| s.to_string()).unwrap_or_default(),
                        if tracked { " | in ledger" } else { "" }
                    );
                }

                let summary =
                    apply_feed(ledger.store_mut(), &feed_games, &config.finished_statuses)?;
                println!(
                    "\nUpdated {} games ({} finished)",
                    summary.updated, summary.finished
                );
            }
            None => {
                let summary = sync_league(&config, ledger.store_mut(), league).await?;
                println!(
                    "Updated {} {} games ({} finished)",
                    summary.updated, league, summary.finished
                );
            }
        },
    }

    Ok(())
}

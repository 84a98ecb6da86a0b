//! Administration CLI for campus games events.
//!
//! Drives the tournament engine against PostgreSQL: generates round-robin
//! schedules, creates games, records scores and prints standings as JSON.

mod config;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Error};
use campus_games::{
    db::{Database, ParticipantScope, PgTournamentStore},
    tournament::{
        EngineError, EventId, GameId, GameStatus, MatchupId, NewGame, TournamentEngine,
    },
};
use config::AdminConfig;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Administer round-robin campus events

USAGE:
  cg_admin [OPTIONS] <COMMAND> [COMMAND OPTIONS]

COMMANDS:
  generate-schedule --event ID --required-games N   Create every matchup of the event
  create-game       --matchup ID --number N [--status S]
  submit-score      --game ID --score-a N --score-b N
  standings         --event ID                      Print the leaderboard
  recompute         --event ID                      Rebuild the leaderboard from matchups
  resolve           --matchup ID                    Re-resolve a matchup winner
  clear-schedule    --event ID                      Delete matchups, games and leaderboard
  matchups          --event ID
  games             --matchup ID

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --scope      SCOPE       Participant scope: event | global  [default: env PARTICIPANT_SCOPE or event]
  --seed       N           Fixed shuffle seed  [default: env SCHEDULE_SEED or random]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  PARTICIPANT_SCOPE        Participants used for schedule generation
  SCHEDULE_SEED            Shuffle seed for reproducible schedules
  RUST_LOG                 Log filter (logs go to stderr)
";

/// Administrative command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    GenerateSchedule {
        event_id: EventId,
        required_games: i32,
    },
    CreateGame {
        matchup_id: MatchupId,
        game_number: i32,
        status: GameStatus,
    },
    SubmitScore {
        game_id: GameId,
        score_a: i32,
        score_b: i32,
    },
    Standings {
        event_id: EventId,
    },
    Recompute {
        event_id: EventId,
    },
    Resolve {
        matchup_id: MatchupId,
    },
    ClearSchedule {
        event_id: EventId,
    },
    Matchups {
        event_id: EventId,
    },
    Games {
        matchup_id: MatchupId,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::GenerateSchedule { .. } => "generate-schedule",
            Command::CreateGame { .. } => "create-game",
            Command::SubmitScore { .. } => "submit-score",
            Command::Standings { .. } => "standings",
            Command::Recompute { .. } => "recompute",
            Command::Resolve { .. } => "resolve",
            Command::ClearSchedule { .. } => "clear-schedule",
            Command::Matchups { .. } => "matchups",
            Command::Games { .. } => "games",
        }
    }
}

struct Args {
    database_url: Option<String>,
    scope: Option<ParticipantScope>,
    seed: Option<u64>,
    command: Command,
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let database_url = pargs.opt_value_from_str("--db-url")?;
    let scope = pargs.opt_value_from_str("--scope")?;
    let seed = pargs.opt_value_from_str("--seed")?;

    let subcommand = pargs
        .subcommand()?
        .ok_or_else(|| anyhow::anyhow!("Missing command (see --help)"))?;

    let command = match subcommand.as_str() {
        "generate-schedule" => Command::GenerateSchedule {
            event_id: pargs.value_from_str("--event")?,
            required_games: pargs.value_from_str("--required-games")?,
        },
        "create-game" => Command::CreateGame {
            matchup_id: pargs.value_from_str("--matchup")?,
            game_number: pargs.value_from_str("--number")?,
            status: pargs.opt_value_from_str("--status")?.unwrap_or_default(),
        },
        "submit-score" => Command::SubmitScore {
            game_id: pargs.value_from_str("--game")?,
            score_a: pargs.value_from_str("--score-a")?,
            score_b: pargs.value_from_str("--score-b")?,
        },
        "standings" => Command::Standings {
            event_id: pargs.value_from_str("--event")?,
        },
        "recompute" => Command::Recompute {
            event_id: pargs.value_from_str("--event")?,
        },
        "resolve" => Command::Resolve {
            matchup_id: pargs.value_from_str("--matchup")?,
        },
        "clear-schedule" => Command::ClearSchedule {
            event_id: pargs.value_from_str("--event")?,
        },
        "matchups" => Command::Matchups {
            event_id: pargs.value_from_str("--event")?,
        },
        "games" => Command::Games {
            matchup_id: pargs.value_from_str("--matchup")?,
        },
        other => anyhow::bail!("Unknown command: {other} (see --help)"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}");
    }

    Ok(Args {
        database_url,
        scope,
        seed,
        command,
    })
}

async fn run(
    engine: &TournamentEngine<PgTournamentStore>,
    command: &Command,
) -> Result<serde_json::Value, Error> {
    let value = match *command {
        Command::GenerateSchedule {
            event_id,
            required_games,
        } => serde_json::to_value(engine.generate_schedule(event_id, required_games).await?),
        Command::CreateGame {
            matchup_id,
            game_number,
            status,
        } => serde_json::to_value(
            engine
                .create_game(NewGame {
                    matchup_id,
                    game_number,
                    status,
                    scheduled_at: None,
                })
                .await?,
        ),
        Command::SubmitScore {
            game_id,
            score_a,
            score_b,
        } => serde_json::to_value(engine.submit_game_score(game_id, score_a, score_b).await?),
        Command::Standings { event_id } => {
            serde_json::to_value(engine.get_standings(event_id).await?)
        }
        Command::Recompute { event_id } => {
            serde_json::to_value(engine.recompute_standings(event_id).await?)
        }
        Command::Resolve { matchup_id } => {
            serde_json::to_value(engine.resolve_matchup(matchup_id).await?)
        }
        Command::ClearSchedule { event_id } => {
            serde_json::to_value(engine.clear_schedule(event_id).await?)
        }
        Command::Matchups { event_id } => {
            serde_json::to_value(engine.list_matchups(event_id).await?)
        }
        Command::Games { matchup_id } => {
            serde_json::to_value(engine.list_games(matchup_id).await?)
        }
    }?;

    Ok(value)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = parse_args(pargs)?;

    logging::init();

    let config = AdminConfig::from_env(args.database_url, args.scope, args.seed)?;
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    let engine = TournamentEngine::new(Arc::new(db.tournament_store()), config.engine);

    let start = Instant::now();
    let result = run(&engine, &args.command).await;
    logging::log_performance(
        args.command.name(),
        start.elapsed().as_millis() as u64,
        Some(&format!("{:?}", args.command)),
    );

    db.close().await;

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            let client_message = match err.downcast_ref::<EngineError>() {
                Some(engine_err) => engine_err.client_message(),
                None => err.to_string(),
            };
            logging::log_command_failure(args.command.name(), &client_message, &format!("{err:#}"));
            Err(anyhow::anyhow!(client_message))
        }
    }
}

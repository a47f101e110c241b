//! Replay a colonist.io game log and print the resulting state.

use anyhow::Context;
use clap::Parser;
use colonist_core::{
    parse_game, replay, Board, BoardRecords, GameState, NoLocator, ReplayConfig, ScriptedLocator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "colonist-replay")]
#[command(about = "Replay a colonist.io game log")]
struct Cli {
    /// Game log text, as copied from the game chat
    log: PathBuf,
    /// Board layout (hexes and ports) as JSON
    #[arg(long, conflicts_with = "random_board")]
    board: Option<PathBuf>,
    /// Use a shuffled standard board seeded with this value
    #[arg(long, value_name = "SEED")]
    random_board: Option<u64>,
    /// Recorded build positions per player as JSON
    #[arg(long)]
    placements: Option<PathBuf>,
    /// Replay rules as JSON
    #[arg(long, env = "REPLAY_CONFIG")]
    config: Option<PathBuf>,
    /// Print the parsed events instead of replaying them
    #[arg(long)]
    events: bool,
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_board(cli: &Cli) -> anyhow::Result<Board> {
    if let Some(seed) = cli.random_board {
        return Ok(Board::random(&mut StdRng::seed_from_u64(seed)));
    }
    let Some(path) = &cli.board else {
        return Ok(Board::new());
    };
    let records: BoardRecords = serde_json::from_str(&read(path)?)
        .with_context(|| format!("parsing board {}", path.display()))?;
    Board::from_records(&records).with_context(|| format!("building board {}", path.display()))
}

fn load_config(cli: &Cli) -> anyhow::Result<ReplayConfig> {
    match &cli.config {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("parsing config {}", path.display())),
        None => Ok(ReplayConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let text = read(&cli.log)?;

    if cli.events {
        let log = parse_game(&text).with_context(|| format!("parsing {}", cli.log.display()))?;
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }

    let mut game = GameState::new(load_board(&cli)?, load_config(&cli)?);
    match &cli.placements {
        Some(path) => {
            let mut locator = ScriptedLocator::from_json(&read(path)?)
                .with_context(|| format!("parsing placements {}", path.display()))?;
            replay(&mut game, &text, &mut locator)
                .with_context(|| format!("replaying {}", cli.log.display()))?;
            if locator.remaining() > 0 {
                info!(unused = locator.remaining(), "placements left over after replay");
            }
        }
        None => replay(&mut game, &text, NoLocator)
            .with_context(|| format!("replaying {}", cli.log.display()))?,
    }

    println!("{}", serde_json::to_string_pretty(&game.summary())?);
    Ok(())
}

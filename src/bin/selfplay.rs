use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use reversi_agent::ai::{HeuristicKind, QNetworkModel};
use reversi_agent::checkpoint::CheckpointManager;
use reversi_agent::config::AppConfig;
use reversi_agent::store::{
    ExperienceStore, InMemoryStore, JsonResultsFile, JsonlStore, ResultsSink,
};
use reversi_agent::training::{
    Contestant, Learner, SelfPlayOrchestrator, Trainer, TrainerHandle,
};

const LEARNER_NAME: &str = "dqn";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Side {
    /// Exploring learner that trains on its own moves
    Learned,
    /// The same learner playing its best move, without training
    Greedy,
    Search,
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HeuristicArg {
    Positional,
    Mobility,
    FlipCount,
    Advanced,
    Random,
}

impl From<HeuristicArg> for HeuristicKind {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::Positional => HeuristicKind::Positional,
            HeuristicArg::Mobility => HeuristicKind::Mobility,
            HeuristicArg::FlipCount => HeuristicKind::FlipCount,
            HeuristicArg::Advanced => HeuristicKind::Advanced,
            HeuristicArg::Random => HeuristicKind::Random,
        }
    }
}

/// Run self-play batches between two contestants, training the learner.
#[derive(Parser)]
#[command(name = "selfplay", about = "Othello self-play with minimax and Q-learning")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Contestant in the first seat
    #[arg(long, value_enum, default_value = "learned")]
    first: Side,

    /// Contestant in the second seat
    #[arg(long, value_enum, default_value = "search")]
    second: Side,

    /// Override number of batches
    #[arg(long)]
    batches: Option<usize>,

    /// Override matches per batch
    #[arg(long)]
    games: Option<usize>,

    /// Override search depth
    #[arg(long)]
    depth: Option<usize>,

    /// Override search heuristic
    #[arg(long, value_enum)]
    heuristic: Option<HeuristicArg>,

    /// Override the base seed
    #[arg(long)]
    seed: Option<u64>,

    /// Resume the learner from its latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Print a config file with all defaults and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(batches) = cli.batches {
        config.selfplay.batches = batches;
    }
    if let Some(games) = cli.games {
        config.selfplay.games_per_batch = games;
    }
    if let Some(depth) = cli.depth {
        config.search.depth = depth;
    }
    if let Some(heuristic) = cli.heuristic {
        config.search.heuristic = heuristic.into();
    }
    if let Some(seed) = cli.seed {
        config.selfplay.base_seed = seed;
    }
    config.validate().context("validating configuration")?;

    let (store, results): (Arc<dyn ExperienceStore>, Arc<dyn ResultsSink>) =
        if config.storage.persist {
            let store = JsonlStore::open(&config.storage.data_dir).with_context(|| {
                format!("opening data directory {}", config.storage.data_dir.display())
            })?;
            let store: Arc<dyn ExperienceStore> = Arc::new(store);
            let results: Arc<dyn ResultsSink> =
                Arc::new(JsonResultsFile::new(&config.storage.results_file));
            (store, results)
        } else {
            let memory = Arc::new(InMemoryStore::new());
            let store: Arc<dyn ExperienceStore> = memory.clone();
            let results: Arc<dyn ResultsSink> = memory;
            (store, results)
        };

    let checkpoints = CheckpointManager::new(config.checkpoint.clone());

    let wants_learner = [cli.first, cli.second]
        .iter()
        .any(|side| matches!(side, Side::Learned | Side::Greedy));
    let learner: Option<Arc<dyn Learner>> = if wants_learner {
        let model = QNetworkModel::new(&config.model);
        let mut trainer = Trainer::new(model, config.trainer.clone())
            .with_name(LEARNER_NAME)
            .with_store(store);
        if cli.resume {
            match checkpoints.scoped(LEARNER_NAME).load_latest() {
                Ok(data) => {
                    if let Err(e) = trainer.restore(&data) {
                        warn!("could not restore learner from {} ({e}), starting fresh", data.path.display());
                    }
                }
                Err(e) => warn!("no checkpoint to resume from ({e}), starting fresh"),
            }
        }
        let handle: Arc<dyn Learner> = Arc::new(TrainerHandle::new(trainer));
        Some(handle)
    } else {
        None
    };

    let contestant = |side: Side| match (side, &learner) {
        (Side::Learned, Some(learner)) => Contestant::learned(Arc::clone(learner)),
        (Side::Greedy, Some(learner)) => Contestant::greedy(Arc::clone(learner)),
        (Side::Search, _) | (Side::Learned | Side::Greedy, None) => Contestant::search(
            config.search.depth,
            config.search.heuristic,
            config.search.pruning(),
        ),
        (Side::Random, _) => Contestant::random(),
    };
    let first = contestant(cli.first);
    let second = contestant(cli.second);

    let orchestrator = SelfPlayOrchestrator::new(config.selfplay.clone())
        .context("starting self-play workers")?
        .with_results(results)
        .with_checkpoints(checkpoints);

    info!(
        "{} vs {}: {} batches of {} games",
        first.name(),
        second.name(),
        config.selfplay.batches,
        config.selfplay.games_per_batch
    );
    let reports = orchestrator.run(&first, &second);

    let (mut first_wins, mut second_wins, mut draws) = (0, 0, 0);
    for report in &reports {
        first_wins += report.record.first_bot_wins;
        second_wins += report.record.second_bot_wins;
        draws += report.record.draws;
    }
    println!(
        "{}: {} wins | {}: {} wins | {} draws",
        first.name(),
        first_wins,
        second.name(),
        second_wins,
        draws
    );

    Ok(())
}

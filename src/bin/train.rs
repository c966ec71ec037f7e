use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::prelude::*;

use hive_learner::ai::{ActionSpace, DqnAgent};
use hive_learner::checkpoint::CheckpointManager;
use hive_learner::config::AppConfig;
use hive_learner::game::RulesDelegate;
use hive_learner::training::Trainer;

/// Train a Hive value network via self-play on the sandbox rules.
#[derive(Parser)]
#[command(name = "train", about = "Train a Hive value network via self-play")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f32>,

    /// Override exploration rate
    #[arg(long)]
    epsilon: Option<f32>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Load network weights from this model file before training
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write the trained network to this model file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Games against the random agent after training (0 to skip)
    #[arg(long, default_value_t = 0)]
    eval_games: usize,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(cli.log_level))
        .init();

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.agent.learning_rate = lr;
    }
    if let Some(epsilon) = cli.epsilon {
        app_config.agent.epsilon = epsilon;
        app_config.agent.epsilon_min = app_config.agent.epsilon_min.min(epsilon);
    }
    if let Some(seed) = cli.seed {
        app_config.training.seed = seed;
    }
    app_config.validate().context("invalid configuration after overrides")?;

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&app_config)?);
        return Ok(());
    }

    let rules = app_config.board.sandbox_rules();
    let space = ActionSpace::for_state(&rules.initial_state());
    let mut agent = DqnAgent::new(app_config.agent.clone(), space, app_config.training.seed);

    if let Some(path) = &cli.model {
        agent
            .load_model(path)
            .with_context(|| format!("loading model from {}", path.display()))?;
        info!(path = %path.display(), "loaded model");
    }

    let manager = CheckpointManager::new(app_config.checkpoint.clone())
        .context("preparing checkpoint directory")?;
    let mut resumed = None;
    if cli.resume {
        match manager.load_latest() {
            Ok(data) => {
                agent
                    .load_model(&data.model_path())
                    .with_context(|| format!("loading checkpoint {}", data.path.display()))?;
                info!(
                    episode = data.metadata.episode,
                    games = data.metadata.stats.total_games,
                    "resumed from checkpoint"
                );
                resumed = Some((data.metadata.episode, data.metadata.stats));
            }
            Err(e) => warn!(error = %e, "no checkpoint found, starting fresh"),
        }
    }

    let mut trainer = Trainer::new(app_config.training.clone(), agent).with_checkpoints(manager);
    if let Some((episode, stats)) = resumed {
        trainer.set_episodes_played(episode);
        trainer.restore_stats(stats);
    }

    let interrupt = trainer.interrupt_handle();
    ctrlc::set_handler(move || interrupt.store(true, Ordering::Relaxed))
        .context("installing Ctrl-C handler")?;

    let stats = trainer
        .train_self_play(&rules, app_config.training.num_episodes)
        .context("self-play training failed")?;

    println!("-------------------------------------------");
    println!("Games played: {}", stats.total_games);
    println!("  player one wins: {}", stats.wins);
    println!("  player two wins: {}", stats.losses);
    println!("  draws:           {}", stats.draws);
    println!("  abandoned:       {}", stats.abandoned);

    if cli.eval_games > 0 && !trainer.is_interrupted() {
        let report = trainer
            .evaluate(&rules, cli.eval_games)
            .context("evaluation failed")?;
        println!(
            "Eval vs Random ({} games): {:.1}% win rate ({} lost, {} drawn)",
            report.games,
            report.win_rate() * 100.0,
            report.losses,
            report.draws
        );
    }

    if let Some(path) = &cli.save {
        trainer
            .agent()
            .save_model(path)
            .with_context(|| format!("saving model to {}", path.display()))?;
        info!(path = %path.display(), "saved model");
    }
    Ok(())
}

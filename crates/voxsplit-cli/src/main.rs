//! voxsplit - loop PCM files and split them into vocals and accompaniment
//!
//! Subcommands:
//! - `voxsplit play [--source input|vocal|bgm]` - Loop a PCM file until Enter
//! - `voxsplit separate` - Split the input into vocal and bgm files
//! - `voxsplit init-config` - Write the default config file

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use voxsplit_core::config::{self, AppConfig, AppContext, PlaybackSource};
use voxsplit_core::playback::StreamingPlaybackEngine;
use voxsplit_core::separation::{JobOutcome, NativeEngine, SeparationOrchestrator};

#[derive(Parser)]
#[command(name = "voxsplit")]
#[command(about = "PCM playback and vocal/accompaniment separation")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/voxsplit/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loop a PCM file on the default output device until Enter is pressed
    Play {
        /// Which file to play
        #[arg(short, long, value_enum, default_value = "input")]
        source: Source,
    },

    /// Separate the input file into vocal and bgm files
    Separate,

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Input,
    Vocal,
    Bgm,
}

impl From<Source> for PlaybackSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Input => PlaybackSource::Input,
            Source::Vocal => PlaybackSource::Vocal,
            Source::Bgm => PlaybackSource::Bgm,
        }
    }
}

fn main() -> Result<()> {
    // RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    match cli.command {
        Commands::InitConfig { force } => init_config(&config_path, force),
        Commands::Play { source } => {
            let ctx = load_context(&config_path)?;
            play(&ctx, source.into())
        }
        Commands::Separate => {
            let ctx = load_context(&config_path)?;
            separate(&ctx)
        }
    }
}

fn load_context(path: &std::path::Path) -> Result<AppContext> {
    let app_config: AppConfig = config::load_config(path)?;
    let ctx = AppContext::new(app_config).context("Invalid stream settings in config")?;
    ctx.prepare()
        .with_context(|| format!("Failed to create {:?}", ctx.root_dir()))?;
    Ok(ctx)
}

fn init_config(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config::save_config(&AppConfig::default(), path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn play(ctx: &AppContext, source: PlaybackSource) -> Result<()> {
    let path = ctx.source_path(source);
    let mut engine = StreamingPlaybackEngine::new(Arc::new(ctx.playback_backend()));
    engine
        .start(&path, ctx.stream())
        .with_context(|| format!("Failed to play {:?}", path))?;

    println!("Playing {} ({}), press Enter to stop", path.display(), ctx.stream());
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    let summary = engine.stop()?;
    log::info!(
        "Stopped after {} chunks, {} bytes, {} loops",
        summary.chunks_written,
        summary.bytes_written,
        summary.loops
    );
    Ok(())
}

fn separate(ctx: &AppContext) -> Result<()> {
    let engine = NativeEngine::load(&ctx.library_locator())
        .context("Failed to load the separation library")?;
    let orchestrator = SeparationOrchestrator::new(Arc::new(engine));

    let job = ctx.separation_job();
    let report = orchestrator.run(&job)?;

    match report.outcome {
        JobOutcome::EmptyInput => println!("{} is empty, nothing to do", job.input.display()),
        JobOutcome::Completed => {
            println!("Audio duration: {:.2}s", report.duration_secs);
            println!("Processing time: {:.2}s", report.processing_time.as_secs_f64());
            println!("Vocal: {}", job.vocal_output.display());
            println!("Bgm: {}", job.bgm_output.display());
        }
    }
    Ok(())
}

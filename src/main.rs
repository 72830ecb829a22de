use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipscribe::utils;
use clipscribe::{Cli, Commands, Config, ProgressCallback, TranscriptionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "clipscribe=debug"
    } else {
        "clipscribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Check for required external dependencies (non-fatal)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let mut config = Config::load()?;

    match cli.command {
        Commands::DownloadVideo { url } => {
            let pipeline = TranscriptionPipeline::new(config)?;
            let path = pipeline.download_video(&url).await?;
            println!("{}", path.display());
        }
        Commands::DownloadAudio { url } => {
            let pipeline = TranscriptionPipeline::new(config)?;
            let path = pipeline.download_audio(&url).await?;
            println!("{}", path.display());
        }
        Commands::ExtractText { path, provider } => {
            if let Some(provider) = provider {
                config.asr.provider = provider;
            }
            let pipeline = TranscriptionPipeline::new(config)?;

            let (bar, callback) = progress_reporter();
            let result = pipeline.extract_text(&path, Some(&callback)).await;
            bar.finish_and_clear();
            println!("{}", result?);
        }
        Commands::Transcribe { url, provider } => {
            if let Some(provider) = provider {
                config.asr.provider = provider;
            }
            let pipeline = TranscriptionPipeline::new(config)?;

            tracing::info!("starting transcription for {}", url);
            let (bar, callback) = progress_reporter();
            let result = pipeline.transcribe_from_url(&url, Some(&callback)).await;
            bar.finish_and_clear();
            println!("{}", result?);
        }
        Commands::Config { .. } => {
            config.display();
        }
    }

    Ok(())
}

/// Progress bar driven by the ASR status callback
fn progress_reporter() -> (ProgressBar, ProgressCallback) {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap(),
    );

    let sink = bar.clone();
    let callback: ProgressCallback = Box::new(move |progress, message| {
        sink.set_position(u64::from(progress));
        sink.set_message(message.to_string());
    });

    (bar, callback)
}

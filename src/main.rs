use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;
use tokio_util::sync::CancellationToken;

use self::backend::fetch::HttpFetcher;
use self::backend::html_parser::scraper::ScraperParser;
use self::backend::manga_downloader::pdf_merger::ChapterPdfMerger;
use self::backend::scrape::{ScrapeOutcome, ScrapeParameters, ScrapeRunner};
use self::backend::volume::VolumeAssembler;
use self::cli::{CliArgs, Commands, ScrapeArgs, VolumesArgs};
use self::config::{DEFAULT_CONFIG_FILE, ScraperConfig};
use self::logger::{ILogger, Logger, init_logger};

mod backend;
mod cli;
mod config;
mod global;
mod logger;

async fn scrape(args: ScrapeArgs) -> color_eyre::Result<()> {
    let mut config = ScraperConfig::load(args.config.as_deref()).map_err(|e| eyre!("Could not read the config file: {e}"))?;

    args.apply_to(&mut config.scrape);

    let parameters = ScrapeParameters::try_from(&config.scrape)?;

    let fetcher = HttpFetcher::new(config.fetch, Logger)?;
    let runner = ScrapeRunner::new(fetcher, ScraperParser, Logger);

    let cancellation = CancellationToken::new();
    let task_cancellation = cancellation.clone();

    let mut scrape_task = tokio::spawn(async move { runner.run(&parameters, task_cancellation).await });

    let outcome = tokio::select! {
        outcome = &mut scrape_task => outcome?,
        _ = tokio::signal::ctrl_c() => {
            Logger.warn("Stopping after the current chapter...");
            cancellation.cancel();
            scrape_task.await?
        }
    };

    match outcome {
        ScrapeOutcome::ListingUnavailable => Err(eyre!("The chapter list could not be retrieved")),
        ScrapeOutcome::Completed { .. } | ScrapeOutcome::Cancelled { .. } => Ok(()),
    }
}

fn volumes(args: VolumesArgs) -> color_eyre::Result<()> {
    let config = ScraperConfig::load(args.config.as_deref()).map_err(|e| eyre!("Could not read the config file: {e}"))?;

    let volumes_config = args.apply_to(config.volumes);

    let volumes = VolumeAssembler::new(Logger)
        .assemble(&args.root, &args.covers_directory(), &args.output_directory(), volumes_config)
        .map_err(|e| eyre!("Could not create volumes: {e}"))?;

    Logger.inform(format!("Created {} volumes in {}", volumes.len(), args.output_directory().display()));

    Ok(())
}

fn init(path: Option<PathBuf>) -> color_eyre::Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if ScraperConfig::write_if_not_exists(&path)? {
        Logger.inform(format!("Config file written to {}", path.display()));
    } else {
        Logger.warn(format!("{} already exists, it was not modified", path.display()));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_logger();

    let cli_args = CliArgs::parse();

    match cli_args.command {
        Commands::Scrape(args) => scrape(args).await,
        Commands::Merge { directory } => {
            ChapterPdfMerger::new(Logger)
                .merge_all(&directory)
                .map_err(|e| eyre!("Could not merge {}: {e}", directory.display()))?;
            Ok(())
        },
        Commands::Volumes(args) => volumes(args),
        Commands::Init { path } => init(path),
    }
}

mod cli;

use anyhow::Context;
use archive_harvest::{
    CrawlConfig, Crawler, DatasetSplitter, DownloadConfig, Downloader, FilenameValidator,
    HttpFetcher, HttpRenderer, SplitConfig,
};
use clap::Parser;
use cli::{CheckArgs, Cli, Commands, DownloadArgs, LinksArgs, PipelineArgs, SplitArgs};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, info_span, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli).context("Failed to initialize logging")?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let result = match &cli.command {
        Commands::Links(args) => handle_links_command(&cli, args).await,
        Commands::Download(args) => handle_download_command(&cli, args, &mut rng).await,
        Commands::Check(args) => handle_check_command(&cli, args).await,
        Commands::Split(args) => handle_split_command(&cli, args, &mut rng).await,
        Commands::Pipeline(args) => handle_pipeline_command(&cli, args, &mut rng).await,
    };

    if let Err(e) = result {
        error!("Operation failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Stderr output plus an optional per-run file in `--log-dir`.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let now = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
            let path = dir.join(format!("{}_{}.log", command_name(&cli.command), now));
            let file = File::create(&path)
                .with_context(|| format!("Cannot create log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Links(_) => "get_image_links",
        Commands::Download(_) => "download_images",
        Commands::Check(_) => "check_filenames",
        Commands::Split(_) => "create_datasets",
        Commands::Pipeline(_) => "pipeline",
    }
}

fn parser_dir(cli: &Cli) -> PathBuf {
    cli.data_dir.join("parser")
}

fn secs(value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("Invalid sleep period: {}", value))
}

fn crawl_config(cli: &Cli, args: &LinksArgs) -> anyhow::Result<CrawlConfig> {
    Ok(CrawlConfig {
        base_url: args.base_url.clone(),
        first_page: args.first_page,
        last_page: args.last_page,
        render_timeout: Duration::from_secs(args.timeout),
        delay: secs(args.sleep)?,
        progress_every: args.progress_every,
        links_file: parser_dir(cli).join(&args.links_file),
    })
}

fn renderer(args: &LinksArgs) -> anyhow::Result<HttpRenderer> {
    Ok(HttpRenderer::new()?.with_poll_interval(Duration::from_millis(args.poll_ms)))
}

fn download_config(cli: &Cli, args: &DownloadArgs) -> anyhow::Result<DownloadConfig> {
    Ok(DownloadConfig {
        links_file: parser_dir(cli).join(&args.links_file),
        download_dir: cli.data_dir.join(&args.download_dir),
        log_file: parser_dir(cli).join(&args.log_file),
        delay: secs(args.sleep)?,
        sample: args.sample,
        skip_existing: args.skip_existing,
        progress_every: args.progress_every,
    })
}

async fn write_summary<T: Serialize>(path: Option<&Path>, summary: &T) -> anyhow::Result<()> {
    if let Some(path) = path {
        let json_content =
            serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        tokio::fs::write(path, json_content)
            .await
            .context("Failed to write summary file")?;
        info!("Summary written to: {}", path.display());
    }
    Ok(())
}

async fn handle_links_command(cli: &Cli, args: &LinksArgs) -> anyhow::Result<()> {
    let config = crawl_config(cli, args)?;
    info!("Writing image links to {}", config.links_file.display());

    // Crawl the page range into a fresh link log
    let mut crawler = Crawler::new(renderer(args)?, config);
    let summary = crawler.run().await?;

    // Output summary
    write_summary(cli.summary.as_deref(), &summary).await
}

async fn handle_download_command(cli: &Cli, args: &DownloadArgs, rng: &mut StdRng) -> anyhow::Result<()> {
    let config = download_config(cli, args)?;
    info!(
        "Downloading links from {} into {}",
        config.links_file.display(),
        config.download_dir.display()
    );

    // Download every selected link, streaming the CSV log
    let mut downloader = Downloader::new(HttpFetcher::new()?, config)?;
    let summary = downloader.run(rng).await?;

    // Output summary
    write_summary(cli.summary.as_deref(), &summary).await
}

async fn handle_check_command(cli: &Cli, args: &CheckArgs) -> anyhow::Result<()> {
    let directory = cli.data_dir.join(&args.directory);

    // Audit file names one level deep
    let report = FilenameValidator::new()?.check_directory(&directory)?;

    // Output summary
    write_summary(cli.summary.as_deref(), &report).await
}

async fn handle_split_command(cli: &Cli, args: &SplitArgs, rng: &mut StdRng) -> anyhow::Result<()> {
    let config = SplitConfig {
        log_file: parser_dir(cli).join(&args.log_file),
        raw_dir: cli.data_dir.join(&args.raw_dir),
        dataset_dir: cli.data_dir.clone(),
        start_year: args.start_year,
        end_year: args.end_year,
    };
    info!(
        "Building splits for {}..={} from {}",
        config.start_year,
        config.end_year,
        config.log_file.display()
    );

    // Plan three complete issues per year, then copy them into the splits
    let summary = DatasetSplitter::new(config)?.run(rng)?;

    // Output summary
    write_summary(cli.summary.as_deref(), &summary).await
}

async fn handle_pipeline_command(cli: &Cli, args: &PipelineArgs, rng: &mut StdRng) -> anyhow::Result<()> {
    let crawl = crawl_config(cli, &args.links)?;
    let download = DownloadConfig {
        links_file: crawl.links_file.clone(),
        download_dir: cli.data_dir.join("raw_data"),
        log_file: parser_dir(cli).join("download_log.csv"),
        delay: secs(args.download_sleep)?,
        sample: args.sample,
        skip_existing: args.skip_existing,
        ..DownloadConfig::default()
    };
    let raw_dir = download.download_dir.clone();

    // Step 1: crawl links
    let crawl_summary = Crawler::new(renderer(&args.links)?, crawl)
        .with_span(info_span!("pipeline", stage = "links"))
        .run()
        .await?;

    // Step 2: download images
    let download_summary = Downloader::new(HttpFetcher::new()?, download)?
        .with_span(info_span!("pipeline", stage = "download"))
        .run(rng)
        .await?;

    // Step 3: audit downloaded names
    let report = FilenameValidator::new()?
        .with_span(info_span!("pipeline", stage = "check"))
        .check_directory(&raw_dir)?;

    // Output combined summary
    let summary = serde_json::json!({
        "links": crawl_summary,
        "download": download_summary,
        "check": report,
    });
    write_summary(cli.summary.as_deref(), &summary).await
}

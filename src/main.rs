//! Command-line front-end for animek.
//!
//! Every subcommand calls one service operation and prints the resulting view
//! model as JSON on stdout.

use std::time::Instant;

use animek::config::Config;
use animek::endpoint::Section;
use animek::logging::setup_logging;
use animek::service::AnimeService;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use dotenv::dotenv;
use log::debug;
use log::info;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "animek", version, about = "Browse an anime scraper API from the terminal")]
struct Cli {
    /// Print JSON on a single line.
    #[arg(long, global = true)]
    json_compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a section: home, recent, popular, ongoing, completed, movies, batch or genre:<id>.
    List {
        #[arg(default_value = "home")]
        section: Section,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show an anime with its episodes.
    Detail { anime_id: String },
    /// Show an episode with its streaming servers and downloads.
    Episode { episode_id: String },
    /// Resolve a streaming server to a URL or embed markup.
    Stream { server_id: String },
    /// Resolve the batch download links of an anime.
    Batch { anime_id: String },
    /// Search anime by title.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// List genres.
    Genres,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let init_start = Instant::now();
    let config = load_config()?;
    let service = AnimeService::from_config(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, cancelling.");
            ctrl_c.cancel();
        }
    });

    run(&service, cli.command, cli.json_compact, &cancel).await?;

    let stats = service.stats();
    debug!(
        "Done in {:.2}s (dropped: {} summaries, {} episodes, {} servers).",
        init_start.elapsed().as_secs_f64(),
        stats.dropped_summaries(),
        stats.dropped_episodes(),
        stats.dropped_servers()
    );
    Ok(())
}

fn load_config() -> Result<Config> {
    let mut config = Config::new();
    config.load()?;
    setup_logging(&config)?;
    debug!("Using {} (source: {})", config.api_url, config.api_source);
    Ok(config)
}

async fn run(
    service: &AnimeService,
    command: Command,
    compact: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Command::List { section, page } => {
            print_json(&service.anime_summaries(&section, page, cancel).await?, compact)
        }
        Command::Detail { anime_id } => {
            print_json(&service.anime_detail(&anime_id, cancel).await?, compact)
        }
        Command::Episode { episode_id } => {
            print_json(&service.episode(&episode_id, cancel).await?, compact)
        }
        Command::Stream { server_id } => print_json(
            &service.resolve_streaming_url(&server_id, cancel).await?,
            compact,
        ),
        Command::Batch { anime_id } => print_json(
            &service.resolve_batch_download(&anime_id, cancel).await?,
            compact,
        ),
        Command::Search { query, page } => {
            print_json(&service.search_anime(&query, page, cancel).await?, compact)
        }
        Command::Genres => print_json(&service.genres(cancel).await?, compact),
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");
    Ok(())
}

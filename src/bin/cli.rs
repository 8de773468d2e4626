use anyhow::{Context, Result};
use beets_tidal as lib;
use clap::{Parser, Subcommand};
use lib::api::tidal::TidalProvider;
use lib::api::Provider;
use lib::config::Config;
use lib::library::BeetsLibrary;
use lib::models::{SyncOptions, TrackInfo};
use lib::retry::RetryPolicy;
use std::path::PathBuf;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "beet-tidal", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch Tidal popularity for library tracks
    Tidalsync {
        /// Re-fetch popularity even when it is already set
        #[arg(short, long)]
        force: bool,

        /// Also fetch album popularity
        #[arg(short, long)]
        albums: bool,
    },
    /// Store a Tidal token JSON as the session file (interactive)
    Auth,
    /// Refresh the stored Tidal token to check the credentials
    AuthTest,
    /// Show catalogue metadata for a Tidal track id
    Lookup {
        id: String,
    },
    /// Search the Tidal catalogue for tracks
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Validate config file and exit
    ConfigValidate,
}

/// Explicit --config wins; otherwise use the app directory's config file
/// when present and built-in defaults when not.
fn resolve_config_path(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(p.clone()),
        None => {
            let p = lib::config::app_dir().join("beets-tidal.toml");
            if p.exists() {
                Some(p)
            } else {
                None
            }
        }
    }
}

/// Logs go to stdout and, when `log_dir` is set, to a daily-rotated file.
fn init_logging(cfg: &Config) -> Result<Option<WorkerGuard>> {
    let _ = LogTracer::init();
    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "beets-tidal.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);
    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;
    Ok(guard)
}

fn print_track(t: &TrackInfo) {
    println!("- {}: {}", t.id, t.title);
    if let Some(artist) = &t.artist {
        println!("    artist: {}", artist);
    }
    if let Some(album) = &t.album {
        println!("    album: {}", album);
    }
    if let Some(isrc) = &t.isrc {
        println!("    isrc: {}", isrc);
    }
    if let Some(length) = t.length {
        println!("    length: {}:{:02}", length / 60, length % 60);
    }
    if let Some(p) = t.popularity {
        println!("    popularity: {}", p);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_ref());

    if let Commands::ConfigValidate = cli.command {
        let Some(path) = config_path else {
            println!("No config file found; built-in defaults are valid.");
            return Ok(());
        };
        match Config::from_path(&path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    let cfg = match &config_path {
        Some(p) => Config::from_path(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => Config::default(),
    };
    let _guard = init_logging(&cfg)?;

    match cli.command {
        Commands::Tidalsync { force, albums } => {
            let mut library = BeetsLibrary::open(&cfg.library)?;
            let provider = TidalProvider::new(&cfg);
            if !provider.is_authenticated() {
                eprintln!("Tidal is not authenticated. Run `beet-tidal auth` or configure client credentials.");
                std::process::exit(1);
            }
            let report = lib::sync::sync_popularity(
                &mut library,
                &provider,
                SyncOptions { force, albums },
                RetryPolicy::from_config(&cfg.tidal),
            )
            .await
            .context("running tidalsync")?;
            println!("{}", report);
            if report.failed > 0 {
                eprintln!("Completed with {} failure(s).", report.failed);
                std::process::exit(1);
            }
        }
        Commands::Auth => {
            lib::api::tidal_auth::run_tidal_auth(&cfg)?;
        }
        Commands::AuthTest => {
            let provider = TidalProvider::new(&cfg);
            println!("Testing Tidal token refresh...");
            match provider.force_refresh().await {
                Ok(session) => {
                    println!(
                        "Tidal token refresh succeeded; token valid until {}.",
                        chrono::DateTime::from_timestamp(session.expiry_time as i64, 0)
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| session.expiry_time.to_string())
                    );
                }
                Err(e) => {
                    eprintln!("Tidal token refresh FAILED: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Lookup { id } => {
            let provider = TidalProvider::new(&cfg);
            let retry = RetryPolicy::from_config(&cfg.tidal);
            match retry.run("lookup", || provider.track(&id)).await? {
                Some(t) => print_track(&t),
                None => {
                    eprintln!("No Tidal track with id {}", id);
                    std::process::exit(1);
                }
            }
        }
        Commands::Search { query } => {
            let q = lib::util::sanitize_query(&query.join(" "));
            let provider = TidalProvider::new(&cfg);
            let hits = provider.search_tracks(&q).await?;
            if hits.is_empty() {
                println!("No Tidal tracks matched '{}'.", q);
            } else {
                println!("Matched {} Tidal track(s) for '{}':", hits.len(), q);
                for t in &hits {
                    print_track(t);
                }
            }
        }
        Commands::ConfigValidate => {}
    }

    Ok(())
}

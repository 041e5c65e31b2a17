//! Binary entrypoint for the Groveland CLI.
//!
//! Commands:
//! - `run` - start the engine with its maintenance scheduler
//! - `init` - create a starter `config.toml`
//! - `status` - print a summary of the persisted data directory

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;

use groveland::config::Config;
use groveland::farm::{
    load_sell_prices_from_json, load_templates_from_json, FarmServiceBuilder, PriceTable,
    SchedulerIntervals, SimScheduler,
};
use groveland::storage::FarmStoreBuilder;

#[derive(Parser)]
#[command(name = "groveland")]
#[command(about = "Farm economy and quest progression engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine until interrupted
    Run,
    /// Initialize a new configuration file
    Init,
    /// Show a summary of the persisted state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run => {
            let config = match config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            run(config).await
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
            Ok(())
        }
        Commands::Status => {
            let config = config.unwrap_or_default();
            status(&config)
        }
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Starting Groveland v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FarmStoreBuilder::new(&config.storage.data_dir).open()?);

    let mut builder = FarmServiceBuilder::new(
        config.economy.starting_balance,
        config.economy.max_coins_per_hour,
    )
    .with_history_limit(config.economy.history_limit)
    .with_store(Arc::clone(&store));

    if let Some(path) = &config.quests.template_file {
        let templates = load_templates_from_json(path)?;
        info!("Loaded {} quest templates from {}", templates.len(), path);
        builder = builder.with_templates(templates);
    }
    if let Some(path) = &config.economy.price_file {
        let prices: Arc<dyn PriceTable> = Arc::new(load_sell_prices_from_json(path)?);
        info!("Loaded sell prices from {}", path);
        builder = builder.with_prices(prices);
    }

    let service = Arc::new(builder.build());
    let scheduler = SimScheduler::spawn(
        service,
        SchedulerIntervals {
            autosell_secs: config.economy.autosell_interval_secs,
            expiry_sweep_secs: config.quests.expiry_sweep_secs,
            reset_check_secs: config.quests.reset_check_secs,
            stats_refresh_secs: config.economy.stats_refresh_secs,
            save_secs: config.storage.save_interval_secs,
        },
    );

    info!("Engine running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown requested, flushing state");
    scheduler.shutdown().await;
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let store = match FarmStoreBuilder::new(&config.storage.data_dir).open() {
        Ok(store) => store,
        Err(err) => {
            warn!("could not open store at {}: {}", config.storage.data_dir, err);
            println!("No data found at {}", config.storage.data_dir);
            return Ok(());
        }
    };

    let players = store.known_players()?;
    println!("Data directory: {}", config.storage.data_dir);
    println!("Known players:  {}", players.len());
    let mut total = 0u64;
    for player in &players {
        if let Some(wallet) = store.load_wallet(*player)? {
            total += wallet.coins;
        }
    }
    println!("Coins on disk:  {}", total);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    let level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    let _ = builder.try_init();
}

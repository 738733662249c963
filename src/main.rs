//! Trading bot entry point.

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toptick::config::Config;
use toptick::exchange::rest::BtcTurkClient;
use toptick::exchange::types::Side;
use toptick::exchange::ExchangeClient;
use toptick::metrics;
use toptick::strategy::StrategyWorker;
use toptick::utils::shutdown_signal;

/// Unattended top-of-book limit-order repositioning bot.
#[derive(Parser, Debug)]
#[command(name = "toptick")]
#[command(about = "Keeps one limit order per side at the top of the BTCTurk book")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both per-side workers (default).
    Run,

    /// Check configuration validity.
    CheckConfig,

    /// Check API credentials and print the account balance.
    CheckBalance,

    /// Print the current top of book and ticker.
    ShowBook,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("toptick=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckBalance) => cmd_check_balance().await,
        Some(Command::ShowBook) => cmd_show_book().await,
        Some(Command::Run) | None => cmd_run().await,
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("failed to load configuration: {}", e);
        e
    })?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration validation failed: {}", e))?;
    Ok(config)
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TOPTICK - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.btcturk_api_url);
    println!(
        "  Proxy: {}",
        match (&config.proxy_host, config.proxy_port) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            _ => "disabled".to_string(),
        }
    );
    println!("  Buy price limit: {}", config.buy_price_limit);
    println!("  Sell price limit: {}", config.sell_price_limit);
    println!(
        "  Metrics: {}",
        if config.metrics_enabled {
            format!("port {}", config.metrics_port)
        } else {
            "disabled".to_string()
        }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check API credentials and print the account balance.
async fn cmd_check_balance() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TOPTICK - BALANCE CHECK");
    println!("======================================================================");

    let config = load_config()?;
    println!("Host: {}", config.btcturk_api_url);

    print!("\n1. Creating client... ");
    let client = BtcTurkClient::new(&config)?;
    println!("OK");

    print!("\n2. Getting balance... ");
    match client.balance().await {
        Ok(balance) => {
            println!("OK");
            println!("   Money available:    {}", balance.money_available);
            println!("   Bitcoin available:  {}", balance.bitcoin_available);
            println!("   Maker fee rate:     {}", balance.maker_fee_rate);
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    print!("\n3. Getting open orders... ");
    match client.open_orders().await {
        Ok(orders) => {
            println!("OK");
            println!("   Open orders: {}", orders.len());
            for order in orders.iter().take(5) {
                println!(
                    "   - {} {} @ {} (id: {})",
                    order.side,
                    order.amount,
                    order.price,
                    order.id.as_deref().unwrap_or("?")
                );
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("BALANCE CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Print the current top of book and ticker.
async fn cmd_show_book() -> anyhow::Result<()> {
    let config = load_config()?;
    let client = BtcTurkClient::new(&config)?;

    let ticker = client.ticker().await?;
    println!("Ticker: last {} average {}", ticker.last, ticker.average);

    let book = client.order_book().await?;
    println!("Bids ({} levels):", book.bids.len());
    for level in book.bids.iter().take(5) {
        println!("  {} x {}", level.price, level.amount);
    }
    println!("Asks ({} levels):", book.asks.len());
    for level in book.asks.iter().take(5) {
        println!("  {} x {}", level.price, level.amount);
    }

    Ok(())
}

/// Run both per-side workers until a shutdown signal arrives.
async fn cmd_run() -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config()?;
    info!("Configuration loaded successfully");

    metrics::init_metrics();
    if config.metrics_enabled {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }

    let client = BtcTurkClient::new(&config)?;

    info!("========================================");
    info!("TOPTICK STARTED");
    info!("========================================");
    info!("API: {}", config.btcturk_api_url);
    info!("Buy price limit: {}", config.buy_price_limit);
    info!("Sell price limit: {}", config.sell_price_limit);
    info!("========================================");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let buy_worker = StrategyWorker::new(client.clone(), config.strategy_for(Side::Buy));
    let sell_worker = StrategyWorker::new(client, config.strategy_for(Side::Sell));

    let buy_handle = tokio::spawn(buy_worker.run(shutdown_rx.clone()));
    let sell_handle = tokio::spawn(sell_worker.run(shutdown_rx));

    shutdown_signal().await;
    shutdown_tx.send(true).ok();

    let _ = tokio::join!(buy_handle, sell_handle);
    info!("all workers stopped, exiting");

    Ok(())
}

//! Kaufbot - Guild Economy Bot
//!
//! Serves the platform's HTTP interactions endpoint:
//! - Cash and bank accounts with deposit/withdraw modals
//! - Four-stage purchase auctions settling into an ownership forest
//! - Periodic autosave and a final flush on shutdown

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kaufbot::bot::aliases::Aliases;
use kaufbot::bot::{commands, Bot};
use kaufbot::comms::discord::DiscordRest;
use kaufbot::comms::monitor::{Monitor, SharedMonitor};
use kaufbot::comms::transport::SharedTransport;
use kaufbot::config::Config;
use kaufbot::core::ledger::{LedgerStore, SharedLedger};
use kaufbot::data::transaction_log::{SharedTransactionLog, TransactionLog};
use kaufbot::server;

const SEP: &str = "===========================================================";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {}. Exiting.", config_path, e);
        std::process::exit(1);
    });

    // Setup logging
    let level = cfg.system.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // A panic anywhere ends the process; the watchdog restarts it
    std::panic::set_hook(Box::new(|panic| {
        error!("[BOT] Fatal: {}", panic);
        std::process::exit(1);
    }));

    info!("{}", SEP);
    info!("  {} - Guild Economy Bot", cfg.system.name);
    info!("{}", SEP);

    // Stores
    let ledger = LedgerStore::open(&cfg.storage.ledger_path, &cfg.economy).into_shared();
    let transactions = TransactionLog::open(&cfg.storage.transaction_log_path).into_shared();
    let monitor = Monitor::shared();

    // Platform REST client
    let rest = Arc::new(DiscordRest::new(&cfg.discord));
    if cfg.discord.register_commands {
        if let Err(e) = rest.register_commands(&commands::definitions()).await {
            warn!("[DISCORD] Command registration failed: {:#}", e);
        }
    }

    let aliases = Aliases::new(&cfg.aliases, &cfg.pairs);
    info!("[BOT] {} alias(es), {} paired bundle(s)", cfg.aliases.len(), cfg.pairs.len());
    info!(
        "[BOT] Auction: +{} per bid, {}s stages, {}s final stage",
        cfg.auction.bid_increment, cfg.auction.early_stage_secs, cfg.auction.final_stage_secs
    );

    let transport: SharedTransport = rest;
    let bot = Arc::new(Bot::new(
        ledger.clone(),
        transactions.clone(),
        transport,
        monitor.clone(),
        aliases,
        cfg.auction.clone(),
    ));

    // Autosave loops
    if cfg.storage.ledger_autosave_secs > 0 {
        tokio::spawn(autosave_ledger(
            ledger.clone(),
            monitor.clone(),
            Duration::from_secs(cfg.storage.ledger_autosave_secs),
        ));
    }
    if cfg.storage.transaction_log_autosave_secs > 0 {
        tokio::spawn(autosave_transactions(
            transactions.clone(),
            Duration::from_secs(cfg.storage.transaction_log_autosave_secs),
        ));
    }

    // HTTP server
    let listener = TcpListener::bind(&cfg.discord.listen_addr).await?;
    info!("[SERVER] Listening on {}", cfg.discord.listen_addr);
    axum::serve(listener, server::router(bot))
        .with_graceful_shutdown(shutdown_signal(cfg.system.restart_after_hours))
        .await?;

    // Final flush
    info!("[BOT] Shutting down, flushing stores...");
    if let Err(e) = ledger.lock().await.flush() {
        error!("[STORE] Final ledger flush failed: {:#}", e);
    }
    if let Err(e) = transactions.lock().await.flush() {
        error!("[STORE] Final transaction log flush failed: {:#}", e);
    }
    info!("[MONITOR] {}", monitor.lock().await.summary());
    Ok(())
}

async fn autosave_ledger(ledger: SharedLedger, monitor: SharedMonitor, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match ledger.lock().await.flush() {
            Ok(()) => info!("[STORE] Ledger autosaved"),
            Err(e) => error!("[STORE] Ledger autosave failed: {:#}", e),
        }
        info!("[MONITOR] {}", monitor.lock().await.summary());
    }
}

async fn autosave_transactions(transactions: SharedTransactionLog, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match transactions.lock().await.flush() {
            Ok(()) => info!("[STORE] Transaction log autosaved"),
            Err(e) => error!("[STORE] Transaction log autosave failed: {:#}", e),
        }
    }
}

/// Resolves on Ctrl-C, SIGTERM or when the scheduled restart is due
async fn shutdown_signal(restart_after_hours: u64) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("[BOT] Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("[BOT] SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let restart = async {
        if restart_after_hours == 0 {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(restart_after_hours * 3600)).await;
    };

    tokio::select! {
        _ = ctrl_c => info!("[BOT] Ctrl-C received"),
        _ = terminate => info!("[BOT] SIGTERM received"),
        _ = restart => info!("[BOT] Scheduled restart after {}h", restart_after_hours),
    }
}

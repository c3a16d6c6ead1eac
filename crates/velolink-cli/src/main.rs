//! `velolink-cli` – VeloLink session runner.
//!
//! This binary is the entry point for a bridge session.  It:
//!
//! 1. Loads `~/.velolink/config.toml` (writing the defaults on first run).
//! 2. Starts the telemetry/control bridge: sender loop out to the balancer,
//!    command receiver listening for the steering stream.
//! 3. Drives the simulated vehicle's tick loop, one IMU sample per tick.
//! 4. Prints bridge status lines as the link connects, drops, and recovers.
//! 5. Intercepts **Ctrl-C** for a graceful shutdown that joins both loops.

mod config;

use colored::Colorize;
use tokio::sync::watch;
use tracing::{error, warn};

use velolink_bridge::{Bridge, BridgeConfig};
use velolink_host::{SimImu, SimVehicle, run_tick_loop};
use velolink_types::LinkEventPayload;

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set VELOLINK_LOG_FORMAT=json to emit newline-delimited JSON logs
    // suitable for log aggregators.  User-facing status output still uses
    // println! for UX consistency.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("VELOLINK_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Config vault ──────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found – defaults written to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let (send_addr, receive_addr) = match (cfg.send_addr(), cfg.receive_addr()) {
        (Ok(send), Ok(receive)) => (send, receive),
        (send, receive) => {
            for err in [send.err(), receive.err()].into_iter().flatten() {
                error!(error = %err, "bad socket address in config");
                println!("{}: {}", "Config error".red(), err);
            }
            std::process::exit(1);
        }
    };

    // ── Bridge startup ────────────────────────────────────────────────────
    let vehicle = SimVehicle::new();
    let bridge = Bridge::new(BridgeConfig::new(send_addr, receive_addr), vehicle.clone());
    let handle = match bridge.spawn().await {
        Ok(handle) => handle,
        Err(e) => {
            // A listener that cannot bind is configuration, not a transient
            // fault – abort startup.
            error!(error = %e, "bridge startup failed");
            println!("{}: {}", "Fatal".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "  Telemetry → {}   Commands ← {}",
        send_addr.to_string().bold(),
        handle.command_addr().to_string().bold()
    );
    println!("  Press {} to stop.\n", "Ctrl-C".bold().cyan());

    // ── Shared shutdown signal ────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if let Err(e) = ctrlc::set_handler({
        let shutdown_tx = shutdown_tx.clone();
        move || {
            println!();
            println!("{}", "⚠  Ctrl-C received – stopping the bridge …".yellow().bold());
            let _ = shutdown_tx.send(true);
        }
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Status printer ────────────────────────────────────────────────────
    let mut events = handle.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_status(&event.payload),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // ── Tick driver ───────────────────────────────────────────────────────
    let tick = tokio::spawn(run_tick_loop(
        SimImu::new(),
        handle.producer(),
        std::time::Duration::from_millis(cfg.tick_ms),
        shutdown_rx.clone(),
    ));

    // ── Wait for Ctrl-C, then tear down in order ──────────────────────────
    let mut shutdown = shutdown_rx;
    let _ = shutdown.changed().await;

    // Tick driver first (stop producing), then the bridge (drain + join).
    let _ = tick.await;
    handle.shutdown().await;
    printer.abort();

    println!(
        "  {} Last applied steering angle: {:.4}",
        "✓".green().bold(),
        vehicle.last_steer()
    );
    println!("  {} VeloLink stopped cleanly.", "✓".green().bold());
}

// ─────────────────────────────────────────────────────────────────────────────
// Status lines
// ─────────────────────────────────────────────────────────────────────────────

fn print_status(payload: &LinkEventPayload) {
    match payload {
        LinkEventPayload::SenderConnected { addr } => {
            println!("  {} telemetry link up → {}", "●".green(), addr.bold());
        }
        LinkEventPayload::SenderDisconnected { addr, reason } => {
            println!(
                "  {} telemetry link lost ({}) – reconnecting to {}",
                "●".yellow(),
                reason.dimmed(),
                addr.bold()
            );
        }
        LinkEventPayload::PayloadLost { .. } => {
            println!("  {} one telemetry sample lost in flight", "!".yellow().bold());
        }
        LinkEventPayload::CommandClientConnected { peer } => {
            println!("  {} balancer command stream from {}", "●".green(), peer.bold());
        }
        LinkEventPayload::CommandClientClosed { peer } => {
            println!("  {} command stream from {} closed", "○".normal(), peer.dimmed());
        }
        // One line per applied angle at 10 Hz would drown the terminal; the
        // receiver already traces these at debug level.
        LinkEventPayload::SteerApplied { .. } => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#" _   __    __      __   _      __  "#.bold().cyan());
    println!("{}", r#"| | / /__ / /___  / /  (_)__  / /__"#.bold().cyan());
    println!("{}", r#"| |/ / -_) / _ \ / /__/ / _ \/  '_/"#.bold().cyan());
    println!("{}", r#"|___/\__/_/\___//____/_/_//_/_/\_\ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "VeloLink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Simulator telemetry/control bridge");
    println!();
}

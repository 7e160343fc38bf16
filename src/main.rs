//! Directory server extension pipeline host.
//!
//! Loads configuration, builds the plugin manager, runs the startup hooks,
//! waits for a shutdown signal, then runs the shutdown hooks and finalizes
//! every plugin.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use dirsrv_core::config::AppConfig;
use dirsrv_core::error::AppError;
use dirsrv_plugin::hooks::{DispatchOutcome, HookArgs, HookCategory};
use dirsrv_plugin::manager::PluginManager;

/// Directory server command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "dirsrv-server", version, about = "Directory server")]
struct Args {
    /// Base configuration file, without extension.
    #[arg(long, env = "DIRSRV_CONFIG", default_value = "config/default")]
    config: String,

    /// Environment overlay loaded from `config/{env}.toml`.
    #[arg(long, env = "DIRSRV_ENV", default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match AppConfig::load_file(&args.config, &args.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        instance = %config.server.instance_name,
        "Starting directory server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // ── Step 1: Plugin manager ───────────────────────────────────
    let manager = PluginManager::new(&config.plugins).await;
    let loaded = manager.initialize(&config.plugins.entries).await;
    tracing::info!(loaded = loaded, "Plugin system initialized");

    // ── Step 2: Startup hooks ────────────────────────────────────
    if let DispatchOutcome::Halt(halt) = manager
        .dispatcher()
        .dispatch(HookCategory::Startup, &HookArgs::Startup)
        .await
    {
        tracing::error!(
            result_code = %halt.result_code,
            message = %halt.message,
            "Startup aborted by plugin"
        );
        manager.finalize_all().await;
        return Err(AppError::plugin(format!(
            "Startup aborted by plugin: {}",
            halt.message
        ))
        .with_result_code(halt.result_code));
    }

    tracing::info!("Directory server started");

    // ── Step 3: Wait for shutdown ────────────────────────────────
    let reason = shutdown_signal().await;
    tracing::info!(reason = %reason, "Shutdown signal received, starting graceful shutdown...");

    // ── Step 4: Shutdown hooks and finalization ──────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let shutdown_args = HookArgs::Shutdown { reason: &reason };
    let shutdown = manager
        .dispatcher()
        .dispatch(HookCategory::Shutdown, &shutdown_args);
    match tokio::time::timeout(grace, shutdown).await {
        Ok(DispatchOutcome::Halt(halt)) => {
            tracing::warn!(message = %halt.message, "Shutdown plugin reported a problem");
        }
        Ok(DispatchOutcome::Continue { .. }) => {}
        Err(_) => tracing::warn!("Shutdown plugins did not finish within the grace period"),
    }

    manager.finalize_all().await;

    tracing::info!("Directory server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() -> String {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "interrupt".to_string(),
        _ = terminate => "terminate".to_string(),
    }
}

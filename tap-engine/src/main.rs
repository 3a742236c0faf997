use std::sync::Arc;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use tap_core::{EngineEventBus, SystemClock};
use tap_engine::console::{self, Command};
use tap_engine::identity::StaticIdentity;
use tap_engine::{EngineDeps, TapEngine, config::EngineConfig};
use tap_persistence::{UserRepository, connection::connect_and_migrate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting tap engine session...");

    let config = EngineConfig::from_env().context("invalid configuration")?;

    // Initialize database connection and run migrations
    let db = connect_and_migrate(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let store = Arc::new(UserRepository::new(db));

    let identity = match std::env::var("TAP_INIT_DATA") {
        Ok(raw) => StaticIdentity::from_init_data(&raw).context("TAP_INIT_DATA is not valid")?,
        Err(_) => {
            info!("TAP_INIT_DATA not set");
            StaticIdentity::none()
        }
    };

    let deps = EngineDeps {
        store,
        clock: Arc::new(SystemClock),
        events: EngineEventBus::new(),
    };
    let engine = TapEngine::start(&config, &identity, deps).await?;
    match engine.session.user_id() {
        Some(user_id) => info!("Session ready for user {}", user_id),
        None => info!("Session ready in offline mode"),
    }

    // Announce when the faucet becomes claimable
    let (mut countdown, _countdown_task) = engine.countdown();
    tokio::spawn(async move {
        let mut was_ready = countdown.borrow().is_claimable();
        while countdown.changed().await.is_ok() {
            let state = *countdown.borrow_and_update();
            if state.is_claimable() && !was_ready {
                info!("Faucet is ready to claim");
            } else if !state.is_claimable() {
                debug!("Faucet countdown {}", state.countdown());
            }
            was_ready = state.is_claimable();
        }
    });

    let mut rng = StdRng::from_os_rng();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", console::HELP);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => match console::execute(&engine, command, &mut rng).await {
                        Ok(output) => println!("{}", output),
                        Err(e) => println!("error: {}", e),
                    },
                    Err(e) => println!("{}", e),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down, flushing pending taps...");
    match engine.shutdown().await {
        Ok(amount) => info!("Final flush saved {}", amount),
        Err(e) => error!("Final flush failed: {}", e),
    }
    info!("Session closed.");
    Ok(())
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) else {
            error!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}

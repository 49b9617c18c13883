// Logging module - Logging infrastructure
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> WalletGuardResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("walletguard={},warn", level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| WalletGuardError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::info!("WalletGuard logging system initialized");
    Ok(())
}

use crate::cli::args::{Args, Command, ConfigCommand, SimulateArgs, TokenCommand};
use crate::cli::output::{ConsoleWriter, OutputWriter, TokenReport};
use crate::core::auth::{decode_claims, encode_unsigned, InMemorySessionStore, TokenClaims, UserProfile};
use crate::core::lifecycle::{AppState, LifecycleSignal};
use crate::core::session::{LogoutReason, SessionLifecycleManager, SessionWarning};
use crate::domain::config::WalletGuardConfig;
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use crate::infrastructure::api::logout_api_from_config;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::{read_last_logout, FileStore, MemoryStore, PersistentStore};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

const SIMULATE_HELP: &str = "Commands:
  tap                 record user activity
  bg | background     move the app to the background
  inactive            app becomes inactive
  fg | active         bring the app back to the foreground
  status              show the security status
  logout              log out now
  quit                stop without logging out
  help                show this help";

/// Event forwarded from the manager's sinks to the simulator loop
#[derive(Debug)]
enum SessionEvent {
    Warning(SessionWarning),
    Logout(LogoutReason),
}

/// Execute CLI command
pub async fn execute_command(args: Args) -> WalletGuardResult<()> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path)?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        let level = if args.verbose { "debug" } else { config.global.log_level.as_str() };
        init_logging(level)?;
    }

    match args.command {
        Command::Token(token_args) => execute_token_command(token_args.command, &writer),
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::LastLogout { store } => {
            let path = resolve_store_path(store, &config)?;
            let store = FileStore::open(path).await?;
            let record = read_last_logout(&store).await?;
            writer.write_last_logout(record.as_ref())?;
            Ok(())
        }
        Command::Simulate(simulate_args) => execute_simulate(simulate_args, &writer, &config).await,
        Command::Version => {
            writer.write_message(&format!("walletguard {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

fn execute_token_command(command: TokenCommand, writer: &ConsoleWriter) -> WalletGuardResult<()> {
    match command {
        TokenCommand::Inspect { token } => {
            let claims = decode_claims(&token)?;
            writer.write_token(&TokenReport::new(&claims, SystemTime::now()))?;
            Ok(())
        }
        TokenCommand::Generate { ttl, email } => {
            let token = generate_token(ttl, email)?;
            writer.write_message(&token)?;
            Ok(())
        }
    }
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &WalletGuardConfig,
    config_manager: &ConfigManager,
) -> WalletGuardResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            match config_manager.load_config_from_path(&file) {
                Ok(_) => writer.write_message(&format!("Configuration file '{}' is valid", file.display()))?,
                Err(e) => writer.write_error(&format!("Configuration validation failed: {}", e))?,
            }
            Ok(())
        }
        ConfigCommand::Init { path } => {
            let dir = match path {
                Some(path) => path,
                None => std::env::current_dir().map_err(|e| WalletGuardError::Config {
                    message: format!("Failed to get current directory: {}", e),
                })?,
            };
            let config_file = config_manager.init_project_config(&dir)?;
            writer.write_message(&format!("Project configuration initialized at '{}'", config_file.display()))?;
            Ok(())
        }
        ConfigCommand::Path => {
            writer.write_message(&format!(
                "Global: {}",
                config_manager.get_global_config_path_ref().display()
            ))?;
            match config_manager.get_project_config_path() {
                Some(path) => writer.write_message(&format!("Project: {}", path.display()))?,
                None => writer.write_message("Project: none")?,
            }
            Ok(())
        }
    }
}

async fn execute_simulate(
    args: SimulateArgs,
    writer: &ConsoleWriter,
    config: &WalletGuardConfig,
) -> WalletGuardResult<()> {
    let mut session_config = config.session.clone();
    if let Some(ms) = args.idle_timeout_ms {
        session_config.idle_timeout_ms = ms;
    }
    if let Some(ms) = args.idle_warning_ms {
        session_config.idle_warning_ms = ms;
    }
    if let Some(ms) = args.background_timeout_ms {
        session_config.background_timeout_ms = ms;
    }

    let token = match args.token {
        Some(token) => token,
        None => generate_token(args.ttl, Some(args.email.clone()))?,
    };

    let store = Arc::new(InMemorySessionStore::new());
    store.sign_in(
        token,
        Some(UserProfile {
            email: args.email,
            display_name: None,
        }),
    );

    let persisted: Arc<dyn PersistentStore> = match args.store {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => Arc::new(MemoryStore::new()),
    };

    let lifecycle = LifecycleSignal::default();
    let manager = SessionLifecycleManager::new(
        session_config,
        store,
        logout_api_from_config(&config.api)?,
        persisted,
        lifecycle.clone(),
    )?;

    let (tx, mut events) = mpsc::unbounded_channel();
    let warning_tx = tx.clone();
    manager
        .initialize(
            move |warning: SessionWarning| {
                let _ = warning_tx.send(SessionEvent::Warning(warning));
            },
            move |reason: LogoutReason| {
                let _ = tx.send(SessionEvent::Logout(reason));
            },
        )
        .await?;

    writer.write_message("Session started. Type 'help' for commands.")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                SessionEvent::Warning(warning) => writer.write_warning(&warning)?,
                SessionEvent::Logout(reason) => {
                    writer.write_logout(reason)?;
                    break;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    manager.cleanup().await;
                    break;
                };
                let command = line.trim().to_lowercase();
                match command.as_str() {
                    "" => {}
                    "tap" | "t" => manager.reset_activity().await,
                    "status" | "s" => {
                        let status = manager.get_security_status().await;
                        writer.write_status(manager.phase().await, &status)?;
                    }
                    // the logout event arrives through the sink
                    "logout" => manager.force_logout().await,
                    "quit" | "q" | "exit" => {
                        manager.cleanup().await;
                        break;
                    }
                    "help" | "h" | "?" => writer.write_message(SIMULATE_HELP)?,
                    other => match AppState::from_str(other) {
                        Ok(state) => {
                            let delivered = lifecycle.emit(state);
                            debug!("App state {} delivered to {} listener(s)", state, delivered);
                        }
                        Err(_) => writer.write_error(&format!("Unknown command '{}'", other))?,
                    },
                }
            }
        }
    }

    Ok(())
}

fn generate_token(ttl: i64, email: Option<String>) -> WalletGuardResult<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();

    encode_unsigned(&TokenClaims {
        exp: now.saturating_add(ttl),
        iat: Some(now),
        sub: Some(uuid::Uuid::new_v4().to_string()),
        email,
    })
}

fn resolve_store_path(explicit: Option<PathBuf>, config: &WalletGuardConfig) -> WalletGuardResult<PathBuf> {
    match explicit.or_else(|| config.global.store_path.clone()) {
        Some(path) => Ok(path),
        None => FileStore::default_path(),
    }
}

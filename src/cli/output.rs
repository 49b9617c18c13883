use crate::cli::args::OutputFormat;
use crate::core::auth::TokenClaims;
use crate::core::session::{LastLogout, LogoutReason, SecurityStatus, SessionPhase, SessionWarning};
use crate::domain::config::WalletGuardConfig;
use crate::infrastructure::storage::to_epoch_millis;
use serde::Serialize;
use std::io;
use std::time::{Duration, SystemTime};
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_token(&self, report: &TokenReport) -> Result<(), OutputError>;
    fn write_status(&self, phase: SessionPhase, status: &SecurityStatus) -> Result<(), OutputError>;
    fn write_config(&self, config: &WalletGuardConfig) -> Result<(), OutputError>;
    fn write_last_logout(&self, record: Option<&LastLogout>) -> Result<(), OutputError>;
    fn write_warning(&self, warning: &SessionWarning) -> Result<(), OutputError>;
    fn write_logout(&self, reason: LogoutReason) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::WalletGuardError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Decoded token summary
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: i64,
    pub expired: bool,
    pub time_left_secs: Option<u64>,
}

impl TokenReport {
    pub fn new(claims: &TokenClaims, now: SystemTime) -> Self {
        let time_left = claims.time_left(now);
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            issued_at: claims.iat,
            expires_at: claims.exp,
            expired: time_left.is_none(),
            time_left_secs: time_left.map(|left| left.as_secs()),
        }
    }
}

#[derive(Tabled)]
struct TokenTableRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Expires (epoch s)")]
    expires_at: i64,
    #[tabled(rename = "Time left")]
    time_left: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Authenticated")]
    authenticated: bool,
    #[tabled(rename = "Foreground")]
    foreground: bool,
    #[tabled(rename = "Token left")]
    token_left: String,
    #[tabled(rename = "Idle left")]
    idle_left: String,
}

#[derive(Tabled)]
struct TimingTableRow {
    #[tabled(rename = "Setting")]
    setting: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    phase: SessionPhase,
    #[serde(flatten)]
    status: &'a SecurityStatus,
}

#[derive(Serialize)]
struct EventJson<'a, T: Serialize> {
    event: &'a str,
    detail: T,
}

/// Render a duration as e.g. `4m 05s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}

fn format_optional(duration: Option<Duration>) -> String {
    duration.map(format_duration).unwrap_or_else(|| "-".to_string())
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn timing_rows(config: &WalletGuardConfig) -> Vec<TimingTableRow> {
        let session = &config.session;
        vec![
            TimingTableRow { setting: "idle timeout", value: format_duration(session.idle_timeout()) },
            TimingTableRow { setting: "idle warning", value: format_duration(session.idle_warning()) },
            TimingTableRow {
                setting: "token check interval",
                value: format_duration(session.token_check_interval()),
            },
            TimingTableRow {
                setting: "token expiry warning",
                value: format_duration(session.token_pre_expiration_warning()),
            },
            TimingTableRow {
                setting: "max session",
                value: format_duration(session.max_session_duration()),
            },
            TimingTableRow {
                setting: "background timeout",
                value: format_duration(session.background_timeout()),
            },
        ]
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_token(&self, report: &TokenReport) -> Result<(), OutputError> {
        let time_left = format_optional(report.time_left_secs.map(Duration::from_secs));
        match self.format {
            OutputFormat::Text => {
                println!("Token claims (unverified):");
                println!("  Subject: {}", report.subject.as_deref().unwrap_or("-"));
                println!("  Email: {}", report.email.as_deref().unwrap_or("-"));
                if let Some(iat) = report.issued_at {
                    println!("  Issued at: {}", iat);
                }
                println!("  Expires at: {}", report.expires_at);
                if report.expired {
                    println!("  Status: expired");
                } else {
                    println!("  Status: valid for {}", time_left);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            OutputFormat::Table => {
                let row = TokenTableRow {
                    subject: report.subject.clone().unwrap_or_else(|| "-".to_string()),
                    email: report.email.clone().unwrap_or_else(|| "-".to_string()),
                    expires_at: report.expires_at,
                    time_left: if report.expired { "expired".to_string() } else { time_left },
                };
                println!("{}", Table::new(vec![row]));
            }
        }
        Ok(())
    }

    fn write_status(&self, phase: SessionPhase, status: &SecurityStatus) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Session: {}", phase);
                println!("  Authenticated: {}", status.is_authenticated);
                println!("  Foreground: {}", status.is_foreground);
                println!("  Token time left: {}", format_optional(status.token_time_left));
                println!("  Idle time left: {}", format_optional(status.idle_time_left));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&StatusJson { phase, status })?);
            }
            OutputFormat::Table => {
                let row = StatusTableRow {
                    phase: phase.to_string(),
                    authenticated: status.is_authenticated,
                    foreground: status.is_foreground,
                    token_left: format_optional(status.token_time_left),
                    idle_left: format_optional(status.idle_time_left),
                };
                println!("{}", Table::new(vec![row]));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &WalletGuardConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("WalletGuard Configuration:");
                println!("  Log level: {}", config.global.log_level);
                if let Some(path) = &config.global.store_path {
                    println!("  Store: {}", path.display());
                }
                println!("  Session:");
                for row in Self::timing_rows(config) {
                    println!("    {}: {}", row.setting, row.value);
                }
                match config.api.logout_url() {
                    Some(url) => println!("  Logout endpoint: {}", url),
                    None => println!("  Logout endpoint: disabled"),
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(Self::timing_rows(config)));
            }
        }
        Ok(())
    }

    fn write_last_logout(&self, record: Option<&LastLogout>) -> Result<(), OutputError> {
        match (self.format, record) {
            (OutputFormat::Json, _) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            (_, None) => println!("No logout recorded"),
            (_, Some(record)) => {
                let at = record
                    .at
                    .map(|at| to_epoch_millis(at).to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("Last logout: {} at {} (epoch ms)", record.reason, at);
            }
        }
        Ok(())
    }

    fn write_warning(&self, warning: &SessionWarning) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&EventJson { event: "warning", detail: warning })?);
            }
            _ => match warning {
                SessionWarning::Idle { logout_in } => {
                    println!("! Idle warning: logout in {}", format_duration(*logout_in));
                }
                SessionWarning::TokenExpiring { expires_in } => {
                    println!("! Token expires in {}", format_duration(*expires_in));
                }
            },
        }
        Ok(())
    }

    fn write_logout(&self, reason: LogoutReason) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&EventJson { event: "logout", detail: reason })?);
            }
            _ => println!("Logged out: {}", reason),
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "message": message });
                println!("{}", serde_json::to_string(&output)?);
            }
            _ => println!("{}", message),
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "error": error });
                eprintln!("{}", serde_json::to_string(&output)?);
            }
            _ => eprintln!("Error: {}", error),
        }
        Ok(())
    }
}

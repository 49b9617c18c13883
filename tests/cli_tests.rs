use clap::Parser;
use std::io::Write;
use std::process::{Command, Stdio};
use std::str;
use walletguard::cli::args::{Command as CliCommand, ConfigCommand, TokenCommand};
use walletguard::cli::{Args, OutputFormat};

// {"sub":"1234567890","name":"John Doe","iat":1516239022,"exp":1516239022}
const EXPIRED_TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
eyJzdWIiOiIxMjM0NTY3ODkwIiwibmFtZSI6IkpvaG4gRG9lIiwiaWF0IjoxNTE2MjM5MDIyLCJleHAiOjE1MTYyMzkwMjJ9.\
sig";

fn walletguard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_walletguard"))
}

/// Argument parsing tests
#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_parse_token_inspect() {
        let args = Args::try_parse_from(["walletguard", "-o", "json", "token", "inspect", "a.b.c"]).unwrap();
        assert_eq!(args.output, OutputFormat::Json);
        match args.command {
            CliCommand::Token(token) => {
                assert!(matches!(token.command, TokenCommand::Inspect { token } if token == "a.b.c"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_ttl() {
        let args = Args::try_parse_from(["walletguard", "token", "generate", "--ttl", "-60"]).unwrap();
        match args.command {
            CliCommand::Token(token) => {
                assert!(matches!(token.command, TokenCommand::Generate { ttl: -60, email: None }));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_simulate_overrides() {
        let args = Args::try_parse_from([
            "walletguard",
            "-q",
            "simulate",
            "--idle-timeout-ms",
            "5000",
            "--idle-warning-ms",
            "4000",
            "--email",
            "ada@example.com",
        ])
        .unwrap();

        assert!(args.quiet);
        match args.command {
            CliCommand::Simulate(simulate) => {
                assert_eq!(simulate.idle_timeout_ms, Some(5_000));
                assert_eq!(simulate.idle_warning_ms, Some(4_000));
                assert_eq!(simulate.background_timeout_ms, None);
                assert_eq!(simulate.email, "ada@example.com");
                assert_eq!(simulate.ttl, 3_600);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_validate_requires_file() {
        assert!(Args::try_parse_from(["walletguard", "config", "validate"]).is_err());

        let args = Args::try_parse_from(["walletguard", "config", "validate", "cfg.toml"]).unwrap();
        match args.command {
            CliCommand::Config(config) => assert!(matches!(config.command, ConfigCommand::Validate { .. })),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Args::try_parse_from(["walletguard", "-o", "xml", "version"]).is_err());
    }
}

/// Binary invocation tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help() {
        let output = walletguard().arg("--help").output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("token"));
        assert!(stdout.contains("config"));
        assert!(stdout.contains("simulate"));
        assert!(stdout.contains("last-logout"));
    }

    #[test]
    fn test_cli_version() {
        let output = walletguard().args(["-q", "version"]).output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_inspect_expired_token_as_json() {
        let output = walletguard()
            .args(["-q", "-o", "json", "token", "inspect", EXPIRED_TOKEN])
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid JSON");
        assert_eq!(report["expires_at"], 1_516_239_022);
        assert_eq!(report["expired"], true);
        assert_eq!(report["subject"], "1234567890");
    }

    #[test]
    fn test_cli_inspect_malformed_token_fails() {
        let output = walletguard()
            .args(["-q", "token", "inspect", "not-a-token"])
            .output()
            .expect("Failed to execute command");

        assert!(!output.status.success());
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert!(stderr.contains("Invalid token"));
    }

    #[test]
    fn test_cli_generate_then_inspect() {
        let output = walletguard()
            .args(["-q", "token", "generate", "--ttl", "600", "--email", "ada@example.com"])
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        let token = str::from_utf8(&output.stdout).expect("Invalid UTF-8").trim().to_string();

        let output = walletguard()
            .args(["-q", "-o", "json", "token", "inspect", &token])
            .output()
            .expect("Failed to execute command");
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid JSON");
        assert_eq!(report["email"], "ada@example.com");
        assert_eq!(report["expired"], false);
    }

    #[test]
    fn test_cli_last_logout_with_empty_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = temp_dir.path().join("store.json");

        let output = walletguard()
            .args(["-q", "last-logout", "--store"])
            .arg(&store)
            .output()
            .expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("No logout recorded"));
    }

    #[test]
    fn test_cli_simulate_status_then_quit() {
        let mut child = walletguard()
            .args(["-q", "simulate"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn simulator");

        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(b"tap\nstatus\nquit\n")
            .unwrap();

        let output = child.wait_with_output().expect("Simulator did not exit");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("Session: Active"));
        assert!(stdout.contains("Authenticated: true"));
    }

    #[test]
    fn test_cli_invalid_command() {
        let output = walletguard().arg("invalid-command").output().expect("Failed to execute command");
        assert!(!output.status.success());
    }
}

// WalletGuard - Session security lifecycle manager
use clap::Parser;
use walletguard::cli::{execute_command, Args};
use walletguard::WalletGuardError;

#[tokio::main]
async fn main() -> Result<(), WalletGuardError> {
    let args = Args::parse();

    match execute_command(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

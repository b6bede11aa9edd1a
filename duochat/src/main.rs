use clap::Parser;

use duochat_lib::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(e) = duochat_lib::run(Cli::parse()).await {
        eprintln!("duochat: {}", e);
        std::process::exit(1);
    }
}

use anime_quotes_api::cli::{self, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cli::serve::run().await,
        Command::Routes => cli::routes::run(),
        Command::GenerateKey(args) => cli::keys::run(&args),
    }
}

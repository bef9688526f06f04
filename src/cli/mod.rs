//! Command-line entry points
//!
//! - `serve`: run the HTTP API
//! - `routes`: print the gated route table
//! - `generate-key`: print fresh well-formed API keys

pub mod keys;
pub mod routes;
pub mod serve;

use clap::{Parser, Subcommand};

/// Anime Quotes API - quote lookups behind API-key auth and tiered rate limits
#[derive(Parser)]
#[command(name = "anime-quotes-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server (default)
    Serve,

    /// Print every gated route with its access class
    Routes,

    /// Print new API keys; storing them for an owner is done separately
    GenerateKey(keys::GenerateKeyArgs),
}

//! Generate-key command

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::api_key::ApiKeyGenerator;

#[derive(Debug, Args)]
pub struct GenerateKeyArgs {
    /// How many keys to print
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

/// Keys follow the configured prefix and minimum length
pub fn run(args: &GenerateKeyArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let generator = ApiKeyGenerator::for_format(&config.auth.key_format());

    for _ in 0..args.count {
        let generated = generator.generate();
        println!("{}  (fingerprint {})", generated.key, generated.fingerprint);
    }

    Ok(())
}

use anyhow::{Context, Result};
use std::path::Path;
use tunny_common::constants::{DEFAULT_SERVER_URL, ENV_SUBDOMAIN, ENV_TOKEN};

use crate::cli::InitArgs;
use crate::config::FileConfig;

/// `tunny init`: write `~/.tunny/config.json`
pub fn run(args: InitArgs) -> Result<()> {
    let path = FileConfig::default_path()?;
    let config = write_config(&args, &path)?;
    print_summary(&config, &path);
    Ok(())
}

fn write_config(args: &InitArgs, path: &Path) -> Result<FileConfig> {
    tunny_common::validation::validate_subdomain(&args.subdomain)?;

    let config = FileConfig::new(args.token.clone(), args.subdomain.clone());
    config
        .save_to(path)
        .with_context(|| format!("failed to save configuration to {}", path.display()))?;
    Ok(config)
}

fn print_summary(config: &FileConfig, path: &Path) {
    println!();
    println!("✅ Configuration saved!");
    println!();
    println!("📄 Location: {}", path.display());
    println!();
    println!("Configuration:");
    println!("  Server URL:  {} (default)", DEFAULT_SERVER_URL);
    println!("  Token:       {}", mask_token(&config.token));
    println!("  Subdomain:   {}", config.subdomain);
    println!();
    println!("💡 You can override token/subdomain with:");
    println!("   - CLI flags: tunny connect --token <token> localhost:3000");
    println!("   - Environment variables: {}, {}", ENV_TOKEN, ENV_SUBDOMAIN);
    println!();
}

/// Show only the last four characters of a token
fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

//! Policy file validation CLI tool
//!
//! Validates a muster policy file and reports any errors.

use muster_config::{ConfigError, CURRENT_CONFIG_VERSION};
use muster_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-policies [policy-file]");
            eprintln!();
            eprintln!("Validates a muster policy file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-policies {}", default_path.display());
            eprintln!("  validate-policies policies.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Policy file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match muster_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Policy file is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Frequency filter: {}s", config.settings.frequency_filter_secs);
            println!("  Member id style: {:?}", config.settings.member_id_style);
            println!("  Built-in policies: {}", if config.settings.include_builtin { "included" } else { "excluded" });
            println!("  Policies: {}", config.policies.len());

            if !config.policies.is_empty() {
                println!();
                println!("Policies:");
                for policy in &config.policies {
                    println!("  - {} [{}]: {}", policy.name, policy.kind(), policy.describe());
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Policy validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::JsonError(parse_err) => {
                    eprintln!("JSON parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

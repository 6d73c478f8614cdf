//! Configuration view and validation: `adw config`.

use anyhow::Result;

use adw::config::{AdwConfig, CONFIG_FILE};

pub fn cmd_config(config: &AdwConfig, validate: bool) -> Result<bool> {
    let config_path = config.adw_dir.join(CONFIG_FILE);

    if validate {
        println!();
        println!("Validating configuration...");
        println!();
        if !config_path.exists() {
            println!("No config.toml found. Using defaults (valid).");
            println!();
            return Ok(true);
        }

        let warnings = config.validate();
        if warnings.is_empty() {
            println!("Configuration is valid.");
        } else {
            println!("Configuration warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
        println!();
        return Ok(true);
    }

    println!();
    println!("adw Configuration");
    println!("=================");
    println!();
    if config_path.exists() {
        println!("Config file: {}", config_path.display());
    } else {
        println!("No config.toml found at {}", config_path.display());
        println!("Using default configuration.");
    }
    println!();
    print!("{}", config.toml.to_toml_string()?);
    println!();

    println!("Resolved paths:");
    println!("  specs    = {}", config.specs_dir().display());
    println!("  commands = {}", config.commands_dir().display());
    println!("  logs     = {}", config.logs_dir().display());
    println!("  state    = {}", config.state_dir().display());
    println!();
    println!("Effective values (with env overrides):");
    println!("  agent command = \"{}\"", config.toml.agent_cmd());
    println!();
    Ok(true)
}

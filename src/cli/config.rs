//! `config` subcommand: show and edit the settings file

use std::error::Error;

use clap::Subcommand;

use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::translate::display_name;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the current configuration (the API key is masked)
    Show,
    /// Set a value: endpoint, api-key, language or theme
    Set { key: String, value: String },
    /// Remove a value
    Unset { key: String },
    /// Print the location of the config file
    Path,
}

pub fn run_config(mut config: Config, action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => config.print_all(),
        ConfigAction::Path => println!("{}", path_display(Config::get_config_path()?)),
        ConfigAction::Set { key, value } => {
            let message = apply_set(&mut config, &key, &value)?;
            config.save()?;
            println!("✅ {message}");
        }
        ConfigAction::Unset { key } => {
            config.unset(&key)?;
            config.save()?;
            println!("✅ Unset {}", key.trim());
        }
    }
    Ok(())
}

fn apply_set(config: &mut Config, key: &str, value: &str) -> Result<String, Box<dyn Error>> {
    if value.trim().is_empty() {
        return Err(format!("Refusing to set {key} to an empty value; use `config unset {key}`").into());
    }
    config.set(key, value)?;

    let message = match key.trim() {
        "api-key" | "api_key" => "Set api-key".to_string(),
        "language" => format!("Set language to {}", display_name(value.trim())),
        other => format!("Set {other} to {}", value.trim()),
    };
    Ok(message)
}

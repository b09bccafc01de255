use clap::Subcommand;
use pomodorox_core::{ConfigError, Database, Settings, Store};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "work_min", "goals.daily_cycles")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        ConfigAction::Get { key } => {
            let settings = db.get_settings()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(ConfigError::UnknownKey(key).into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let settings = db.get_settings()?.with_value(&key, &value)?;
            db.save_settings(&settings)?;
            println!("ok");
        }
        ConfigAction::List => {
            let settings = db.get_settings()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Reset => {
            db.save_settings(&Settings::default())?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

use clap::Subcommand;
use focusflow_core::{Command, Config, Settings, ValidationError};

use super::{print_events, print_json, App, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print all settings as JSON
    List,
    /// Print one setting
    Get {
        /// Setting key (e.g. "workDuration", "longBreakInterval")
        key: String,
    },
    /// Change one setting
    Set {
        /// Setting key
        key: String,
        /// New value (minutes, a count, or true/false)
        value: String,
    },
    /// Restore the default settings
    Reset,
}

pub async fn run(action: SettingsAction, config: Config) -> CmdResult {
    let mut app = App::open(&config).await?;

    let next = match action {
        SettingsAction::List => {
            print_json(app.driver.settings())?;
            return Ok(());
        }
        SettingsAction::Get { key } => {
            let value = app
                .driver
                .settings()
                .get(&key)
                .ok_or(ValidationError::UnknownKey(key))?;
            println!("{value}");
            return Ok(());
        }
        SettingsAction::Set { key, value } => app.driver.settings().with_value(&key, &value)?,
        SettingsAction::Reset => Settings::default(),
    };

    let events = app.driver.dispatch(Command::UpdateSettings(next));
    print_events(&events)?;
    app.close().await;
    Ok(())
}

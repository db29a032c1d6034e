use clap::Subcommand;
use focusflow_core::Config;

use super::{App, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Print the current task label
    Show,
    /// Set the current task label
    Set {
        /// Free-form label
        label: String,
    },
    /// Clear the current task label
    Clear,
}

pub async fn run(action: TaskAction, config: Config) -> CmdResult {
    let app = App::open(&config).await?;
    match action {
        TaskAction::Show => println!("{}", app.driver.current_task()),
        TaskAction::Set { label } => {
            app.driver.set_current_task(&label)?;
            println!("{label}");
        }
        TaskAction::Clear => {
            app.driver.set_current_task("")?;
            println!("task cleared");
        }
    }
    Ok(())
}

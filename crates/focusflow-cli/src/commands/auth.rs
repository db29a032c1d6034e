use clap::Subcommand;
use focusflow_core::{Config, RemoteProfile, SignUpOutcome};
use serde_json::json;

use super::{print_events, print_json, App, CmdResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in and pull settings from the profile
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out; local settings are kept
    SignOut,
    /// Show the signed-in identity
    Status,
}

pub async fn run(action: AuthAction, config: Config) -> CmdResult {
    let mut app = App::open(&config).await?;

    if let AuthAction::Status = action {
        return print_status(&app);
    }

    let remote = app.remote()?;
    match action {
        AuthAction::SignIn { email, password } => {
            remote.sign_in(&email, &password).await?;
        }
        AuthAction::SignUp { email, password } => {
            if let SignUpOutcome::ConfirmationRequired = remote.sign_up(&email, &password).await? {
                println!("Check your email to confirm your account.");
            }
        }
        AuthAction::SignOut => {
            if let Err(e) = remote.sign_out().await {
                tracing::warn!(error = %e, "sign-out request failed");
            }
        }
        AuthAction::Status => {}
    }

    print_events(&app.driver.drain_auth_changes())?;
    print_status(&app)?;
    app.close().await;
    Ok(())
}

fn print_status(app: &App) -> CmdResult {
    let status = match app.driver.identity() {
        Some(identity) => json!({ "signedIn": true, "identity": identity }),
        None => json!({ "signedIn": false }),
    };
    print_json(&status)?;
    Ok(())
}

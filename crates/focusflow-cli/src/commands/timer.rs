use std::future::Future;
use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use focusflow_core::quotes;
use focusflow_core::{
    AuthChange, Command, Config, Driver, Event, KvStore, Mode, RemoteProfile, Snapshot,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, MissedTickBehavior};

use super::{print_events, print_json, App, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Start if paused, pause if running
    Toggle,
    /// Rewind the current interval
    Reset,
    /// Finish the current interval now
    Skip,
    /// Switch to a mode with a full interval
    Mode {
        /// work, short-break or long-break
        mode: Mode,
    },
    /// Run the timer in the foreground
    Run,
}

pub async fn run(action: TimerAction, config: Config) -> CmdResult {
    let mut app = App::open(&config).await?;

    let command = match action {
        TimerAction::Status => {
            print_json(&app.driver.snapshot())?;
            return Ok(());
        }
        TimerAction::Run => {
            let auth = app.remote.as_ref().map(|r| r.subscribe());
            let stdin = BufReader::new(tokio::io::stdin());
            run_loop(&mut app.driver, stdin, auth, shutdown_signal()).await;
            app.close().await;
            return Ok(());
        }
        TimerAction::Start => Command::Start,
        TimerAction::Pause => Command::Pause,
        TimerAction::Toggle => Command::Toggle,
        TimerAction::Reset => Command::Reset,
        TimerAction::Skip => Command::Skip,
        TimerAction::Mode { mode } => Command::SetMode(mode),
    };

    let events = app.driver.dispatch(command);
    if events.is_empty() {
        print_json(&app.driver.snapshot())?;
    } else {
        print_events(&events)?;
    }
    app.close().await;
    Ok(())
}

/// Key typed on stdin during `timer run`.
#[derive(Debug, PartialEq)]
enum Input {
    Dispatch(Command),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim() {
        "t" => Input::Dispatch(Command::Toggle),
        "s" => Input::Dispatch(Command::Skip),
        "r" => Input::Dispatch(Command::Reset),
        "w" => Input::Dispatch(Command::SetMode(Mode::Work)),
        "b" => Input::Dispatch(Command::SetMode(Mode::ShortBreak)),
        "l" => Input::Dispatch(Command::SetMode(Mode::LongBreak)),
        "q" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// Resolve when the remote profile publishes something. Pending forever
/// without a remote or once the channel closes.
async fn auth_wake(rx: &mut Option<broadcast::Receiver<AuthChange>>) {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match inner.recv().await {
        Ok(_) => {}
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "missed auth change notifications");
        }
        Err(RecvError::Closed) => *rx = None,
    }
}

/// Next line typed by the user. Once input ends or fails the reader is
/// dropped and this stays pending, so the timer keeps running.
async fn next_input<R>(lines: &mut Option<Lines<R>>) -> String
where
    R: AsyncBufRead + Unpin,
{
    let Some(reader) = lines.as_mut() else {
        return std::future::pending().await;
    };
    match reader.next_line().await {
        Ok(Some(line)) => return line,
        Ok(None) => tracing::info!("stdin closed; keys disabled, Ctrl-C stops the timer"),
        Err(e) => tracing::warn!(error = %e, "failed to read stdin; keys disabled"),
    }
    *lines = None;
    std::future::pending().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Tick once a second and apply keys from `input` until `q` or `shutdown`.
/// Timer state is saved on the way out.
async fn run_loop<S, R, F>(
    driver: &mut Driver<S>,
    input: R,
    mut auth: Option<broadcast::Receiver<AuthChange>>,
    shutdown: F,
) where
    S: KvStore,
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = Some(input.lines());
    tokio::pin!(shutdown);

    let task = driver.current_task();
    let mut quote = quotes::random_quote();
    let mut seen = (driver.state().mode, driver.state().sessions_completed);
    eprintln!("keys: t toggle, s skip, r reset, w/b/l mode, q quit");
    draw_status(&driver.snapshot(), &task, quote);

    loop {
        let events: Vec<Event> = tokio::select! {
            _ = ticker.tick() => driver.tick(),
            line = next_input(&mut lines) => match parse_input(&line) {
                Some(Input::Quit) => break,
                Some(Input::Dispatch(cmd)) => driver.dispatch(cmd),
                None => {
                    tracing::debug!(input = line.trim(), "ignoring unknown key");
                    Vec::new()
                }
            },
            _ = auth_wake(&mut auth) => driver.drain_auth_changes(),
            _ = &mut shutdown => break,
        };

        if !events.is_empty() {
            clear_line();
            for event in &events {
                match serde_json::to_string(event) {
                    Ok(json) => println!("{json}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                }
            }
        }

        let state = driver.state();
        if (state.mode, state.sessions_completed) != seen {
            seen = (state.mode, state.sessions_completed);
            quote = quotes::random_quote();
        }
        draw_status(&driver.snapshot(), &task, quote);
    }

    clear_line();
    driver.save_state();
}

fn clear_line() {
    print!("\r\x1b[2K");
}

fn draw_status(snapshot: &Snapshot, task: &str, quote: &'static str) {
    let headline = quotes::headline(snapshot.is_active, quote);
    let mut line = format!(
        "\r\x1b[2K{} {}  #{}/{}  {}",
        snapshot.display, snapshot.label, snapshot.round, snapshot.interval, headline
    );
    if !task.is_empty() {
        line.push_str(&format!("  [{task}]"));
    }
    print!("{line}");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::StderrNotifier;
    use focusflow_core::effects::Muted;
    use focusflow_core::MemoryStore;

    #[test]
    fn parses_single_letter_keys() {
        assert_eq!(parse_input("t"), Some(Input::Dispatch(Command::Toggle)));
        assert_eq!(parse_input(" s \n"), Some(Input::Dispatch(Command::Skip)));
        assert_eq!(
            parse_input("l"),
            Some(Input::Dispatch(Command::SetMode(Mode::LongBreak)))
        );
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("x"), None);
        assert_eq!(parse_input(""), None);
    }

    fn open_driver(kv: &MemoryStore) -> Driver<&MemoryStore> {
        Driver::new(kv, Box::new(Muted), Box::new(StderrNotifier::new(false)))
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_ticking_after_stdin_closes() {
        let kv = MemoryStore::new();
        let mut driver = open_driver(&kv);
        driver.dispatch(Command::Start);

        let shutdown = tokio::time::sleep(Duration::from_millis(5_500));
        run_loop(&mut driver, &b""[..], None, shutdown).await;

        assert_eq!(driver.state().time_left, 1495);
        assert!(driver.state().is_active);
        assert_eq!(open_driver(&kv).state(), driver.state());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_second() {
        let kv = MemoryStore::new();
        let mut driver = open_driver(&kv);
        driver.dispatch(Command::Start);

        let shutdown = tokio::time::sleep(Duration::from_millis(999));
        run_loop(&mut driver, &b""[..], None, shutdown).await;

        assert_eq!(driver.state().time_left, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_key_stops_and_saves_state() {
        let kv = MemoryStore::new();
        let mut driver = open_driver(&kv);
        run_loop(&mut driver, &b"s\nq\n"[..], None, std::future::pending()).await;

        assert_eq!(driver.state().mode, Mode::ShortBreak);
        assert_eq!(open_driver(&kv).state(), driver.state());
    }
}

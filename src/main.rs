//! pomotask - a focus timer for the terminal
//!
//! - `pomotask daemon` hosts the countdown and answers on a Unix socket
//! - timer commands (`start`, `pause`, `reset`, `mode`, `status`, `watch`)
//!   talk to the daemon
//! - `task`, `stats` and `ambient` work without the daemon

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use pomotask::cli::{AmbientArgs, Cli, Commands, DaemonArgs, Display, IpcClient, TaskCommand};
use pomotask::config::{AppConfig, AppPaths};
use pomotask::daemon::{self, DaemonOptions, TICK_PERIOD};
use pomotask::sound::AmbientPlayer;
use pomotask::stats::{LocalToday, ProductivityLog, SessionTracker};
use pomotask::storage::{DegradingStore, JsonFileStore, KeyValueStore};
use pomotask::tasks::TaskList;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Start) => {
            let response = IpcClient::new()?.start().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Reset(args)) => {
            let response = IpcClient::new()?.reset(args.minutes).await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Mode { mode }) => {
            let response = IpcClient::new()?.switch_mode(mode.into()).await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new()?.status().await?;
            let store = open_store(&AppPaths::resolve()?)?;
            let sessions = SessionTracker::new(store, Arc::new(LocalToday)).count_today()?;
            Display::show_status(&response, sessions);
        }
        Some(Commands::Watch) => {
            watch(IpcClient::new()?).await?;
        }
        Some(Commands::Daemon(args)) => {
            daemon::run(daemon_options(&args, AppPaths::resolve()?)).await?;
        }
        Some(Commands::Task { action }) => {
            run_task(action, &AppPaths::resolve()?)?;
        }
        Some(Commands::Stats { days }) => {
            let store = open_store(&AppPaths::resolve()?)?;
            let log = ProductivityLog::new(store, Arc::new(LocalToday));
            Display::show_stats(&log.recent(days)?);
        }
        Some(Commands::Ambient(args)) => {
            play_ambient(args).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn daemon_options(args: &DaemonArgs, paths: AppPaths) -> DaemonOptions {
    DaemonOptions {
        focus_minutes: args.focus,
        break_minutes: args.break_minutes,
        long_break_minutes: args.long_break,
        no_sound: args.no_sound,
        no_notify: args.no_notify,
        no_auto_reset: args.no_auto_reset,
        ..DaemonOptions::new(paths)
    }
}

/// Opens the persistent store, degrading to memory if it breaks.
fn open_store(paths: &AppPaths) -> Result<Arc<dyn KeyValueStore>> {
    paths.ensure_home()?;
    Ok(Arc::new(DegradingStore::new(JsonFileStore::new(
        paths.storage(),
    ))))
}

fn run_task(action: TaskCommand, paths: &AppPaths) -> Result<()> {
    let store = open_store(paths)?;
    let tasks = TaskList::new(store).with_daily_log(Arc::new(LocalToday));

    match action {
        TaskCommand::Add { text } => Display::show_task_added(&tasks.add(&text)?),
        TaskCommand::List => Display::show_tasks(&tasks.list()?),
        TaskCommand::Done { id } => Display::show_task_toggled(&tasks.toggle(id)?),
        TaskCommand::Remove { id } => Display::show_task_removed(&tasks.remove(id)?),
        TaskCommand::Edit { id, text } => Display::show_task_edited(&tasks.edit(id, &text)?),
    }
    Ok(())
}

/// Mirrors the daemon's title into the terminal until Ctrl-C.
async fn watch(client: IpcClient) -> Result<()> {
    let mut interval = tokio::time::interval(TICK_PERIOD);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let response = client.status().await?;
                if let Some(data) = &response.data {
                    write!(stdout, "{}\r{}\x1b[K", Display::terminal_title(&data.title), data.title)?;
                    stdout.flush()?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                // Restore an empty title
                write!(stdout, "{}", Display::terminal_title(""))?;
                writeln!(stdout)?;
                break;
            }
        }
    }
    Ok(())
}

/// Loops an ambient sound until Ctrl-C, with fades on both ends.
async fn play_ambient(args: AmbientArgs) -> Result<()> {
    let paths = AppPaths::resolve()?;
    let config = AppConfig::load(&paths.config())?;
    let volume = args.volume.unwrap_or(config.ambient_volume);

    let player = match AmbientPlayer::open(args.sound, &paths.sounds(), volume) {
        Ok(player) => player,
        Err(e) => {
            tracing::info!("{}", e.suggestion());
            return Err(e).with_context(|| format!("{}を再生できません", args.sound.label()));
        }
    };

    println!(
        "♪ {} を再生中 (音量 {:.0}%)  Ctrl-Cで停止",
        args.sound.label(),
        player.volume() * 100.0
    );
    player.fade_in().await;

    tokio::signal::ctrl_c()
        .await
        .context("シグナルを待機できません")?;

    player.fade_out().await;
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

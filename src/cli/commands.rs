//! Command definitions for the pomotask CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::sound::AmbientSound;
use crate::types::TimerMode;

// ============================================================================
// CLI Structure
// ============================================================================

/// pomotask - focus timer, task list and ambient sounds in the terminal
#[derive(Parser, Debug)]
#[command(
    name = "pomotask",
    version,
    about = "ターミナルで使うポモドーロタイマーとタスクリスト",
    long_about = "集中・休憩・長い休憩の3モードを持つカウントダウンタイマー。\n\
                  タイマーは 'pomotask daemon' で起動し、他のコマンドから操作します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start (or resume) the countdown
    Start,

    /// Pause the countdown
    Pause,

    /// Stop and reload the countdown
    Reset(ResetArgs),

    /// Switch timer mode
    Mode {
        /// Target mode
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Show current timer status
    Status,

    /// Follow the timer in the terminal title
    Watch,

    /// Run the timer daemon
    Daemon(DaemonArgs),

    /// Manage the task list
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Show daily productivity statistics
    Stats {
        /// Number of days to show, ending today
        #[arg(
            short,
            long,
            default_value = "7",
            value_parser = clap::value_parser!(u32).range(1..=365)
        )]
        days: u32,
    },

    /// Play a looping ambient sound until Ctrl-C
    Ambient(AmbientArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Timer modes as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Focus,
    Break,
    LongBreak,
}

impl From<ModeArg> for TimerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Focus => TimerMode::Focus,
            ModeArg::Break => TimerMode::Break,
            ModeArg::LongBreak => TimerMode::LongBreak,
        }
    }
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the reset command
#[derive(Args, Debug, Clone, Default)]
pub struct ResetArgs {
    /// Countdown length in minutes (defaults to the current mode)
    ///
    /// Out-of-range values are sent as-is and rejected by the daemon.
    #[arg(short, long, allow_negative_numbers = true)]
    pub minutes: Option<i64>,
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Focus duration in minutes (1-120)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub focus: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(long = "break", value_parser = clap::value_parser!(u32).range(1..=60))]
    pub break_minutes: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Disable the completion sound
    #[arg(long)]
    pub no_sound: bool,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Keep a finished countdown at 00:00 instead of reloading it
    #[arg(long)]
    pub no_auto_reset: bool,
}

/// Task list subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task to the top of the list
    Add {
        /// Task text
        #[arg(value_parser = validate_task_text)]
        text: String,
    },

    /// List all tasks
    List,

    /// Toggle the done flag of a task
    Done {
        /// Task id
        id: i64,
    },

    /// Remove a task
    Remove {
        /// Task id
        id: i64,
    },

    /// Replace the text of a task (empty text removes it)
    Edit {
        /// Task id
        id: i64,
        /// New text
        text: String,
    },
}

/// Arguments for the ambient command
#[derive(Args, Debug, Clone)]
pub struct AmbientArgs {
    /// Sound to loop
    #[arg(value_enum)]
    pub sound: AmbientSound,

    /// Volume between 0.0 and 1.0 (defaults to the configured volume)
    #[arg(long, value_parser = validate_volume)]
    pub volume: Option<f32>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the text of a new task.
///
/// - Must not be blank
/// - Must not exceed 200 characters
fn validate_task_text(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("タスクは空にできません".to_string());
    }
    if s.chars().count() > 200 {
        return Err("タスクは200文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

fn validate_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s
        .parse()
        .map_err(|_| format!("数値を指定してください: {}", s))?;
    if !(0.0..=1.0).contains(&volume) {
        return Err("音量は0.0〜1.0の範囲で指定してください".to_string());
    }
    Ok(volume)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["pomotask"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_short_verbose_flag() {
            let cli = Cli::parse_from(["pomotask", "status", "-v"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_timer_commands() {
            assert!(matches!(
                Cli::parse_from(["pomotask", "start"]).command,
                Some(Commands::Start)
            ));
            assert!(matches!(
                Cli::parse_from(["pomotask", "pause"]).command,
                Some(Commands::Pause)
            ));
            assert!(matches!(
                Cli::parse_from(["pomotask", "watch"]).command,
                Some(Commands::Watch)
            ));
        }

        #[test]
        fn test_parse_mode() {
            let cli = Cli::parse_from(["pomotask", "mode", "long-break"]);
            match cli.command {
                Some(Commands::Mode { mode }) => {
                    assert_eq!(TimerMode::from(mode), TimerMode::LongBreak);
                }
                _ => panic!("Expected Mode command"),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["pomotask", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reset Command Tests
    // ------------------------------------------------------------------------

    mod reset_args_tests {
        use super::*;

        fn parse_reset(args: &[&str]) -> ResetArgs {
            match Cli::parse_from(args).command {
                Some(Commands::Reset(args)) => args,
                _ => panic!("Expected Reset command"),
            }
        }

        #[test]
        fn test_reset_without_minutes() {
            assert_eq!(parse_reset(&["pomotask", "reset"]).minutes, None);
        }

        #[test]
        fn test_reset_with_minutes() {
            assert_eq!(
                parse_reset(&["pomotask", "reset", "--minutes", "10"]).minutes,
                Some(10)
            );
        }

        #[test]
        fn test_negative_minutes_pass_through() {
            assert_eq!(
                parse_reset(&["pomotask", "reset", "--minutes", "-5"]).minutes,
                Some(-5)
            );
        }
    }

    // ------------------------------------------------------------------------
    // Daemon Command Tests
    // ------------------------------------------------------------------------

    mod daemon_args_tests {
        use super::*;

        #[test]
        fn test_parse_daemon_defaults() {
            match Cli::parse_from(["pomotask", "daemon"]).command {
                Some(Commands::Daemon(args)) => {
                    assert!(args.focus.is_none());
                    assert!(args.break_minutes.is_none());
                    assert!(args.long_break.is_none());
                    assert!(!args.no_sound);
                    assert!(!args.no_notify);
                    assert!(!args.no_auto_reset);
                }
                _ => panic!("Expected Daemon command"),
            }
        }

        #[test]
        fn test_parse_daemon_all_options() {
            let cli = Cli::parse_from([
                "pomotask",
                "daemon",
                "--focus",
                "50",
                "--break",
                "10",
                "--long-break",
                "30",
                "--no-sound",
                "--no-notify",
                "--no-auto-reset",
            ]);
            match cli.command {
                Some(Commands::Daemon(args)) => {
                    assert_eq!(args.focus, Some(50));
                    assert_eq!(args.break_minutes, Some(10));
                    assert_eq!(args.long_break, Some(30));
                    assert!(args.no_sound);
                    assert!(args.no_notify);
                    assert!(args.no_auto_reset);
                }
                _ => panic!("Expected Daemon command"),
            }
        }

        #[test]
        fn test_parse_daemon_out_of_range() {
            assert!(Cli::try_parse_from(["pomotask", "daemon", "--focus", "0"]).is_err());
            assert!(Cli::try_parse_from(["pomotask", "daemon", "--focus", "121"]).is_err());
            assert!(Cli::try_parse_from(["pomotask", "daemon", "--break", "61"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Task / Stats / Ambient Tests
    // ------------------------------------------------------------------------

    mod other_command_tests {
        use super::*;

        #[test]
        fn test_parse_task_add() {
            match Cli::parse_from(["pomotask", "task", "add", "Write report"]).command {
                Some(Commands::Task {
                    action: TaskCommand::Add { text },
                }) => assert_eq!(text, "Write report"),
                _ => panic!("Expected task add"),
            }
        }

        #[test]
        fn test_parse_task_edit() {
            match Cli::parse_from(["pomotask", "task", "edit", "42", "New text"]).command {
                Some(Commands::Task {
                    action: TaskCommand::Edit { id, text },
                }) => {
                    assert_eq!(id, 42);
                    assert_eq!(text, "New text");
                }
                _ => panic!("Expected task edit"),
            }
        }

        #[test]
        fn test_parse_task_add_blank_rejected() {
            assert!(Cli::try_parse_from(["pomotask", "task", "add", "   "]).is_err());
        }

        #[test]
        fn test_parse_stats_days() {
            match Cli::parse_from(["pomotask", "stats"]).command {
                Some(Commands::Stats { days }) => assert_eq!(days, 7),
                _ => panic!("Expected Stats command"),
            }
            assert!(Cli::try_parse_from(["pomotask", "stats", "--days", "0"]).is_err());
        }

        #[test]
        fn test_parse_ambient() {
            match Cli::parse_from(["pomotask", "ambient", "rain", "--volume", "0.3"]).command {
                Some(Commands::Ambient(args)) => {
                    assert_eq!(args.sound, AmbientSound::Rain);
                    assert_eq!(args.volume, Some(0.3));
                }
                _ => panic!("Expected Ambient command"),
            }
        }

        #[test]
        fn test_parse_ambient_invalid() {
            assert!(Cli::try_parse_from(["pomotask", "ambient", "thunder"]).is_err());
            assert!(
                Cli::try_parse_from(["pomotask", "ambient", "rain", "--volume", "1.5"]).is_err()
            );
        }
    }

    // ------------------------------------------------------------------------
    // Validation Tests
    // ------------------------------------------------------------------------

    mod validation_tests {
        use super::*;

        #[test]
        fn test_validate_task_text() {
            assert_eq!(validate_task_text("タスク").unwrap(), "タスク");
            assert!(validate_task_text("").unwrap_err().contains("空"));
            assert!(validate_task_text(&"a".repeat(201))
                .unwrap_err()
                .contains("200"));
            assert!(validate_task_text(&"あ".repeat(200)).is_ok());
        }

        #[test]
        fn test_validate_volume() {
            assert_eq!(validate_volume("0").unwrap(), 0.0);
            assert_eq!(validate_volume("1.0").unwrap(), 1.0);
            assert!(validate_volume("-0.1").is_err());
            assert!(validate_volume("loud").is_err());
        }
    }
}

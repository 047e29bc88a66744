//! Display utilities for the pomotask CLI.
//!
//! This module provides formatted output for:
//! - Timer command results and status
//! - The task list
//! - Daily statistics
//! - Error messages

use crate::stats::DailyLog;
use crate::tasks::{EditOutcome, Task};
use crate::types::{IpcResponse, ResponseData};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    // ------------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------------

    /// Shows the daemon's message followed by the remaining time.
    pub fn show_command_result(response: &IpcResponse) {
        println!("* {}", response.message);

        if let Some(data) = &response.data {
            println!("  {}", Self::format_timer_line(data));
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse, sessions_today: u32) {
        println!("タイマー ステータス");
        println!("─────────────────────────────");

        match &response.data {
            Some(data) => {
                println!("モード: {}", data.mode.label());
                println!(
                    "状態: {}",
                    if data.is_running { "実行中" } else { "停止中" }
                );
                println!("残り時間: {}", data.display);
            }
            None => println!("タイマーは起動していません"),
        }
        println!("{}", Self::format_sessions_today(sessions_today));
    }

    pub fn format_sessions_today(count: u32) -> String {
        format!("今日の集中セッション: {}回", count)
    }

    /// `"<label> 残り時間: MM:SS (実行中|停止中)"`.
    pub fn format_timer_line(data: &ResponseData) -> String {
        format!(
            "{} 残り時間: {} ({})",
            data.mode.label(),
            data.display,
            if data.is_running { "実行中" } else { "停止中" }
        )
    }

    /// OSC 0 escape that sets the terminal window title.
    pub fn terminal_title(title: &str) -> String {
        format!("\x1b]0;{}\x07", title)
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    pub fn show_tasks(tasks: &[Task]) {
        if tasks.is_empty() {
            println!("タスクはありません");
            return;
        }

        for task in tasks {
            println!("{}", Self::format_task(task));
        }

        let done = tasks.iter().filter(|t| t.done).count();
        println!("─────────────────────────────");
        println!("完了 {}/{}", done, tasks.len());
    }

    /// `"[x] <id>  <text>"` for done tasks, `"[ ] ..."` otherwise.
    pub fn format_task(task: &Task) -> String {
        format!(
            "[{}] {}  {}",
            if task.done { "x" } else { " " },
            task.id,
            task.text
        )
    }

    pub fn show_task_added(task: &Task) {
        println!("* タスクを追加しました");
        println!("  {}", Self::format_task(task));
    }

    pub fn show_task_toggled(task: &Task) {
        if task.done {
            println!("* タスクを完了にしました");
        } else {
            println!("* タスクを未完了に戻しました");
        }
        println!("  {}", Self::format_task(task));
    }

    pub fn show_task_removed(task: &Task) {
        println!("* タスクを削除しました");
        println!("  {}", Self::format_task(task));
    }

    pub fn show_task_edited(outcome: &EditOutcome) {
        match outcome {
            EditOutcome::Updated(task) => {
                println!("* タスクを更新しました");
                println!("  {}", Self::format_task(task));
            }
            EditOutcome::Removed => println!("* 内容が空のためタスクを削除しました"),
        }
    }

    // ------------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------------

    /// Shows one row per day plus a total line.
    pub fn show_stats(days: &[DailyLog]) {
        println!("日付        集中(分) 休憩(分) セッション タスク");
        println!("──────────────────────────────────────────────");
        for day in days {
            println!("{}", Self::format_stats_row(day));
        }
        println!("──────────────────────────────────────────────");
        println!("{}", Self::format_stats_row(&Self::total(days)));
    }

    pub fn format_stats_row(day: &DailyLog) -> String {
        format!(
            "{:<10} {:>8} {:>8} {:>10} {:>6}",
            day.date, day.focus_minutes, day.break_minutes, day.sessions_completed, day.tasks_completed
        )
    }

    /// Sums `days` into one entry labelled "合計".
    pub fn total(days: &[DailyLog]) -> DailyLog {
        days.iter().fold(
            DailyLog {
                date: "合計".to_string(),
                ..DailyLog::default()
            },
            |mut acc, day| {
                acc.focus_minutes += day.focus_minutes;
                acc.break_minutes += day.break_minutes;
                acc.sessions_completed += day.sessions_completed;
                acc.tasks_completed += day.tasks_completed;
                acc
            },
        )
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Plain-text views of the board.

use std::fmt::Write;

use focuslab_client::Board;
use focuslab_types::stats::{Progress, WeekSummary, habit_streak, month_progress};
use focuslab_types::text::{short_id, truncate_with_ellipsis};
use focuslab_types::{Day, Habit};

const ID_WIDTH: usize = 8;
const TEXT_WIDTH: usize = 48;
const HABIT_NAME_WIDTH: usize = 18;
const BAR_WIDTH: usize = 20;
const BANNER_WIDTH: usize = 72;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn fraction(progress: Progress) -> String {
    if progress.is_empty() {
        "0/0".to_string()
    } else {
        format!(
            "{}/{} ({:.0}%)",
            progress.completed,
            progress.total,
            progress.percent()
        )
    }
}

fn check(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

/// Monday..Sunday columns, one block per day.
pub fn week(board: &Board, any_day: Day, today: Day) -> String {
    let days = any_day.week();
    let mut out = String::new();
    let _ = writeln!(out, "Week of {} to {}", days[0], days[6]);

    for day in days {
        let marker = if day == today { "*" } else { " " };
        let tasks: Vec<_> = board.tasks_on(day).collect();
        let _ = writeln!(
            out,
            "\n{marker}{} {}  {}",
            day.weekday_name(),
            day,
            fraction(board.progress_on(day))
        );
        if tasks.is_empty() {
            let _ = writeln!(out, "    (no tasks)");
        }
        for task in tasks {
            let _ = writeln!(
                out,
                "    {} {:<ID_WIDTH$}  {}",
                check(task.is_completed),
                short_id(task.id.as_str(), ID_WIDTH),
                truncate_with_ellipsis(&task.text, TEXT_WIDTH)
            );
        }
    }
    out
}

fn habit_row(slot: usize, habit: &Habit, days: &[Day; 7], today: Day) -> String {
    let name = truncate_with_ellipsis(&habit.name, HABIT_NAME_WIDTH);
    if habit.is_placeholder() {
        return format!("{slot}  {name:<HABIT_NAME_WIDTH$}  (rename to start tracking)");
    }
    let marks: Vec<&str> = days
        .iter()
        .map(|day| if habit.is_done_on(*day) { " x " } else { " . " })
        .collect();
    format!(
        "{slot}  {name:<HABIT_NAME_WIDTH$} {}  {:>3}",
        marks.join(" "),
        habit_streak(habit, today)
    )
}

/// Habit grid for the week containing `any_day`.
pub fn habits(board: &Board, any_day: Day, today: Day) -> String {
    let days = any_day.week();
    let mut out = String::new();
    let header: Vec<String> = days
        .iter()
        .map(|day| format!("{:<3}", day.weekday_name()))
        .collect();
    let _ = writeln!(
        out,
        "#  {:<HABIT_NAME_WIDTH$} {}  Streak",
        "Habit",
        header.join(" ")
    );
    for (index, habit) in board.habits().iter().enumerate() {
        let _ = writeln!(out, "{}", habit_row(index + 1, habit, &days, today));
    }
    out
}

fn bar(progress: Progress, scale: usize) -> String {
    let scale = scale.max(1);
    let filled = progress.total * BAR_WIDTH / scale;
    let done = progress.completed * BAR_WIDTH / scale;
    format!(
        "{}{}{}",
        "#".repeat(done),
        "-".repeat(filled.saturating_sub(done)),
        " ".repeat(BAR_WIDTH.saturating_sub(filled))
    )
}

/// Today, week and month completion plus a weekly bar chart.
pub fn stats(board: &Board, today: Day) -> String {
    let summary = WeekSummary::new(board.tasks(), today);
    let month = month_progress(board.tasks(), today.year(), today.month());
    let month_name = MONTH_NAMES
        .get(today.month().saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Month");

    let mut out = String::new();
    let _ = writeln!(out, "Today       {}", fraction(board.progress_on(today)));
    let _ = writeln!(out, "This week   {}", fraction(summary.total()));
    let _ = writeln!(
        out,
        "{:<11} {}",
        format!("{month_name} {}", today.year()),
        fraction(month)
    );
    let _ = writeln!(out);
    for (day, progress) in &summary.days {
        let _ = writeln!(
            out,
            "{} |{}| {}/{}",
            day.weekday_name(),
            bar(*progress, summary.scale),
            progress.completed,
            progress.total
        );
    }

    let named: Vec<&Habit> = board.habits().iter().filter(|h| !h.is_placeholder()).collect();
    if !named.is_empty() {
        let _ = writeln!(out, "\nStreaks");
        for habit in named {
            let _ = writeln!(
                out,
                "  {:<HABIT_NAME_WIDTH$} {} day(s)",
                truncate_with_ellipsis(&habit.name, HABIT_NAME_WIDTH),
                habit_streak(habit, today)
            );
        }
    }
    out
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(width.max(1)) {
            if current_len > 0 && current_len + 1 + piece.len() > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(piece);
            current_len += piece.len();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn banner(quote: &str) -> String {
    let lines = wrap(quote, BANNER_WIDTH);
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let rule = "=".repeat(widest + 4);
    let mut out = rule.clone();
    for line in &lines {
        let _ = write!(out, "\n  {line}");
    }
    let _ = write!(out, "\n{rule}");
    out
}

//! Day history, streaks, and cumulative stats.
//!
//! Stats are never edited directly: they are recomputed from the day
//! history after every completed workout.

use crate::{DayHistory, DayHistoryEntry, Result, UserStats, WorkoutSummary};
use chrono::{Duration, NaiveDate};
use std::path::Path;

/// Consecutive recorded days ending today, or ending on the most recent
/// recorded day when today has no entry yet
///
/// Only the presence of a day key counts. Days after `today` are ignored.
pub fn compute_streak(history: &DayHistory, today: NaiveDate) -> u32 {
    let Some((&anchor, _)) = history.range(..=today).next_back() else {
        return 0;
    };

    let mut streak = 0;
    let mut day = anchor;
    while history.contains_key(&day) {
        streak += 1;
        match day.checked_sub_signed(Duration::days(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Recompute cumulative stats from the day history
pub fn derive_stats(history: &DayHistory, today: NaiveDate) -> UserStats {
    UserStats {
        total_workouts: history.len() as u32,
        total_time: history.values().map(|e| e.total_time).sum(),
        total_calories: history.values().map(|e| e.calories_burned).sum(),
        current_streak: compute_streak(history, today),
        last_workout_day: history.keys().next_back().copied(),
    }
}

/// 1-based program day for the next workout
pub fn current_day(history: &DayHistory) -> u32 {
    history.len() as u32 + 1
}

/// Insert or overwrite the entry for the summary's date
pub fn record_completion(history: &mut DayHistory, summary: &WorkoutSummary) {
    let previous = history.insert(
        summary.date,
        DayHistoryEntry {
            day: summary.plan_day,
            exercises_completed: summary.exercises_completed,
            total_time: summary.total_time_spent,
            calories_burned: summary.calories_burned,
            completed_at: summary.completed_at,
        },
    );

    if previous.is_some() {
        tracing::info!("Replaced existing history entry for {}", summary.date);
    } else {
        tracing::info!("Recorded workout for {}", summary.date);
    }
}

/// The last `days` calendar days ending at `today`, oldest first, flagged
/// with whether a workout was recorded
pub fn recent_days(history: &DayHistory, today: NaiveDate, days: u32) -> Vec<(NaiveDate, bool)> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_signed(Duration::days(i64::from(offset))))
        .map(|date| (date, history.contains_key(&date)))
        .collect()
}

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    day: u32,
    exercises_completed: u32,
    total_time: u64,
    calories_burned: f64,
    completed_at: String,
}

impl From<(&NaiveDate, &DayHistoryEntry)> for CsvRow {
    fn from((date, entry): (&NaiveDate, &DayHistoryEntry)) -> Self {
        CsvRow {
            date: date.to_string(),
            day: entry.day,
            exercises_completed: entry.exercises_completed,
            total_time: entry.total_time,
            calories_burned: entry.calories_burned,
            completed_at: entry.completed_at.to_rfc3339(),
        }
    }
}

/// Write the whole history to `path` as CSV, oldest day first
///
/// Returns the number of rows written.
pub fn export_csv(history: &DayHistory, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in history.iter().map(CsvRow::from) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Exported {} history rows to {:?}", history.len(), path);
    Ok(history.len())
}

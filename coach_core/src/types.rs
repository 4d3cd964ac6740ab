//! Core domain types for the workout coach.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises, their calorie rate model, and the daily plan
//! - The mutable session state driven by the engine
//! - Day history, cumulative stats, and completion summaries
//!
//! Persisted structures serialize with camelCase field names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Profile Types
// ============================================================================

/// Training experience used to pick exercises from the catalog
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FitnessLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// Audience an exercise is written for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Both,
}

/// Training goal an exercise supports
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Goal {
    WeightLoss,
    MuscleGain,
    Health,
    #[default]
    General,
}

/// The user attributes that shape today's plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub fitness_level: FitnessLevel,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub goal: Goal,
}

fn default_user_id() -> String {
    "local".into()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            fitness_level: FitnessLevel::default(),
            gender: Gender::default(),
            goal: Goal::default(),
        }
    }
}

// ============================================================================
// Exercise Types
// ============================================================================

/// How calories accrue for an exercise. Exactly one model applies.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum CalorieRate {
    /// Accrues `rate / 60` on every exercising tick
    #[serde(rename = "caloriesPerMinute")]
    PerMinute(f64),
    /// Accrues `rate` on every completed rep
    #[serde(rename = "caloriesPerRep")]
    PerRep(f64),
}

impl CalorieRate {
    pub fn value(&self) -> f64 {
        match self {
            CalorieRate::PerMinute(v) | CalorieRate::PerRep(v) => *v,
        }
    }
}

/// Whether a set ends on counted reps or on elapsed hold time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExerciseMode {
    Reps,
    Duration,
}

/// A single exercise in a plan (immutable for the session)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    /// 0 means duration-based
    pub target_reps: u32,
    /// Seconds; the set length in duration mode, a hold hint in rep mode
    pub target_duration: u32,
    pub set_count: u32,
    pub rest_seconds: u32,
    #[serde(flatten)]
    pub calories: CalorieRate,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub level: FitnessLevel,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub goal: Goal,
}

impl Exercise {
    pub fn mode(&self) -> ExerciseMode {
        if self.target_reps > 0 {
            ExerciseMode::Reps
        } else {
            ExerciseMode::Duration
        }
    }

    /// Check the exercise's own invariants, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push("Exercise has empty ID".to_string());
        }
        if self.name.is_empty() {
            errors.push(format!("Exercise '{}' has empty name", self.id));
        }
        if self.set_count == 0 {
            errors.push(format!("Exercise '{}' has zero sets", self.id));
        }
        if self.mode() == ExerciseMode::Duration && self.target_duration == 0 {
            errors.push(format!(
                "Exercise '{}' has neither target reps nor target duration",
                self.id
            ));
        }

        let rate = self.calories.value();
        if !rate.is_finite() || rate < 0.0 {
            errors.push(format!(
                "Exercise '{}' has invalid calorie rate {}",
                self.id, rate
            ));
        }
        if matches!(self.calories, CalorieRate::PerRep(_))
            && self.mode() == ExerciseMode::Duration
        {
            errors.push(format!(
                "Exercise '{}' is duration-based but uses a per-rep calorie rate",
                self.id
            ));
        }

        errors
    }
}

/// Ordered exercises for one training day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    /// 1-based program day this plan was built for
    pub day: u32,
    pub exercises: Vec<Exercise>,
}

impl WorkoutPlan {
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Estimated minutes: hold time plus rest for every set
    pub fn estimated_minutes(&self) -> f64 {
        let seconds: u32 = self
            .exercises
            .iter()
            .map(|e| (e.target_duration + e.rest_seconds) * e.set_count)
            .sum();
        f64::from(seconds) / 60.0
    }

    /// Validate every exercise plus plan-level rules (non-empty, unique ids)
    pub fn validate(&self) -> Vec<String> {
        validate_exercises("Plan", &self.exercises)
    }
}

/// Check a list of exercises: non-empty, unique ids, each exercise valid.
/// `owner` names the list in the empty-list message.
pub(crate) fn validate_exercises(owner: &str, exercises: &[Exercise]) -> Vec<String> {
    let mut errors = Vec::new();
    if exercises.is_empty() {
        errors.push(format!("{} has no exercises", owner));
    }

    let mut seen = std::collections::HashSet::new();
    for exercise in exercises {
        if !seen.insert(exercise.id.as_str()) {
            errors.push(format!("Duplicate exercise id '{}'", exercise.id));
        }
        errors.extend(exercise.validate());
    }
    errors
}

/// The pool of exercises plans are drawn from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Engine state-machine phase
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Exercising,
    Resting,
    ExerciseComplete,
    WorkoutComplete,
}

/// The mutable core of a workout, owned by the engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub exercise_index: usize,
    /// 1-based
    pub set_index: u32,
    pub reps_in_set: u32,
    /// Counts up while exercising, counts down while resting
    pub elapsed_seconds: u32,
    pub total_time_spent: u64,
    pub calories_burned: f64,
    pub exercises_completed: u32,
    pub phase: Phase,
    /// Phase to return to on resume, set only while paused in Idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_phase: Option<Phase>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            exercise_index: 0,
            set_index: 1,
            reps_in_set: 0,
            elapsed_seconds: 0,
            total_time_spent: 0,
            calories_burned: 0.0,
            exercises_completed: 0,
            phase: Phase::Idle,
            paused_phase: None,
        }
    }
}

impl SessionState {
    /// Whether this state is structurally valid against `plan`
    pub fn fits(&self, plan: &WorkoutPlan) -> bool {
        let len = plan.exercises.len();
        if self.exercise_index > len {
            return false;
        }
        if self.exercise_index == len {
            return self.phase == Phase::WorkoutComplete;
        }
        if matches!(self.phase, Phase::WorkoutComplete | Phase::ExerciseComplete) {
            return false;
        }
        // Only a paused Idle remembers a phase, and only a timed one
        match (self.phase, self.paused_phase) {
            (_, None) | (Phase::Idle, Some(Phase::Exercising | Phase::Resting)) => {}
            _ => return false,
        }

        let exercise = &plan.exercises[self.exercise_index];
        let resting = self.phase == Phase::Resting || self.paused_phase == Some(Phase::Resting);
        // A rest always leads into another set of the same exercise
        let rest_fits = self.set_index < exercise.set_count
            && exercise.rest_seconds > 0
            && self.elapsed_seconds <= exercise.rest_seconds;
        self.set_index >= 1
            && self.set_index <= exercise.set_count
            && self.reps_in_set <= exercise.target_reps
            && (!resting || rest_fits)
            && self.calories_burned.is_finite()
            && self.calories_burned >= 0.0
    }
}

/// Read-only view of the session handed to presenters
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: SessionState,
    pub exercise: Option<Exercise>,
    pub total_exercises: usize,
    /// Advisory rep pacing in rep mode; never drives the rep count
    pub expected_reps: Option<u32>,
}

// ============================================================================
// History and Stats Types
// ============================================================================

/// Totals recorded for one calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayHistoryEntry {
    pub day: u32,
    pub exercises_completed: u32,
    pub total_time: u64,
    pub calories_burned: f64,
    pub completed_at: DateTime<Utc>,
}

/// Day history keyed by calendar date; a key present means "worked out"
pub type DayHistory = BTreeMap<NaiveDate, DayHistoryEntry>;

/// Cumulative stats, always derived from [`DayHistory`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_workouts: u32,
    pub total_time: u64,
    pub total_calories: f64,
    pub current_streak: u32,
    pub last_workout_day: Option<NaiveDate>,
}

/// What a closed workout produced
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub plan_day: u32,
    pub exercises_completed: u32,
    pub exercises_total: usize,
    pub total_time_spent: u64,
    pub calories_burned: f64,
    pub current_streak: u32,
    pub completed_at: DateTime<Utc>,
}

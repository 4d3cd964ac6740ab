//! Default exercise catalog and catalog loading.
//!
//! The built-in catalog is a short bodyweight routine. It is also the
//! fallback plan when no plan source can produce one.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::path::Path;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    name: &str,
    emoji: &str,
    target_reps: u32,
    target_duration: u32,
    rest_seconds: u32,
    calories: CalorieRate,
    instructions: &str,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        target_reps,
        target_duration,
        set_count: 3,
        rest_seconds,
        calories,
        emoji: emoji.into(),
        instructions: instructions.into(),
        level: FitnessLevel::Beginner,
        gender: Gender::Both,
        goal: Goal::General,
    }
}

fn build_default_catalog_internal() -> Catalog {
    let exercises = vec![
        exercise(
            "push_up",
            "Push-up",
            "💪",
            12,
            30,
            60,
            CalorieRate::PerRep(0.5),
            "Hands shoulder-width apart, lower your chest to the floor, then push back up",
        ),
        exercise(
            "squat",
            "Bodyweight Squat",
            "🦵",
            15,
            45,
            60,
            CalorieRate::PerMinute(6.0),
            "Feet shoulder-width apart, sit back as if onto a chair, then stand",
        ),
        exercise(
            "plank",
            "Plank",
            "🏋️",
            0,
            45,
            60,
            CalorieRate::PerMinute(5.0),
            "Rest on forearms and toes, keep the body in a straight line",
        ),
        exercise(
            "lunge",
            "Forward Lunge",
            "🤸",
            10,
            40,
            60,
            CalorieRate::PerMinute(7.0),
            "Step forward, lower the back knee toward the floor, return to standing",
        ),
        exercise(
            "burpee",
            "Burpee",
            "🔥",
            8,
            30,
            90,
            CalorieRate::PerRep(1.0),
            "Jump, drop to the floor, do a push-up, jump again",
        ),
        exercise(
            "mountain_climber",
            "Mountain Climbers",
            "🏃",
            0,
            30,
            60,
            CalorieRate::PerMinute(10.0),
            "From a push-up position, drive the knees to the chest alternately",
        ),
    ];

    Catalog { exercises }
}

impl Catalog {
    /// Validate the catalog
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        validate_exercises("Catalog", &self.exercises)
    }

    /// Load a catalog from a JSON file and validate it
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&contents)?;

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::PlanValidation(errors.join("; ")));
        }

        tracing::info!(
            "Loaded catalog with {} exercises from {:?}",
            catalog.exercises.len(),
            path
        );
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }
}

/// The plan used when no source can supply one: the whole default catalog
pub fn fallback_plan(day: u32) -> WorkoutPlan {
    WorkoutPlan {
        day,
        exercises: get_default_catalog().exercises.clone(),
    }
}

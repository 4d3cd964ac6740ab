//! Today's workout plan.
//!
//! Plans are drawn from a catalog by profile and grow with the program day:
//! the base plan holds 14 exercises and one more is added every 2 days.

use crate::{Catalog, Error, Exercise, Profile, Result, WorkoutPlan};

const BASE_EXERCISES: usize = 14;

/// Anything that can produce the plan for today
pub trait PlanSource {
    fn today_plan(&self, user_id: &str) -> Result<WorkoutPlan>;
}

/// Plan source backed by a local catalog
pub struct CatalogPlanSource {
    catalog: Catalog,
    profile: Profile,
    day: u32,
}

impl CatalogPlanSource {
    pub fn new(catalog: Catalog, profile: Profile, day: u32) -> Self {
        Self {
            catalog,
            profile,
            day,
        }
    }
}

impl PlanSource for CatalogPlanSource {
    fn today_plan(&self, user_id: &str) -> Result<WorkoutPlan> {
        if user_id != self.profile.user_id {
            tracing::debug!(
                "Plan requested for {} with profile of {}",
                user_id,
                self.profile.user_id
            );
        }
        let plan = build_plan(&self.catalog, &self.profile, self.day);
        if plan.is_empty() {
            return Err(Error::Plan("catalog produced an empty plan".into()));
        }
        Ok(plan)
    }
}

/// Number of exercises scheduled on a 1-based program day
pub fn exercise_limit(day: u32) -> usize {
    BASE_EXERCISES + (day.saturating_sub(1) / 2) as usize
}

fn matches_profile(exercise: &Exercise, profile: &Profile) -> bool {
    use crate::{Gender, Goal};

    exercise.level == profile.fitness_level
        && (exercise.gender == profile.gender || exercise.gender == Gender::Both)
        && (exercise.goal == profile.goal || exercise.goal == Goal::General)
}

/// Pick exercises for `profile` on `day`
///
/// Falls back to the whole catalog when nothing matches the profile.
pub fn build_plan(catalog: &Catalog, profile: &Profile, day: u32) -> WorkoutPlan {
    let mut exercises: Vec<Exercise> = catalog
        .exercises
        .iter()
        .filter(|e| matches_profile(e, profile))
        .cloned()
        .collect();

    if exercises.is_empty() {
        tracing::info!(
            "No catalog exercises match profile {:?}/{:?}/{:?}, using full catalog",
            profile.fitness_level,
            profile.gender,
            profile.goal
        );
        exercises = catalog.exercises.clone();
    }

    exercises.truncate(exercise_limit(day));
    WorkoutPlan { day, exercises }
}

/// Ask `source` for today's plan, using `fallback` if it fails or is invalid
pub fn load_plan_or_fallback(
    source: &dyn PlanSource,
    user_id: &str,
    fallback: WorkoutPlan,
) -> WorkoutPlan {
    match source.today_plan(user_id) {
        Ok(plan) => {
            let errors = plan.validate();
            if errors.is_empty() {
                tracing::info!(
                    "Loaded plan for day {} with {} exercises",
                    plan.day,
                    plan.len()
                );
                plan
            } else {
                tracing::warn!("Plan failed validation: {}. Using fallback.", errors.join("; "));
                fallback
            }
        }
        Err(e) => {
            tracing::warn!("Failed to load today's plan: {}. Using fallback.", e);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_default_catalog, fallback_plan};
    use crate::{FitnessLevel, Gender, Goal};

    struct OfflineSource;

    impl PlanSource for OfflineSource {
        fn today_plan(&self, _user_id: &str) -> Result<WorkoutPlan> {
            Err(Error::Plan("backend unreachable".into()))
        }
    }

    #[test]
    fn test_exercise_limit_grows_every_two_days() {
        assert_eq!(exercise_limit(1), 14);
        assert_eq!(exercise_limit(2), 14);
        assert_eq!(exercise_limit(3), 15);
        assert_eq!(exercise_limit(7), 17);
        assert_eq!(exercise_limit(0), 14);
    }

    #[test]
    fn test_build_plan_filters_by_profile() {
        let mut catalog = build_default_catalog();
        catalog.exercises[0].gender = Gender::Female;
        catalog.exercises[1].goal = Goal::MuscleGain;

        let profile = Profile {
            gender: Gender::Male,
            goal: Goal::WeightLoss,
            ..Profile::default()
        };
        let plan = build_plan(&catalog, &profile, 1);

        assert_eq!(plan.exercises.len(), 4);
        assert!(plan.exercises.iter().all(|e| e.id != "push_up"));
        assert!(plan.exercises.iter().all(|e| e.id != "squat"));
    }

    #[test]
    fn test_build_plan_without_matches_uses_whole_catalog() {
        let catalog = build_default_catalog();
        let profile = Profile {
            fitness_level: FitnessLevel::Advanced,
            ..Profile::default()
        };
        let plan = build_plan(&catalog, &profile, 5);
        assert_eq!(plan.day, 5);
        assert_eq!(plan.exercises.len(), catalog.exercises.len());
    }

    #[test]
    fn test_build_plan_respects_limit() {
        let mut catalog = build_default_catalog();
        let template = catalog.exercises[2].clone();
        for i in 0..20 {
            let mut e = template.clone();
            e.id = format!("plank_{}", i);
            catalog.exercises.push(e);
        }

        let plan = build_plan(&catalog, &Profile::default(), 3);
        assert_eq!(plan.exercises.len(), 15);
    }

    #[test]
    fn test_failed_source_uses_fallback() {
        let fallback = fallback_plan(2);
        let plan = load_plan_or_fallback(&OfflineSource, "local", fallback.clone());
        assert_eq!(plan, fallback);
    }

    #[test]
    fn test_catalog_source_produces_plan() {
        let source = CatalogPlanSource::new(build_default_catalog(), Profile::default(), 1);
        let plan = load_plan_or_fallback(&source, "local", fallback_plan(1));
        assert_eq!(plan.exercises.len(), 6);
        assert_eq!(plan.exercises[0].id, "push_up");
    }
}

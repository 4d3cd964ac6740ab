//! Workout session engine.
//!
//! Drives one exercise at a time through its sets:
//!
//! ```text
//! Idle ──start──▶ Exercising ──target reached──▶ ExerciseComplete
//!                    ▲  │                          │        │
//!                    │  └──pause──▶ Idle (paused)  │ more   │ last set
//!                    │                             ▼ sets   ▼
//!                    └──rest over / skipRest── Resting    advance ──▶ next exercise
//!                                                                  └─▶ WorkoutComplete
//! ```
//!
//! The engine holds at most one clock subscription. Every phase start cancels
//! the previous subscription before subscribing again, and ticks carrying any
//! other subscription id are ignored.

use crate::clock::{Clock, SubscriptionId};
use crate::config::SessionConfig;
use crate::events::{Presenter, Warning};
use crate::history::{derive_stats, record_completion};
use crate::store::SessionStore;
use crate::{
    CalorieRate, Error, Exercise, ExerciseMode, Phase, Result, SessionState, Snapshot,
    WorkoutPlan, WorkoutSummary,
};
use chrono::{Local, NaiveDate, Utc};
use uuid::Uuid;

/// The session state machine. Sole owner and mutator of [`SessionState`].
pub struct SessionEngine<C: Clock, S: SessionStore, P: Presenter> {
    plan: WorkoutPlan,
    state: SessionState,
    clock: C,
    store: S,
    presenter: P,
    subscription: Option<SubscriptionId>,
    rep_cadence_seconds: u32,
    persist_every_tick: bool,
    persistence_degraded: bool,
    session_id: Uuid,
}

impl<C: Clock, S: SessionStore, P: Presenter> SessionEngine<C, S, P> {
    /// Build an engine for `plan`, resuming a saved session when one fits
    ///
    /// The saved-session load completes before this returns, so no action
    /// can ever be applied against a half-loaded state. A saved session
    /// that is malformed or does not fit the plan is discarded.
    pub fn open(
        plan: WorkoutPlan,
        clock: C,
        store: S,
        presenter: P,
        config: &SessionConfig,
    ) -> Result<Self> {
        let errors = plan.validate();
        if !errors.is_empty() {
            return Err(Error::PlanValidation(errors.join("; ")));
        }

        let mut engine = Self {
            plan,
            state: SessionState::default(),
            clock,
            store,
            presenter,
            subscription: None,
            rep_cadence_seconds: config.rep_cadence_seconds.max(1),
            persist_every_tick: config.persist_every_tick,
            persistence_degraded: false,
            session_id: Uuid::new_v4(),
        };
        engine.restore();
        Ok(engine)
    }

    fn restore(&mut self) {
        let discarded = match self.store.load_session() {
            Ok(None) => {
                tracing::debug!("No saved session, starting fresh");
                return;
            }
            Ok(Some(saved)) if saved.fits(&self.plan) => {
                self.state = saved;
                // A session saved mid-phase was interrupted without pause();
                // nothing is ticking now, so it comes back paused.
                if matches!(self.state.phase, Phase::Exercising | Phase::Resting) {
                    self.state.paused_phase = Some(self.state.phase);
                    self.state.phase = Phase::Idle;
                }
                tracing::info!(
                    "Resumed saved session at exercise {} set {} ({:?})",
                    self.state.exercise_index + 1,
                    self.state.set_index,
                    self.state.paused_phase.unwrap_or(self.state.phase)
                );
                return;
            }
            Ok(Some(saved)) => format!(
                "exercise {} set {} does not fit today's plan",
                saved.exercise_index + 1,
                saved.set_index
            ),
            Err(e) => e.to_string(),
        };

        tracing::warn!("Discarding saved session: {}", discarded);
        self.presenter.on_warning(&Warning::SavedSessionDiscarded {
            reason: discarded,
        });
        if let Err(e) = self.store.clear_session() {
            self.persistence_failed("clear saved session", e);
        }
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_paused(&self) -> bool {
        self.state.phase == Phase::Idle && self.state.paused_phase.is_some()
    }

    /// The one live clock subscription, if a phase is running
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.plan.exercises.get(self.state.exercise_index)
    }

    pub fn snapshot(&self) -> Snapshot {
        let exercise = self.current_exercise().cloned();
        let expected_reps = match &exercise {
            Some(e) if e.mode() == ExerciseMode::Reps && self.state.phase == Phase::Exercising => {
                Some((self.state.elapsed_seconds / self.rep_cadence_seconds).min(e.target_reps))
            }
            _ => None,
        };

        Snapshot {
            state: self.state.clone(),
            exercise,
            total_exercises: self.plan.len(),
            expected_reps,
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Begin the workout, or continue a paused one
    pub fn start(&mut self) -> bool {
        if self.state.phase != Phase::Idle {
            tracing::debug!("start() ignored in {:?}", self.state.phase);
            return false;
        }
        if self.state.paused_phase.is_some() {
            return self.resume();
        }

        tracing::info!(
            "Starting workout: {} exercises, day {}",
            self.plan.len(),
            self.plan.day
        );
        self.state.set_index = 1;
        self.state.reps_in_set = 0;
        self.state.elapsed_seconds = 0;
        self.enter_phase(Phase::Exercising);
        true
    }

    /// Return to the phase that was paused, with every counter unchanged
    pub fn resume(&mut self) -> bool {
        let Some(phase) = self.state.paused_phase else {
            tracing::debug!("resume() ignored: not paused");
            return false;
        };
        if self.state.phase != Phase::Idle {
            return false;
        }

        self.state.paused_phase = None;
        tracing::info!("Resuming {:?}", phase);
        self.enter_phase(phase);
        true
    }

    /// Stop the clock and persist; progress is kept exactly as it was
    pub fn pause(&mut self) -> bool {
        let phase = self.state.phase;
        if !matches!(phase, Phase::Exercising | Phase::Resting) {
            tracing::debug!("pause() ignored in {:?}", phase);
            return false;
        }

        self.stop_clock();
        self.state.paused_phase = Some(phase);
        self.state.phase = Phase::Idle;
        tracing::info!("Paused during {:?}", phase);
        self.publish_phase();
        true
    }

    /// Apply one clock tick. Ticks for any subscription other than the live
    /// one are dropped.
    pub fn tick(&mut self, id: SubscriptionId) -> bool {
        if self.subscription != Some(id) {
            tracing::debug!("Dropping tick for inactive subscription {}", id.raw());
            return false;
        }

        match self.state.phase {
            Phase::Exercising => {
                let Some(exercise) = self.current_exercise() else {
                    return false;
                };
                let mode = exercise.mode();
                let target_duration = exercise.target_duration;
                let per_tick = match exercise.calories {
                    CalorieRate::PerMinute(rate) => Some(rate / 60.0),
                    CalorieRate::PerRep(_) => None,
                };

                self.state.elapsed_seconds = self.state.elapsed_seconds.saturating_add(1);
                if let Some(calories) = per_tick {
                    self.state.calories_burned += calories;
                }
                self.publish_tick();

                if mode == ExerciseMode::Duration && self.state.elapsed_seconds >= target_duration
                {
                    self.finish_set();
                }
                true
            }
            Phase::Resting => {
                self.state.elapsed_seconds = self.state.elapsed_seconds.saturating_sub(1);
                self.publish_tick();

                if self.state.elapsed_seconds == 0 {
                    self.next_set();
                }
                true
            }
            _ => false,
        }
    }

    /// Count one repetition. The only way reps ever increase.
    pub fn complete_rep(&mut self) -> bool {
        if self.state.phase != Phase::Exercising {
            return false;
        }
        let Some(exercise) = self.current_exercise() else {
            return false;
        };
        if exercise.mode() != ExerciseMode::Reps || self.state.reps_in_set >= exercise.target_reps
        {
            return false;
        }
        let target = exercise.target_reps;
        let per_rep = match exercise.calories {
            CalorieRate::PerRep(rate) => Some(rate),
            CalorieRate::PerMinute(_) => None,
        };

        self.state.reps_in_set += 1;
        if let Some(calories) = per_rep {
            self.state.calories_burned += calories;
        }
        tracing::debug!("Rep {}/{}", self.state.reps_in_set, target);

        let snapshot = self.snapshot();
        self.presenter.on_rep_counted(&snapshot);

        if self.state.reps_in_set == target {
            self.finish_set();
        } else {
            self.persist();
        }
        true
    }

    /// End the current set now, whatever its progress
    pub fn complete_set(&mut self) -> bool {
        if self.state.phase != Phase::Exercising {
            return false;
        }
        tracing::debug!("Set {} completed manually", self.state.set_index);
        self.finish_set();
        true
    }

    /// Cut the current rest short and start the next set
    pub fn skip_rest(&mut self) -> bool {
        if self.state.phase != Phase::Resting {
            return false;
        }
        self.stop_clock();
        self.state.elapsed_seconds = 0;
        tracing::debug!("Rest skipped");
        self.next_set();
        true
    }

    /// Move to the next exercise without crediting this one
    pub fn skip(&mut self) -> bool {
        let phase = self.state.phase;
        if !matches!(phase, Phase::Exercising | Phase::Resting) {
            return false;
        }

        self.stop_clock();
        if phase == Phase::Exercising {
            self.state.total_time_spent += u64::from(self.state.elapsed_seconds);
        }
        if let Some(exercise) = self.current_exercise() {
            tracing::info!("Skipped {}", exercise.name);
        }
        self.advance_exercise();
        true
    }

    // ------------------------------------------------------------------
    // Lifecycle end
    // ------------------------------------------------------------------

    /// Finish a completed workout dated today (local time)
    pub fn close(self) -> std::result::Result<WorkoutSummary, Self> {
        let today = Local::now().date_naive();
        self.close_on(today)
    }

    /// Finish a completed workout: record `today` in the history, recompute
    /// stats, and clear the saved session
    ///
    /// Consumes the engine. If the workout is not complete yet, the engine
    /// is handed back untouched.
    pub fn close_on(mut self, today: NaiveDate) -> std::result::Result<WorkoutSummary, Self> {
        if self.state.phase != Phase::WorkoutComplete {
            tracing::debug!("close() ignored in {:?}", self.state.phase);
            return Err(self);
        }

        let mut summary = WorkoutSummary {
            session_id: self.session_id,
            date: today,
            plan_day: self.plan.day,
            exercises_completed: self.state.exercises_completed,
            exercises_total: self.plan.len(),
            total_time_spent: self.state.total_time_spent,
            calories_burned: self.state.calories_burned,
            current_streak: 0,
            completed_at: Utc::now(),
        };

        // If the stored history cannot be read, it is not overwritten.
        let (mut history, history_readable) = match self.store.load_history() {
            Ok(history) => (history, true),
            Err(e) => {
                self.persistence_failed("load history", e);
                (Default::default(), false)
            }
        };

        record_completion(&mut history, &summary);
        if history_readable {
            if let Err(e) = self.store.save_history(&history) {
                self.persistence_failed("save history", e);
            }
        }

        let stats = derive_stats(&history, today);
        summary.current_streak = stats.current_streak;
        if let Err(e) = self.store.save_stats(&stats) {
            self.persistence_failed("save stats", e);
        }
        if let Err(e) = self.store.clear_session() {
            self.persistence_failed("clear session", e);
        }

        tracing::info!(
            "Workout closed: {}/{} exercises, {}s, {:.1} kcal, streak {}",
            summary.exercises_completed,
            summary.exercises_total,
            summary.total_time_spent,
            summary.calories_burned,
            summary.current_streak
        );
        self.presenter.on_workout_complete(&summary);
        Ok(summary)
    }

    /// Drop the session without recording it
    pub fn abandon(mut self) {
        self.stop_clock();
        if let Err(e) = self.store.clear_session() {
            self.persistence_failed("clear session", e);
        }
        tracing::info!(
            "Workout abandoned at exercise {}",
            self.state.exercise_index + 1
        );
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Current set reached its target (or was forced)
    fn finish_set(&mut self) {
        self.stop_clock();
        self.state.total_time_spent += u64::from(self.state.elapsed_seconds);
        self.state.phase = Phase::ExerciseComplete;
        let snapshot = self.snapshot();
        self.presenter.on_phase_changed(&snapshot);

        let Some(exercise) = self.current_exercise() else {
            return;
        };
        let set_count = exercise.set_count;
        let rest_seconds = exercise.rest_seconds;

        if self.state.set_index < set_count {
            if rest_seconds == 0 {
                self.next_set();
                return;
            }
            self.state.elapsed_seconds = rest_seconds;
            self.enter_phase(Phase::Resting);
        } else {
            self.state.exercises_completed += 1;
            self.advance_exercise();
        }
    }

    fn next_set(&mut self) {
        self.state.set_index += 1;
        self.state.reps_in_set = 0;
        self.state.elapsed_seconds = 0;
        tracing::debug!("Starting set {}", self.state.set_index);
        self.enter_phase(Phase::Exercising);
    }

    fn advance_exercise(&mut self) {
        self.stop_clock();
        self.state.set_index = 1;
        self.state.reps_in_set = 0;
        self.state.elapsed_seconds = 0;

        if self.state.exercise_index + 1 < self.plan.len() {
            self.state.exercise_index += 1;
            let snapshot = self.snapshot();
            self.presenter.on_exercise_advanced(&snapshot);
            self.enter_phase(Phase::Exercising);
        } else {
            self.state.exercise_index = self.plan.len();
            self.state.phase = Phase::WorkoutComplete;
            tracing::info!(
                "Workout complete: {} of {} exercises",
                self.state.exercises_completed,
                self.plan.len()
            );
            self.publish_phase();
        }
    }

    /// Start a timed phase on a fresh subscription
    fn enter_phase(&mut self, phase: Phase) {
        self.stop_clock();
        self.subscription = Some(self.clock.subscribe());
        self.state.phase = phase;
        self.publish_phase();
    }

    fn stop_clock(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.clock.cancel(id);
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    fn publish_phase(&mut self) {
        self.persist();
        let snapshot = self.snapshot();
        self.presenter.on_phase_changed(&snapshot);
    }

    fn publish_tick(&mut self) {
        if self.persist_every_tick {
            self.persist();
        }
        let snapshot = self.snapshot();
        self.presenter.on_tick(&snapshot);
    }

    fn persist(&mut self) {
        match self.store.save_session(&self.state) {
            Ok(()) => {
                if self.persistence_degraded {
                    tracing::info!("Session persistence recovered");
                    self.persistence_degraded = false;
                }
            }
            Err(e) => self.persistence_failed("save session", e),
        }
    }

    /// Report a storage failure once per outage; the session carries on
    fn persistence_failed(&mut self, operation: &'static str, error: Error) {
        if self.persistence_degraded {
            tracing::debug!("Still unable to {}: {}", operation, error);
            return;
        }
        self.persistence_degraded = true;
        tracing::warn!("Unable to {}: {}. Continuing in memory.", operation, error);
        self.presenter.on_warning(&Warning::PersistenceFailed {
            operation,
            message: error.to_string(),
        });
    }
}

impl<C: Clock, S: SessionStore, P: Presenter> Drop for SessionEngine<C, S, P> {
    fn drop(&mut self) {
        self.stop_clock();
    }
}

//! Engine-to-presentation event contract.
//!
//! Presenters receive data-only copies; they never get a handle that could
//! mutate the session.

use crate::{Snapshot, WorkoutSummary};

/// Non-fatal problems surfaced while a session keeps running
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A storage operation failed; the session continues in memory
    PersistenceFailed {
        operation: &'static str,
        message: String,
    },
    /// A saved session could not be used and was discarded
    SavedSessionDiscarded { reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::PersistenceFailed { operation, message } => {
                write!(f, "could not {}: {} (progress kept in memory)", operation, message)
            }
            Warning::SavedSessionDiscarded { reason } => {
                write!(f, "saved session discarded: {}", reason)
            }
        }
    }
}

/// Receives engine events. All methods default to doing nothing.
pub trait Presenter {
    fn on_phase_changed(&mut self, _snapshot: &Snapshot) {}
    fn on_tick(&mut self, _snapshot: &Snapshot) {}
    fn on_rep_counted(&mut self, _snapshot: &Snapshot) {}
    fn on_exercise_advanced(&mut self, _snapshot: &Snapshot) {}
    fn on_workout_complete(&mut self, _summary: &WorkoutSummary) {}
    fn on_warning(&mut self, _warning: &Warning) {}
}

/// Presenter that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// One recorded event, as captured by [`RecordingPresenter`]
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    PhaseChanged(Snapshot),
    Tick(Snapshot),
    RepCounted(Snapshot),
    ExerciseAdvanced(Snapshot),
    WorkoutComplete(WorkoutSummary),
    Warning(Warning),
}

/// Presenter that keeps every event in order
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<Event>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.events.iter().filter_map(|e| match e {
            Event::Warning(w) => Some(w),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn on_phase_changed(&mut self, snapshot: &Snapshot) {
        self.events.push(Event::PhaseChanged(snapshot.clone()));
    }

    fn on_tick(&mut self, snapshot: &Snapshot) {
        self.events.push(Event::Tick(snapshot.clone()));
    }

    fn on_rep_counted(&mut self, snapshot: &Snapshot) {
        self.events.push(Event::RepCounted(snapshot.clone()));
    }

    fn on_exercise_advanced(&mut self, snapshot: &Snapshot) {
        self.events.push(Event::ExerciseAdvanced(snapshot.clone()));
    }

    fn on_workout_complete(&mut self, summary: &WorkoutSummary) {
        self.events.push(Event::WorkoutComplete(summary.clone()));
    }

    fn on_warning(&mut self, warning: &Warning) {
        self.events.push(Event::Warning(warning.clone()));
    }
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn on_phase_changed(&mut self, snapshot: &Snapshot) {
        (**self).on_phase_changed(snapshot)
    }
    fn on_tick(&mut self, snapshot: &Snapshot) {
        (**self).on_tick(snapshot)
    }
    fn on_rep_counted(&mut self, snapshot: &Snapshot) {
        (**self).on_rep_counted(snapshot)
    }
    fn on_exercise_advanced(&mut self, snapshot: &Snapshot) {
        (**self).on_exercise_advanced(snapshot)
    }
    fn on_workout_complete(&mut self, summary: &WorkoutSummary) {
        (**self).on_workout_complete(summary)
    }
    fn on_warning(&mut self, warning: &Warning) {
        (**self).on_warning(warning)
    }
}

#![forbid(unsafe_code)]

//! Core domain model and session logic for the workout coach.
//!
//! This crate provides:
//! - Domain types (exercises, plans, session state, history)
//! - Exercise catalog and plan building
//! - Clock sources and the session engine state machine
//! - Persistence (session, history, stats)
//! - Streaks, derived stats, and CSV export

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod plan;
pub mod store;
pub mod history;
pub mod events;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, fallback_plan};
pub use config::{Config, SessionConfig};
pub use clock::{Clock, IntervalClock, ManualClock, SubscriptionId};
pub use plan::{load_plan_or_fallback, CatalogPlanSource, PlanSource};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use history::{compute_streak, current_day, derive_stats, export_csv, recent_days};
pub use events::{NullPresenter, Presenter, Warning};
pub use engine::SessionEngine;

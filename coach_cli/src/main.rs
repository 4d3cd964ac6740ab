use clap::{Parser, Subcommand};
use coach_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Guided bodyweight workout sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exercise catalog JSON replacing the built-in exercises
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume today's workout (default)
    Start {
        /// Auto-complete (for testing) - count every rep and skip every rest
        #[arg(long)]
        auto_complete: bool,
    },

    /// Show today's plan
    Plan,

    /// Show the saved session and cumulative stats
    Status,

    /// Show recorded workout days
    History {
        /// Number of recent days to show
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Export the full history as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Discard the saved in-progress session
    Reset,
}

fn main() -> Result<()> {
    coach_core::logging::init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let catalog_path = cli.catalog.clone().or_else(|| config.data.catalog_path.clone());

    match cli.command {
        Some(Commands::Start { auto_complete }) => {
            cmd_start(&data_dir, catalog_path.as_deref(), auto_complete, &config)
        }
        Some(Commands::Plan) => cmd_plan(&data_dir, catalog_path.as_deref(), &config),
        Some(Commands::Status) => cmd_status(&data_dir),
        Some(Commands::History { days, csv }) => cmd_history(&data_dir, days, csv.as_deref()),
        Some(Commands::Reset) => cmd_reset(&data_dir),
        None => cmd_start(&data_dir, catalog_path.as_deref(), false, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::load_from(path),
        Some(path) => {
            tracing::info!("No config file found at {:?}, using defaults", path);
            Ok(Config::default())
        }
        None => Config::load(),
    }
}

/// Build today's plan from the catalog, falling back to the built-in one
fn todays_plan(
    store: &FileStore,
    catalog_path: Option<&Path>,
    config: &Config,
) -> Result<WorkoutPlan> {
    let day = current_day(&store.load_history()?);

    let catalog = match catalog_path {
        Some(path) => Catalog::load_from(path)?,
        None => build_default_catalog(),
    };

    let source = CatalogPlanSource::new(catalog, config.profile.clone(), day);
    Ok(load_plan_or_fallback(
        &source,
        &config.profile.user_id,
        fallback_plan(day),
    ))
}

// ============================================================================
// start
// ============================================================================

fn cmd_start(
    data_dir: &Path,
    catalog_path: Option<&Path>,
    auto_complete: bool,
    config: &Config,
) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let store = FileStore::new(data_dir);
    let plan = todays_plan(&store, catalog_path, config)?;

    println!(
        "Day {} · {} exercises · about {:.0} min",
        plan.day,
        plan.len(),
        plan.estimated_minutes()
    );

    if auto_complete {
        let session = SessionConfig {
            persist_every_tick: false,
            ..config.session.clone()
        };
        let engine = SessionEngine::open(
            plan,
            ManualClock::new(),
            store,
            TerminalPresenter::default(),
            &session,
        )?;
        run_scripted(engine)
    } else {
        run_interactive(plan, store, &config.session)
    }
}

/// Drive the workout to completion without user input
fn run_scripted<S: SessionStore>(
    mut engine: SessionEngine<ManualClock, S, TerminalPresenter>,
) -> Result<()> {
    announce_resume(&engine);
    engine.start();

    loop {
        match engine.phase() {
            Phase::Exercising => {
                if !engine.complete_rep() {
                    if let Some(id) = engine.subscription() {
                        engine.tick(id);
                    }
                }
            }
            Phase::Resting => {
                engine.skip_rest();
            }
            Phase::Idle => {
                engine.start();
            }
            Phase::ExerciseComplete | Phase::WorkoutComplete => break,
        }
    }

    engine
        .close()
        .map(|_| ())
        .map_err(|_| Error::Other("workout did not complete".into()))
}

enum Input {
    Tick(SubscriptionId),
    Key(char),
    Eof,
}

fn run_interactive(plan: WorkoutPlan, store: FileStore, session: &SessionConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel();

    let ticks = Mutex::new(tx.clone());
    let clock = IntervalClock::new(move |id| {
        if let Ok(tx) = ticks.lock() {
            let _ = tx.send(Input::Tick(id));
        }
    });

    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(key) = line.trim().chars().next() {
                if tx.send(Input::Key(key.to_ascii_lowercase())).is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(Input::Eof);
    });

    let mut engine = SessionEngine::open(
        plan,
        clock,
        store,
        TerminalPresenter { live_ticks: true },
        session,
    )?;

    announce_resume(&engine);
    engine.start();

    // A restored session may already be finished; nothing will tick for it
    if engine.phase() != Phase::WorkoutComplete {
        print_keys();
    }
    while engine.phase() != Phase::WorkoutComplete {
        let Ok(input) = rx.recv() else { break };
        match input {
            Input::Tick(id) => {
                engine.tick(id);
            }
            Input::Key('r') => {
                engine.complete_rep();
            }
            Input::Key('s') => {
                engine.complete_set();
            }
            Input::Key('n') => {
                engine.skip();
            }
            Input::Key('x') => {
                engine.skip_rest();
            }
            Input::Key('p') | Input::Eof => {
                engine.pause();
                println!("\nPaused. Run `coach start` to pick up where you left off.");
                return Ok(());
            }
            Input::Key('q') => {
                engine.abandon();
                println!("\nWorkout abandoned.");
                return Ok(());
            }
            Input::Key(_) => print_keys(),
        }
    }

    match engine.close() {
        Ok(_) => Ok(()),
        Err(mut engine) => {
            engine.pause();
            Ok(())
        }
    }
}

fn announce_resume<C: Clock, S: SessionStore>(engine: &SessionEngine<C, S, TerminalPresenter>) {
    if engine.is_paused() {
        let state = engine.state();
        println!(
            "Resuming saved session: exercise {}/{}, set {}",
            state.exercise_index + 1,
            engine.plan().len(),
            state.set_index
        );
    }
}

fn print_keys() {
    println!("Keys (then Enter): r rep · s set done · n skip exercise · x skip rest · p pause · q quit");
}

// ============================================================================
// Presentation
// ============================================================================

/// Renders engine events as plain text on stdout
#[derive(Default)]
struct TerminalPresenter {
    /// Redraw a progress line on every tick
    live_ticks: bool,
}

fn describe(exercise: &Exercise) -> String {
    match exercise.mode() {
        ExerciseMode::Reps => format!("{} × {} reps", exercise.set_count, exercise.target_reps),
        ExerciseMode::Duration => {
            format!("{} × {}s", exercise.set_count, exercise.target_duration)
        }
    }
}

impl Presenter for TerminalPresenter {
    fn on_phase_changed(&mut self, snapshot: &Snapshot) {
        let state = &snapshot.state;
        match (state.phase, &snapshot.exercise) {
            (Phase::Exercising, Some(exercise)) => println!(
                "\n{} {}  set {}/{}  ({})",
                exercise.emoji,
                exercise.name,
                state.set_index,
                exercise.set_count,
                describe(exercise)
            ),
            (Phase::Resting, _) => println!("\nRest {}s", state.elapsed_seconds),
            (Phase::ExerciseComplete, _) => println!("\n✓ Set {} done", state.set_index),
            (Phase::WorkoutComplete, _) => println!("\n✓ Workout complete!"),
            (Phase::Idle, _) if state.paused_phase.is_some() => println!("\nPaused"),
            _ => {}
        }
    }

    fn on_tick(&mut self, snapshot: &Snapshot) {
        if !self.live_ticks {
            return;
        }
        let state = &snapshot.state;
        match (state.phase, &snapshot.exercise) {
            (Phase::Resting, _) => print!("\r  rest {:>3}s ", state.elapsed_seconds),
            (Phase::Exercising, Some(exercise)) if exercise.mode() == ExerciseMode::Duration => {
                print!(
                    "\r  {:>3}/{}s  {:.1} kcal ",
                    state.elapsed_seconds, exercise.target_duration, state.calories_burned
                )
            }
            (Phase::Exercising, Some(exercise)) => print!(
                "\r  {:>3}s  reps {}/{}  pace {} ",
                state.elapsed_seconds,
                state.reps_in_set,
                exercise.target_reps,
                snapshot.expected_reps.unwrap_or(0)
            ),
            _ => return,
        }
        let _ = io::stdout().flush();
    }

    fn on_rep_counted(&mut self, snapshot: &Snapshot) {
        if let Some(exercise) = &snapshot.exercise {
            println!("  rep {}/{}", snapshot.state.reps_in_set, exercise.target_reps);
        }
    }

    fn on_exercise_advanced(&mut self, snapshot: &Snapshot) {
        println!(
            "\nExercise {}/{}",
            snapshot.state.exercise_index + 1,
            snapshot.total_exercises
        );
    }

    fn on_workout_complete(&mut self, summary: &WorkoutSummary) {
        println!("─────────────────────────────────────────");
        println!(
            "  Exercises: {}/{}",
            summary.exercises_completed, summary.exercises_total
        );
        println!(
            "  Time:      {}m {:02}s",
            summary.total_time_spent / 60,
            summary.total_time_spent % 60
        );
        println!("  Calories:  {:.1}", summary.calories_burned);
        println!("  Streak:    {} day(s)", summary.current_streak);
        println!("\n✓ Workout logged!");
    }

    fn on_warning(&mut self, warning: &Warning) {
        eprintln!("warning: {}", warning);
    }
}

// ============================================================================
// plan / status / history / reset
// ============================================================================

fn cmd_plan(data_dir: &Path, catalog_path: Option<&Path>, config: &Config) -> Result<()> {
    let store = FileStore::new(data_dir);
    let plan = todays_plan(&store, catalog_path, config)?;

    println!(
        "Day {} · {} exercises · about {:.0} min",
        plan.day,
        plan.len(),
        plan.estimated_minutes()
    );
    println!();
    for (i, exercise) in plan.exercises.iter().enumerate() {
        println!(
            "  {}. {} {}  {}  rest {}s",
            i + 1,
            exercise.emoji,
            exercise.name,
            describe(exercise),
            exercise.rest_seconds
        );
    }

    Ok(())
}

fn cmd_status(data_dir: &Path) -> Result<()> {
    let store = FileStore::new(data_dir);

    match store.load_session() {
        Ok(Some(state)) => {
            let phase = state.paused_phase.unwrap_or(state.phase);
            println!(
                "Session in progress: exercise {}, set {}, {:?}",
                state.exercise_index + 1,
                state.set_index,
                phase
            );
            println!(
                "  {} exercises completed, {}s, {:.1} kcal",
                state.exercises_completed, state.total_time_spent, state.calories_burned
            );
        }
        Ok(None) => println!("No session in progress."),
        Err(e) => println!("Saved session is unreadable ({}); it will be discarded.", e),
    }

    let stats = store.load_stats()?;
    println!();
    println!("Workouts:  {}", stats.total_workouts);
    println!(
        "Time:      {}m {:02}s",
        stats.total_time / 60,
        stats.total_time % 60
    );
    println!("Calories:  {:.1}", stats.total_calories);
    println!("Streak:    {} day(s)", stats.current_streak);
    if let Some(day) = stats.last_workout_day {
        println!("Last:      {}", day);
    }

    Ok(())
}

fn cmd_history(data_dir: &Path, days: u32, csv: Option<&Path>) -> Result<()> {
    let store = FileStore::new(data_dir);
    let history = store.load_history()?;
    let today = chrono::Local::now().date_naive();

    let strip: String = recent_days(&history, today, days)
        .iter()
        .map(|(_, done)| if *done { '●' } else { '·' })
        .collect();
    println!("Last {} days: {}", days, strip);
    println!("Streak: {} day(s)", compute_streak(&history, today));

    if history.is_empty() {
        println!("No workouts recorded yet.");
    } else {
        println!();
        for (date, entry) in history.iter().rev() {
            println!(
                "  {}  day {:>3}  {} exercises  {}m {:02}s  {:.1} kcal",
                date,
                entry.day,
                entry.exercises_completed,
                entry.total_time / 60,
                entry.total_time % 60,
                entry.calories_burned
            );
        }
    }

    if let Some(path) = csv {
        let rows = export_csv(&history, path)?;
        println!("\n✓ Exported {} days to CSV", rows);
        println!("  CSV: {}", path.display());
    }

    Ok(())
}

fn cmd_reset(data_dir: &Path) -> Result<()> {
    let mut store = FileStore::new(data_dir);
    store.clear_session()?;
    println!("✓ Saved session discarded.");
    Ok(())
}

//! Session, history, and stats persistence with file locking.
//!
//! Every write goes to a temp file in the same directory under an exclusive
//! lock and is renamed over the target, so a crash never leaves a torn file.

use crate::{DayHistory, Error, Result, SessionState, UserStats};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage backend consumed by the engine
///
/// Every operation may fail; callers decide whether a failure is fatal.
pub trait SessionStore {
    /// Load the in-progress session, `Ok(None)` if there is none.
    /// A malformed record is an error so the caller can discard it.
    fn load_session(&self) -> Result<Option<SessionState>>;
    fn save_session(&mut self, state: &SessionState) -> Result<()>;
    fn clear_session(&mut self) -> Result<()>;
    fn load_history(&self) -> Result<DayHistory>;
    fn save_history(&mut self, history: &DayHistory) -> Result<()>;
    fn load_stats(&self) -> Result<UserStats>;
    fn save_stats(&mut self, stats: &UserStats) -> Result<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for &mut S {
    fn load_session(&self) -> Result<Option<SessionState>> {
        (**self).load_session()
    }
    fn save_session(&mut self, state: &SessionState) -> Result<()> {
        (**self).save_session(state)
    }
    fn clear_session(&mut self) -> Result<()> {
        (**self).clear_session()
    }
    fn load_history(&self) -> Result<DayHistory> {
        (**self).load_history()
    }
    fn save_history(&mut self, history: &DayHistory) -> Result<()> {
        (**self).save_history(history)
    }
    fn load_stats(&self) -> Result<UserStats> {
        (**self).load_stats()
    }
    fn save_stats(&mut self, stats: &UserStats) -> Result<()> {
        (**self).save_stats(stats)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON files in a data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join("session.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.join("stats.json")
    }
}

/// Read a whole file under a shared lock; `None` if it does not exist
fn read_locked(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    let read = reader.read_to_string(&mut contents);
    file.unlock()?;
    read?;

    Ok(Some(contents))
}

/// Atomically replace `path` with the JSON form of `value`
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::Persistence(format!("path {:?} has no parent directory", path))
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Parse a record that is only ever derived data; a broken file is moved
/// aside to `<name>.corrupt` and replaced by the default.
fn load_or_quarantine<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let Some(contents) = read_locked(path)? else {
        return Ok(T::default());
    };

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => Ok(value),
        Err(e) => {
            let mut aside = path.as_os_str().to_owned();
            aside.push(".corrupt");
            tracing::warn!(
                "Failed to parse {:?}: {}. Moving it to {:?} and starting empty.",
                path,
                e,
                aside
            );
            std::fs::rename(path, &aside)?;
            Ok(T::default())
        }
    }
}

impl SessionStore for FileStore {
    fn load_session(&self) -> Result<Option<SessionState>> {
        let path = self.session_path();
        match read_locked(&path)? {
            Some(contents) => {
                let state = serde_json::from_str::<SessionState>(&contents)?;
                tracing::debug!("Loaded session from {:?}", path);
                Ok(Some(state))
            }
            None => {
                tracing::debug!("No saved session at {:?}", path);
                Ok(None)
            }
        }
    }

    fn save_session(&mut self, state: &SessionState) -> Result<()> {
        write_atomic(&self.session_path(), state)
    }

    fn clear_session(&mut self) -> Result<()> {
        let path = self.session_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Cleared session at {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_history(&self) -> Result<DayHistory> {
        load_or_quarantine(&self.history_path())
    }

    fn save_history(&mut self, history: &DayHistory) -> Result<()> {
        write_atomic(&self.history_path(), history)?;
        tracing::debug!("Saved {} history days", history.len());
        Ok(())
    }

    fn load_stats(&self) -> Result<UserStats> {
        load_or_quarantine(&self.stats_path())
    }

    fn save_stats(&mut self, stats: &UserStats) -> Result<()> {
        write_atomic(&self.stats_path(), stats)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store; can be told to fail every write
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub session: Option<SessionState>,
    pub history: DayHistory,
    pub stats: UserStats,
    pub fail_writes: bool,
    pub session_writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails, as if storage were unavailable
    pub fn unavailable() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            Err(Error::Persistence("storage unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl SessionStore for MemoryStore {
    fn load_session(&self) -> Result<Option<SessionState>> {
        Ok(self.session.clone())
    }

    fn save_session(&mut self, state: &SessionState) -> Result<()> {
        self.check_writable()?;
        self.session = Some(state.clone());
        self.session_writes += 1;
        Ok(())
    }

    fn clear_session(&mut self) -> Result<()> {
        self.check_writable()?;
        self.session = None;
        Ok(())
    }

    fn load_history(&self) -> Result<DayHistory> {
        Ok(self.history.clone())
    }

    fn save_history(&mut self, history: &DayHistory) -> Result<()> {
        self.check_writable()?;
        self.history = history.clone();
        Ok(())
    }

    fn load_stats(&self) -> Result<UserStats> {
        Ok(self.stats.clone())
    }

    fn save_stats(&mut self, stats: &UserStats) -> Result<()> {
        self.check_writable()?;
        self.stats = stats.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DayHistoryEntry, Phase};
    use chrono::{NaiveDate, Utc};

    fn sample_state() -> SessionState {
        SessionState {
            exercise_index: 2,
            set_index: 2,
            reps_in_set: 4,
            elapsed_seconds: 17,
            total_time_spent: 95,
            calories_burned: 12.5,
            exercises_completed: 2,
            phase: Phase::Exercising,
            paused_phase: None,
        }
    }

    #[test]
    fn test_session_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.save_session(&sample_state()).unwrap();
        let loaded = store.load_session().unwrap();
        assert_eq!(loaded, Some(sample_state()));
    }

    #[test]
    fn test_session_uses_camel_case_fields() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.save_session(&sample_state()).unwrap();

        let raw = std::fs::read_to_string(store.session_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["exerciseIndex"], 2);
        assert_eq!(value["repsInSet"], 4);
        assert_eq!(value["phase"], "Exercising");
        assert!(value.get("pausedPhase").is_none());
    }

    #[test]
    fn test_missing_session_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("absent"));
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn test_malformed_session_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        std::fs::write(store.session_path(), "{ invalid json }").unwrap();

        assert!(matches!(store.load_session(), Err(Error::Json(_))));
    }

    #[test]
    fn test_clear_session_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.save_session(&sample_state()).unwrap();

        store.clear_session().unwrap();
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn test_history_roundtrip_keyed_by_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        let mut history = DayHistory::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        history.insert(
            date,
            DayHistoryEntry {
                day: 1,
                exercises_completed: 6,
                total_time: 900,
                calories_burned: 88.0,
                completed_at: Utc::now(),
            },
        );
        store.save_history(&history).unwrap();

        let raw = std::fs::read_to_string(store.history_path()).unwrap();
        assert!(raw.contains("\"2026-03-14\""));
        assert_eq!(store.load_history().unwrap(), history);
    }

    #[test]
    fn test_corrupt_history_moved_aside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        std::fs::write(store.history_path(), "not json").unwrap();

        let history = store.load_history().unwrap();
        assert!(history.is_empty());
        assert!(temp_dir.path().join("history.json.corrupt").exists());
        assert!(!store.history_path().exists());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.save_stats(&UserStats::default()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "stats.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only stats.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_unavailable_memory_store_rejects_writes() {
        let mut store = MemoryStore::unavailable();
        assert!(matches!(
            store.save_session(&sample_state()),
            Err(Error::Persistence(_))
        ));
        assert!(store.session.is_none());
        assert!(store.load_history().unwrap().is_empty());
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RgmsError};
use crate::ledger;
use crate::models::{
    Cadet, GradeUpdate, MeritDemeritLog, MeritTotals, NewCadet, NewMeritLog,
};

const CADETS_FILE: &str = "cadets";
const MERIT_LOGS_FILE: &str = "merit_logs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredData<T> {
    pub data: T,
    pub saved_at: DateTime<Utc>,
}

impl<T> StoredData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            saved_at: Utc::now(),
        }
    }
}

/// Records of one kind plus the next id to hand out.
/// Ids are never reused, even after the highest one is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection<T> {
    next_id: i64,
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl<T> Collection<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Repair `next_id` for files edited by hand
    fn fix_next_id(&mut self, id_of: impl Fn(&T) -> i64) {
        let max_id = self.records.iter().map(id_of).max().unwrap_or(0);
        if self.next_id <= max_id {
            self.next_id = max_id + 1;
        }
    }
}

/// In-memory records plus lookup indexes over them.
///
/// The indexes go stale inside a write once records are added or removed;
/// `Store::mutate` rebuilds them before the write is persisted.
#[derive(Debug, Clone, Default)]
struct StoreState {
    cadets: Collection<Cadet>,
    merit_logs: Collection<MeritDemeritLog>,
    /// cadet id -> position in `cadets.records`
    cadet_positions: HashMap<i64, usize>,
    /// cadet id -> positions of their entries in `merit_logs.records`
    log_positions: HashMap<i64, Vec<usize>>,
}

impl StoreState {
    fn new(cadets: Collection<Cadet>, merit_logs: Collection<MeritDemeritLog>) -> Self {
        let mut state = Self {
            cadets,
            merit_logs,
            ..Self::default()
        };
        state.reindex();
        state
    }

    fn reindex(&mut self) {
        self.cadet_positions = self
            .cadets
            .records
            .iter()
            .enumerate()
            .map(|(index, cadet)| (cadet.id, index))
            .collect();

        self.log_positions.clear();
        for (index, log) in self.merit_logs.records.iter().enumerate() {
            self.log_positions.entry(log.cadet_id).or_default().push(index);
        }
    }

    fn cadet_index(&self, cadet_id: i64) -> Result<usize> {
        self.cadet_positions
            .get(&cadet_id)
            .copied()
            .ok_or(RgmsError::CadetNotFound(cadet_id))
    }

    fn logs_for(&self, cadet_id: i64) -> Vec<MeritDemeritLog> {
        self.log_positions
            .get(&cadet_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&index| self.merit_logs.records[index].clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Which collections a write touched
#[derive(Debug, Clone, Copy)]
enum Touched {
    Cadets,
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub cadets: usize,
    pub merit_logs: usize,
}

/// JSON-file backed record store for cadets and their merit/demerit logs.
///
/// Records live in memory behind a single mutex; every write is persisted
/// before the lock is released and rolled back in memory if persisting fails.
pub struct Store {
    data_dir: PathBuf,
    state: Mutex<StoreState>,
}

impl Store {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut store = Self {
            data_dir,
            state: Mutex::new(StoreState::default()),
        };

        let mut cadets: Collection<Cadet> = store
            .load(CADETS_FILE)?
            .map(|stored| stored.data)
            .unwrap_or_default();
        cadets.fix_next_id(|c| c.id);

        let mut merit_logs: Collection<MeritDemeritLog> = store
            .load(MERIT_LOGS_FILE)?
            .map(|stored| stored.data)
            .unwrap_or_default();
        merit_logs.fix_next_id(|log| log.id);

        info!(
            path = %store.data_dir.display(),
            cadets = cadets.records.len(),
            merit_logs = merit_logs.records.len(),
            "Opened record store"
        );

        store.state = Mutex::new(StoreState::new(cadets, merit_logs));
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<StoredData<T>>> {
        let path = self.file_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let stored: StoredData<T> = serde_json::from_str(&contents)?;
        debug!(file = name, saved_at = %stored.saved_at, "Loaded store file");
        Ok(Some(stored))
    }

    /// Write `data` to a temp file beside its final path.
    /// Returns `(temp path, final path)` for the rename.
    fn stage<T: Serialize>(&self, name: &str, data: &T) -> Result<(PathBuf, PathBuf)> {
        let stored = StoredData::new(data);
        let path = self.file_path(name);
        let tmp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&tmp_path, contents)?;
        Ok((tmp_path, path))
    }

    /// Stage every touched file before renaming any of them, so a failed
    /// write leaves the files on disk as they were. The log file is renamed
    /// first; totals left behind between the two renames are repaired by
    /// the merit sync.
    fn persist(&self, state: &StoreState, touched: Touched) -> Result<()> {
        let mut staged = Vec::with_capacity(2);
        if matches!(touched, Touched::Both) {
            staged.push(self.stage(MERIT_LOGS_FILE, &state.merit_logs)?);
        }
        staged.push(self.stage(CADETS_FILE, &state.cadets)?);

        for (tmp_path, path) in staged {
            std::fs::rename(&tmp_path, &path)?;
        }
        Ok(())
    }

    /// Apply a write under the lock, persist it, and restore the previous
    /// state if either step fails.
    fn mutate<R>(
        &self,
        touched: Touched,
        f: impl FnOnce(&mut StoreState) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let snapshot = state.clone();

        let result = match f(&mut *state) {
            Ok(result) => result,
            Err(e) => {
                *state = snapshot;
                return Err(e);
            }
        };
        state.reindex();

        if let Err(e) = self.persist(&*state, touched) {
            warn!(error = %e, "Failed to persist store, rolling back");
            *state = snapshot;
            return Err(e);
        }
        Ok(result)
    }

    // ===== Cadets =====

    /// All cadets, ordered by last name then first name
    pub fn cadets(&self) -> Vec<Cadet> {
        let mut cadets = self.state.lock().cadets.records.clone();
        cadets.sort_by(|a, b| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        });
        cadets
    }

    pub fn cadet_ids(&self) -> Vec<i64> {
        self.state.lock().cadets.records.iter().map(|c| c.id).collect()
    }

    pub fn cadet(&self, cadet_id: i64) -> Result<Cadet> {
        let state = self.state.lock();
        let index = state.cadet_index(cadet_id)?;
        Ok(state.cadets.records[index].clone())
    }

    pub fn create_cadet(&self, new: NewCadet) -> Result<Cadet> {
        self.mutate(Touched::Cadets, |state| {
            let student_id = new.student_id.trim();
            if state
                .cadets
                .records
                .iter()
                .any(|c| c.student_id.eq_ignore_ascii_case(student_id))
            {
                return Err(RgmsError::InvalidCadet(format!(
                    "studentId {} already exists",
                    student_id
                )));
            }

            let id = state.cadets.next_id;
            let cadet = Cadet::new(id, new, Utc::now())?;
            state.cadets.allocate_id();
            state.cadets.records.push(cadet.clone());

            info!(
                cadet_id = id,
                student_id = %cadet.student_id,
                name = %cadet.display_name(),
                "Created cadet"
            );
            Ok(cadet)
        })
    }

    /// Remove a cadet and every log entry that belongs to them.
    /// Returns the number of log entries removed with the cadet.
    pub fn delete_cadet(&self, cadet_id: i64) -> Result<usize> {
        self.mutate(Touched::Both, |state| {
            let index = state.cadet_index(cadet_id)?;
            state.cadets.records.remove(index);

            let before = state.merit_logs.records.len();
            state.merit_logs.records.retain(|log| log.cadet_id != cadet_id);
            let removed = before - state.merit_logs.records.len();

            info!(cadet_id, removed_logs = removed, "Deleted cadet");
            Ok(removed)
        })
    }

    /// Replace a cadet's raw grading inputs and recompute their grade
    pub fn update_grades(&self, cadet_id: i64, update: &GradeUpdate) -> Result<Cadet> {
        self.mutate(Touched::Cadets, |state| {
            let index = state.cadet_index(cadet_id)?;
            let cadet = &mut state.cadets.records[index];

            let outcome = cadet.apply_grade_update(update);
            cadet.updated_at = Utc::now();

            info!(
                cadet_id,
                final_grade = outcome.final_percent,
                transmuted = %outcome.transmuted_grade,
                "Updated grades"
            );
            Ok(cadet.clone())
        })
    }

    // ===== Merit/Demerit Logs =====

    /// Log entries, newest first, optionally for a single cadet
    pub fn merit_logs(&self, cadet_id: Option<i64>) -> Vec<MeritDemeritLog> {
        let state = self.state.lock();
        let mut logs: Vec<MeritDemeritLog> = match cadet_id {
            Some(id) => state.logs_for(id),
            None => state.merit_logs.records.clone(),
        };
        logs.sort_by(|a, b| {
            b.date_recorded
                .cmp(&a.date_recorded)
                .then_with(|| b.id.cmp(&a.id))
        });
        logs
    }

    /// Record a new entry and move the cadet's running totals with it
    pub fn record_merit_log(&self, new: NewMeritLog) -> Result<(MeritDemeritLog, MeritTotals)> {
        self.mutate(Touched::Both, |state| {
            let index = state.cadet_index(new.cadet_id)?;

            let entry = new.into_log(state.merit_logs.next_id, Utc::now())?;
            state.merit_logs.allocate_id();

            let cadet = &mut state.cadets.records[index];
            let totals = ledger::apply_merit_demerit(cadet, &entry)?;
            cadet.updated_at = entry.date_recorded;

            state.merit_logs.records.push(entry.clone());

            info!(
                log_id = entry.id,
                cadet_id = entry.cadet_id,
                merit_type = %entry.merit_type,
                points = entry.points,
                "Recorded merit/demerit entry"
            );
            Ok((entry, totals))
        })
    }

    /// Delete an entry and reverse its effect on the cadet's running totals.
    /// Returns the removed entry.
    pub fn delete_merit_log(&self, log_id: i64) -> Result<MeritDemeritLog> {
        self.mutate(Touched::Both, |state| {
            let position = state
                .merit_logs
                .records
                .iter()
                .position(|log| log.id == log_id)
                .ok_or(RgmsError::MeritLogNotFound(log_id))?;
            let entry = state.merit_logs.records.remove(position);

            match state.cadet_index(entry.cadet_id) {
                Ok(index) => {
                    let cadet = &mut state.cadets.records[index];
                    ledger::reverse_merit_demerit(cadet, &entry)?;
                    cadet.updated_at = Utc::now();
                }
                Err(_) => {
                    warn!(log_id, cadet_id = entry.cadet_id, "Deleted entry for missing cadet");
                }
            }

            info!(log_id, cadet_id = entry.cadet_id, "Deleted merit/demerit entry");
            Ok(entry)
        })
    }

    /// Entries whose cadet no longer exists
    pub fn orphaned_log_count(&self) -> usize {
        let state = self.state.lock();
        state
            .merit_logs
            .records
            .iter()
            .filter(|log| !state.cadet_positions.contains_key(&log.cadet_id))
            .count()
    }

    // ===== Ledger Transactions =====

    /// Run `f` against each listed cadet and exactly their log entries as a
    /// single transaction: the lock is held for the whole batch and the
    /// cadets file is written once, only if `f` changed someone. A failed
    /// write restores every cadet in the batch.
    ///
    /// Results line up with `cadet_ids`; a cadet that doesn't exist yields `None`.
    pub fn with_cadet_ledgers<R>(
        &self,
        cadet_ids: &[i64],
        mut f: impl FnMut(&mut Cadet, &[MeritDemeritLog]) -> R,
    ) -> Result<Vec<Option<R>>> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let mut originals = Vec::new();
        let mut results = Vec::with_capacity(cadet_ids.len());

        for &cadet_id in cadet_ids {
            let index = match state.cadet_index(cadet_id) {
                Ok(index) => index,
                Err(_) => {
                    results.push(None);
                    continue;
                }
            };

            let logs = state.logs_for(cadet_id);
            let original = state.cadets.records[index].clone();
            let mut working = original.clone();

            results.push(Some(f(&mut working, &logs)));

            if working != original {
                working.updated_at = now;
                state.cadets.records[index] = working;
                originals.push((index, original));
            }
        }

        if !originals.is_empty() {
            if let Err(e) = self.persist(&*state, Touched::Cadets) {
                warn!(
                    cadets = originals.len(),
                    error = %e,
                    "Failed to persist ledger transaction, rolling back"
                );
                for (index, original) in originals {
                    state.cadets.records[index] = original;
                }
                return Err(e);
            }
        }

        Ok(results)
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        StoreStats {
            cadets: state.cadets.records.len(),
            merit_logs: state.merit_logs.records.len(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

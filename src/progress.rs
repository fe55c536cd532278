//! Completion records and aggregate statistics
//!
//! Persisted under two storage keys:
//! - `hasCompletedOnboarding`: bool
//! - `gameStatistics`: JSON `AggregateStatistics`
//!
//! The store is constructed explicitly and injected into whatever owns it;
//! there is no global instance. All mutation goes through
//! `record_completion` and `reset`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::{ActivityKind, CurrencyKind, LevelSpec, RepeatPolicy};
use crate::reward;
use crate::session::Outcome;
use crate::storage::KvStore;

const STATS_KEY: &str = "gameStatistics";
const ONBOARDING_KEY: &str = "hasCompletedOnboarding";

/// One persisted entry per successfully completed level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub spec: LevelSpec,
    pub completed: bool,
    /// Units awarded for the run currently on record
    pub rewards_earned: u32,
    /// Accuracy percentage of the run on record, where the variant reports one
    pub accuracy: Option<f32>,
    /// Cumulative seconds spent on this level across all runs
    pub time_spent: f32,
    /// Highest score ever achieved (meaningful for best-score activities)
    #[serde(default)]
    pub best_score: u32,
}

/// Persisted totals across all sessions.
///
/// Unknown or missing fields decode to defaults so older blobs keep
/// loading after the format grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStatistics {
    pub total_sessions_played: u32,
    pub levels_completed: u32,
    pub total_accuracy: f64,
    pub accuracy_count: u32,
    pub total_time_spent: f64,
    pub balances: BTreeMap<CurrencyKind, u64>,
    pub records: Vec<CompletionRecord>,
}

impl AggregateStatistics {
    pub fn average_accuracy(&self) -> f64 {
        if self.accuracy_count == 0 {
            return 0.0;
        }
        self.total_accuracy / f64::from(self.accuracy_count)
    }

    /// Total play time as `"3h 12m"` / `"45m"`
    pub fn formatted_time_spent(&self) -> String {
        let total = self.total_time_spent as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }

    pub fn balance(&self, currency: CurrencyKind) -> u64 {
        self.balances.get(&currency).copied().unwrap_or(0)
    }

    fn record_index(&self, spec: &LevelSpec) -> Option<usize> {
        self.records.iter().position(|r| r.spec == *spec)
    }
}

/// Progress persistence and merge rules
pub struct ProgressStore {
    storage: Box<dyn KvStore>,
    stats: AggregateStatistics,
    onboarding_done: bool,
}

impl ProgressStore {
    /// Load from `storage`; a missing or undecodable blob yields defaults.
    pub fn new(storage: Box<dyn KvStore>) -> Self {
        let stats: AggregateStatistics = storage
            .get(STATS_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(stats) => Some(stats),
                Err(err) => {
                    log::warn!("statistics blob undecodable, starting fresh: {err}");
                    None
                }
            })
            .unwrap_or_default();
        let onboarding_done = storage
            .get(ONBOARDING_KEY)
            .map(|raw| raw == "true")
            .unwrap_or(false);

        log::info!(
            "progress store loaded: {} records, {} sessions",
            stats.records.len(),
            stats.total_sessions_played
        );
        Self {
            storage,
            stats,
            onboarding_done,
        }
    }

    /// Store backed by volatile memory (tests, previews)
    pub fn in_memory() -> Self {
        Self::new(Box::new(crate::storage::MemoryKv::new()))
    }

    pub fn statistics(&self) -> &AggregateStatistics {
        &self.stats
    }

    pub fn has_completed_onboarding(&self) -> bool {
        self.onboarding_done
    }

    pub fn set_onboarding_complete(&mut self, done: bool) {
        self.onboarding_done = done;
        self.storage
            .set(ONBOARDING_KEY, if done { "true" } else { "false" });
    }

    /// Fold a finished session into the statistics. Returns the currency
    /// units actually awarded by this call (zero on failure or repeat
    /// completion).
    pub fn record_completion(&mut self, spec: LevelSpec, outcome: &Outcome) -> u32 {
        self.stats.total_sessions_played += 1;
        self.stats.total_time_spent += f64::from(outcome.time_spent);
        if let Some(accuracy) = outcome.accuracy {
            self.stats.total_accuracy += f64::from(accuracy);
            self.stats.accuracy_count += 1;
        }

        if !outcome.success {
            self.save();
            return 0;
        }

        let units = reward::reward_for(spec.activity, spec.difficulty, outcome.score);
        let record = CompletionRecord {
            spec,
            completed: true,
            rewards_earned: units,
            accuracy: outcome.accuracy,
            time_spent: outcome.time_spent,
            best_score: outcome.score,
        };

        let awarded = match self.stats.record_index(&spec) {
            Some(index) => {
                let prior_time = self.stats.records[index].time_spent;
                match spec.activity.repeat_policy() {
                    RepeatPolicy::Overwrite => {
                        let best = self.stats.records[index].best_score.max(outcome.score);
                        self.stats.records[index] = record;
                        self.stats.records[index].best_score = best;
                    }
                    RepeatPolicy::BestScore => {
                        if outcome.score > self.stats.records[index].best_score {
                            self.stats.records[index] = record;
                        }
                    }
                }
                // Time on a level accumulates whichever run is on record.
                self.stats.records[index].time_spent = prior_time + outcome.time_spent;
                0
            }
            None => {
                self.stats.records.push(record);
                self.stats.levels_completed += 1;
                *self
                    .stats
                    .balances
                    .entry(spec.activity.currency())
                    .or_insert(0) += u64::from(units);
                units
            }
        };

        self.save();
        awarded
    }

    pub fn is_completed(&self, spec: &LevelSpec) -> bool {
        self.stats
            .records
            .iter()
            .any(|r| r.spec == *spec && r.completed)
    }

    /// Completed levels for an activity across all level/difficulty pairs
    pub fn completed_count(&self, activity: ActivityKind) -> usize {
        self.stats
            .records
            .iter()
            .filter(|r| r.spec.activity == activity && r.completed)
            .count()
    }

    /// Wipe all records, statistics, and the onboarding flag. In-memory
    /// state is replaced first, then both keys are removed, so a reader
    /// never observes a half-reset store.
    pub fn reset(&mut self) {
        self.stats = AggregateStatistics::default();
        self.onboarding_done = false;
        self.storage.remove(STATS_KEY);
        self.storage.remove(ONBOARDING_KEY);
        log::info!("progress reset");
    }

    fn save(&mut self) {
        match serde_json::to_string(&self.stats) {
            Ok(json) => self.storage.set(STATS_KEY, &json),
            Err(err) => log::warn!("statistics encode failed, dropping save: {err}"),
        }
    }
}

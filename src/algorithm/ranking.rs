//! Running error statistics per detector, per session and for the whole run.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::algorithm::detectors::DetectorId;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Sum and count of error distances per detector.
///
/// Used both per session and for the pooled, run-wide statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorStats {
    entries: BTreeMap<DetectorId, Accumulator>,
}

impl DetectorStats {
    /// Fresh stats holding a single observation.
    pub fn seeded(id: DetectorId, distance: f64) -> Self {
        let mut stats = Self::default();
        stats.add(id, distance);
        stats
    }

    pub fn add(&mut self, id: DetectorId, distance: f64) {
        let entry = self.entries.entry(id).or_default();
        entry.sum += distance;
        entry.count += 1;
    }

    pub fn contains(&self, id: DetectorId) -> bool {
        self.count(id) > 0
    }

    pub fn count(&self, id: DetectorId) -> usize {
        self.entries.get(&id).map_or(0, |entry| entry.count)
    }

    /// Mean error distance; `None` when nothing was recorded for `id`.
    pub fn average(&self, id: DetectorId) -> Option<f64> {
        self.entries
            .get(&id)
            .filter(|entry| entry.count > 0)
            .map(|entry| entry.sum / entry.count as f64)
    }

    /// Detector ids in ascending order.
    pub fn detector_ids(&self) -> impl Iterator<Item = DetectorId> + '_ {
        self.entries.keys().copied()
    }

    /// `(id, average)` pairs in ascending id order.
    pub fn averages(&self) -> Vec<(DetectorId, f64)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.count > 0)
            .map(|(id, entry)| (*id, entry.sum / entry.count as f64))
            .collect()
    }

    /// Number of scored ground-truth samples: every detector runs once per
    /// sample, so this is the largest per-detector count.
    pub fn sample_count(&self) -> usize {
        self.entries.values().map(|entry| entry.count).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|entry| entry.count == 0)
    }

    /// Detector with the lowest average error, `None` when empty.
    ///
    /// Exact ties go to the lowest detector id.
    pub fn best_detector(&self) -> Option<DetectorId> {
        best_of(&self.averages()).map(|(id, _)| id)
    }

    pub fn ranking(&self) -> StatsRanking {
        let averages = self.averages();
        StatsRanking {
            best: best_of(&averages).map(|(id, _)| id),
            sample_count: self.sample_count(),
            averages,
        }
    }
}

fn best_of(averages: &[(DetectorId, f64)]) -> Option<(DetectorId, f64)> {
    averages.iter().fold(None, |best, &(id, average)| match best {
        Some((_, best_average)) if best_average <= average => best,
        _ => Some((id, average)),
    })
}

/// Derived view of one [`DetectorStats`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRanking {
    pub averages: Vec<(DetectorId, f64)>,
    pub best: Option<DetectorId>,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRanking {
    pub session_id: String,
    pub ranking: StatsRanking,
}

/// Per-session and pooled rankings of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRanking {
    pub sessions: Vec<SessionRanking>,
    /// `None` when nothing was scored.
    pub global: Option<StatsRanking>,
}

impl RunRanking {
    pub fn best(&self) -> Option<DetectorId> {
        self.global.as_ref().and_then(|global| global.best)
    }
}

/// Collects observations for a whole evaluation run.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sessions: BTreeMap<String, DetectorStats>,
    global: Option<DetectorStats>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to the session's stats, seeding them on the first observation.
    pub fn record_session(&mut self, session_id: &str, id: DetectorId, distance: f64) {
        if !accept(distance) {
            return;
        }
        match self.sessions.get_mut(session_id) {
            Some(stats) => stats.add(id, distance),
            None => {
                self.sessions
                    .insert(session_id.to_string(), DetectorStats::seeded(id, distance));
            }
        }
    }

    /// Adds to the run-wide stats, seeding them on the first observation.
    pub fn record_global(&mut self, id: DetectorId, distance: f64) {
        if !accept(distance) {
            return;
        }
        match self.global.as_mut() {
            Some(stats) => stats.add(id, distance),
            None => self.global = Some(DetectorStats::seeded(id, distance)),
        }
    }

    /// `record_session` followed by `record_global`.
    pub fn record(&mut self, session_id: &str, id: DetectorId, distance: f64) {
        self.record_session(session_id, id, distance);
        self.record_global(id, distance);
    }

    pub fn session(&self, session_id: &str) -> Option<&DetectorStats> {
        self.sessions.get(session_id)
    }

    /// Sessions ordered by identifier.
    pub fn sessions(&self) -> impl Iterator<Item = (&str, &DetectorStats)> {
        self.sessions.iter().map(|(id, stats)| (id.as_str(), stats))
    }

    pub fn global(&self) -> Option<&DetectorStats> {
        self.global.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.global.as_ref().map_or(true, DetectorStats::is_empty)
    }

    /// Session-local rankings plus the pooled (not averaged-of-averages) one.
    pub fn rank(&self) -> RunRanking {
        RunRanking {
            sessions: self
                .sessions
                .iter()
                .map(|(session_id, stats)| SessionRanking {
                    session_id: session_id.clone(),
                    ranking: stats.ranking(),
                })
                .collect(),
            global: self.global.as_ref().map(DetectorStats::ranking),
        }
    }
}

fn accept(distance: f64) -> bool {
    if distance.is_finite() && distance >= 0.0 {
        true
    } else {
        log::warn!("ranking: ignoring invalid distance {distance}");
        false
    }
}

/// Aggregator shareable between threads scoring independent sessions.
///
/// One lock guards both the session and the global update.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregator(Arc<Mutex<Aggregator>>);

impl SharedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, session_id: &str, id: DetectorId, distance: f64) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(session_id, id, distance);
    }

    pub fn rank(&self) -> RunRanking {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).rank()
    }

    pub fn snapshot(&self) -> Aggregator {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

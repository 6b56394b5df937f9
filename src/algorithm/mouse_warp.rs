//! Gaze-assisted mouse warping.
//!
//! The engine watches a sliding time window of cursor samples. When the cursor
//! travels far enough, fast enough, towards the current fixation, it emits a
//! single [`WarpDecision`] to the fixation point and re-arms only once the
//! caller supplies a new fixation.
//!
//! Gates run cheapest first: home radius, direction, travel distance, angle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::geometry::{angle_between_deg, Point2D};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarpConfig {
    /// Maximum angle between the mouse vector and the gaze vector.
    pub angle_threshold_deg: f64,
    /// Minimum cursor travel inside the window.
    pub distance_threshold: f64,
    /// Length of the sliding sample window.
    #[serde(rename = "durationThresholdMillis")]
    pub duration_threshold_ms: i64,
    /// No warp while the cursor is closer than this to the fixation.
    pub home_radius: f64,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            angle_threshold_deg: 10.0,
            distance_threshold: 200.0,
            duration_threshold_ms: 200,
            home_radius: 200.0,
        }
    }
}

impl WarpConfig {
    pub fn validate(&self) -> Result<()> {
        let finite_non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )))
            }
        };

        finite_non_negative("angleThresholdDeg", self.angle_threshold_deg)?;
        finite_non_negative("distanceThreshold", self.distance_threshold)?;
        finite_non_negative("homeRadius", self.home_radius)?;
        if self.duration_threshold_ms < 0 {
            return Err(Error::InvalidConfig(format!(
                "durationThresholdMillis must be non-negative, got {}",
                self.duration_threshold_ms
            )));
        }
        Ok(())
    }
}

/// One cursor observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    pub timestamp_ms: i64,
    pub position: Point2D,
}

impl TimedSample {
    pub fn new(timestamp_ms: i64, position: Point2D) -> Self {
        Self {
            timestamp_ms,
            position,
        }
    }
}

/// Time-bounded cursor history keyed by timestamp.
///
/// A later sample with an identical timestamp replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpWindow {
    samples: BTreeMap<i64, Point2D>,
    /// Set once a sample has aged out since the last reset.
    saturated: bool,
}

impl WarpWindow {
    /// Inserts a sample and drops everything older than `duration_ms` relative
    /// to the newest timestamp. The newest sample always survives.
    pub fn insert(&mut self, sample: TimedSample, duration_ms: i64) {
        self.samples.insert(sample.timestamp_ms, sample.position);

        let Some(newest) = self.newest().map(|s| s.timestamp_ms) else {
            return;
        };
        let cutoff = newest.saturating_sub(duration_ms.max(0));
        let kept = self.samples.split_off(&cutoff);
        if !self.samples.is_empty() {
            self.saturated = true;
        }
        self.samples = kept;
    }

    pub fn oldest(&self) -> Option<TimedSample> {
        self.samples
            .first_key_value()
            .map(|(ts, position)| TimedSample::new(*ts, *position))
    }

    pub fn newest(&self) -> Option<TimedSample> {
        self.samples
            .last_key_value()
            .map(|(ts, position)| TimedSample::new(*ts, *position))
    }

    pub fn span_ms(&self) -> i64 {
        match (self.oldest(), self.newest()) {
            (Some(oldest), Some(newest)) => newest.timestamp_ms - oldest.timestamp_ms,
            _ => 0,
        }
    }

    /// True once the window has observed at least `duration_ms` of movement.
    pub fn covers(&self, duration_ms: i64) -> bool {
        !self.samples.is_empty() && (self.saturated || self.span_ms() >= duration_ms)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimedSample> + '_ {
        self.samples
            .iter()
            .map(|(ts, position)| TimedSample::new(*ts, *position))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.saturated = false;
    }
}

/// Instruction to move the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpDecision {
    pub target: Point2D,
    /// Timestamp of the sample that completed the gesture.
    pub timestamp_ms: i64,
}

/// Why a sample did not produce a warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldReason {
    NoFixation,
    WarmingUp,
    InsideHomeRadius,
    MovingAway,
    TooShort,
    OffTarget { angle_deg: f64 },
}

/// Engine state: current fixation plus the cursor window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpState {
    pub fixation: Option<Point2D>,
    pub window: WarpWindow,
}

impl WarpState {
    /// Replaces the fixation; the window is untouched.
    pub fn with_fixation(mut self, fixation: Point2D) -> Self {
        self.fixation = Some(fixation);
        self
    }

    /// Feeds one sample and returns the successor state with an optional warp.
    ///
    /// After a warp the successor state is empty: no fixation, no samples.
    pub fn step(
        mut self,
        config: &WarpConfig,
        sample: TimedSample,
    ) -> (WarpState, Option<WarpDecision>) {
        self.window.insert(sample, config.duration_threshold_ms);

        match self.assess(config) {
            Ok(target) => {
                let timestamp_ms = self
                    .window
                    .newest()
                    .map(|s| s.timestamp_ms)
                    .unwrap_or(sample.timestamp_ms);
                log::info!(
                    "mouse_warp: warp to ({:.1}, {:.1}) at ts={timestamp_ms}",
                    target.x,
                    target.y
                );
                (
                    WarpState::default(),
                    Some(WarpDecision {
                        target,
                        timestamp_ms,
                    }),
                )
            }
            Err(reason) => {
                log::trace!("mouse_warp: hold at ts={}: {reason:?}", sample.timestamp_ms);
                (self, None)
            }
        }
    }

    /// Runs the gate sequence against the current window without mutating it.
    pub fn assess(&self, config: &WarpConfig) -> std::result::Result<Point2D, HoldReason> {
        let fixation = self.fixation.ok_or(HoldReason::NoFixation)?;
        if !self.window.covers(config.duration_threshold_ms) {
            return Err(HoldReason::WarmingUp);
        }
        let (Some(start), Some(stop)) = (self.window.oldest(), self.window.newest()) else {
            return Err(HoldReason::WarmingUp);
        };

        let distance_stop_fix = stop.position.distance_to(fixation);
        if distance_stop_fix < config.home_radius {
            return Err(HoldReason::InsideHomeRadius);
        }

        let distance_start_fix = start.position.distance_to(fixation);
        if distance_start_fix <= distance_stop_fix {
            return Err(HoldReason::MovingAway);
        }

        if stop.position.distance_to(start.position) < config.distance_threshold {
            return Err(HoldReason::TooShort);
        }

        let angle_deg = angle_between_deg(start.position, stop.position, fixation);
        if angle_deg > config.angle_threshold_deg {
            return Err(HoldReason::OffTarget { angle_deg });
        }

        Ok(fixation)
    }
}

/// Mutable convenience wrapper around [`WarpState::step`] for a single
/// sampling loop. Not meant to be shared between threads.
#[derive(Debug, Clone)]
pub struct WarpEngine {
    config: WarpConfig,
    state: WarpState,
}

impl WarpEngine {
    pub fn new(config: WarpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: WarpState::default(),
        })
    }

    pub fn config(&self) -> &WarpConfig {
        &self.config
    }

    pub fn state(&self) -> &WarpState {
        &self.state
    }

    /// Latest fixation wins.
    pub fn set_fixation(&mut self, fixation: Point2D) {
        self.state.fixation = Some(fixation);
    }

    pub fn add_sample(&mut self, timestamp_ms: i64, position: Point2D) -> Option<WarpDecision> {
        let state = std::mem::take(&mut self.state);
        let (next, decision) = state.step(&self.config, TimedSample::new(timestamp_ms, position));
        self.state = next;
        decision
    }

    /// Clears fixation and window.
    pub fn reset(&mut self) {
        self.state = WarpState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WarpConfig {
        WarpConfig {
            angle_threshold_deg: 10.0,
            distance_threshold: 200.0,
            duration_threshold_ms: 200,
            home_radius: 50.0,
        }
    }

    /// Linear path from `from` to `to` sampled every 10 ms over `duration_ms`.
    fn linear_path(from: Point2D, to: Point2D, duration_ms: i64) -> Vec<TimedSample> {
        (0..=duration_ms / 10)
            .map(|step| {
                let ts = step * 10;
                let t = ts as f64 / duration_ms as f64;
                TimedSample::new(
                    ts,
                    Point2D::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t),
                )
            })
            .collect()
    }

    fn drive(engine: &mut WarpEngine, samples: &[TimedSample]) -> Vec<WarpDecision> {
        samples
            .iter()
            .filter_map(|s| engine.add_sample(s.timestamp_ms, s.position))
            .collect()
    }

    #[test]
    fn warps_on_straight_gesture_towards_fixation() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));

        let path = linear_path(Point2D::new(500.0, 500.0), Point2D::new(150.0, 120.0), 210);
        let decisions = drive(&mut engine, &path);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].target, Point2D::new(100.0, 100.0));
    }

    #[test]
    fn holds_on_perpendicular_gesture() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));

        let path = linear_path(Point2D::new(500.0, 500.0), Point2D::new(150.0, 500.0), 210);
        assert!(drive(&mut engine, &path).is_empty());

        match engine.state().assess(engine.config()) {
            Err(HoldReason::OffTarget { angle_deg }) => assert!(angle_deg > 10.0),
            other => panic!("expected off-target hold, got {other:?}"),
        }
    }

    #[test]
    fn warp_clears_state_and_does_not_retrigger_without_new_fixation() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));

        let path = linear_path(Point2D::new(500.0, 500.0), Point2D::new(150.0, 120.0), 210);
        let warp_index = path
            .iter()
            .position(|s| engine.add_sample(s.timestamp_ms, s.position).is_some())
            .expect("gesture should warp");

        assert!(engine.state().window.is_empty());
        assert!(engine.state().fixation.is_none());

        for sample in &path[warp_index + 1..] {
            assert!(engine.add_sample(sample.timestamp_ms, sample.position).is_none());
        }
        assert!(engine.add_sample(1_000, Point2D::new(900.0, 900.0)).is_none());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::NoFixation));
    }

    #[test]
    fn never_warps_when_cursor_keeps_its_distance() {
        // Deterministic pseudo-random jitter that never heads for the fixation.
        let mut engine = WarpEngine::new(config()).expect("engine");
        let fixation = Point2D::new(100.0, 100.0);
        engine.set_fixation(fixation);

        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut position = Point2D::new(800.0, 800.0);
        for ts in (0..5_000).step_by(7) {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let dx = ((seed >> 33) % 21) as f64 - 10.0;
            let dy = ((seed >> 17) % 21) as f64 - 10.0;
            position = position.offset(dx, dy);
            if position.distance_to(fixation) < 600.0 {
                position = Point2D::new(800.0, 800.0);
            }
            assert!(engine.add_sample(ts, position).is_none());
        }
    }

    #[test]
    fn holds_without_fixation() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        let path = linear_path(Point2D::new(500.0, 500.0), Point2D::new(150.0, 120.0), 210);
        assert!(drive(&mut engine, &path).is_empty());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::NoFixation));
    }

    #[test]
    fn holds_while_window_is_warming_up() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));
        assert!(engine.add_sample(0, Point2D::new(500.0, 500.0)).is_none());
        assert!(engine.add_sample(150, Point2D::new(160.0, 160.0)).is_none());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::WarmingUp));
    }

    #[test]
    fn holds_inside_home_radius() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));
        engine.add_sample(0, Point2D::new(500.0, 500.0));
        assert!(engine.add_sample(200, Point2D::new(110.0, 110.0)).is_none());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::InsideHomeRadius));
    }

    #[test]
    fn holds_when_moving_away() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));
        engine.add_sample(0, Point2D::new(300.0, 300.0));
        assert!(engine.add_sample(200, Point2D::new(700.0, 700.0)).is_none());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::MovingAway));
    }

    #[test]
    fn holds_on_short_movement() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.set_fixation(Point2D::new(100.0, 100.0));
        engine.add_sample(0, Point2D::new(500.0, 500.0));
        assert!(engine.add_sample(200, Point2D::new(450.0, 450.0)).is_none());
        assert_eq!(engine.state().assess(engine.config()), Err(HoldReason::TooShort));
    }

    #[test]
    fn window_prunes_by_elapsed_time_and_keeps_newest() {
        let mut window = WarpWindow::default();
        for ts in [0, 50, 100, 250, 300] {
            window.insert(TimedSample::new(ts, Point2D::new(ts as f64, 0.0)), 200);
        }

        let timestamps: Vec<i64> = window.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(timestamps, vec![100, 250, 300]);
        assert!(window.span_ms() <= 200);
        assert!(window.covers(200));

        window.insert(TimedSample::new(10_000, Point2D::new(1.0, 1.0)), 200);
        assert_eq!(window.len(), 1);
        assert_eq!(window.newest().map(|s| s.timestamp_ms), Some(10_000));
    }

    #[test]
    fn duplicate_timestamp_overwrites_previous_sample() {
        let mut window = WarpWindow::default();
        window.insert(TimedSample::new(10, Point2D::new(1.0, 1.0)), 200);
        window.insert(TimedSample::new(10, Point2D::new(2.0, 2.0)), 200);
        assert_eq!(window.len(), 1);
        assert_eq!(window.newest().map(|s| s.position), Some(Point2D::new(2.0, 2.0)));
    }

    #[test]
    fn out_of_order_samples_are_tolerated() {
        let mut window = WarpWindow::default();
        window.insert(TimedSample::new(100, Point2D::new(1.0, 1.0)), 200);
        window.insert(TimedSample::new(50, Point2D::new(2.0, 2.0)), 200);
        assert_eq!(window.oldest().map(|s| s.timestamp_ms), Some(50));
        assert_eq!(window.newest().map(|s| s.timestamp_ms), Some(100));
    }

    #[test]
    fn step_is_a_pure_state_transition() {
        let cfg = config();
        let state = WarpState::default().with_fixation(Point2D::new(100.0, 100.0));
        let (state, decision) = state.step(&cfg, TimedSample::new(0, Point2D::new(500.0, 500.0)));
        assert!(decision.is_none());
        assert_eq!(state.window.len(), 1);

        let (state, decision) = state.step(&cfg, TimedSample::new(200, Point2D::new(160.0, 160.0)));
        assert_eq!(decision.map(|d| d.target), Some(Point2D::new(100.0, 100.0)));
        assert_eq!(decision.map(|d| d.timestamp_ms), Some(200));
        assert_eq!(state, WarpState::default());
    }

    #[test]
    fn set_fixation_keeps_window() {
        let mut engine = WarpEngine::new(config()).expect("engine");
        engine.add_sample(0, Point2D::new(1.0, 1.0));
        engine.set_fixation(Point2D::new(5.0, 5.0));
        engine.set_fixation(Point2D::new(7.0, 7.0));
        assert_eq!(engine.state().window.len(), 1);
        assert_eq!(engine.state().fixation, Some(Point2D::new(7.0, 7.0)));

        engine.reset();
        assert_eq!(engine.state(), &WarpState::default());
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = config();
        cfg.home_radius = f64::NAN;
        assert!(WarpEngine::new(cfg).is_err());

        let mut cfg = config();
        cfg.duration_threshold_ms = -5;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }
}

//! Scores detectors against recorded ground truth.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::algorithm::detectors::{DetectorId, DetectorRegistry};
use crate::algorithm::ranking::{Aggregator, RunRanking};
use crate::capture::overlay::{detector_color, OverlayWriter};
use crate::capture::screenshots::ScreenshotStore;
use crate::error::{Error, Result};
use crate::evaluation::report::{render_run, ReportSink};
use crate::models::session::{GroundTruthSample, SessionFile};

/// Why a ground-truth sample was not scored.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingScreenshot,
    UnreadableScreenshot(String),
    InvalidGroundTruth,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// `(detector, error distance)` for every active detector.
    Scored(Vec<(DetectorId, f64)>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub scored: usize,
    pub skipped: usize,
}

/// One evaluation run: every sample of every session goes through every active
/// detector, results accumulate until [`EvaluationRunner::finalize`].
///
/// Samples are processed strictly in call order.
pub struct EvaluationRunner<S> {
    registry: DetectorRegistry,
    active: Vec<DetectorId>,
    store: S,
    aggregator: Aggregator,
    overlays: Option<OverlayWriter>,
    report: Option<Box<dyn ReportSink>>,
    run_id: Uuid,
    started_at: DateTime<Utc>,
}

impl<S: ScreenshotStore> EvaluationRunner<S> {
    /// All registered detectors start out active.
    pub fn new(registry: DetectorRegistry, store: S) -> Self {
        let active = registry.ids().collect();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log::info!(
            "evaluation: run_id={run_id} detectors={} started_at={}",
            registry.len(),
            started_at.to_rfc3339()
        );
        Self {
            registry,
            active,
            store,
            aggregator: Aggregator::new(),
            overlays: None,
            report: None,
            run_id,
            started_at,
        }
    }

    pub fn with_overlays(mut self, overlays: OverlayWriter) -> Self {
        self.overlays = Some(overlays);
        self
    }

    pub fn with_report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.report = Some(sink);
        self
    }

    /// Restricts scoring to `ids`; every id must be registered.
    pub fn select_detectors(&mut self, ids: &[DetectorId]) -> Result<()> {
        if let Some(unknown) = ids.iter().find(|id| !self.registry.contains(**id)) {
            return Err(Error::UnknownDetector(*unknown));
        }
        self.active = ids.to_vec();
        Ok(())
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Scores one sample; the user also identifies the session.
    ///
    /// Missing or undecodable screenshots are logged and skipped.
    pub fn evaluate_sample(
        &mut self,
        user: &str,
        sample: &GroundTruthSample,
    ) -> Result<SampleOutcome> {
        let ts = sample.timestamp;
        if !sample.mouse_point.is_finite() {
            log::warn!("evaluate_sample: user={user} ts={ts} invalid ground truth");
            return Ok(SampleOutcome::Skipped(SkipReason::InvalidGroundTruth));
        }

        let screenshot = match self.store.load(user, ts) {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::warn!("evaluate_sample: user={user} ts={ts} screenshot not found");
                return Ok(SampleOutcome::Skipped(SkipReason::MissingScreenshot));
            }
            Err(e) => {
                log::warn!("evaluate_sample: user={user} ts={ts} unreadable screenshot: {e}");
                let reason = SkipReason::UnreadableScreenshot(e.to_string());
                return Ok(SampleOutcome::Skipped(reason));
            }
        };

        let mut scores = Vec::with_capacity(self.active.len());
        for &id in &self.active {
            let detector = self.registry.get(id)?;
            let estimate = detector.analyse(&screenshot);
            let distance = estimate.distance_to(sample.mouse_point);
            log::debug!(
                "evaluate_sample: user={user} ts={ts} detector={} distance={distance:.2}",
                detector.display_name()
            );
            self.aggregator.record(user, id, distance);
            scores.push((id, distance));

            if let Some(overlays) = &self.overlays {
                let run_ts = self.started_at.timestamp_millis();
                let path = overlays.overlay_path(user, run_ts, ts);
                if let Err(e) = overlays.compose(
                    &path,
                    &screenshot,
                    sample.mouse_point,
                    estimate,
                    detector_color(&self.run_id, id),
                    detector.display_name(),
                ) {
                    log::warn!("evaluate_sample: overlay {} failed: {e}", path.display());
                }
            }
        }

        Ok(SampleOutcome::Scored(scores))
    }

    pub fn evaluate_session(&mut self, session: &SessionFile) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        for sample in &session.samples {
            match self.evaluate_sample(&session.user, sample)? {
                SampleOutcome::Scored(_) => summary.scored += 1,
                SampleOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        log::info!(
            "evaluate_session: user={} scored={} skipped={}",
            session.user,
            summary.scored,
            summary.skipped
        );
        Ok(summary)
    }

    pub fn ranking(&self) -> RunRanking {
        self.aggregator.rank()
    }

    pub fn report_text(&self) -> String {
        let timestamp = self.started_at.format("%Y-%m-%d %H:%M:%S").to_string();
        render_run(&self.ranking(), &self.registry, &timestamp)
    }

    /// Ranks the run, optionally appends the report, and returns the display
    /// name of the overall best detector (`None` when nothing was scored).
    pub fn finalize(&mut self, write_log: bool) -> Result<Option<String>> {
        let ranking = self.ranking();

        if write_log {
            let text = self.report_text();
            match self.report.as_mut() {
                Some(sink) => sink.append(&text)?,
                None => log::warn!("finalize: run_id={} no report sink configured", self.run_id),
            }
        }

        let best = ranking.best().map(|id| self.registry.display_name(id));
        match &best {
            Some(name) => log::info!("finalize: run_id={} best={name}", self.run_id),
            None => log::info!("finalize: run_id={} no data", self.run_id),
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use approx::assert_relative_eq;
    use image::{Rgba, RgbaImage};

    use crate::algorithm::detectors::Detector;
    use crate::capture::screenshots::FsScreenshotStore;
    use crate::evaluation::report::FileReportSink;
    use crate::models::geometry::Point2D;

    struct FixedDetector {
        point: Point2D,
        name: &'static str,
    }

    impl Detector for FixedDetector {
        fn analyse(&self, _image: &RgbaImage) -> Point2D {
            self.point
        }

        fn display_name(&self) -> &str {
            self.name
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        images: HashMap<(String, i64), RgbaImage>,
        corrupt: HashSet<i64>,
    }

    impl MemoryStore {
        fn with(mut self, user: &str, timestamp: i64) -> Self {
            self.images
                .insert((user.to_string(), timestamp), RgbaImage::new(20, 20));
            self
        }
    }

    impl ScreenshotStore for MemoryStore {
        fn load(&self, user: &str, timestamp: i64) -> Result<Option<RgbaImage>> {
            if self.corrupt.contains(&timestamp) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "corrupt png",
                )));
            }
            Ok(self.images.get(&(user.to_string(), timestamp)).cloned())
        }
    }

    fn registry() -> DetectorRegistry {
        let mut registry = DetectorRegistry::new();
        registry.register(Box::new(FixedDetector {
            point: Point2D::new(13.0, 14.0),
            name: "Offset",
        }));
        registry.register(Box::new(FixedDetector {
            point: Point2D::new(10.0, 10.0),
            name: "Exact",
        }));
        registry
    }

    fn sample(timestamp: i64) -> GroundTruthSample {
        GroundTruthSample {
            timestamp,
            mouse_point: Point2D::new(10.0, 10.0),
            fixation: None,
            pupils: None,
        }
    }

    #[test]
    fn scores_every_active_detector() {
        let mut runner = EvaluationRunner::new(registry(), MemoryStore::default().with("alice", 1));

        let outcome = runner.evaluate_sample("alice", &sample(1)).expect("evaluate");
        assert_eq!(
            outcome,
            SampleOutcome::Scored(vec![(DetectorId(0), 5.0), (DetectorId(1), 0.0)])
        );

        let stats = runner.aggregator().session("alice").expect("session stats");
        assert_relative_eq!(stats.average(DetectorId(0)).expect("average"), 5.0);
        assert_eq!(stats.best_detector(), Some(DetectorId(1)));
    }

    #[test]
    fn missing_and_corrupt_screenshots_are_skipped() {
        let mut store = MemoryStore::default().with("alice", 1).with("alice", 3);
        store.corrupt.insert(4);
        let mut runner = EvaluationRunner::new(registry(), store);

        assert_eq!(
            runner.evaluate_sample("alice", &sample(2)).expect("evaluate"),
            SampleOutcome::Skipped(SkipReason::MissingScreenshot)
        );
        assert!(matches!(
            runner.evaluate_sample("alice", &sample(4)).expect("evaluate"),
            SampleOutcome::Skipped(SkipReason::UnreadableScreenshot(_))
        ));

        let session = SessionFile::new("alice", (1..=4).map(sample).collect());
        let summary = runner.evaluate_session(&session).expect("session");
        assert_eq!(summary, SessionSummary { scored: 2, skipped: 2 });
        assert_eq!(runner.aggregator().session("alice").map(|s| s.sample_count()), Some(2));
    }

    #[test]
    fn non_finite_ground_truth_is_skipped() {
        let mut runner = EvaluationRunner::new(registry(), MemoryStore::default().with("alice", 1));
        let mut bad = sample(1);
        bad.mouse_point = Point2D::new(f64::NAN, 0.0);

        assert_eq!(
            runner.evaluate_sample("alice", &bad).expect("evaluate"),
            SampleOutcome::Skipped(SkipReason::InvalidGroundTruth)
        );
        assert!(runner.aggregator().is_empty());
    }

    #[test]
    fn selecting_unregistered_detector_fails() {
        let mut runner = EvaluationRunner::new(registry(), MemoryStore::default());
        assert!(matches!(
            runner.select_detectors(&[DetectorId(0), DetectorId(9)]),
            Err(Error::UnknownDetector(DetectorId(9)))
        ));

        runner.select_detectors(&[DetectorId(0)]).expect("known id");
        runner.store = MemoryStore::default().with("alice", 1);
        let outcome = runner.evaluate_sample("alice", &sample(1)).expect("evaluate");
        assert_eq!(outcome, SampleOutcome::Scored(vec![(DetectorId(0), 5.0)]));
    }

    #[test]
    fn finalize_without_data_reports_no_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("evaluation.log");
        let mut runner = EvaluationRunner::new(registry(), MemoryStore::default())
            .with_report_sink(Box::new(FileReportSink::new(&log_path)));

        assert_eq!(runner.finalize(true).expect("finalize"), None);
        let log = std::fs::read_to_string(&log_path).expect("read log");
        assert!(log.contains("Number of DataSets overall: 0"));
        assert!(log.contains("-> no data"));
    }

    #[test]
    fn finalize_returns_best_display_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("evaluation.log");
        let mut runner = EvaluationRunner::new(registry(), MemoryStore::default().with("alice", 1))
            .with_report_sink(Box::new(FileReportSink::new(&log_path)));
        runner.evaluate_sample("alice", &sample(1)).expect("evaluate");

        assert_eq!(runner.finalize(false).expect("finalize"), Some("Exact".to_string()));
        assert!(!log_path.exists());

        assert_eq!(runner.finalize(true).expect("finalize"), Some("Exact".to_string()));
        let log = std::fs::read_to_string(&log_path).expect("read log");
        assert!(log.contains("Session - User: alice"));
        assert!(log.contains("-> best result for Exact"));
    }

    #[test]
    fn overlays_land_under_run_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsScreenshotStore::new(dir.path());
        let screenshot_path = store.screenshot_path("alice", 5);
        std::fs::create_dir_all(screenshot_path.parent().expect("parent")).expect("mkdir");
        RgbaImage::from_pixel(20, 20, Rgba([200, 200, 200, 255]))
            .save(&screenshot_path)
            .expect("save screenshot");

        let evaluation_dir = dir.path().join("evaluation");
        let mut runner = EvaluationRunner::new(registry(), store)
            .with_overlays(OverlayWriter::new(&evaluation_dir, 2));
        runner.evaluate_sample("alice", &sample(5)).expect("evaluate");

        let overlay = evaluation_dir
            .join(format!("alice_{}", runner.started_at().timestamp_millis()))
            .join("alice_5_evaluated.png");
        assert!(overlay.is_file());
    }
}

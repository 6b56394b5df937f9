//! Human-readable evaluation report (evaluation.log).
//!
//! ```text
//! Session - User: alice, Timestamp: 2026-10-19 12:00:00, Number of DataSets: 12
//! Fixation Center: 41.27 Pixel distance averaged.
//! Dark Centroid: 18.90 Pixel distance averaged.
//! -> best result for Dark Centroid
//! - over all results for the session above -
//! Timestamp: 2026-10-19 12:00:00, Number of DataSets overall: 12
//! ...
//! -> best result for Dark Centroid
//! -----
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::algorithm::detectors::DetectorRegistry;
use crate::algorithm::ranking::{RunRanking, StatsRanking};
use crate::error::Result;

const SESSION_PREFIX: &str = "Session - User: ";
const GLOBAL_HEADER: &str = "- over all results for the session above -";
const AVERAGE_SUFFIX: &str = " Pixel distance averaged.";
const BEST_PREFIX: &str = "-> best result for ";
const NO_DATA_LINE: &str = "-> no data";
const SEPARATOR: &str = "-----";

/// Append-only destination for report text.
pub trait ReportSink {
    fn append(&mut self, text: &str) -> Result<()>;
}

impl ReportSink for String {
    fn append(&mut self, text: &str) -> Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// Appends to a file, creating it and its directory on first write.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileReportSink {
    fn append(&mut self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Renders every session block followed by the global block.
pub fn render_run(ranking: &RunRanking, registry: &DetectorRegistry, timestamp: &str) -> String {
    let mut out = String::new();
    for session in &ranking.sessions {
        out.push_str(&format!(
            "{SESSION_PREFIX}{}, Timestamp: {timestamp}, Number of DataSets: {}\n",
            session.session_id, session.ranking.sample_count
        ));
        render_averages(&mut out, &session.ranking, registry);
    }

    let sample_count = ranking.global.as_ref().map_or(0, |global| global.sample_count);
    out.push_str(GLOBAL_HEADER);
    out.push('\n');
    out.push_str(&format!(
        "Timestamp: {timestamp}, Number of DataSets overall: {sample_count}\n"
    ));
    match &ranking.global {
        Some(global) => render_averages(&mut out, global, registry),
        None => {
            out.push_str(NO_DATA_LINE);
            out.push('\n');
        }
    }
    out.push_str(SEPARATOR);
    out.push('\n');
    out
}

fn render_averages(out: &mut String, ranking: &StatsRanking, registry: &DetectorRegistry) {
    for (id, average) in &ranking.averages {
        out.push_str(&format!(
            "{}: {average:.2}{AVERAGE_SUFFIX}\n",
            registry.display_name(*id)
        ));
    }
    match ranking.best {
        Some(best) => out.push_str(&format!("{BEST_PREFIX}{}\n", registry.display_name(best))),
        None => {
            out.push_str(NO_DATA_LINE);
            out.push('\n');
        }
    }
}

/// Which part of the report a parsed block came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Session { user: String },
    Global,
}

/// One block read back from report text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBlock {
    pub kind: BlockKind,
    pub sample_count: usize,
    /// `(display name, average)` in report order.
    pub averages: Vec<(String, f64)>,
    /// Best line as written, `None` for `-> no data`.
    pub best: Option<String>,
}

impl ReportBlock {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            sample_count: 0,
            averages: Vec::new(),
            best: None,
        }
    }

    /// Best detector recomputed from the parsed averages.
    pub fn recomputed_best(&self) -> Option<&str> {
        self.ranking_order().first().copied()
    }

    /// Display names ordered by ascending average.
    ///
    /// Averages are written with two decimals, so distinct values can read
    /// back equal. Among equal values the written best line comes first, and
    /// the rest keep report order.
    pub fn ranking_order(&self) -> Vec<&str> {
        let is_written_best = |name: &str| self.best.as_deref() == Some(name);
        let mut ordered: Vec<&(String, f64)> = self.averages.iter().collect();
        ordered.sort_by(|a, b| {
            let a_best = is_written_best(a.0.as_str());
            let b_best = is_written_best(b.0.as_str());
            a.1.total_cmp(&b.1).then_with(|| b_best.cmp(&a_best))
        });
        ordered.into_iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Reads session and global blocks back out of report text.
///
/// Lines that belong to no recognised block are ignored, so a log holding
/// several appended runs parses into all of their blocks.
pub fn parse_report(text: &str) -> Vec<ReportBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<ReportBlock> = None;
    let mut expect_global_header = false;

    for line in text.lines().map(str::trim_end) {
        if let Some(rest) = line.strip_prefix(SESSION_PREFIX) {
            blocks.extend(current.take());
            let mut block = ReportBlock::new(BlockKind::Session {
                user: field_before(rest, ", Timestamp: ").to_string(),
            });
            block.sample_count = count_after(rest, "Number of DataSets: ");
            current = Some(block);
        } else if line == GLOBAL_HEADER {
            blocks.extend(current.take());
            current = Some(ReportBlock::new(BlockKind::Global));
            expect_global_header = true;
        } else if expect_global_header && line.starts_with("Timestamp: ") {
            expect_global_header = false;
            if let Some(block) = current.as_mut() {
                block.sample_count = count_after(line, "Number of DataSets overall: ");
            }
        } else if let Some(body) = line.strip_suffix(AVERAGE_SUFFIX) {
            let parsed = body
                .rsplit_once(": ")
                .and_then(|(name, value)| Some((name, value.trim().parse::<f64>().ok()?)));
            match (current.as_mut(), parsed) {
                (Some(block), Some((name, average))) => {
                    block.averages.push((name.to_string(), average));
                }
                _ => log::debug!("report parse: skipping line {line:?}"),
            }
        } else if let Some(name) = line.strip_prefix(BEST_PREFIX) {
            if let Some(block) = current.as_mut() {
                block.best = Some(name.to_string());
            }
        } else if line == SEPARATOR {
            blocks.extend(current.take());
        }
    }
    blocks.extend(current);
    blocks
}

fn field_before<'a>(text: &'a str, delimiter: &str) -> &'a str {
    text.split_once(delimiter).map_or(text, |(field, _)| field)
}

fn count_after(text: &str, key: &str) -> usize {
    text.split_once(key)
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

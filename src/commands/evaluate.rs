//! evaluate: scores the built-in detectors against recorded sessions.

use std::path::PathBuf;

use clap::Args;

use crate::algorithm::detectors::DetectorRegistry;
use crate::capture::overlay::OverlayWriter;
use crate::capture::screenshots::FsScreenshotStore;
use crate::evaluation::report::FileReportSink;
use crate::evaluation::runner::EvaluationRunner;
use crate::models::session::SessionFile;

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    /// Directory holding data/ and evaluation/ (defaults to settings dataRoot)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// User whose session is evaluated; repeat for several sessions
    #[arg(long = "user", required = true)]
    pub users: Vec<String>,

    /// Write diagnostic overlays
    #[arg(long)]
    pub draw: bool,

    /// Skip appending to evaluation.log
    #[arg(long)]
    pub no_log: bool,

    /// Settings file (defaults to the per-user config dir)
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

/// Runs one evaluation over every requested user and returns the overall best
/// detector, `None` when no sample could be scored.
pub fn evaluate(args: &EvaluateArgs) -> Result<Option<String>, String> {
    let settings = super::load_settings(args.settings.as_deref())?;
    let root = args
        .data
        .clone()
        .unwrap_or_else(|| settings.evaluation.data_root.clone());
    let evaluation_dir = root.join("evaluation");
    log::info!(
        "evaluate: root={} users={}",
        root.display(),
        args.users.join(",")
    );

    let store = FsScreenshotStore::new(&root);
    let mut runner = EvaluationRunner::new(DetectorRegistry::with_builtin(), store.clone())
        .with_report_sink(Box::new(FileReportSink::new(
            evaluation_dir.join("evaluation.log"),
        )));
    if args.draw || settings.evaluation.draw_overlays {
        runner = runner.with_overlays(OverlayWriter::new(
            &evaluation_dir,
            settings.evaluation.marker_radius,
        ));
    }

    for user in &args.users {
        let path = store.session_path(user);
        let session = SessionFile::load(&path)
            .map_err(|e| format!("Failed to load session {}: {e}", path.display()))?;
        if session.user != *user {
            log::warn!(
                "evaluate: session {} belongs to user={}, evaluating as {user}",
                path.display(),
                session.user
            );
        }
        let session = SessionFile {
            user: user.clone(),
            ..session
        };
        runner
            .evaluate_session(&session)
            .map_err(|e| format!("Failed to evaluate session {}: {e}", path.display()))?;
    }

    let write_log = settings.evaluation.write_log && !args.no_log;
    runner
        .finalize(write_log)
        .map_err(|e| format!("Failed to finish evaluation: {e}"))
}

//! replay: runs a recorded input stream through the warp engine.

use std::path::PathBuf;

use clap::Args;

use crate::algorithm::mouse_warp::WarpDecision;
use crate::models::events::EventsFile;
use crate::telemetry::input_loop::replay_events;

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Recorded events.json
    #[arg(long)]
    pub events: PathBuf,

    /// Settings file providing the warp thresholds
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

pub fn replay(args: &ReplayArgs) -> Result<Vec<WarpDecision>, String> {
    let settings = super::load_settings(args.settings.as_deref())?;
    log::info!("replay: events={}", args.events.display());

    let file = EventsFile::load(&args.events)
        .map_err(|e| format!("Failed to load events {}: {e}", args.events.display()))?;
    replay_events(&file, settings.warp)
        .map_err(|e| format!("Failed to replay {}: {e}", args.events.display()))
}

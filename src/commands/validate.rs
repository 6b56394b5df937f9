//! validate: checks a ground-truth record and lists its usable areas.

use std::path::PathBuf;

use clap::Args;

use crate::evaluation::ground_truth::{self, GroundTruthPoint};

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// PreparedText.xml to check
    #[arg(long)]
    pub record: PathBuf,
}

/// Structural check first; a structurally valid record is then read with its
/// companion files.
pub fn validate(args: &ValidateArgs) -> Result<Vec<GroundTruthPoint>, String> {
    log::info!("validate: record={}", args.record.display());
    ground_truth::validate(&args.record)
        .map_err(|e| format!("Invalid record {}: {e}", args.record.display()))?;
    ground_truth::try_read(&args.record)
        .map_err(|e| format!("Failed to read record {}: {e}", args.record.display()))
}

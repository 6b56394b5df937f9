pub mod algorithm;
pub mod capture;
pub mod commands;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod telemetry;

use clap::{Parser, Subcommand};

use commands::evaluate::EvaluateArgs;
use commands::replay::ReplayArgs;
use commands::validate::ValidateArgs;

/// Gaze-assisted pointing: warp decisions and detector evaluation.
#[derive(Debug, Parser)]
#[command(name = "gazewarp", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score the built-in detectors against recorded sessions
    Evaluate(EvaluateArgs),
    /// Replay a recorded input stream through the warp engine
    Replay(ReplayArgs),
    /// Check a ground-truth record (PreparedText.xml)
    Validate(ValidateArgs),
}

pub fn run() -> Result<(), String> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate(args) => match commands::evaluate::evaluate(&args)? {
            Some(best) => println!("best detector: {best}"),
            None => println!("no data"),
        },
        Command::Replay(args) => {
            let decisions = commands::replay::replay(&args)?;
            for decision in &decisions {
                println!(
                    "{}\twarp to ({:.1}, {:.1})",
                    decision.timestamp_ms, decision.target.x, decision.target.y
                );
            }
            println!("{} warps", decisions.len());
        }
        Command::Validate(args) => {
            let points = commands::validate::validate(&args)?;
            for point in &points {
                println!(
                    "area {}: ({:.0}, {:.0}) -> ({:.0}, {:.0})",
                    point.index, point.start.x, point.start.y, point.stop.x, point.stop.y
                );
            }
            println!("{} usable areas", points.len());
        }
    }
    Ok(())
}

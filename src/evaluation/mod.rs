pub mod ground_truth;
pub mod report;
pub mod runner;

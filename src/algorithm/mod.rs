pub mod detectors;
pub mod mouse_warp;
pub mod ranking;

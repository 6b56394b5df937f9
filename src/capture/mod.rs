pub mod label;
pub mod overlay;
pub mod screenshots;

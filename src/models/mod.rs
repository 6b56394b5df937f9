pub mod events;
pub mod geometry;
pub mod session;
pub mod settings;

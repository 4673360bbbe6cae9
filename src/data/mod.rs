//! Data module for settings and saved overlay state

mod config;
mod position;
mod store;

pub use config::{AppConfig, MotionConfig, TimeoutOption};
pub use position::PositionStore;
pub use store::SettingsStore;

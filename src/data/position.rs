//! Saved Position
//!
//! Remembers where the user last left the floating icon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::motion::Position;

/// Last known icon position, as stored on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPosition {
    pub x: i32,
    pub y: i32,
}

impl SavedPosition {
    /// Save position to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load position from file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let position: SavedPosition = serde_json::from_str(&json)?;
        Ok(position)
    }
}

impl From<Position> for SavedPosition {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<SavedPosition> for Position {
    fn from(p: SavedPosition) -> Self {
        Position::new(p.x, p.y)
    }
}

/// File-backed store for the icon position
#[derive(Debug, Clone)]
pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the saved position. A missing or unreadable file yields the origin.
    pub fn load(&self) -> Position {
        if !self.path.exists() {
            return Position::default();
        }
        match SavedPosition::load(&self.path) {
            Ok(saved) => saved.into(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable position file {:?}: {}", self.path, e);
                Position::default()
            }
        }
    }

    /// Persist a position. Failures are logged and otherwise ignored.
    pub fn persist(&self, position: Position) {
        if let Err(e) = SavedPosition::from(position).save(&self.path) {
            tracing::warn!("Failed to save position to {:?}: {}", self.path, e);
        } else {
            tracing::debug!("Saved position ({}, {})", position.x, position.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_defaults_to_origin() {
        let dir = TempDir::new().unwrap();
        let store = PositionStore::new(dir.path().join("position.json"));
        assert_eq!(store.load(), Position::new(0, 0));
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let store = PositionStore::new(dir.path().join("position.json"));

        store.persist(Position::new(880, 1700));
        assert_eq!(store.load(), Position::new(880, 1700));
    }

    #[test]
    fn test_corrupt_file_defaults_to_origin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("position.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = PositionStore::new(path);
        assert_eq!(store.load(), Position::default());
    }

    #[test]
    fn test_json_layout() {
        let json = serde_json::to_string(&SavedPosition { x: -4, y: 12 }).unwrap();
        assert_eq!(json, r#"{"x":-4,"y":12}"#);
    }
}

//! Runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_core::WorldConfig;

/// Host loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub world: WorldConfig,
    /// Frames to simulate before exiting.
    pub frames: u32,
    /// Entities created each frame.
    pub spawn_per_frame: u32,
    /// Remove the oldest entity every N frames (0 disables removal).
    pub despawn_every: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            frames: 120,
            spawn_per_frame: 64,
            despawn_every: 2,
        }
    }
}

impl RuntimeSettings {
    /// Load from a JSON file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        settings.world.validate()?;
        Ok(settings)
    }
}

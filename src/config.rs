use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use crate::engine::scoring::TierTable;
use crate::engine::EngineSettings;
use crate::pacing::{Delayed, Instant, Pacer};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Step over narrative lines without waiting for Enter.
    pub auto_advance: bool,
    /// Pause before each simulated reply, in milliseconds (0 = none).
    pub thinking_delay_ms: u64,
    /// Where the sign-in record lives.
    pub session_path: PathBuf,
    /// Replacement for the built-in scenario catalogue.
    pub catalogue_path: Option<PathBuf>,
    /// Score bands for the results screen.
    pub tiers: TierTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_advance: true,
            thinking_delay_ms: 600,
            session_path: PathBuf::from(".courtsim/session.json"),
            catalogue_path: None,
            tiers: TierTable::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        info!("Loading config from: {}", path.display());
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            auto_advance: self.auto_advance,
            tiers: self.tiers.clone(),
        }
    }

    pub fn pacer(&self) -> Box<dyn Pacer> {
        match self.thinking_delay_ms {
            0 => Box::new(Instant),
            ms => Box::new(Delayed(Duration::from_millis(ms))),
        }
    }
}

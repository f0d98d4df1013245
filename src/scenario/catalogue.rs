use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::scenario::model::{InteractionKind, Scenario};

/// Catalogue format version this build understands.
pub const CATALOGUE_VERSION: u32 = 1;

const BUILTIN_CATALOGUE: &str = include_str!("../../scenarios/catalogue.json");

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    version: u32,
    scenarios: Vec<Scenario>,
}

/// The static list of scenarios, in picker order.
#[derive(Debug, Clone)]
pub struct Catalogue {
    scenarios: Vec<Scenario>,
}

impl Catalogue {
    /// The catalogue compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOGUE).context("built-in scenario catalogue is invalid")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scenario catalogue from: {}", path.display());
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalogue {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid catalogue {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogueFile =
            serde_json::from_str(raw).context("failed to parse catalogue JSON")?;
        ensure!(
            file.version == CATALOGUE_VERSION,
            "unsupported catalogue version {} (expected {CATALOGUE_VERSION})",
            file.version
        );
        validate(&file.scenarios)?;
        debug!("Catalogue holds {} scenarios", file.scenarios.len());
        Ok(Self {
            scenarios: file.scenarios,
        })
    }

    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

fn validate(scenarios: &[Scenario]) -> Result<()> {
    let id_pattern = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$")?;
    let mut scenario_ids = HashSet::new();

    for scenario in scenarios {
        let sid = scenario.id.as_str();
        ensure!(
            id_pattern.is_match(sid),
            "scenario id '{sid}' must be lowercase kebab-case"
        );
        ensure!(scenario_ids.insert(sid), "duplicate scenario id '{sid}'");
        ensure!(!scenario.stages.is_empty(), "scenario '{sid}' has no stages");

        let mut interaction_ids = HashSet::new();
        for stage in &scenario.stages {
            ensure!(
                !stage.interactions.is_empty(),
                "stage '{}' of scenario '{sid}' has no interactions",
                stage.id
            );
            for interaction in &stage.interactions {
                if !interaction_ids.insert(interaction.id.as_str()) {
                    bail!(
                        "duplicate interaction id '{}' in scenario '{sid}'",
                        interaction.id
                    );
                }
                if let InteractionKind::Choice { options } = &interaction.kind {
                    ensure!(
                        !options.is_empty(),
                        "choice '{}' in scenario '{sid}' has no options",
                        interaction.id
                    );
                    let mut option_ids = HashSet::new();
                    for option in options {
                        ensure!(
                            option_ids.insert(option.id.as_str()),
                            "duplicate option id '{}' in choice '{}'",
                            option.id,
                            interaction.id
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

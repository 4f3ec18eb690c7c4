//! Model bundle persistence.
//!
//! The scaler and the four members form one atomic artifact unit: everything
//! is written to a staging directory first, then swapped into place with a
//! rename. Loading demands all artifacts present and version-compatible;
//! anything else is a `Persistence` error so callers can fall back to the
//! untrained state instead of crashing.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::ensemble::SymptomEnsemble;
use crate::error::{Result, TabularError};

/// Bump when an artifact's on-disk layout changes incompatibly.
pub const ARTIFACT_VERSION: u32 = 1;

const SCALER_FILE: &str = "scaler.json";
const LINEAR_FILE: &str = "linear_model.json";
const FOREST_FILE: &str = "forest_model.json";
const BOOST_FILE: &str = "boost_model.json";
const MLP_FILE: &str = "mlp_model.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    artifacts: Vec<String>,
}

fn write_artifact<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    fs::write(dir.join(name), json)?;
    Ok(())
}

fn read_artifact<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let bytes = fs::read(&path).map_err(|e| {
        TabularError::Persistence(format!("missing artifact {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        TabularError::Persistence(format!("corrupt artifact {}: {}", path.display(), e))
    })
}

impl SymptomEnsemble {
    /// Persist scaler + members + manifest as one unit under `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let staging = dir.with_extension("staging");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        write_artifact(&staging, SCALER_FILE, &self.scaler)?;
        write_artifact(&staging, LINEAR_FILE, &self.linear)?;
        write_artifact(&staging, FOREST_FILE, &self.forest)?;
        write_artifact(&staging, BOOST_FILE, &self.boost)?;
        write_artifact(&staging, MLP_FILE, &self.mlp)?;
        write_artifact(
            &staging,
            MANIFEST_FILE,
            &Manifest {
                version: ARTIFACT_VERSION,
                artifacts: vec![
                    SCALER_FILE.to_string(),
                    LINEAR_FILE.to_string(),
                    FOREST_FILE.to_string(),
                    BOOST_FILE.to_string(),
                    MLP_FILE.to_string(),
                ],
            },
        )?;

        // Swap the staged bundle into place.
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::rename(&staging, dir)?;
        info!(dir = %dir.display(), "model bundle saved");
        Ok(())
    }

    /// Load a complete bundle from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest: Manifest = read_artifact(dir, MANIFEST_FILE)?;
        if manifest.version != ARTIFACT_VERSION {
            return Err(TabularError::Persistence(format!(
                "artifact version {} incompatible with expected {}",
                manifest.version, ARTIFACT_VERSION
            )));
        }
        for name in &manifest.artifacts {
            if !dir.join(name).exists() {
                return Err(TabularError::Persistence(format!(
                    "manifest names missing artifact {}",
                    name
                )));
            }
        }

        let ensemble = Self {
            scaler: read_artifact(dir, SCALER_FILE)?,
            linear: read_artifact(dir, LINEAR_FILE)?,
            forest: read_artifact(dir, FOREST_FILE)?,
            boost: read_artifact(dir, BOOST_FILE)?,
            mlp: read_artifact(dir, MLP_FILE)?,
        };
        debug!(dir = %dir.display(), "model bundle loaded");
        Ok(ensemble)
    }
}

//! Directory-backed persistence for trained models.
//!
//! A model directory holds `model.json`, the [`PersistedModel`] envelope around
//! the snapshot, and optionally `full_matrix.json` with every reconstructed
//! prediction for offline inspection. Only `model.json` is read back.

use crate::algorithms::LatentFactorModel;
use crate::error::Result;
use crate::models::{EpochRecord, PersistedModel};
use crate::utils::validation;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const FULL_MATRIX_FILE: &str = "full_matrix.json";

pub struct ModelStore {
    dir: PathBuf,
    write_full_matrix: bool,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_full_matrix: false,
        }
    }

    pub fn with_full_matrix(mut self, enabled: bool) -> Self {
        self.write_full_matrix = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn exists(&self) -> bool {
        self.model_path().is_file()
    }

    pub fn save(&self, model: &LatentFactorModel, history: &[EpochRecord]) -> Result<PersistedModel> {
        fs::create_dir_all(&self.dir)?;

        let persisted = PersistedModel::new(model.snapshot()).with_training_history(history);
        write_atomically(&self.model_path(), &to_bytes(&persisted)?)?;

        if self.write_full_matrix {
            let rows: Vec<Vec<f64>> = model
                .reconstruct()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect();
            write_atomically(&self.dir.join(FULL_MATRIX_FILE), &serde_json::to_vec(&rows)?)?;
        }

        info!(
            "Saved model {} ({} users x {} items) to {}",
            persisted.model_id,
            model.num_users(),
            model.num_items(),
            self.dir.display()
        );
        Ok(persisted)
    }

    /// Reads the envelope and rebuilds the model, validating every dimension.
    pub fn load(&self) -> Result<(PersistedModel, LatentFactorModel)> {
        let bytes = fs::read(self.model_path())?;
        let persisted = from_bytes(&bytes)?;
        let model = LatentFactorModel::from_snapshot(persisted.snapshot.clone())?;

        info!(
            "Loaded model {} saved at {} from {}",
            persisted.model_id,
            persisted.saved_at,
            self.dir.display()
        );
        Ok((persisted, model))
    }
}

pub fn to_bytes(persisted: &PersistedModel) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(persisted)?)
}

pub fn from_bytes(bytes: &[u8]) -> Result<PersistedModel> {
    let persisted: PersistedModel = serde_json::from_slice(bytes)?;
    validation::validate_snapshot(&persisted.snapshot)?;
    Ok(persisted)
}

// Readers never see a half-written file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

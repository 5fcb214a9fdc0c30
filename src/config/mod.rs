use crate::models::Hyperparameters;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub cold_start: ColdStartConfig,
    pub serving: ServingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub latent_factors: usize,
    pub learning_rate: f64,
    pub regularization: f64,
}

impl ModelConfig {
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::new(self.latent_factors, self.learning_rate, self.regularization)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    /// Emit an info-level progress line every this many epochs. 0 disables it.
    pub log_every: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdStartConfig {
    pub max_iterations: usize,
    pub rmse_threshold: f64,
    /// Multiplier bringing raw new-user ratings onto the training scale.
    pub rating_scale: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    pub top_n: usize,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub model_dir: PathBuf,
    pub write_full_matrix: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                latent_factors: 34,
                learning_rate: 0.02,
                regularization: 0.02,
            },
            training: TrainingConfig {
                epochs: 20,
                log_every: 10,
                seed: None,
            },
            cold_start: ColdStartConfig {
                max_iterations: 40,
                rmse_threshold: 0.7,
                rating_scale: 0.5,
                seed: None,
            },
            serving: ServingConfig {
                top_n: 10,
                workers: num_cpus::get(),
            },
            storage: StorageConfig {
                model_dir: PathBuf::from("data/factorized"),
                write_full_matrix: false,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("LATENTREC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.latent_factors == 0 {
            return Err(anyhow!("Latent factor count must be greater than 0"));
        }

        if !self.model.learning_rate.is_finite() || self.model.learning_rate <= 0.0 {
            return Err(anyhow!("Learning rate must be a positive finite number"));
        }

        if !self.model.regularization.is_finite() || self.model.regularization < 0.0 {
            return Err(anyhow!("Regularization must be a non-negative finite number"));
        }

        if self.cold_start.max_iterations == 0 {
            return Err(anyhow!("Cold-start iteration budget must be greater than 0"));
        }

        if !self.cold_start.rmse_threshold.is_finite() || self.cold_start.rmse_threshold < 0.0 {
            return Err(anyhow!("Cold-start RMSE threshold must be a non-negative finite number"));
        }

        if !self.cold_start.rating_scale.is_finite() || self.cold_start.rating_scale <= 0.0 {
            return Err(anyhow!("Rating scale must be a positive finite number"));
        }

        if self.serving.top_n == 0 {
            return Err(anyhow!("Number of recommendations must be greater than 0"));
        }

        if self.serving.workers == 0 {
            return Err(anyhow!("Worker count must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let hyper = config.model.hyperparameters();
        assert_eq!(hyper.k, 34);
        assert_eq!(hyper.alpha, 0.02);
        assert_eq!(hyper.beta, 0.02);
        assert_eq!(config.cold_start.max_iterations, 40);
        assert_eq!(config.cold_start.rmse_threshold, 0.7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.model.latent_factors = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.learning_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cold_start.rating_scale = 0.0;
        assert!(config.validate().is_err());
    }
}

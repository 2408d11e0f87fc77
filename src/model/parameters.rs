//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::horizon::Horizon;
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_cascade, bool, true);
define_param_default!(default_spill, bool, true);
define_param_default!(default_spill_penalty, f64, 0.001);
define_param_default!(default_storage_bounds_on_variables, bool, true);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Number of one-hour periods in the horizon
    pub periods: u32,
    /// Whether water released by upstream plants is routed to downstream plants
    #[serde(default = "default_cascade")]
    pub cascade: bool,
    /// Whether reservoirs may spill water without generating
    #[serde(default = "default_spill")]
    pub spill: bool,
    /// Objective cost per hm³ of spilled water
    #[serde(default = "default_spill_penalty")]
    pub spill_penalty: f64,
    /// Whether storage limits are applied as bounds on the storage variables.
    ///
    /// If false, they are added as explicit constraints instead.
    #[serde(default = "default_storage_bounds_on_variables")]
    pub storage_bounds_on_variables: bool,
}

/// Check the `spill_penalty` parameter is valid
fn check_spill_penalty(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "spill_penalty must be a finite, non-negative number"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        self.horizon()?;
        check_spill_penalty(self.spill_penalty)?;

        Ok(())
    }

    /// The horizon covered by the model
    pub fn horizon(&self) -> Result<Horizon> {
        Horizon::new(self.periods)
    }
}

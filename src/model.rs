//! The model represents the static input data provided by the user.
use crate::horizon::Horizon;
use crate::inflow::InflowMap;
use crate::input::inflow::read_inflows;
use crate::input::plant::read_plants;
use crate::plant::{HydroPlant, PlantMap};
use anyhow::Result;
use std::path::Path;
use std::rc::Rc;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The periods being modelled
    pub horizon: Horizon,
    /// Hydro plants, in input order
    pub plants: PlantMap,
    /// Natural inflows, if provided
    pub inflows: Option<InflowMap>,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;
        let horizon = parameters.horizon()?;
        let plants = read_plants(model_dir)?;
        let inflows = read_inflows(model_dir, &plants, &horizon)?;

        Ok(Model {
            parameters,
            horizon,
            plants,
            inflows,
        })
    }

    /// Iterate over the model's plants
    pub fn iter_plants(&self) -> impl Iterator<Item = &HydroPlant> {
        self.plants.values().map(Rc::as_ref)
    }
}

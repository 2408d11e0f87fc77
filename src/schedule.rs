//! Functionality for building the hydro scheduling problem for a model.
use crate::cascade::{Topology, build_topology};
use crate::model::Model;
use crate::optimisation::generation::add_generation_constraints;
use crate::optimisation::water_balance::{
    WaterBalanceOptions, WaterBalanceResult, add_water_balance_constraints,
};
use crate::optimisation::{Problem, VariableMap};
use crate::output::metadata::write_metadata;
use crate::output::{DebugDataWriter, write_topology};
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::Path;

/// A scheduling problem ready to be passed to a solver
pub struct Schedule {
    /// The optimisation problem
    pub problem: Problem,
    /// The problem's decision variables
    pub variables: VariableMap,
    /// The validated cascade topology
    pub topology: Topology,
    /// The outcome of adding water balance constraints
    pub water_balance: WaterBalanceResult,
    /// The number of generation constraints added
    pub generation_constraints: usize,
}

/// Build the scheduling problem for the given model.
///
/// # Returns
///
/// The [`Schedule`], or an error if the cascade is invalid or the water balance constraints could
/// not be added.
pub fn build_schedule(model: &Model) -> Result<Schedule> {
    let params = &model.parameters;
    let topology =
        build_topology(model.iter_plants()).context("Failed to build cascade topology")?;
    info!(
        "Built cascade topology for {} plants ({} headwaters, {} terminals)",
        topology.num_plants(),
        topology.headwaters().len(),
        topology.terminals().len()
    );

    // Set up problem
    let mut problem = Problem::default();
    let mut variables = VariableMap::new();
    variables.add_storage_variables(
        &mut problem,
        &model.plants,
        &model.horizon,
        params.storage_bounds_on_variables,
    );
    variables.add_outflow_variables(&mut problem, &model.plants, &model.horizon);
    variables.add_generation_variables(&mut problem, &model.plants, &model.horizon);

    // Add constraints
    let options = WaterBalanceOptions {
        cascade: params.cascade,
        spill: params.spill,
        spill_penalty: params.spill_penalty,
    };
    let water_balance = add_water_balance_constraints(
        &mut problem,
        &mut variables,
        &model.plants,
        &topology,
        &model.horizon,
        model.inflows.as_ref(),
        &options,
    );
    if !water_balance.success {
        bail!(
            "Failed to add water balance constraints: {}",
            water_balance.messages.join("; ")
        );
    }
    for msg in &water_balance.messages {
        info!("{msg}");
    }

    let generation_constraints =
        add_generation_constraints(&mut problem, &variables, &model.plants, &model.horizon);
    if generation_constraints == 0 && !model.plants.is_empty() {
        warn!("No generation constraints were added");
    }

    info!(
        "Built scheduling problem with {} variables and {} constraints ({} water balance, {} \
        storage bound, {generation_constraints} generation)",
        variables.num_variables(),
        problem.num_rows(),
        water_balance.relations_added,
        water_balance.bounds_added,
    );

    Ok(Schedule {
        problem,
        variables,
        topology,
        water_balance,
        generation_constraints,
    })
}

/// Build the scheduling problem and write its description to the output folder.
///
/// # Arguments
///
/// * `model_path` - Path to the model directory
/// * `model` - The model to run
/// * `output_path` - Folder where output files will be saved
/// * `debug_model` - Whether to write extra debugging information
pub fn run(model_path: &Path, model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    let schedule = build_schedule(model)?;

    write_metadata(output_path, model_path, model).context("Failed to save metadata")?;
    write_topology(output_path, &schedule.topology).context("Failed to save topology")?;
    if debug_model {
        let mut writer = DebugDataWriter::create(output_path)?;
        writer.write_water_balance(&schedule.water_balance)?;
        writer.flush()?;
    }

    Ok(())
}

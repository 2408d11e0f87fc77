//! Code for reading natural inflows from a CSV file.
use super::*;
use crate::horizon::Horizon;
use crate::id::IDCollection;
use crate::inflow::InflowMap;
use crate::plant::PlantMap;
use crate::units::Flow;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const INFLOWS_FILE_NAME: &str = "inflows.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct InflowRaw {
    plant_id: String,
    period: u32,
    inflow: Flow,
}

/// Read natural inflows from the model directory.
///
/// The inflows file is optional. If it is absent, `None` is returned and all inflows are treated
/// as zero.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `plants` - The model's hydro plants
/// * `horizon` - The periods being modelled
pub fn read_inflows(
    model_dir: &Path,
    plants: &PlantMap,
    horizon: &Horizon,
) -> Result<Option<InflowMap>> {
    let file_path = model_dir.join(INFLOWS_FILE_NAME);
    if !file_path.is_file() {
        return Ok(None);
    }

    let inflows_csv = read_csv_optional(&file_path)?;
    let inflows = read_inflows_from_iter(inflows_csv.into_iter(), plants, horizon)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(Some(inflows))
}

fn read_inflows_from_iter<I>(iter: I, plants: &PlantMap, horizon: &Horizon) -> Result<InflowMap>
where
    I: Iterator<Item = InflowRaw>,
{
    let mut inflows = InflowMap::new();
    for raw in iter {
        let plant_id = plants.get_id_by_str(&raw.plant_id)?;
        ensure!(
            horizon.contains(raw.period),
            "Period {} for plant {plant_id} is outside the horizon ({}-{})",
            raw.period,
            horizon.first(),
            horizon.last()
        );
        ensure!(
            raw.inflow.is_finite() && raw.inflow >= Flow(0.0),
            "Inflow for plant {plant_id} in period {} must be a finite, non-negative number",
            raw.period
        );
        ensure!(
            inflows
                .insert(plant_id.clone(), raw.period, raw.inflow)
                .is_none(),
            "Duplicate inflow entry for plant {plant_id} in period {}",
            raw.period
        );
    }

    Ok(inflows)
}

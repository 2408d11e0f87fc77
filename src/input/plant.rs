//! Code for reading [`HydroPlant`]s from a CSV file.
use super::*;
use crate::plant::{HydroPlant, PlantID, PlantKind, PlantMap, StorageLimits};
use crate::units::{Flow, Hours, PowerPerFlow, Volume};
use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const PLANTS_FILE_NAME: &str = "hydro_plants.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct HydroPlantRaw {
    id: String,
    kind: PlantKind,
    downstream_id: Option<String>,
    travel_time: Option<Hours>,
    min_storage: Option<Volume>,
    max_storage: Option<Volume>,
    initial_storage: Option<Volume>,
    min_outflow: Flow,
    max_outflow: Flow,
    productivity: PowerPerFlow,
}

/// Read hydro plants from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of [`HydroPlant`]s, in the order they appear in the file.
pub fn read_plants(model_dir: &Path) -> Result<PlantMap> {
    let file_path = model_dir.join(PLANTS_FILE_NAME);
    let plants_csv = read_csv(&file_path)?;
    read_plants_from_iter(plants_csv.into_iter()).with_context(|| input_err_msg(&file_path))
}

fn read_plants_from_iter<I>(iter: I) -> Result<PlantMap>
where
    I: Iterator<Item = HydroPlantRaw>,
{
    let mut plants = PlantMap::new();
    for raw in iter {
        let plant = plant_from_raw(raw)?;
        ensure!(
            !plants.contains_key(&plant.id),
            "Duplicate plant ID: {}",
            plant.id
        );
        plants.insert(plant.id.clone(), Rc::new(plant));
    }

    Ok(plants)
}

fn plant_from_raw(raw: HydroPlantRaw) -> Result<HydroPlant> {
    let id: PlantID = raw.id.into();
    let storage = match (raw.min_storage, raw.max_storage, raw.initial_storage) {
        (None, None, None) => None,
        (Some(min), Some(max), Some(initial)) => Some(
            StorageLimits::new(min, max, initial)
                .with_context(|| format!("Invalid storage limits for plant {id}"))?,
        ),
        _ => bail!(
            "Plant {id} must give all of min_storage, max_storage and initial_storage or none \
            of them"
        ),
    };

    // Treat blank IDs as absent
    let downstream_id = raw
        .downstream_id
        .filter(|downstream_id| !downstream_id.is_empty())
        .map(Into::into);

    HydroPlant::new(
        id,
        raw.kind,
        downstream_id,
        raw.travel_time,
        storage,
        raw.min_outflow..=raw.max_outflow,
        raw.productivity,
    )
}

//! The module responsible for writing output data to disk.
use crate::cascade::Topology;
use crate::optimisation::water_balance::WaterBalanceResult;
use crate::plant::PlantID;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "hydrocascade_results";

/// The output file name for the cascade topology
const TOPOLOGY_FILE_NAME: &str = "topology.csv";

/// The output file name for water balance terms
const WATER_BALANCE_FILE_NAME: &str = "debug_water_balance.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only reused if `allow_overwrite` is
/// true, in which case its contents are removed first.
///
/// # Returns
///
/// True if existing output was overwritten, false otherwise.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the topology CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TopologyRow {
    plant_id: PlantID,
    depth: u32,
    order: usize,
    downstream_id: Option<PlantID>,
    headwater: bool,
    terminal: bool,
}

/// Represents one term of a water balance relation in the debug CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct WaterBalanceRow {
    row: usize,
    plant_id: PlantID,
    period: u32,
    variable: String,
    variable_plant_id: PlantID,
    variable_period: u32,
    coefficient: f64,
    rhs: f64,
}

/// Write the cascade topology to a CSV file, one row per plant in topological order
pub fn write_topology(output_path: &Path, topology: &Topology) -> Result<()> {
    let file_path = output_path.join(TOPOLOGY_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;
    for (order, plant_id) in topology.topological_order().iter().enumerate() {
        let row = TopologyRow {
            plant_id: plant_id.clone(),
            depth: topology.depth(plant_id).unwrap_or_default(),
            order,
            downstream_id: topology.downstream(plant_id).cloned(),
            headwater: topology.is_headwater(plant_id),
            terminal: topology.is_terminal(plant_id),
        };
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// For writing extra debug information about the model
pub struct DebugDataWriter {
    water_balance_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(WATER_BALANCE_FILE_NAME);

        Ok(Self {
            water_balance_writer: csv::Writer::from_path(file_path)?,
        })
    }

    /// Write every term of every water balance relation, along with its row in the problem
    pub fn write_water_balance(&mut self, result: &WaterBalanceResult) -> Result<()> {
        for ((row, _), relation) in result.keys.iter().zip(&result.relations) {
            for (key, coefficient) in &relation.terms {
                let row = WaterBalanceRow {
                    row,
                    plant_id: relation.plant_id.clone(),
                    period: relation.period,
                    variable: key.family.to_string(),
                    variable_plant_id: key.plant_id.clone(),
                    variable_period: key.period,
                    coefficient: *coefficient,
                    rhs: relation.rhs,
                };
                self.water_balance_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.water_balance_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::build_topology;
    use crate::fixture::{cascade_plants, horizon, plant_map, reservoir};
    use crate::horizon::Horizon;
    use crate::optimisation::water_balance::{WaterBalanceOptions, add_water_balance_constraints};
    use crate::optimisation::{Problem, VariableMap};
    use crate::plant::HydroPlant;
    use itertools::Itertools;
    use rstest::rstest;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results").join("model");

        // Fresh directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing but empty
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing with contents
        File::create(output_dir.join("file.txt")).unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();

        assert_eq!(
            get_output_dir(&model_dir).unwrap(),
            PathBuf::from(OUTPUT_DIRECTORY_ROOT).join("my_model")
        );
    }

    #[rstest]
    fn test_write_topology(cascade_plants: Vec<HydroPlant>) {
        let topology = build_topology(&cascade_plants).unwrap();
        let dir = tempdir().unwrap();
        write_topology(dir.path(), &topology).unwrap();

        let records: Vec<TopologyRow> = csv::Reader::from_path(dir.path().join(TOPOLOGY_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        let ids = records.iter().map(|row| row.plant_id.to_string()).collect_vec();
        assert_eq!(ids, ["H1", "H4", "H2", "H3"]);
        assert_eq!(
            records[2],
            TopologyRow {
                plant_id: "H2".into(),
                depth: 1,
                order: 2,
                downstream_id: Some("H3".into()),
                headwater: false,
                terminal: false,
            }
        );
        assert!(records[1].headwater && records[1].terminal);
    }

    #[rstest]
    fn test_write_water_balance(horizon: Horizon) {
        let plants = plant_map([reservoir("H1", None)]);
        let topology = build_topology(plants.values().map(Rc::as_ref)).unwrap();
        let mut problem = Problem::default();
        let mut variables = VariableMap::new();
        variables.add_storage_variables(&mut problem, &plants, &horizon, true);
        variables.add_outflow_variables(&mut problem, &plants, &horizon);
        let options = WaterBalanceOptions {
            cascade: true,
            spill: false,
            spill_penalty: 0.0,
        };
        let result = add_water_balance_constraints(
            &mut problem,
            &mut variables,
            &plants,
            &topology,
            &horizon,
            None,
            &options,
        );

        let dir = tempdir().unwrap();
        {
            let mut writer = DebugDataWriter::create(dir.path()).unwrap();
            writer.write_water_balance(&result).unwrap();
            writer.flush().unwrap();
        }

        let records: Vec<WaterBalanceRow> =
            csv::Reader::from_path(dir.path().join(WATER_BALANCE_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();

        // Two terms in the first period, three after
        assert_eq!(records.len(), 2 + 3 * 4);
        assert_eq!(
            records[0],
            WaterBalanceRow {
                row: 0,
                plant_id: "H1".into(),
                period: 1,
                variable: "storage".into(),
                variable_plant_id: "H1".into(),
                variable_period: 1,
                coefficient: 1.0,
                rhs: 50.0,
            }
        );
        assert!(records.iter().filter(|row| row.row == 4).count() == 3);
    }
}

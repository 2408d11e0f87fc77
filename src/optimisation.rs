//! Decision variables for the scheduling problem.
//!
//! Variables are created family by family (storage, outflow, generation, spill), each with one
//! column per plant and period. Constraint builders look variables up through a [`VariableMap`]
//! using symbolic [`VariableKey`]s.
use crate::horizon::Horizon;
use crate::plant::{HydroPlant, PlantID, PlantMap};
use indexmap::IndexMap;
use log::debug;
use std::rc::Rc;

pub mod generation;
pub mod water_balance;

/// The optimisation problem
pub type Problem = highs::RowProblem;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// A family of decision variables, indexed by plant and period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum VariableFamily {
    /// Stored volume at the end of a period (hm³)
    Storage,
    /// Water released through the plant's turbines (m³/s)
    Outflow,
    /// Power generated (MW)
    Generation,
    /// Water released from a reservoir without generating (hm³ per period)
    Spill,
}

/// Refers to the variable of a given family for a plant and period
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableKey {
    /// The variable family
    pub family: VariableFamily,
    /// The plant the variable belongs to
    pub plant_id: PlantID,
    /// The period the variable belongs to
    pub period: u32,
}

impl VariableKey {
    /// Create a new [`VariableKey`]
    pub fn new(family: VariableFamily, plant_id: &PlantID, period: u32) -> Self {
        Self {
            family,
            plant_id: plant_id.clone(),
            period,
        }
    }
}

/// Variables of one family, keyed by plant and period
type PlantPeriodVariableMap = IndexMap<(PlantID, u32), Variable>;

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]).
#[derive(Default)]
pub struct VariableMap {
    families: IndexMap<VariableFamily, PlantPeriodVariableMap>,
    storage_bounds_on_columns: bool,
}

impl VariableMap {
    /// Create a new, empty [`VariableMap`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add storage variables for every plant with a reservoir.
    ///
    /// # Arguments
    ///
    /// * `problem` - The optimisation problem
    /// * `plants` - The model's plants
    /// * `horizon` - The periods being modelled
    /// * `bounded` - Whether to apply the storage limits as column bounds. If false, columns are
    ///   only bounded below by zero and the limits must be applied as constraints.
    pub fn add_storage_variables(
        &mut self,
        problem: &mut Problem,
        plants: &PlantMap,
        horizon: &Horizon,
        bounded: bool,
    ) {
        self.add_family(
            problem,
            VariableFamily::Storage,
            plants.values().filter(|plant| plant.has_storage()),
            horizon,
            |problem, plant| match plant.storage() {
                Some(limits) if bounded => {
                    problem.add_column(0.0, limits.min.value()..=limits.max.value())
                }
                _ => problem.add_column(0.0, 0.0..),
            },
        );
        self.storage_bounds_on_columns = bounded;
    }

    /// Add outflow variables for every plant, bounded by the plant's outflow limits
    pub fn add_outflow_variables(
        &mut self,
        problem: &mut Problem,
        plants: &PlantMap,
        horizon: &Horizon,
    ) {
        self.add_family(
            problem,
            VariableFamily::Outflow,
            plants.values(),
            horizon,
            |problem, plant| {
                let limits = &plant.outflow_limits;
                problem.add_column(0.0, limits.start().value()..=limits.end().value())
            },
        );
    }

    /// Add non-negative generation variables for every plant
    pub fn add_generation_variables(
        &mut self,
        problem: &mut Problem,
        plants: &PlantMap,
        horizon: &Horizon,
    ) {
        self.add_family(
            problem,
            VariableFamily::Generation,
            plants.values(),
            horizon,
            |problem, _| problem.add_column(0.0, 0.0..),
        );
    }

    /// Add non-negative spill variables for every plant with a reservoir.
    ///
    /// Each unit of spilled volume costs `penalty` in the objective.
    pub fn add_spill_variables(
        &mut self,
        problem: &mut Problem,
        plants: &PlantMap,
        horizon: &Horizon,
        penalty: f64,
    ) {
        self.add_family(
            problem,
            VariableFamily::Spill,
            plants.values().filter(|plant| plant.has_storage()),
            horizon,
            |problem, _| problem.add_column(penalty, 0.0..),
        );
    }

    fn add_family<'a, I, F>(
        &mut self,
        problem: &mut Problem,
        family: VariableFamily,
        plants: I,
        horizon: &Horizon,
        mut add_column: F,
    ) where
        I: Iterator<Item = &'a Rc<HydroPlant>>,
        F: FnMut(&mut Problem, &HydroPlant) -> Variable,
    {
        assert!(
            !self.has_family(family),
            "Variables for family {family} already added"
        );

        let mut vars = PlantPeriodVariableMap::new();
        for plant in plants {
            for period in horizon.iter() {
                let var = add_column(&mut *problem, Rc::as_ref(plant));
                vars.insert((plant.id.clone(), period), var);
            }
        }

        debug!("Added {} {family} variables", vars.len());
        self.families.insert(family, vars);
    }

    /// Whether variables of the given family have been added
    pub fn has_family(&self, family: VariableFamily) -> bool {
        self.families.contains_key(&family)
    }

    /// Get the [`Variable`] for the given key, if it exists
    pub fn get(&self, key: &VariableKey) -> Option<Variable> {
        self.families
            .get(&key.family)?
            .get(&(key.plant_id.clone(), key.period))
            .copied()
    }

    /// Whether storage limits were applied as column bounds when adding storage variables
    pub fn storage_bounds_on_columns(&self) -> bool {
        self.storage_bounds_on_columns
    }

    /// The number of variables of the given family
    pub fn num_family_variables(&self, family: VariableFamily) -> usize {
        self.families.get(&family).map_or(0, IndexMap::len)
    }

    /// The total number of variables across all families
    pub fn num_variables(&self) -> usize {
        self.families.values().map(IndexMap::len).sum()
    }
}

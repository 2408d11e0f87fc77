//! Natural inflows to hydro plants.
use crate::plant::PlantID;
use crate::units::Flow;
use std::collections::HashMap;

/// Natural inflow for each plant and period.
///
/// Plant/period combinations without an entry have zero inflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InflowMap(HashMap<(PlantID, u32), Flow>);

impl InflowMap {
    /// Create a new, empty [`InflowMap`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an inflow, returning the previous value for the plant and period, if any
    pub fn insert(&mut self, plant_id: PlantID, period: u32, inflow: Flow) -> Option<Flow> {
        self.0.insert((plant_id, period), inflow)
    }

    /// Get the inflow for the given plant and period, defaulting to zero
    pub fn get(&self, plant_id: &PlantID, period: u32) -> Flow {
        self.0
            .get(&(plant_id.clone(), period))
            .copied()
            .unwrap_or_default()
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

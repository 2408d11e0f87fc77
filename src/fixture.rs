//! Fixtures for tests
use crate::horizon::Horizon;
use crate::plant::{HydroPlant, PlantID, PlantKind, PlantMap, StorageLimits};
use crate::units::{Flow, Hours, PowerPerFlow, Volume};
use rstest::fixture;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn storage_limits() -> StorageLimits {
    StorageLimits::new(Volume(10.0), Volume(100.0), Volume(50.0)).unwrap()
}

/// Create a reservoir plant, optionally flowing into `downstream` after `travel_time` hours
pub fn reservoir(id: &str, downstream: Option<(&str, f64)>) -> HydroPlant {
    HydroPlant::new(
        id.into(),
        PlantKind::Reservoir,
        downstream.map(|(id, _)| PlantID::new(id)),
        downstream.map(|(_, hours)| Hours(hours)),
        Some(storage_limits()),
        Flow(0.0)..=Flow(500.0),
        PowerPerFlow(0.9),
    )
    .unwrap()
}

/// Create a run-of-river plant, optionally flowing into `downstream` after `travel_time` hours
pub fn run_of_river(id: &str, downstream: Option<(&str, f64)>) -> HydroPlant {
    HydroPlant::new(
        id.into(),
        PlantKind::RunOfRiver,
        downstream.map(|(id, _)| PlantID::new(id)),
        downstream.map(|(_, hours)| Hours(hours)),
        None,
        Flow(20.0)..=Flow(300.0),
        PowerPerFlow(0.5),
    )
    .unwrap()
}

/// Collect plants into a [`PlantMap`]
pub fn plant_map<I>(plants: I) -> PlantMap
where
    I: IntoIterator<Item = HydroPlant>,
{
    plants
        .into_iter()
        .map(|plant| (plant.id.clone(), Rc::new(plant)))
        .collect()
}

/// A chain H1 -> H2 -> H3 (delays 2h and 1h) plus an isolated plant H4
#[fixture]
pub fn cascade_plants() -> Vec<HydroPlant> {
    vec![
        reservoir("H1", Some(("H2", 2.0))),
        reservoir("H2", Some(("H3", 1.0))),
        reservoir("H3", None),
        reservoir("H4", None),
    ]
}

#[fixture]
pub fn horizon() -> Horizon {
    Horizon::new(5).unwrap()
}

//! Constraints linking generation to turbined outflow.
use super::{Problem, VariableFamily, VariableKey, VariableMap};
use crate::horizon::Horizon;
use crate::plant::PlantMap;
use log::{debug, warn};

/// Add `generation[p, t] = productivity · outflow[p, t]` for every plant and period.
///
/// If either variable family is missing, no constraints are added.
///
/// # Returns
///
/// The number of constraints added.
pub fn add_generation_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    plants: &PlantMap,
    horizon: &Horizon,
) -> usize {
    for family in [VariableFamily::Generation, VariableFamily::Outflow] {
        if !variables.has_family(family) {
            warn!("Not adding generation constraints: no {family} variables");
            return 0;
        }
    }

    let mut count = 0;
    for plant in plants.values() {
        for period in horizon.iter() {
            let generation = VariableKey::new(VariableFamily::Generation, &plant.id, period);
            let outflow = VariableKey::new(VariableFamily::Outflow, &plant.id, period);
            let (Some(generation), Some(outflow)) =
                (variables.get(&generation), variables.get(&outflow))
            else {
                continue;
            };

            // We are enforcing that generation - productivity * outflow = 0
            problem.add_row(
                0.0..=0.0,
                [(generation, 1.0), (outflow, -plant.productivity.value())],
            );
            count += 1;
        }
    }

    debug!("Added {count} generation constraints");
    count
}

//! Integration tests which load the bundled demo model and build its scheduling problem
use hydrocascade::model::Model;
use hydrocascade::schedule::build_schedule;
use std::path::PathBuf;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("cascade")
}

#[test]
fn test_model_from_path() {
    let model = Model::from_path(get_model_dir()).unwrap();
    assert_eq!(model.plants.len(), 6);
    assert_eq!(model.horizon.len(), 24);
    assert!(model.inflows.is_some());
}

#[test]
fn test_build_schedule_for_demo() {
    let model = Model::from_path(get_model_dir()).unwrap();
    let schedule = build_schedule(&model).unwrap();

    let order = schedule
        .topology
        .topological_order()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(order, ["UP1", "UP2", "ISO", "MID", "ROR", "LOW"]);

    // One balance relation per reservoir per period
    assert!(schedule.water_balance.success);
    assert_eq!(schedule.water_balance.relations_added, 5 * 24);
    assert_eq!(schedule.generation_constraints, 6 * 24);

    // Storage and spill for reservoirs, outflow and generation for every plant
    assert_eq!(schedule.variables.num_variables(), 2 * 5 * 24 + 2 * 6 * 24);
}

//! Module for building and validating the drainage network of a hydro cascade.
//!
//! Each plant may flow into at most one downstream plant, so the network is a forest of in-trees.
//! The [`Topology`] records, for every plant, which plants feed it and after what delay, along
//! with the depth of each plant in its tree and an order in which plants can be processed such
//! that every plant comes after all of its upstream contributors.
use crate::plant::{HydroPlant, PlantID};
use crate::units::Hours;
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, warn};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use thiserror::Error;

/// A graph of plants, with an edge from each plant to the plant its outflow feeds
type CascadeGraph = DiGraph<PlantID, Hours>;

/// A hard failure found while validating a cascade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    /// The same plant ID appears more than once
    #[error("Duplicate plant ID: {0}")]
    DuplicatePlant(String),
    /// The drainage network contains a cycle, listed in flow order
    #[error("Cycle detected in hydro cascade: {}", format_cycle(.0))]
    Cycle(Vec<String>),
}

/// Format a cycle as `A -> B -> C -> A`
fn format_cycle(cycle: &[String]) -> String {
    cycle.iter().chain(cycle.first()).join(" -> ")
}

/// A plant which feeds another plant
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamLink {
    /// The upstream plant
    pub plant_id: PlantID,
    /// The time taken for water released upstream to arrive
    pub travel_time: Hours,
}

/// The validated drainage network for a set of plants
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    /// Plants feeding each plant, in input order. Only plants with contributors have an entry.
    upstream: IndexMap<PlantID, Vec<UpstreamLink>>,
    /// Resolved downstream plant for each plant
    downstream: HashMap<PlantID, PlantID>,
    /// Depth of each plant, in input order
    depths: IndexMap<PlantID, u32>,
    order: Vec<PlantID>,
    headwaters: Vec<PlantID>,
    terminals: Vec<PlantID>,
    warnings: Vec<String>,
}

impl Topology {
    /// The plants feeding the given plant, with their travel times.
    ///
    /// Returns an empty slice if the plant has no upstream contributors or is unknown.
    pub fn upstream(&self, plant_id: &PlantID) -> &[UpstreamLink] {
        self.upstream.get(plant_id).map_or(&[], Vec::as_slice)
    }

    /// The plant that the given plant flows into, if it exists in the cascade
    pub fn downstream(&self, plant_id: &PlantID) -> Option<&PlantID> {
        self.downstream.get(plant_id)
    }

    /// The depth of the given plant, or `None` if it is unknown
    pub fn depth(&self, plant_id: &PlantID) -> Option<u32> {
        self.depths.get(plant_id).copied()
    }

    /// Iterate over plants and their depths, in input order
    pub fn iter_depths(&self) -> impl Iterator<Item = (&PlantID, u32)> {
        self.depths.iter().map(|(id, depth)| (id, *depth))
    }

    /// All plants, ordered so that each comes after all of its upstream contributors.
    ///
    /// Plants are sorted by depth, with ties kept in input order.
    pub fn topological_order(&self) -> &[PlantID] {
        &self.order
    }

    /// Plants with no upstream contributors, in input order
    pub fn headwaters(&self) -> &[PlantID] {
        &self.headwaters
    }

    /// Plants whose outflow leaves the modelled system, in input order
    pub fn terminals(&self) -> &[PlantID] {
        &self.terminals
    }

    /// Whether the plant has no upstream contributors
    pub fn is_headwater(&self, plant_id: &PlantID) -> bool {
        self.depths.contains_key(plant_id) && !self.upstream.contains_key(plant_id)
    }

    /// Whether the plant has no resolvable downstream plant
    pub fn is_terminal(&self, plant_id: &PlantID) -> bool {
        self.depths.contains_key(plant_id) && !self.downstream.contains_key(plant_id)
    }

    /// Warnings raised while building the topology (e.g. unknown downstream references)
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The number of plants in the cascade
    pub fn num_plants(&self) -> usize {
        self.depths.len()
    }
}

/// Build and validate the cascade topology for the given plants.
///
/// References to unknown downstream plants are not errors: a warning is logged and the referencing
/// plant is treated as a terminal.
///
/// # Arguments
///
/// * `plants` - All the plants in the model
///
/// # Returns
///
/// The [`Topology`], or a [`CascadeError`] if plant IDs are duplicated or the network contains a
/// cycle (including a plant flowing into itself).
pub fn build_topology<'a, I>(plants: I) -> Result<Topology>
where
    I: IntoIterator<Item = &'a HydroPlant>,
{
    let plants = plants.into_iter().collect_vec();

    // Add a node for each plant. Node indices match the input order.
    let mut graph = CascadeGraph::new();
    let mut plant_to_node = HashMap::new();
    for plant in &plants {
        let node = graph.add_node(plant.id.clone());
        if plant_to_node.insert(plant.id.clone(), node).is_some() {
            Err(CascadeError::DuplicatePlant(plant.id.to_string()))?;
        }
    }

    // Add an edge for each resolvable downstream reference
    let mut upstream: IndexMap<PlantID, Vec<UpstreamLink>> = IndexMap::new();
    let mut downstream = HashMap::new();
    let mut warnings = Vec::new();
    for (source, plant) in plants.iter().enumerate() {
        let Some(link) = &plant.downstream else {
            continue;
        };

        let Some(&target) = plant_to_node.get(&link.plant_id) else {
            let msg = format!(
                "Unknown downstream reference: plant {} points to unknown plant {}",
                plant.id, link.plant_id
            );
            warn!("{msg}");
            warnings.push(msg);
            continue;
        };

        graph.add_edge(NodeIndex::new(source), target, link.travel_time);
        upstream
            .entry(link.plant_id.clone())
            .or_default()
            .push(UpstreamLink {
                plant_id: plant.id.clone(),
                travel_time: link.travel_time,
            });
        downstream.insert(plant.id.clone(), link.plant_id.clone());
    }

    // Sorting fails iff there is a cycle
    let sorted = toposort(&graph, None)
        .map_err(|cycle| CascadeError::Cycle(find_cycle(&graph, cycle.node_id())))?;

    // Upstream plants come first in `sorted`, so their depths are always known in time
    let mut depths = vec![0u32; graph.node_count()];
    for node in sorted {
        let depth = graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|upstream_node| depths[upstream_node.index()] + 1)
            .max()
            .unwrap_or(0);
        depths[node.index()] = depth;
    }

    let order = graph
        .node_indices()
        .sorted_by_key(|node| depths[node.index()])
        .map(|node| graph[node].clone())
        .collect_vec();
    let headwaters = plants
        .iter()
        .filter(|plant| !upstream.contains_key(&plant.id))
        .map(|plant| plant.id.clone())
        .collect_vec();
    let terminals = plants
        .iter()
        .filter(|plant| !downstream.contains_key(&plant.id))
        .map(|plant| plant.id.clone())
        .collect_vec();
    let depths: IndexMap<_, _> = plants
        .iter()
        .map(|plant| plant.id.clone())
        .zip(depths)
        .collect();

    debug!(
        "Built cascade topology: {} plants, {} headwaters, {} terminals, maximum depth {}",
        depths.len(),
        headwaters.len(),
        terminals.len(),
        depths.values().max().copied().unwrap_or(0)
    );

    Ok(Topology {
        upstream,
        downstream,
        depths,
        order,
        headwaters,
        terminals,
        warnings,
    })
}

/// Find the plants making up the cycle reachable from `start`.
///
/// Every plant has at most one downstream plant, so we just follow the flow until we arrive back
/// at a plant we have already seen. The cycle is rotated to begin with the plant listed first in
/// the input.
fn find_cycle(graph: &CascadeGraph, start: NodeIndex) -> Vec<String> {
    let mut path = IndexSet::new();
    let mut node = start;
    let cycle = loop {
        path.insert(node);
        let Some(next) = graph.neighbors_directed(node, Direction::Outgoing).next() else {
            // Flow leaves the system, so `start` was not on a cycle after all
            break vec![start];
        };
        if let Some(pos) = path.get_index_of(&next) {
            break path.iter().skip(pos).copied().collect_vec();
        }
        node = next;
    };

    let first = cycle
        .iter()
        .position_min_by_key(|node| node.index())
        .unwrap_or(0);
    cycle[first..]
        .iter()
        .chain(&cycle[..first])
        .map(|node| graph[*node].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{cascade_plants, reservoir, run_of_river};
    use map_macro::hash_map;
    use rstest::rstest;
    use std::collections::HashSet;

    fn ids(ids: &[&str]) -> Vec<PlantID> {
        ids.iter().map(|id| PlantID::new(id)).collect()
    }

    /// Check that every plant comes after all of its upstream contributors
    fn assert_order_respects_upstream(topology: &Topology) {
        let order = topology.topological_order();
        assert_eq!(order.len(), topology.num_plants());
        for (pos, plant_id) in order.iter().enumerate() {
            for link in topology.upstream(plant_id) {
                let upstream_pos = order.iter().position(|id| *id == link.plant_id).unwrap();
                assert!(
                    upstream_pos < pos,
                    "{} should come before {plant_id}",
                    link.plant_id
                );
            }
        }
    }

    /// Check that depth is zero for plants without contributors and one more than the deepest
    /// contributor otherwise
    fn assert_depth_law(topology: &Topology) {
        for (plant_id, depth) in topology.iter_depths() {
            let expected = topology
                .upstream(plant_id)
                .iter()
                .map(|link| topology.depth(&link.plant_id).unwrap() + 1)
                .max()
                .unwrap_or(0);
            assert_eq!(depth, expected, "Bad depth for {plant_id}");
        }
    }

    #[rstest]
    fn test_build_topology_chain_and_isolated(cascade_plants: Vec<HydroPlant>) {
        let topology = build_topology(&cascade_plants).unwrap();

        assert_eq!(topology.headwaters(), ids(&["H1", "H4"]));
        assert_eq!(topology.terminals(), ids(&["H3", "H4"]));
        let depths: HashMap<_, _> = topology
            .iter_depths()
            .map(|(id, depth)| (id.0.to_string(), depth))
            .collect();
        assert_eq!(
            depths,
            hash_map! {
                "H1".to_string() => 0,
                "H2".to_string() => 1,
                "H3".to_string() => 2,
                "H4".to_string() => 0,
            }
        );
        assert_eq!(topology.topological_order(), ids(&["H1", "H4", "H2", "H3"]));
        assert_eq!(
            topology.upstream(&"H2".into()),
            [UpstreamLink {
                plant_id: "H1".into(),
                travel_time: Hours(2.0)
            }]
        );
        assert_eq!(topology.downstream(&"H1".into()), Some(&"H2".into()));
        assert!(topology.is_headwater(&"H4".into()));
        assert!(topology.is_terminal(&"H4".into()));
        assert!(topology.warnings().is_empty());
        assert_order_respects_upstream(&topology);
        assert_depth_law(&topology);
    }

    #[test]
    fn test_build_topology_confluence() {
        let plants = [
            reservoir("A", Some(("C", 3.0))),
            run_of_river("B", Some(("C", 1.5))),
            reservoir("X", Some(("A", 1.0))),
            reservoir("C", None),
        ];
        let topology = build_topology(&plants).unwrap();

        let depth = |id: &str| topology.depth(&id.into()).unwrap();
        assert_eq!(depth("C"), depth("A").max(depth("B")) + 1);
        assert_eq!(depth("C"), 2);

        let upstream: HashSet<_> = topology
            .upstream(&"C".into())
            .iter()
            .map(|link| (link.plant_id.clone(), link.travel_time.value().to_bits()))
            .collect();
        assert_eq!(
            upstream,
            HashSet::from([
                (PlantID::new("A"), 3.0f64.to_bits()),
                (PlantID::new("B"), 1.5f64.to_bits())
            ])
        );
        assert_order_respects_upstream(&topology);
        assert_depth_law(&topology);
    }

    #[test]
    fn test_build_topology_input_order_independent() {
        // Downstream plants listed before the plants feeding them
        let plants = [
            reservoir("D", None),
            reservoir("C", Some(("D", 1.0))),
            reservoir("B", Some(("C", 1.0))),
            reservoir("A", Some(("B", 1.0))),
        ];
        let topology = build_topology(&plants).unwrap();

        assert_eq!(topology.topological_order(), ids(&["A", "B", "C", "D"]));
        assert_eq!(topology.depth(&"D".into()), Some(3));
        assert_order_respects_upstream(&topology);
        assert_depth_law(&topology);
    }

    #[test]
    fn test_build_topology_unknown_downstream() {
        let plants = [reservoir("H1", Some(("NOPE", 2.0))), reservoir("H2", None)];
        let topology = build_topology(&plants).unwrap();

        assert_eq!(topology.terminals(), ids(&["H1", "H2"]));
        assert_eq!(topology.downstream(&"H1".into()), None);
        assert_eq!(
            topology.warnings(),
            ["Unknown downstream reference: plant H1 points to unknown plant NOPE"]
        );
    }

    #[test]
    fn test_build_topology_self_loop() {
        let plants = [reservoir("H1", Some(("H1", 0.0))), reservoir("H2", None)];
        let err = build_topology(&plants).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CascadeError>(),
            Some(&CascadeError::Cycle(vec!["H1".to_string()]))
        );
        assert_eq!(
            err.to_string(),
            "Cycle detected in hydro cascade: H1 -> H1"
        );
    }

    #[rstest]
    #[case(&[("H1", "H2"), ("H2", "H1")], "H1 -> H2 -> H1")]
    #[case(&[("H1", "H2"), ("H2", "H3"), ("H3", "H1")], "H1 -> H2 -> H3 -> H1")]
    #[case(&[("H3", "H1"), ("H1", "H2"), ("H2", "H3")], "H3 -> H1 -> H2 -> H3")]
    #[case(&[("H0", "H1"), ("H1", "H2"), ("H2", "H1")], "H1 -> H2 -> H1")]
    fn test_build_topology_cycle(#[case] edges: &[(&str, &str)], #[case] cycle: &str) {
        let plants = edges
            .iter()
            .map(|(id, downstream)| reservoir(id, Some((downstream, 1.0))))
            .collect_vec();
        let err = build_topology(&plants).unwrap_err();
        assert!(err.downcast_ref::<CascadeError>().is_some());
        assert_eq!(
            err.to_string(),
            format!("Cycle detected in hydro cascade: {cycle}")
        );
    }

    #[test]
    fn test_build_topology_cycle_through_run_of_river() {
        let plants = [
            reservoir("H1", Some(("R1", 1.0))),
            run_of_river("R1", Some(("H1", 1.0))),
            reservoir("H2", Some(("H1", 4.0))),
        ];
        let msg = build_topology(&plants).unwrap_err().to_string();
        assert!(msg.contains("H1") && msg.contains("R1"));
        assert!(!msg.contains("H2"));
    }

    #[test]
    fn test_build_topology_duplicate_id() {
        let plants = [reservoir("H1", None), reservoir("H1", None)];
        let err = build_topology(&plants).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CascadeError>(),
            Some(&CascadeError::DuplicatePlant("H1".to_string()))
        );
    }

    #[rstest]
    fn test_upstream_unknown_plant(cascade_plants: Vec<HydroPlant>) {
        let topology = build_topology(&cascade_plants).unwrap();
        assert!(topology.upstream(&"UNKNOWN".into()).is_empty());
        assert!(topology.upstream(&"H1".into()).is_empty());
        assert_eq!(topology.depth(&"UNKNOWN".into()), None);
        assert!(!topology.is_headwater(&"UNKNOWN".into()));
        assert!(!topology.is_terminal(&"UNKNOWN".into()));
    }

    #[rstest]
    fn test_build_topology_deterministic(cascade_plants: Vec<HydroPlant>) {
        assert_eq!(
            build_topology(&cascade_plants).unwrap(),
            build_topology(&cascade_plants).unwrap()
        );
    }

    #[test]
    fn test_build_topology_empty() {
        let topology = build_topology(std::iter::empty()).unwrap();
        assert_eq!(topology.num_plants(), 0);
        assert!(topology.topological_order().is_empty());
    }
}

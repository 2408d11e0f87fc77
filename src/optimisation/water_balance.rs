//! Water balance constraints linking storage, releases and inflows across the cascade.
//!
//! For every plant with a reservoir and every period `t`:
//!
//! ```text
//! storage[p, t] - storage[p, t-1] + c·outflow[p, t] + spill[p, t]
//!     - Σ c·outflow[u, t - delay(u)] = c·inflow[p, t]
//! ```
//!
//! where `c` converts a flow sustained over one period into a volume. In the first period the
//! previous storage is the plant's initial volume, which moves to the right-hand side. Upstream
//! releases which would have left before the first period are dropped.
use super::{Problem, VariableFamily, VariableKey, VariableMap};
use crate::cascade::{Topology, UpstreamLink};
use crate::horizon::{Horizon, PERIOD_LENGTH};
use crate::inflow::InflowMap;
use crate::plant::{PlantID, PlantMap};
use crate::units::Flow;
use log::{debug, info, warn};

/// Options controlling how water balance constraints are built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterBalanceOptions {
    /// Whether upstream releases are routed to downstream plants
    pub cascade: bool,
    /// Whether reservoirs may spill
    pub spill: bool,
    /// Objective cost of spilled water, used if spill variables have to be created
    pub spill_penalty: f64,
}

/// A linear equality relation between decision variables for one plant and period
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRelation {
    /// The plant being balanced
    pub plant_id: PlantID,
    /// The period being balanced
    pub period: u32,
    /// Variables and their coefficients
    pub terms: Vec<(VariableKey, f64)>,
    /// The constant the terms must sum to
    pub rhs: f64,
}

impl BalanceRelation {
    /// The coefficient for the given variable, if it appears in the relation
    pub fn coefficient(&self, key: &VariableKey) -> Option<f64> {
        self.terms
            .iter()
            .find(|(term_key, _)| term_key == key)
            .map(|(_, coeff)| *coeff)
    }

    /// Iterate over terms for plants other than the one being balanced
    pub fn iter_upstream_terms(&self) -> impl Iterator<Item = &(VariableKey, f64)> {
        self.terms
            .iter()
            .filter(|(key, _)| key.plant_id != self.plant_id)
    }
}

/// Keys for a block of constraints along with the row offset in the problem
#[derive(Debug, Clone, PartialEq)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Index of the first row of the block
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The number of rows in the block
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over keys along with their row index in the problem
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| (self.offset + i, key))
    }
}

/// Indicates the plant and period covered by each water balance row
pub type WaterBalanceKeys = KeysWithOffset<(PlantID, u32)>;

/// The outcome of adding water balance constraints to a problem
#[derive(Debug, Clone, PartialEq)]
pub struct WaterBalanceResult {
    /// Whether the constraints were added
    pub success: bool,
    /// The number of balance rows added
    pub relations_added: usize,
    /// The number of explicit storage bound rows added
    pub bounds_added: usize,
    /// Diagnostic messages for the caller
    pub messages: Vec<String>,
    /// The row for each balance relation
    pub keys: WaterBalanceKeys,
    /// The relations which were added, in row order
    pub relations: Vec<BalanceRelation>,
}

impl WaterBalanceResult {
    fn failure(offset: usize, mut messages: Vec<String>, message: String) -> Self {
        warn!("Could not add water balance constraints: {message}");
        messages.push(message);

        Self {
            success: false,
            relations_added: 0,
            bounds_added: 0,
            messages,
            keys: WaterBalanceKeys {
                offset,
                keys: Vec::new(),
            },
            relations: Vec::new(),
        }
    }
}

/// The volume moved by one unit of flow over one period
fn flow_coefficient() -> f64 {
    Flow(1.0).volume_over(PERIOD_LENGTH).value()
}

/// Build the balance relation for every plant with storage and every period.
///
/// Plants are visited in topological order, then by period.
///
/// # Arguments
///
/// * `plants` - The model's plants
/// * `topology` - The cascade topology for `plants`
/// * `horizon` - The periods being modelled
/// * `inflows` - Natural inflows, if any
/// * `options` - Whether to include upstream and spill terms
pub fn build_balance_relations(
    plants: &PlantMap,
    topology: &Topology,
    horizon: &Horizon,
    inflows: Option<&InflowMap>,
    options: &WaterBalanceOptions,
) -> Vec<BalanceRelation> {
    let coeff = flow_coefficient();
    let mut relations = Vec::new();

    for plant in topology
        .topological_order()
        .iter()
        .filter_map(|id| plants.get(id))
    {
        let Some(storage) = plant.storage() else {
            // Run-of-river plants only contribute through their outflow
            continue;
        };

        let upstream: &[UpstreamLink] = if options.cascade {
            topology.upstream(&plant.id)
        } else {
            &[]
        };

        for period in horizon.iter() {
            let inflow = inflows.map_or(Flow(0.0), |inflows| inflows.get(&plant.id, period));
            let mut rhs = inflow.volume_over(PERIOD_LENGTH);

            let own = |family, period| VariableKey::new(family, &plant.id, period);
            let mut terms = vec![(own(VariableFamily::Storage, period), 1.0)];
            match horizon.offset_back(period, 1) {
                Some(previous) => terms.push((own(VariableFamily::Storage, previous), -1.0)),
                None => rhs = rhs + storage.initial,
            }
            terms.push((own(VariableFamily::Outflow, period), coeff));
            if options.spill {
                terms.push((own(VariableFamily::Spill, period), 1.0));
            }

            for link in upstream {
                let delay = link.travel_time.round_to_periods();
                if let Some(source) = horizon.offset_back(period, delay) {
                    let key = VariableKey::new(VariableFamily::Outflow, &link.plant_id, source);
                    terms.push((key, -coeff));
                }
            }

            relations.push(BalanceRelation {
                plant_id: plant.id.clone(),
                period,
                terms,
                rhs: rhs.value(),
            });
        }
    }

    relations
}

/// Add water balance constraints to the problem.
///
/// Storage and outflow variables must already exist. If spill is enabled and spill variables have
/// not yet been added, they are created here. If storage limits were not applied as column bounds,
/// they are added as explicit rows after the balance rows.
///
/// On failure no rows are added to the problem. Spill variables may still have been created.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `plants` - The model's plants
/// * `topology` - The cascade topology for `plants`
/// * `horizon` - The periods being modelled
/// * `inflows` - Natural inflows, if any
/// * `options` - Options controlling which terms are included
pub fn add_water_balance_constraints(
    problem: &mut Problem,
    variables: &mut VariableMap,
    plants: &PlantMap,
    topology: &Topology,
    horizon: &Horizon,
    inflows: Option<&InflowMap>,
    options: &WaterBalanceOptions,
) -> WaterBalanceResult {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let mut messages = topology.warnings().to_vec();
    let needs_storage = plants.values().any(|plant| plant.has_storage());
    if needs_storage && !variables.has_family(VariableFamily::Storage) {
        return WaterBalanceResult::failure(
            offset,
            messages,
            format!("Missing variable family: {}", VariableFamily::Storage),
        );
    }
    if !plants.is_empty() && !variables.has_family(VariableFamily::Outflow) {
        return WaterBalanceResult::failure(
            offset,
            messages,
            format!("Missing variable family: {}", VariableFamily::Outflow),
        );
    }

    if options.spill && !variables.has_family(VariableFamily::Spill) {
        variables.add_spill_variables(problem, plants, horizon, options.spill_penalty);
        let msg = format!(
            "Created {} spill variables",
            variables.num_family_variables(VariableFamily::Spill)
        );
        info!("{msg}");
        messages.push(msg);
    }

    if !options.cascade {
        let msg = "Cascade routing disabled: upstream releases are not routed downstream";
        debug!("{msg}");
        messages.push(msg.to_string());
    }

    let relations = build_balance_relations(plants, topology, horizon, inflows, options);

    // Resolve every term before touching the problem so a failure leaves it unchanged
    let mut rows = Vec::with_capacity(relations.len());
    for relation in &relations {
        let mut terms = Vec::with_capacity(relation.terms.len());
        for (key, coeff) in &relation.terms {
            let Some(var) = variables.get(key) else {
                return WaterBalanceResult::failure(
                    offset,
                    messages,
                    format!(
                        "Missing {} variable for plant {} in period {}",
                        key.family, key.plant_id, key.period
                    ),
                );
            };
            terms.push((var, *coeff));
        }
        rows.push((relation.rhs, terms));
    }

    for (rhs, terms) in rows {
        problem.add_row(rhs..=rhs, terms);
    }
    let keys = WaterBalanceKeys {
        offset,
        keys: relations
            .iter()
            .map(|relation| (relation.plant_id.clone(), relation.period))
            .collect(),
    };

    let bounds_added = if variables.storage_bounds_on_columns() {
        0
    } else {
        add_storage_bound_constraints(problem, variables, plants, horizon)
    };

    debug!(
        "Added {} water balance constraints and {bounds_added} storage bound constraints",
        relations.len()
    );

    WaterBalanceResult {
        success: true,
        relations_added: relations.len(),
        bounds_added,
        messages,
        keys,
        relations,
    }
}

/// Add `min <= storage <= max` rows for every plant with storage.
///
/// Returns the number of rows added.
fn add_storage_bound_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    plants: &PlantMap,
    horizon: &Horizon,
) -> usize {
    let mut count = 0;
    for plant in plants.values() {
        let Some(limits) = plant.storage() else {
            continue;
        };

        for period in horizon.iter() {
            let key = VariableKey::new(VariableFamily::Storage, &plant.id, period);
            if let Some(var) = variables.get(&key) {
                problem.add_row(limits.min.value()..=limits.max.value(), [(var, 1.0)]);
                count += 1;
            }
        }
    }

    count
}

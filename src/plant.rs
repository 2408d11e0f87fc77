//! Hydro plants and their physical parameters.
use crate::id::define_id_type;
use crate::units::{Flow, Hours, PowerPerFlow, Volume};
use anyhow::{Result, bail, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::rc::Rc;

define_id_type! {PlantID}

/// A map of [`HydroPlant`]s, keyed by plant ID
pub type PlantMap = IndexMap<PlantID, Rc<HydroPlant>>;

/// The kind of hydro plant
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlantKind {
    /// A plant with a storage reservoir
    Reservoir,
    /// A reservoir plant which can also pump water back into storage
    PumpedStorage,
    /// A plant with no storage, which passes its inflow straight through
    RunOfRiver,
}

impl PlantKind {
    /// Whether plants of this kind have a reservoir
    pub fn has_storage(self) -> bool {
        !matches!(self, Self::RunOfRiver)
    }
}

/// The storage limits of a reservoir, in hm³
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageLimits {
    /// Minimum operating volume
    pub min: Volume,
    /// Maximum operating volume
    pub max: Volume,
    /// Volume at the start of the horizon
    pub initial: Volume,
}

impl StorageLimits {
    /// Create new [`StorageLimits`], checking that they are consistent
    pub fn new(min: Volume, max: Volume, initial: Volume) -> Result<Self> {
        ensure!(
            min.is_finite() && max.is_finite() && initial.is_finite(),
            "Storage limits must be finite"
        );
        ensure!(min >= Volume(0.0), "Minimum storage cannot be negative");
        ensure!(
            min <= max,
            "Minimum storage ({min}) cannot exceed maximum storage ({max})"
        );
        ensure!(
            min <= initial && initial <= max,
            "Initial storage ({initial}) must lie between {min} and {max}"
        );

        Ok(Self { min, max, initial })
    }
}

/// The plant that water flows into after leaving another plant
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamLink {
    /// The receiving plant
    pub plant_id: PlantID,
    /// How long released water takes to arrive
    pub travel_time: Hours,
}

/// A hydro plant
#[derive(Debug, Clone, PartialEq)]
pub struct HydroPlant {
    /// Unique identifier
    pub id: PlantID,
    /// The kind of plant
    pub kind: PlantKind,
    /// Where the plant's outflow goes, if anywhere inside the modelled system
    pub downstream: Option<DownstreamLink>,
    /// Reservoir limits, present iff the plant kind has storage
    storage: Option<StorageLimits>,
    /// Limits on outflow (called flow limits for run-of-river plants)
    pub outflow_limits: RangeInclusive<Flow>,
    /// Power generated per unit of outflow
    pub productivity: PowerPerFlow,
}

impl HydroPlant {
    /// Create a new [`HydroPlant`].
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier for the plant
    /// * `kind` - The kind of plant
    /// * `downstream_id` - The plant this one flows into, if any
    /// * `travel_time` - Travel time to the downstream plant. Must be given iff `downstream_id` is.
    /// * `storage` - Reservoir limits. Must be given iff `kind` has storage.
    /// * `outflow_limits` - Minimum and maximum outflow
    /// * `productivity` - Power generated per unit of outflow
    pub fn new(
        id: PlantID,
        kind: PlantKind,
        downstream_id: Option<PlantID>,
        travel_time: Option<Hours>,
        storage: Option<StorageLimits>,
        outflow_limits: RangeInclusive<Flow>,
        productivity: PowerPerFlow,
    ) -> Result<Self> {
        let downstream = match (downstream_id, travel_time) {
            (None, None) => None,
            (Some(plant_id), Some(travel_time)) => {
                ensure!(
                    travel_time.is_finite() && travel_time >= Hours(0.0),
                    "Travel time for plant {id} must be a finite, non-negative number"
                );
                Some(DownstreamLink {
                    plant_id,
                    travel_time,
                })
            }
            (Some(_), None) => {
                bail!("Plant {id} has a downstream plant but no travel time")
            }
            (None, Some(_)) => {
                bail!("Plant {id} has a travel time but no downstream plant")
            }
        };

        match (kind.has_storage(), storage.is_some()) {
            (true, false) => bail!("Plant {id} is a {kind} plant but has no storage limits"),
            (false, true) => bail!("Plant {id} is a {kind} plant and cannot have storage"),
            _ => {}
        }

        let (min, max) = (*outflow_limits.start(), *outflow_limits.end());
        ensure!(
            min.is_finite() && max.is_finite() && Flow(0.0) <= min && min <= max,
            "Outflow limits for plant {id} must be finite with 0 <= min <= max"
        );
        ensure!(
            productivity.is_finite() && productivity >= PowerPerFlow(0.0),
            "Productivity for plant {id} must be a finite, non-negative number"
        );

        Ok(Self {
            id,
            kind,
            downstream,
            storage,
            outflow_limits,
            productivity,
        })
    }

    /// The plant's reservoir limits, if it has storage
    pub fn storage(&self) -> Option<&StorageLimits> {
        self.storage.as_ref()
    }

    /// Whether the plant has a reservoir
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// The ID of the plant this one flows into, as given in the input
    pub fn downstream_id(&self) -> Option<&PlantID> {
        self.downstream.as_ref().map(|link| &link.plant_id)
    }
}

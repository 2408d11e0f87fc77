//! Hydraulic cascade modelling for daily hydrothermal scheduling.
//!
//! The crate infers the drainage topology of a fleet of hydro plants ([`cascade`]) and uses it to
//! add period-by-period water-balance constraints to an optimisation problem
//! ([`optimisation::water_balance`]).
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cascade;
pub mod cli;
pub mod horizon;
pub mod id;
pub mod inflow;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod plant;
pub mod schedule;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_hydrocascade_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir defined on this platform
        return PathBuf::default();
    };

    config_dir.push("hydrocascade");
    config_dir
}

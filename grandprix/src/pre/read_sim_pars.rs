use crate::core::competitor::CompetitorPars;
use crate::core::race::RacePars;
use crate::core::test_session::TestSessionPars;
use crate::pre::sim_constants::SimConstants;
use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs. `test_session` is only required if a
/// test session is simulated.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub entries: Vec<CompetitorPars>,
    #[serde(default)]
    pub test_session: Option<TestSessionPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// read_sim_constants reads the tuning constants of the simulation from a JSON file. Values that
/// are not contained in the file keep their defaults.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;

    let sim_constants: SimConstants = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;

    for warning in sim_constants.check_constants() {
        warn!("{}", warning);
    }

    Ok(sim_constants)
}

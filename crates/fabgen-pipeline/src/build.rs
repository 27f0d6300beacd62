//! Build stage: per-target structured-config construction and validation.
//!
//! Failures here are isolated per device. A unit that fails, even fatally
//! under strict mode, never cancels its in-flight siblings; the coordinator
//! collects every unit's result and the run fails at the end instead.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fabgen_types::{
    ConfigEngine, DeviceName, FabgenError, FabricFacts, Result, StructuredConfig,
    ValidationOutcome, VariableSet,
};

use crate::artifact;
use crate::pool::WorkerPool;
use crate::validate::log_outcome;

/// One target device's build result.
pub struct BuiltDevice {
    pub config: StructuredConfig,
    pub outcome: ValidationOutcome,
}

pub(crate) async fn run(
    pool: &WorkerPool,
    engine: &Arc<dyn ConfigEngine>,
    targets: &BTreeSet<DeviceName>,
    validated: &mut BTreeMap<DeviceName, VariableSet>,
    facts: &Arc<FabricFacts>,
    structured_dir: &Path,
    strict: bool,
) -> BTreeMap<DeviceName, Result<BuiltDevice>> {
    let mut units = Vec::with_capacity(targets.len());
    for device in targets {
        // Target membership was checked before the run started.
        let Some(vars) = validated.remove(device) else {
            continue;
        };
        let engine = Arc::clone(engine);
        let facts = Arc::clone(facts);
        let dir: PathBuf = structured_dir.to_path_buf();
        let unit_device = device.clone();
        units.push((device.clone(), move || {
            build_one(&*engine, &unit_device, vars, &facts, &dir, strict)
        }));
    }

    pool.run_units(units).await.into_iter().collect()
}

fn build_one(
    engine: &dyn ConfigEngine,
    device: &str,
    vars: VariableSet,
    facts: &FabricFacts,
    structured_dir: &Path,
    strict: bool,
) -> Result<BuiltDevice> {
    // Whatever the engine raised, only a plain message crosses the worker
    // boundary.
    let config = engine
        .build_structured_config(device, &vars, facts)
        .map_err(|err| FabgenError::Build {
            device: device.to_string(),
            message: err.to_string(),
        })?;

    // The structured config is diagnostic output: persist it before
    // validation so a failing device still leaves its artifact behind.
    let path = artifact::structured_config_path(structured_dir, device);
    artifact::write_yaml(&path, &config)?;
    tracing::debug!(device = %device, path = %path.display(), "wrote structured config");

    let outcome = engine.validate_structured_config(&config);
    log_outcome(device, &outcome);
    if strict && outcome.failed() {
        return Err(FabgenError::StructuredConfigValidation {
            device: device.to_string(),
            outcome,
        });
    }

    Ok(BuiltDevice { config, outcome })
}

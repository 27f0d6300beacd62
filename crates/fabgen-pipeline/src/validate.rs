//! Input validation stage: parallel fan-out over every fabric device.
//!
//! All devices in the fabric participate, whether or not they are build
//! targets, because fact derivation needs the whole fabric's inputs.

use std::collections::BTreeMap;
use std::sync::Arc;

use fabgen_types::{
    ConfigEngine, DeviceName, FabgenError, Result, ValidationOutcome, VariableSet,
};

use crate::pool::WorkerPool;

/// The validation stage's fan-in result: the variable sets re-keyed by device
/// (values unchanged) plus each device's outcome for the report.
pub struct ValidatedInputs {
    pub inputs: BTreeMap<DeviceName, VariableSet>,
    pub outcomes: BTreeMap<DeviceName, ValidationOutcome>,
}

pub(crate) async fn run(
    pool: &WorkerPool,
    engine: &Arc<dyn ConfigEngine>,
    fabric: BTreeMap<DeviceName, VariableSet>,
    strict: bool,
) -> Result<ValidatedInputs> {
    let mut units = Vec::with_capacity(fabric.len());
    for (device, vars) in fabric {
        let engine = Arc::clone(engine);
        let unit_device = device.clone();
        units.push((device, move || {
            let outcome = engine.validate_inputs(&vars);
            log_outcome(&unit_device, &outcome);
            if strict && outcome.failed() {
                return Err(FabgenError::InputValidation {
                    device: unit_device,
                    outcome,
                });
            }
            Ok((vars, outcome))
        }));
    }

    let mut inputs = BTreeMap::new();
    let mut outcomes = BTreeMap::new();
    let mut fatal: Option<FabgenError> = None;
    for (device, result) in pool.run_units(units).await {
        match result {
            Ok((vars, outcome)) => {
                inputs.insert(device.clone(), vars);
                outcomes.insert(device, outcome);
            }
            // First failure wins; the batch has already drained by the time
            // we see it, so siblings were not interrupted.
            Err(err) => {
                if fatal.is_none() {
                    fatal = Some(err);
                }
            }
        }
    }
    if let Some(err) = fatal {
        return Err(err);
    }
    Ok(ValidatedInputs { inputs, outcomes })
}

/// Stream a device's validation messages to the log as they are observed.
pub(crate) fn log_outcome(device: &str, outcome: &ValidationOutcome) {
    for error in &outcome.errors {
        tracing::error!(device = %device, "{error}");
    }
    for warning in &outcome.warnings {
        tracing::warn!(device = %device, "{warning}");
    }
}

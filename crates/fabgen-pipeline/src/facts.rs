//! Fact stage: the pipeline's global barrier.
//!
//! One indivisible reduction over the full validated fabric. Intentionally
//! not fanned out: it runs as a single blocking unit with no overlapping
//! device-level work, and nothing downstream starts until it returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use fabgen_types::{ConfigEngine, DeviceName, FabgenError, FabricFacts, Result, VariableSet};

/// Derive fabric-wide facts from the complete validated input set.
///
/// Any failure here is fatal regardless of strict mode; facts are a hard
/// prerequisite for every device's build step.
pub(crate) async fn run(
    engine: &Arc<dyn ConfigEngine>,
    validated: BTreeMap<DeviceName, VariableSet>,
) -> Result<(BTreeMap<DeviceName, VariableSet>, Arc<FabricFacts>)> {
    let engine = Arc::clone(engine);
    let (validated, facts) = tokio::task::spawn_blocking(move || {
        let facts = engine.derive_facts(&validated)?;
        Ok::<_, FabgenError>((validated, facts))
    })
    .await
    .map_err(|e| FabgenError::Facts(e.to_string()))??;

    Ok((validated, Arc::new(facts)))
}

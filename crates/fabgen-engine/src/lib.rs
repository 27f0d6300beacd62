//! Reference configuration engine for a two-tier leaf/spine fabric.
//!
//! Implements the [`ConfigEngine`] contract with deterministic semantics:
//! loopback addressing and BGP ASNs derived from each device's `id`, full-mesh
//! peering between tiers, and EOS-style text rendering. The pipeline treats
//! all of this as opaque; nothing here knows about workers, stages, or
//! artifact paths.

use std::collections::BTreeMap;

use fabgen_types::{
    ConfigEngine, DeviceName, FabricFacts, Result, StructuredConfig, ValidationOutcome,
    VariableSet,
};

mod facts;
mod inputs;
mod render;
mod structured;

/// The built-in leaf/spine engine. Stateless; one instance serves all workers.
#[derive(Debug, Default)]
pub struct ReferenceEngine;

impl ConfigEngine for ReferenceEngine {
    fn validate_inputs(&self, vars: &VariableSet) -> ValidationOutcome {
        inputs::validate_inputs(vars)
    }

    fn derive_facts(&self, inputs: &BTreeMap<DeviceName, VariableSet>) -> Result<FabricFacts> {
        facts::derive_facts(inputs)
    }

    fn build_structured_config(
        &self,
        device: &str,
        vars: &VariableSet,
        facts: &FabricFacts,
    ) -> Result<StructuredConfig> {
        structured::build_structured_config(device, vars, facts)
    }

    fn validate_structured_config(&self, config: &StructuredConfig) -> ValidationOutcome {
        structured::validate_structured_config(config)
    }

    fn render_config(&self, config: &StructuredConfig) -> Result<String> {
        render::render_config(config)
    }
}

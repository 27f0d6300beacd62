//! Shared types, errors, and the engine contract for the fabgen build pipeline.
//!
//! This crate provides the foundational types used across all other fabgen crates:
//! - `FabgenError` — unified error taxonomy
//! - `ValidationOutcome` — result of validating one device's data
//! - `BuildReport` — terminal summary of a pipeline run
//! - `ConfigEngine` — the contract the pipeline consumes for validation,
//!   fact derivation, structured-config construction, and rendering

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unique device identifier; the join key for every per-device map.
pub type DeviceName = String;

/// Opaque per-device input variables (semi-structured YAML mapping).
pub type VariableSet = serde_yaml::Value;

/// Opaque fabric-wide derived facts. Produced exactly once per run and
/// treated as read-only by everything downstream.
pub type FabricFacts = serde_yaml::Value;

/// Opaque per-device configuration model, prior to textual rendering.
pub type StructuredConfig = serde_yaml::Value;

/// Unified error type for all fabgen subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FabgenError {
    // === Selector errors (fatal before any stage starts) ===
    #[error("no devices matched pattern '{pattern}'")]
    SelectorEmpty { pattern: String },

    #[error("pattern '{pattern}' matched no devices in group '{group}'")]
    SelectorDisjoint { pattern: String, group: String },

    #[error("invalid limit pattern '{pattern}': {message}")]
    SelectorInvalid { pattern: String, message: String },

    // === Validation errors ===
    #[error("{device}: input validation failed")]
    InputValidation {
        device: DeviceName,
        outcome: ValidationOutcome,
    },

    #[error("{device}: structured config validation failed")]
    StructuredConfigValidation {
        device: DeviceName,
        outcome: ValidationOutcome,
    },

    // === Per-device unit errors ===
    // Normalized to plain messages before they cross the worker boundary.
    #[error("{device}: structured config build failed: {message}")]
    Build {
        device: DeviceName,
        message: String,
    },

    #[error("{device}: config rendering failed: {message}")]
    Render {
        device: DeviceName,
        message: String,
    },

    #[error("{device}: worker terminated abnormally: {message}")]
    Worker {
        device: DeviceName,
        message: String,
    },

    // === Fabric-wide errors (always fatal) ===
    #[error("fact derivation failed: {0}")]
    Facts(String),

    #[error("target device '{device}' is not part of the fabric")]
    UnknownTarget { device: DeviceName },

    #[error("inventory error: {0}")]
    Inventory(String),

    // === Generic ===
    /// Engine-internal failure with no device context yet; the pipeline
    /// normalizes it into `Build`/`Render` at the unit boundary.
    #[error("{0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FabgenError {
    /// The device this error is attributed to, when it is a per-device error.
    pub fn device(&self) -> Option<&str> {
        match self {
            FabgenError::InputValidation { device, .. }
            | FabgenError::StructuredConfigValidation { device, .. }
            | FabgenError::Build { device, .. }
            | FabgenError::Render { device, .. }
            | FabgenError::Worker { device, .. }
            | FabgenError::UnknownTarget { device } => Some(device),
            _ => None,
        }
    }

    /// Flatten this error into a failed [`ValidationOutcome`] for the report.
    ///
    /// Validation variants keep their original message lists; everything else
    /// collapses to a single-message outcome.
    pub fn into_outcome(self) -> ValidationOutcome {
        match self {
            FabgenError::InputValidation { outcome, .. }
            | FabgenError::StructuredConfigValidation { outcome, .. } => outcome,
            other => ValidationOutcome::fail(vec![other.to_string()]),
        }
    }
}

/// A convenience alias for `Result<T, FabgenError>`.
pub type Result<T> = std::result::Result<T, FabgenError>;

// ---------------------------------------------------------------------------
// ValidationOutcome — result of validating one device's data
// ---------------------------------------------------------------------------

/// Ordered error and warning messages from one validation pass.
///
/// Produced by both input validation and structured-config validation.
/// Immutable once produced; the pipeline only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome with no messages.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A failed outcome carrying the given error messages.
    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
        }
    }

    /// Append an error message.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Append a deprecation/advisory warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns `true` if any error was recorded. Warnings never fail a device.
    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BuildReport — terminal summary of a pipeline run
// ---------------------------------------------------------------------------

/// Elapsed wall time per pipeline stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub validate: Duration,
    pub facts: Duration,
    pub build: Duration,
    pub render: Duration,
}

/// The terminal result of a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Number of target devices the build/render stages attempted.
    pub processed: usize,
    /// Per-device outcomes that carried errors or warnings, from any stage.
    pub errors: BTreeMap<DeviceName, ValidationOutcome>,
    /// Devices that failed in at least one stage.
    pub failed: BTreeSet<DeviceName>,
    pub timings: StageTimings,
}

impl BuildReport {
    /// Merge an outcome's messages into the device's entry without marking
    /// the device failed. Used for outcomes tolerated in non-strict mode.
    pub fn record_outcome(&mut self, device: &str, outcome: ValidationOutcome) {
        let entry = self.errors.entry(device.to_string()).or_default();
        entry.errors.extend(outcome.errors);
        entry.warnings.extend(outcome.warnings);
    }

    /// Record a failed outcome for `device` and mark it failed.
    ///
    /// If the device already carries an outcome the messages are merged, so a
    /// device failing in two stages keeps both sets of messages.
    pub fn record_failure(&mut self, device: &str, outcome: ValidationOutcome) {
        self.record_outcome(device, outcome);
        self.failed.insert(device.to_string());
    }

    /// Returns `true` if every device came through clean.
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ConfigEngine — the contract the pipeline consumes
// ---------------------------------------------------------------------------

/// The validation/derivation/rendering functions the pipeline orchestrates.
///
/// Every method is synchronous and CPU-bound; the pipeline dispatches them to
/// blocking worker threads. Implementations must be shareable across workers
/// (`Send + Sync`) and must not retain mutable state between calls.
pub trait ConfigEngine: Send + Sync {
    /// Validate one device's input variables.
    fn validate_inputs(&self, vars: &VariableSet) -> ValidationOutcome;

    /// Derive fabric-wide facts from the full set of validated inputs.
    ///
    /// Called exactly once per run, with every device's variables present.
    fn derive_facts(&self, inputs: &BTreeMap<DeviceName, VariableSet>) -> Result<FabricFacts>;

    /// Build one device's structured configuration from its variables and the
    /// shared fabric facts.
    fn build_structured_config(
        &self,
        device: &str,
        vars: &VariableSet,
        facts: &FabricFacts,
    ) -> Result<StructuredConfig>;

    /// Validate one device's structured configuration.
    fn validate_structured_config(&self, config: &StructuredConfig) -> ValidationOutcome;

    /// Render one device's structured configuration to its final text form.
    fn render_config(&self, config: &StructuredConfig) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_selector_empty() {
        let err = FabgenError::SelectorEmpty {
            pattern: "edge*".into(),
        };
        assert_eq!(err.to_string(), "no devices matched pattern 'edge*'");
    }

    #[test]
    fn error_display_selector_disjoint() {
        let err = FabgenError::SelectorDisjoint {
            pattern: "dc2-*".into(),
            group: "DC1_FABRIC".into(),
        };
        assert_eq!(
            err.to_string(),
            "pattern 'dc2-*' matched no devices in group 'DC1_FABRIC'"
        );
    }

    #[test]
    fn error_display_input_validation() {
        let err = FabgenError::InputValidation {
            device: "leaf1".into(),
            outcome: ValidationOutcome::fail(vec!["missing 'id'".into()]),
        };
        assert_eq!(err.to_string(), "leaf1: input validation failed");
    }

    #[test]
    fn error_display_build() {
        let err = FabgenError::Build {
            device: "spine2".into(),
            message: "duplicate uplink".into(),
        };
        assert_eq!(
            err.to_string(),
            "spine2: structured config build failed: duplicate uplink"
        );
    }

    #[test]
    fn error_display_facts() {
        let err = FabgenError::Facts("duplicate id 3".into());
        assert_eq!(err.to_string(), "fact derivation failed: duplicate id 3");
    }

    #[test]
    fn error_display_unknown_target() {
        let err = FabgenError::UnknownTarget {
            device: "leaf9".into(),
        };
        assert_eq!(
            err.to_string(),
            "target device 'leaf9' is not part of the fabric"
        );
    }

    #[test]
    fn error_device_attribution() {
        let err = FabgenError::Render {
            device: "leaf1".into(),
            message: "boom".into(),
        };
        assert_eq!(err.device(), Some("leaf1"));

        let err = FabgenError::Facts("bad".into());
        assert_eq!(err.device(), None);
    }

    #[test]
    fn error_into_outcome_preserves_validation_messages() {
        let outcome = ValidationOutcome::fail(vec!["a".into(), "b".into()]);
        let err = FabgenError::InputValidation {
            device: "leaf1".into(),
            outcome: outcome.clone(),
        };
        assert_eq!(err.into_outcome(), outcome);
    }

    #[test]
    fn error_into_outcome_flattens_other_errors() {
        let err = FabgenError::Build {
            device: "leaf1".into(),
            message: "boom".into(),
        };
        let outcome = err.into_outcome();
        assert!(outcome.failed());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("boom"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FabgenError = io_err.into();
        assert!(matches!(err, FabgenError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    // --- ValidationOutcome ---

    #[test]
    fn outcome_ok_passes() {
        let outcome = ValidationOutcome::ok();
        assert!(!outcome.failed());
        assert!(outcome.errors.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn outcome_warnings_do_not_fail() {
        let mut outcome = ValidationOutcome::ok();
        outcome.warn("'bgp_as' is deprecated");
        assert!(!outcome.failed());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn outcome_errors_fail() {
        let mut outcome = ValidationOutcome::ok();
        outcome.error("missing 'type'");
        assert!(outcome.failed());
    }

    #[test]
    fn outcome_serializes() {
        let outcome = ValidationOutcome {
            errors: vec!["e1".into()],
            warnings: vec!["w1".into()],
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("e1"));
        assert!(json.contains("w1"));
    }

    // --- BuildReport ---

    #[test]
    fn report_records_failures() {
        let mut report = BuildReport::default();
        assert!(report.success());

        report.record_failure("leaf1", ValidationOutcome::fail(vec!["bad".into()]));
        assert!(!report.success());
        assert!(report.failed.contains("leaf1"));
        assert_eq!(report.errors["leaf1"].errors, vec!["bad".to_string()]);
    }

    #[test]
    fn report_merges_outcomes_across_stages() {
        let mut report = BuildReport::default();
        report.record_failure("leaf1", ValidationOutcome::fail(vec!["input bad".into()]));
        report.record_failure("leaf1", ValidationOutcome::fail(vec!["config bad".into()]));

        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.errors["leaf1"].errors,
            vec!["input bad".to_string(), "config bad".to_string()]
        );
    }

    #[test]
    fn report_recorded_outcomes_do_not_mark_failed() {
        let mut report = BuildReport::default();
        let mut outcome = ValidationOutcome::ok();
        outcome.error("tolerated in non-strict mode");
        outcome.warn("deprecated key");
        report.record_outcome("leaf1", outcome);

        assert!(report.success());
        assert_eq!(report.errors["leaf1"].errors.len(), 1);
        assert_eq!(report.errors["leaf1"].warnings.len(), 1);
    }
}

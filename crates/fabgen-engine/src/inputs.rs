//! Input variable validation rules.

use fabgen_types::{ValidationOutcome, VariableSet};

pub(crate) const DEVICE_TYPES: &[&str] = &["spine", "leaf"];

/// Device ids double as the last octet of the loopback address.
pub(crate) const MAX_DEVICE_ID: u64 = 250;

/// Validate one device's input variables.
pub(crate) fn validate_inputs(vars: &VariableSet) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();

    if vars.as_mapping().is_none() {
        outcome.error("device variables are not a mapping");
        return outcome;
    }

    match vars.get("type").and_then(|v| v.as_str()) {
        None => outcome.error("missing required key 'type'"),
        Some(t) if !DEVICE_TYPES.contains(&t) => {
            outcome.error(format!("unsupported device type '{t}'"));
        }
        Some(_) => {}
    }

    if vars.get("id").is_none() {
        outcome.error("missing required key 'id'");
    } else if device_id(vars).is_none() {
        outcome.error(format!(
            "'id' must be an integer between 1 and {MAX_DEVICE_ID}"
        ));
    }

    if vars.get("bgp_as").is_some() {
        outcome.warn("'bgp_as' is deprecated, use 'bgp_asn'");
    }
    if let Some(asn) = vars.get("bgp_asn") {
        if asn.as_u64().is_none() {
            outcome.error("'bgp_asn' must be an unsigned integer");
        }
    }

    outcome
}

/// The device's id, if present and within the addressable range.
pub(crate) fn device_id(vars: &VariableSet) -> Option<u64> {
    vars.get("id")
        .and_then(|v| v.as_u64())
        .filter(|id| (1..=MAX_DEVICE_ID).contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(yaml: &str) -> VariableSet {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn valid_spine_passes() {
        let outcome = validate_inputs(&vars("{type: spine, id: 1}"));
        assert!(!outcome.failed());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn missing_type_fails() {
        let outcome = validate_inputs(&vars("{id: 1}"));
        assert!(outcome.failed());
        assert!(outcome.errors[0].contains("'type'"));
    }

    #[test]
    fn unsupported_type_fails() {
        let outcome = validate_inputs(&vars("{type: firewall, id: 1}"));
        assert!(outcome.failed());
        assert!(outcome.errors[0].contains("firewall"));
    }

    #[test]
    fn missing_id_fails() {
        let outcome = validate_inputs(&vars("{type: leaf}"));
        assert!(outcome.failed());
    }

    #[test]
    fn out_of_range_id_fails() {
        let outcome = validate_inputs(&vars("{type: leaf, id: 400}"));
        assert!(outcome.failed());
        assert!(outcome.errors[0].contains("between 1 and"));
    }

    #[test]
    fn non_mapping_vars_fail() {
        let outcome = validate_inputs(&vars("just a string"));
        assert!(outcome.failed());
    }

    #[test]
    fn deprecated_bgp_as_warns_but_passes() {
        let outcome = validate_inputs(&vars("{type: leaf, id: 2, bgp_as: 65100}"));
        assert!(!outcome.failed());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("deprecated"));
    }

    #[test]
    fn non_integer_bgp_asn_fails() {
        let outcome = validate_inputs(&vars("{type: leaf, id: 2, bgp_asn: sixtyfive}"));
        assert!(outcome.failed());
    }
}

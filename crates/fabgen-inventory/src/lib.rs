//! Inventory loading and host selection.
//!
//! The inventory is a YAML file mapping group names to group-level variables
//! and per-device variables. The pipeline consumes its output as an opaque
//! `device -> VariableSet` mapping; everything about how those variables are
//! assembled (group merging, excluded control-plane entries) lives here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use fabgen_types::{DeviceName, FabgenError, Result, VariableSet};

mod selector;

pub use selector::select_hosts;

/// Inventory entries that represent control-plane services rather than
/// managed devices. They never participate in validation or fact derivation.
pub const CONTROL_PLANE_ENTRIES: &[&str] = &["cvp"];

/// One inventory group: shared variables plus its member devices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub vars: Option<VariableSet>,
    #[serde(default)]
    pub devices: BTreeMap<DeviceName, VariableSet>,
}

/// A parsed inventory file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    pub groups: BTreeMap<String, Group>,
}

impl Inventory {
    /// Load and parse an inventory YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let inventory: Inventory = serde_yaml::from_str(&raw)?;
        if inventory.groups.is_empty() {
            return Err(FabgenError::Inventory(format!(
                "{} contains no groups",
                path.display()
            )));
        }
        Ok(inventory)
    }

    /// The variable sets for every device in `group`, with group vars merged
    /// under each device's own vars (device keys win).
    ///
    /// Control-plane entries are excluded here, so the returned map is exactly
    /// the device set the fact stage operates on.
    pub fn fabric_vars(&self, group: &str) -> Result<BTreeMap<DeviceName, VariableSet>> {
        let group_entry = self.groups.get(group).ok_or_else(|| {
            FabgenError::Inventory(format!("group '{group}' not found in inventory"))
        })?;

        let mut fabric = BTreeMap::new();
        for (name, vars) in &group_entry.devices {
            if CONTROL_PLANE_ENTRIES.contains(&name.as_str()) {
                tracing::debug!(device = %name, "skipping control-plane inventory entry");
                continue;
            }
            fabric.insert(name.clone(), merge_vars(group_entry.vars.as_ref(), vars));
        }
        Ok(fabric)
    }

    /// Every device name across all groups, control-plane entries excluded.
    pub fn all_device_names(&self) -> BTreeSet<DeviceName> {
        self.groups
            .values()
            .flat_map(|g| g.devices.keys())
            .filter(|name| !CONTROL_PLANE_ENTRIES.contains(&name.as_str()))
            .cloned()
            .collect()
    }
}

/// Shallow-merge group vars under device vars. Device keys override group
/// keys; non-mapping values pass through unchanged.
fn merge_vars(group: Option<&VariableSet>, device: &VariableSet) -> VariableSet {
    let Some(serde_yaml::Value::Mapping(group_map)) = group else {
        return device.clone();
    };
    let serde_yaml::Value::Mapping(device_map) = device else {
        return device.clone();
    };

    let mut merged = group_map.clone();
    for (key, value) in device_map {
        merged.insert(key.clone(), value.clone());
    }
    serde_yaml::Value::Mapping(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INVENTORY: &str = r#"
groups:
  FABRIC:
    vars:
      mgmt_gateway: 10.0.0.1
      platform: vEOS
    devices:
      spine1: { type: spine, id: 1 }
      leaf1: { type: leaf, id: 11, platform: cEOS }
      cvp: { role: controller }
  EDGE:
    devices:
      edge1: { type: leaf, id: 21 }
"#;

    fn write_inventory(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_parses_groups() {
        let file = write_inventory(INVENTORY);
        let inventory = Inventory::load(file.path()).unwrap();
        assert_eq!(inventory.groups.len(), 2);
        assert!(inventory.groups.contains_key("FABRIC"));
    }

    #[test]
    fn load_rejects_empty_inventory() {
        let file = write_inventory("groups: {}\n");
        let err = Inventory::load(file.path()).unwrap_err();
        assert!(matches!(err, FabgenError::Inventory(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Inventory::load(Path::new("/nonexistent/hosts.yml")).unwrap_err();
        assert!(matches!(err, FabgenError::Io(_)));
    }

    #[test]
    fn fabric_vars_excludes_control_plane_entry() {
        let file = write_inventory(INVENTORY);
        let inventory = Inventory::load(file.path()).unwrap();
        let fabric = inventory.fabric_vars("FABRIC").unwrap();

        assert_eq!(
            fabric.keys().collect::<Vec<_>>(),
            vec!["leaf1", "spine1"]
        );
        assert!(!fabric.contains_key("cvp"));
    }

    #[test]
    fn fabric_vars_merges_group_vars_under_device_vars() {
        let file = write_inventory(INVENTORY);
        let inventory = Inventory::load(file.path()).unwrap();
        let fabric = inventory.fabric_vars("FABRIC").unwrap();

        // Group var inherited
        assert_eq!(
            fabric["spine1"].get("mgmt_gateway").unwrap().as_str(),
            Some("10.0.0.1")
        );
        // Device key wins over group key
        assert_eq!(
            fabric["leaf1"].get("platform").unwrap().as_str(),
            Some("cEOS")
        );
        assert_eq!(
            fabric["spine1"].get("platform").unwrap().as_str(),
            Some("vEOS")
        );
    }

    #[test]
    fn fabric_vars_unknown_group_errors() {
        let file = write_inventory(INVENTORY);
        let inventory = Inventory::load(file.path()).unwrap();
        let err = inventory.fabric_vars("DC9").unwrap_err();
        assert!(err.to_string().contains("DC9"));
    }

    #[test]
    fn all_device_names_spans_groups() {
        let file = write_inventory(INVENTORY);
        let inventory = Inventory::load(file.path()).unwrap();
        let names = inventory.all_device_names();

        assert!(names.contains("spine1"));
        assert!(names.contains("edge1"));
        assert!(!names.contains("cvp"));
    }
}

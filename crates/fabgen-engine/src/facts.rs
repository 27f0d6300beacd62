//! Fabric-wide fact derivation.
//!
//! Facts are a pure function of the full set of input variables: per-device
//! loopback addresses and ASNs plus the tier membership lists every device's
//! build step needs for peering. Devices without a usable `type` and `id` get
//! no derived entry (their build step fails per-device later); a duplicate id
//! is a fabric-wide inconsistency and fails the whole derivation.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use fabgen_types::{DeviceName, FabgenError, FabricFacts, Result, VariableSet};

use crate::inputs::device_id;

pub(crate) const LOOPBACK_PREFIX: &str = "10.255.0";
pub(crate) const BASE_ASN: u64 = 65000;

pub(crate) fn derive_facts(inputs: &BTreeMap<DeviceName, VariableSet>) -> Result<FabricFacts> {
    let mut ids: BTreeMap<DeviceName, u64> = BTreeMap::new();
    let mut seen: BTreeMap<u64, DeviceName> = BTreeMap::new();
    let mut spines: Vec<DeviceName> = Vec::new();
    let mut leaves: Vec<DeviceName> = Vec::new();

    for (name, vars) in inputs {
        let tier = vars.get("type").and_then(|v| v.as_str());
        let Some(id) = device_id(vars) else {
            tracing::debug!(device = %name, "no usable id, excluded from derived facts");
            continue;
        };
        if let Some(prev) = seen.insert(id, name.clone()) {
            return Err(FabgenError::Facts(format!(
                "duplicate device id {id} on '{prev}' and '{name}'"
            )));
        }
        match tier {
            Some("spine") => spines.push(name.clone()),
            Some("leaf") => leaves.push(name.clone()),
            _ => {
                tracing::debug!(device = %name, "no usable type, excluded from derived facts");
                continue;
            }
        }
        ids.insert(name.clone(), id);
    }

    let mut devices = Mapping::new();
    for (name, id) in &ids {
        let peers = if spines.contains(name) {
            &leaves
        } else {
            &spines
        };
        let asn = inputs[name]
            .get("bgp_asn")
            .and_then(|v| v.as_u64())
            .unwrap_or(BASE_ASN + id);

        let mut entry = Mapping::new();
        entry.insert(
            Value::from("loopback_ip"),
            Value::from(format!("{LOOPBACK_PREFIX}.{id}/32")),
        );
        entry.insert(Value::from("bgp_asn"), Value::from(asn));
        entry.insert(
            Value::from("peers"),
            Value::Sequence(peers.iter().map(|p| Value::from(p.as_str())).collect()),
        );
        devices.insert(Value::from(name.as_str()), Value::Mapping(entry));
    }

    let mut fabric = Mapping::new();
    fabric.insert(
        Value::from("spines"),
        Value::Sequence(spines.iter().map(|s| Value::from(s.as_str())).collect()),
    );
    fabric.insert(
        Value::from("leaves"),
        Value::Sequence(leaves.iter().map(|l| Value::from(l.as_str())).collect()),
    );

    let mut facts = Mapping::new();
    facts.insert(Value::from("fabric"), Value::Mapping(fabric));
    facts.insert(Value::from("devices"), Value::Mapping(devices));
    Ok(Value::Mapping(facts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fabric(pairs: &[(&str, &str)]) -> BTreeMap<DeviceName, VariableSet> {
        pairs
            .iter()
            .map(|(name, yaml)| (name.to_string(), serde_yaml::from_str(yaml).unwrap()))
            .collect()
    }

    #[test]
    fn derives_loopback_and_asn_from_id() {
        let facts = derive_facts(&fabric(&[
            ("spine1", "{type: spine, id: 1}"),
            ("leaf1", "{type: leaf, id: 11}"),
        ]))
        .unwrap();

        let leaf1 = facts.get("devices").unwrap().get("leaf1").unwrap();
        assert_eq!(
            leaf1.get("loopback_ip").unwrap().as_str(),
            Some("10.255.0.11/32")
        );
        assert_eq!(leaf1.get("bgp_asn").unwrap().as_u64(), Some(65011));
    }

    #[test]
    fn bgp_asn_override_wins() {
        let facts = derive_facts(&fabric(&[("leaf1", "{type: leaf, id: 11, bgp_asn: 64512}")]))
            .unwrap();
        let leaf1 = facts.get("devices").unwrap().get("leaf1").unwrap();
        assert_eq!(leaf1.get("bgp_asn").unwrap().as_u64(), Some(64512));
    }

    #[test]
    fn leaves_peer_with_all_spines() {
        let facts = derive_facts(&fabric(&[
            ("spine1", "{type: spine, id: 1}"),
            ("spine2", "{type: spine, id: 2}"),
            ("leaf1", "{type: leaf, id: 11}"),
        ]))
        .unwrap();

        let peers = facts
            .get("devices")
            .unwrap()
            .get("leaf1")
            .unwrap()
            .get("peers")
            .unwrap()
            .as_sequence()
            .unwrap();
        let names: Vec<&str> = peers.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(names, vec!["spine1", "spine2"]);

        let spine_peers = facts
            .get("devices")
            .unwrap()
            .get("spine1")
            .unwrap()
            .get("peers")
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(spine_peers.len(), 1);
    }

    #[test]
    fn duplicate_id_is_fatal() {
        let err = derive_facts(&fabric(&[
            ("leaf1", "{type: leaf, id: 7}"),
            ("leaf2", "{type: leaf, id: 7}"),
        ]))
        .unwrap_err();
        assert!(matches!(err, FabgenError::Facts(_)));
        assert!(err.to_string().contains("duplicate device id 7"));
    }

    #[test]
    fn device_without_id_gets_no_entry() {
        let facts = derive_facts(&fabric(&[
            ("spine1", "{type: spine, id: 1}"),
            ("broken", "{type: leaf}"),
        ]))
        .unwrap();
        assert!(facts.get("devices").unwrap().get("broken").is_none());
        assert!(facts.get("devices").unwrap().get("spine1").is_some());
    }
}

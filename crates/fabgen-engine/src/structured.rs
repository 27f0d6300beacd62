//! Structured-config construction and validation.

use std::net::Ipv4Addr;

use serde_yaml::{Mapping, Value};

use fabgen_types::{FabgenError, FabricFacts, Result, StructuredConfig, ValidationOutcome, VariableSet};

/// Build one device's configuration model from its variables and the shared
/// fabric facts. Fails when the device has no derived facts entry, which is
/// how input problems tolerated in non-strict mode surface per device.
pub(crate) fn build_structured_config(
    device: &str,
    vars: &VariableSet,
    facts: &FabricFacts,
) -> Result<StructuredConfig> {
    if vars.as_mapping().is_none() {
        return Err(FabgenError::Engine(
            "device variables are not a mapping".into(),
        ));
    }
    let device_facts = facts
        .get("devices")
        .and_then(|d| d.get(device))
        .ok_or_else(|| FabgenError::Engine("no derived facts for device".into()))?;

    let loopback_ip = device_facts
        .get("loopback_ip")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FabgenError::Engine("derived facts missing 'loopback_ip'".into()))?;
    let asn = device_facts
        .get("bgp_asn")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| FabgenError::Engine("derived facts missing 'bgp_asn'".into()))?;

    let mut config = Mapping::new();
    config.insert(Value::from("hostname"), Value::from(device));
    if let Some(platform) = vars.get("platform") {
        config.insert(Value::from("platform"), platform.clone());
    }

    let mut loopback = Mapping::new();
    loopback.insert(Value::from("interface"), Value::from("Loopback0"));
    loopback.insert(Value::from("ip_address"), Value::from(loopback_ip));
    config.insert(Value::from("loopback"), Value::Mapping(loopback));

    let mut neighbors: Vec<Value> = Vec::new();
    if let Some(peers) = device_facts.get("peers").and_then(|p| p.as_sequence()) {
        for peer in peers.iter().filter_map(|p| p.as_str()) {
            let Some(peer_facts) = facts.get("devices").and_then(|d| d.get(peer)) else {
                tracing::debug!(peer = %peer, "peer has no derived facts, skipping neighbor");
                continue;
            };
            let (Some(peer_ip), Some(peer_asn)) = (
                peer_facts.get("loopback_ip").and_then(|v| v.as_str()),
                peer_facts.get("bgp_asn").and_then(|v| v.as_u64()),
            ) else {
                continue;
            };
            let mut neighbor = Mapping::new();
            neighbor.insert(Value::from("peer"), Value::from(peer));
            neighbor.insert(Value::from("ip_address"), Value::from(strip_mask(peer_ip)));
            neighbor.insert(Value::from("remote_asn"), Value::from(peer_asn));
            neighbors.push(Value::Mapping(neighbor));
        }
    }

    let mut router_bgp = Mapping::new();
    router_bgp.insert(Value::from("asn"), Value::from(asn));
    router_bgp.insert(
        Value::from("router_id"),
        Value::from(strip_mask(loopback_ip)),
    );
    router_bgp.insert(Value::from("neighbors"), Value::Sequence(neighbors));
    config.insert(Value::from("router_bgp"), Value::Mapping(router_bgp));

    if let Some(interfaces) = vars.get("interfaces") {
        if interfaces.as_mapping().is_some() {
            config.insert(Value::from("interfaces"), interfaces.clone());
        }
    }

    Ok(Value::Mapping(config))
}

/// Validate one device's configuration model.
pub(crate) fn validate_structured_config(config: &StructuredConfig) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();

    match config.get("hostname").and_then(|v| v.as_str()) {
        None => outcome.error("missing 'hostname'"),
        Some("") => outcome.error("'hostname' is empty"),
        Some(_) => {}
    }

    match config.get("router_bgp") {
        None => outcome.error("missing 'router_bgp'"),
        Some(bgp) => {
            match bgp.get("asn").and_then(|v| v.as_u64()) {
                None => outcome.error("missing 'router_bgp.asn'"),
                Some(asn) if asn == 0 || asn > u64::from(u32::MAX) => {
                    outcome.error(format!("bgp asn {asn} out of range"));
                }
                Some(_) => {}
            }
            if let Some(neighbors) = bgp.get("neighbors").and_then(|n| n.as_sequence()) {
                for neighbor in neighbors {
                    let addr = neighbor.get("ip_address").and_then(|v| v.as_str());
                    match addr {
                        None => outcome.error("neighbor missing 'ip_address'"),
                        Some(a) if a.parse::<Ipv4Addr>().is_err() => {
                            outcome.error(format!("neighbor address '{a}' is not valid IPv4"));
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    if let Some(ip) = config
        .get("loopback")
        .and_then(|l| l.get("ip_address"))
        .and_then(|v| v.as_str())
    {
        if !ip.ends_with("/32") {
            outcome.warn(format!("loopback address '{ip}' is not a /32"));
        }
    }

    outcome
}

fn strip_mask(ip: &str) -> &str {
    ip.split('/').next().unwrap_or(ip)
}

//! Text rendering of a structured config.
//!
//! Output is deterministic for a given structured config: sections appear in a
//! fixed order and interfaces render in their structured-config order.

use fabgen_types::{FabgenError, Result, StructuredConfig};

pub(crate) fn render_config(config: &StructuredConfig) -> Result<String> {
    let hostname = config
        .get("hostname")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FabgenError::Engine("structured config missing 'hostname'".into()))?;

    let mut out = String::new();
    out.push_str(&format!("hostname {hostname}\n!\n"));

    if let Some(loopback) = config.get("loopback") {
        let name = loopback
            .get("interface")
            .and_then(|v| v.as_str())
            .unwrap_or("Loopback0");
        out.push_str(&format!("interface {name}\n"));
        if let Some(ip) = loopback.get("ip_address").and_then(|v| v.as_str()) {
            out.push_str(&format!("   ip address {ip}\n"));
        }
        out.push_str("!\n");
    }

    if let Some(interfaces) = config.get("interfaces").and_then(|i| i.as_mapping()) {
        for (name, attrs) in interfaces {
            let Some(name) = name.as_str() else { continue };
            out.push_str(&format!("interface {name}\n"));
            if let Some(desc) = attrs.get("description").and_then(|v| v.as_str()) {
                out.push_str(&format!("   description {desc}\n"));
            }
            if let Some(ip) = attrs.get("ip_address").and_then(|v| v.as_str()) {
                out.push_str(&format!("   ip address {ip}\n"));
            }
            out.push_str("!\n");
        }
    }

    if let Some(bgp) = config.get("router_bgp") {
        let asn = bgp
            .get("asn")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| FabgenError::Engine("structured config missing 'router_bgp.asn'".into()))?;
        out.push_str(&format!("router bgp {asn}\n"));
        if let Some(router_id) = bgp.get("router_id").and_then(|v| v.as_str()) {
            out.push_str(&format!("   router-id {router_id}\n"));
        }
        if let Some(neighbors) = bgp.get("neighbors").and_then(|n| n.as_sequence()) {
            for neighbor in neighbors {
                let (Some(ip), Some(remote)) = (
                    neighbor.get("ip_address").and_then(|v| v.as_str()),
                    neighbor.get("remote_asn").and_then(|v| v.as_u64()),
                ) else {
                    continue;
                };
                out.push_str(&format!("   neighbor {ip} remote-as {remote}\n"));
            }
        }
        out.push_str("!\n");
    }

    out.push_str("end\n");
    Ok(out)
}

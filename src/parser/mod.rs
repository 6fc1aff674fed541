//! Neighbor-discovery output parsing.
//!
//! Two independent grammars turn raw `show lldp neighbors detail` and
//! `show cdp neighbors detail` text into [`NeighborRecord`]s. Both are pure
//! and tolerant: absent fields stay unset, and a block with nothing
//! recognisable is skipped with a [`ParseSkip`] while the rest still parse.

pub mod cdp;
pub mod lldp;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cdp::CdpGrammar;
pub use lldp::LldpGrammar;

/// Neighbor protocol a command or record belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NeighborProtocol {
    Lldp,
    Cdp,
}

impl fmt::Display for NeighborProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighborProtocol::Lldp => write!(f, "LLDP"),
            NeighborProtocol::Cdp => write!(f, "CDP"),
        }
    }
}

/// How a neighbor relationship was learned
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiscoverySource {
    #[serde(rename = "LLDP")]
    SnmpLldp,
    #[serde(rename = "CDP")]
    SnmpCdp,
    #[serde(rename = "CLI-LLDP")]
    CliLldp,
    #[serde(rename = "CLI-CDP")]
    CliCdp,
    /// BRIDGE-MIB forwarding database
    #[serde(rename = "SNMP-FDB")]
    SnmpFdb,
    /// Q-BRIDGE-MIB per-VLAN forwarding database
    #[serde(rename = "SNMP-QBRIDGE")]
    SnmpQBridge,
    /// IP-MIB ARP cache
    #[serde(rename = "SNMP-ARP")]
    SnmpArp,
}

impl DiscoverySource {
    pub fn cli(protocol: NeighborProtocol) -> Self {
        match protocol {
            NeighborProtocol::Lldp => DiscoverySource::CliLldp,
            NeighborProtocol::Cdp => DiscoverySource::CliCdp,
        }
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiscoverySource::SnmpLldp => "LLDP",
            DiscoverySource::SnmpCdp => "CDP",
            DiscoverySource::CliLldp => "CLI-LLDP",
            DiscoverySource::CliCdp => "CLI-CDP",
            DiscoverySource::SnmpFdb => "SNMP-FDB",
            DiscoverySource::SnmpQBridge => "SNMP-QBRIDGE",
            DiscoverySource::SnmpArp => "SNMP-ARP",
        };
        f.write_str(label)
    }
}

/// One neighbor as reported by a device. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeighborRecord {
    pub source: DiscoverySource,
    pub local_port: Option<String>,
    pub remote_system: Option<String>,
    pub remote_port: Option<String>,
    pub remote_port_description: Option<String>,
    pub vlan: Option<String>,
    pub remote_address: Option<String>,
}

impl NeighborRecord {
    pub fn new(source: DiscoverySource) -> Self {
        Self {
            source,
            local_port: None,
            remote_system: None,
            remote_port: None,
            remote_port_description: None,
            vlan: None,
            remote_address: None,
        }
    }

    /// Number of populated fields
    pub fn field_count(&self) -> usize {
        [
            &self.local_port,
            &self.remote_system,
            &self.remote_port,
            &self.remote_port_description,
            &self.vlan,
            &self.remote_address,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    /// Remote port, falling back to the remote port description
    pub fn remote_port_or_description(&self) -> Option<&str> {
        self.remote_port
            .as_deref()
            .or(self.remote_port_description.as_deref())
    }
}

/// A block that yielded nothing usable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseSkip {
    pub protocol: NeighborProtocol,
    pub block_index: usize,
    pub reason: String,
    pub excerpt: String,
}

/// Result of parsing one command's output
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<NeighborRecord>,
    pub skipped: Vec<ParseSkip>,
}

/// Cleans an extracted value; vendor placeholders count as absent.
pub(crate) fn field_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    let lower = value.to_lowercase();
    if lower.contains("not advertised") || lower == "n/a" || lower == "--" {
        return None;
    }
    Some(value.to_string())
}

/// First non-blank line of a block, shortened for warnings
pub(crate) fn excerpt(block: &str) -> String {
    let line = block.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_absent() {
        assert_eq!(field_value("  not advertised "), None);
        assert_eq!(field_value("-- Not Advertised --"), None);
        assert_eq!(field_value(""), None);
        assert_eq!(field_value(" Gi1/0/1 "), Some("Gi1/0/1".to_string()));
    }

    #[test]
    fn test_remote_port_falls_back_to_description() {
        let mut record = NeighborRecord::new(DiscoverySource::CliLldp);
        record.remote_port_description = Some("uplink".to_string());
        assert_eq!(record.remote_port_or_description(), Some("uplink"));
        record.remote_port = Some("Gi0/1".to_string());
        assert_eq!(record.remote_port_or_description(), Some("Gi0/1"));
        assert_eq!(record.field_count(), 2);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(DiscoverySource::CliLldp.to_string(), "CLI-LLDP");
        assert_eq!(DiscoverySource::SnmpCdp.to_string(), "CDP");
        assert_eq!(DiscoverySource::SnmpQBridge.to_string(), "SNMP-QBRIDGE");
        assert_eq!(
            serde_json::to_string(&DiscoverySource::CliCdp).unwrap(),
            "\"CLI-CDP\""
        );
    }
}

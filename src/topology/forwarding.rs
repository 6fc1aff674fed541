//! Links inferred from forwarding tables.
//!
//! Every interface MAC reported through IF-MIB goes into a directory. A
//! forwarding entry on one device naming a MAC owned by another device
//! becomes a neighbor record pointing at that device's interface.

use std::collections::{HashMap, HashSet};

use crate::discovery::ProbeReport;
use crate::parser::NeighborRecord;

#[derive(Debug, Clone)]
struct MacOwner {
    address: String,
    device: String,
    interface: String,
}

/// MAC address to the probed device and interface that carries it
#[derive(Debug, Default)]
pub struct MacDirectory {
    owners: HashMap<String, MacOwner>,
}

impl MacDirectory {
    /// First owner wins; devices commonly reuse one MAC on many interfaces
    pub fn from_probes(probes: &[ProbeReport]) -> Self {
        let mut owners = HashMap::new();
        for probe in probes {
            let device = probe.system_name.clone().unwrap_or_else(|| probe.address.clone());
            for interface in &probe.interfaces {
                let Some(mac) = &interface.mac else {
                    continue;
                };
                owners.entry(mac.clone()).or_insert_with(|| MacOwner {
                    address: probe.address.clone(),
                    device: device.clone(),
                    interface: interface.name.clone(),
                });
            }
        }
        Self { owners }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Neighbor records for `probe`'s forwarding entries, one per local port
    /// and remote device. Earlier entries win, so Q-BRIDGE rows keep their VLAN.
    pub fn neighbors_for(&self, probe: &ProbeReport) -> Vec<NeighborRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for entry in &probe.forwarding {
            let Some(owner) = self.owners.get(&entry.mac) else {
                continue;
            };
            if owner.address == probe.address {
                continue;
            }
            if !seen.insert((entry.local_port.as_str(), owner.address.as_str())) {
                continue;
            }
            let mut record = NeighborRecord::new(entry.source);
            record.local_port = Some(entry.local_port.clone());
            record.remote_system = Some(owner.device.clone());
            record.remote_address = Some(owner.address.clone());
            record.remote_port = Some(owner.interface.clone());
            record.vlan = entry.vlan.map(|v| v.to_string());
            records.push(record);
        }
        if !records.is_empty() {
            log::debug!(
                "{}: {} links inferred from {} forwarding entries",
                probe.address,
                records.len(),
                probe.forwarding.len()
            );
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DeviceStatus;
    use crate::parser::DiscoverySource;
    use crate::snmp::{ForwardingEntry, InterfaceEntry};

    fn device(address: &str, name: Option<&str>, macs: &[(&str, &str)]) -> ProbeReport {
        ProbeReport {
            address: address.to_string(),
            system_name: name.map(str::to_string),
            status: DeviceStatus::Partial,
            platform: None,
            interfaces: macs
                .iter()
                .enumerate()
                .map(|(i, (iface, mac))| InterfaceEntry {
                    if_index: i as u32 + 1,
                    name: iface.to_string(),
                    mac: Some(mac.to_string()),
                    ..InterfaceEntry::default()
                })
                .collect(),
            neighbors: Vec::new(),
            forwarding: Vec::new(),
            command_outputs: Vec::new(),
            notes: Vec::new(),
            session_history: Vec::new(),
        }
    }

    fn learned(source: DiscoverySource, port: &str, mac: &str, vlan: Option<u32>) -> ForwardingEntry {
        ForwardingEntry {
            source,
            local_port: port.to_string(),
            mac: mac.to_string(),
            vlan,
            ip: None,
        }
    }

    #[test]
    fn test_foreign_macs_become_neighbors() {
        let mut edge = device("10.0.0.3", Some("edge-3"), &[("Gi0/1", "001b54aa0001")]);
        let core = device("10.0.0.1", None, &[("Gi1/0/24", "00aabbcc0024"), ("Vlan1", "00aabbcc0024")]);
        edge.forwarding = vec![
            learned(DiscoverySource::SnmpQBridge, "Gi0/1", "00aabbcc0024", Some(20)),
            learned(DiscoverySource::SnmpFdb, "Gi0/1", "00aabbcc0024", None),
            // own MAC and unknown MAC
            learned(DiscoverySource::SnmpFdb, "Gi0/2", "001b54aa0001", None),
            learned(DiscoverySource::SnmpArp, "Gi0/1", "ffffff000001", None),
        ];
        let directory = MacDirectory::from_probes(&[edge.clone(), core]);
        assert_eq!(directory.len(), 2);

        let records = directory.neighbors_for(&edge);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source, DiscoverySource::SnmpQBridge);
        assert_eq!(record.local_port.as_deref(), Some("Gi0/1"));
        // unnamed devices are known by address
        assert_eq!(record.remote_system.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.remote_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.remote_port.as_deref(), Some("Gi1/0/24"));
        assert_eq!(record.vlan.as_deref(), Some("20"));
    }

    #[test]
    fn test_no_forwarding_no_records() {
        let core = device("10.0.0.1", Some("core-1"), &[("Gi1/0/24", "00aabbcc0024")]);
        let directory = MacDirectory::from_probes(std::slice::from_ref(&core));
        assert!(directory.neighbors_for(&core).is_empty());
        assert!(MacDirectory::default().is_empty());
    }
}

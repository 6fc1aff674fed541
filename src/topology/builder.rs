//! Single-writer graph assembly.
//!
//! Probe results and parsed neighbor records are merged here, one at a time,
//! after every device has been probed. Interface names are normalized before
//! any key is built, so `GigabitEthernet1/0/1` reported by one side and
//! `Gi1/0/1` by the other land on the same [`LinkKey`].

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use super::classify::InterfaceClassifier;
use super::graph::{Device, DeviceId, DeviceKind, Endpoint, Interface, Link, LinkKey, TopologyGraph};
use super::normalize::InterfaceNormalizer;
use crate::discovery::{DeviceStatus, ProbeReport};
use crate::parser::{DiscoverySource, NeighborRecord};
use crate::snmp::InterfaceEntry;

/// Non-fatal problems met while merging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphWarning {
    /// Record lacks a local port, remote system or remote port
    IncompleteNeighbor {
        device: String,
        source: DiscoverySource,
        missing: &'static str,
    },
    /// Record points back at the reporting device
    SelfLink { device: String, port: String },
    /// Remote system matched no device; a stub was created for it
    UnresolvedNeighbor { name: String, reported_by: String },
}

pub struct GraphBuilder<'a> {
    classifier: &'a InterfaceClassifier,
    normalizer: &'a InterfaceNormalizer,
    devices: Vec<Device>,
    links: Vec<Link>,
    by_name: HashMap<String, DeviceId>,
    by_address: HashMap<String, DeviceId>,
    by_short_name: HashMap<String, DeviceId>,
    link_keys: HashSet<LinkKey>,
    warnings: Vec<GraphWarning>,
}

fn is_ip(name: &str) -> bool {
    name.parse::<IpAddr>().is_ok()
}

/// Host part of a dotted name; IP addresses have none
fn short_name(name: &str) -> Option<String> {
    if is_ip(name) {
        return None;
    }
    let short = name.split('.').next()?.trim();
    (!short.is_empty()).then(|| short.to_lowercase())
}

impl<'a> GraphBuilder<'a> {
    pub fn new(classifier: &'a InterfaceClassifier, normalizer: &'a InterfaceNormalizer) -> Self {
        Self {
            classifier,
            normalizer,
            devices: Vec::new(),
            links: Vec::new(),
            by_name: HashMap::new(),
            by_address: HashMap::new(),
            by_short_name: HashMap::new(),
            link_keys: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    fn register(&mut self, id: DeviceId) {
        let device = &self.devices[id.0];
        self.by_name.entry(device.name.to_lowercase()).or_insert(id);
        if let Some(short) = short_name(&device.name) {
            self.by_short_name.entry(short).or_insert(id);
        }
        if let Some(address) = &device.address {
            self.by_address.entry(address.clone()).or_insert(id);
        }
    }

    fn push_device(&mut self, device: Device) -> DeviceId {
        let id = device.id;
        self.devices.push(device);
        self.register(id);
        id
    }

    /// Add a probed device with its interface inventory.
    ///
    /// Unreachable devices are reported elsewhere and never enter the graph;
    /// `None` is returned for them. A second target answering with an already
    /// known system name merges into the existing device.
    pub fn add_probe(&mut self, report: &ProbeReport) -> Option<DeviceId> {
        if report.status == DeviceStatus::Unreachable {
            return None;
        }
        let name = report
            .system_name
            .clone()
            .unwrap_or_else(|| report.address.clone());

        let id = match self.by_name.get(&name.to_lowercase()).copied() {
            Some(existing) if !self.devices[existing.0].is_stub() => {
                log::debug!("{} answers as already known device {}", report.address, name);
                self.by_address.entry(report.address.clone()).or_insert(existing);
                existing
            }
            _ => {
                let id = DeviceId(self.devices.len());
                self.push_device(Device {
                    id,
                    name,
                    address: Some(report.address.clone()),
                    kind: DeviceKind::Probed,
                    status: Some(report.status),
                    platform: report.platform,
                    interfaces: Vec::new(),
                })
            }
        };
        for entry in &report.interfaces {
            self.add_interface(id, entry);
        }
        Some(id)
    }

    /// Add or enrich an inventory interface; returns its canonical name
    pub fn add_interface(&mut self, device: DeviceId, entry: &InterfaceEntry) -> String {
        let canonical = self.ensure_interface(device, &entry.name, entry.iana_type.as_deref());
        if let Some(iface) = self.devices[device.0]
            .interfaces
            .iter_mut()
            .find(|i| i.canonical.eq_ignore_ascii_case(&canonical))
        {
            iface.if_index = iface.if_index.or(Some(entry.if_index));
            iface.alias = iface.alias.take().or_else(|| entry.alias.clone());
            iface.admin_up = iface.admin_up.or(entry.admin_up);
            iface.oper_up = iface.oper_up.or(entry.oper_up);
        }
        canonical
    }

    /// Canonical name of `raw` on `device`, creating the interface if unknown
    pub fn ensure_interface(&mut self, device: DeviceId, raw: &str, iana_type: Option<&str>) -> String {
        let canonical = self.normalizer.normalize(raw);
        let interfaces = &mut self.devices[device.0].interfaces;
        match interfaces
            .iter_mut()
            .find(|i| i.canonical.eq_ignore_ascii_case(&canonical))
        {
            Some(existing) => {
                if existing.iana_type.is_none() {
                    existing.iana_type = iana_type.map(str::to_string);
                }
                existing.canonical.clone()
            }
            None => {
                interfaces.push(Interface {
                    name: raw.trim().to_string(),
                    canonical: canonical.clone(),
                    class: self.classifier.classify(&canonical, iana_type),
                    iana_type: iana_type.map(str::to_string),
                    alias: None,
                    if_index: None,
                    admin_up: None,
                    oper_up: None,
                });
                canonical
            }
        }
    }

    /// Find the device a neighbor record points at, creating a stub if needed
    fn resolve_remote(&mut self, record: &NeighborRecord, remote: &str, reporter: DeviceId) -> DeviceId {
        let lower = remote.trim().to_lowercase();
        if let Some(id) = self.by_name.get(&lower) {
            return *id;
        }
        if let Some(id) = record
            .remote_address
            .as_ref()
            .and_then(|a| self.by_address.get(a))
            .or_else(|| self.by_address.get(remote.trim()))
        {
            return *id;
        }
        if let Some(short) = short_name(&lower) {
            if let Some(id) = self.by_name.get(&short).or_else(|| self.by_short_name.get(&short)) {
                return *id;
            }
        }

        let reported_by = self.devices[reporter.0].name.clone();
        log::info!("Creating stub device {} (reported by {})", remote, reported_by);
        self.warnings.push(GraphWarning::UnresolvedNeighbor {
            name: remote.to_string(),
            reported_by,
        });
        let id = DeviceId(self.devices.len());
        self.push_device(Device {
            id,
            name: remote.trim().to_string(),
            address: record.remote_address.clone(),
            kind: DeviceKind::Stub,
            status: None,
            platform: None,
            interfaces: Vec::new(),
        })
    }

    /// Merge the neighbor records reported by `device`.
    ///
    /// # Arguments
    /// * `device` - The reporting device
    /// * `records` - Parsed or SNMP-derived neighbor records, in report order
    ///
    /// # Returns
    /// The number of new links; duplicates of already-known links are dropped
    pub fn add_neighbors(&mut self, device: DeviceId, records: &[NeighborRecord]) -> usize {
        let mut added = 0;
        for record in records {
            let reporter = self.devices[device.0].name.clone();
            let incomplete = |missing| GraphWarning::IncompleteNeighbor {
                device: reporter.clone(),
                source: record.source,
                missing,
            };
            let Some(local_port) = record.local_port.as_deref() else {
                self.warnings.push(incomplete("local_port"));
                continue;
            };
            let Some(remote_system) = record.remote_system.as_deref().filter(|s| !s.trim().is_empty()) else {
                self.warnings.push(incomplete("remote_system"));
                continue;
            };
            let Some(remote_port) = record.remote_port_or_description() else {
                self.warnings.push(incomplete("remote_port"));
                continue;
            };

            let remote = self.resolve_remote(record, remote_system, device);
            if remote == device {
                log::warn!("{} reports itself as neighbor on {}", reporter, local_port);
                self.warnings.push(GraphWarning::SelfLink {
                    device: reporter,
                    port: local_port.to_string(),
                });
                continue;
            }

            let a = Endpoint {
                device,
                interface: self.ensure_interface(device, local_port, None),
            };
            let b = Endpoint {
                device: remote,
                interface: self.ensure_interface(remote, remote_port, None),
            };
            let key = LinkKey::new(&a, &b);
            if !self.link_keys.insert(key.clone()) {
                continue;
            }
            self.links.push(Link {
                a,
                b,
                key,
                source: record.source,
                vlan: record.vlan.clone(),
            });
            added += 1;
        }
        added
    }

    pub fn finish(self) -> (TopologyGraph, Vec<GraphWarning>) {
        (
            TopologyGraph {
                devices: self.devices,
                links: self.links,
            },
            self.warnings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::topology::InterfaceClass;

    fn compiled() -> crate::config::CompiledPatterns {
        Config::default().compile().unwrap()
    }

    fn report(address: &str, name: Option<&str>) -> ProbeReport {
        ProbeReport {
            address: address.to_string(),
            system_name: name.map(str::to_string),
            status: DeviceStatus::Reachable,
            platform: None,
            interfaces: Vec::new(),
            neighbors: Vec::new(),
            forwarding: Vec::new(),
            command_outputs: Vec::new(),
            notes: Vec::new(),
            session_history: Vec::new(),
        }
    }

    fn lldp(local: &str, system: &str, port: &str) -> NeighborRecord {
        let mut record = NeighborRecord::new(DiscoverySource::CliLldp);
        record.local_port = Some(local.to_string());
        record.remote_system = Some(system.to_string());
        record.remote_port = Some(port.to_string());
        record
    }

    #[test]
    fn test_symmetric_reports_collapse_to_one_link() {
        let patterns = compiled();
        let mut builder = GraphBuilder::new(&patterns.classifier, &patterns.normalizer);
        let a = builder.add_probe(&report("10.0.0.1", Some("a"))).unwrap();
        let b = builder.add_probe(&report("10.0.0.2", Some("b"))).unwrap();

        assert_eq!(builder.add_neighbors(a, &[lldp("GigabitEthernet1/0/1", "b", "Gi1/0/2")]), 1);
        assert_eq!(builder.add_neighbors(b, &[lldp("Gi1/0/2", "a", "GigabitEthernet 1/0/1")]), 0);

        let (graph, warnings) = builder.finish();
        assert_eq!(graph.links.len(), 1);
        assert!(warnings.is_empty());
        assert_eq!(graph.links[0].a.interface, "Gi1/0/1");
        assert_eq!(graph.links[0].b.interface, "Gi1/0/2");
        // first-seen report is kept
        assert_eq!(graph.links[0].a.device, a);
    }

    #[test]
    fn test_unresolved_neighbor_becomes_stub() {
        let patterns = compiled();
        let mut builder = GraphBuilder::new(&patterns.classifier, &patterns.normalizer);
        let a = builder.add_probe(&report("10.0.0.1", Some("a"))).unwrap();
        builder.add_neighbors(a, &[lldp("Gi1/0/1", "phone-7", "Port 1")]);
        let (graph, warnings) = builder.finish();

        assert_eq!(graph.devices.len(), 2);
        assert!(graph.devices[1].is_stub());
        assert_eq!(graph.devices[1].name, "phone-7");
        assert_eq!(graph.links.len(), 1);
        assert!(matches!(
            &warnings[0],
            GraphWarning::UnresolvedNeighbor { name, reported_by } if name == "phone-7" && reported_by == "a"
        ));
    }

    #[test]
    fn test_resolution_by_address_and_short_name() {
        let patterns = compiled();
        let mut builder = GraphBuilder::new(&patterns.classifier, &patterns.normalizer);
        let a = builder.add_probe(&report("10.0.0.1", Some("a"))).unwrap();
        let core = builder
            .add_probe(&report("10.0.0.9", Some("core-1.example.net")))
            .unwrap();
        let unnamed = builder.add_probe(&report("10.0.0.5", None)).unwrap();

        let mut by_address = lldp("Gi1/0/1", "some-other-name", "Gi0/1");
        by_address.remote_address = Some("10.0.0.5".to_string());
        builder.add_neighbors(a, &[by_address, lldp("Gi1/0/2", "CORE-1", "Gi0/24")]);

        let (graph, warnings) = builder.finish();
        assert!(warnings.is_empty());
        assert_eq!(graph.devices.len(), 3);
        assert_eq!(graph.links[0].b.device, unnamed);
        assert_eq!(graph.links[1].b.device, core);
        assert_eq!(graph.devices[unnamed.0].name, "10.0.0.5");
    }

    #[test]
    fn test_incomplete_and_self_link_are_skipped() {
        let patterns = compiled();
        let mut builder = GraphBuilder::new(&patterns.classifier, &patterns.normalizer);
        let a = builder.add_probe(&report("10.0.0.1", Some("a"))).unwrap();

        let mut no_port = NeighborRecord::new(DiscoverySource::SnmpCdp);
        no_port.local_port = Some("Gi1/0/1".to_string());
        no_port.remote_system = Some("b".to_string());
        let mut described = lldp("Gi1/0/3", "b", "x");
        described.remote_port = None;
        described.remote_port_description = Some("uplink".to_string());

        let added = builder.add_neighbors(a, &[no_port, lldp("Gi1/0/2", "a", "Gi1/0/9"), described]);
        assert_eq!(added, 1);

        let (graph, warnings) = builder.finish();
        assert_eq!(warnings.len(), 3);
        assert!(matches!(
            warnings[0],
            GraphWarning::IncompleteNeighbor { missing: "remote_port", .. }
        ));
        assert!(matches!(warnings[1], GraphWarning::SelfLink { .. }));
        assert!(matches!(warnings[2], GraphWarning::UnresolvedNeighbor { .. }));
        assert_eq!(graph.links[0].b.interface, "uplink");
    }

    #[test]
    fn test_unreachable_is_not_added_and_interfaces_are_classified() {
        let patterns = compiled();
        let mut builder = GraphBuilder::new(&patterns.classifier, &patterns.normalizer);
        let mut dead = report("10.0.0.3", None);
        dead.status = DeviceStatus::Unreachable;
        assert!(builder.add_probe(&dead).is_none());

        let mut live = report("10.0.0.4", Some("dist-1"));
        live.interfaces = vec![
            InterfaceEntry {
                if_index: 1,
                name: "TenGigabitEthernet1/1/1".to_string(),
                alias: Some("to core".to_string()),
                ..InterfaceEntry::default()
            },
            InterfaceEntry {
                if_index: 20,
                name: "Vlan20".to_string(),
                ..InterfaceEntry::default()
            },
        ];
        let id = builder.add_probe(&live).unwrap();
        let canonical = builder.ensure_interface(id, "Te1/1/1", None);
        assert_eq!(canonical, "Te1/1/1");

        let (graph, _) = builder.finish();
        let device = &graph.devices[0];
        assert_eq!(device.interfaces.len(), 2);
        assert_eq!(device.interface("te1/1/1").unwrap().alias.as_deref(), Some("to core"));
        assert_eq!(device.interface("Vl20").unwrap().class, InterfaceClass::Logical);
        assert_ne!(device.interface("Te1/1/1").unwrap().class, InterfaceClass::Logical);
    }
}

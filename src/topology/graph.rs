//! Topology graph type definitions.
//!
//! The graph owns every [`Device`] and [`Link`]; devices own their
//! [`Interface`]s. It is produced once by the
//! [`GraphBuilder`](super::builder::GraphBuilder) and read-only afterwards.

use serde::Serialize;
use std::fmt;

use super::classify::InterfaceClass;
use crate::discovery::{DeviceStatus, PlatformFamily};
use crate::parser::DiscoverySource;

/// Index of a device in [`TopologyGraph::devices`], in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Probed directly (reachable or partial)
    Probed,
    /// Known only from a neighbor report
    Stub,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interface {
    /// Name as first reported
    pub name: String,
    pub canonical: String,
    pub class: InterfaceClass,
    pub iana_type: Option<String>,
    pub alias: Option<String>,
    pub if_index: Option<u32>,
    pub admin_up: Option<bool>,
    pub oper_up: Option<bool>,
}

impl Interface {
    /// Known to be down on both admin and oper status
    pub fn is_down(&self) -> bool {
        self.admin_up == Some(false) && self.oper_up == Some(false)
    }

    pub fn is_management(&self) -> bool {
        let lower = self.canonical.to_lowercase();
        lower.starts_with("mgmt") || lower.starts_with("management")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: DeviceId,
    /// System name, or the address when no name was learned
    pub name: String,
    pub address: Option<String>,
    pub kind: DeviceKind,
    pub status: Option<DeviceStatus>,
    pub platform: Option<PlatformFamily>,
    pub interfaces: Vec<Interface>,
}

impl Device {
    pub fn is_stub(&self) -> bool {
        self.kind == DeviceKind::Stub
    }

    pub fn interface(&self, canonical: &str) -> Option<&Interface> {
        self.interfaces
            .iter()
            .find(|i| i.canonical.eq_ignore_ascii_case(canonical))
    }
}

/// One side of a link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub device: DeviceId,
    /// Canonical interface name
    pub interface: String,
}

/// Unordered endpoint pair; equal for A->B and B->A reports of the same cable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LinkKey {
    low: (DeviceId, String),
    high: (DeviceId, String),
}

impl LinkKey {
    pub fn new(a: &Endpoint, b: &Endpoint) -> Self {
        let x = (a.device, a.interface.to_lowercase());
        let y = (b.device, b.interface.to_lowercase());
        if x <= y {
            Self { low: x, high: y }
        } else {
            Self { low: y, high: x }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    /// Endpoint on the reporting device
    pub a: Endpoint,
    pub b: Endpoint,
    #[serde(skip)]
    pub key: LinkKey,
    pub source: DiscoverySource,
    pub vlan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologyGraph {
    pub devices: Vec<Device>,
    pub links: Vec<Link>,
}

impl TopologyGraph {
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    /// Links touching `id`, in insertion order
    pub fn links_of(&self, id: DeviceId) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(move |l| l.a.device == id || l.b.device == id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(device: usize, interface: &str) -> Endpoint {
        Endpoint {
            device: DeviceId(device),
            interface: interface.to_string(),
        }
    }

    #[test]
    fn test_link_key_is_unordered() {
        let forward = LinkKey::new(&ep(0, "Gi1/0/1"), &ep(1, "Gi0/24"));
        let reverse = LinkKey::new(&ep(1, "gi0/24"), &ep(0, "GI1/0/1"));
        assert_eq!(forward, reverse);
        assert_ne!(forward, LinkKey::new(&ep(0, "Gi1/0/2"), &ep(1, "Gi0/24")));
    }

    #[test]
    fn test_down_and_management() {
        let mut iface = Interface {
            name: "mgmt0".to_string(),
            canonical: "mgmt0".to_string(),
            class: InterfaceClass::Physical,
            iana_type: None,
            alias: None,
            if_index: None,
            admin_up: Some(true),
            oper_up: None,
        };
        assert!(iface.is_management());
        assert!(!iface.is_down());
        iface.oper_up = Some(false);
        assert!(!iface.is_down());
        iface.admin_up = Some(false);
        assert!(iface.is_down());
    }
}

//! Interface classification.
//!
//! An ordered first-match-wins rule list over interface names, with an IANA
//! `ifType` lookup as the last resort. The function is total: every input
//! resolves to exactly one [`InterfaceClass`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{compile_pattern, PatternConfig, ValidationError};

/// Classification tag carried by every interface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceClass {
    Physical,
    /// Physical port addressed as unit/module/port on a multi-unit chassis
    StackMember,
    Logical,
    Unknown,
}

impl InterfaceClass {
    /// Whether the interface gets a slot on the chassis drawing
    pub fn is_chassis_port(self) -> bool {
        matches!(self, InterfaceClass::Physical | InterfaceClass::StackMember)
    }
}

#[derive(Debug, Clone)]
struct ClassRule {
    pattern: Regex,
    class: InterfaceClass,
}

/// Compiled rule list plus the IANA type sets
#[derive(Debug, Clone)]
pub struct InterfaceClassifier {
    rules: Vec<ClassRule>,
    physical_types: HashSet<String>,
    logical_types: HashSet<String>,
}

impl InterfaceClassifier {
    pub fn compile(patterns: &PatternConfig) -> Result<Self, ValidationError> {
        let groups = [
            ("physical_names", &patterns.physical_names, InterfaceClass::Physical),
            ("stack_member_names", &patterns.stack_member_names, InterfaceClass::StackMember),
            ("logical_names", &patterns.logical_names, InterfaceClass::Logical),
        ];
        let mut rules = Vec::new();
        for (field, list, class) in groups {
            for (i, pattern) in list.iter().enumerate() {
                rules.push(ClassRule {
                    pattern: compile_pattern(&format!("{}[{}]", field, i), pattern)?,
                    class,
                });
            }
        }
        Ok(Self {
            rules,
            physical_types: lowercase_set(&patterns.physical_iana_types),
            logical_types: lowercase_set(&patterns.logical_iana_types),
        })
    }

    /// Classify an interface by name, falling back to its IANA type.
    ///
    /// `iana_type` may be the textual name (`ethernetCsmacd`) or the numeric
    /// code (`6`).
    pub fn classify(&self, name: &str, iana_type: Option<&str>) -> InterfaceClass {
        let name = name.trim();
        if !name.is_empty() {
            for rule in &self.rules {
                if rule.pattern.is_match(name) {
                    return rule.class;
                }
            }
        }

        let Some(raw_type) = iana_type.map(str::trim).filter(|t| !t.is_empty()) else {
            return InterfaceClass::Unknown;
        };
        let type_name = match raw_type.parse::<u32>() {
            Ok(code) => match iana_type_name(code) {
                Some(known) => known.to_lowercase(),
                None => return InterfaceClass::Unknown,
            },
            Err(_) => raw_type.to_lowercase(),
        };
        if self.physical_types.contains(&type_name) {
            InterfaceClass::Physical
        } else if self.logical_types.contains(&type_name) {
            InterfaceClass::Logical
        } else {
            InterfaceClass::Unknown
        }
    }
}

fn lowercase_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Textual IANAifType name for the codes discovery commonly meets
pub fn iana_type_name(code: u32) -> Option<&'static str> {
    let name = match code {
        1 => "other",
        5 => "x25",
        6 => "ethernetCsmacd",
        9 => "tokenRing",
        18 => "ds1",
        22 => "propPointToPointSerial",
        23 => "ppp",
        24 => "softwareLoopback",
        32 => "frameRelay",
        37 => "atm",
        46 => "hssi",
        47 => "hippi",
        48 => "modem",
        49 => "aal5",
        53 => "propVirtual",
        54 => "propMultiplexor",
        56 => "fibreChannel",
        62 => "fastEther",
        69 => "fastEtherFX",
        71 => "ieee80211",
        94 => "adsl",
        95 => "radsl",
        96 => "sdsl",
        97 => "vdsl",
        104 => "voiceOverIp",
        117 => "gigabitEthernet",
        127 => "docsCableMaclayer",
        128 => "docsCableDownstream",
        129 => "docsCableUpstream",
        131 => "tunnel",
        134 => "atmSubInterface",
        135 => "l2vlan",
        136 => "l3ipvlan",
        150 => "mplsTunnel",
        161 => "ieee8023adLag",
        166 => "mpls",
        169 => "shdsl",
        195 => "opticalChannel",
        209 => "bridge",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> InterfaceClassifier {
        InterfaceClassifier::compile(&PatternConfig::default()).unwrap()
    }

    #[test]
    fn test_physical_names() {
        let c = classifier();
        for name in ["GigabitEthernet1/0/1", "Gi0/1", "Te1/1/4", "Ethernet1/49", "ge-0/0/3", "mgmt0", "eth0", "enp3s0"] {
            assert_eq!(c.classify(name, None), InterfaceClass::Physical, "{}", name);
        }
    }

    #[test]
    fn test_stack_member_names() {
        let c = classifier();
        assert_eq!(c.classify("AppGigabitEthernet1/0/1", None), InterfaceClass::StackMember);
        assert_eq!(c.classify("Stack-2/0/14", None), InterfaceClass::StackMember);
        // two segments are not a stack address
        assert_ne!(c.classify("Switch1/1", None), InterfaceClass::StackMember);
    }

    #[test]
    fn test_logical_names() {
        let c = classifier();
        for name in ["Vlan100", "Loopback0", "Port-channel1", "Po12", "Tunnel5", "ae0", "BVI1", "Null0"] {
            assert_eq!(c.classify(name, None), InterfaceClass::Logical, "{}", name);
        }
    }

    #[test]
    fn test_abbreviations_need_a_port_number() {
        let c = classifier();
        assert_eq!(c.classify("Fabric0", None), InterfaceClass::Logical);
        assert_eq!(c.classify("Fa0/1", None), InterfaceClass::Physical);
        assert_eq!(c.classify("FastEthernet0/1", None), InterfaceClass::Physical);
        assert_eq!(c.classify("TenGigE0/0/0/1", None), InterfaceClass::Physical);
        assert_eq!(c.classify("HundredGigE1/0/49", None), InterfaceClass::Physical);
        assert_ne!(c.classify("Terminal1", None), InterfaceClass::Physical);
    }

    #[test]
    fn test_dotted_subinterface_is_logical() {
        let c = classifier();
        assert_eq!(c.classify("Gi0/0.100", None), InterfaceClass::Logical);
        assert_eq!(c.classify("ge-0/0/1.0", None), InterfaceClass::Logical);
    }

    #[test]
    fn test_iana_fallback() {
        let c = classifier();
        assert_eq!(c.classify("unit17", Some("ethernetCsmacd")), InterfaceClass::Physical);
        assert_eq!(c.classify("unit17", Some("6")), InterfaceClass::Physical);
        assert_eq!(c.classify("if-x", Some("l3ipvlan")), InterfaceClass::Logical);
        assert_eq!(c.classify("if-x", Some("161")), InterfaceClass::Logical);
        assert_eq!(c.classify("if-x", Some("99999")), InterfaceClass::Unknown);
    }

    #[test]
    fn test_name_rule_beats_iana_type() {
        let c = classifier();
        assert_eq!(c.classify("Vlan10", Some("ethernetCsmacd")), InterfaceClass::Logical);
    }

    #[test]
    fn test_classification_is_total() {
        let c = classifier();
        for name in ["", "   ", "???", "ünïcødé", "12345", "/////", "Gi"] {
            let class = c.classify(name, None);
            assert!(matches!(
                class,
                InterfaceClass::Physical
                    | InterfaceClass::StackMember
                    | InterfaceClass::Logical
                    | InterfaceClass::Unknown
            ));
        }
        assert_eq!(c.classify("", None), InterfaceClass::Unknown);
    }
}

//! Typed configuration for a discovery run.
//!
//! Every section carries serde defaults, so an empty YAML document is a
//! complete configuration. Pattern strings stay plain strings here and are
//! compiled once into [`CompiledPatterns`], which is then handed explicitly to
//! the parser, classifier, normalizer and session.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::discovery::platform::{PlatformFamily, PromptSet};
use crate::parser::{CdpGrammar, LldpGrammar};
use crate::topology::{InterfaceClassifier, InterfaceNormalizer};

/// Errors raised while validating or compiling a configuration
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid discovery configuration: {0}")]
    InvalidDiscovery(String),
    #[error("Invalid pattern `{field}`: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid interface replacement table: {0}")]
    InvalidReplacement(String),
    #[error("Invalid layout configuration: {0}")]
    InvalidLayout(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub patterns: PatternConfig,
    pub layout: LayoutConfig,
}

impl Config {
    /// Validate the configuration, including every pattern it carries
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.discovery.validate()?;
        self.layout.validate()?;
        self.compile()?;
        Ok(())
    }

    /// Compile all pattern sets into their runtime form
    pub fn compile(&self) -> Result<CompiledPatterns, ValidationError> {
        let patterns = &self.patterns;
        Ok(CompiledPatterns {
            prompts: PromptSet::compile(patterns)?,
            lldp: LldpGrammar::compile(&patterns.lldp)?,
            cdp: CdpGrammar::compile(&patterns.cdp)?,
            classifier: InterfaceClassifier::compile(patterns)?,
            normalizer: InterfaceNormalizer::compile(&patterns.interface_replacements)?,
        })
    }
}

/// Runtime form of [`PatternConfig`]
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    pub prompts: PromptSet,
    pub lldp: LldpGrammar,
    pub cdp: CdpGrammar,
    pub classifier: InterfaceClassifier,
    pub normalizer: InterfaceNormalizer,
}

/// Compile one configured pattern. All configured patterns are matched
/// case-insensitively with `^`/`$` anchoring at line boundaries.
pub(crate) fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, ValidationError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|source| ValidationError::InvalidPattern {
            field: field.to_string(),
            source,
        })
}

/// Discovery phase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Upper bound on devices probed concurrently
    pub workers: usize,
    pub snmp: SnmpConfig,
    pub cli: CliConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            snmp: SnmpConfig::default(),
            cli: CliConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.workers == 0 {
            return Err(ValidationError::InvalidDiscovery(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.snmp.enabled && self.snmp.communities.is_empty() {
            return Err(ValidationError::InvalidDiscovery(
                "snmp.communities cannot be empty while SNMP is enabled".to_string(),
            ));
        }
        if self.cli.enabled && self.cli.attempts == 0 {
            return Err(ValidationError::InvalidDiscovery(
                "cli.attempts must be at least 1".to_string(),
            ));
        }
        if self.cli.poll_interval.is_zero() {
            return Err(ValidationError::InvalidDiscovery(
                "cli.poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// SNMPv2c settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpConfig {
    pub enabled: bool,
    /// Community strings, tried in order until one answers
    pub communities: Vec<String>,
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retries: u32,
    /// Hard stop for a single table walk
    pub max_walk_entries: usize,
    /// Fall back to bridge forwarding and ARP tables when LLDP/CDP walks
    /// return no neighbors
    pub forwarding_tables: bool,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            communities: vec!["public".to_string()],
            port: 161,
            timeout: Duration::from_secs(2),
            retries: 1,
            max_walk_entries: 10_000,
            forwarding_tables: true,
        }
    }
}

/// Line protocol for interactive sessions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CliProtocol {
    #[default]
    Ssh,
    Telnet,
}

impl CliProtocol {
    pub fn default_port(self) -> u16 {
        match self {
            CliProtocol::Ssh => 22,
            CliProtocol::Telnet => 23,
        }
    }
}

/// Interactive session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub enabled: bool,
    pub protocol: CliProtocol,
    /// Defaults to the protocol's well-known port
    pub port: Option<u16>,
    /// Whole-session attempts before the device is given up
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub banner_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub auth_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub prompt_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub neighbor_command_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Run CDP commands even on platforms that skip them by default
    pub force_cdp: bool,
    pub cdp_skip_platforms: Vec<PlatformFamily>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            protocol: CliProtocol::Ssh,
            port: None,
            attempts: 2,
            connect_timeout: Duration::from_secs(10),
            banner_timeout: Duration::from_secs(15),
            auth_timeout: Duration::from_secs(10),
            prompt_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(20),
            neighbor_command_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(100),
            force_cdp: false,
            cdp_skip_platforms: vec![PlatformFamily::Junos],
        }
    }
}

impl CliConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }
}

/// Prompt pattern bound to the platform family it identifies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPattern {
    pub platform: PlatformFamily,
    pub regex: String,
}

/// One row of the interface-name replacement table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// LLDP detail-output extractors. Field patterns capture the value in group 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LldpPatterns {
    pub block_start: String,
    pub local_port: String,
    pub system_name: String,
    pub port_id: String,
    pub port_description: String,
    pub vlan_id: String,
    pub management_address: String,
}

impl Default for LldpPatterns {
    fn default() -> Self {
        Self {
            block_start: r"^\s*Chassis id\s*:".to_string(),
            local_port: r"^\s*Local (?:Port id|Intf|Interface)\s*:\s*(.+?)\s*$".to_string(),
            system_name: r"^\s*System Name\s*:\s*(.+?)\s*$".to_string(),
            port_id: r"^\s*Port id\s*:\s*(.+?)\s*$".to_string(),
            port_description: r"^\s*Port Description\s*:\s*(.+?)\s*$".to_string(),
            vlan_id: r"^\s*Vlan ID\s*:\s*(.+?)\s*$".to_string(),
            management_address: r"^\s*(?:Management Address|IP)\s*:\s*(\d{1,3}(?:\.\d{1,3}){3})"
                .to_string(),
        }
    }
}

/// CDP detail-output extractors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpPatterns {
    pub separator: String,
    pub device_id: String,
    pub local_interface: String,
    pub remote_port: String,
    pub management_address: String,
}

impl Default for CdpPatterns {
    fn default() -> Self {
        Self {
            separator: r"^\s*-{10,}\s*$".to_string(),
            device_id: r"Device ID\s*:\s*(\S+)".to_string(),
            local_interface: r"Interface\s*:\s*([^,]+?)\s*,".to_string(),
            remote_port: r"Port ID \(outgoing port\)\s*:\s*(\S+)".to_string(),
            management_address: r"IP(?:v4)? address\s*:\s*(\d{1,3}(?:\.\d{1,3}){3})".to_string(),
        }
    }
}

/// Every heuristic pattern set used by discovery, parsing and classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Vendor prompts, tried in order before `generic_prompt`
    pub prompts: Vec<PromptPattern>,
    pub generic_prompt: String,
    pub username_prompt: String,
    pub password_prompt: String,
    pub lldp: LldpPatterns,
    pub cdp: CdpPatterns,
    pub interface_replacements: Vec<Replacement>,
    pub physical_names: Vec<String>,
    pub stack_member_names: Vec<String>,
    pub logical_names: Vec<String>,
    pub physical_iana_types: Vec<String>,
    pub logical_iana_types: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            prompts: vec![
                PromptPattern {
                    platform: PlatformFamily::Junos,
                    regex: r"^[\w.\-]+@[\w.\-]+[>#%]\s*$".to_string(),
                },
                PromptPattern {
                    platform: PlatformFamily::CiscoIos,
                    regex: r"^[\w.\-/()]+[>#]\s*$".to_string(),
                },
            ],
            generic_prompt: r"^[\w.\-@:~\[\]()/ ]*[>#$%]\s*$".to_string(),
            username_prompt: r"(?:user ?name|login)\s*:\s*$".to_string(),
            password_prompt: r"password\s*:\s*$".to_string(),
            lldp: LldpPatterns::default(),
            cdp: CdpPatterns::default(),
            interface_replacements: vec![
                Replacement::new("TwentyFiveGigabitEthernet", "Twe"),
                Replacement::new("TwentyFiveGigE", "Twe"),
                Replacement::new("HundredGigabitEthernet", "Hu"),
                Replacement::new("HundredGigE", "Hu"),
                Replacement::new("FortyGigabitEthernet", "Fo"),
                Replacement::new("TenGigabitEthernet", "Te"),
                Replacement::new("GigabitEthernet", "Gi"),
                Replacement::new("FastEthernet", "Fa"),
                Replacement::new("Ethernet", "Eth"),
                Replacement::new("Port-channel", "Po"),
                Replacement::new("Bundle-Ether", "BE"),
                Replacement::new("Loopback", "Lo"),
                Replacement::new("Vlan", "Vl"),
                Replacement::new("Tunnel", "Tu"),
                Replacement::new("Serial", "Se"),
                Replacement::new("Management", "mgmt"),
            ],
            physical_names: strings(&[
                r"^(?:Eth(?:ernet)?|Gi(?:gabitEthernet)?|Te(?:nGig(?:abitEthernet|E))?|Fa(?:stEthernet)?|Hu(?:ndredGig(?:abitEthernet|E))?|Twe(?:ntyFiveGig(?:abitEthernet|E))?|Fo(?:rtyGig(?:abitEthernet|E))?)\s?\d[^.]*$",
                r"^(?:mgmt|Management|Serial|Se\d|BRI|Port\s?\d)[^.]*$",
                r"^(?:SFP|XFP|QSFP)[^.]*$",
                r"^(?:em\d|ens\d|eno\d|enp\d+s\d+|lan\d)[^.]*$",
                r"^(?:ge|xe|et)-\d[^.]*$",
            ]),
            stack_member_names: strings(&[r"^[a-z]+-?\d+(?:/\d+){2,}$"]),
            logical_names: strings(&[
                r"^(?:Vlan|Vl|Loopback|Lo|Port-channel|Po|Bundle-Ether|BE\d|ae\d|irb|vme)",
                r"^(?:Tunnel|Tu|Null|Nu|Cpu|Fabric|Voice|Async|Group-Async|ipsec|gre|sit|pimreg)",
                r"^(?:Irq|Service-Engine|Dialer|Virtual-Access|Virtual-Template|Subinterface|BVI|BV|Cellular)",
                r"\.\d+$",
            ]),
            physical_iana_types: strings(&[
                "ethernetCsmacd",
                "fastEther",
                "fastEtherFX",
                "gigabitEthernet",
                "sonet",
                "sdsl",
                "hdsl",
                "shdsl",
                "adsl",
                "radsl",
                "vdsl",
                "ieee80211",
                "opticalChannel",
                "fibreChannel",
                "propPointToPointSerial",
                "ppp",
                "tokenRing",
                "atm",
                "frameRelay",
                "hssi",
                "hippi",
                "isdn",
                "x25",
                "modem",
                "docsCableMaclayer",
                "docsCableDownstream",
                "docsCableUpstream",
            ]),
            logical_iana_types: strings(&[
                "l3ipvlan",
                "softwareLoopback",
                "tunnel",
                "propMultiplexor",
                "bridge",
                "other",
                "l2vlan",
                "voiceOverIp",
                "atmSubInterface",
                "propVirtual",
                "ieee8023adLag",
                "mpls",
            ]),
        }
    }
}

/// Which per-row capacity the stack threshold is scaled from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StackBase {
    Normal,
    Large,
}

/// Geometry constants for the layout engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub devices_per_row: usize,
    pub start_x: f64,
    pub start_y: f64,
    pub grid_margin_x: f64,
    pub grid_margin_y: f64,
    /// Clearance kept between device footprints when the margins are too small
    pub grid_min_gap: f64,

    pub max_physical_ports_for_chassis_display: usize,
    pub ports_per_row_normal: usize,
    pub ports_per_row_large: usize,

    pub port_width: f64,
    pub port_height: f64,
    pub port_horizontal_spacing: f64,
    pub port_vertical_spacing: f64,
    pub port_row_offset_y: f64,
    pub chassis_padding_x: f64,
    pub chassis_padding_y: f64,
    pub min_chassis_width: f64,
    pub min_chassis_height: f64,
    pub default_chassis_height_no_ports: f64,
    pub chassis_page_gap: f64,

    pub waypoint_offset: f64,

    pub label_line_height: f64,
    pub label_padding: f64,
    pub alias_line_extension: f64,
    pub alias_label_offset: f64,
    pub alias_label_x_offset: f64,
    pub alias_label_min_height: f64,
    pub alias_label_max_height: f64,
    pub info_label_min_width: f64,
    pub info_label_max_width: f64,
    pub info_label_margin: f64,
    pub info_label_max_height: f64,
    pub physical_port_list_max_height: f64,
    pub logical_if_list_max_height: f64,

    pub stack_detection_base: StackBase,
    pub stack_detection_factor: f64,
    pub stack_detection_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            devices_per_row: 3,
            start_x: 200.0,
            start_y: 100.0,
            grid_margin_x: 450.0,
            grid_margin_y: 350.0,
            grid_min_gap: 40.0,
            max_physical_ports_for_chassis_display: 110,
            ports_per_row_normal: 28,
            ports_per_row_large: 55,
            port_width: 20.0,
            port_height: 20.0,
            port_horizontal_spacing: 10.0,
            port_vertical_spacing: 15.0,
            port_row_offset_y: 7.0,
            chassis_padding_x: 15.0,
            chassis_padding_y: 7.0,
            min_chassis_width: 100.0,
            min_chassis_height: 60.0,
            default_chassis_height_no_ports: 40.0,
            chassis_page_gap: 10.0,
            waypoint_offset: 20.0,
            label_line_height: 10.0,
            label_padding: 4.0,
            alias_line_extension: 25.0,
            alias_label_offset: 5.0,
            alias_label_x_offset: 3.0,
            alias_label_min_height: 15.0,
            alias_label_max_height: 120.0,
            info_label_min_width: 120.0,
            info_label_max_width: 250.0,
            info_label_margin: 30.0,
            info_label_max_height: 500.0,
            physical_port_list_max_height: 200.0,
            logical_if_list_max_height: 150.0,
            stack_detection_base: StackBase::Normal,
            stack_detection_factor: 2.0,
            stack_detection_offset: 4.0,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.devices_per_row == 0 {
            return Err(ValidationError::InvalidLayout(
                "devices_per_row must be at least 1".to_string(),
            ));
        }
        if self.ports_per_row_normal == 0 || self.ports_per_row_large == 0 {
            return Err(ValidationError::InvalidLayout(
                "ports_per_row_normal and ports_per_row_large must be at least 1".to_string(),
            ));
        }
        if self.max_physical_ports_for_chassis_display == 0 {
            return Err(ValidationError::InvalidLayout(
                "max_physical_ports_for_chassis_display must be at least 1".to_string(),
            ));
        }
        let positive = [
            ("port_width", self.port_width),
            ("port_height", self.port_height),
            ("label_line_height", self.label_line_height),
            ("min_chassis_width", self.min_chassis_width),
            ("min_chassis_height", self.min_chassis_height),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ValidationError::InvalidLayout(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.info_label_min_width > self.info_label_max_width {
            return Err(ValidationError::InvalidLayout(
                "info_label_min_width exceeds info_label_max_width".to_string(),
            ));
        }
        if self.alias_label_min_height > self.alias_label_max_height {
            return Err(ValidationError::InvalidLayout(
                "alias_label_min_height exceeds alias_label_max_height".to_string(),
            ));
        }
        if self.stack_detection_factor < 0.0 {
            return Err(ValidationError::InvalidLayout(
                "stack_detection_factor cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.discovery.workers, 8);
        assert_eq!(config.discovery.snmp.communities, vec!["public".to_string()]);
        assert_eq!(config.layout.devices_per_row, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_humantime_durations() {
        let yaml = r#"
discovery:
  snmp:
    timeout: 750ms
  cli:
    connect_timeout: 3s
    neighbor_command_timeout: 2m
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.discovery.snmp.timeout, Duration::from_millis(750));
        assert_eq!(config.discovery.cli.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.discovery.cli.neighbor_command_timeout, Duration::from_secs(120));
        // untouched fields keep their defaults
        assert_eq!(config.discovery.cli.attempts, 2);
    }

    #[test]
    fn test_cli_protocol_and_port() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.discovery.cli.protocol, CliProtocol::Ssh);
        assert_eq!(config.discovery.cli.port(), 22);
        assert!(config.discovery.snmp.forwarding_tables);

        let yaml = "discovery:\n  cli:\n    protocol: telnet\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.discovery.cli.port(), 23);

        let yaml = "discovery:\n  cli:\n    protocol: telnet\n    port: 2323\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.discovery.cli.port(), 2323);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let yaml = "discovery:\n  workers: 0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDiscovery(_))
        ));
    }

    #[test]
    fn test_empty_communities_rejected_only_when_snmp_enabled() {
        let yaml = "discovery:\n  snmp:\n    communities: []\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = "discovery:\n  snmp:\n    enabled: false\n    communities: []\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_regex_names_field() {
        let yaml = "patterns:\n  lldp:\n    system_name: \"(unclosed\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        match config.validate() {
            Err(ValidationError::InvalidPattern { field, .. }) => {
                assert_eq!(field, "lldp.system_name")
            }
            other => panic!("expected pattern error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_idempotent_replacement_rejected() {
        let yaml = r#"
patterns:
  interface_replacements:
    - { from: "Gig", to: "GigabitEthernet" }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidReplacement(_))
        ));
    }

    #[test]
    fn test_layout_bounds_checked() {
        let yaml = "layout:\n  info_label_min_width: 300\n  info_label_max_width: 200\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_platform_names_in_yaml() {
        let yaml = "discovery:\n  cli:\n    cdp_skip_platforms: [junos, generic]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.discovery.cli.cdp_skip_platforms,
            vec![PlatformFamily::Junos, PlatformFamily::Generic]
        );
    }
}

//! Per-device discovery: SNMP first, CLI as fallback.
//!
//! When a device answers SNMP but reports no LLDP or CDP neighbors, its
//! forwarding tables (Q-BRIDGE, BRIDGE and ARP) are read instead so links can
//! be inferred from learned MAC addresses once every device is in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::credentials::CredentialStore;
use super::platform::{PlatformFamily, PromptSet};
use super::session::{CommandOutput, Session, SessionState};
use super::transport::TransportFactory;
use crate::config::DiscoveryConfig;
use crate::parser::NeighborRecord;
use crate::snmp::{mib, Agent, ForwardingEntry, InterfaceEntry, SnmpClient, SnmpError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Reachable,
    Partial,
    Unreachable,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceStatus::Reachable => "reachable",
            DeviceStatus::Partial => "partial",
            DeviceStatus::Unreachable => "unreachable",
        };
        f.write_str(label)
    }
}

/// Everything learned about one target
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub address: String,
    pub system_name: Option<String>,
    pub status: DeviceStatus,
    pub platform: Option<PlatformFamily>,
    pub interfaces: Vec<InterfaceEntry>,
    /// Neighbors read from LLDP-MIB / CISCO-CDP-MIB
    pub neighbors: Vec<NeighborRecord>,
    /// MAC addresses learned per port, read only when `neighbors` is empty
    pub forwarding: Vec<ForwardingEntry>,
    /// Raw CLI output, parsed later off the probing threads
    pub command_outputs: Vec<CommandOutput>,
    /// Why a strategy failed or degraded
    pub notes: Vec<String>,
    pub session_history: Vec<SessionState>,
}

impl ProbeReport {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            system_name: None,
            status: DeviceStatus::Unreachable,
            platform: None,
            interfaces: Vec::new(),
            neighbors: Vec::new(),
            forwarding: Vec::new(),
            command_outputs: Vec::new(),
            notes: Vec::new(),
            session_history: Vec::new(),
        }
    }

    fn has_neighbor_data(&self) -> bool {
        !self.neighbors.is_empty()
            || !self.forwarding.is_empty()
            || self
                .command_outputs
                .iter()
                .any(|o| o.protocol.is_some() && !o.output.trim().is_empty())
    }

    fn settle_status(&mut self) {
        let identity = self.system_name.is_some();
        let neighbors = self.has_neighbor_data();
        self.status = if identity && neighbors {
            DeviceStatus::Reachable
        } else if identity || neighbors || !self.interfaces.is_empty() {
            DeviceStatus::Partial
        } else {
            DeviceStatus::Unreachable
        };
    }
}

type TableReader =
    fn(&dyn SnmpClient, &Agent, &HashMap<u32, String>, usize) -> Result<Vec<ForwardingEntry>, SnmpError>;

/// Forwarding tables in the order they are read
const FORWARDING_TABLES: [(&str, TableReader); 3] = [
    ("qbridge", mib::qbridge_fdb),
    ("fdb", mib::bridge_fdb),
    ("arp", mib::arp_cache),
];

/// Shared, read-only context for probing any number of devices
pub struct Prober<'a> {
    config: &'a DiscoveryConfig,
    prompts: &'a PromptSet,
    snmp: &'a dyn SnmpClient,
    transports: &'a dyn TransportFactory,
    credentials: &'a CredentialStore,
}

impl<'a> Prober<'a> {
    pub fn new(
        config: &'a DiscoveryConfig,
        prompts: &'a PromptSet,
        snmp: &'a dyn SnmpClient,
        transports: &'a dyn TransportFactory,
        credentials: &'a CredentialStore,
    ) -> Self {
        Self {
            config,
            prompts,
            snmp,
            transports,
            credentials,
        }
    }

    pub fn probe(&self, address: &str) -> ProbeReport {
        log::info!("Probing {}", address);
        let mut report = ProbeReport::new(address);

        if self.config.snmp.enabled {
            self.probe_snmp(&mut report);
        }

        let missing_identity = report.system_name.is_none() && report.interfaces.is_empty();
        if self.config.cli.enabled && (missing_identity || report.neighbors.is_empty()) {
            self.probe_cli(&mut report);
        }

        report.settle_status();
        log::info!(
            "Finished {} ({}): {} interfaces, {} SNMP neighbors, {} forwarding entries, {} command outputs",
            address,
            report.status,
            report.interfaces.len(),
            report.neighbors.len(),
            report.forwarding.len(),
            report.command_outputs.len()
        );
        report
    }

    /// First community that answers `sysName.0` wins; the rest are not tried
    fn accept_community(&self, report: &mut ProbeReport) -> Option<Agent> {
        let snmp = &self.config.snmp;
        for (index, community) in snmp.communities.iter().enumerate() {
            let agent = Agent {
                address: report.address.clone(),
                port: snmp.port,
                community: community.clone(),
            };
            match mib::system_name(self.snmp, &agent) {
                Ok(name) => {
                    log::debug!("{}: SNMP community #{} accepted", report.address, index);
                    report.system_name = name;
                    return Some(agent);
                }
                Err(e) => {
                    log::debug!("{}: SNMP community #{} failed: {}", report.address, index, e);
                    report.notes.push(format!("snmp community #{}: {}", index, e));
                }
            }
        }
        None
    }

    fn probe_snmp(&self, report: &mut ProbeReport) {
        let Some(agent) = self.accept_community(report) else {
            return;
        };
        let limit = self.config.snmp.max_walk_entries;

        match mib::interfaces(self.snmp, &agent, limit) {
            Ok(entries) => report.interfaces = entries,
            Err(e) => report.notes.push(format!("snmp interfaces: {}", e)),
        }
        let if_names: HashMap<u32, String> = report
            .interfaces
            .iter()
            .map(|i| (i.if_index, i.name.clone()))
            .collect();

        match mib::lldp_neighbors(self.snmp, &agent, &if_names, limit) {
            Ok(records) => report.neighbors.extend(records),
            Err(e) => report.notes.push(format!("snmp lldp: {}", e)),
        }
        match mib::cdp_neighbors(self.snmp, &agent, &if_names, limit) {
            Ok(records) => report.neighbors.extend(records),
            Err(e) => report.notes.push(format!("snmp cdp: {}", e)),
        }

        if report.neighbors.is_empty() && self.config.snmp.forwarding_tables {
            log::debug!("{}: no LLDP/CDP neighbors, reading forwarding tables", report.address);
            for (label, read) in FORWARDING_TABLES {
                match read(self.snmp, &agent, &if_names, limit) {
                    Ok(entries) => report.forwarding.extend(entries),
                    Err(e) => report.notes.push(format!("snmp {}: {}", label, e)),
                }
            }
        }
    }

    fn probe_cli(&self, report: &mut ProbeReport) {
        let address = report.address.clone();
        let credentials = self.credentials.for_target(&address);
        let hint = self.credentials.platform_for(&address);

        let mut session = Session::new(&self.config.cli, self.prompts);
        let result = session.run(self.transports, &address, credentials, hint);
        report.session_history = session.history().to_vec();
        match result {
            Ok(transcript) => {
                if report.system_name.is_none() && !transcript.hostname.is_empty() {
                    report.system_name = Some(transcript.hostname.clone());
                }
                report.platform = Some(transcript.platform);
                report.command_outputs = transcript.outputs;
            }
            Err(e) => {
                log::warn!("{}: CLI discovery failed: {}", address, e);
                report.notes.push(format!("cli: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, PatternConfig, SnmpConfig};
    use crate::discovery::session::tests::{fast_cli, ScriptedTransport};
    use crate::discovery::transport::Transport;
    use crate::parser::DiscoverySource;
    use crate::snmp::mib::tests::{bridge_mib, switch_mib, MemoryMib};
    use crate::snmp::{Oid, SnmpValue, VarBind};
    use std::sync::Mutex;

    /// Only answers for one community string
    struct CommunityGate {
        accepted: String,
        inner: MemoryMib,
        seen: Mutex<Vec<String>>,
    }

    impl SnmpClient for CommunityGate {
        fn get(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError> {
            self.seen.lock().unwrap().push(agent.community.clone());
            if agent.community != self.accepted {
                return Err(SnmpError::Timeout { attempts: 1 });
            }
            self.inner.get(agent, oid)
        }

        fn get_next(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError> {
            if agent.community != self.accepted {
                return Err(SnmpError::Timeout { attempts: 1 });
            }
            self.inner.get_next(agent, oid)
        }
    }

    struct Scripts(Mutex<Vec<ScriptedTransport>>);

    impl TransportFactory for Scripts {
        fn create(&self) -> Box<dyn Transport> {
            let next = self.0.lock().unwrap().pop();
            Box::new(next.unwrap_or_else(|| {
                let mut dead = ScriptedTransport::new("");
                dead.refuse = true;
                dead
            }))
        }
    }

    fn config(communities: &[&str], cli: CliConfig) -> DiscoveryConfig {
        DiscoveryConfig {
            workers: 1,
            snmp: SnmpConfig {
                communities: communities.iter().map(|c| c.to_string()).collect(),
                ..SnmpConfig::default()
            },
            cli,
        }
    }

    #[test]
    fn test_first_answering_community_wins() {
        let gate = CommunityGate {
            accepted: "private".to_string(),
            inner: switch_mib(),
            seen: Mutex::new(Vec::new()),
        };
        let cfg = config(&["public", "private", "never"], fast_cli());
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let transports = Scripts(Mutex::new(Vec::new()));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &gate, &transports, &creds);

        let report = prober.probe("192.0.2.10");
        assert_eq!(report.system_name.as_deref(), Some("access-1"));
        assert_eq!(report.status, DeviceStatus::Reachable);
        assert_eq!(report.interfaces.len(), 3);
        assert_eq!(report.neighbors.len(), 3);
        // the third community is never tried
        let seen = gate.seen.lock().unwrap();
        assert!(!seen.iter().any(|c| c == "never"));
        assert_eq!(seen[0], "public");
        // SNMP gave neighbors, so no CLI session
        assert!(report.session_history.is_empty());
        assert!(report.notes.iter().all(|n| !n.contains("private")));
    }

    #[test]
    fn test_cli_fallback_when_snmp_silent() {
        let gate = CommunityGate {
            accepted: "nothing-matches".to_string(),
            inner: MemoryMib::default(),
            seen: Mutex::new(Vec::new()),
        };
        let cfg = config(&["public"], fast_cli());
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let device = ScriptedTransport::new("edge-2#")
            .on("terminal length 0", "edge-2#")
            .on(
                "show lldp",
                "show lldp neighbors detail\nChassis id: 1\nLocal Port id: Gi0/1\nSystem Name: core-1\nPort id: Gi0/9\nedge-2#",
            )
            .on("show cdp", "edge-2#");
        let transports = Scripts(Mutex::new(vec![device]));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &gate, &transports, &creds);

        let report = prober.probe("192.0.2.20");
        assert_eq!(report.system_name.as_deref(), Some("edge-2"));
        assert_eq!(report.platform, Some(PlatformFamily::CiscoIos));
        assert_eq!(report.status, DeviceStatus::Reachable);
        assert_eq!(report.notes.len(), 1);
        assert_eq!(report.session_history.last(), Some(&SessionState::Disconnected));
    }

    #[test]
    fn test_nothing_learned_is_unreachable() {
        let gate = CommunityGate {
            accepted: "x".to_string(),
            inner: MemoryMib::default(),
            seen: Mutex::new(Vec::new()),
        };
        let cfg = config(&["public"], fast_cli());
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let transports = Scripts(Mutex::new(Vec::new()));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &gate, &transports, &creds);

        let report = prober.probe("192.0.2.30");
        assert_eq!(report.status, DeviceStatus::Unreachable);
        assert_eq!(report.notes.len(), 2);
        assert_eq!(report.session_history.last(), Some(&SessionState::Failed));
    }

    #[test]
    fn test_identity_without_neighbors_is_partial() {
        let mut mib = MemoryMib::default();
        mib.text("1.3.6.1.2.1.1.5.0", "lonely");
        let cli = CliConfig {
            enabled: false,
            ..fast_cli()
        };
        let cfg = config(&["public"], cli);
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let transports = Scripts(Mutex::new(Vec::new()));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &mib, &transports, &creds);

        let report = prober.probe("192.0.2.40");
        assert_eq!(report.system_name.as_deref(), Some("lonely"));
        assert_eq!(report.status, DeviceStatus::Partial);
    }

    #[test]
    fn test_forwarding_tables_when_no_neighbors() {
        let mib = bridge_mib();
        let cli = CliConfig {
            enabled: false,
            ..fast_cli()
        };
        let cfg = config(&["public"], cli);
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let transports = Scripts(Mutex::new(Vec::new()));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &mib, &transports, &creds);

        let report = prober.probe("192.0.2.50");
        assert!(report.neighbors.is_empty());
        let sources: Vec<_> = report.forwarding.iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![DiscoverySource::SnmpQBridge, DiscoverySource::SnmpFdb, DiscoverySource::SnmpArp]
        );
        assert_eq!(report.forwarding[0].local_port, "GigabitEthernet0/2");
        assert_eq!(report.forwarding[0].vlan, Some(20));
        assert_eq!(report.status, DeviceStatus::Reachable);
    }

    #[test]
    fn test_forwarding_tables_skipped_with_neighbors_or_disabled() {
        let mut mib = switch_mib();
        mib.set("1.3.6.1.2.1.17.1.4.1.2.1", SnmpValue::Integer(1));
        mib.set("1.3.6.1.2.1.17.4.3.1.2.0.27.84.170.0.1", SnmpValue::Integer(1));
        let cfg = config(&["public"], fast_cli());
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let transports = Scripts(Mutex::new(Vec::new()));
        let creds = CredentialStore::default();
        let prober = Prober::new(&cfg, &prompts, &mib, &transports, &creds);
        let report = prober.probe("192.0.2.10");
        assert_eq!(report.neighbors.len(), 3);
        assert!(report.forwarding.is_empty());

        let mut cfg = config(&["public"], CliConfig { enabled: false, ..fast_cli() });
        cfg.snmp.forwarding_tables = false;
        let bridge = bridge_mib();
        let prober = Prober::new(&cfg, &prompts, &bridge, &transports, &creds);
        let report = prober.probe("192.0.2.50");
        assert!(report.forwarding.is_empty());
        assert_eq!(report.status, DeviceStatus::Partial);
    }
}

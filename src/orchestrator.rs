//! Discovery pipeline orchestrator.
//!
//! This module coordinates a whole run: every target is probed on a bounded
//! worker pool, then, once all probes are in, collected CLI output is parsed,
//! the results are merged into one graph by a single writer, and the layout
//! engine computes the geometric model.

use chrono::Utc;
use color_eyre::eyre::{Context, Result};
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::config::{CliProtocol, CompiledPatterns, Config};
use crate::discovery::{
    CredentialStore, ProbeReport, Prober, SshTransportFactory, TcpTransportFactory, TransportFactory,
};
use crate::layout::{compute_layout, LayoutModel};
use crate::parser::{NeighborProtocol, NeighborRecord, ParseOutcome};
use crate::render;
use crate::report::{DeviceStatusRecord, DiscoveryReport, ParseWarning};
use crate::snmp::{SnmpClient, UdpSnmpClient};
use crate::topology::{GraphBuilder, GraphWarning, MacDirectory, TopologyGraph};

/// Neighbor records parsed from one device's CLI output
struct ParsedOutputs {
    records: Vec<NeighborRecord>,
    warnings: Vec<ParseWarning>,
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryOutcome {
    pub graph: TopologyGraph,
    pub layout: LayoutModel,
    #[serde(skip)]
    pub report: DiscoveryReport,
}

impl DiscoveryOutcome {
    /// Write the model, report, connection lists and diagram into `dir`
    pub fn write_outputs(&self, dir: &Path, line_height: f64) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let topology_path = dir.join("topology.json");
        let json = serde_json::to_string_pretty(self).context("Failed to serialize topology model")?;
        fs::write(&topology_path, json)
            .with_context(|| format!("Failed to write {}", topology_path.display()))?;

        self.report.write_json(&dir.join("report.json"))?;
        render::write_connections(&self.graph, dir)?;
        render::write_svg(&self.graph, &self.layout, line_height, &dir.join("diagram.svg"))?;
        Ok(())
    }
}

pub struct Discovery {
    config: Config,
    patterns: CompiledPatterns,
    snmp: Box<dyn SnmpClient>,
    transports: Box<dyn TransportFactory>,
    credentials: CredentialStore,
}

impl Discovery {
    pub fn new(
        config: Config,
        snmp: Box<dyn SnmpClient>,
        transports: Box<dyn TransportFactory>,
        credentials: CredentialStore,
    ) -> Result<Self> {
        let patterns = config.compile().wrap_err("Failed to compile configured patterns")?;
        Ok(Self {
            config,
            patterns,
            snmp,
            transports,
            credentials,
        })
    }

    /// Discovery over UDP SNMP and SSH (or telnet) CLI sessions
    pub fn with_network(config: Config, credentials: CredentialStore) -> Result<Self> {
        let snmp = UdpSnmpClient::new(config.discovery.snmp.timeout, config.discovery.snmp.retries);
        let transports: Box<dyn TransportFactory> = match config.discovery.cli.protocol {
            CliProtocol::Ssh => Box::new(SshTransportFactory),
            CliProtocol::Telnet => Box::new(TcpTransportFactory),
        };
        Self::new(config, Box::new(snmp), transports, credentials)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline over `targets`.
    ///
    /// Per-device failures never surface as `Err`; they end up in the
    /// report. Only failing to build the worker pool is an error.
    pub fn run(&self, targets: &[String]) -> Result<DiscoveryOutcome> {
        let started_at = Utc::now();
        let workers = self.config.discovery.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("Failed to build discovery worker pool")?;

        info!("Probing {} targets with {} workers", targets.len(), workers);
        let phase = Instant::now();
        let prober = Prober::new(
            &self.config.discovery,
            &self.patterns.prompts,
            self.snmp.as_ref(),
            self.transports.as_ref(),
            &self.credentials,
        );
        let probes: Vec<ProbeReport> = pool.install(|| targets.par_iter().map(|t| prober.probe(t)).collect());
        info!("Probing finished in {:.2?}", phase.elapsed());

        let phase = Instant::now();
        let parsed: Vec<ParsedOutputs> = pool.install(|| probes.par_iter().map(|p| self.parse_outputs(p)).collect());
        info!("Parsing finished in {:.2?}", phase.elapsed());

        let phase = Instant::now();
        let (graph, graph_warnings) = self.merge(&probes, &parsed);
        info!(
            "Graph: {} devices, {} links ({:.2?})",
            graph.devices.len(),
            graph.links.len(),
            phase.elapsed()
        );

        let phase = Instant::now();
        let layout = compute_layout(&graph, &self.config.layout);
        info!("Layout finished in {:.2?}", phase.elapsed());

        let report = DiscoveryReport {
            started_at,
            finished_at: Utc::now(),
            devices: probes.iter().map(DeviceStatusRecord::from).collect(),
            parse_warnings: parsed.into_iter().flat_map(|p| p.warnings).collect(),
            graph_warnings,
        };
        info!("{}", report.summary());

        Ok(DiscoveryOutcome { graph, layout, report })
    }

    fn parse_outputs(&self, probe: &ProbeReport) -> ParsedOutputs {
        let mut parsed = ParsedOutputs {
            records: Vec::new(),
            warnings: Vec::new(),
        };
        for output in &probe.command_outputs {
            let outcome: ParseOutcome = match output.protocol {
                Some(NeighborProtocol::Lldp) => self.patterns.lldp.parse(&output.output),
                Some(NeighborProtocol::Cdp) => self.patterns.cdp.parse(&output.output),
                None => continue,
            };
            parsed.records.extend(outcome.records);
            parsed
                .warnings
                .extend(outcome.skipped.into_iter().map(|s| ParseWarning::new(&probe.address, s)));
        }
        parsed
    }

    /// Single-writer merge: every probed device first, then all neighbors,
    /// then links inferred from forwarding tables
    fn merge(&self, probes: &[ProbeReport], parsed: &[ParsedOutputs]) -> (TopologyGraph, Vec<GraphWarning>) {
        let mut builder = GraphBuilder::new(&self.patterns.classifier, &self.patterns.normalizer);
        let macs = MacDirectory::from_probes(probes);
        let ids: Vec<_> = probes.iter().map(|p| builder.add_probe(p)).collect();
        for ((probe, parsed), id) in probes.iter().zip(parsed).zip(ids) {
            let Some(id) = id else {
                continue;
            };
            builder.add_neighbors(id, &probe.neighbors);
            builder.add_neighbors(id, &parsed.records);
            if !probe.forwarding.is_empty() {
                builder.add_neighbors(id, &macs.neighbors_for(probe));
            }
        }
        builder.finish()
    }
}

//! Operator-facing discovery report.
//!
//! Metadata kept alongside the graph rather than inside it: per-target
//! status, skipped neighbor blocks and graph merge warnings.

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::discovery::{DeviceStatus, PlatformFamily, ProbeReport};
use crate::parser::{NeighborProtocol, ParseSkip};
use crate::topology::GraphWarning;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusRecord {
    pub address: String,
    pub name: Option<String>,
    pub status: DeviceStatus,
    pub platform: Option<PlatformFamily>,
    pub notes: Vec<String>,
}

impl From<&ProbeReport> for DeviceStatusRecord {
    fn from(probe: &ProbeReport) -> Self {
        Self {
            address: probe.address.clone(),
            name: probe.system_name.clone(),
            status: probe.status,
            platform: probe.platform,
            notes: probe.notes.clone(),
        }
    }
}

/// A neighbor block dropped by a parser
#[derive(Debug, Clone, Serialize)]
pub struct ParseWarning {
    /// Address of the device whose output was parsed
    pub device: String,
    pub protocol: NeighborProtocol,
    pub block_index: usize,
    pub reason: String,
    pub excerpt: String,
}

impl ParseWarning {
    pub fn new(device: &str, skip: ParseSkip) -> Self {
        Self {
            device: device.to_string(),
            protocol: skip.protocol,
            block_index: skip.block_index,
            reason: skip.reason,
            excerpt: skip.excerpt,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub devices: Vec<DeviceStatusRecord>,
    pub parse_warnings: Vec<ParseWarning>,
    pub graph_warnings: Vec<GraphWarning>,
}

impl DiscoveryReport {
    pub fn count(&self, status: DeviceStatus) -> usize {
        self.devices.iter().filter(|d| d.status == status).count()
    }

    /// One-line summary for the log
    pub fn summary(&self) -> String {
        let elapsed = self.finished_at - self.started_at;
        format!(
            "{} targets: {} reachable, {} partial, {} unreachable; {} parse warnings, {} graph warnings ({:.1}s)",
            self.devices.len(),
            self.count(DeviceStatus::Reachable),
            self.count(DeviceStatus::Partial),
            self.count(DeviceStatus::Unreachable),
            self.parse_warnings.len(),
            self.graph_warnings.len(),
            elapsed.num_milliseconds() as f64 / 1000.0
        )
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Discovery report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(address: &str, status: DeviceStatus) -> DeviceStatusRecord {
        DeviceStatusRecord {
            address: address.to_string(),
            name: None,
            status,
            platform: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let started_at = Utc::now();
        let report = DiscoveryReport {
            started_at,
            finished_at: started_at + Duration::milliseconds(2500),
            devices: vec![
                record("10.0.0.1", DeviceStatus::Reachable),
                record("10.0.0.2", DeviceStatus::Reachable),
                record("10.0.0.3", DeviceStatus::Unreachable),
            ],
            parse_warnings: vec![ParseWarning::new(
                "10.0.0.1",
                ParseSkip {
                    protocol: NeighborProtocol::Lldp,
                    block_index: 2,
                    reason: "no fields recognised".to_string(),
                    excerpt: "garbage".to_string(),
                },
            )],
            graph_warnings: Vec::new(),
        };
        assert_eq!(
            report.summary(),
            "3 targets: 2 reachable, 0 partial, 1 unreachable; 1 parse warnings, 0 graph warnings (2.5s)"
        );
    }

    #[test]
    fn test_json_shape() {
        let now = Utc::now();
        let report = DiscoveryReport {
            started_at: now,
            finished_at: now,
            devices: vec![record("10.0.0.9", DeviceStatus::Partial)],
            parse_warnings: Vec::new(),
            graph_warnings: vec![GraphWarning::SelfLink {
                device: "sw1".to_string(),
                port: "Gi1/0/1".to_string(),
            }],
        };
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["devices"][0]["status"], "partial");
        assert_eq!(value["graph_warnings"][0]["kind"], "self_link");
    }
}

//! Connection list export.
//!
//! One row per link, sorted by local device then local port.

use serde::Serialize;
use std::cmp::Ordering;

use crate::topology::{Endpoint, TopologyGraph};
use crate::utils::natural_cmp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRow {
    pub local_device: String,
    pub local_port: String,
    pub remote_device: String,
    pub remote_port: String,
    pub vlan: Option<String>,
    pub discovery_method: String,
}

impl ConnectionRow {
    /// `A:Gi1/0/1 -> B:Gi1/0/2 (VLAN 10) via LLDP`
    pub fn to_line(&self) -> String {
        let vlan = match &self.vlan {
            Some(v) => format!(" (VLAN {})", v),
            None => String::new(),
        };
        format!(
            "{}:{} -> {}:{}{} via {}",
            self.local_device, self.local_port, self.remote_device, self.remote_port, vlan, self.discovery_method
        )
    }
}

fn device_name(graph: &TopologyGraph, endpoint: &Endpoint) -> String {
    graph
        .device(endpoint.device)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| endpoint.device.to_string())
}

pub fn connection_rows(graph: &TopologyGraph) -> Vec<ConnectionRow> {
    let mut rows: Vec<ConnectionRow> = graph
        .links
        .iter()
        .map(|link| ConnectionRow {
            local_device: device_name(graph, &link.a),
            local_port: link.a.interface.clone(),
            remote_device: device_name(graph, &link.b),
            remote_port: link.b.interface.clone(),
            vlan: link.vlan.clone(),
            discovery_method: link.source.to_string(),
        })
        .collect();
    rows.sort_by(|x, y| match natural_cmp(&x.local_device, &y.local_device) {
        Ordering::Equal => natural_cmp(&x.local_port, &y.local_port),
        other => other,
    });
    rows
}

pub fn connections_text(graph: &TopologyGraph) -> String {
    let mut text = String::new();
    for row in connection_rows(graph) {
        text.push_str(&row.to_line());
        text.push('\n');
    }
    text
}

pub fn connections_json(graph: &TopologyGraph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&connection_rows(graph))
}

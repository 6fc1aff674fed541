//! SNMPv2c over UDP, on `async-snmp`.
//!
//! The discovery workers are plain threads, so every call blocks on the
//! calling worker's current-thread runtime (see [`crate::utils::runtime`]).

use std::time::Duration;

use async_snmp::{Auth, Client, Retry, UdpClient};

use super::{continues_walk, Agent, Oid, SnmpClient, SnmpError, SnmpValue, VarBind};
use crate::utils::runtime;

/// Blocking client; one UDP client per request or walk, retried on silence
#[derive(Debug, Clone)]
pub struct UdpSnmpClient {
    timeout: Duration,
    retries: u32,
}

impl UdpSnmpClient {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }

    async fn connect(&self, agent: &Agent) -> Result<UdpClient, SnmpError> {
        Client::builder(target(agent), Auth::v2c(agent.community.as_str()))
            .timeout(self.timeout)
            .retry(Retry::fixed(self.retries, Duration::ZERO))
            .connect()
            .await
            .map_err(convert_error)
    }
}

/// `host:port`, bracketing IPv6 literals
fn target(agent: &Agent) -> String {
    if agent.address.contains(':') && !agent.address.starts_with('[') {
        format!("[{}]:{}", agent.address, agent.port)
    } else {
        format!("{}:{}", agent.address, agent.port)
    }
}

fn convert_error(e: async_snmp::Error) -> SnmpError {
    match e {
        async_snmp::Error::Timeout { retries, .. } => SnmpError::Timeout { attempts: retries + 1 },
        async_snmp::Error::Snmp { status, .. } => SnmpError::ErrorStatus(format!("{:?}", status)),
        other => SnmpError::Protocol(other.to_string()),
    }
}

fn wire_oid(oid: &Oid) -> async_snmp::Oid {
    async_snmp::Oid::from_slice(oid.arcs())
}

fn convert_value(value: async_snmp::Value) -> SnmpValue {
    use async_snmp::Value;
    match value {
        Value::Integer(v) => SnmpValue::Integer(i64::from(v)),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::Null => SnmpValue::Null,
        Value::ObjectIdentifier(oid) => SnmpValue::ObjectId(Oid::from_arcs(oid.arcs().to_vec())),
        Value::IpAddress(octets) => SnmpValue::IpAddress(octets),
        Value::Counter32(v) => SnmpValue::Counter32(v),
        Value::Gauge32(v) => SnmpValue::Gauge32(v),
        Value::TimeTicks(v) => SnmpValue::TimeTicks(v),
        Value::Counter64(v) => SnmpValue::Counter64(v),
        Value::Opaque(bytes) => SnmpValue::Opaque(bytes.to_vec()),
        Value::NoSuchObject => SnmpValue::NoSuchObject,
        Value::NoSuchInstance => SnmpValue::NoSuchInstance,
        Value::EndOfMibView => SnmpValue::EndOfMibView,
        // types discovery never reads
        _ => SnmpValue::Null,
    }
}

fn convert_varbind(vb: async_snmp::VarBind) -> VarBind {
    VarBind {
        oid: Oid::from_arcs(vb.oid.arcs().to_vec()),
        value: convert_value(vb.value),
    }
}

impl SnmpClient for UdpSnmpClient {
    fn get(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError> {
        runtime::block_on(async {
            let client = self.connect(agent).await?;
            let vb = client.get(&wire_oid(oid)).await.map_err(convert_error)?;
            Ok::<_, SnmpError>(convert_varbind(vb))
        })?
    }

    fn get_next(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError> {
        runtime::block_on(async {
            let client = self.connect(agent).await?;
            let vb = client.get_next(&wire_oid(oid)).await.map_err(convert_error)?;
            Ok::<_, SnmpError>(convert_varbind(vb))
        })?
    }

    /// GETNEXT walk over a single client
    fn walk(&self, agent: &Agent, root: &Oid, limit: usize) -> Result<Vec<VarBind>, SnmpError> {
        runtime::block_on(async {
            let client = self.connect(agent).await?;
            let mut rows = Vec::new();
            let mut cursor = root.clone();
            while rows.len() < limit {
                let vb = client.get_next(&wire_oid(&cursor)).await.map_err(convert_error)?;
                let vb = convert_varbind(vb);
                if !continues_walk(root, &cursor, &vb) {
                    break;
                }
                cursor = vb.oid.clone();
                rows.push(vb);
            }
            log::trace!("{}: walked {} rows under {}", agent.address, rows.len(), root);
            Ok::<_, SnmpError>(rows)
        })?
    }
}

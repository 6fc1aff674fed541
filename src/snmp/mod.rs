//! SNMPv2c access.
//!
//! [`SnmpClient`] is the seam the prober talks to. [`UdpSnmpClient`] is the
//! production implementation on `async-snmp`; tests substitute an in-memory
//! MIB. The [`mib`] module turns raw table walks into interfaces
//! and neighbor records.

pub mod client;
pub mod mib;

use std::fmt;
use std::str::FromStr;

pub use client::UdpSnmpClient;
pub use mib::{ForwardingEntry, InterfaceEntry};

/// Object identifier, ordered the way GETNEXT walks the MIB
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn starts_with(&self, root: &Oid) -> bool {
        self.0.starts_with(&root.0)
    }

    /// Index arcs below `root`, if this OID lies under it
    pub fn suffix(&self, root: &Oid) -> Option<&[u32]> {
        if self.starts_with(root) {
            Some(&self.0[root.0.len()..])
        } else {
            None
        }
    }

    pub fn child(&self, arcs: &[u32]) -> Oid {
        let mut all = self.0.clone();
        all.extend_from_slice(arcs);
        Oid(all)
    }
}

impl FromStr for Oid {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim()
            .trim_start_matches('.')
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SnmpError::InvalidOid(s.to_string()))?;
        if arcs.len() < 2 {
            return Err(SnmpError::InvalidOid(s.to_string()));
        }
        Ok(Oid(arcs))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|a| a.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    /// v2 exception values carried in place of data
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    /// Printable form of the value. Octet strings are decoded lossily and
    /// trailing NULs dropped.
    pub fn as_string(&self) -> Option<String> {
        match self {
            SnmpValue::OctetString(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                Some(text.trim_end_matches('\0').trim().to_string())
            }
            SnmpValue::Integer(v) => Some(v.to_string()),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                Some(v.to_string())
            }
            SnmpValue::Counter64(v) => Some(v.to_string()),
            SnmpValue::IpAddress([a, b, c, d]) => Some(format!("{}.{}.{}.{}", a, b, c, d)),
            SnmpValue::ObjectId(oid) => Some(oid.to_string()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(v) => Some(*v),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                Some(*v as i64)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: SnmpValue,
}

#[derive(Debug, thiserror::Error)]
pub enum SnmpError {
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent returned error status {0}")]
    ErrorStatus(String),
    #[error("SNMP failure: {0}")]
    Protocol(String),
    #[error("invalid OID `{0}`")]
    InvalidOid(String),
}

/// Whether a GETNEXT answer for `cursor` still belongs to the walk of `root`.
/// Leaving the subtree, or an agent that does not advance, ends the walk.
pub(crate) fn continues_walk(root: &Oid, cursor: &Oid, vb: &VarBind) -> bool {
    !vb.value.is_exception() && vb.oid.starts_with(root) && vb.oid > *cursor
}

/// Where and how to reach one agent
#[derive(Clone)]
pub struct Agent {
    pub address: String,
    pub port: u16,
    pub community: String,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("community", &"<redacted>")
            .finish()
    }
}

/// Blocking SNMP operations used by discovery
pub trait SnmpClient: Send + Sync {
    fn get(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError>;

    fn get_next(&self, agent: &Agent, oid: &Oid) -> Result<VarBind, SnmpError>;

    /// Walk the subtree under `root` with GETNEXT, stopping after `limit` rows
    fn walk(&self, agent: &Agent, root: &Oid, limit: usize) -> Result<Vec<VarBind>, SnmpError> {
        let mut rows = Vec::new();
        let mut cursor = root.clone();
        while rows.len() < limit {
            let vb = self.get_next(agent, &cursor)?;
            if !continues_walk(root, &cursor, &vb) {
                break;
            }
            cursor = vb.oid.clone();
            rows.push(vb);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_parse_and_display() {
        let oid: Oid = ".1.3.6.1.2.1.1.5.0".parse().unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.5.0");
        assert!("1.3.x".parse::<Oid>().is_err());
        assert!("1".parse::<Oid>().is_err());
    }

    #[test]
    fn test_oid_order_and_suffix() {
        let root: Oid = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        let a = root.child(&[2]);
        let b = root.child(&[10]);
        assert!(a < b);
        assert_eq!(b.suffix(&root), Some(&[10u32][..]));
        let other: Oid = "1.3.6.1.2.1.2.2.1.3.1".parse().unwrap();
        assert_eq!(other.suffix(&root), None);
    }

    #[test]
    fn test_value_strings() {
        let v = SnmpValue::OctetString(b"core-sw1\0".to_vec());
        assert_eq!(v.as_string().as_deref(), Some("core-sw1"));
        assert_eq!(SnmpValue::IpAddress([10, 0, 0, 1]).as_string().as_deref(), Some("10.0.0.1"));
        assert_eq!(SnmpValue::NoSuchObject.as_string(), None);
        assert!(SnmpValue::EndOfMibView.is_exception());
    }

    #[test]
    fn test_walk_stops_on_stalled_agent() {
        let root: Oid = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        let cursor = root.child(&[5]);
        let text = |oid: Oid| VarBind {
            oid,
            value: SnmpValue::OctetString(b"x".to_vec()),
        };
        assert!(continues_walk(&root, &cursor, &text(root.child(&[6]))));
        assert!(!continues_walk(&root, &cursor, &text(root.child(&[5]))));
        assert!(!continues_walk(&root, &cursor, &text("1.3.6.1.2.1.2.2.1.3.1".parse().unwrap())));
        let end = VarBind {
            oid: root.child(&[7]),
            value: SnmpValue::EndOfMibView,
        };
        assert!(!continues_walk(&root, &cursor, &end));
    }

    #[test]
    fn test_agent_debug_hides_community() {
        let agent = Agent {
            address: "10.0.0.1".to_string(),
            port: 161,
            community: "s3cret".to_string(),
        };
        assert!(!format!("{:?}", agent).contains("s3cret"));
    }
}

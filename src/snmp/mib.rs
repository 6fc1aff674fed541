//! MIB tables discovery reads: system, IF-MIB, LLDP-MIB and CISCO-CDP-MIB,
//! plus the BRIDGE-MIB, Q-BRIDGE-MIB and ARP tables used when a device
//! reports no neighbors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use super::{Agent, Oid, SnmpClient, SnmpError, SnmpValue, VarBind};
use crate::parser::cdp::clean_device_id;
use crate::parser::{DiscoverySource, NeighborRecord};

fn builtin(text: &str) -> Oid {
    text.parse().expect("Invalid built-in OID")
}

/// Well-known object identifiers
pub struct MibOids {
    pub sys_name: Oid,
    pub if_descr: Oid,
    pub if_type: Oid,
    pub if_admin_status: Oid,
    pub if_oper_status: Oid,
    pub if_name: Oid,
    pub if_alias: Oid,
    pub lldp_loc_port_id: Oid,
    pub lldp_rem_port_id: Oid,
    pub lldp_rem_port_desc: Oid,
    pub lldp_rem_sys_name: Oid,
    pub cdp_cache_device_id: Oid,
    pub cdp_cache_device_port: Oid,
    pub if_phys_address: Oid,
    pub dot1d_base_port_if_index: Oid,
    pub dot1d_tp_fdb_port: Oid,
    pub dot1q_tp_fdb_port: Oid,
    pub ip_net_to_media_phys_address: Oid,
}

impl MibOids {
    fn new() -> Self {
        Self {
            sys_name: builtin("1.3.6.1.2.1.1.5.0"),
            if_descr: builtin("1.3.6.1.2.1.2.2.1.2"),
            if_type: builtin("1.3.6.1.2.1.2.2.1.3"),
            if_admin_status: builtin("1.3.6.1.2.1.2.2.1.7"),
            if_oper_status: builtin("1.3.6.1.2.1.2.2.1.8"),
            if_name: builtin("1.3.6.1.2.1.31.1.1.1.1"),
            if_alias: builtin("1.3.6.1.2.1.31.1.1.1.18"),
            lldp_loc_port_id: builtin("1.0.8802.1.1.2.1.3.7.1.3"),
            lldp_rem_port_id: builtin("1.0.8802.1.1.2.1.4.1.1.7"),
            lldp_rem_port_desc: builtin("1.0.8802.1.1.2.1.4.1.1.8"),
            lldp_rem_sys_name: builtin("1.0.8802.1.1.2.1.4.1.1.9"),
            cdp_cache_device_id: builtin("1.3.6.1.4.1.9.9.23.1.2.1.1.6"),
            cdp_cache_device_port: builtin("1.3.6.1.4.1.9.9.23.1.2.1.1.7"),
            if_phys_address: builtin("1.3.6.1.2.1.2.2.1.6"),
            dot1d_base_port_if_index: builtin("1.3.6.1.2.1.17.1.4.1.2"),
            dot1d_tp_fdb_port: builtin("1.3.6.1.2.1.17.4.3.1.2"),
            dot1q_tp_fdb_port: builtin("1.3.6.1.2.1.17.7.1.2.2.1.2"),
            ip_net_to_media_phys_address: builtin("1.3.6.1.2.1.4.22.1.2"),
        }
    }
}

pub static OIDS: LazyLock<MibOids> = LazyLock::new(MibOids::new);

/// One row of the interface table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceEntry {
    pub if_index: u32,
    pub name: String,
    /// Numeric IANAifType as reported
    pub iana_type: Option<String>,
    pub alias: Option<String>,
    pub admin_up: Option<bool>,
    pub oper_up: Option<bool>,
    /// `ifPhysAddress` as 12 lowercase hex digits
    pub mac: Option<String>,
}

/// A MAC address a device has learned behind one of its ports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub source: DiscoverySource,
    pub local_port: String,
    /// 12 lowercase hex digits
    pub mac: String,
    /// Q-BRIDGE filtering database id, which is the VLAN on most switches
    pub vlan: Option<u32>,
    /// IP address the ARP cache binds to the MAC
    pub ip: Option<String>,
}

/// 12 lowercase hex digits. Zero and broadcast addresses identify nothing.
pub fn format_mac(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 6 || bytes.iter().all(|b| *b == 0) || bytes.iter().all(|b| *b == 0xff) {
        return None;
    }
    Some(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}

/// MAC encoded as six index arcs
fn mac_from_arcs(arcs: &[u32]) -> Option<String> {
    let bytes = arcs
        .iter()
        .map(|a| u8::try_from(*a).ok())
        .collect::<Option<Vec<u8>>>()?;
    format_mac(&bytes)
}

fn mac_value(value: &SnmpValue) -> Option<String> {
    match value {
        SnmpValue::OctetString(bytes) => format_mac(bytes),
        _ => None,
    }
}

/// `sysName.0`; `Ok(None)` when the agent answers without a usable name
pub fn system_name(client: &dyn SnmpClient, agent: &Agent) -> Result<Option<String>, SnmpError> {
    let vb = client.get(agent, &OIDS.sys_name)?;
    Ok(vb.value.as_string().filter(|name| !name.is_empty()))
}

/// Walk a column and key its rows by the index arcs below the column OID
fn column(
    client: &dyn SnmpClient,
    agent: &Agent,
    root: &Oid,
    limit: usize,
) -> Result<BTreeMap<Vec<u32>, SnmpValue>, SnmpError> {
    let rows = client.walk(agent, root, limit)?;
    Ok(rows
        .into_iter()
        .filter_map(|VarBind { oid: row, value }| row.suffix(root).map(|s| (s.to_vec(), value)))
        .collect())
}

/// Optional columns degrade to empty on error
fn optional_column(
    client: &dyn SnmpClient,
    agent: &Agent,
    root: &Oid,
    limit: usize,
) -> BTreeMap<Vec<u32>, SnmpValue> {
    column(client, agent, root, limit).unwrap_or_else(|e| {
        log::debug!("{}: walk of {} failed: {}", agent.address, root, e);
        BTreeMap::new()
    })
}

fn single_index(index: &[u32]) -> Option<u32> {
    match index {
        [i] => Some(*i),
        _ => None,
    }
}

fn non_empty(value: &SnmpValue) -> Option<String> {
    value.as_string().filter(|s| !s.is_empty())
}

/// IF-MIB interface inventory ordered by ifIndex
pub fn interfaces(
    client: &dyn SnmpClient,
    agent: &Agent,
    limit: usize,
) -> Result<Vec<InterfaceEntry>, SnmpError> {
    let descr = column(client, agent, &OIDS.if_descr, limit)?;
    let names = optional_column(client, agent, &OIDS.if_name, limit);
    let types = optional_column(client, agent, &OIDS.if_type, limit);
    let aliases = optional_column(client, agent, &OIDS.if_alias, limit);
    let admin = optional_column(client, agent, &OIDS.if_admin_status, limit);
    let oper = optional_column(client, agent, &OIDS.if_oper_status, limit);
    let phys = optional_column(client, agent, &OIDS.if_phys_address, limit);

    let status = |table: &BTreeMap<Vec<u32>, SnmpValue>, key: &Vec<u32>| {
        table.get(key).and_then(SnmpValue::as_i64).map(|v| v == 1)
    };

    let mut entries = Vec::with_capacity(descr.len());
    for (key, value) in &descr {
        let Some(if_index) = single_index(key) else {
            continue;
        };
        let name = names
            .get(key)
            .and_then(non_empty)
            .or_else(|| non_empty(value))
            .unwrap_or_else(|| format!("ifIndex{}", if_index));
        entries.push(InterfaceEntry {
            if_index,
            name,
            iana_type: types.get(key).and_then(non_empty),
            alias: aliases.get(key).and_then(non_empty),
            admin_up: status(&admin, key),
            oper_up: status(&oper, key),
            mac: phys.get(key).and_then(mac_value),
        });
    }
    Ok(entries)
}

/// LLDP port ids are often MAC addresses or opaque blobs; those are not names.
fn looks_like_mac(port_id: &str) -> bool {
    let lower = port_id.to_lowercase();
    port_id.contains(':')
        || lower.contains("mac")
        || port_id.len() > 30
        || port_id.chars().any(|c| c.is_control() || c == char::REPLACEMENT_CHARACTER)
}

/// LLDP-MIB remote table. `if_names` maps ifIndex to name for local ports
/// whose `lldpLocPortId` is not itself a name.
pub fn lldp_neighbors(
    client: &dyn SnmpClient,
    agent: &Agent,
    if_names: &HashMap<u32, String>,
    limit: usize,
) -> Result<Vec<NeighborRecord>, SnmpError> {
    let sys_names = column(client, agent, &OIDS.lldp_rem_sys_name, limit)?;
    let port_ids = optional_column(client, agent, &OIDS.lldp_rem_port_id, limit);
    let port_descs = optional_column(client, agent, &OIDS.lldp_rem_port_desc, limit);
    let local_ids = optional_column(client, agent, &OIDS.lldp_loc_port_id, limit);

    let mut records = Vec::new();
    // index: timeMark.localPortNum.remIndex
    for (key, value) in &sys_names {
        let [_, local_num, _] = key.as_slice() else {
            continue;
        };
        let local_port = local_ids
            .get(&vec![*local_num])
            .and_then(non_empty)
            .filter(|id| !looks_like_mac(id))
            .or_else(|| if_names.get(local_num).cloned())
            .unwrap_or_else(|| format!("port{}", local_num));

        let description = port_descs.get(key).and_then(non_empty);
        let port_id = port_ids
            .get(key)
            .and_then(non_empty)
            .filter(|id| !looks_like_mac(id));

        let mut record = NeighborRecord::new(DiscoverySource::SnmpLldp);
        record.local_port = Some(local_port);
        record.remote_system = non_empty(value);
        record.remote_port = port_id.or_else(|| description.clone());
        record.remote_port_description = description;
        records.push(record);
    }
    Ok(records)
}

/// CISCO-CDP-MIB cache table, indexed by ifIndex.deviceIndex
pub fn cdp_neighbors(
    client: &dyn SnmpClient,
    agent: &Agent,
    if_names: &HashMap<u32, String>,
    limit: usize,
) -> Result<Vec<NeighborRecord>, SnmpError> {
    let device_ids = column(client, agent, &OIDS.cdp_cache_device_id, limit)?;
    let ports = optional_column(client, agent, &OIDS.cdp_cache_device_port, limit);

    let mut records = Vec::new();
    for (key, value) in &device_ids {
        let [if_index, _] = key.as_slice() else {
            continue;
        };
        let mut record = NeighborRecord::new(DiscoverySource::SnmpCdp);
        record.local_port = Some(
            if_names
                .get(if_index)
                .cloned()
                .unwrap_or_else(|| format!("ifIndex{}", if_index)),
        );
        record.remote_system = non_empty(value).map(|id| clean_device_id(&id));
        record.remote_port = ports.get(key).and_then(non_empty);
        records.push(record);
    }
    Ok(records)
}

fn local_name(if_names: &HashMap<u32, String>, if_index: u32) -> String {
    if_names
        .get(&if_index)
        .cloned()
        .unwrap_or_else(|| format!("ifIndex{}", if_index))
}

/// `dot1dBasePortIfIndex`: bridge port number to ifIndex
fn bridge_ports(client: &dyn SnmpClient, agent: &Agent, limit: usize) -> HashMap<u32, u32> {
    optional_column(client, agent, &OIDS.dot1d_base_port_if_index, limit)
        .iter()
        .filter_map(|(key, value)| {
            let port = single_index(key)?;
            let if_index = u32::try_from(value.as_i64()?).ok()?;
            Some((port, if_index))
        })
        .collect()
}

/// Bridge port in a forwarding row, resolved to an ifIndex. Port 0 (the
/// switch itself) and unmapped ports yield nothing.
fn bridge_if_index(ports: &HashMap<u32, u32>, value: &SnmpValue) -> Option<u32> {
    let port = u32::try_from(value.as_i64()?).ok()?;
    ports.get(&port).copied()
}

/// BRIDGE-MIB `dot1dTpFdbPort`, indexed by the six MAC arcs
pub fn bridge_fdb(
    client: &dyn SnmpClient,
    agent: &Agent,
    if_names: &HashMap<u32, String>,
    limit: usize,
) -> Result<Vec<ForwardingEntry>, SnmpError> {
    let rows = column(client, agent, &OIDS.dot1d_tp_fdb_port, limit)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ports = bridge_ports(client, agent, limit);

    let mut entries = Vec::new();
    for (key, value) in &rows {
        let (Some(mac), Some(if_index)) = (mac_from_arcs(key), bridge_if_index(&ports, value)) else {
            continue;
        };
        entries.push(ForwardingEntry {
            source: DiscoverySource::SnmpFdb,
            local_port: local_name(if_names, if_index),
            mac,
            vlan: None,
            ip: None,
        });
    }
    Ok(entries)
}

/// Q-BRIDGE-MIB `dot1qTpFdbPort`, indexed by fdbId then the six MAC arcs
pub fn qbridge_fdb(
    client: &dyn SnmpClient,
    agent: &Agent,
    if_names: &HashMap<u32, String>,
    limit: usize,
) -> Result<Vec<ForwardingEntry>, SnmpError> {
    let rows = column(client, agent, &OIDS.dot1q_tp_fdb_port, limit)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ports = bridge_ports(client, agent, limit);

    let mut entries = Vec::new();
    for (key, value) in &rows {
        let [fdb_id, mac @ ..] = key.as_slice() else {
            continue;
        };
        let (Some(mac), Some(if_index)) = (mac_from_arcs(mac), bridge_if_index(&ports, value)) else {
            continue;
        };
        entries.push(ForwardingEntry {
            source: DiscoverySource::SnmpQBridge,
            local_port: local_name(if_names, if_index),
            mac,
            vlan: Some(*fdb_id),
            ip: None,
        });
    }
    Ok(entries)
}

/// IP-MIB `ipNetToMediaPhysAddress`, indexed by ifIndex then the IPv4 address
pub fn arp_cache(
    client: &dyn SnmpClient,
    agent: &Agent,
    if_names: &HashMap<u32, String>,
    limit: usize,
) -> Result<Vec<ForwardingEntry>, SnmpError> {
    let rows = column(client, agent, &OIDS.ip_net_to_media_phys_address, limit)?;

    let mut entries = Vec::new();
    for (key, value) in &rows {
        let [if_index, a, b, c, d] = key.as_slice() else {
            continue;
        };
        let Some(mac) = mac_value(value) else {
            continue;
        };
        entries.push(ForwardingEntry {
            source: DiscoverySource::SnmpArp,
            local_port: local_name(if_names, *if_index),
            mac,
            vlan: None,
            ip: Some(format!("{}.{}.{}.{}", a, b, c, d)),
        });
    }
    Ok(entries)
}

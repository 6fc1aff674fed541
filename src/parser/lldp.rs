//! LLDP detail output.
//!
//! Blocks begin at each block-start marker (`Chassis id:` by default); text
//! before the first marker is header noise and is ignored. Field extractors
//! run independently over each block.

use regex::Regex;

use super::{excerpt, field_value, DiscoverySource, NeighborProtocol, NeighborRecord, ParseOutcome, ParseSkip};
use crate::config::{compile_pattern, LldpPatterns, ValidationError};

#[derive(Debug, Clone)]
pub struct LldpGrammar {
    block_start: Regex,
    local_port: Regex,
    system_name: Regex,
    port_id: Regex,
    port_description: Regex,
    vlan_id: Regex,
    management_address: Regex,
}

impl LldpGrammar {
    pub fn compile(patterns: &LldpPatterns) -> Result<Self, ValidationError> {
        Ok(Self {
            block_start: compile_pattern("lldp.block_start", &patterns.block_start)?,
            local_port: compile_pattern("lldp.local_port", &patterns.local_port)?,
            system_name: compile_pattern("lldp.system_name", &patterns.system_name)?,
            port_id: compile_pattern("lldp.port_id", &patterns.port_id)?,
            port_description: compile_pattern("lldp.port_description", &patterns.port_description)?,
            vlan_id: compile_pattern("lldp.vlan_id", &patterns.vlan_id)?,
            management_address: compile_pattern(
                "lldp.management_address",
                &patterns.management_address,
            )?,
        })
    }

    /// Split raw output into neighbor blocks
    pub fn blocks<'a>(&self, output: &'a str) -> Vec<&'a str> {
        let starts: Vec<usize> = self.block_start.find_iter(output).map(|m| m.start()).collect();
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(output.len());
                &output[start..end]
            })
            .collect()
    }

    pub fn parse(&self, output: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let blocks = self.blocks(output);

        if blocks.is_empty() && !output.trim().is_empty() {
            log::debug!("LLDP output contains no neighbor blocks");
        }

        for (index, block) in blocks.into_iter().enumerate() {
            let record = self.parse_block(block);
            if record.field_count() == 0 {
                log::warn!("Skipping LLDP block {}: no recognised fields", index);
                outcome.skipped.push(ParseSkip {
                    protocol: NeighborProtocol::Lldp,
                    block_index: index,
                    reason: "no recognised fields".to_string(),
                    excerpt: excerpt(block),
                });
                continue;
            }
            outcome.records.push(record);
        }
        outcome
    }

    fn parse_block(&self, block: &str) -> NeighborRecord {
        let capture = |re: &Regex| {
            re.captures(block)
                .and_then(|c| c.get(1))
                .and_then(|m| field_value(m.as_str()))
        };
        let mut record = NeighborRecord::new(DiscoverySource::CliLldp);
        record.local_port = capture(&self.local_port);
        record.remote_system = capture(&self.system_name);
        record.remote_port = capture(&self.port_id);
        record.remote_port_description = capture(&self.port_description);
        record.vlan = capture(&self.vlan_id);
        record.remote_address = capture(&self.management_address);
        record
    }
}

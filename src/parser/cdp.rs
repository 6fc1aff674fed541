//! CDP detail output, one block per separator-delimited section.

use regex::Regex;
use std::net::IpAddr;

use super::{excerpt, field_value, DiscoverySource, NeighborProtocol, NeighborRecord, ParseOutcome, ParseSkip};
use crate::config::{compile_pattern, CdpPatterns, ValidationError};

#[derive(Debug, Clone)]
pub struct CdpGrammar {
    separator: Regex,
    device_id: Regex,
    local_interface: Regex,
    remote_port: Regex,
    management_address: Regex,
}

impl CdpGrammar {
    pub fn compile(patterns: &CdpPatterns) -> Result<Self, ValidationError> {
        Ok(Self {
            separator: compile_pattern("cdp.separator", &patterns.separator)?,
            device_id: compile_pattern("cdp.device_id", &patterns.device_id)?,
            local_interface: compile_pattern("cdp.local_interface", &patterns.local_interface)?,
            remote_port: compile_pattern("cdp.remote_port", &patterns.remote_port)?,
            management_address: compile_pattern(
                "cdp.management_address",
                &patterns.management_address,
            )?,
        })
    }

    pub fn parse(&self, output: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let blocks = self
            .separator
            .split(output)
            .filter(|block| !block.trim().is_empty());

        for (index, block) in blocks.enumerate() {
            let capture = |re: &Regex| {
                re.captures(block)
                    .and_then(|c| c.get(1))
                    .and_then(|m| field_value(m.as_str()))
            };
            let mut record = NeighborRecord::new(DiscoverySource::CliCdp);
            record.remote_system = capture(&self.device_id).map(|id| clean_device_id(&id));
            record.local_port = capture(&self.local_interface);
            record.remote_port = capture(&self.remote_port);
            record.remote_address = capture(&self.management_address);

            if record.field_count() == 0 {
                // leading banner text before the first separator is not a neighbor block
                if index > 0 || block.contains(':') {
                    log::warn!("Skipping CDP block {}: no recognised fields", index);
                    outcome.skipped.push(ParseSkip {
                        protocol: NeighborProtocol::Cdp,
                        block_index: index,
                        reason: "no recognised fields".to_string(),
                        excerpt: excerpt(block),
                    });
                }
                continue;
            }
            outcome.records.push(record);
        }
        outcome
    }
}

/// Strip the serial suffix and DNS domain from a CDP device id.
/// Addresses are returned untouched.
pub fn clean_device_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.parse::<IpAddr>().is_ok() {
        return trimmed.to_string();
    }
    let without_serial = match trimmed.find('(') {
        Some(pos) if pos > 0 => &trimmed[..pos],
        _ => trimmed,
    };
    without_serial
        .split('.')
        .next()
        .unwrap_or(without_serial)
        .to_string()
}

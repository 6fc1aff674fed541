//! Platform families and prompt detection.
//!
//! Each [`PlatformFamily`] carries its own command dialect; the family is
//! decided once, from the prompt (or a credential override), and the session
//! never branches on vendor strings after that.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{compile_pattern, CliConfig, PatternConfig, ValidationError};
use crate::parser::NeighborProtocol;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    CiscoIos,
    CiscoNxos,
    Junos,
    Generic,
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformFamily::CiscoIos => "cisco_ios",
            PlatformFamily::CiscoNxos => "cisco_nxos",
            PlatformFamily::Junos => "junos",
            PlatformFamily::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Read-timeout class of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    General,
    Neighbor,
}

/// A command the session issues, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryCommand {
    pub command: String,
    pub class: CommandClass,
    /// Set for commands whose output feeds the neighbor parser
    pub protocol: Option<NeighborProtocol>,
}

impl DiscoveryCommand {
    fn general(command: &str) -> Self {
        Self {
            command: command.to_string(),
            class: CommandClass::General,
            protocol: None,
        }
    }

    fn neighbor(command: &str, protocol: NeighborProtocol) -> Self {
        Self {
            command: command.to_string(),
            class: CommandClass::Neighbor,
            protocol: Some(protocol),
        }
    }
}

impl PlatformFamily {
    pub fn paging_command(self) -> Option<&'static str> {
        match self {
            PlatformFamily::CiscoIos | PlatformFamily::CiscoNxos => Some("terminal length 0"),
            PlatformFamily::Junos => Some("set cli screen-length 0"),
            PlatformFamily::Generic => None,
        }
    }

    pub fn lldp_command(self) -> &'static str {
        match self {
            PlatformFamily::Junos => "show lldp neighbors detail | no-more",
            _ => "show lldp neighbors detail",
        }
    }

    pub fn cdp_command(self) -> &'static str {
        "show cdp neighbors detail"
    }

    /// Commands to run on this platform, honouring the CDP skip list
    pub fn commands(self, cli: &CliConfig) -> Vec<DiscoveryCommand> {
        let mut commands = Vec::new();
        if let Some(paging) = self.paging_command() {
            commands.push(DiscoveryCommand::general(paging));
        }
        commands.push(DiscoveryCommand::neighbor(self.lldp_command(), NeighborProtocol::Lldp));
        if cli.force_cdp || !cli.cdp_skip_platforms.contains(&self) {
            commands.push(DiscoveryCommand::neighbor(self.cdp_command(), NeighborProtocol::Cdp));
        }
        commands
    }
}

#[derive(Debug, Clone)]
struct PromptRule {
    platform: PlatformFamily,
    pattern: Regex,
}

/// A recognised device prompt
#[derive(Debug, Clone)]
pub struct DetectedPrompt {
    pub platform: PlatformFamily,
    /// The prompt text exactly as the device printed it
    pub prompt: String,
    pub hostname: String,
    /// Matches the prompt reappearing after a command
    pub completion: Regex,
}

impl DetectedPrompt {
    /// True once the prompt is the last line of `output`
    pub fn is_complete(&self, output: &str) -> bool {
        self.completion.is_match(last_line(output))
    }
}

/// Ordered prompt rules plus the login challenges
#[derive(Debug, Clone)]
pub struct PromptSet {
    rules: Vec<PromptRule>,
    username: Regex,
    password: Regex,
}

impl PromptSet {
    pub fn compile(patterns: &PatternConfig) -> Result<Self, ValidationError> {
        let mut rules = Vec::with_capacity(patterns.prompts.len() + 1);
        for (i, p) in patterns.prompts.iter().enumerate() {
            rules.push(PromptRule {
                platform: p.platform,
                pattern: compile_pattern(&format!("prompts[{}]", i), &p.regex)?,
            });
        }
        rules.push(PromptRule {
            platform: PlatformFamily::Generic,
            pattern: compile_pattern("generic_prompt", &patterns.generic_prompt)?,
        });
        Ok(Self {
            rules,
            username: compile_pattern("username_prompt", &patterns.username_prompt)?,
            password: compile_pattern("password_prompt", &patterns.password_prompt)?,
        })
    }

    /// Match the last line of `output` against the rules, first match wins
    pub fn detect(&self, output: &str) -> Option<DetectedPrompt> {
        let line = last_line(output).trim();
        if line.is_empty() {
            return None;
        }
        let rule = self.rules.iter().find(|r| r.pattern.is_match(line))?;
        let completion = Regex::new(&format!(r"^\s*{}\s*$", regex::escape(line))).ok()?;
        Some(DetectedPrompt {
            platform: rule.platform,
            prompt: line.to_string(),
            hostname: hostname_from_prompt(line),
            completion,
        })
    }

    pub fn is_username_challenge(&self, output: &str) -> bool {
        self.username.is_match(last_line(output))
    }

    pub fn is_password_challenge(&self, output: &str) -> bool {
        self.password.is_match(last_line(output))
    }
}

/// Last non-blank line of accumulated output
pub fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
}

/// `sw1#` -> `sw1`, `admin@edge1>` -> `edge1`, `sw1(config)#` -> `sw1`
pub fn hostname_from_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim().trim_end_matches(['>', '#', '$', '%', ' ']);
    let after_user = trimmed.rsplit('@').next().unwrap_or(trimmed);
    let name = match after_user.find('(') {
        Some(pos) if pos > 0 => &after_user[..pos],
        _ => after_user,
    };
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> PromptSet {
        PromptSet::compile(&PatternConfig::default()).unwrap()
    }

    #[test]
    fn test_vendor_prompts_before_generic() {
        let set = prompts();
        let junos = set.detect("--- JUNOS 21.4R1\n\nadmin@edge1> ").unwrap();
        assert_eq!(junos.platform, PlatformFamily::Junos);
        assert_eq!(junos.hostname, "edge1");

        let ios = set.detect("\r\nUser Access Verification\r\n\r\ncore-sw1#").unwrap();
        assert_eq!(ios.platform, PlatformFamily::CiscoIos);
        assert_eq!(ios.hostname, "core-sw1");
        assert_eq!(ios.prompt, "core-sw1#");

        let shell = set.detect("Last login: today\n[admin@box ~]$ ").unwrap();
        assert_eq!(shell.platform, PlatformFamily::Generic);
    }

    #[test]
    fn test_no_prompt() {
        let set = prompts();
        assert!(set.detect("").is_none());
        assert!(set.detect("Welcome to the network\n").is_none());
    }

    #[test]
    fn test_completion_regex_matches_only_the_prompt() {
        let set = prompts();
        let detected = set.detect("sw1(config)#").unwrap();
        assert!(detected.is_complete("show lldp\n...output...\nsw1(config)#"));
        assert!(!detected.is_complete("show lldp\n...output...\n"));
        assert!(!detected.is_complete("sw2#"));
        assert_eq!(detected.hostname, "sw1");
    }

    #[test]
    fn test_login_challenges() {
        let set = prompts();
        assert!(set.is_username_challenge("banner\r\nUsername: "));
        assert!(set.is_username_challenge("login:"));
        assert!(set.is_password_challenge("Password:"));
        assert!(!set.is_password_challenge("sw1#"));
    }

    #[test]
    fn test_cdp_skip_list() {
        let cli = CliConfig::default();
        let junos = PlatformFamily::Junos.commands(&cli);
        assert!(junos.iter().all(|c| c.protocol != Some(NeighborProtocol::Cdp)));

        let ios = PlatformFamily::CiscoIos.commands(&cli);
        assert_eq!(ios[0].class, CommandClass::General);
        assert_eq!(ios.iter().filter(|c| c.class == CommandClass::Neighbor).count(), 2);

        let forced = CliConfig {
            force_cdp: true,
            ..CliConfig::default()
        };
        let junos = PlatformFamily::Junos.commands(&forced);
        assert!(junos.iter().any(|c| c.protocol == Some(NeighborProtocol::Cdp)));
    }
}

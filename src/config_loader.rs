use crate::config::Config;
use crate::discovery::CredentialStore;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file '{}'", config_path.display()))?;

    // An empty document is a complete configuration
    let config: Option<Config> = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file '{}'", config_path.display()))?;
    let config = config.unwrap_or_default();

    config.validate().wrap_err("Configuration validation failed")?;

    Ok(config)
}

/// Parse a target list: one address per line, `#` comments and blank lines
/// ignored, duplicates dropped keeping the first occurrence
pub fn parse_targets(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if !seen.insert(line.to_string()) {
            warn!("Duplicate target '{}' ignored", line);
            continue;
        }
        targets.push(line.to_string());
    }
    targets
}

/// Load the target list file
pub fn load_targets(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read target list '{}'", path.display()))?;
    let targets = parse_targets(&content);
    if targets.is_empty() {
        warn!("Target list '{}' contains no addresses", path.display());
    }
    info!("Loaded {} targets from {:?}", targets.len(), path);
    Ok(targets)
}

/// Load CLI credentials; a per-device entry wins over the default
pub fn load_credentials(path: &Path) -> Result<CredentialStore> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open credential file '{}'", path.display()))?;
    let store: Option<CredentialStore> = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse credential file '{}'", path.display()))?;
    let store = store.unwrap_or_default();
    info!(
        "Loaded credentials: default {}, {} per-device entries",
        if store.fallback.is_some() { "set" } else { "unset" },
        store.devices.len()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
discovery:
  workers: 4
  snmp:
    communities: ["private", "public"]
    timeout: 500ms
  cli:
    enabled: false
layout:
  devices_per_row: 5
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.discovery.workers, 4);
        assert_eq!(config.discovery.snmp.communities[0], "private");
        assert_eq!(config.discovery.snmp.timeout, Duration::from_millis(500));
        assert!(!config.discovery.cli.enabled);
        assert_eq!(config.layout.devices_per_row, 5);
        assert_eq!(config.layout.grid_margin_x, 450.0);
    }

    #[test]
    fn test_empty_config_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.discovery.workers, 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "discovery:\n  workers: 0\n").unwrap();
        let err = load_config(temp_file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("validation failed"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Path::new("/nonexistent/netmapper.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to open configuration file"));
    }

    #[test]
    fn test_parse_targets() {
        let content = "\
# core
10.0.0.1
10.0.0.2   # distribution

10.0.0.1
  sw3.example.net
";
        assert_eq!(parse_targets(content), vec!["10.0.0.1", "10.0.0.2", "sw3.example.net"]);
    }

    #[test]
    fn test_load_targets_and_credentials() {
        let mut targets = NamedTempFile::new().unwrap();
        write!(targets, "10.1.1.1\n10.1.1.2\n").unwrap();
        assert_eq!(load_targets(targets.path()).unwrap().len(), 2);

        let mut creds = NamedTempFile::new().unwrap();
        write!(
            creds,
            "default:\n  username: ops\n  password: pw\ndevices:\n  - address: 10.1.1.2\n    username: admin\n    password: x\n"
        )
        .unwrap();
        let store = load_credentials(creds.path()).unwrap();
        assert_eq!(store.for_target("10.1.1.1").unwrap().username, "ops");
        assert_eq!(store.for_target("10.1.1.2").unwrap().username, "admin");
    }
}

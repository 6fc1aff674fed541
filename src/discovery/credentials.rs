//! CLI credentials, per device or default.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::platform::PlatformFamily;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for CliCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub address: String,
    #[serde(flatten)]
    pub credentials: CliCredentials,
    /// Skips prompt-based platform detection for this device
    #[serde(default)]
    pub platform: Option<PlatformFamily>,
}

/// Credential file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialStore {
    #[serde(rename = "default")]
    pub fallback: Option<CliCredentials>,
    pub devices: Vec<DeviceCredentials>,
}

impl CredentialStore {
    fn device(&self, address: &str) -> Option<&DeviceCredentials> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// Per-device entry first, then the default
    pub fn for_target(&self, address: &str) -> Option<&CliCredentials> {
        self.device(address)
            .map(|d| &d.credentials)
            .or(self.fallback.as_ref())
    }

    pub fn platform_for(&self, address: &str) -> Option<PlatformFamily> {
        self.device(address).and_then(|d| d.platform)
    }
}

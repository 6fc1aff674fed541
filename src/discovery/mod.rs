//! Device discovery.
//!
//! This module contains everything that talks to a device:
//!
//! - [`platform`]: platform families, their command dialects and prompt detection
//! - [`transport`]: the byte channel seam and its telnet implementation
//! - [`ssh`]: the default SSH line
//! - [`session`]: the interactive session state machine
//! - [`credentials`]: per-device and default login credentials
//! - [`prober`]: per-device strategy selection (SNMP first, CLI fallback)

pub mod credentials;
pub mod platform;
pub mod prober;
pub mod session;
pub mod ssh;
pub mod transport;

// Re-export key types for easier access
pub use credentials::{CliCredentials, CredentialStore, DeviceCredentials};
pub use platform::{PlatformFamily, PromptSet};
pub use prober::{DeviceStatus, ProbeReport, Prober};
pub use session::{CommandOutput, Session, SessionError, SessionState, SessionTranscript};
pub use ssh::{SshTransport, SshTransportFactory};
pub use transport::{TcpTransport, TcpTransportFactory, Transport, TransportFactory};

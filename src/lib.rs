//! # NetMapper - Network topology discovery and diagram layout
//!
//! This library discovers the physical topology of a switched/routed network
//! and turns it into a deterministic geometric model that renderers can
//! serialise into diagrams.
//!
//! ## Overview
//!
//! Given a list of target device addresses, NetMapper probes every device
//! over SNMP, falling back to an interactive CLI session, and collects its
//! identity, interface inventory and LLDP/CDP neighbor tables. Neighbor
//! reports from both ends of a cable are merged into one link, and devices
//! that were only ever seen as neighbors become stub devices.
//!
//! ## Key Features
//!
//! - **SNMPv2c discovery**: sysName, IF-MIB, LLDP-MIB and CISCO-CDP-MIB walks,
//!   with BRIDGE/Q-BRIDGE forwarding and ARP tables when no neighbors answer
//! - **CLI fallback**: SSH (or telnet) login, prompt detection and
//!   per-platform command sets for Cisco IOS, NX-OS and Junos
//! - **Tolerant parsing**: malformed neighbor blocks are skipped, never fatal
//! - **Deterministic layout**: grid placement, paginated chassis port rows,
//!   stack detection, orthogonal connection routes and clamped labels
//! - **Bounded concurrency**: a fixed-size worker pool for probing
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Typed configuration with serde defaults and validation
//! - `config_loader`: Configuration, target list and credential file loading
//! - `snmp`: SNMP client trait, the `async-snmp` UDP client and MIB queries
//! - `discovery`: SSH and telnet transports, the CLI session state machine and the prober
//! - `parser`: LLDP and CDP neighbor output grammars
//! - `topology`: Interface classification, name normalization, MAC-inferred links and the graph
//! - `layout`: The layout engine and its geometric primitives
//! - `render`: Connection lists and SVG output
//! - `report`: Per-device status and warning summary
//! - `orchestrator`: High-level orchestration of a discovery run
//! - `utils`: Utility functions and helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netmapper::config_loader;
//! use netmapper::orchestrator::Discovery;
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("netmapper.yaml"))?;
//! let targets = config_loader::load_targets(Path::new("targets.txt"))?;
//! let credentials = config_loader::load_credentials(Path::new("credentials.yaml"))?;
//!
//! let line_height = config.layout.label_line_height;
//! let discovery = Discovery::with_network(config, credentials)?;
//! let outcome = discovery.run(&targets)?;
//!
//! // topology.json, report.json, connections.txt/json and diagram.svg
//! outcome.write_outputs(Path::new("netmapper_output"), line_height)?;
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! Every section is optional; an empty file is a valid configuration:
//!
//! ```yaml
//! discovery:
//!   workers: 8
//!   snmp:
//!     communities: ["public"]
//!     timeout: 2s
//!     forwarding_tables: true
//!   cli:
//!     protocol: ssh        # or telnet
//!     attempts: 2
//!     banner_timeout: 15s
//!
//! layout:
//!   devices_per_row: 3
//!   grid_margin_x: 450
//!   grid_margin_y: 350
//! ```
//!
//! ## Error Handling
//!
//! Domain errors are `thiserror` enums. Loader and orchestrator entry points
//! return `color_eyre::Result` with context attached. A single device's
//! failure never aborts a run; it is recorded in the report instead.

pub mod config;
pub mod config_loader;
pub mod discovery;
pub mod layout;
pub mod orchestrator;
pub mod parser;
pub mod render;
pub mod report;
pub mod snmp;
pub mod topology;
pub mod utils;

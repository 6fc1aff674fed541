//! Network topology module.
//!
//! This module contains the interface classifier and name normalizer, the
//! graph types, the MAC directory that infers links from forwarding tables,
//! and the single-writer builder that merges per-device
//! discovery results into one [`TopologyGraph`].

pub mod builder;
pub mod classify;
pub mod forwarding;
pub mod graph;
pub mod normalize;

// Re-export key types for easier access
pub use builder::{GraphBuilder, GraphWarning};
pub use classify::{InterfaceClass, InterfaceClassifier};
pub use forwarding::MacDirectory;
pub use graph::{Device, DeviceId, DeviceKind, Endpoint, Interface, Link, LinkKey, TopologyGraph};
pub use normalize::InterfaceNormalizer;

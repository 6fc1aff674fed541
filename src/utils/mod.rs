//! Shared utilities.

pub mod natural;
pub mod runtime;

pub use natural::natural_cmp;

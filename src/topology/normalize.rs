//! Canonical interface names.
//!
//! Vendors and protocols spell the same port differently
//! (`GigabitEthernet1/0/1`, `Gi1/0/1`, `GigabitEthernet 1/0/1`). Every name is
//! collapsed to one canonical abbreviated form before it is used as a key.

use crate::config::{Replacement, ValidationError};

/// Longest-match prefix replacement table
#[derive(Debug, Clone)]
pub struct InterfaceNormalizer {
    /// (lowercased prefix, replacement), longest prefix first
    entries: Vec<(String, String)>,
}

impl InterfaceNormalizer {
    /// Build the table and check that it is idempotent.
    pub fn compile(replacements: &[Replacement]) -> Result<Self, ValidationError> {
        let mut entries = Vec::with_capacity(replacements.len());
        for r in replacements {
            let from = r.from.trim();
            if from.is_empty() {
                return Err(ValidationError::InvalidReplacement(format!(
                    "empty prefix for replacement `{}`",
                    r.to
                )));
            }
            entries.push((from.to_lowercase(), r.to.trim().to_string()));
        }
        // Stable sort keeps configuration order among equal-length prefixes
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let normalizer = Self { entries };
        for (from, to) in &normalizer.entries {
            let sample = format!("{}0/1", to);
            let once = normalizer.normalize(&sample);
            if once != sample {
                return Err(ValidationError::InvalidReplacement(format!(
                    "`{}` -> `{}` is not stable: `{}` normalizes to `{}`",
                    from, to, sample, once
                )));
            }
        }
        Ok(normalizer)
    }

    /// Canonical form of `name`. Whitespace is removed and the longest
    /// matching prefix (case-insensitive) is replaced, repeatedly, until the
    /// name no longer changes.
    pub fn normalize(&self, name: &str) -> String {
        let mut current: String = name.split_whitespace().collect();
        // a replacement can expose another table prefix
        for _ in 0..=self.entries.len() {
            match self.rewrite(&current) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    /// One longest-prefix replacement, if any entry matches
    fn rewrite(&self, compact: &str) -> Option<String> {
        let lower = compact.to_lowercase();
        self.entries
            .iter()
            .find(|(from, _)| lower.starts_with(from.as_str()) && compact.is_char_boundary(from.len()))
            .map(|(from, to)| format!("{}{}", to, &compact[from.len()..]))
    }

    /// Case-insensitive identity key for a canonical name
    pub fn key(&self, name: &str) -> String {
        self.normalize(name).to_lowercase()
    }
}

//! Name-based field exclusion.

use std::collections::HashSet;

/// Decides whether a field may appear in an audit record.
///
/// Matching is case-insensitive. The filter is a pure predicate; payload
/// limiting happens in a separate pass before rendering.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    excluded: HashSet<String>,
}

impl FieldFilter {
    /// Filter rejecting the given names, compared case-insensitively.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: excluded
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// `false` when `field_name` is excluded.
    pub fn should_include(&self, field_name: &str) -> bool {
        !self.excluded.contains(&field_name.to_lowercase())
    }

    /// Excluded names, lowercased, in no particular order.
    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self::new(["logger"])
    }
}

//! Outgoing `Cookie` request header construction.

use std::fmt;

/// Ordered list of cookie pairs serialized into a single `Cookie` header.
///
/// Values are sensitive; the `Debug` output lists names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieHeader {
    pairs: Vec<(String, String)>,
}

impl CookieHeader {
    /// Creates an empty header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cookie pair.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// Appends a cookie pair only when a value is present.
    ///
    /// Absent and empty values are skipped rather than sent as `name=`.
    #[must_use]
    pub fn with_optional(self, name: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.with(name, value),
            _ => self,
        }
    }

    /// Returns `true` when no pair was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns the cookie names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(name, _)| name.as_str())
    }

    /// Serializes the pairs as `a=1; b=2`, or `None` when empty.
    #[must_use]
    pub fn to_header_value(&self) -> Option<String> {
        if self.pairs.is_empty() {
            return None;
        }
        Some(
            self.pairs
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl fmt::Debug for CookieHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pairs.iter().map(|(name, _)| format!("{name}=[REDACTED]")))
            .finish()
    }
}

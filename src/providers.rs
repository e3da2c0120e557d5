//! Web/native provider identity pairs.
//!
//! The same external account can sign in through the web provider (e.g.
//! `github`) or its native counterpart (e.g. `github-expo`). An account-linking
//! policy uses these pairs to merge both identities into one user. Lookups go
//! through an explicit finite map; provider ids are never pattern-matched.

use std::fmt;

/// Errors for provider identity lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The id is not part of any configured pair.
    #[error("unknown provider '{id}'")]
    Unknown {
        /// The id that was looked up.
        id: String,
    },

    /// The id was found but on the other side of the map.
    #[error("provider '{id}' is not a {expected} provider")]
    WrongKind {
        /// The id that was looked up.
        id: String,
        /// The side the caller asked for.
        expected: ProviderKind,
    },

    /// The pairs do not form a bijection.
    #[error("provider '{id}' appears in more than one pair")]
    Duplicate {
        /// The repeated id.
        id: String,
    },
}

/// Which entry point a provider id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Web,
    Native,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Web => "web",
            Self::Native => "native",
        })
    }
}

/// One web/native pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPair {
    pub web: String,
    pub native: String,
}

impl ProviderPair {
    /// Creates a pair.
    #[must_use]
    pub fn new(web: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            web: web.into(),
            native: native.into(),
        }
    }
}

/// Result of resolving a provider id in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProvider<'a> {
    pub id: &'a str,
    pub kind: ProviderKind,
    pub counterpart: &'a str,
}

/// Bidirectional finite map between web and native provider ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPairs {
    pairs: Vec<ProviderPair>,
}

impl ProviderPairs {
    /// Builds the map, rejecting any id that appears twice on either side.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Duplicate`] when the pairs are not a bijection
    /// between disjoint id sets.
    pub fn new(pairs: impl IntoIterator<Item = ProviderPair>) -> Result<Self, ProviderError> {
        let pairs: Vec<ProviderPair> = pairs.into_iter().collect();
        let mut seen = std::collections::HashSet::new();
        for pair in &pairs {
            for id in [&pair.web, &pair.native] {
                if !seen.insert(id.as_str()) {
                    return Err(ProviderError::Duplicate { id: id.clone() });
                }
            }
        }
        Ok(Self { pairs })
    }

    /// Resolves an id of either kind to its counterpart.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unknown`] for ids outside the map.
    pub fn resolve(&self, id: &str) -> Result<ResolvedProvider<'_>, ProviderError> {
        self.pairs
            .iter()
            .find_map(|pair| {
                if pair.web == id {
                    Some(ResolvedProvider {
                        id: &pair.web,
                        kind: ProviderKind::Web,
                        counterpart: &pair.native,
                    })
                } else if pair.native == id {
                    Some(ResolvedProvider {
                        id: &pair.native,
                        kind: ProviderKind::Native,
                        counterpart: &pair.web,
                    })
                } else {
                    None
                }
            })
            .ok_or_else(|| ProviderError::Unknown { id: id.to_string() })
    }

    /// Native counterpart of a web provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unknown`] or [`ProviderError::WrongKind`].
    pub fn native_for(&self, web: &str) -> Result<&str, ProviderError> {
        self.counterpart_of_kind(web, ProviderKind::Web)
    }

    /// Web counterpart of a native provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unknown`] or [`ProviderError::WrongKind`].
    pub fn web_for(&self, native: &str) -> Result<&str, ProviderError> {
        self.counterpart_of_kind(native, ProviderKind::Native)
    }

    /// Whether two ids are the two halves of one pair.
    #[must_use]
    pub fn are_paired(&self, a: &str, b: &str) -> bool {
        self.resolve(a)
            .is_ok_and(|resolved| resolved.counterpart == b)
    }

    /// Web provider ids in configuration order.
    pub fn web_providers(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|pair| pair.web.as_str())
    }

    /// All pairs in configuration order.
    #[must_use]
    pub fn pairs(&self) -> &[ProviderPair] {
        &self.pairs
    }

    fn counterpart_of_kind(&self, id: &str, kind: ProviderKind) -> Result<&str, ProviderError> {
        let resolved = self.resolve(id)?;
        if resolved.kind != kind {
            return Err(ProviderError::WrongKind {
                id: id.to_string(),
                expected: kind,
            });
        }
        Ok(resolved.counterpart)
    }
}

impl Default for ProviderPairs {
    fn default() -> Self {
        Self {
            pairs: vec![
                ProviderPair::new("github", "github-expo"),
                ProviderPair::new("discord", "discord-expo"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pairs_resolve_both_ways() {
        let pairs = ProviderPairs::default();
        assert_eq!(pairs.native_for("github").unwrap(), "github-expo");
        assert_eq!(pairs.web_for("github-expo").unwrap(), "github");
        assert_eq!(pairs.native_for("discord").unwrap(), "discord-expo");
    }

    #[test]
    fn test_mapping_is_symmetric() {
        let pairs = ProviderPairs::default();
        for pair in pairs.pairs() {
            let forward = pairs.resolve(&pair.web).unwrap();
            let back = pairs.resolve(forward.counterpart).unwrap();
            assert_eq!(back.counterpart, pair.web);
            assert_eq!(back.kind, ProviderKind::Native);
        }
    }

    #[test]
    fn test_unknown_provider_is_typed_error() {
        let pairs = ProviderPairs::default();
        assert_eq!(
            pairs.resolve("gitlab"),
            Err(ProviderError::Unknown {
                id: "gitlab".to_string()
            })
        );
    }

    #[test]
    fn test_no_substring_matching() {
        let pairs = ProviderPairs::default();
        assert!(pairs.resolve("github-expo-evil").is_err());
        assert!(pairs.resolve("git").is_err());
        assert!(pairs.resolve("GITHUB").is_err());
    }

    #[test]
    fn test_wrong_direction_is_rejected() {
        let pairs = ProviderPairs::default();
        assert!(matches!(
            pairs.native_for("github-expo"),
            Err(ProviderError::WrongKind {
                expected: ProviderKind::Web,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ProviderPairs::new([
            ProviderPair::new("github", "github-native"),
            ProviderPair::new("gitlab", "github-native"),
        ]);
        assert!(matches!(result, Err(ProviderError::Duplicate { .. })));

        let crossed = ProviderPairs::new([
            ProviderPair::new("a", "b"),
            ProviderPair::new("b", "c"),
        ]);
        assert!(crossed.is_err(), "an id may not be both web and native");
    }

    #[test]
    fn test_are_paired() {
        let pairs = ProviderPairs::default();
        assert!(pairs.are_paired("github", "github-expo"));
        assert!(pairs.are_paired("github-expo", "github"));
        assert!(!pairs.are_paired("github", "discord-expo"));
        assert!(!pairs.are_paired("unknown", "github"));
    }

    #[test]
    fn test_web_providers_lists_web_side() {
        let pairs = ProviderPairs::default();
        assert_eq!(pairs.web_providers().collect::<Vec<_>>(), vec!["github", "discord"]);
    }
}

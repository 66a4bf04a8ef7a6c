use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sentinel appended to a species symbol in text form to mark R-group membership.
pub const MASK_SENTINEL: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid species label: '{0}'")]
pub struct ParseSpeciesError(String);

/// Chemical species label carried by every atom.
///
/// A species is a symbol (`"C"`, `"Zn"`, or any label a structure file uses)
/// plus a *mask* flag marking the atom as an R-group. The textual encoding
/// appends [`MASK_SENTINEL`] to the symbol (`"C!"`); parsing strips the
/// sentinel into the flag and `Display` re-attaches it, so the sentinel never
/// appears in internal comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Species {
    symbol: String,
    masked: bool,
}

impl Species {
    /// Creates an unmasked species from a bare symbol (no sentinel).
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            masked: false,
        }
    }

    /// Creates a masked (R-group) species from a bare symbol.
    pub fn masked(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            masked: true,
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Returns a copy with the mask flag set.
    pub fn mask(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            masked: true,
        }
    }

    /// Returns a copy with the mask flag cleared.
    pub fn unmask(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            masked: false,
        }
    }

    /// Tag-insensitive equality: true iff the base symbols match.
    ///
    /// Topology matching uses this, so masked query atoms still match their
    /// unmasked counterparts in a parent crystal.
    #[inline]
    pub fn matches_unmasked(&self, other: &Species) -> bool {
        self.symbol == other.symbol
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.masked {
            write!(f, "{}{}", self.symbol, MASK_SENTINEL)
        } else {
            f.write_str(&self.symbol)
        }
    }
}

impl FromStr for Species {
    type Err = ParseSpeciesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, masked) = match s.strip_suffix(MASK_SENTINEL) {
            Some(base) => (base, true),
            None => (s, false),
        };

        if symbol.is_empty()
            || symbol.contains(MASK_SENTINEL)
            || symbol.chars().any(char::is_whitespace)
        {
            return Err(ParseSpeciesError(s.to_string()));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            masked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_symbol() {
        let s = Species::from_str("C").unwrap();
        assert_eq!(s.symbol(), "C");
        assert!(!s.is_masked());
    }

    #[test]
    fn parses_masked_symbol() {
        let s = Species::from_str("H!").unwrap();
        assert_eq!(s.symbol(), "H");
        assert!(s.is_masked());
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(Species::from_str("").is_err());
        assert!(Species::from_str("!").is_err());
        assert!(Species::from_str("C!x!").is_err());
        assert!(Species::from_str("C a").is_err());
    }

    #[test]
    fn display_round_trips() {
        for label in ["C", "Zn", "H!", "C_a!"] {
            let s = Species::from_str(label).unwrap();
            assert_eq!(s.to_string(), label);
        }
    }

    #[test]
    fn mask_and_unmask_copy() {
        let c = Species::new("C");
        assert!(c.mask().is_masked());
        assert!(!c.mask().unmask().is_masked());
        assert_eq!(c.mask().symbol(), "C");
    }

    #[test]
    fn equality_is_mask_sensitive() {
        assert_ne!(Species::new("C"), Species::masked("C"));
        assert_eq!(Species::new("C"), Species::new("C"));
    }

    #[test]
    fn matching_is_mask_insensitive() {
        assert!(Species::new("C").matches_unmasked(&Species::masked("C")));
        assert!(!Species::new("C").matches_unmasked(&Species::new("N")));
    }
}

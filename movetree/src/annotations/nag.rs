//! Numeric Annotation Glyphs.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A standard `$n` move/position assessment code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nag(pub u8);

impl Nag {
    pub const GOOD_MOVE: Nag = Nag(1);
    pub const MISTAKE: Nag = Nag(2);
    pub const BRILLIANT_MOVE: Nag = Nag(3);
    pub const BLUNDER: Nag = Nag(4);
    pub const INTERESTING_MOVE: Nag = Nag(5);
    pub const DUBIOUS_MOVE: Nag = Nag(6);
    pub const ONLY_MOVE: Nag = Nag(7);

    /// Map a move-suffix glyph (`!`, `?!`, ...) to its NAG.
    pub fn from_suffix(suffix: &str) -> Option<Nag> {
        match suffix {
            "!" => Some(Self::GOOD_MOVE),
            "?" => Some(Self::MISTAKE),
            "!!" => Some(Self::BRILLIANT_MOVE),
            "??" => Some(Self::BLUNDER),
            "!?" => Some(Self::INTERESTING_MOVE),
            "?!" => Some(Self::DUBIOUS_MOVE),
            _ => None,
        }
    }

    /// Parse a `$n` token.
    pub fn parse(token: &str) -> Option<Nag> {
        token.strip_prefix('$')?.parse().ok().map(Nag)
    }

    /// Display symbol, for the codes that have one.
    pub fn symbol(self) -> Option<&'static str> {
        self.details().map(|(symbol, _)| symbol)
    }

    pub fn description(self) -> Option<&'static str> {
        self.details().map(|(_, description)| description)
    }

    fn details(self) -> Option<(&'static str, &'static str)> {
        let details = match self.0 {
            1 => ("!", "Good move"),
            2 => ("?", "Mistake"),
            3 => ("!!", "Brilliant move"),
            4 => ("??", "Blunder"),
            5 => ("!?", "Interesting move"),
            6 => ("?!", "Dubious move"),
            7 => ("□", "Only move"),
            10..=12 => ("=", "Equal position"),
            13 => ("∞", "Unclear position"),
            14 => ("⩲", "White is slightly better"),
            15 => ("⩱", "Black is slightly better"),
            16 => ("±", "White is better"),
            17 => ("∓", "Black is better"),
            18 => ("+−", "White is winning"),
            19 => ("−+", "Black is winning"),
            22 | 23 => ("⨀", "Zugzwang"),
            26 | 27 => ("○", "Space advantage"),
            32 | 33 => ("⟳", "Development advantage"),
            36 | 37 => ("↑", "Initiative"),
            40 | 41 => ("→", "Attack"),
            44 | 45 => ("=∞", "Compensation"),
            132 | 133 => ("⇆", "Counterplay"),
            138 | 139 => ("⨁", "Time pressure"),
            140 => ("∆", "With the idea"),
            146 => ("N", "Novelty"),
            _ => return None,
        };
        Some(details)
    }
}

impl std::fmt::Display for Nag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Ordered set of NAGs: insertion order is kept and duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NagSet(SmallVec<[Nag; 2]>);

impl NagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the NAG was already present.
    pub fn insert(&mut self, nag: Nag) -> bool {
        if self.0.contains(&nag) {
            return false;
        }
        self.0.push(nag);
        true
    }

    pub fn remove(&mut self, nag: Nag) -> bool {
        match self.0.iter().position(|n| *n == nag) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, nag: Nag) -> bool {
        self.0.contains(&nag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Nag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Nag> for NagSet {
    fn from_iter<I: IntoIterator<Item = Nag>>(iter: I) -> Self {
        let mut set = NagSet::new();
        for nag in iter {
            set.insert(nag);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_mapping() {
        assert_eq!(Nag::from_suffix("!!"), Some(Nag::BRILLIANT_MOVE));
        assert_eq!(Nag::from_suffix("?!"), Some(Nag::DUBIOUS_MOVE));
        assert_eq!(Nag::from_suffix("!!!"), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Nag::parse("$14"), Some(Nag(14)));
        assert_eq!(Nag::parse("14"), None);
        assert_eq!(Nag::parse("$300"), None);
        assert_eq!(Nag(14).to_string(), "$14");
        assert_eq!(Nag(14).symbol(), Some("⩲"));
        assert_eq!(Nag(200).description(), None);
    }

    #[test]
    fn test_set_keeps_order_and_dedups() {
        let mut set = NagSet::new();
        assert!(set.insert(Nag(16)));
        assert!(set.insert(Nag(1)));
        assert!(!set.insert(Nag(16)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Nag(16), Nag(1)]);
        assert!(set.remove(Nag(16)));
        assert!(!set.remove(Nag(16)));
        assert_eq!(set.len(), 1);
    }
}

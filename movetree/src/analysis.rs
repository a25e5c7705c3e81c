//! Engine evaluation values carried in `[%eval ...]` annotations.

use serde::{Deserialize, Serialize};

/// Engine evaluation score.
///
/// Centipawns: positive = White is better.
/// Mate: positive N = White mates in N moves,
/// negative N = Black mates in N moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl AnalysisScore {
    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
        }
    }

    /// Parse the value of a `%eval` command: `0.35`, `-1.2`, `#3`, `#-2`.
    pub fn from_pgn_eval(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(mate) = value.strip_prefix('#') {
            return mate.parse().ok().map(Self::Mate);
        }
        let pawns: f64 = value.parse().ok()?;
        if !pawns.is_finite() {
            return None;
        }
        Some(Self::Centipawns((pawns * 100.0).round() as i32))
    }

    /// Render in `%eval` form. Centipawns always carry two decimals.
    pub fn to_pgn_eval(&self) -> String {
        match self {
            Self::Centipawns(cp) => {
                let sign = if *cp < 0 { "-" } else { "" };
                let abs = cp.unsigned_abs();
                format!("{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            Self::Mate(m) => format!("#{}", m),
        }
    }
}

/// Returns true if the given 1-indexed ply belongs to White.
/// Convention: odd plies (1, 3, 5, …) are White moves; even plies (2, 4, 6, …) are Black.
pub fn is_white_ply(ply: u32) -> bool {
    ply % 2 == 1
}

/// Full-move number of a 1-indexed ply.
pub fn move_number(ply: u32) -> u32 {
    (ply + 1) / 2
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

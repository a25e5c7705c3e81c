//! Configuration for the movetree studio
//!
//! Every setting is read from the environment with a compiled-in default.
//! The data directory is resolved with the following precedence:
//! 1. MOVETREE_DATA_DIR environment variable
//! 2. ~/.config/movetree/data (production default)
//! 3. ./data (fallback for development)

use std::path::PathBuf;

use movetree::ParseLimits;

const DEFAULT_CONFIG_DIR: &str = ".config/movetree/data";
const DEV_DATA_DIR: &str = "./data";

const DATA_DIR_VAR: &str = "MOVETREE_DATA_DIR";
const MAX_PGN_BYTES_VAR: &str = "MOVETREE_MAX_PGN_BYTES";
const MAX_VARIATION_DEPTH_VAR: &str = "MOVETREE_MAX_VARIATION_DEPTH";

/// Get the data directory for persistence.
///
/// Priority:
/// 1. MOVETREE_DATA_DIR env variable if set
/// 2. $HOME/.config/movetree/data if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_VAR) {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Directory holding one JSON record per game.
pub fn get_games_dir() -> PathBuf {
    get_data_dir().join("games")
}

/// Largest PGN text accepted on import, in bytes.
pub fn get_max_pgn_bytes() -> usize {
    read_usize(MAX_PGN_BYTES_VAR, ParseLimits::DEFAULT_MAX_INPUT_BYTES)
}

/// Deepest variation nesting accepted on import.
pub fn get_max_variation_depth() -> usize {
    read_usize(
        MAX_VARIATION_DEPTH_VAR,
        ParseLimits::DEFAULT_MAX_VARIATION_DEPTH,
    )
}

pub fn parse_limits() -> ParseLimits {
    ParseLimits {
        max_input_bytes: get_max_pgn_bytes(),
        max_variation_depth: get_max_variation_depth(),
    }
}

fn read_usize(var: &str, default: usize) -> usize {
    match std::env::var(var) {
        Ok(raw) => parse_usize(&raw).unwrap_or_else(|| {
            tracing::warn!(var, value = %raw, default, "ignoring invalid setting");
            default
        }),
        Err(_) => default,
    }
}

fn parse_usize(raw: &str) -> Option<usize> {
    raw.trim().parse().ok().filter(|&n| n > 0)
}

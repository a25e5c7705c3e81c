//! Annotated chess move trees: a mainline with arbitrarily nested
//! variations, per-move annotations with a dirty-state protocol, PGN import
//! and export, and the merge and reconciliation walks built on top.

pub mod analysis;
pub mod annotations;
pub mod converters;
pub mod game;
pub mod merge;
pub mod moves;
pub mod pgn;
pub mod position;
pub mod reconcile;
pub mod tree;
pub mod types;
pub mod uci;

pub use analysis::AnalysisScore;
pub use annotations::{
    strip_dirty_marker, AnnotationError, AnnotationKey, AnnotationValue, Annotations, Arrow,
    ColoredSquare, DrawColor, Nag, NagSet, ANNOTATION_SCHEMA_VERSION, DIRTY_MARKER,
};
pub use game::{Game, GameResult, TagPairs};
pub use merge::{
    merge_games, merge_line, merge_suggestions, MergeError, MergeMode, MergeOptions, MergeReport,
    SuggestedVariation,
};
pub use moves::MoveDescriptor;
pub use pgn::{parse_pgn, parse_pgn_games, parse_pgn_with_limits, write_pgn, Location, ParseLimits, PgnError};
pub use position::{FenError, Position, PositionError};
pub use reconcile::{collect_dirty, mark_all_saved, mark_subtree_saved, DirtyAnnotation};
pub use tree::{MoveNode, MoveTree, NodeId, TreeError};
pub use types::{PieceColor, PieceKind};
pub use uci::{format_uci_move, parse_uci_move};

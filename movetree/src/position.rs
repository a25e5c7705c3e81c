//! Immutable board states addressed by their FEN.

use cozy_chess::{Board, GameStatus, Move};

use crate::types::PieceColor;
use crate::uci::format_uci_move;

/// An immutable board state: placement, side to move, castling rights,
/// en passant square and clocks.
///
/// Positions are never mutated in place. [`Position::play`] derives the
/// successor from a parent position and a move.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    fen: String,
}

impl Position {
    pub fn from_board(board: Board) -> Self {
        let fen = board.to_string();
        Self { board, fen }
    }

    /// Parse a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fen = fen.trim();
        if fen.split_whitespace().count() < 4 {
            return Err(FenError::InvalidFormat);
        }
        let board: Board = fen.parse().map_err(|_| FenError::InvalidBoardLayout)?;
        Ok(Self::from_board(board))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Canonical FEN of this position.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// FEN without the half-move clock and full-move number.
    ///
    /// Two positions reached by different move orders share a normalized FEN.
    pub fn normalized_fen(&self) -> String {
        self.fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.board.side_to_move().into()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    /// Ply index of the half-move that produced this position.
    ///
    /// The standard start position is ply 0, so its first move is ply 1.
    pub fn starting_ply(&self) -> u32 {
        let full = u32::from(self.board.fullmove_number().max(1));
        let black = u32::from(self.side_to_move() == PieceColor::Black);
        (full - 1) * 2 + black
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    pub fn is_checkmate(&self) -> bool {
        self.board.status() == GameStatus::Won
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.board.is_legal(mv)
    }

    /// All legal moves in cozy-chess notation (castling is king-takes-rook).
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Play a move, returning the successor position.
    pub fn play(&self, mv: Move) -> Result<Position, PositionError> {
        let mut board = self.board.clone();
        board
            .try_play(mv)
            .map_err(|_| PositionError::IllegalMove(format_uci_move(mv)))?;
        Ok(Self::from_board(board))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::from_board(Board::default())
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen
    }
}

impl Eq for Position {}

impl std::hash::Hash for Position {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fen.hash(state);
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fen)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}

#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::parse_square;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn mv(from: &str, to: &str) -> Move {
        Move {
            from: parse_square(from).unwrap(),
            to: parse_square(to).unwrap(),
            promotion: None,
        }
    }

    #[test]
    fn test_default_is_start_position() {
        let pos = Position::default();
        assert_eq!(pos.fen(), START_FEN);
        assert_eq!(pos.starting_ply(), 0);
        assert_eq!(pos.side_to_move(), PieceColor::White);
    }

    #[test]
    fn test_play_returns_new_position() {
        let start = Position::default();
        let after = start.play(mv("e2", "e4")).unwrap();
        assert_eq!(start.fen(), START_FEN);
        assert_ne!(after, start);
        assert_eq!(after.side_to_move(), PieceColor::Black);
        assert_eq!(after.starting_ply(), 1);
    }

    #[test]
    fn test_play_rejects_illegal_move() {
        let start = Position::default();
        assert!(matches!(
            start.play(mv("e2", "e5")),
            Err(PositionError::IllegalMove(_))
        ));
    }

    #[test]
    fn test_normalized_fen_ignores_clocks() {
        let a = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let b = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 12 40").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.normalized_fen(), b.normalized_fen());
    }

    #[test]
    fn test_starting_ply_from_fen() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 10").unwrap();
        assert_eq!(pos.starting_ply(), 19);
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            Position::from_fen("not a fen"),
            Err(FenError::InvalidFormat) | Err(FenError::InvalidBoardLayout)
        ));
        assert!(matches!(Position::from_fen(""), Err(FenError::InvalidFormat)));
    }

    #[test]
    fn test_checkmate_detection() {
        // Fool's mate
        let pos =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(pos.is_check());
        assert!(pos.is_checkmate());
    }
}

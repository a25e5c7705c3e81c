//! The move played at a node, in SAN plus machine-usable fields.

use cozy_chess::{Move, Square};

use crate::converters::{format_piece, format_square};
use crate::pgn::san::format_san;
use crate::position::Position;
use crate::types::{PieceColor, PieceKind};
use crate::uci::{is_castling, standard_destination};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveDescriptor {
    pub san: String,
    pub from: Square,
    /// King destination for castling, not the rook square.
    pub to: Square,
    pub piece: PieceKind,
    pub color: PieceColor,
    pub promotion: Option<PieceKind>,
    pub capture: bool,
    pub castle: bool,
    raw: Move,
}

impl MoveDescriptor {
    /// Describe `mv` as played from `position`.
    ///
    /// Returns `None` when no piece of the side to move stands on the origin.
    pub fn describe(position: &Position, mv: Move) -> Option<Self> {
        let board = position.board();
        let piece = board.piece_on(mv.from)?;
        let color = board.color_on(mv.from)?;
        if color != board.side_to_move() {
            return None;
        }
        let castle = is_castling(board, mv);
        let capture = !castle
            && (board.piece_on(mv.to).is_some()
                || (piece == cozy_chess::Piece::Pawn && mv.from.file() != mv.to.file()));

        Some(Self {
            san: format_san(board, mv),
            from: mv.from,
            to: standard_destination(board, mv),
            piece: piece.into(),
            color: color.into(),
            promotion: mv.promotion.map(PieceKind::from),
            capture,
            castle,
            raw: mv,
        })
    }

    /// The cozy-chess move, used to replay this move on a position.
    pub fn raw(&self) -> Move {
        self.raw
    }

    /// Standard UCI form (`e1g1` for castling).
    pub fn uci(&self) -> String {
        let mut s = format!("{}{}", format_square(self.from), format_square(self.to));
        if let Some(promo) = self.promotion {
            s.push(format_piece(promo.into()));
        }
        s
    }
}

impl std::fmt::Display for MoveDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.san)
    }
}

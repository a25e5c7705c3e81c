//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Rank, Square};

use crate::converters::{format_piece, format_square, parse_square};
use crate::types::PieceKind;

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// Returns the move unchanged unless the converted form is in `legal_moves`.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = match mv.to.file() {
            File::G => File::H,
            _ => File::A,
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Whether `mv` is a castling move on `board` (king captures own rook).
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(cozy_chess::Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Destination square as a human sees it: the king's landing square for castling.
pub fn standard_destination(board: &Board, mv: Move) -> Square {
    if is_castling(board, mv) {
        let file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
            File::G
        } else {
            File::C
        };
        return Square::new(file, mv.from.rank());
    }
    mv.to
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q").
///
/// Castling is rendered king-to-rook; use [`standard_destination`] first
/// for the e1g1 form.
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse a UCI move against `board`, accepting both castling forms.
pub fn parse_uci_move(board: &Board, uci: &str) -> Result<Move, UciError> {
    let uci = uci.trim();
    if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
        return Err(UciError::InvalidFormat(uci.to_string()));
    }
    let from = parse_square(&uci[0..2]).ok_or_else(|| UciError::InvalidFormat(uci.to_string()))?;
    let to = parse_square(&uci[2..4]).ok_or_else(|| UciError::InvalidFormat(uci.to_string()))?;
    let promotion = match uci[4..].chars().next() {
        Some(c) => Some(
            PieceKind::from_promotion_char(c)
                .ok_or_else(|| UciError::InvalidFormat(uci.to_string()))?
                .into(),
        ),
        None => None,
    };

    let mut legal = Vec::new();
    board.generate_moves(|mvs| {
        legal.extend(mvs);
        false
    });

    let mv = convert_uci_castling_to_cozy(
        Move {
            from,
            to,
            promotion,
        },
        &legal,
    );
    if !legal.contains(&mv) {
        return Err(UciError::IllegalMove(uci.to_string()));
    }
    Ok(mv)
}

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("Invalid UCI move: {0}")]
    InvalidFormat(String),
    #[error("Illegal UCI move: {0}")]
    IllegalMove(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Piece;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_uci_castling_both_forms() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let standard = parse_uci_move(&board, "e1g1").unwrap();
        let cozy = parse_uci_move(&board, "e1h1").unwrap();
        assert_eq!(standard, cozy);
        assert!(is_castling(&board, standard));
        assert_eq!(
            standard_destination(&board, standard),
            Square::new(File::G, Rank::First)
        );
    }

    #[test]
    fn test_parse_uci_rejects_illegal() {
        let board = Board::default();
        assert!(matches!(
            parse_uci_move(&board, "e2e5"),
            Err(UciError::IllegalMove(_))
        ));
        assert!(matches!(
            parse_uci_move(&board, "zz"),
            Err(UciError::InvalidFormat(_))
        ));
    }
}

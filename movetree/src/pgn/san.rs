use cozy_chess::{Board, GameStatus, Move, Piece, Square};

use crate::converters::{file_char, format_square, parse_file, parse_rank, parse_square};
use crate::types::PieceKind;
use crate::uci::{format_uci_move, is_castling};

/// Parse Standard Algebraic Notation (SAN) move.
///
/// Trailing check, mate and glyph markers (`+ # ! ?`) are ignored. Castling
/// accepts both `O-O` and `0-0`; promotions accept `e8=Q` and `e8Q`.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let body = san.trim_end_matches(['+', '#', '!', '?']);
    if body.is_empty() || !body.is_ascii() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    if let Some(kingside) = castle_side(body) {
        return legal
            .into_iter()
            .find(|mv| {
                is_castling(board, *mv)
                    && ((mv.to.file() as u8) > (mv.from.file() as u8)) == kingside
            })
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let (piece, body) = match body.chars().next().and_then(PieceKind::from_san_letter) {
        Some(kind) => (kind, &body[1..]),
        None => (PieceKind::Pawn, body),
    };

    let (body, promotion) = split_promotion(body, piece, san)?;

    if body.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let (prefix, dest) = body.split_at(body.len() - 2);
    let to = parse_square(dest).ok_or_else(|| SanError::InvalidSquare(dest.to_string()))?;

    let mut from_file = None;
    let mut from_rank = None;
    for c in prefix.chars() {
        if c == 'x' || c == ':' || c == '-' {
            continue;
        }
        if let Some(file) = parse_file(c) {
            from_file = Some(file);
        } else if let Some(rank) = parse_rank(c) {
            from_rank = Some(rank);
        } else {
            return Err(SanError::InvalidFormat(san.to_string()));
        }
    }

    let wanted: Piece = piece.into();
    let mut candidates = legal.into_iter().filter(|mv| {
        board.piece_on(mv.from) == Some(wanted)
            && !is_castling(board, *mv)
            && mv.to == to
            && mv.promotion == promotion
            && from_file.map_or(true, |f| mv.from.file() == f)
            && from_rank.map_or(true, |r| mv.from.rank() == r)
    });

    match (candidates.next(), candidates.next()) {
        (Some(mv), None) => Ok(mv),
        (None, _) => Err(SanError::NoLegalMove(san.to_string())),
        (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format a legal move as SAN, including the check or mate suffix.
///
/// Moves with no piece on their origin square fall back to UCI.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format_uci_move(mv);
    };

    let mut san = String::new();

    if is_castling(board, mv) {
        if (mv.to.file() as u8) > (mv.from.file() as u8) {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let capture = board.piece_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match PieceKind::from(piece).san_letter() {
            Some(letter) => {
                san.push(letter);
                san.push_str(&disambiguation(board, mv, piece));
            }
            None => {
                if capture {
                    san.push(file_char(mv.from.file()));
                }
            }
        }

        if capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(PieceKind::from(promo).to_char_lower().to_ascii_uppercase());
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }

    san
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn castle_side(body: &str) -> Option<bool> {
    match body {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

fn split_promotion<'a>(
    body: &'a str,
    piece: PieceKind,
    san: &str,
) -> Result<(&'a str, Option<Piece>), SanError> {
    if let Some((head, promo)) = body.split_once('=') {
        let mut chars = promo.chars();
        let kind = chars
            .next()
            .and_then(PieceKind::from_promotion_char)
            .ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?;
        if chars.next().is_some() || piece != PieceKind::Pawn {
            return Err(SanError::InvalidPromotion(san.to_string()));
        }
        return Ok((head, Some(kind.into())));
    }

    if piece == PieceKind::Pawn {
        if let Some(last) = body.chars().last() {
            if let Some(kind) = PieceKind::from_san_letter(last) {
                if kind == PieceKind::King {
                    return Err(SanError::InvalidPromotion(san.to_string()));
                }
                return Ok((&body[..body.len() - 1], Some(kind.into())));
            }
        }
    }

    Ok((body, None))
}

/// Origin file and/or rank needed to tell `mv` apart from other moves of the
/// same piece type to the same square.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castling(board, *other)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());

    if !shares_file {
        file_char(mv.from.file()).to_string()
    } else if !shares_rank {
        format_square(mv.from)[1..].to_string()
    } else {
        format_square(mv.from)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

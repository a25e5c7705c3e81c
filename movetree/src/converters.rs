//! Conversions between cozy-chess board types and their text forms.

use cozy_chess::{File, Piece, Rank, Square};

pub fn file_char(file: File) -> char {
    (b'a' + file as u8) as char
}

pub fn rank_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

pub fn parse_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::ALL[(c as u8 - b'a') as usize]),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::ALL[(c as u8 - b'1') as usize]),
        _ => None,
    }
}

/// Format a square as `e4`.
pub fn format_square(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(file_char(sq.file()));
    s.push(rank_char(sq.rank()));
    s
}

/// Parse a two-character square such as `e4`.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Lowercase piece letter as used by UCI promotions.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_round_trip() {
        for name in ["a1", "e4", "h8", "c7"] {
            let sq = parse_square(name).unwrap();
            assert_eq!(format_square(sq), name);
        }
    }

    #[test]
    fn test_parse_square_rejects_garbage() {
        assert_eq!(parse_square("i1"), None);
        assert_eq!(parse_square("a9"), None);
        assert_eq!(parse_square("e44"), None);
        assert_eq!(parse_square(""), None);
    }
}

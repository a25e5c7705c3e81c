//! Board overlay markers carried in `[%cal ...]` and `[%csl ...]` commands.

use cozy_chess::Square;

use crate::converters::{format_square, parse_square};

use super::AnnotationError;

/// Overlay brush color, encoded by a single uppercase letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawColor {
    Green,
    Red,
    Yellow,
    Blue,
    Orange,
    Magenta,
}

impl DrawColor {
    pub fn code(self) -> char {
        match self {
            Self::Green => 'G',
            Self::Red => 'R',
            Self::Yellow => 'Y',
            Self::Blue => 'B',
            Self::Orange => 'O',
            Self::Magenta => 'C',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'G' => Some(Self::Green),
            'R' => Some(Self::Red),
            'Y' => Some(Self::Yellow),
            'B' => Some(Self::Blue),
            'O' => Some(Self::Orange),
            'C' => Some(Self::Magenta),
            _ => None,
        }
    }
}

/// An arrow such as `Ge2e4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arrow {
    pub color: DrawColor,
    pub from: Square,
    pub to: Square,
}

/// A highlighted square such as `Rd5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColoredSquare {
    pub color: DrawColor,
    pub square: Square,
}

impl std::fmt::Display for Arrow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.color.code(),
            format_square(self.from),
            format_square(self.to)
        )
    }
}

impl std::fmt::Display for ColoredSquare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.color.code(), format_square(self.square))
    }
}

fn split_items(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_color(item: &str) -> Result<DrawColor, AnnotationError> {
    item.chars()
        .next()
        .and_then(DrawColor::from_code)
        .ok_or_else(|| AnnotationError::InvalidDrawable(item.to_string()))
}

/// Parse a `%cal` value: comma-separated arrows.
pub fn parse_arrows(value: &str) -> Result<Vec<Arrow>, AnnotationError> {
    split_items(value)
        .map(|item| {
            if item.len() != 5 || !item.is_ascii() {
                return Err(AnnotationError::InvalidDrawable(item.to_string()));
            }
            let color = parse_color(item)?;
            let from = parse_square(&item[1..3])
                .ok_or_else(|| AnnotationError::InvalidDrawable(item.to_string()))?;
            let to = parse_square(&item[3..5])
                .ok_or_else(|| AnnotationError::InvalidDrawable(item.to_string()))?;
            Ok(Arrow { color, from, to })
        })
        .collect()
}

/// Parse a `%csl` value: comma-separated colored squares.
pub fn parse_squares(value: &str) -> Result<Vec<ColoredSquare>, AnnotationError> {
    split_items(value)
        .map(|item| {
            if item.len() != 3 || !item.is_ascii() {
                return Err(AnnotationError::InvalidDrawable(item.to_string()));
            }
            let color = parse_color(item)?;
            let square = parse_square(&item[1..3])
                .ok_or_else(|| AnnotationError::InvalidDrawable(item.to_string()))?;
            Ok(ColoredSquare { color, square })
        })
        .collect()
}

pub(crate) fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arrows() {
        let arrows = parse_arrows("Ge2e4, Rd7d5").unwrap();
        assert_eq!(arrows.len(), 2);
        assert_eq!(arrows[0].color, DrawColor::Green);
        assert_eq!(join(&arrows), "Ge2e4,Rd7d5");
    }

    #[test]
    fn test_parse_squares() {
        let squares = parse_squares("Ye4,Cd5").unwrap();
        assert_eq!(squares[1].color, DrawColor::Magenta);
        assert_eq!(join(&squares), "Ye4,Cd5");
    }

    #[test]
    fn test_invalid_drawables() {
        assert!(parse_arrows("Xe2e4").is_err());
        assert!(parse_arrows("Ge2").is_err());
        assert!(parse_squares("Gz9").is_err());
    }
}

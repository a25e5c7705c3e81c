use tracing::warn;

use super::{Location, PgnError};
use crate::annotations::Nag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TokenKind {
    Tag { name: String, value: String },
    Comment(String),
    MoveNumber,
    San(String),
    Nag(u8),
    OpenVariation,
    CloseVariation,
    Result(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

const RESULTS: [&str; 3] = ["1-0", "0-1", "1/2-1/2"];

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '{' | '}' | '[' | ']' | ';' | '$')
}

pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, PgnError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, location: Location) {
        self.tokens.push(Token { kind, location });
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn run(mut self) -> Result<Vec<Token>, PgnError> {
        while let Some(c) = self.peek() {
            let location = self.location();
            match c {
                c if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                '%' if self.column == 1 => self.skip_line(),
                ';' => self.skip_line(),
                '[' => self.tag(location)?,
                '{' => self.comment(location)?,
                '(' => {
                    self.bump();
                    self.push(TokenKind::OpenVariation, location);
                }
                ')' => {
                    self.bump();
                    self.push(TokenKind::CloseVariation, location);
                }
                '$' => self.nag(location)?,
                '*' => {
                    self.bump();
                    self.push(TokenKind::Result("*".to_string()), location);
                }
                '}' | ']' => {
                    return Err(PgnError::malformed(format!("unexpected '{c}'"), location));
                }
                _ => self.word(location)?,
            }
        }
        Ok(self.tokens)
    }

    fn tag(&mut self, location: Location) -> Result<(), PgnError> {
        self.bump();
        self.skip_whitespace();

        let start = self.offset;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let name = self.src[start..self.offset].to_string();
        if name.is_empty() {
            return Err(PgnError::malformed("expected tag name", self.location()));
        }

        self.skip_whitespace();
        if self.bump() != Some('"') {
            return Err(PgnError::malformed(
                format!("expected quoted value for tag {name}"),
                self.location(),
            ));
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(PgnError::malformed("unterminated tag value", location));
                }
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => {
                        return Err(PgnError::malformed("unterminated tag value", location));
                    }
                },
                Some('"') => break,
                Some(c) => value.push(c),
            }
        }

        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(PgnError::malformed(
                format!("expected ']' after tag {name}"),
                self.location(),
            ));
        }
        self.push(TokenKind::Tag { name, value }, location);
        Ok(())
    }

    fn comment(&mut self, location: Location) -> Result<(), PgnError> {
        self.bump();
        let start = self.offset;
        loop {
            match self.bump() {
                None => return Err(PgnError::malformed("unterminated comment", location)),
                Some('}') => break,
                Some(_) => {}
            }
        }
        let text = self.src[start..self.offset - 1].to_string();
        self.push(TokenKind::Comment(text), location);
        Ok(())
    }

    fn nag(&mut self, location: Location) -> Result<(), PgnError> {
        self.bump();
        let start = self.offset;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let digits = &self.src[start..self.offset];
        let code: u8 = digits
            .parse()
            .map_err(|_| PgnError::malformed(format!("invalid NAG ${digits}"), location))?;
        self.push(TokenKind::Nag(code), location);
        Ok(())
    }

    fn word(&mut self, location: Location) -> Result<(), PgnError> {
        let start = self.offset;
        while self.peek().is_some_and(|c| !is_delimiter(c)) {
            self.bump();
        }
        let word = &self.src[start..self.offset];

        if RESULTS.contains(&word) {
            self.push(TokenKind::Result(word.to_string()), location);
            return Ok(());
        }

        if word.starts_with(|c: char| c.is_ascii_digit()) && !word.starts_with("0-0") {
            let rest = word.trim_start_matches(|c: char| c.is_ascii_digit());
            let san = rest.trim_start_matches('.');
            if san.len() == rest.len() && !rest.is_empty() {
                return Err(PgnError::malformed(format!("unexpected token '{word}'"), location));
            }
            self.push(TokenKind::MoveNumber, location);
            if san.is_empty() {
                return Ok(());
            }
            let san_location = Location {
                offset: location.offset + (word.len() - san.len()),
                column: location.column + (word.len() - san.len()),
                ..location
            };
            return self.san(san, san_location);
        }

        self.san(word, location)
    }

    fn san(&mut self, word: &str, location: Location) -> Result<(), PgnError> {
        let body = word.trim_end_matches(['!', '?']);
        if body.is_empty() {
            return Err(PgnError::malformed(format!("unexpected token '{word}'"), location));
        }
        let suffix = &word[body.len()..];
        self.push(TokenKind::San(body.to_string()), location);
        if !suffix.is_empty() {
            match Nag::from_suffix(suffix) {
                Some(nag) => self.push(TokenKind::Nag(nag.0), location),
                None => warn!(%location, suffix, "ignoring unknown move suffix"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn san(s: &str) -> TokenKind {
        TokenKind::San(s.to_string())
    }

    #[test]
    fn test_tags_and_movetext() {
        let tokens = kinds("[Event \"Casual \\\"blitz\\\"\"]\n\n1. e4 e5 2.Nf3 *");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Tag {
                    name: "Event".to_string(),
                    value: "Casual \"blitz\"".to_string()
                },
                TokenKind::MoveNumber,
                san("e4"),
                san("e5"),
                TokenKind::MoveNumber,
                san("Nf3"),
                TokenKind::Result("*".to_string()),
            ]
        );
    }

    #[test]
    fn test_black_move_numbers_and_castling() {
        let tokens = kinds("12... O-O 13. 0-0-0 1/2-1/2");
        assert_eq!(
            tokens,
            vec![
                TokenKind::MoveNumber,
                san("O-O"),
                TokenKind::MoveNumber,
                san("0-0-0"),
                TokenKind::Result("1/2-1/2".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_variations_and_nags() {
        let tokens = kinds("e4 {good [%clk 1:00]} (d4 $14) ; rest of line\n% escape\nNf3?!");
        assert_eq!(
            tokens,
            vec![
                san("e4"),
                TokenKind::Comment("good [%clk 1:00]".to_string()),
                TokenKind::OpenVariation,
                san("d4"),
                TokenKind::Nag(14),
                TokenKind::CloseVariation,
                san("Nf3"),
                TokenKind::Nag(6),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_reports_location() {
        let err = tokenize("1. e4\n  {never closed").unwrap_err();
        let location = err.location().unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.column, 3);
        assert_eq!(location.offset, 8);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(tokenize("[Event \"x\"").is_err());
        assert!(tokenize("1. e4 }").is_err());
        assert!(tokenize("$999").is_err());
        assert!(tokenize("12x").is_err());
    }
}

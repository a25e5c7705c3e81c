use tracing::{debug, warn};

use super::lexer::{tokenize, Token, TokenKind};
use super::san::parse_san;
use super::{Location, ParseLimits, PgnError};
use crate::annotations::{split_commands, AnnotationKey, Annotations, Nag};
use crate::game::{Game, TagPairs};
use crate::position::Position;
use crate::tree::{MoveTree, NodeId};

/// Parse a single game with the default [`ParseLimits`].
pub fn parse_pgn(input: &str) -> Result<Game, PgnError> {
    parse_pgn_with_limits(input, ParseLimits::default())
}

/// Parse a single game. Anything after the first game is an error.
pub fn parse_pgn_with_limits(input: &str, limits: ParseLimits) -> Result<Game, PgnError> {
    let mut parser = Parser::new(input, limits)?;
    let game = parser
        .game()?
        .ok_or_else(|| PgnError::malformed("no game found", Location::default()))?;
    if let Some(token) = parser.peek() {
        return Err(PgnError::malformed(
            "unexpected content after the end of the game",
            token.location,
        ));
    }
    Ok(game)
}

/// Parse every game of a multi-game PGN file.
pub fn parse_pgn_games(input: &str, limits: ParseLimits) -> Result<Vec<Game>, PgnError> {
    let mut parser = Parser::new(input, limits)?;
    let mut games = Vec::new();
    while let Some(game) = parser.game()? {
        games.push(game);
    }
    debug!(games = games.len(), "parsed PGN file");
    Ok(games)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    limits: ParseLimits,
}

/// Movetext state for the line currently being read.
struct LineState {
    /// Last move played, or the branch point while no move has been read.
    last: NodeId,
    /// No move has been read yet in the current variation.
    fresh: bool,
    /// The next comment belongs after `last`.
    comment_slot_open: bool,
    /// Comments waiting for the next move.
    pending: Vec<String>,
}

impl Parser {
    fn new(input: &str, limits: ParseLimits) -> Result<Self, PgnError> {
        if input.len() > limits.max_input_bytes {
            return Err(PgnError::LimitExceeded(format!(
                "input is {} bytes, limit is {}",
                input.len(),
                limits.max_input_bytes
            )));
        }
        Ok(Self {
            tokens: tokenize(input)?,
            cursor: 0,
            limits,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn game(&mut self) -> Result<Option<Game>, PgnError> {
        let mut tags = TagPairs::new();
        while let Some(Token {
            kind: TokenKind::Tag { .. },
            ..
        }) = self.peek()
        {
            if let Some(Token {
                kind: TokenKind::Tag { name, value },
                location,
            }) = self.next_token()
            {
                tags.set(&name, &value).map_err(|_| {
                    PgnError::malformed(format!("invalid tag name {name}"), location)
                })?;
            }
        }
        if tags.is_empty() && self.peek().is_none() {
            return Ok(None);
        }

        let start = match tags.get("FEN") {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::default(),
        };
        let mut tree = MoveTree::new(start);
        let result = self.movetext(&mut tree)?;

        if let Some(result) = result.filter(|r| r != "*") {
            if tags.get("Result").is_none() {
                tags.set("Result", &result)?;
            }
        }
        Ok(Some(Game::from_parts(tags, tree)))
    }

    /// Read movetext up to a result token, the next game's tags or the end.
    fn movetext(&mut self, tree: &mut MoveTree) -> Result<Option<String>, PgnError> {
        let mut frames: Vec<NodeId> = Vec::new();
        let mut state = LineState {
            last: tree.root(),
            fresh: false,
            comment_slot_open: true,
            pending: Vec::new(),
        };
        let mut result = None;

        while let Some(token) = self.peek() {
            if matches!(token.kind, TokenKind::Tag { .. }) {
                break;
            }
            let Some(Token { kind, location }) = self.next_token() else {
                break;
            };
            match kind {
                TokenKind::Tag { .. } | TokenKind::MoveNumber => {}
                TokenKind::Result(token) => {
                    result = Some(token);
                    if !frames.is_empty() {
                        return Err(PgnError::malformed("result inside a variation", location));
                    }
                    break;
                }
                TokenKind::San(san) => {
                    let parent = state.last;
                    let board = tree
                        .position_at(parent)
                        .map_err(|e| PgnError::malformed(e.to_string(), location))?
                        .board()
                        .clone();
                    let mv = parse_san(&board, &san).map_err(|e| {
                        PgnError::malformed(format!("illegal move {san}: {e}"), location)
                    })?;
                    let inserted = if state.fresh {
                        tree.add_variation(parent, mv)
                    } else {
                        tree.insert_move(parent, mv)
                    };
                    let id = inserted.map_err(|e| PgnError::malformed(e.to_string(), location))?;
                    for comment in state.pending.drain(..) {
                        if let Ok(annotations) = tree.annotations_mut(id) {
                            apply_comment(annotations, AnnotationKey::CommentBefore, &comment);
                        }
                    }
                    state.last = id;
                    state.fresh = false;
                    state.comment_slot_open = true;
                }
                TokenKind::Nag(code) => {
                    if state.fresh || state.last.is_root() {
                        warn!(%location, code, "ignoring NAG without a move");
                        continue;
                    }
                    if let Ok(annotations) = tree.annotations_mut(state.last) {
                        annotations.add_nag(Nag(code));
                    }
                }
                TokenKind::Comment(text) => {
                    if state.comment_slot_open && !state.fresh {
                        if let Ok(annotations) = tree.annotations_mut(state.last) {
                            apply_comment(annotations, AnnotationKey::CommentAfter, &text);
                        }
                        state.comment_slot_open = false;
                    } else {
                        state.pending.push(text);
                    }
                }
                TokenKind::OpenVariation => {
                    if state.fresh || state.last.is_root() {
                        return Err(PgnError::malformed(
                            "variation without a preceding move",
                            location,
                        ));
                    }
                    if frames.len() >= self.limits.max_variation_depth {
                        return Err(PgnError::LimitExceeded(format!(
                            "variations nested deeper than {} at {location}",
                            self.limits.max_variation_depth
                        )));
                    }
                    flush_pending(tree, &mut state);
                    let parent = tree
                        .node(state.last)
                        .ok()
                        .and_then(|node| node.previous())
                        .ok_or_else(|| {
                            PgnError::malformed("variation without a preceding move", location)
                        })?;
                    frames.push(state.last);
                    state.last = parent;
                    state.fresh = true;
                    state.comment_slot_open = false;
                }
                TokenKind::CloseVariation => {
                    if state.fresh {
                        return Err(PgnError::malformed("empty variation", location));
                    }
                    let Some(resume) = frames.pop() else {
                        return Err(PgnError::malformed("unbalanced ')'", location));
                    };
                    flush_pending(tree, &mut state);
                    state.last = resume;
                    state.comment_slot_open = false;
                }
            }
        }

        if !frames.is_empty() {
            let location = self.peek().map(|t| t.location).unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.location)
                    .unwrap_or_default()
            });
            return Err(PgnError::malformed("unterminated variation", location));
        }
        flush_pending(tree, &mut state);
        Ok(result)
    }
}

/// Comments with no following move are appended after the last move.
fn flush_pending(tree: &mut MoveTree, state: &mut LineState) {
    if state.pending.is_empty() {
        return;
    }
    if let Ok(annotations) = tree.annotations_mut(state.last) {
        for comment in state.pending.drain(..) {
            apply_comment(annotations, AnnotationKey::CommentAfter, &comment);
        }
    }
    state.pending.clear();
}

/// Fold a raw comment into a store: commands become entries, the rest is
/// appended to the text under `key`.
///
/// Commands whose value does not fit their key stay in the text.
fn apply_comment(annotations: &mut Annotations, key: AnnotationKey, raw: &str) {
    let parts = split_commands(raw);
    let mut text = parts.text;
    for (name, value) in parts.commands {
        let command = AnnotationKey::from_command(&name);
        if let Err(err) = annotations.set_parsed(command, &value) {
            warn!(command = %name, "keeping invalid command as text: {err}");
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("[%{name} {value}]"));
        }
    }
    annotations.append_parsed_text(key, &text);
}

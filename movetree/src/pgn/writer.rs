use crate::analysis::{is_white_ply, move_number};
use crate::annotations::{render_comment, AnnotationKey, Annotations};
use crate::game::{Game, GameResult};
use crate::tree::{MoveTree, NodeId};

const LINE_WIDTH: usize = 80;

/// Render a game as canonical PGN.
///
/// Tags come first in stored order, then the movetext wrapped at 80 columns.
/// Annotation values are written in their rendered form, so dirty markers
/// survive the trip through other PGN tools.
pub fn write_pgn(game: &Game) -> String {
    let mut out = String::new();
    for (name, value) in game.tags().iter() {
        out.push_str(&format!("[{} \"{}\"]\n", name, escape_tag_value(value)));
    }
    if !game.tags().is_empty() {
        out.push('\n');
    }

    let mut tokens = movetext_tokens(game.tree());
    let result = game
        .tags()
        .get("Result")
        .and_then(GameResult::parse)
        .map_or("*", GameResult::as_str);
    tokens.push(result.to_string());

    out.push_str(&wrap(&tokens, LINE_WIDTH));
    out.push('\n');
    out
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

enum Step {
    Move(NodeId),
    /// Everything after the node: its mainline move, the alternatives to it,
    /// then the continuation.
    Line(NodeId),
    Open,
    Close,
}

struct TokenWriter {
    tokens: Vec<String>,
    /// A `(` waiting to be attached to the next token.
    open_pending: bool,
    /// Black moves need an explicit `N...` number.
    needs_number: bool,
    /// A comment written now would attach after the previous move.
    comment_slot_open: bool,
}

impl TokenWriter {
    fn push(&mut self, token: String) {
        if self.open_pending {
            self.open_pending = false;
            self.tokens.push(format!("({token}"));
        } else {
            self.tokens.push(token);
        }
    }

    fn comment(&mut self, text: &str) {
        self.push(format!("{{{text}}}"));
        self.needs_number = true;
    }

    fn close(&mut self) {
        match self.tokens.last_mut() {
            Some(last) => last.push(')'),
            None => self.tokens.push(")".to_string()),
        }
        self.needs_number = true;
        self.comment_slot_open = false;
    }
}

fn after_comment(annotations: &Annotations) -> String {
    render_comment(
        annotations.commands(),
        annotations.get(&AnnotationKey::CommentAfter).as_deref(),
    )
}

fn movetext_tokens(tree: &MoveTree) -> Vec<String> {
    let mut writer = TokenWriter {
        tokens: Vec::new(),
        open_pending: false,
        needs_number: true,
        comment_slot_open: true,
    };

    let root = tree.root();
    if let Ok(annotations) = tree.annotations(root) {
        let intro = after_comment(annotations);
        if !intro.is_empty() {
            writer.comment(&intro);
            writer.comment_slot_open = false;
        }
    }

    let mut stack = vec![Step::Line(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Line(id) => {
                let Some(node) = tree.get(id) else { continue };
                let Some(next) = node.next() else { continue };
                stack.push(Step::Line(next));
                for &head in node.variations().iter().rev() {
                    stack.push(Step::Close);
                    stack.push(Step::Line(head));
                    stack.push(Step::Move(head));
                    stack.push(Step::Open);
                }
                stack.push(Step::Move(next));
            }
            Step::Open => {
                writer.open_pending = true;
                writer.needs_number = true;
                writer.comment_slot_open = false;
            }
            Step::Close => writer.close(),
            Step::Move(id) => {
                let Some(node) = tree.get(id) else { continue };
                let Some(san) = node.san() else { continue };
                let annotations = node.annotations();

                if let Some(before) = annotations.get(&AnnotationKey::CommentBefore) {
                    if writer.comment_slot_open {
                        // Keeps the comment from attaching to the previous move.
                        writer.comment("");
                    }
                    writer.comment(&before);
                }

                let ply = node.ply();
                if is_white_ply(ply) {
                    writer.push(format!("{}.", move_number(ply)));
                } else if writer.needs_number {
                    writer.push(format!("{}...", move_number(ply)));
                }
                writer.push(san.to_string());
                writer.needs_number = false;

                for nag in annotations.nags().iter() {
                    writer.push(nag.to_string());
                }

                let comment = after_comment(annotations);
                if comment.is_empty() {
                    writer.comment_slot_open = true;
                } else {
                    writer.comment(&comment);
                    writer.comment_slot_open = false;
                }
            }
        }
    }
    writer.tokens
}

/// Greedy wrap: tokens are joined by single spaces and never split.
fn wrap(tokens: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        let len = token.chars().count();
        if line_len > 0 && line_len + 1 + len > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += len;
    }
    out
}

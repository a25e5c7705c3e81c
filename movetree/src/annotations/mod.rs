//! Per-node annotation store.
//!
//! Keys form a closed set of reserved names plus a typed extension map for
//! forward-compatible unknown commands. Every entry records whether it holds
//! unsynchronized local edits. Externally that state is the `,unsaved` suffix
//! on the rendered value: [`Annotations::get`] appends it and
//! [`Annotations::set`] strips it, so the suffix never lives inside a stored
//! value.

mod command;
pub mod drawables;
pub mod nag;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::analysis::AnalysisScore;

pub(crate) use command::{render_comment, split_commands};
pub use drawables::{parse_arrows, parse_squares, Arrow, ColoredSquare, DrawColor};
pub use nag::{Nag, NagSet};

/// Version of the reserved key set below.
pub const ANNOTATION_SCHEMA_VERSION: u32 = 1;

/// Suffix marking a value as locally modified and not yet persisted.
pub const DIRTY_MARKER: &str = ",unsaved";

/// Strip exactly one trailing dirty marker, if present.
pub fn strip_dirty_marker(value: &str) -> &str {
    value.strip_suffix(DIRTY_MARKER).unwrap_or(value)
}

pub fn has_dirty_marker(value: &str) -> bool {
    value.ends_with(DIRTY_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationKey {
    CommentBefore,
    CommentAfter,
    /// `%cal`
    Arrows,
    /// `%csl`
    Squares,
    /// `%clk`
    Clock,
    /// `%emt`
    ElapsedMoveTime,
    /// `%eval`
    Eval,
    /// `%dojoComment`: `username,display name,comment id`
    TrainingComment,
    /// `%dojoEngine`
    EngineFound,
    Extension(String),
}

impl AnnotationKey {
    /// Stable name used in deltas and by [`AnnotationKey::parse`].
    pub fn name(&self) -> &str {
        match self {
            Self::CommentBefore => "commentBefore",
            Self::CommentAfter => "commentAfter",
            Self::Arrows => "cal",
            Self::Squares => "csl",
            Self::Clock => "clk",
            Self::ElapsedMoveTime => "emt",
            Self::Eval => "eval",
            Self::TrainingComment => "dojoComment",
            Self::EngineFound => "dojoEngine",
            Self::Extension(name) => name,
        }
    }

    /// Resolve a key name, reserved or not.
    pub fn parse(name: &str) -> Self {
        match name {
            "commentBefore" => Self::CommentBefore,
            "commentAfter" => Self::CommentAfter,
            other => Self::from_command(other),
        }
    }

    /// Resolve the name of a `[%name value]` comment command.
    pub fn from_command(name: &str) -> Self {
        match name {
            "cal" => Self::Arrows,
            "csl" => Self::Squares,
            "clk" => Self::Clock,
            "emt" => Self::ElapsedMoveTime,
            "eval" => Self::Eval,
            "dojoComment" => Self::TrainingComment,
            "dojoEngine" => Self::EngineFound,
            other => Self::Extension(other.to_string()),
        }
    }

    /// Whether the key is a free-text comment rather than an embedded command.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::CommentBefore | Self::CommentAfter)
    }
}

impl std::fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Keys travel by name, so deltas stay readable and unknown keys survive.
impl Serialize for AnnotationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for AnnotationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Text(String),
    Arrows(Vec<Arrow>),
    Squares(Vec<ColoredSquare>),
    Eval(AnalysisScore),
    Flag(bool),
}

impl AnnotationValue {
    /// Text form as it appears in PGN, without any dirty marker.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Arrows(arrows) => drawables::join(arrows),
            Self::Squares(squares) => drawables::join(squares),
            Self::Eval(score) => score.to_pgn_eval(),
            Self::Flag(flag) => flag.to_string(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Arrows(arrows) => arrows.is_empty(),
            Self::Squares(squares) => squares.is_empty(),
            Self::Eval(_) | Self::Flag(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    value: AnnotationValue,
    dirty: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    entries: BTreeMap<AnnotationKey, Entry>,
    nags: NagSet,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered value, with the dirty marker appended when the entry is dirty.
    pub fn get(&self, key: &AnnotationKey) -> Option<String> {
        self.entries.get(key).map(|entry| {
            let mut rendered = entry.value.render();
            if entry.dirty {
                rendered.push_str(DIRTY_MARKER);
            }
            rendered
        })
    }

    pub fn value(&self, key: &AnnotationKey) -> Option<&AnnotationValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Clean text of a text-valued entry.
    pub fn text(&self, key: &AnnotationKey) -> Option<&str> {
        match self.value(key) {
            Some(AnnotationValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Overwrite `key` with `value`.
    ///
    /// A trailing `,unsaved` is stripped and recorded as the dirty state;
    /// no marker is ever added here. An empty value removes the entry.
    pub fn set(&mut self, key: AnnotationKey, value: &str) -> Result<(), AnnotationError> {
        self.set_raw(key, value, true)
    }

    /// Overwrite `key` with a typed value, clean.
    pub fn set_value(
        &mut self,
        key: AnnotationKey,
        value: AnnotationValue,
    ) -> Result<(), AnnotationError> {
        validate(&key, &value.render(), true)?;
        if value.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, Entry { value, dirty: false });
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &AnnotationKey) -> Option<AnnotationValue> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Clear the dirty state of `key`, keeping its value.
    ///
    /// Returns true if the entry was dirty. Calling it again is a no-op.
    pub fn mark_saved(&mut self, key: &AnnotationKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.dirty => {
                entry.dirty = false;
                true
            }
            _ => false,
        }
    }

    pub fn mark_dirty(&mut self, key: &AnnotationKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.dirty => {
                entry.dirty = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_dirty(&self, key: &AnnotationKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.dirty)
    }

    pub fn dirty_keys(&self) -> impl Iterator<Item = &AnnotationKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(key, _)| key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AnnotationKey> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.nags.is_empty()
    }

    pub fn comment_before(&self) -> Option<&str> {
        self.text(&AnnotationKey::CommentBefore)
    }

    pub fn comment_after(&self) -> Option<&str> {
        self.text(&AnnotationKey::CommentAfter)
    }

    pub fn arrows(&self) -> &[Arrow] {
        match self.value(&AnnotationKey::Arrows) {
            Some(AnnotationValue::Arrows(arrows)) => arrows,
            _ => &[],
        }
    }

    pub fn squares(&self) -> &[ColoredSquare] {
        match self.value(&AnnotationKey::Squares) {
            Some(AnnotationValue::Squares(squares)) => squares,
            _ => &[],
        }
    }

    pub fn eval(&self) -> Option<AnalysisScore> {
        match self.value(&AnnotationKey::Eval) {
            Some(AnnotationValue::Eval(score)) => Some(*score),
            _ => None,
        }
    }

    pub fn engine_found(&self) -> bool {
        matches!(
            self.value(&AnnotationKey::EngineFound),
            Some(AnnotationValue::Flag(true))
        )
    }

    pub fn nags(&self) -> &NagSet {
        &self.nags
    }

    pub fn nags_mut(&mut self) -> &mut NagSet {
        &mut self.nags
    }

    pub fn add_nag(&mut self, nag: Nag) -> bool {
        self.nags.insert(nag)
    }

    /// Embedded commands in key order, rendered with their dirty markers.
    pub(crate) fn commands(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.entries
            .keys()
            .filter(|key| !key.is_comment())
            .filter_map(|key| self.get(key).map(|value| (key.name(), value)))
    }

    /// Store a value read from PGN.
    ///
    /// Unlike [`Annotations::set`], free text may keep an unterminated `[%`.
    pub(crate) fn set_parsed(&mut self, key: AnnotationKey, value: &str) -> Result<(), AnnotationError> {
        self.set_raw(key, value, false)
    }

    /// Append free text read from PGN to a comment, space separated.
    pub(crate) fn append_parsed_text(&mut self, key: AnnotationKey, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let dirty = has_dirty_marker(text);
        let text = strip_dirty_marker(text).trim_end();
        match self.entries.get_mut(&key) {
            Some(Entry {
                value: AnnotationValue::Text(existing),
                dirty: existing_dirty,
            }) => {
                existing.push(' ');
                existing.push_str(text);
                *existing_dirty |= dirty;
            }
            _ => {
                self.entries.insert(
                    key,
                    Entry {
                        value: AnnotationValue::Text(text.to_string()),
                        dirty,
                    },
                );
            }
        }
    }

    fn set_raw(&mut self, key: AnnotationKey, value: &str, strict: bool) -> Result<(), AnnotationError> {
        let value = value.trim();
        let dirty = has_dirty_marker(value);
        let clean = strip_dirty_marker(value).trim_end();
        validate(&key, clean, strict)?;

        let value = parse_value(&key, clean)?;
        if value.is_empty() {
            self.entries.remove(&key);
            return Ok(());
        }
        self.entries.insert(key, Entry { value, dirty });
        Ok(())
    }
}

fn parse_value(key: &AnnotationKey, clean: &str) -> Result<AnnotationValue, AnnotationError> {
    if clean.is_empty() {
        return Ok(AnnotationValue::Text(String::new()));
    }
    let value = match key {
        AnnotationKey::Arrows => AnnotationValue::Arrows(parse_arrows(clean)?),
        AnnotationKey::Squares => AnnotationValue::Squares(parse_squares(clean)?),
        AnnotationKey::Eval => AnnotationValue::Eval(
            AnalysisScore::from_pgn_eval(clean)
                .ok_or_else(|| AnnotationError::InvalidEval(clean.to_string()))?,
        ),
        AnnotationKey::EngineFound => AnnotationValue::Flag(match clean {
            "true" | "1" => true,
            "false" | "0" => false,
            other => return Err(AnnotationError::InvalidFlag(other.to_string())),
        }),
        _ => AnnotationValue::Text(clean.to_string()),
    };
    Ok(value)
}

/// Reject values that would not read back unchanged from PGN.
fn validate(key: &AnnotationKey, clean: &str, strict: bool) -> Result<(), AnnotationError> {
    let unrepresentable = |reason: &'static str| AnnotationError::UnrepresentableValue {
        key: key.name().to_string(),
        reason,
    };

    if let AnnotationKey::Extension(name) = key {
        // A reserved name would serialize as the built-in key it shadows.
        let reserved = !matches!(AnnotationKey::parse(name), AnnotationKey::Extension(_));
        let valid = !reserved
            && !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AnnotationError::InvalidKeyName(name.clone()));
        }
    }
    if clean.contains('}') {
        return Err(unrepresentable("contains '}'"));
    }
    if has_dirty_marker(clean) {
        return Err(unrepresentable("ends with a second dirty marker"));
    }
    if key.is_comment() {
        if strict && clean.contains("[%") {
            return Err(unrepresentable("contains '[%'"));
        }
    } else if clean.contains(']') {
        return Err(unrepresentable("contains ']'"));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("Value for {key} cannot be represented in PGN: {reason}")]
    UnrepresentableValue { key: String, reason: &'static str },
    #[error("Invalid annotation key name: {0}")]
    InvalidKeyName(String),
    #[error("Invalid drawable: {0}")]
    InvalidDrawable(String),
    #[error("Invalid eval: {0}")]
    InvalidEval(String),
    #[error("Invalid flag value: {0}")]
    InvalidFlag(String),
}

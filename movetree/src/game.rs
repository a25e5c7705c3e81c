use serde::{Deserialize, Serialize};

use crate::pgn::{parse_pgn_with_limits, write_pgn, ParseLimits, PgnError};
use crate::position::{FenError, Position};
use crate::tree::MoveTree;

/// Header tags plus the move tree. The unit of import, export and persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Game {
    tags: TagPairs,
    tree: MoveTree,
}

/// Outcome recorded in the `Result` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    Draw,
    BlackWins,
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::Draw => "1/2-1/2",
            Self::BlackWins => "0-1",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1-0" => Some(Self::WhiteWins),
            "1/2-1/2" => Some(Self::Draw),
            "0-1" => Some(Self::BlackWins),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header tags in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagPairs(Vec<(String, String)>);

impl TagPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of an existing tag in place, or append a new one.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), PgnError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(PgnError::InvalidTag(name.to_string()));
        }
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Game {
    /// Empty game from the standard starting position, without tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty game from a FEN. Records the `SetUp` and `FEN` tags.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let position = Position::from_fen(fen)?;
        let mut tags = TagPairs::new();
        tags.0.push(("SetUp".to_string(), "1".to_string()));
        tags.0.push(("FEN".to_string(), position.fen().to_string()));
        Ok(Self {
            tags,
            tree: MoveTree::new(position),
        })
    }

    pub(crate) fn from_parts(tags: TagPairs, tree: MoveTree) -> Self {
        Self { tags, tree }
    }

    /// Parse one game with the default [`ParseLimits`].
    pub fn parse(text: &str) -> Result<Self, PgnError> {
        parse_pgn_with_limits(text, ParseLimits::default())
    }

    pub fn parse_with_limits(text: &str, limits: ParseLimits) -> Result<Self, PgnError> {
        parse_pgn_with_limits(text, limits)
    }

    pub fn to_pgn(&self) -> String {
        write_pgn(self)
    }

    pub fn tags(&self) -> &TagPairs {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagPairs {
        &mut self.tags
    }

    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut MoveTree {
        &mut self.tree
    }

    pub fn start_position(&self) -> &Position {
        self.tree.start_position()
    }

    /// `None` when the tag is absent or holds anything but a final result.
    pub fn result(&self) -> Option<GameResult> {
        self.tags.get("Result").and_then(GameResult::parse)
    }

    pub fn set_result(&mut self, result: Option<GameResult>) {
        match result {
            Some(result) => self.tags.set_unchecked("Result", result.as_str()),
            None => {
                self.tags.remove("Result");
            }
        }
    }
}

impl TagPairs {
    fn set_unchecked(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_pgn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationKey, Nag};
    use proptest::prelude::*;

    #[test]
    fn test_new_game_has_standard_start() {
        let game = Game::new();
        assert_eq!(game.start_position(), &Position::default());
        assert!(game.tree().is_empty());
        assert_eq!(game.result(), None);
        assert_eq!(game.to_pgn(), "*\n");
    }

    #[test]
    fn test_from_fen_round_trips_through_pgn() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 5 20").unwrap();
        let root = game.tree().root();
        game.tree_mut().insert_san(root, "O-O-O").unwrap();
        let text = game.to_pgn();
        assert!(text.contains("[SetUp \"1\"]"));
        assert!(text.contains("20... O-O-O"));
        assert_eq!(Game::parse(&text).unwrap(), game);
    }

    #[test]
    fn test_result_accessors() {
        let mut game = Game::new();
        game.set_result(Some(GameResult::Draw));
        assert_eq!(game.tags().get("Result"), Some("1/2-1/2"));
        assert!(game.to_pgn().ends_with("1/2-1/2\n"));
        game.set_result(None);
        assert_eq!(game.result(), None);
        assert!(game.tags().is_empty());
    }

    #[test]
    fn test_tag_pairs_keep_order_and_replace_in_place() {
        let mut tags = TagPairs::new();
        tags.set("White", "A").unwrap();
        tags.set("Black", "B").unwrap();
        tags.set("White", "C").unwrap();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec![("White", "C"), ("Black", "B")]);
        assert!(matches!(tags.set("Bad Name", "x"), Err(PgnError::InvalidTag(_))));
        assert_eq!(tags.remove("White").as_deref(), Some("C"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_round_trip_preserves_rich_annotations() {
        let text = "[Event \"Training\"]\n[Result \"0-1\"]\n\n\
            {[%cal Ge2e4] Start,unsaved} 1. e4 $1 {[%clk 0:10:00] [%eval 0.3] [%dojoEngine true] main}\
            (1. d4 {[%csl Rd4] [%dojoComment eve,Eve,unsaved]} d5 $14 (1... Nf6 2. c4) 2. c4)\
            1... c5 {[%emt 0:00:05] [%custom_key v1]} 2. Nf3 0-1";
        let game = Game::parse(text).unwrap();
        let written = game.to_pgn();
        let reparsed = Game::parse(&written).unwrap();
        assert_eq!(reparsed, game);
        assert_eq!(reparsed.to_pgn(), written);

        let tree = reparsed.tree();
        let d4 = tree.find_by_san_path(&["d4"]).unwrap();
        assert!(tree.is_dirty(d4, &AnnotationKey::TrainingComment).unwrap());
        assert!(tree.is_dirty(tree.root(), &AnnotationKey::CommentAfter).unwrap());
    }

    /// Build a random legal tree from a list of choices.
    fn build_tree(steps: &[(u16, u16, u8)]) -> Game {
        let mut game = Game::new();
        let mut nodes = vec![game.tree().root()];
        for (i, &(pick, choice, annotate)) in steps.iter().enumerate() {
            let parent = nodes[pick as usize % nodes.len()];
            let moves = game.tree().position_at(parent).unwrap().legal_moves();
            if moves.is_empty() {
                continue;
            }
            let mv = moves[choice as usize % moves.len()];
            let tree = game.tree_mut();
            let id = tree.insert_move(parent, mv).unwrap();
            match annotate % 6 {
                1 => tree
                    .set_annotation(id, AnnotationKey::CommentAfter, &format!("note {i}"))
                    .unwrap(),
                2 => {
                    tree.add_nag(id, Nag(1 + (i % 6) as u8)).unwrap();
                }
                3 => tree
                    .set_annotation(id, AnnotationKey::CommentBefore, &format!("pre {i},unsaved"))
                    .unwrap(),
                4 => tree
                    .set_annotation(id, AnnotationKey::Squares, "Ge4,Rd5")
                    .unwrap(),
                _ => {}
            }
            nodes.push(id);
        }
        game
    }

    proptest! {
        #[test]
        fn test_pgn_round_trip_random_trees(steps in prop::collection::vec((any::<u16>(), any::<u16>(), any::<u8>()), 0..40)) {
            let game = build_tree(&steps);
            let text = game.to_pgn();
            let parsed = Game::parse(&text).unwrap();
            prop_assert_eq!(&parsed, &game);
            prop_assert_eq!(parsed.to_pgn(), text);
        }
    }
}

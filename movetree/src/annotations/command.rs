//! The `[%name value]` micro-syntax embedded in PGN comments.
//!
//! Generic PGN tools see these as opaque comment text, so structured
//! annotations survive a trip through software that does not know them.

/// A comment split into its embedded commands and the remaining free text.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CommentParts {
    pub text: String,
    pub commands: Vec<(String, String)>,
}

/// Extract `[%name value]` commands from raw comment text.
///
/// An opening `[%` without a closing `]`, or without a name, is left in the
/// text unchanged.
pub(crate) fn split_commands(raw: &str) -> CommentParts {
    let mut parts = CommentParts::default();
    let mut text = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("[%") {
        let after = &rest[start + 2..];
        let Some(end) = after.find(']') else {
            break;
        };
        let body = after[..end].trim();
        let (name, value) = match body.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => (body, ""),
        };
        if name.is_empty() {
            push_segment(&mut text, &rest[..start + 2]);
            rest = after;
            continue;
        }
        push_segment(&mut text, &rest[..start]);
        parts.commands.push((name.to_string(), value.to_string()));
        rest = &after[end + 1..];
    }
    push_segment(&mut text, rest);

    parts.text = text.trim().to_string();
    parts
}

/// Append text, dropping leading whitespace where a removed command left a gap.
fn push_segment(text: &mut String, segment: &str) {
    if text.is_empty() || text.ends_with(char::is_whitespace) {
        text.push_str(segment.trim_start());
    } else {
        text.push_str(segment);
    }
}

/// Render commands followed by free text, space separated.
pub(crate) fn render_comment<'a>(
    commands: impl IntoIterator<Item = (&'a str, String)>,
    text: Option<&str>,
) -> String {
    let mut pieces: Vec<String> = commands
        .into_iter()
        .map(|(name, value)| format!("[%{} {}]", name, value))
        .collect();
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        pieces.push(text.to_string());
    }
    pieces.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_commands() {
        let parts = split_commands("[%clk 1:30:00] Good idea [%cal Ge2e4,Rd7d5]");
        assert_eq!(parts.text, "Good idea");
        assert_eq!(
            parts.commands,
            vec![
                ("clk".to_string(), "1:30:00".to_string()),
                ("cal".to_string(), "Ge2e4,Rd7d5".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_with_spaces() {
        let parts = split_commands("[%dojoComment alice,Alice Smith,unsaved]");
        assert_eq!(parts.commands[0].1, "alice,Alice Smith,unsaved");
        assert!(parts.text.is_empty());
    }

    #[test]
    fn test_removed_command_leaves_single_space() {
        let parts = split_commands("a [%clk 0:01:00] b");
        assert_eq!(parts.text, "a b");
        let parts = split_commands("a [%clk 0:01:00]  [%emt 0:00:05]   b");
        assert_eq!(parts.text, "a b");
        let parts = split_commands("two  spaces kept");
        assert_eq!(parts.text, "two  spaces kept");
    }

    #[test]
    fn test_unterminated_command_stays_text() {
        let parts = split_commands("see [%clk 1:00");
        assert!(parts.commands.is_empty());
        assert_eq!(parts.text, "see [%clk 1:00");
    }

    #[test]
    fn test_render_comment() {
        let rendered = render_comment(
            vec![("clk", "0:05:00".to_string())],
            Some("time trouble"),
        );
        assert_eq!(rendered, "[%clk 0:05:00] time trouble");
        assert_eq!(render_comment(Vec::new(), Some("")), "");
    }
}

//! Raw-data inspector over the loaded records.
//!
//! Reads the record list directly, so column order, visibility and the row
//! filter have no effect here.

use tracing::trace;

use crate::domain::SVError;
use crate::export::{Artifact, ExportFormat, export_filename};
use crate::record::Record;

pub const NO_DATA_TEXT: &str = "No data available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Key,
    Str,
    Number,
    Bool,
    Null,
    Punct,
    Whitespace,
}

impl TokenKind {
    /// Class tag used for styling.
    pub fn class_name(&self) -> &'static str {
        match self {
            TokenKind::Key => "json-key",
            TokenKind::Str => "json-string",
            TokenKind::Number => "json-number",
            TokenKind::Bool => "json-boolean",
            TokenKind::Null => "json-null",
            TokenKind::Punct | TokenKind::Whitespace => "json-punct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Splits serialized JSON into classified tokens. Concatenating the token
/// texts gives back the input.
pub fn tokenize(json: &str) -> Vec<Token> {
    let chars: Vec<char> = json.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];
        let kind = match c {
            '"' => {
                i = string_end(&chars, i);
                let mut next = i;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                if chars.get(next) == Some(&':') {
                    TokenKind::Key
                } else {
                    TokenKind::Str
                }
            }
            c if c.is_whitespace() => {
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                TokenKind::Whitespace
            }
            '-' | '0'..='9' => {
                i += 1;
                while i < chars.len() && matches!(chars[i], '0'..='9' | '.' | 'e' | 'E' | '+' | '-') {
                    i += 1;
                }
                TokenKind::Number
            }
            c if c.is_ascii_alphabetic() => {
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                match chars[start..i].iter().collect::<String>().as_str() {
                    "true" | "false" => TokenKind::Bool,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Punct,
                }
            }
            _ => {
                i += 1;
                TokenKind::Punct
            }
        };
        tokens.push(Token {
            kind,
            text: chars[start..i].iter().collect(),
        });
    }
    tokens
}

// Index just past the closing quote of the string starting at `open`.
fn string_end(chars: &[char], open: usize) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Indented JSON of `records`, tokenized for highlighting.
pub fn format(records: &[Record]) -> Result<Vec<Token>, SVError> {
    Ok(tokenize(&serde_json::to_string_pretty(records)?))
}

/// Groups tokens into display lines, splitting whitespace at newlines.
pub fn lines(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut lines = vec![Vec::new()];
    for token in tokens {
        if token.kind != TokenKind::Whitespace || !token.text.contains('\n') {
            if let Some(line) = lines.last_mut() {
                line.push(token.clone());
            }
            continue;
        }
        let mut parts = token.text.split('\n');
        if let Some(first) = parts.next()
            && !first.is_empty()
            && let Some(line) = lines.last_mut()
        {
            line.push(Token {
                kind: TokenKind::Whitespace,
                text: first.to_string(),
            });
        }
        for part in parts {
            let mut line = Vec::new();
            if !part.is_empty() {
                line.push(Token {
                    kind: TokenKind::Whitespace,
                    text: part.to_string(),
                });
            }
            lines.push(line);
        }
    }
    lines
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Formatted,
    Raw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JsonView {
    #[default]
    Empty,
    /// Unindented text cut into screen-width lines.
    Raw(Vec<String>),
    Formatted(Vec<Vec<Token>>),
}

impl JsonView {
    pub fn line_count(&self) -> usize {
        match self {
            JsonView::Empty => 0,
            JsonView::Raw(lines) => lines.len(),
            JsonView::Formatted(lines) => lines.len(),
        }
    }
}

/// Cuts `text` into lines of at most `width` chars.
pub fn wrap_raw(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Presentation state of the inspector. The rendered view is kept until the
/// records, the mode or the width change; copy and download always serialize
/// the records they are given.
#[derive(Debug, Default)]
pub struct JsonViewer {
    mode: ViewMode,
    scroll: usize,
    width: usize,
    rendered: JsonView,
}

impl JsonViewer {
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Switches mode and renders `records` again.
    pub fn toggle(&mut self, records: &[Record]) -> Result<ViewMode, SVError> {
        self.mode = match self.mode {
            ViewMode::Formatted => ViewMode::Raw,
            ViewMode::Raw => ViewMode::Formatted,
        };
        self.scroll = 0;
        trace!("JSON view mode: {:?}", self.mode);
        self.render(records, self.width)?;
        Ok(self.mode)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_to(&mut self, line: usize) {
        self.scroll = line.min(self.line_count().saturating_sub(1));
    }

    /// Raw mode is unindented, formatted mode is indented by two spaces.
    pub fn serialize(&self, records: &[Record]) -> Result<String, SVError> {
        Ok(match self.mode {
            ViewMode::Raw => serde_json::to_string(records)?,
            ViewMode::Formatted => serde_json::to_string_pretty(records)?,
        })
    }

    /// Rebuilds the displayed lines. `width` is the number of chars a raw
    /// line may hold.
    pub fn render(&mut self, records: &[Record], width: usize) -> Result<(), SVError> {
        self.width = width;
        self.rendered = JsonView::Empty;
        if !records.is_empty() {
            self.rendered = match self.mode {
                ViewMode::Raw => JsonView::Raw(wrap_raw(&self.serialize(records)?, width)),
                ViewMode::Formatted => JsonView::Formatted(lines(&format(records)?)),
            };
        }
        trace!(
            "Rendered {} JSON lines ({:?}, width {width})",
            self.line_count(),
            self.mode
        );
        self.scroll = self.scroll.min(self.line_count().saturating_sub(1));
        Ok(())
    }

    pub fn view(&self) -> &JsonView {
        &self.rendered
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn line_count(&self) -> usize {
        self.rendered.line_count()
    }

    /// Text for the clipboard, or `None` when there is nothing to copy.
    pub fn copy_text(&self, records: &[Record]) -> Result<Option<String>, SVError> {
        if records.is_empty() {
            return Ok(None);
        }
        self.serialize(records).map(Some)
    }

    pub fn download_artifact(&self, records: &[Record]) -> Result<Option<Artifact>, SVError> {
        Ok(self.copy_text(records)?.map(|text| Artifact {
            filename: export_filename(ExportFormat::Json),
            content: text.into_bytes(),
            content_type: ExportFormat::Json.content_type(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(json: &str) -> Vec<(TokenKind, String)> {
        tokenize(json)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new()
                .with("office_name", "LA")
                .with("weight", 1250.5)
                .with("hazmat", false)
                .with("seal", serde_json::Value::Null),
            Record::new().with("container_number", "MSCU1234567"),
        ]
    }

    #[test]
    fn classifies_scalars() {
        let tokens = kinds(r#"{"n": -1.5e3, "b": true, "z": null, "s": "x"}"#);
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Punct, "{".into()),
                (TokenKind::Key, "\"n\"".into()),
                (TokenKind::Punct, ":".into()),
                (TokenKind::Number, "-1.5e3".into()),
                (TokenKind::Punct, ",".into()),
                (TokenKind::Key, "\"b\"".into()),
                (TokenKind::Punct, ":".into()),
                (TokenKind::Bool, "true".into()),
                (TokenKind::Punct, ",".into()),
                (TokenKind::Key, "\"z\"".into()),
                (TokenKind::Punct, ":".into()),
                (TokenKind::Null, "null".into()),
                (TokenKind::Punct, ",".into()),
                (TokenKind::Key, "\"s\"".into()),
                (TokenKind::Punct, ":".into()),
                (TokenKind::Str, "\"x\"".into()),
                (TokenKind::Punct, "}".into()),
            ]
        );
    }

    #[test]
    fn colon_inside_string_is_not_a_key() {
        let tokens = kinds(r#"{"a:b": "x: y"}"#);
        assert_eq!(tokens[1], (TokenKind::Key, "\"a:b\"".into()));
        assert_eq!(tokens[3], (TokenKind::Str, "\"x: y\"".into()));
    }

    #[test]
    fn escaped_quotes_stay_inside_the_key() {
        let tokens = kinds(r#"{"say \"hi\"": "\"quoted\":"}"#);
        assert_eq!(tokens[1], (TokenKind::Key, r#""say \"hi\"""#.into()));
        assert_eq!(tokens[3], (TokenKind::Str, r#""\"quoted\":""#.into()));
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn string_value_looking_like_keyword_is_a_string() {
        let tokens = kinds(r#"["true", "null", "12"]"#);
        assert!(tokens
            .iter()
            .filter(|(k, _)| *k != TokenKind::Punct)
            .all(|(k, _)| *k == TokenKind::Str));
    }

    #[test]
    fn tokens_concatenate_to_input() {
        let text = serde_json::to_string_pretty(&records()).unwrap();
        let joined: String = tokenize(&text).into_iter().map(|t| t.text).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn class_names() {
        assert_eq!(TokenKind::Key.class_name(), "json-key");
        assert_eq!(TokenKind::Str.class_name(), "json-string");
        assert_eq!(TokenKind::Bool.class_name(), "json-boolean");
    }

    #[test]
    fn formatted_text_round_trips() {
        let records = records();
        let text: String = format(&records).unwrap().into_iter().map(|t| t.text).collect();
        assert!(text.contains("\n  {\n    \"office_name\": \"LA\""));
        let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn lines_split_on_newlines() {
        let lines = lines(&tokenize("[\n  1,\n  2\n]"));
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1][0].text, "  ");
        assert_eq!(lines[1][1].kind, TokenKind::Number);
        assert_eq!(lines[3][0].text, "]");
    }

    #[test]
    fn toggle_changes_serialization_only() {
        let records = records();
        let mut viewer = JsonViewer::default();
        let formatted = viewer.serialize(&records).unwrap();
        assert_eq!(viewer.toggle(&records).unwrap(), ViewMode::Raw);
        let raw = viewer.serialize(&records).unwrap();
        assert!(!raw.contains('\n'));
        assert!(formatted.contains("\n  "));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&raw).unwrap(),
            serde_json::from_str::<serde_json::Value>(&formatted).unwrap()
        );
        assert!(matches!(viewer.view(), JsonView::Raw(_)));
        assert_eq!(viewer.toggle(&records).unwrap(), ViewMode::Formatted);
        assert!(matches!(viewer.view(), JsonView::Formatted(_)));
    }

    #[test]
    fn raw_view_is_cut_to_width() {
        let records = records();
        let mut viewer = JsonViewer::default();
        viewer.render(&records, 20).unwrap();
        viewer.toggle(&records).unwrap();
        let raw = viewer.serialize(&records).unwrap();
        let JsonView::Raw(lines) = viewer.view() else {
            panic!("expected raw view");
        };
        assert_eq!(lines.len(), raw.chars().count().div_ceil(20));
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(lines.concat(), raw);
        let line_count = lines.len();

        viewer.scroll_to(usize::MAX);
        assert_eq!(viewer.scroll(), line_count - 1);
    }

    #[test]
    fn narrower_render_keeps_scroll_in_range() {
        let records = records();
        let mut viewer = JsonViewer::default();
        viewer.render(&records, 10).unwrap();
        viewer.toggle(&records).unwrap();
        viewer.scroll_to(usize::MAX);
        viewer.render(&records, 1000).unwrap();
        assert_eq!(viewer.line_count(), 1);
        assert_eq!(viewer.scroll(), 0);
    }

    #[test]
    fn copy_and_download_follow_mode() {
        let records = records();
        let mut viewer = JsonViewer::default();
        viewer.toggle(&records).unwrap();
        let copied = viewer.copy_text(&records).unwrap().unwrap();
        assert!(!copied.contains('\n'));
        let artifact = viewer.download_artifact(&records).unwrap().unwrap();
        assert_eq!(artifact.content, copied.into_bytes());
        assert!(artifact.filename.ends_with(".json"));
    }

    #[test]
    fn empty_records_have_nothing_to_show() {
        let mut viewer = JsonViewer::default();
        viewer.render(&[], 80).unwrap();
        assert_eq!(viewer.view(), &JsonView::Empty);
        assert_eq!(viewer.copy_text(&[]).unwrap(), None);
        assert_eq!(viewer.download_artifact(&[]).unwrap(), None);
    }

    #[test]
    fn scroll_is_clamped() {
        let mut viewer = JsonViewer::default();
        viewer.scroll_by(5);
        assert_eq!(viewer.scroll(), 0);

        viewer.render(&records(), 80).unwrap();
        let last = viewer.line_count() - 1;
        viewer.scroll_by(1000);
        assert_eq!(viewer.scroll(), last);
        viewer.scroll_by(-1000);
        assert_eq!(viewer.scroll(), 0);
    }
}

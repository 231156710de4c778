//! Document preprocessing and the top-level parse entry point.
//!
//! Parsing runs in two passes over the source:
//!
//! 1. **Normalize** — skip a BOM, expand tabs, unify line endings, and pull
//!    link reference and footnote definitions out of the text.
//! 2. **Blocks** — hand the cleaned text to [`BlockParser`], which calls the
//!    inline scanner for every block that carries span content.

use std::collections::{HashMap, HashSet};

use crate::blocks::BlockParser;
use crate::flags::Extensions;
use crate::types::{Document, FootnoteDef};

/// Maximum depth of nested blocks and spans before content degrades to text.
pub const DEFAULT_MAX_NESTING: usize = 16;

const TAB_STOP: usize = 4;

/// A link reference definition (`[id]: href "title"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkRef {
    pub href: String,
    pub title: Option<String>,
}

/// Read-only state shared by the block and inline scanners for one parse.
#[derive(Debug, Default)]
pub(crate) struct Context {
    pub extensions: Extensions,
    pub max_nesting: usize,
    /// Link references keyed by lowercased id.
    pub refs: HashMap<String, LinkRef>,
    /// Footnote numbers keyed by lowercased id.
    pub footnotes: HashMap<String, usize>,
}

impl Context {
    pub fn link_ref(&self, id: &str) -> Option<&LinkRef> {
        self.refs.get(&id.to_lowercase())
    }

    pub fn footnote_number(&self, id: &str) -> Option<usize> {
        self.footnotes.get(&id.to_lowercase()).copied()
    }
}

/// Parse Markdown into a [`Document`] with the default nesting limit.
///
/// Never fails: anything that does not form a construct degrades to text.
pub fn parse(text: &str, extensions: Extensions) -> Document {
    parse_with_nesting(text, extensions, DEFAULT_MAX_NESTING)
}

/// Parse with an explicit nesting limit.
pub fn parse_with_nesting(text: &str, extensions: Extensions, max_nesting: usize) -> Document {
    let normalized = normalize(text);
    let definitions = extract_definitions(&normalized, extensions);

    let ctx = Context {
        extensions,
        max_nesting: max_nesting.max(1),
        refs: definitions.refs,
        footnotes: definitions
            .footnotes
            .iter()
            .enumerate()
            .map(|(idx, (id, _))| (id.clone(), idx + 1))
            .collect(),
    };

    let parser = BlockParser::new(&ctx);
    let blocks = parser.parse(&definitions.text, 0);

    let footnotes: Vec<FootnoteDef> = definitions
        .footnotes
        .iter()
        .enumerate()
        .map(|(idx, (_, body))| FootnoteDef {
            number: idx + 1,
            children: parser.parse(body, 1),
        })
        .collect();

    log::debug!(
        "parsed {} bytes into {} blocks, {} footnotes, {} link refs",
        text.len(),
        blocks.len(),
        footnotes.len(),
        ctx.refs.len()
    );

    Document { blocks, footnotes }
}

// ------------------------------------------------------------------
// Normalization
// ------------------------------------------------------------------

/// Skip a BOM, expand tabs and turn every line ending into `\n`.
///
/// Non-empty output always ends with a newline.
pub(crate) fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 8 + 1);

    let mut beg = 0;
    while beg < bytes.len() {
        let mut end = beg;
        while end < bytes.len() && bytes[end] != b'\n' && bytes[end] != b'\r' {
            end += 1;
        }
        expand_tabs(&mut out, &text[beg..end]);

        while end < bytes.len() && (bytes[end] == b'\n' || bytes[end] == b'\r') {
            // "\r\n" counts once; a lone "\r" is a line ending of its own
            if bytes[end] == b'\n' || end + 1 >= bytes.len() || bytes[end + 1] != b'\n' {
                out.push('\n');
            }
            end += 1;
        }
        beg = end;
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn expand_tabs(out: &mut String, line: &str) {
    if !line.contains('\t') {
        out.push_str(line);
        return;
    }
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            loop {
                out.push(' ');
                column += 1;
                if column % TAB_STOP == 0 {
                    break;
                }
            }
        } else {
            out.push(c);
            column += 1;
        }
    }
}

// ------------------------------------------------------------------
// Definitions
// ------------------------------------------------------------------

pub(crate) struct Definitions {
    /// The document with definitions removed.
    pub text: String,
    pub refs: HashMap<String, LinkRef>,
    /// `(lowercased id, body)` in definition order, first definition wins.
    pub footnotes: Vec<(String, String)>,
}

pub(crate) fn extract_definitions(text: &str, extensions: Extensions) -> Definitions {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut refs = HashMap::new();
    let mut footnotes: Vec<(String, String)> = Vec::new();
    let mut footnote_ids = HashSet::new();

    let mut beg = 0;
    while beg < bytes.len() {
        if extensions.contains(Extensions::FOOTNOTES) {
            if let Some((end, id, body)) = footnote_definition(text, beg) {
                let key = id.to_lowercase();
                if footnote_ids.insert(key.clone()) {
                    footnotes.push((key, body));
                }
                beg = end;
                continue;
            }
        }

        if let Some((end, id, link)) = reference_definition(text, beg) {
            refs.insert(id.to_lowercase(), link);
            // the line ending stays behind as a blank line
            beg = end;
            continue;
        }

        let end = line_end(bytes, beg);
        out.push_str(&text[beg..end]);
        beg = end;
    }

    Definitions {
        text: out,
        refs,
        footnotes,
    }
}

/// Index just past the `\n` that ends the line starting at `beg`.
fn line_end(bytes: &[u8], beg: usize) -> usize {
    match bytes[beg..].iter().position(|&b| b == b'\n') {
        Some(pos) => beg + pos + 1,
        None => bytes.len(),
    }
}

/// Up to three leading spaces; `None` when there are four or more.
fn definition_indent(bytes: &[u8], beg: usize) -> Option<usize> {
    let mut i = beg;
    while i < bytes.len() && i - beg < 3 && bytes[i] == b' ' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b' ' {
        return None;
    }
    Some(i)
}

/// Match `[id]: href "title"` at `beg`.
///
/// Returns the offset of the newline ending the definition (so the line
/// ending itself is kept), the id and the parsed reference.
fn reference_definition(text: &str, beg: usize) -> Option<(usize, String, LinkRef)> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    if beg + 3 >= end {
        return None;
    }
    let mut i = definition_indent(bytes, beg)?;

    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    i += 1;
    let id_start = i;
    while i < end && bytes[i] != b'\n' && bytes[i] != b']' {
        i += 1;
    }
    if i >= end || bytes[i] != b']' {
        return None;
    }
    let id = &text[id_start..i];
    i += 1;
    if i >= end || bytes[i] != b':' {
        return None;
    }
    i += 1;

    // spacer: spaces, an optional newline, spaces
    while i < end && bytes[i] == b' ' {
        i += 1;
    }
    if i < end && bytes[i] == b'\n' {
        i += 1;
    }
    while i < end && bytes[i] == b' ' {
        i += 1;
    }
    if i >= end {
        return None;
    }

    if bytes[i] == b'<' {
        i += 1;
    }
    let link_start = i;
    while i < end && bytes[i] != b' ' && bytes[i] != b'\n' {
        i += 1;
    }
    let mut link_end = i;
    if link_end > link_start && bytes[link_end - 1] == b'>' {
        link_end -= 1;
    }

    while i < end && bytes[i] == b' ' {
        i += 1;
    }
    if i < end && !matches!(bytes[i], b'\n' | b'\'' | b'"' | b'(') {
        return None;
    }

    let mut line_end = None;
    if i >= end || bytes[i] == b'\n' {
        line_end = Some(i);
        i += 1;
        while i < end && bytes[i] == b' ' {
            i += 1;
        }
    }

    // optional title, alone on its line
    let mut title = None;
    if i + 1 < end && matches!(bytes[i], b'\'' | b'"' | b'(') {
        i += 1;
        let title_start = i;
        while i < end && bytes[i] != b'\n' {
            i += 1;
        }
        let eol = i;
        let mut j = i - 1;
        while j > title_start && bytes[j] == b' ' {
            j -= 1;
        }
        if j > title_start && matches!(bytes[j], b'\'' | b'"' | b')') {
            line_end = Some(eol);
            title = Some(text[title_start..j].to_string());
        }
    }

    let line_end = line_end?;
    if link_end <= link_start {
        return None;
    }

    Some((
        line_end.min(end),
        id.to_string(),
        LinkRef {
            href: text[link_start..link_end].to_string(),
            title,
        },
    ))
}

/// Match `[^id]: body` plus its indented continuation lines at `beg`.
///
/// Returns the offset of the first line after the definition, the id, and
/// the body with continuation indentation stripped.
fn footnote_definition(text: &str, beg: usize) -> Option<(usize, String, String)> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    if beg + 3 >= end {
        return None;
    }
    let mut i = definition_indent(bytes, beg)?;

    if bytes.get(i) != Some(&b'[') || bytes.get(i + 1) != Some(&b'^') {
        return None;
    }
    i += 2;
    let id_start = i;
    while i < end && bytes[i] != b'\n' && bytes[i] != b']' {
        i += 1;
    }
    if i >= end || bytes[i] != b']' || i == id_start {
        return None;
    }
    let id = text[id_start..i].to_string();
    i += 1;
    if i >= end || bytes[i] != b':' {
        return None;
    }
    i += 1;

    let mut body = String::new();

    // the first line belongs to the definition whatever its indentation
    let mut start = i;
    let first_end = line_end(bytes, start);
    let first = text[start..first_end].trim_start_matches(' ');
    body.push_str(first);
    if !body.ends_with('\n') {
        body.push('\n');
    }
    start = first_end;

    let mut in_empty = false;
    let mut consumed = start;
    while start < end {
        let eol = line_end(bytes, start);
        let line = &text[start..eol];

        if line.trim().is_empty() {
            in_empty = true;
            start = eol;
            continue;
        }

        let indent = line.bytes().take(4).take_while(|&b| b == b' ').count();
        if indent == 0 {
            break;
        }
        if in_empty {
            body.push('\n');
        }
        in_empty = false;

        body.push_str(&line[indent..]);
        if !body.ends_with('\n') {
            body.push('\n');
        }
        start = eol;
        consumed = start;
    }

    // trailing blank lines after the definition are part of it
    if in_empty {
        consumed = start;
    }

    Some((consumed, id, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_line_endings() {
        assert_eq!(normalize("a\r\nb\rc\n\nd"), "a\nb\nc\n\nd\n");
    }

    #[test]
    fn normalize_skips_bom_and_keeps_empty_input_empty() {
        assert_eq!(normalize("\u{feff}# Title"), "# Title\n");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn tabs_expand_to_four_columns() {
        assert_eq!(normalize("\tcode\n"), "    code\n");
        assert_eq!(normalize("ab\tc\n"), "ab  c\n");
        assert_eq!(normalize("é\tx\n"), "é   x\n");
    }

    #[test]
    fn reference_definitions_are_removed() {
        let defs = extract_definitions(
            "See [x].\n\n[X]: http://example.com/  \"Example\"\n",
            Extensions::empty(),
        );
        assert_eq!(defs.text, "See [x].\n\n\n");
        assert_eq!(
            defs.refs.get("x"),
            Some(&LinkRef {
                href: "http://example.com/".to_string(),
                title: Some("Example".to_string()),
            })
        );
    }

    #[test]
    fn reference_with_angle_brackets_and_title_on_next_line() {
        let defs = extract_definitions(
            "[a]: <http://a.b/c>\n   'Title'\nrest\n",
            Extensions::empty(),
        );
        let link = &defs.refs["a"];
        assert_eq!(link.href, "http://a.b/c");
        assert_eq!(link.title.as_deref(), Some("Title"));
        assert_eq!(defs.text, "\nrest\n");
    }

    #[test]
    fn four_space_indent_is_not_a_definition() {
        let defs = extract_definitions("    [a]: /url\n", Extensions::empty());
        assert!(defs.refs.is_empty());
        assert_eq!(defs.text, "    [a]: /url\n");
    }

    #[test]
    fn footnote_definitions_collect_continuations() {
        let defs = extract_definitions(
            "line1 [^1]\n\n [^1]: test1\n       test2\n",
            Extensions::FOOTNOTES,
        );
        assert_eq!(defs.text, "line1 [^1]\n\n");
        assert_eq!(
            defs.footnotes,
            vec![("1".to_string(), "test1\n   test2\n".to_string())]
        );
    }

    #[test]
    fn footnotes_ignored_without_extension() {
        let defs = extract_definitions("[^1]: note\n", Extensions::empty());
        assert!(defs.footnotes.is_empty());
    }

    #[test]
    fn first_footnote_definition_wins() {
        let defs = extract_definitions("[^a]: one\n\n[^A]: two\n", Extensions::FOOTNOTES);
        assert_eq!(defs.footnotes.len(), 1);
        assert_eq!(defs.footnotes[0].1, "one\n");
    }

    #[test]
    fn footnote_numbers_follow_definition_order() {
        let doc = parse(
            "b[^b] a[^a]\n\n[^a]: A\n[^b]: B\n",
            Extensions::FOOTNOTES,
        );
        assert_eq!(doc.footnotes.len(), 2);
        assert_eq!(doc.footnotes[0].number, 1);
        assert_eq!(doc.footnotes[1].number, 2);
    }

    #[test]
    fn many_footnote_definitions_keep_order_and_first_wins() {
        let mut source = String::new();
        for n in 0..2000 {
            source.push_str(&format!("[^f{n}]: note {n}\n"));
        }
        source.push_str("[^F7]: duplicate\n");

        let defs = extract_definitions(&source, Extensions::FOOTNOTES);
        assert_eq!(defs.footnotes.len(), 2000);
        assert_eq!(defs.footnotes[7], ("f7".to_string(), "note 7\n".to_string()));
        assert_eq!(defs.footnotes[1999].0, "f1999");
    }
}

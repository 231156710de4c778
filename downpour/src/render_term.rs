//! ANSI terminal output, for previewing documents in a shell.

use colored::Colorize;

use crate::flags::RenderFlags;
use crate::renderer::Renderer;
use crate::types::{Alignment, AutolinkKind, ListFlags};

const RULE_WIDTH: usize = 40;

/// Stands in for an ordered item's number until the enclosing list is known.
const ORDINAL: char = '\u{1}';

/// Renders to plain text styled with ANSI escapes.
///
/// Raw HTML is passed through untouched; tables come out as `|`-separated
/// rows.
#[derive(Debug, Clone, Default)]
pub struct TerminalRenderer {
    flags: RenderFlags,
}

impl TerminalRenderer {
    pub fn new(flags: RenderFlags) -> Self {
        Self { flags }
    }
}

fn block_sep(ob: &mut String) {
    if !ob.is_empty() && !ob.ends_with("\n\n") {
        ob.push('\n');
    }
}

impl Renderer for TerminalRenderer {
    fn render_flags(&self) -> RenderFlags {
        self.flags
    }

    fn block_code(&mut self, ob: &mut String, text: &str, _lang: Option<&str>) {
        block_sep(ob);
        for line in text.lines() {
            ob.push_str("    ");
            ob.push_str(&line.cyan().to_string());
            ob.push('\n');
        }
    }

    fn block_quote(&mut self, ob: &mut String, content: &str) {
        block_sep(ob);
        for line in content.trim_end_matches('\n').lines() {
            ob.push_str(&"│ ".dimmed().to_string());
            ob.push_str(line);
            ob.push('\n');
        }
    }

    fn block_html(&mut self, ob: &mut String, text: &str) {
        block_sep(ob);
        ob.push_str(text.trim_matches('\n'));
        ob.push('\n');
    }

    fn header(&mut self, ob: &mut String, content: &str, level: u8) {
        block_sep(ob);
        let marker = "#".repeat(usize::from(level));
        ob.push_str(&format!("{} {}", marker.dimmed(), content.bold().underline()));
        ob.push('\n');
    }

    fn hrule(&mut self, ob: &mut String) {
        block_sep(ob);
        ob.push_str(&"─".repeat(RULE_WIDTH).dimmed().to_string());
        ob.push('\n');
    }

    fn list(&mut self, ob: &mut String, content: &str, _flags: ListFlags) {
        block_sep(ob);
        let mut number = 0;
        for line in content.split_inclusive('\n') {
            match line.strip_prefix(ORDINAL) {
                Some(rest) => {
                    number += 1;
                    ob.push_str(&format!("{number}.").yellow().to_string());
                    ob.push_str(rest);
                }
                None => ob.push_str(line),
            }
        }
    }

    fn list_item(&mut self, ob: &mut String, content: &str, flags: ListFlags) {
        if flags.contains(ListFlags::ORDERED) {
            ob.push(ORDINAL);
        } else {
            ob.push_str(&"•".yellow().to_string());
        }

        let mut lines = content.trim_matches('\n').lines().filter(|l| !l.is_empty());
        ob.push_str(&format!(" {}\n", lines.next().unwrap_or_default()));
        for line in lines {
            ob.push_str("  ");
            ob.push_str(line);
            ob.push('\n');
        }
    }

    fn paragraph(&mut self, ob: &mut String, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        block_sep(ob);
        ob.push_str(content);
        ob.push('\n');
    }

    fn table(&mut self, ob: &mut String, content: &str) {
        block_sep(ob);
        ob.push_str(content);
    }

    fn table_header(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.bold().to_string());
    }

    fn table_body(&mut self, ob: &mut String, content: &str) {
        ob.push_str(content);
    }

    fn table_row(&mut self, ob: &mut String, content: &str) {
        ob.push('|');
        ob.push_str(content);
        ob.push('\n');
    }

    fn table_cell(&mut self, ob: &mut String, content: &str, _align: Alignment, _header: bool) {
        ob.push(' ');
        ob.push_str(content);
        ob.push_str(" |");
    }

    fn footnotes(&mut self, ob: &mut String, content: &str) {
        block_sep(ob);
        ob.push_str(&"─".repeat(RULE_WIDTH / 2).dimmed().to_string());
        ob.push('\n');
        ob.push_str(content);
    }

    fn footnote_def(&mut self, ob: &mut String, content: &str, number: usize) {
        ob.push_str(&format!("[{number}] "));
        ob.push_str(content.trim_start());
    }

    fn autolink(&mut self, ob: &mut String, link: &str, kind: AutolinkKind) {
        let shown = match kind {
            AutolinkKind::Email => link.trim_start_matches("mailto:"),
            AutolinkKind::Url => link,
        };
        ob.push_str(&shown.blue().underline().to_string());
    }

    fn codespan(&mut self, ob: &mut String, text: &str) {
        ob.push_str(&text.cyan().to_string());
    }

    fn emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.italic().to_string());
    }

    fn double_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.bold().to_string());
    }

    fn triple_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.bold().italic().to_string());
    }

    fn underline(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.underline().to_string());
    }

    fn highlight(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.on_yellow().to_string());
    }

    fn quote(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("“{content}”"));
    }

    fn strikethrough(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&content.strikethrough().to_string());
    }

    fn superscript(&mut self, ob: &mut String, content: &str) {
        ob.push('^');
        ob.push_str(content);
    }

    fn image(&mut self, ob: &mut String, link: &str, _title: Option<&str>, alt: &str) {
        ob.push_str(&format!("[image: {alt}] ({})", link.blue()));
    }

    fn linebreak(&mut self, ob: &mut String) {
        ob.push('\n');
    }

    fn link(&mut self, ob: &mut String, content: &str, link: &str, _title: Option<&str>) {
        if content == link || link.is_empty() {
            ob.push_str(&content.blue().underline().to_string());
        } else {
            ob.push_str(&format!("{} ({})", content.underline(), link.blue()));
        }
    }

    fn raw_html(&mut self, ob: &mut String, text: &str) {
        if !self.flags.intersects(RenderFlags::SKIP_HTML | RenderFlags::ESCAPE) {
            ob.push_str(text);
        }
    }

    fn footnote_ref(&mut self, ob: &mut String, number: usize) {
        ob.push_str(&format!("[{number}]").yellow().to_string());
    }

    fn entity(&mut self, ob: &mut String, text: &str) {
        ob.push_str(decode_entity(text).unwrap_or(text));
    }

    fn normal_text(&mut self, ob: &mut String, text: &str) {
        ob.push_str(text);
    }
}

/// The handful of entities that commonly show up in prose.
fn decode_entity(entity: &str) -> Option<&'static str> {
    Some(match entity {
        "&amp;" => "&",
        "&lt;" => "<",
        "&gt;" => ">",
        "&quot;" => "\"",
        "&#39;" | "&apos;" => "'",
        "&nbsp;" => "\u{a0}",
        "&copy;" => "©",
        "&mdash;" => "—",
        "&ndash;" => "–",
        "&hellip;" => "…",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extensions, Markdown};
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> String {
        colored::control::set_override(false);
        let mut md = Markdown::new(TerminalRenderer::default(), Extensions::TABLES).unwrap();
        md.render(text)
    }

    #[test]
    fn headers_and_paragraphs() {
        assert_eq!(render("# Title\n\nSome *text*.\n"), "# Title\n\nSome text.\n");
    }

    #[test]
    fn ordered_list_numbers_restart_per_list() {
        assert_eq!(
            render("1. one\n2. two\n\ntext\n\n1. again\n"),
            "1. one\n2. two\n\ntext\n\n1. again\n"
        );
    }

    #[test]
    fn nested_lists_keep_their_own_numbering() {
        assert_eq!(
            render("1. one\n    1. inner\n    2. inner\n2. two\n"),
            "1. one\n  1. inner\n  2. inner\n2. two\n"
        );
    }

    #[test]
    fn links_show_their_target() {
        assert_eq!(
            render("[site](http://example.com)\n"),
            "site (http://example.com)\n"
        );
    }

    #[test]
    fn quotes_and_rules() {
        assert_eq!(
            render("> quoted\n\n---\n"),
            "│ quoted\n\n────────────────────────────────────────\n"
        );
    }

    #[test]
    fn tables_become_rows() {
        assert_eq!(render("a | b\n---|---\n1 | 2\n"), "| a | b |\n| 1 | 2 |\n");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(render("Fish &amp; chips\n"), "Fish & chips\n");
    }
}

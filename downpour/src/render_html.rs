//! HTML output.
//!
//! Blocks are separated by a single newline: every block callback starts
//! with `\n` when the buffer it appends to already holds output.

use crate::error::Error;
use crate::flags::RenderFlags;
use crate::renderer::Renderer;
use crate::types::{Alignment, AutolinkKind, ListFlags};

/// Renders a document as an HTML fragment.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    flags: RenderFlags,
}

impl HtmlRenderer {
    pub fn new(flags: RenderFlags) -> Self {
        Self { flags }
    }

    /// Build from a raw flag bitmask, rejecting unknown bits.
    pub fn from_raw(bits: u32) -> Result<Self, Error> {
        Ok(Self::new(RenderFlags::from_bits_checked(bits)?))
    }

    pub fn flags(&self) -> RenderFlags {
        self.flags
    }

    fn xhtml(&self) -> bool {
        self.flags.contains(RenderFlags::USE_XHTML)
    }
}

fn separate(ob: &mut String) {
    if !ob.is_empty() {
        ob.push('\n');
    }
}

/// Append `text` with `& < > " '` replaced by entities.
pub fn escape_html(ob: &mut String, text: &str) {
    let mut last = 0;
    for (i, b) in text.bytes().enumerate() {
        let entity = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        ob.push_str(&text[last..i]);
        ob.push_str(entity);
        last = i + 1;
    }
    ob.push_str(&text[last..]);
}

fn is_href_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%()*+,-./:;=?@_~".contains(&b)
}

/// Append `href` for use inside a double-quoted attribute.
///
/// `%` is kept, so already percent-encoded URLs pass through unchanged.
pub fn escape_href(ob: &mut String, href: &str) {
    for b in href.bytes() {
        match b {
            b'&' => ob.push_str("&amp;"),
            b'\'' => ob.push_str("&#x27;"),
            _ if is_href_safe(b) => ob.push(char::from(b)),
            _ => ob.push_str(&format!("%{b:02X}")),
        }
    }
}

/// Text of an HTML fragment with every `<...>` tag removed.
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

impl Renderer for HtmlRenderer {
    fn render_flags(&self) -> RenderFlags {
        self.flags
    }

    fn block_code(&mut self, ob: &mut String, text: &str, lang: Option<&str>) {
        separate(ob);
        match lang {
            Some(lang) if !lang.is_empty() => {
                ob.push_str("<pre><code class=\"language-");
                escape_html(ob, lang);
                ob.push_str("\">");
            }
            _ => ob.push_str("<pre><code>"),
        }
        escape_html(ob, text);
        ob.push_str("</code></pre>\n");
    }

    fn block_quote(&mut self, ob: &mut String, content: &str) {
        separate(ob);
        ob.push_str("<blockquote>\n");
        ob.push_str(content);
        ob.push_str("</blockquote>\n");
    }

    fn block_html(&mut self, ob: &mut String, text: &str) {
        let text = text.trim_matches('\n');
        if text.is_empty() {
            return;
        }

        if self.flags.contains(RenderFlags::ESCAPE) {
            separate(ob);
            ob.push_str("<p>");
            escape_html(ob, text);
            ob.push_str("</p>\n");
            return;
        }

        if self.flags.contains(RenderFlags::SKIP_HTML) {
            let stripped = strip_tags(text);
            let remaining = stripped.trim();
            if !remaining.is_empty() {
                separate(ob);
                ob.push_str("<p>");
                ob.push_str(remaining);
                ob.push_str("</p>\n");
            }
            return;
        }

        separate(ob);
        ob.push_str(text);
        ob.push('\n');
    }

    fn header(&mut self, ob: &mut String, content: &str, level: u8) {
        separate(ob);
        ob.push_str(&format!("<h{level}>"));
        ob.push_str(content);
        ob.push_str(&format!("</h{level}>\n"));
    }

    fn hrule(&mut self, ob: &mut String) {
        separate(ob);
        ob.push_str(if self.xhtml() { "<hr/>\n" } else { "<hr>\n" });
    }

    fn list(&mut self, ob: &mut String, content: &str, flags: ListFlags) {
        separate(ob);
        let tag = if flags.contains(ListFlags::ORDERED) { "ol" } else { "ul" };
        ob.push_str(&format!("<{tag}>\n"));
        ob.push_str(content);
        ob.push_str(&format!("</{tag}>\n"));
    }

    fn list_item(&mut self, ob: &mut String, content: &str, _flags: ListFlags) {
        ob.push_str("<li>");
        ob.push_str(content.trim_end_matches('\n'));
        ob.push_str("</li>\n");
    }

    fn paragraph(&mut self, ob: &mut String, content: &str) {
        let text = content.trim_start();
        if text.is_empty() {
            return;
        }
        separate(ob);
        ob.push_str("<p>");
        if self.flags.contains(RenderFlags::HARD_WRAP) {
            let body = text.strip_suffix('\n').unwrap_or(text);
            let mut lines = body.split('\n').peekable();
            while let Some(line) = lines.next() {
                ob.push_str(line);
                if lines.peek().is_none() {
                    break;
                }
                // an explicit break already ends this line
                if line.ends_with("<br>") || line.ends_with("<br/>") {
                    ob.push('\n');
                } else {
                    self.linebreak(ob);
                }
            }
        } else {
            ob.push_str(text);
        }
        ob.push_str("</p>\n");
    }

    fn table(&mut self, ob: &mut String, content: &str) {
        separate(ob);
        ob.push_str("<table>\n");
        ob.push_str(content);
        ob.push_str("</table>\n");
    }

    fn table_header(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<thead>\n");
        ob.push_str(content);
        ob.push_str("</thead>\n");
    }

    fn table_body(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<tbody>\n");
        ob.push_str(content);
        ob.push_str("</tbody>\n");
    }

    fn table_row(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<tr>\n");
        ob.push_str(content);
        ob.push_str("</tr>\n");
    }

    fn table_cell(&mut self, ob: &mut String, content: &str, align: Alignment, header: bool) {
        let tag = if header { "th" } else { "td" };
        ob.push('<');
        ob.push_str(tag);
        match align {
            Alignment::Left => ob.push_str(" style=\"text-align: left\""),
            Alignment::Right => ob.push_str(" style=\"text-align: right\""),
            Alignment::Center => ob.push_str(" style=\"text-align: center\""),
            Alignment::None => {}
        }
        ob.push('>');
        ob.push_str(content);
        ob.push_str(&format!("</{tag}>\n"));
    }

    fn footnotes(&mut self, ob: &mut String, content: &str) {
        separate(ob);
        ob.push_str("<div class=\"footnotes\">\n");
        ob.push_str(if self.xhtml() { "<hr/>\n" } else { "<hr>\n" });
        ob.push_str("<ol>\n");
        ob.push_str(content);
        ob.push_str("\n</ol>\n</div>\n");
    }

    fn footnote_def(&mut self, ob: &mut String, content: &str, number: usize) {
        ob.push_str(&format!("\n<li id=\"fn{number}\">\n"));
        let backref = format!("&nbsp;<a href=\"#fnref{number}\" rev=\"footnote\">&#8617;</a>");
        match content.find("</p>") {
            Some(pos) => {
                ob.push_str(&content[..pos]);
                ob.push_str(&backref);
                ob.push_str(&content[pos..]);
            }
            None => ob.push_str(content),
        }
        ob.push_str("</li>\n");
    }

    fn autolink(&mut self, ob: &mut String, link: &str, kind: AutolinkKind) {
        // the address is shown bare; other links are shown as written
        let shown = match kind {
            AutolinkKind::Email => link.strip_prefix("mailto:").unwrap_or(link),
            AutolinkKind::Url => link,
        };
        ob.push_str("<a href=\"");
        if kind == AutolinkKind::Email {
            ob.push_str("mailto:");
        }
        escape_href(ob, shown);
        ob.push_str("\">");
        escape_html(ob, shown);
        ob.push_str("</a>");
    }

    fn codespan(&mut self, ob: &mut String, text: &str) {
        ob.push_str("<code>");
        escape_html(ob, text);
        ob.push_str("</code>");
    }

    fn emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<em>");
        ob.push_str(content);
        ob.push_str("</em>");
    }

    fn double_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<strong>");
        ob.push_str(content);
        ob.push_str("</strong>");
    }

    fn triple_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<strong><em>");
        ob.push_str(content);
        ob.push_str("</em></strong>");
    }

    fn underline(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<u>");
        ob.push_str(content);
        ob.push_str("</u>");
    }

    fn highlight(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<mark>");
        ob.push_str(content);
        ob.push_str("</mark>");
    }

    fn quote(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<q>");
        ob.push_str(content);
        ob.push_str("</q>");
    }

    fn strikethrough(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<del>");
        ob.push_str(content);
        ob.push_str("</del>");
    }

    fn superscript(&mut self, ob: &mut String, content: &str) {
        ob.push_str("<sup>");
        ob.push_str(content);
        ob.push_str("</sup>");
    }

    fn image(&mut self, ob: &mut String, link: &str, title: Option<&str>, alt: &str) {
        ob.push_str("<img src=\"");
        escape_href(ob, link);
        ob.push_str("\" alt=\"");
        escape_html(ob, alt);
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            ob.push_str("\" title=\"");
            escape_html(ob, title);
        }
        ob.push_str(if self.xhtml() { "\"/>" } else { "\">" });
    }

    fn linebreak(&mut self, ob: &mut String) {
        ob.push_str(if self.xhtml() { "<br/>\n" } else { "<br>\n" });
    }

    fn link(&mut self, ob: &mut String, content: &str, link: &str, title: Option<&str>) {
        ob.push_str("<a href=\"");
        escape_href(ob, link);
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            ob.push_str("\" title=\"");
            escape_html(ob, title);
        }
        ob.push_str("\">");
        ob.push_str(content);
        ob.push_str("</a>");
    }

    fn raw_html(&mut self, ob: &mut String, text: &str) {
        if self.flags.contains(RenderFlags::ESCAPE) {
            escape_html(ob, text);
        } else if !self.flags.contains(RenderFlags::SKIP_HTML) {
            ob.push_str(text);
        }
    }

    fn footnote_ref(&mut self, ob: &mut String, number: usize) {
        ob.push_str(&format!(
            "<sup id=\"fnref{number}\"><a href=\"#fn{number}\" rel=\"footnote\">{number}</a></sup>"
        ));
    }

    fn entity(&mut self, ob: &mut String, text: &str) {
        ob.push_str(text);
    }

    fn normal_text(&mut self, ob: &mut String, text: &str) {
        escape_html(ob, text);
    }
}

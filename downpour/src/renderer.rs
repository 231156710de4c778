//! The callback interface between the parser and output formats.
//!
//! A [`Renderer`] receives one call per node, bottom-up: children are
//! rendered first and the parent callback gets their output as `content`.
//! Every callback appends to `ob`, the output buffer of the enclosing node.
//!
//! Callbacks a renderer does not override forward to its [`Renderer::base`]
//! when it has one, and otherwise emit their child content unchanged. This is
//! how a custom renderer specializes a few callbacks of [`HtmlRenderer`]:
//!
//! ```
//! use downpour::{Extensions, HtmlRenderer, Markdown, RenderFlags, Renderer};
//!
//! struct Shouting {
//!     html: HtmlRenderer,
//! }
//!
//! impl Renderer for Shouting {
//!     fn base(&self) -> Option<&dyn Renderer> {
//!         Some(&self.html)
//!     }
//!     fn base_mut(&mut self) -> Option<&mut dyn Renderer> {
//!         Some(&mut self.html)
//!     }
//!     fn header(&mut self, ob: &mut String, content: &str, level: u8) {
//!         ob.push_str(&format!("<h{level}>{}</h{level}>\n", content.to_uppercase()));
//!     }
//! }
//!
//! let renderer = Shouting { html: HtmlRenderer::new(RenderFlags::empty()) };
//! let mut md = Markdown::new(renderer, Extensions::empty()).unwrap();
//! assert_eq!(md.render("# hi\n\ntext\n"), "<h1>HI</h1>\n\n<p>text</p>\n");
//! ```
//!
//! [`HtmlRenderer`]: crate::HtmlRenderer

use bitflags::bitflags;

use crate::flags::RenderFlags;
use crate::types::{Alignment, AutolinkKind, Block, Document, Inline, ListFlags};

bitflags! {
    /// The callbacks a renderer implements, one bit per callback.
    ///
    /// When a node's bit is missing the walker emits the node's child content
    /// (or its text, for leaf nodes) instead of calling the renderer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u64 {
        const BLOCK_CODE = 1 << 0;
        const BLOCK_QUOTE = 1 << 1;
        const BLOCK_HTML = 1 << 2;
        const HEADER = 1 << 3;
        const HRULE = 1 << 4;
        const LIST = 1 << 5;
        const LIST_ITEM = 1 << 6;
        const PARAGRAPH = 1 << 7;
        const TABLE = 1 << 8;
        const TABLE_HEADER = 1 << 9;
        const TABLE_BODY = 1 << 10;
        const TABLE_ROW = 1 << 11;
        const TABLE_CELL = 1 << 12;
        const FOOTNOTES = 1 << 13;
        const FOOTNOTE_DEF = 1 << 14;

        const AUTOLINK = 1 << 16;
        const CODESPAN = 1 << 17;
        const EMPHASIS = 1 << 18;
        const DOUBLE_EMPHASIS = 1 << 19;
        const TRIPLE_EMPHASIS = 1 << 20;
        const UNDERLINE = 1 << 21;
        const HIGHLIGHT = 1 << 22;
        const QUOTE = 1 << 23;
        const STRIKETHROUGH = 1 << 24;
        const SUPERSCRIPT = 1 << 25;
        const IMAGE = 1 << 26;
        const LINEBREAK = 1 << 27;
        const LINK = 1 << 28;
        const RAW_HTML = 1 << 29;
        const FOOTNOTE_REF = 1 << 30;

        const ENTITY = 1 << 32;
        const NORMAL_TEXT = 1 << 33;
        const DOC_HEADER = 1 << 34;
        const DOC_FOOTER = 1 << 35;
    }
}

/// Output callbacks, one per node kind.
pub trait Renderer {
    /// Renderer that receives the callbacks this one does not override.
    fn base(&self) -> Option<&dyn Renderer> {
        None
    }

    fn base_mut(&mut self) -> Option<&mut dyn Renderer> {
        None
    }

    /// Callbacks this renderer implements. Defaults to the base's set, or
    /// to every callback when there is no base.
    fn capabilities(&self) -> Capabilities {
        self.base()
            .map_or(Capabilities::all(), |base| base.capabilities())
    }

    /// Render flags in effect; [`RenderFlags::SMARTYPANTS`] here turns on
    /// the typographic post-pass.
    fn render_flags(&self) -> RenderFlags {
        self.base()
            .map_or(RenderFlags::empty(), |base| base.render_flags())
    }

    // ------------------------------------------------------------------
    // Block callbacks
    // ------------------------------------------------------------------

    fn block_code(&mut self, ob: &mut String, text: &str, lang: Option<&str>) {
        match self.base_mut() {
            Some(base) => base.block_code(ob, text, lang),
            None => ob.push_str(text),
        }
    }

    fn block_quote(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.block_quote(ob, content),
            None => ob.push_str(content),
        }
    }

    fn block_html(&mut self, ob: &mut String, text: &str) {
        match self.base_mut() {
            Some(base) => base.block_html(ob, text),
            None => ob.push_str(text),
        }
    }

    fn header(&mut self, ob: &mut String, content: &str, level: u8) {
        match self.base_mut() {
            Some(base) => base.header(ob, content, level),
            None => ob.push_str(content),
        }
    }

    fn hrule(&mut self, ob: &mut String) {
        if let Some(base) = self.base_mut() {
            base.hrule(ob);
        }
    }

    fn list(&mut self, ob: &mut String, content: &str, flags: ListFlags) {
        match self.base_mut() {
            Some(base) => base.list(ob, content, flags),
            None => ob.push_str(content),
        }
    }

    fn list_item(&mut self, ob: &mut String, content: &str, flags: ListFlags) {
        match self.base_mut() {
            Some(base) => base.list_item(ob, content, flags),
            None => ob.push_str(content),
        }
    }

    fn paragraph(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.paragraph(ob, content),
            None => ob.push_str(content),
        }
    }

    fn table(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.table(ob, content),
            None => ob.push_str(content),
        }
    }

    fn table_header(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.table_header(ob, content),
            None => ob.push_str(content),
        }
    }

    fn table_body(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.table_body(ob, content),
            None => ob.push_str(content),
        }
    }

    fn table_row(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.table_row(ob, content),
            None => ob.push_str(content),
        }
    }

    fn table_cell(&mut self, ob: &mut String, content: &str, align: Alignment, header: bool) {
        match self.base_mut() {
            Some(base) => base.table_cell(ob, content, align, header),
            None => ob.push_str(content),
        }
    }

    /// Wrapper around all rendered footnote definitions.
    fn footnotes(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.footnotes(ob, content),
            None => ob.push_str(content),
        }
    }

    fn footnote_def(&mut self, ob: &mut String, content: &str, number: usize) {
        match self.base_mut() {
            Some(base) => base.footnote_def(ob, content, number),
            None => ob.push_str(content),
        }
    }

    // ------------------------------------------------------------------
    // Span callbacks
    // ------------------------------------------------------------------

    fn autolink(&mut self, ob: &mut String, link: &str, kind: AutolinkKind) {
        match self.base_mut() {
            Some(base) => base.autolink(ob, link, kind),
            None => ob.push_str(link),
        }
    }

    fn codespan(&mut self, ob: &mut String, text: &str) {
        match self.base_mut() {
            Some(base) => base.codespan(ob, text),
            None => ob.push_str(text),
        }
    }

    fn emphasis(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.emphasis(ob, content),
            None => ob.push_str(content),
        }
    }

    fn double_emphasis(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.double_emphasis(ob, content),
            None => ob.push_str(content),
        }
    }

    fn triple_emphasis(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.triple_emphasis(ob, content),
            None => ob.push_str(content),
        }
    }

    fn underline(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.underline(ob, content),
            None => ob.push_str(content),
        }
    }

    fn highlight(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.highlight(ob, content),
            None => ob.push_str(content),
        }
    }

    fn quote(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.quote(ob, content),
            None => ob.push_str(content),
        }
    }

    fn strikethrough(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.strikethrough(ob, content),
            None => ob.push_str(content),
        }
    }

    fn superscript(&mut self, ob: &mut String, content: &str) {
        match self.base_mut() {
            Some(base) => base.superscript(ob, content),
            None => ob.push_str(content),
        }
    }

    /// `alt` is the raw bracket text; it is never span-parsed.
    fn image(&mut self, ob: &mut String, link: &str, title: Option<&str>, alt: &str) {
        match self.base_mut() {
            Some(base) => base.image(ob, link, title, alt),
            None => ob.push_str(alt),
        }
    }

    fn linebreak(&mut self, ob: &mut String) {
        if let Some(base) = self.base_mut() {
            base.linebreak(ob);
        }
    }

    fn link(&mut self, ob: &mut String, content: &str, link: &str, title: Option<&str>) {
        match self.base_mut() {
            Some(base) => base.link(ob, content, link, title),
            None => ob.push_str(content),
        }
    }

    fn raw_html(&mut self, ob: &mut String, text: &str) {
        match self.base_mut() {
            Some(base) => base.raw_html(ob, text),
            None => ob.push_str(text),
        }
    }

    fn footnote_ref(&mut self, ob: &mut String, number: usize) {
        if let Some(base) = self.base_mut() {
            base.footnote_ref(ob, number);
        }
    }

    // ------------------------------------------------------------------
    // Low-level callbacks
    // ------------------------------------------------------------------

    fn entity(&mut self, ob: &mut String, text: &str) {
        match self.base_mut() {
            Some(base) => base.entity(ob, text),
            None => ob.push_str(text),
        }
    }

    fn normal_text(&mut self, ob: &mut String, text: &str) {
        match self.base_mut() {
            Some(base) => base.normal_text(ob, text),
            None => ob.push_str(text),
        }
    }

    fn doc_header(&mut self, ob: &mut String) {
        if let Some(base) = self.base_mut() {
            base.doc_header(ob);
        }
    }

    fn doc_footer(&mut self, ob: &mut String) {
        if let Some(base) = self.base_mut() {
            base.doc_footer(ob);
        }
    }
}

/// Render a parsed document through `renderer`.
///
/// Order of calls: `doc_header`, the top-level blocks, the footnote
/// definitions wrapped in one `footnotes` call (only when the document
/// defines footnotes), then `doc_footer`.
pub fn render_document<R: Renderer + ?Sized>(doc: &Document, renderer: &mut R) -> String {
    let caps = renderer.capabilities();
    let mut walker = Walker { renderer, caps };
    let mut ob = String::new();

    if walker.has(Capabilities::DOC_HEADER) {
        walker.renderer.doc_header(&mut ob);
    }

    walker.blocks(&mut ob, &doc.blocks);

    if !doc.footnotes.is_empty() {
        let mut defs = String::new();
        for def in &doc.footnotes {
            let mut content = String::new();
            walker.blocks(&mut content, &def.children);
            if walker.has(Capabilities::FOOTNOTE_DEF) {
                walker.renderer.footnote_def(&mut defs, &content, def.number);
            } else {
                defs.push_str(&content);
            }
        }
        walker.wrap(&mut ob, &defs, Capabilities::FOOTNOTES, |r, ob, c| r.footnotes(ob, c));
    }

    if walker.has(Capabilities::DOC_FOOTER) {
        walker.renderer.doc_footer(&mut ob);
    }
    ob
}

struct Walker<'r, R: Renderer + ?Sized> {
    renderer: &'r mut R,
    caps: Capabilities,
}

impl<R: Renderer + ?Sized> Walker<'_, R> {
    fn has(&self, cap: Capabilities) -> bool {
        self.caps.contains(cap)
    }

    /// Call `f` when `cap` is implemented, else emit `content` as is.
    fn wrap(
        &mut self,
        ob: &mut String,
        content: &str,
        cap: Capabilities,
        f: impl FnOnce(&mut R, &mut String, &str),
    ) {
        if self.has(cap) {
            f(&mut *self.renderer, ob, content);
        } else {
            ob.push_str(content);
        }
    }

    fn blocks(&mut self, ob: &mut String, blocks: &[Block]) {
        for block in blocks {
            self.block(ob, block);
        }
    }

    fn block(&mut self, ob: &mut String, block: &Block) {
        match block {
            Block::Header { level, content } => {
                let inner = self.inlines_to_string(content);
                let level = *level;
                self.wrap(ob, &inner, Capabilities::HEADER, |r, ob, c| r.header(ob, c, level));
            }
            Block::Paragraph { content } => {
                let inner = self.inlines_to_string(content);
                self.wrap(ob, &inner, Capabilities::PARAGRAPH, |r, ob, c| r.paragraph(ob, c));
            }
            Block::BlockQuote { children } => {
                let mut inner = String::new();
                self.blocks(&mut inner, children);
                self.wrap(ob, &inner, Capabilities::BLOCK_QUOTE, |r, ob, c| r.block_quote(ob, c));
            }
            Block::List { flags, items } => {
                let mut inner = String::new();
                for item in items {
                    let mut content = self.inlines_to_string(&item.content);
                    self.blocks(&mut content, &item.children);
                    let item_flags = item.flags;
                    self.wrap(&mut inner, &content, Capabilities::LIST_ITEM, |r, ob, c| {
                        r.list_item(ob, c, item_flags)
                    });
                }
                let flags = *flags;
                self.wrap(ob, &inner, Capabilities::LIST, |r, ob, c| r.list(ob, c, flags));
            }
            Block::CodeBlock { lang, text } => {
                if self.has(Capabilities::BLOCK_CODE) {
                    self.renderer.block_code(ob, text, lang.as_deref());
                } else {
                    self.text(ob, text);
                }
            }
            Block::HtmlBlock { text } => {
                self.wrap(ob, text, Capabilities::BLOCK_HTML, |r, ob, c| r.block_html(ob, c));
            }
            Block::HorizontalRule => {
                if self.has(Capabilities::HRULE) {
                    self.renderer.hrule(ob);
                }
            }
            Block::Table {
                alignments,
                header,
                rows,
            } => {
                let mut inner = String::new();

                let mut head = String::new();
                self.table_row(&mut head, &header.cells, alignments, true);
                self.wrap(&mut inner, &head, Capabilities::TABLE_HEADER, |r, ob, c| {
                    r.table_header(ob, c)
                });

                let mut body = String::new();
                for row in rows {
                    self.table_row(&mut body, &row.cells, alignments, false);
                }
                self.wrap(&mut inner, &body, Capabilities::TABLE_BODY, |r, ob, c| {
                    r.table_body(ob, c)
                });

                self.wrap(ob, &inner, Capabilities::TABLE, |r, ob, c| r.table(ob, c));
            }
        }
    }

    fn table_row(
        &mut self,
        ob: &mut String,
        cells: &[Vec<Inline>],
        alignments: &[Alignment],
        header: bool,
    ) {
        let mut row = String::new();
        for (col, cell) in cells.iter().enumerate() {
            let content = self.inlines_to_string(cell);
            let align = alignments.get(col).copied().unwrap_or_default();
            self.wrap(&mut row, &content, Capabilities::TABLE_CELL, |r, ob, c| {
                r.table_cell(ob, c, align, header)
            });
        }
        self.wrap(ob, &row, Capabilities::TABLE_ROW, |r, ob, c| r.table_row(ob, c));
    }

    fn inlines_to_string(&mut self, inlines: &[Inline]) -> String {
        let mut out = String::new();
        self.inlines(&mut out, inlines);
        out
    }

    fn inlines(&mut self, ob: &mut String, inlines: &[Inline]) {
        for inline in inlines {
            self.inline(ob, inline);
        }
    }

    fn text(&mut self, ob: &mut String, text: &str) {
        if self.has(Capabilities::NORMAL_TEXT) {
            self.renderer.normal_text(ob, text);
        } else {
            ob.push_str(text);
        }
    }

    fn inline(&mut self, ob: &mut String, inline: &Inline) {
        match inline {
            Inline::Text { text } => self.text(ob, text),
            Inline::Entity { text } => {
                self.wrap(ob, text, Capabilities::ENTITY, |r, ob, c| r.entity(ob, c));
            }
            Inline::Emphasis { level, children } => {
                let inner = self.inlines_to_string(children);
                match level {
                    1 => {
                        self.wrap(ob, &inner, Capabilities::EMPHASIS, |r, ob, c| r.emphasis(ob, c))
                    }
                    2 => self.wrap(ob, &inner, Capabilities::DOUBLE_EMPHASIS, |r, ob, c| {
                        r.double_emphasis(ob, c)
                    }),
                    _ => self.wrap(ob, &inner, Capabilities::TRIPLE_EMPHASIS, |r, ob, c| {
                        r.triple_emphasis(ob, c)
                    }),
                }
            }
            Inline::Underline { children } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::UNDERLINE, |r, ob, c| r.underline(ob, c));
            }
            Inline::Highlight { children } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::HIGHLIGHT, |r, ob, c| r.highlight(ob, c));
            }
            Inline::Quote { children } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::QUOTE, |r, ob, c| r.quote(ob, c));
            }
            Inline::Strikethrough { children } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::STRIKETHROUGH, |r, ob, c| {
                    r.strikethrough(ob, c)
                });
            }
            Inline::Superscript { children } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::SUPERSCRIPT, |r, ob, c| r.superscript(ob, c));
            }
            Inline::CodeSpan { text } => {
                if self.has(Capabilities::CODESPAN) {
                    self.renderer.codespan(ob, text);
                } else {
                    self.text(ob, text);
                }
            }
            Inline::Link {
                href,
                title,
                children,
            } => {
                let inner = self.inlines_to_string(children);
                self.wrap(ob, &inner, Capabilities::LINK, |r, ob, c| {
                    r.link(ob, c, href, title.as_deref())
                });
            }
            Inline::Image { href, title, alt } => {
                if self.has(Capabilities::IMAGE) {
                    self.renderer.image(ob, href, title.as_deref(), alt);
                } else {
                    self.text(ob, alt);
                }
            }
            Inline::Autolink { href, link_kind } => {
                if self.has(Capabilities::AUTOLINK) {
                    self.renderer.autolink(ob, href, *link_kind);
                } else {
                    self.text(ob, href);
                }
            }
            Inline::RawHtml { text } => {
                self.wrap(ob, text, Capabilities::RAW_HTML, |r, ob, c| r.raw_html(ob, c));
            }
            Inline::LineBreak => {
                if self.has(Capabilities::LINEBREAK) {
                    self.renderer.linebreak(ob);
                }
            }
            Inline::FootnoteRef { number } => {
                if self.has(Capabilities::FOOTNOTE_REF) {
                    self.renderer.footnote_ref(ob, *number);
                }
            }
        }
    }
}

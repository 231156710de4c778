use bitflags::bitflags;
use serde::Serialize;

/// A parsed Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// Ordered sequence of top-level blocks.
    pub blocks: Vec<Block>,
    /// Footnote definitions, numbered in the order they were defined.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<FootnoteDef>,
}

/// A parsed block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Block {
    Header {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    BlockQuote {
        children: Vec<Block>,
    },
    List {
        flags: ListFlags,
        items: Vec<ListItem>,
    },
    /// Fenced or indented code; `text` is verbatim and never span-parsed.
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
    /// Raw HTML block, passed to the renderer untouched.
    HtmlBlock {
        text: String,
    },
    HorizontalRule,
    Table {
        alignments: Vec<Alignment>,
        header: TableRow,
        rows: Vec<TableRow>,
    },
}

/// One item of a [`Block::List`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub flags: ListFlags,
    /// Inline content of a tight item; empty when the item is loose.
    pub content: Vec<Inline>,
    /// Block content: everything of a loose item, or a tight item's sublist.
    pub children: Vec<Block>,
}

bitflags! {
    /// List and list item flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct ListFlags: u8 {
        const ORDERED = 1 << 0;
        /// Item content is block-level (a "loose" item).
        const BLOCK = 1 << 1;
    }
}

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Right,
    Center,
}

/// A table row: one inline sequence per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<Vec<Inline>>,
}

/// A footnote definition collected from the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootnoteDef {
    /// 1-based number, by definition order.
    pub number: usize,
    pub children: Vec<Block>,
}

/// Kind of an autolink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutolinkKind {
    Url,
    Email,
}

/// A parsed inline span.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Inline {
    Text {
        text: String,
    },
    /// An HTML entity such as `&amp;`, kept as written.
    Entity {
        text: String,
    },
    /// `*x*` (level 1), `**x**` (level 2) or `***x***` (level 3).
    Emphasis {
        level: u8,
        children: Vec<Inline>,
    },
    Underline {
        children: Vec<Inline>,
    },
    Highlight {
        children: Vec<Inline>,
    },
    Quote {
        children: Vec<Inline>,
    },
    Strikethrough {
        children: Vec<Inline>,
    },
    Superscript {
        children: Vec<Inline>,
    },
    CodeSpan {
        text: String,
    },
    Link {
        href: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Inline>,
    },
    Image {
        href: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        alt: String,
    },
    Autolink {
        href: String,
        link_kind: AutolinkKind,
    },
    RawHtml {
        text: String,
    },
    LineBreak,
    FootnoteRef {
        number: usize,
    },
}

impl Inline {
    pub fn text(s: impl Into<String>) -> Self {
        Inline::Text { text: s.into() }
    }
}

impl Document {
    /// Serialize the parsed tree as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, crate::Error> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Serialize(e.to_string()))
    }
}

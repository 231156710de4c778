//! Block-level scanner.
//!
//! Works on normalized text (see [`crate::parse`]): `\n` line endings, tabs
//! expanded, definitions removed. Every handler either declines (`None`) or
//! consumes at least one full line, so a document is scanned in one pass.

use std::collections::HashMap;

use crate::flags::Extensions;
use crate::inline::{Search, parse_inline};
use crate::parse::Context;
use crate::types::{Alignment, Block, Inline, ListFlags, ListItem, TableRow};

/// Block-level HTML tags that open a raw HTML block.
const BLOCK_TAGS: &[&str] = &[
    "article", "aside", "blockquote", "canvas", "del", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "iframe",
    "ins", "math", "nav", "noscript", "ol", "output", "p", "pre", "script", "section", "style",
    "table", "ul", "video",
];

pub(crate) struct BlockParser<'a> {
    ctx: &'a Context,
}

/// Per-buffer scan state.
#[derive(Default)]
struct Scan {
    /// Offsets from which no closing tag at a line start exists, keyed by tag.
    html_no_end: HashMap<&'static str, usize>,
    comment_end: Lookahead,
    hr_end: Lookahead,
}

/// Remembers the last forward search for a fixed needle, so that repeated
/// searches from increasing offsets walk the buffer once.
#[derive(Debug, Default)]
struct Lookahead {
    searched_from: usize,
    found: Option<Option<usize>>,
}

impl Lookahead {
    /// Absolute offset of the first `needle` at or after `from`.
    fn find(&mut self, data: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
        if let Some(found) = self.found {
            if from >= self.searched_from && found.is_none_or(|pos| pos >= from) {
                return found;
            }
        }
        let found = data
            .get(from..)?
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|k| from + k);
        self.searched_from = from;
        self.found = Some(found);
        found
    }
}

impl<'a> BlockParser<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn enabled(&self, ext: Extensions) -> bool {
        self.ctx.extensions.contains(ext)
    }

    /// Parse a run of block content. `depth` counts enclosing containers.
    pub fn parse(&self, text: &str, depth: usize) -> Vec<Block> {
        let mut blocks = Vec::new();

        if depth > self.ctx.max_nesting {
            let flat = text.trim_matches('\n');
            if !flat.is_empty() {
                blocks.push(Block::Paragraph {
                    content: vec![Inline::text(flat)],
                });
            }
            return blocks;
        }

        let mut scan = Scan::default();
        let mut beg = 0;
        while beg < text.len() {
            let consumed = self.block_at(text, beg, depth, &mut scan, &mut blocks);
            beg += consumed;
        }
        blocks
    }

    /// Dispatch one block at `beg`; returns the number of bytes consumed.
    fn block_at(
        &self,
        text: &str,
        beg: usize,
        depth: usize,
        scan: &mut Scan,
        out: &mut Vec<Block>,
    ) -> usize {
        let rest = &text[beg..];
        let data = rest.as_bytes();

        if let Some(n) = blank_line_len(data) {
            return n;
        }
        if self.enabled(Extensions::FENCED_CODE) {
            if let Some(n) = self.fenced_code(rest, out) {
                log::trace!("fenced code at {beg}");
                return n;
            }
        }
        if prefix_code(data) > 0 {
            return self.indented_code(rest, out);
        }
        if self.is_atx_header(data) {
            return self.atx_header(rest, depth, out);
        }
        if let Some(n) = self.setext_header(rest, depth, out) {
            return n;
        }
        if is_hrule(data) {
            out.push(Block::HorizontalRule);
            return line_end(data, 0);
        }
        if prefix_quote(data) > 0 {
            return self.blockquote(rest, depth, out);
        }
        if prefix_uli(data) > 0 {
            return self.list(rest, ListFlags::empty(), depth, out);
        }
        if prefix_oli(data) > 0 {
            return self.list(rest, ListFlags::ORDERED, depth, out);
        }
        if self.enabled(Extensions::TABLES) {
            if let Some(n) = self.table(rest, depth, out) {
                log::trace!("table at {beg}");
                return n;
            }
        }
        if data[0] == b'<' {
            if let Some(n) = html_block_len(text, beg, scan) {
                out.push(Block::HtmlBlock {
                    text: rest[..n].to_string(),
                });
                return n;
            }
        }
        self.paragraph(rest, depth, out)
    }

    fn inline(&self, text: &str, depth: usize) -> Vec<Inline> {
        parse_inline(self.ctx, text, depth)
    }

    // ------------------------------------------------------------------
    // Headers and rules
    // ------------------------------------------------------------------

    fn is_atx_header(&self, data: &[u8]) -> bool {
        if data.first() != Some(&b'#') {
            return false;
        }
        if self.enabled(Extensions::SPACE_HEADERS) {
            let level = data.iter().take(6).take_while(|&&b| b == b'#').count();
            if level < data.len() && data[level] != b' ' {
                return false;
            }
        }
        true
    }

    fn atx_header(&self, rest: &str, depth: usize, out: &mut Vec<Block>) -> usize {
        let data = rest.as_bytes();
        let level = data.iter().take(6).take_while(|&&b| b == b'#').count();
        let mut start = level;
        while start < data.len() && data[start] == b' ' {
            start += 1;
        }
        let eol = line_end(data, 0);
        let mut end = if eol > 0 && data[eol - 1] == b'\n' { eol - 1 } else { eol };
        while end > 0 && data[end - 1] == b'#' {
            end -= 1;
        }
        while end > 0 && data[end - 1] == b' ' {
            end -= 1;
        }

        // "######" alone is consumed without output
        if end > start {
            out.push(Block::Header {
                level: level as u8,
                content: self.inline(&rest[start..end], depth),
            });
        }
        eol
    }

    /// A text line followed by an `=`/`-` underline.
    fn setext_header(&self, rest: &str, depth: usize, out: &mut Vec<Block>) -> Option<usize> {
        let data = rest.as_bytes();
        let first = line_end(data, 0);
        if first >= data.len() || is_hrule(data) || prefix_quote(data) > 0 {
            return None;
        }
        let level = headerline_level(&data[first..])?;
        let content = rest[..first].trim_end_matches('\n').trim_start_matches(' ');
        out.push(Block::Header {
            level,
            content: self.inline(content, depth),
        });
        Some(line_end(data, first))
    }

    // ------------------------------------------------------------------
    // Code
    // ------------------------------------------------------------------

    fn indented_code(&self, rest: &str, out: &mut Vec<Block>) -> usize {
        let data = rest.as_bytes();
        let mut code = String::new();
        let mut beg = 0;
        while beg < data.len() {
            let end = line_end(data, beg);
            let line = &data[beg..end];
            let pre = prefix_code(line);
            if pre == 0 && blank_line_len(line).is_none() {
                break;
            }
            if blank_line_len(&line[pre..]).is_some() {
                code.push('\n');
            } else {
                code.push_str(&rest[beg + pre..end]);
            }
            beg = end;
        }

        let trimmed = code.trim_end_matches('\n').len();
        code.truncate(trimmed);
        code.push('\n');
        out.push(Block::CodeBlock {
            lang: None,
            text: code,
        });
        beg
    }

    fn fenced_code(&self, rest: &str, out: &mut Vec<Block>) -> Option<usize> {
        let data = rest.as_bytes();
        let first = line_end(data, 0);
        let opening = &rest[..first];
        let fence = code_fence(opening.as_bytes())?;
        let lang = fence_info(opening, &fence)?;

        let text_start = first;
        let mut beg = first;
        let mut text_end = data.len();
        let mut end = data.len();
        while beg < data.len() {
            let eol = line_end(data, beg);
            if let Some(close) = code_fence(&data[beg..eol]) {
                let after = beg + close.end;
                if close.ch == fence.ch
                    && close.width >= fence.width
                    && blank_line_len(&data[after..eol]).is_some()
                {
                    text_end = beg;
                    end = eol;
                    break;
                }
            }
            beg = eol;
        }

        out.push(Block::CodeBlock {
            lang,
            text: rest[text_start..text_end].to_string(),
        });
        Some(end)
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    fn blockquote(&self, rest: &str, depth: usize, out: &mut Vec<Block>) -> usize {
        let data = rest.as_bytes();
        let mut content = String::new();
        let mut beg = 0;
        while beg < data.len() {
            let end = line_end(data, beg);
            let line = &data[beg..end];
            let pre = prefix_quote(line);
            if pre == 0 && blank_line_len(line).is_some() {
                let next = &data[end..];
                if end >= data.len() || (prefix_quote(next) == 0 && blank_line_len(next).is_none())
                {
                    beg = end;
                    break;
                }
            }
            content.push_str(&rest[beg + pre..end]);
            beg = end;
        }

        out.push(Block::BlockQuote {
            children: self.parse(&content, depth + 1),
        });
        beg
    }

    fn list(&self, rest: &str, mut flags: ListFlags, depth: usize, out: &mut Vec<Block>) -> usize {
        let mut items = Vec::new();
        let mut beg = 0;
        while beg < rest.len() {
            let Some(item) = self.list_item(&rest[beg..], &mut flags, depth) else {
                break;
            };
            beg += item.consumed;
            items.push(item.item);
            if item.ends_list {
                break;
            }
        }

        out.push(Block::List { flags, items });
        beg
    }

    fn list_item(&self, rest: &str, flags: &mut ListFlags, depth: usize) -> Option<ParsedItem> {
        let data = rest.as_bytes();
        let orgpre = data.iter().take(3).take_while(|&&b| b == b' ').count();

        let marker = match prefix_uli(data) {
            0 => prefix_oli(data),
            n => n,
        };
        if marker == 0 {
            return None;
        }

        let mut work = String::new();
        let first_end = line_end(data, marker);
        work.push_str(&rest[marker..first_end]);
        let mut beg = first_end;

        let mut in_empty = false;
        let mut has_inside_empty = false;
        let mut in_fence = false;
        let mut ends_list = false;
        let mut sublist = 0;

        while beg < data.len() {
            let end = line_end(data, beg);
            let line = &data[beg..end];

            if blank_line_len(line).is_some() {
                in_empty = true;
                beg = end;
                continue;
            }

            let pre = line.iter().take(4).take_while(|&&b| b == b' ').count();
            let body = &line[pre..];

            if self.enabled(Extensions::FENCED_CODE) && code_fence(body).is_some() {
                in_fence = !in_fence;
            }

            let (next_uli, next_oli) = if in_fence {
                (false, false)
            } else {
                (prefix_uli(body) > 0, prefix_oli(body) > 0)
            };

            if (next_uli && !is_hrule(body)) || next_oli {
                if in_empty {
                    has_inside_empty = true;
                }

                if pre <= orgpre {
                    // a different list type after a blank line ends the list
                    let ordered = flags.contains(ListFlags::ORDERED);
                    if in_empty && ((ordered && next_uli) || (!ordered && next_oli)) {
                        ends_list = true;
                        has_inside_empty = false;
                    }
                    break;
                }

                if sublist == 0 {
                    sublist = work.len();
                }
            } else if in_empty && pre == 0 {
                ends_list = true;
                break;
            }

            if in_empty {
                work.push('\n');
                has_inside_empty = true;
                in_empty = false;
            }

            work.push_str(&rest[beg + pre..end]);
            beg = end;
        }

        if has_inside_empty {
            flags.insert(ListFlags::BLOCK);
        }

        let split = if sublist > 0 && sublist < work.len() {
            sublist
        } else {
            work.len()
        };
        let (head, tail) = work.split_at(split);

        let item = if flags.contains(ListFlags::BLOCK) {
            let mut children = self.parse(head, depth + 1);
            children.extend(self.parse(tail, depth + 1));
            ListItem {
                flags: *flags,
                content: Vec::new(),
                children,
            }
        } else {
            ListItem {
                flags: *flags,
                content: self.inline(head.trim_end_matches('\n'), depth + 1),
                children: self.parse(tail, depth + 1),
            }
        };

        Some(ParsedItem {
            item,
            consumed: beg,
            ends_list,
        })
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    fn table(&self, rest: &str, depth: usize, out: &mut Vec<Block>) -> Option<usize> {
        let data = rest.as_bytes();
        let header_eol = data.iter().position(|&b| b == b'\n')?;
        let header_line = rest[..header_eol].trim_end();
        let separators = cell_separators(header_line.as_bytes());
        let (&first, &last) = (separators.first()?, separators.last()?);

        let mut columns = separators.len() as isize + 1;
        if first == 0 {
            columns -= 1;
        }
        if last + 1 == header_line.len() {
            columns -= 1;
        }
        if columns < 1 {
            return None;
        }
        let columns = columns as usize;

        let under_start = header_eol + 1;
        let under_end = line_end(data, under_start);
        let alignments = table_alignments(&data[under_start..under_end], columns)?;

        let header = self.table_row(header_line, columns, depth);
        let mut rows = Vec::new();
        let mut beg = under_end;
        while beg < data.len() {
            let eol = line_end(data, beg);
            let line = &rest[beg..eol];
            if !line.ends_with('\n') || !line.contains('|') {
                break;
            }
            rows.push(self.table_row(line.trim_end(), columns, depth));
            beg = eol;
        }

        out.push(Block::Table {
            alignments,
            header,
            rows,
        });
        Some(beg)
    }

    fn table_row(&self, line: &str, columns: usize, depth: usize) -> TableRow {
        let data = line.as_bytes();
        let mut cells = Vec::with_capacity(columns);
        let mut search = Search::new(data);
        let mut i = usize::from(data.first() == Some(&b'|'));

        while cells.len() < columns && i < data.len() {
            let cell_end = match search.find(i, b'|') {
                Some(pos) => pos,
                None => data.len(),
            };
            let cell = line[i..cell_end].trim();
            cells.push(self.inline(cell, depth + 1));
            i = cell_end + 1;
        }
        while cells.len() < columns {
            cells.push(Vec::new());
        }

        TableRow { cells }
    }

    // ------------------------------------------------------------------
    // Paragraphs
    // ------------------------------------------------------------------

    fn paragraph(&self, rest: &str, depth: usize, out: &mut Vec<Block>) -> usize {
        let data = rest.as_bytes();
        let mut i = 0;
        let mut end = 0;
        let mut level = None;

        while i < data.len() {
            end = line_end(data, i);
            let line = &data[i..];

            // the first line always belongs to the paragraph
            if i > 0 {
                if blank_line_len(line).is_some() {
                    break;
                }
                if let Some(l) = headerline_level(line) {
                    level = Some(l);
                    break;
                }
                if self.is_atx_header(line)
                    || is_hrule(line)
                    || prefix_quote(line) > 0
                    || (self.enabled(Extensions::FENCED_CODE) && code_fence(line).is_some())
                {
                    end = i;
                    break;
                }
            }
            i = end;
        }

        let body = rest[..i].trim_end_matches('\n');
        match level {
            None => {
                let body = body.trim_start();
                if !body.is_empty() {
                    out.push(Block::Paragraph {
                        content: self.inline(body, depth),
                    });
                }
            }
            Some(level) => {
                // the last line becomes the header, the rest stays a paragraph
                let (lead, last) = match body.rfind('\n') {
                    Some(pos) => (&body[..pos], &body[pos + 1..]),
                    None => ("", body),
                };
                let lead = lead.trim_end_matches('\n').trim_start();
                if !lead.is_empty() {
                    out.push(Block::Paragraph {
                        content: self.inline(lead, depth),
                    });
                }
                out.push(Block::Header {
                    level,
                    content: self.inline(last.trim_start_matches(' '), depth),
                });
            }
        }
        end
    }
}

struct ParsedItem {
    item: ListItem,
    consumed: usize,
    ends_list: bool,
}

// ----------------------------------------------------------------------
// Line predicates
// ----------------------------------------------------------------------

/// Index just past the newline ending the line that contains `from`.
pub(crate) fn line_end(data: &[u8], from: usize) -> usize {
    match data.get(from..).and_then(|d| d.iter().position(|&b| b == b'\n')) {
        Some(pos) => from + pos + 1,
        None => data.len(),
    }
}

/// Length of a line holding only spaces, newline included.
pub(crate) fn blank_line_len(data: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < data.len() && data[i] != b'\n' {
        if data[i] != b' ' {
            return None;
        }
        i += 1;
    }
    if i < data.len() {
        Some(i + 1)
    } else if i > 0 || data.is_empty() {
        Some(i)
    } else {
        None
    }
}

fn leading_spaces(data: &[u8], max: usize) -> usize {
    data.iter().take(max).take_while(|&&b| b == b' ').count()
}

fn is_hrule(data: &[u8]) -> bool {
    let mut i = leading_spaces(data, 3);
    if i + 2 >= data.len() || !matches!(data[i], b'*' | b'-' | b'_') {
        return false;
    }
    let c = data[i];
    let mut n = 0;
    while i < data.len() && data[i] != b'\n' {
        if data[i] == c {
            n += 1;
        } else if data[i] != b' ' {
            return false;
        }
        i += 1;
    }
    n >= 3
}

/// `Some(1)` for an `===` underline, `Some(2)` for `---`.
fn headerline_level(data: &[u8]) -> Option<u8> {
    let c = *data.first()?;
    let level = match c {
        b'=' => 1,
        b'-' => 2,
        _ => return None,
    };
    let mut i = 1;
    while i < data.len() && data[i] == c {
        i += 1;
    }
    while i < data.len() && data[i] == b' ' {
        i += 1;
    }
    (i >= data.len() || data[i] == b'\n').then_some(level)
}

fn next_line_is_headerline(data: &[u8]) -> bool {
    let next = line_end(data, 0);
    next < data.len() && headerline_level(&data[next..]).is_some()
}

fn prefix_quote(data: &[u8]) -> usize {
    let i = leading_spaces(data, 3);
    if data.get(i) != Some(&b'>') {
        return 0;
    }
    if data.get(i + 1) == Some(&b' ') {
        i + 2
    } else {
        i + 1
    }
}

fn prefix_code(data: &[u8]) -> usize {
    if leading_spaces(data, 4) == 4 { 4 } else { 0 }
}

fn prefix_uli(data: &[u8]) -> usize {
    let i = leading_spaces(data, 3);
    if i + 1 >= data.len() || !matches!(data[i], b'*' | b'+' | b'-') || data[i + 1] != b' ' {
        return 0;
    }
    if next_line_is_headerline(&data[i..]) {
        return 0;
    }
    i + 2
}

fn prefix_oli(data: &[u8]) -> usize {
    let start = leading_spaces(data, 3);
    let mut i = start;
    while i < data.len() && data[i].is_ascii_digit() {
        i += 1;
    }
    if i == start || i + 1 >= data.len() || data[i] != b'.' || data[i + 1] != b' ' {
        return 0;
    }
    if next_line_is_headerline(&data[i..]) {
        return 0;
    }
    i + 2
}

struct Fence {
    ch: u8,
    width: usize,
    /// Offset just past the fence characters.
    end: usize,
}

fn code_fence(data: &[u8]) -> Option<Fence> {
    let i = leading_spaces(data, 3);
    let ch = *data.get(i)?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let width = data[i..].iter().take_while(|&&b| b == ch).count();
    (width >= 3).then_some(Fence {
        ch,
        width,
        end: i + width,
    })
}

/// The language of an opening fence line, `Some(None)` when absent.
///
/// Returns `None` when the line is really a code span such as
/// ```` ```code``` ````.
fn fence_info(line: &str, fence: &Fence) -> Option<Option<String>> {
    let info = line[fence.end..].trim();
    if info.as_bytes().windows(3).any(|w| w.iter().all(|&b| b == fence.ch)) {
        return None;
    }
    let lang = if let Some(braced) = info.strip_prefix('{') {
        braced.split('}').next().unwrap_or("").trim().trim_start_matches('.')
    } else {
        info.split_whitespace().next().unwrap_or("")
    };
    Some((!lang.is_empty()).then(|| lang.to_string()))
}

/// Offsets of the `|` bytes that separate cells, ignoring those inside code
/// spans and link text.
fn cell_separators(line: &[u8]) -> Vec<usize> {
    let mut search = Search::new(line);
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(pos) = search.find(from, b'|') {
        found.push(pos);
        from = pos + 1;
    }
    found
}

/// Parse the `---|:---:|` delimiter row of a table.
fn table_alignments(data: &[u8], columns: usize) -> Option<Vec<Alignment>> {
    let end = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let mut i = usize::from(data.first() == Some(&b'|'));
    let mut alignments = Vec::with_capacity(columns);

    while alignments.len() < columns && i < end {
        let mut dashes = 0;
        let (mut left, mut right) = (false, false);

        while i < end && data[i] == b' ' {
            i += 1;
        }
        if i < end && data[i] == b':' {
            left = true;
            dashes += 1;
            i += 1;
        }
        while i < end && data[i] == b'-' {
            dashes += 1;
            i += 1;
        }
        if i < end && data[i] == b':' {
            right = true;
            dashes += 1;
            i += 1;
        }
        while i < end && data[i] == b' ' {
            i += 1;
        }
        if i < end && data[i] != b'|' && data[i] != b'+' {
            return None;
        }
        if dashes < 3 {
            return None;
        }
        i += 1;

        alignments.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        });
    }

    (alignments.len() == columns).then_some(alignments)
}

// ----------------------------------------------------------------------
// Raw HTML blocks
// ----------------------------------------------------------------------

fn find_block_tag(name: &str) -> Option<&'static str> {
    BLOCK_TAGS
        .iter()
        .copied()
        .find(|tag| tag.eq_ignore_ascii_case(name))
}

/// Length of the raw HTML block starting at `text[beg..]`, if any.
fn html_block_len(text: &str, beg: usize, scan: &mut Scan) -> Option<usize> {
    let data = &text.as_bytes()[beg..];
    if data.len() < 2 || data[0] != b'<' {
        return None;
    }

    let mut i = 1;
    while i < data.len() && data[i] != b'>' && data[i] != b' ' && data[i] != b'\n' {
        i += 1;
    }
    let tag = if i < data.len() {
        find_block_tag(&text[beg + 1..beg + i])
    } else {
        None
    };

    let Some(tag) = tag else {
        return special_html_block_len(text.as_bytes(), beg, scan);
    };

    if scan.html_no_end.get(tag).is_some_and(|&from| beg >= from) {
        // only a closing tag on the opening line is left to find
        let first_line = line_end(data, 0);
        return html_block_end(&data[..first_line], tag, true);
    }

    if let Some(end) = html_block_end(data, tag, true) {
        return Some(end);
    }
    // ins and del only close at the start of a line
    if tag == "ins" || tag == "del" {
        scan.html_no_end.insert(tag, beg);
        return None;
    }
    let end = html_block_end(data, tag, false);
    if end.is_none() {
        scan.html_no_end.insert(tag, beg);
    }
    end
}

/// HTML comments and `<hr>`, the only tag-less or self-closing blocks.
fn special_html_block_len(text: &[u8], beg: usize, scan: &mut Scan) -> Option<usize> {
    let data = &text[beg..];
    if data.len() > 5 && data.starts_with(b"<!--") {
        let close = scan.comment_end.find(text, beg + 4, b"-->")? + 3;
        let tail = blank_line_len(&text[close..])?;
        return Some(close + tail - beg);
    }

    if data.len() > 4 && data[1].eq_ignore_ascii_case(&b'h') && data[2].eq_ignore_ascii_case(&b'r')
    {
        let close = scan.hr_end.find(text, beg + 3, b">")? + 1;
        let tail = blank_line_len(&text[close..])?;
        return Some(close + tail - beg);
    }

    None
}

/// Find `</tag>` followed by the end of its line.
///
/// In strict mode the closing tag must open a line (or sit on the first
/// line of the block).
fn html_block_end(data: &[u8], tag: &str, strict: bool) -> Option<usize> {
    let mut i = 1;
    let mut on_first_line = true;
    while i + 1 < data.len() {
        if data[i] == b'\n' {
            on_first_line = false;
        }
        if data[i] == b'<' && data[i + 1] == b'/' {
            let at_line_start = data[i - 1] == b'\n';
            if !strict || on_first_line || at_line_start {
                if let Some(len) = closing_tag_len(&data[i..], tag) {
                    return Some(i + len);
                }
            }
        }
        i += 1;
    }
    None
}

fn closing_tag_len(data: &[u8], tag: &str) -> Option<usize> {
    let name_end = 2 + tag.len();
    if data.len() <= name_end
        || !data[2..name_end].eq_ignore_ascii_case(tag.as_bytes())
        || data[name_end] != b'>'
    {
        return None;
    }
    let after = name_end + 1;
    if after == data.len() {
        return Some(after);
    }
    blank_line_len(&data[after..]).map(|w| after + w)
}

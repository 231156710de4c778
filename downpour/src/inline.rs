//! Span-level scanner.
//!
//! The scanner walks a block's text byte by byte and only stops on bytes
//! that can open a construct (`*`, `[`, `<`, ...). Everything between two
//! such bytes is copied into the output as text. A handler that fails leaves
//! its trigger byte in the text run, so malformed syntax always degrades to
//! the literal characters.
//!
//! Searches for closing delimiters remember the offsets from which they are
//! known to fail, which keeps runs of unmatched markers from re-scanning the
//! remainder of the block once per marker.

use std::collections::HashMap;

use crate::autolink;
use crate::flags::Extensions;
use crate::parse::Context;
use crate::types::{AutolinkKind, Inline};

/// Bytes a backslash turns into literal text.
const ESCAPABLE: &[u8] = b"\\`*_{}[]()#+-.!:|&<>^~=\"$";

/// Parse span-level content of a block.
pub(crate) fn parse_inline(ctx: &Context, text: &str, depth: usize) -> Vec<Inline> {
    Scanner::new(ctx, text, depth, false).run()
}

/// Where a search resumes after a skipped construct, or the match and
/// clean offset that end it (`None` keeps the current clean offset).
type Skip = Result<usize, (Option<usize>, Option<usize>)>;

/// Closer searches over one block of text.
///
/// A search for a marker skips code spans and bracketed link text. The
/// outcome of a search passing through a skipped construct does not depend
/// on where the search started, so it is stored per construct and every
/// construct is walked at most once per marker. Searches for single bytes
/// go through sorted position lists.
pub(crate) struct Search<'a> {
    data: &'a [u8],
    /// (marker, construct offset) -> (match, offset past the last skip)
    results: HashMap<(u8, usize), (Option<usize>, usize)>,
    positions: HashMap<u8, Vec<usize>>,
    /// `]` offset -> first non-space offset after it
    after_bracket: HashMap<usize, usize>,
    /// Maximal backtick runs as (start, length).
    tick_runs: Option<Vec<(usize, usize)>>,
    /// Run length -> offset from which no closing run exists.
    no_tick_close: HashMap<usize, usize>,
}

impl<'a> Search<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            results: HashMap::new(),
            positions: HashMap::new(),
            after_bracket: HashMap::new(),
            tick_runs: None,
            no_tick_close: HashMap::new(),
        }
    }

    /// Next unescaped `c` at or after `from`, skipping code spans and
    /// bracketed link text.
    pub fn find(&mut self, from: usize, c: u8) -> Option<usize> {
        self.scan(from, c).0
    }

    /// First `b` at or after `from`, escaped or not.
    fn next_byte(&mut self, b: u8, from: usize) -> Option<usize> {
        let data = self.data;
        let positions = self.positions.entry(b).or_insert_with(|| {
            data.iter()
                .enumerate()
                .filter_map(|(k, &x)| (x == b).then_some(k))
                .collect()
        });
        let k = positions.partition_point(|&p| p < from);
        positions.get(k).copied()
    }

    /// First `b` in `from..to`.
    fn byte_in(&mut self, b: u8, from: usize, to: usize) -> Option<usize> {
        self.next_byte(b, from).filter(|&p| p < to)
    }

    /// Like [`Search::find`], also returning the offset past the last
    /// skipped construct (0 when nothing was skipped). A failed search fails
    /// again from any start at or beyond that offset.
    fn scan(&mut self, from: usize, c: u8) -> (Option<usize>, usize) {
        let data = self.data;
        let n = data.len();
        let mut i = from;
        let mut clean = 0;
        let mut visited = Vec::new();

        let result = loop {
            while i < n && data[i] != c && data[i] != b'[' && data[i] != b'`' {
                i += 1;
            }
            if i == n {
                break (None, clean);
            }
            if i > 0 && data[i - 1] == b'\\' {
                i += 1;
                continue;
            }
            if data[i] == c {
                break (Some(i), clean);
            }
            if let Some(&(found, end)) = self.results.get(&(c, i)) {
                break (found, end.max(clean));
            }

            visited.push(i);
            let skipped = if data[i] == b'`' {
                self.skip_code(i, c)
            } else {
                self.skip_link(i, c)
            };
            match skipped {
                Ok(next) => {
                    i = next;
                    clean = next;
                }
                Err((found, end)) => break (found, end.unwrap_or(clean)),
            }
        };

        for at in visited {
            self.results.insert((c, at), result);
        }
        result
    }

    /// Skip the code span opening at `i`.
    fn skip_code(&mut self, mut i: usize, c: u8) -> Skip {
        let n = self.data.len();
        let mut span = 0;
        while i < n && self.data[i] == b'`' {
            i += 1;
            span += 1;
        }
        if i >= n {
            return Err((None, Some(n)));
        }
        match self.tick_close(i, span) {
            Some(end) => Ok(end),
            None => Err((self.next_byte(c, i), Some(n))),
        }
    }

    /// Skip `[text]` and a following `(...)` or `[...]` starting at `i`.
    fn skip_link(&mut self, i: usize, c: u8) -> Skip {
        let n = self.data.len();
        let Some(bracket) = self.next_byte(b']', i + 1) else {
            return Err((self.next_byte(c, i + 1), Some(n)));
        };
        let inner = self.byte_in(c, i + 1, bracket);

        let j = self.after_bracket(bracket);
        if j >= n {
            return Err((inner, Some(n)));
        }
        let close = match self.data[j] {
            b'[' => b']',
            b'(' => b')',
            _ if inner.is_some() => return Err((inner, None)),
            _ => return Ok(j),
        };

        match self.next_byte(close, j + 1) {
            Some(end) => Ok(end + 1),
            None => {
                let found = match inner {
                    Some(pos) => Some(pos),
                    None => self.next_byte(c, j + 1),
                };
                Err((found, Some(n)))
            }
        }
    }

    fn after_bracket(&mut self, bracket: usize) -> usize {
        if let Some(&j) = self.after_bracket.get(&bracket) {
            return j;
        }
        let data = self.data;
        let mut j = bracket + 1;
        while j < data.len() && is_space(data[j]) {
            j += 1;
        }
        self.after_bracket.insert(bracket, j);
        j
    }

    /// Offset past the first run of `span` backticks at or after `from`.
    fn tick_close(&mut self, from: usize, span: usize) -> Option<usize> {
        if self.no_tick_close.get(&span).is_some_and(|&at| at <= from) {
            return None;
        }
        let data = self.data;
        let runs = self.tick_runs.get_or_insert_with(|| backtick_runs(data));
        let k = runs.partition_point(|&(start, _)| start < from);
        let found = runs[k..]
            .iter()
            .find(|&&(_, len)| len >= span)
            .map(|&(start, _)| start + span);
        if found.is_none() {
            self.no_tick_close
                .entry(span)
                .and_modify(|prev| *prev = (*prev).min(from))
                .or_insert(from);
        }
        found
    }
}

fn backtick_runs(data: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'`' {
            let start = i;
            while i < data.len() && data[i] == b'`' {
                i += 1;
            }
            runs.push((start, i - start));
        } else {
            i += 1;
        }
    }
    runs
}

/// Where the scan of a `(` link target stops, for every `(` of a block.
///
/// A target ends at its matching `)` or earlier at a quote that follows
/// whitespace (the start of a title). Positions are recorded in one pass
/// that honors backslash escapes the same way the target scan does.
struct TargetStops {
    parens: HashMap<usize, usize>,
    title_starts: Vec<usize>,
    /// Unescaped `"`, `'` and `)` offsets.
    double_quotes: Vec<usize>,
    single_quotes: Vec<usize>,
    closing: Vec<usize>,
}

impl TargetStops {
    fn new(data: &[u8]) -> Self {
        let mut stops = TargetStops {
            parens: HashMap::new(),
            title_starts: Vec::new(),
            double_quotes: Vec::new(),
            single_quotes: Vec::new(),
            closing: Vec::new(),
        };
        let mut open = Vec::new();
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'(' => open.push(i),
                b')' => {
                    stops.closing.push(i);
                    if let Some(start) = open.pop() {
                        stops.parens.insert(start, i);
                    }
                }
                q @ (b'"' | b'\'') => {
                    if i > 0 && is_space(data[i - 1]) {
                        stops.title_starts.push(i);
                    }
                    if q == b'"' {
                        stops.double_quotes.push(i);
                    } else {
                        stops.single_quotes.push(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        stops
    }

    /// Where the href part of the target opened at `paren` ends.
    fn href_end(&self, paren: usize) -> Option<usize> {
        let close = self.parens.get(&paren).copied();
        let title = first_after(&self.title_starts, paren);
        match (close, title) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The `)` ending a target whose title opens with the quote at `quote`.
    fn title_close(&self, data: &[u8], quote: usize) -> Option<usize> {
        let quotes = if data[quote] == b'"' {
            &self.double_quotes
        } else {
            &self.single_quotes
        };
        let closing_quote = first_after(quotes, quote)?;
        first_after(&self.closing, closing_quote)
    }
}

/// First entry of a sorted list greater than `pos`.
fn first_after(sorted: &[usize], pos: usize) -> Option<usize> {
    let k = sorted.partition_point(|&p| p <= pos);
    sorted.get(k).copied()
}

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\n'
}

/// Drop backslashes, keeping the character each one escapes.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Match every unescaped `[` with its closing `]`, honoring nesting.
fn bracket_pairs(data: &[u8]) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    for (i, &b) in data.iter().enumerate() {
        if i > 0 && data[i - 1] == b'\\' {
            continue;
        }
        match b {
            b'[' => open.push(i),
            b']' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, i);
                }
            }
            _ => {}
        }
    }
    pairs
}

/// First index of a run of `len` backticks at or after `from`.
fn backtick_run(data: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut run = 0;
    for (k, &b) in data.iter().enumerate().skip(from) {
        if b == b'`' {
            run += 1;
            if run == len {
                return Some(k + 1 - len);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// `@domain>` tail of an `<user@domain>` autolink, as a length.
fn mail_autolink(data: &[u8]) -> Option<usize> {
    let mut at_signs = 0;
    for (i, &c) in data.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            continue;
        }
        match c {
            b'@' => at_signs += 1,
            b'-' | b'.' | b'_' => {}
            b'>' => return (at_signs == 1).then_some(i + 1),
            _ => return None,
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Emphasis,
    CodeSpan,
    LineBreak,
    Link,
    Image,
    Angle,
    Escape,
    Entity,
    Url,
    Email,
    Www,
    Superscript,
    Quote,
}

struct Scanner<'a> {
    ctx: &'a Context,
    text: &'a str,
    data: &'a [u8],
    depth: usize,
    /// Inside link text, where bare autolinks are not recognized.
    in_link: bool,
    out: Vec<Inline>,
    // failed-search memos: marker -> offset from which the search fails
    no_single: HashMap<u8, usize>,
    no_double: HashMap<u8, usize>,
    /// (marker, scan offset) -> closing-run search outcome
    double_from: HashMap<(u8, usize), (Option<usize>, usize)>,
    no_code_close: HashMap<usize, usize>,
    no_tag_end: Option<usize>,
    no_comment_end: Option<usize>,
    brackets: Option<HashMap<usize, usize>>,
    targets: Option<TargetStops>,
    search: Search<'a>,
}

impl<'a> Scanner<'a> {
    fn new(ctx: &'a Context, text: &'a str, depth: usize, in_link: bool) -> Self {
        Self {
            ctx,
            text,
            data: text.as_bytes(),
            depth,
            in_link,
            out: Vec::new(),
            no_single: HashMap::new(),
            no_double: HashMap::new(),
            double_from: HashMap::new(),
            no_code_close: HashMap::new(),
            no_tag_end: None,
            no_comment_end: None,
            brackets: None,
            targets: None,
            search: Search::new(text.as_bytes()),
        }
    }

    fn run(mut self) -> Vec<Inline> {
        if self.depth > self.ctx.max_nesting {
            let text = self.text;
            self.push_text(text);
            return self.out;
        }

        let n = self.data.len();
        let mut i = 0;
        let mut mark = 0;
        while i < n {
            let Some(trigger) = self.trigger(self.data[i]) else {
                i += 1;
                continue;
            };
            self.flush(mark, i);
            match self.dispatch(trigger, i) {
                Some(consumed) => {
                    i += consumed;
                    mark = i;
                }
                None => {
                    mark = i;
                    i += 1;
                }
            }
        }
        self.flush(mark, n);
        self.out
    }

    fn trigger(&self, b: u8) -> Option<Trigger> {
        let ext = self.ctx.extensions;
        let trigger = match b {
            b'*' | b'_' => Trigger::Emphasis,
            b'~' if ext.contains(Extensions::STRIKETHROUGH) => Trigger::Emphasis,
            b'=' if ext.contains(Extensions::HIGHLIGHT) => Trigger::Emphasis,
            b'`' => Trigger::CodeSpan,
            b'\n' => Trigger::LineBreak,
            b'[' => Trigger::Link,
            b'!' => Trigger::Image,
            b'<' => Trigger::Angle,
            b'\\' => Trigger::Escape,
            b'&' => Trigger::Entity,
            b':' if ext.contains(Extensions::AUTOLINK) => Trigger::Url,
            b'@' if ext.contains(Extensions::AUTOLINK) => Trigger::Email,
            b'w' if ext.contains(Extensions::AUTOLINK) => Trigger::Www,
            b'^' if ext.contains(Extensions::SUPERSCRIPT) => Trigger::Superscript,
            b'"' if ext.contains(Extensions::QUOTE) => Trigger::Quote,
            _ => return None,
        };
        Some(trigger)
    }

    fn dispatch(&mut self, trigger: Trigger, i: usize) -> Option<usize> {
        match trigger {
            Trigger::Emphasis => self.emphasis(i),
            Trigger::CodeSpan => self.code_span(i),
            Trigger::LineBreak => self.line_break(i),
            Trigger::Link => self.link(i, false),
            Trigger::Image => {
                if self.data.get(i + 1) != Some(&b'[') {
                    return None;
                }
                self.link(i + 1, true).map(|len| len + 1)
            }
            Trigger::Angle => self.angle(i),
            Trigger::Escape => self.escape(i),
            Trigger::Entity => self.entity(i),
            Trigger::Url => self.autolink_url(i),
            Trigger::Email => self.autolink_email(i),
            Trigger::Www => self.autolink_www(i),
            Trigger::Superscript => self.superscript(i),
            Trigger::Quote => self.quote(i),
        }
    }

    // ------------------------------------------------------------------
    // Output helpers
    // ------------------------------------------------------------------

    fn push_text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(Inline::Text { text }) = self.out.last_mut() {
            text.push_str(s);
        } else {
            self.out.push(Inline::text(s));
        }
    }

    fn flush(&mut self, from: usize, to: usize) {
        if from < to {
            let text = self.text;
            self.push_text(&text[from..to]);
        }
    }

    fn trailing_text_len(&self) -> usize {
        match self.out.last() {
            Some(Inline::Text { text }) => text.len(),
            _ => 0,
        }
    }

    /// Remove `len` bytes that a link reclaimed from the trailing text.
    fn rewind(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(Inline::Text { text }) = self.out.last_mut() {
            let keep = text.len().saturating_sub(len);
            text.truncate(keep);
            if text.is_empty() {
                self.out.pop();
            }
        }
    }

    fn sub(&self, start: usize, end: usize) -> Vec<Inline> {
        Scanner::new(self.ctx, &self.text[start..end], self.depth + 1, self.in_link).run()
    }

    // ------------------------------------------------------------------
    // Emphasis
    // ------------------------------------------------------------------

    fn emphasis(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        let c = data[i];
        let rest = &data[i..];
        let size = rest.len();

        if c == b'_' && i > 0 && self.ctx.extensions.contains(Extensions::NO_INTRA_EMPHASIS) {
            let prev = data[i - 1];
            if !prev.is_ascii_whitespace() && prev != b'>' && prev != b'(' {
                return None;
            }
        }

        // `~` and `=` only come in pairs
        let doubled_only = c == b'~' || c == b'=';

        if size > 2 && rest[1] != c {
            if doubled_only || rest[1].is_ascii_whitespace() {
                return None;
            }
            let start = i + 1;
            let close = self.close_single(start, c)?;
            let children = self.sub(start, close);
            let node = self.single_node(c, children);
            self.out.push(node);
            return Some(close + 1 - i);
        }

        if size > 3 && rest[1] == c && rest[2] != c {
            if rest[2].is_ascii_whitespace() {
                return None;
            }
            let start = i + 2;
            let close = self.close_double(start, c)?;
            let children = self.sub(start, close);
            self.out.push(double_node(c, children));
            return Some(close + 2 - i);
        }

        if size > 4 && rest[1] == c && rest[2] == c && rest[3] != c {
            if doubled_only || rest[3].is_ascii_whitespace() {
                return None;
            }
            return self.triple(i + 3, c).map(|len| len + 3);
        }

        None
    }

    fn single_node(&self, c: u8, children: Vec<Inline>) -> Inline {
        if c == b'_' && self.ctx.extensions.contains(Extensions::UNDERLINE) {
            Inline::Underline { children }
        } else {
            Inline::Emphasis { level: 1, children }
        }
    }

    /// [`Search::find`] with failures remembered per marker.
    fn find(&mut self, from: usize, c: u8) -> Option<usize> {
        if self.no_single.get(&c).is_some_and(|&at| at <= from) {
            return None;
        }
        let (found, clean) = self.search.scan(from, c);
        if found.is_none() {
            let at = clean.max(from);
            self.no_single
                .entry(c)
                .and_modify(|prev| *prev = (*prev).min(at))
                .or_insert(at);
        }
        found
    }

    /// Closing marker of a single-marker span whose content starts at `start`.
    /// The first candidate decides.
    fn close_single(&mut self, start: usize, c: u8) -> Option<usize> {
        let pos = self.find(start, c)?;
        let data = self.data;
        if pos == start || data[pos - 1].is_ascii_whitespace() {
            return None;
        }
        if c == b'_'
            && self.ctx.extensions.contains(Extensions::NO_INTRA_EMPHASIS)
            && data.get(pos + 1).is_some_and(|b| b.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(pos)
    }

    /// First byte of the closing `cc` run for content starting at `start`.
    fn close_double(&mut self, start: usize, c: u8) -> Option<usize> {
        if self.no_double.get(&c).is_some_and(|&at| at <= start) {
            return None;
        }
        let data = self.data;
        let n = data.len();
        let mut i = start;
        let mut skipped = start;
        let mut visited = Vec::new();
        // past the first candidate the outcome no longer depends on `start`
        let (found, clean) = loop {
            if i > start {
                if let Some(&(found, end)) = self.double_from.get(&(c, i)) {
                    break (found, end.max(skipped));
                }
                visited.push(i);
            }
            let (found, skip_end) = self.search.scan(i, c);
            skipped = skipped.max(skip_end);
            let Some(pos) = found else {
                break (None, skipped);
            };
            if pos + 1 < n
                && data[pos + 1] == c
                && pos > start
                && !data[pos - 1].is_ascii_whitespace()
            {
                break (Some(pos), skipped);
            }
            i = pos + 1;
        };

        for at in visited {
            self.double_from.insert((c, at), (found, clean));
        }
        if found.is_none() {
            let at = clean.max(start);
            self.no_double
                .entry(c)
                .and_modify(|prev| *prev = (*prev).min(at))
                .or_insert(at);
        }
        found
    }

    /// Content after a `***` opener. A `***` closer makes a triple span;
    /// a `**` or `*` closer nests the inner span inside the other kind.
    fn triple(&mut self, start: usize, c: u8) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        let pos = self.find(start, c)?;
        if pos == start || data[pos - 1].is_ascii_whitespace() {
            return None;
        }

        if pos + 2 < n && data[pos + 1] == c && data[pos + 2] == c {
            let children = self.sub(start, pos);
            self.out.push(Inline::Emphasis { level: 3, children });
            return Some(pos + 3 - start);
        }

        if pos + 1 < n && data[pos + 1] == c {
            let end = self.close_single(pos + 2, c)?;
            let mut children = vec![double_node(c, self.sub(start, pos))];
            children.extend(self.sub(pos + 2, end));
            let node = self.single_node(c, children);
            self.out.push(node);
            return Some(end + 1 - start);
        }

        let end = self.close_double(pos + 1, c)?;
        let inner = self.sub(start, pos);
        let mut children = vec![self.single_node(c, inner)];
        children.extend(self.sub(pos + 1, end));
        self.out.push(double_node(c, children));
        Some(end + 2 - start)
    }

    // ------------------------------------------------------------------
    // Code, breaks, escapes, entities
    // ------------------------------------------------------------------

    fn code_span(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        let mut ticks = 0;
        while i + ticks < n && data[i + ticks] == b'`' {
            ticks += 1;
        }
        let open_end = i + ticks;

        let known_open = self.no_code_close.get(&ticks).is_some_and(|&at| at <= i);
        let close = if known_open { None } else { backtick_run(data, open_end, ticks) };
        let Some(close) = close else {
            self.no_code_close
                .entry(ticks)
                .and_modify(|prev| *prev = (*prev).min(i))
                .or_insert(i);
            // an unmatched run stays literal as a whole
            let text = self.text;
            self.push_text(&text[i..open_end]);
            return Some(ticks);
        };

        let mut begin = open_end;
        while begin < close && data[begin] == b' ' {
            begin += 1;
        }
        let mut end = close;
        while end > begin && data[end - 1] == b' ' {
            end -= 1;
        }
        self.out.push(Inline::CodeSpan {
            text: self.text[begin..end].to_string(),
        });
        Some(close + ticks - i)
    }

    fn line_break(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        if i < 2 || data[i - 1] != b' ' || data[i - 2] != b' ' {
            return None;
        }
        if let Some(Inline::Text { text }) = self.out.last_mut() {
            let keep = text.trim_end_matches(' ').len();
            text.truncate(keep);
            if text.is_empty() {
                self.out.pop();
            }
        }
        self.out.push(Inline::LineBreak);
        Some(1)
    }

    fn escape(&mut self, i: usize) -> Option<usize> {
        let next = *self.data.get(i + 1)?;
        if !ESCAPABLE.contains(&next) {
            return None;
        }
        let text = self.text;
        self.push_text(&text[i + 1..i + 2]);
        Some(2)
    }

    fn entity(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        let mut end = i + 1;
        if end < n && data[end] == b'#' {
            end += 1;
        }
        let name_start = end;
        while end < n && data[end].is_ascii_alphanumeric() {
            end += 1;
        }
        if end == name_start || end >= n || data[end] != b';' {
            return None;
        }
        self.out.push(Inline::Entity {
            text: self.text[i..=end].to_string(),
        });
        Some(end + 1 - i)
    }

    // ------------------------------------------------------------------
    // Links and images
    // ------------------------------------------------------------------

    fn link(&mut self, i: usize, image: bool) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        let close = self.matching_bracket(i)?;

        if !image
            && self.ctx.extensions.contains(Extensions::FOOTNOTES)
            && data.get(i + 1) == Some(&b'^')
        {
            if close < i + 3 || self.search.byte_in(b']', i + 2, close).is_some() {
                return None;
            }
            let number = self.ctx.footnote_number(&self.text[i + 2..close])?;
            self.out.push(Inline::FootnoteRef { number });
            return Some(close + 1 - i);
        }

        let mut j = close + 1;
        while j < n && is_space(data[j]) {
            j += 1;
        }

        let (href, title, end) = if j < n && data[j] == b'(' {
            self.inline_target(j)?
        } else if j < n && data[j] == b'[' {
            let id_end = self.search.next_byte(b']', j + 1)?;
            let id = if id_end == j + 1 {
                self.shortcut_id(i + 1, close)?
            } else {
                self.text[j + 1..id_end].to_string()
            };
            let target = self.ctx.link_ref(&id)?;
            (target.href.clone(), target.title.clone(), id_end + 1)
        } else {
            let id = self.shortcut_id(i + 1, close)?;
            let target = self.ctx.link_ref(&id)?;
            (target.href.clone(), target.title.clone(), close + 1)
        };
        let href = unescape(&href);

        if image {
            self.out.push(Inline::Image {
                href,
                title,
                alt: self.text[i + 1..close].to_string(),
            });
        } else {
            let children = if close > i + 1 {
                Scanner::new(self.ctx, &self.text[i + 1..close], self.depth + 1, true).run()
            } else {
                Vec::new()
            };
            self.out.push(Inline::Link {
                href,
                title,
                children,
            });
        }
        Some(end - i)
    }

    fn matching_bracket(&mut self, open: usize) -> Option<usize> {
        let data = self.data;
        self.brackets
            .get_or_insert_with(|| bracket_pairs(data))
            .get(&open)
            .copied()
    }

    /// Link text used as a reference id, with line breaks folded to spaces.
    /// Ids never contain `]`, so text holding one has no id.
    fn shortcut_id(&mut self, start: usize, end: usize) -> Option<String> {
        if self.search.byte_in(b']', start, end).is_some() {
            return None;
        }
        let data = self.data;
        if !data[start..end].contains(&b'\n') {
            return Some(self.text[start..end].to_string());
        }
        let mut id = String::with_capacity(end - start);
        for (k, ch) in self.text[start..end].char_indices() {
            if ch != '\n' {
                id.push(ch);
            } else if k == 0 || data[start + k - 1] != b' ' {
                id.push(' ');
            }
        }
        Some(id)
    }

    /// `(href "title")` starting at the `(`; returns the raw href, the title
    /// and the offset past the `)`.
    fn inline_target(&mut self, paren: usize) -> Option<(String, Option<String>, usize)> {
        let data = self.data;
        let n = data.len();
        let mut link_b = paren + 1;
        while link_b < n && is_space(data[link_b]) {
            link_b += 1;
        }

        let stops = self.targets.get_or_insert_with(|| TargetStops::new(data));
        let mut i = stops.href_end(paren)?;

        let mut link_e = i;
        let (mut title_b, mut title_e) = (0, 0);
        if data[i] == b'\'' || data[i] == b'"' {
            title_b = i + 1;
            i = stops.title_close(data, i)?;

            title_e = i - 1;
            while title_e > title_b && is_space(data[title_e]) {
                title_e -= 1;
            }
            if data[title_e] != b'\'' && data[title_e] != b'"' {
                title_b = 0;
                title_e = 0;
                link_e = i;
            }
        }

        while link_e > link_b && is_space(data[link_e - 1]) {
            link_e -= 1;
        }
        if link_b < link_e && data[link_b] == b'<' {
            link_b += 1;
        }
        if link_e > link_b && data[link_e - 1] == b'>' {
            link_e -= 1;
        }

        let href = self.text[link_b..link_e].to_string();
        let title = (title_e > title_b).then(|| unescape(&self.text[title_b..title_e]));
        Some((href, title, i + 1))
    }

    // ------------------------------------------------------------------
    // `<...>`: autolinks and raw HTML
    // ------------------------------------------------------------------

    fn angle(&mut self, i: usize) -> Option<usize> {
        let (len, kind) = self.tag_length(i)?;
        if len <= 2 {
            return None;
        }
        match kind {
            Some(link_kind) => {
                let href = unescape(&self.text[i + 1..i + len - 1]);
                self.out.push(Inline::Autolink { href, link_kind });
            }
            None => self.out.push(Inline::RawHtml {
                text: self.text[i..i + len].to_string(),
            }),
        }
        Some(len)
    }

    fn tag_length(&mut self, start: usize) -> Option<(usize, Option<AutolinkKind>)> {
        let data = &self.data[start..];
        let size = data.len();
        if size < 3 || data[0] != b'<' {
            return None;
        }

        if size > 5
            && data.starts_with(b"<!--")
            && self.no_comment_end.is_none_or(|at| start < at)
        {
            let mut i = 5;
            while i < size && !(data[i - 2] == b'-' && data[i - 1] == b'-' && data[i] == b'>') {
                i += 1;
            }
            if i < size {
                return Some((i + 1, None));
            }
            self.no_comment_end = Some(start);
        }

        let mut i = if data[1] == b'/' { 2 } else { 1 };
        if !data[i].is_ascii_alphanumeric() {
            return None;
        }

        let mut kind = None;
        while i < size
            && (data[i].is_ascii_alphanumeric() || matches!(data[i], b'.' | b'+' | b'-'))
        {
            i += 1;
        }
        if i > 1 && i < size && data[i] == b'@' {
            if let Some(len) = mail_autolink(&data[i..]) {
                return Some((i + len, Some(AutolinkKind::Email)));
            }
        }
        if i > 2 && i < size && data[i] == b':' {
            kind = Some(AutolinkKind::Url);
            i += 1;
        }

        if i >= size {
            kind = None;
        } else if kind.is_some() {
            let target = i;
            while i < size {
                match data[i] {
                    b'\\' => i += 2,
                    b'>' | b'\'' | b'"' | b' ' | b'\n' => break,
                    _ => i += 1,
                }
            }
            if i >= size {
                return None;
            }
            if i > target && data[i] == b'>' {
                return Some((i + 1, kind));
            }
        }

        if self.no_tag_end.is_some_and(|at| at <= start) {
            return None;
        }
        match data[i..].iter().position(|&b| b == b'>') {
            Some(k) => Some((i + k + 1, None)),
            None => {
                self.no_tag_end = Some(start);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Bare autolinks
    // ------------------------------------------------------------------

    fn autolink_url(&mut self, i: usize) -> Option<usize> {
        if self.in_link {
            return None;
        }
        let found = autolink::url(self.data, i, self.trailing_text_len())?;
        let href = self.text[i - found.rewind..i + found.len].to_string();
        self.rewind(found.rewind);
        self.out.push(Inline::Autolink {
            href,
            link_kind: AutolinkKind::Url,
        });
        Some(found.len)
    }

    fn autolink_email(&mut self, i: usize) -> Option<usize> {
        if self.in_link {
            return None;
        }
        let found = autolink::email(self.data, i, self.trailing_text_len())?;
        let href = self.text[i - found.rewind..i + found.len].to_string();
        self.rewind(found.rewind);
        self.out.push(Inline::Autolink {
            href,
            link_kind: AutolinkKind::Email,
        });
        Some(found.len)
    }

    fn autolink_www(&mut self, i: usize) -> Option<usize> {
        if self.in_link {
            return None;
        }
        let len = autolink::www(self.data, i)?;
        let link = &self.text[i..i + len];
        self.out.push(Inline::Link {
            href: format!("http://{link}"),
            title: None,
            children: vec![Inline::text(link)],
        });
        Some(len)
    }

    // ------------------------------------------------------------------
    // Superscript and quotes
    // ------------------------------------------------------------------

    fn superscript(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        if i + 1 >= n {
            return None;
        }

        let (start, end, consumed_to) = if data[i + 1] == b'(' {
            let close = self.find(i + 2, b')')?;
            (i + 2, close, close + 1)
        } else {
            let mut end = i + 1;
            while end < n && !data[end].is_ascii_whitespace() {
                end += 1;
            }
            (i + 1, end, end)
        };
        if end == start {
            return None;
        }

        let children = self.sub(start, end);
        self.out.push(Inline::Superscript { children });
        Some(consumed_to - i)
    }

    fn quote(&mut self, i: usize) -> Option<usize> {
        let data = self.data;
        let n = data.len();
        let mut quotes = 0;
        while i + quotes < n && data[i + quotes] == b'"' {
            quotes += 1;
        }

        let mut from = i + quotes;
        let (close, end) = loop {
            let pos = self.find(from, b'"')?;
            let mut run_end = pos;
            while run_end < n && data[run_end] == b'"' && run_end - pos < quotes {
                run_end += 1;
            }
            if run_end - pos >= quotes {
                break (pos, run_end);
            }
            from = run_end;
        };

        let mut begin = i + quotes;
        while begin < close && data[begin] == b' ' {
            begin += 1;
        }
        let mut content_end = close;
        while content_end > begin && data[content_end - 1] == b' ' {
            content_end -= 1;
        }
        if begin == content_end {
            return None;
        }

        let children = self.sub(begin, content_end);
        self.out.push(Inline::Quote { children });
        Some(end - i)
    }
}

fn double_node(c: u8, children: Vec<Inline>) -> Inline {
    match c {
        b'~' => Inline::Strikethrough { children },
        b'=' => Inline::Highlight { children },
        _ => Inline::Emphasis { level: 2, children },
    }
}

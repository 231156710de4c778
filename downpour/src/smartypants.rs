//! Typographic post-processing of rendered HTML.
//!
//! Straight quotes become curly quotes, dashes and ellipses become their
//! typographic entities, and a few ASCII spellings (`(c)`, `1/2`, ...) turn
//! into symbols. Markup is copied unchanged, as is everything inside
//! `<pre>`, `<code>`, `<kbd>` and the other literal-text elements.

/// Elements whose content is copied verbatim.
const SKIP_TAGS: &[&str] = &["pre", "code", "var", "samp", "kbd", "math", "script", "style"];

/// Spellings of a single quote, raw or as an entity.
const SINGLE_QUOTES: &[&str] = &["'", "&#39;", "&#x27;", "&apos;"];

/// Apply SmartyPants substitutions to an HTML fragment.
pub fn transform(text: &str) -> String {
    let mut pants = Pants {
        text,
        data: text.as_bytes(),
        out: String::with_capacity(text.len() + text.len() / 8),
        in_squote: false,
        in_dquote: false,
    };
    pants.run();
    pants.out
}

fn is_action(b: u8) -> bool {
    matches!(b, b'"' | b'&' | b'\'' | b'(' | b'-' | b'.' | b'1' | b'3' | b'<' | b'\\' | b'`')
}

/// Start of text, whitespace or ASCII punctuation.
fn word_boundary(c: u8) -> bool {
    c == 0 || c.is_ascii_whitespace() || c.is_ascii_punctuation()
}

fn squote_len(data: &[u8]) -> usize {
    SINGLE_QUOTES
        .iter()
        .find(|q| data.starts_with(q.as_bytes()))
        .map_or(0, |q| q.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
}

/// Whether `data` starts with an opening or closing `name` tag.
fn html_tag(data: &[u8], name: &str) -> Option<TagKind> {
    if data.len() < 3 || data[0] != b'<' {
        return None;
    }
    let (kind, start) = if data[1] == b'/' {
        (TagKind::Close, 2)
    } else {
        (TagKind::Open, 1)
    };
    let end = start + name.len();
    if end >= data.len() || !data[start..end].eq_ignore_ascii_case(name.as_bytes()) {
        return None;
    }
    (data[end].is_ascii_whitespace() || data[end] == b'>').then_some(kind)
}

struct Pants<'a> {
    text: &'a str,
    data: &'a [u8],
    out: String,
    in_squote: bool,
    in_dquote: bool,
}

impl Pants<'_> {
    fn run(&mut self) {
        let n = self.data.len();
        let mut i = 0;
        while i < n {
            let org = i;
            while i < n && !is_action(self.data[i]) {
                i += 1;
            }
            self.out.push_str(&self.text[org..i]);
            if i < n {
                let prev = if i > 0 { self.data[i - 1] } else { 0 };
                i += self.action(i, prev);
            }
        }
    }

    /// Handle the action byte at `i`; returns the number of bytes consumed.
    fn action(&mut self, i: usize, prev: u8) -> usize {
        let rest = &self.data[i..];
        match rest[0] {
            b'-' => self.dash(rest),
            b'(' => self.parens(rest),
            b'\'' => 1 + self.squote(prev, i, "'"),
            b'"' => {
                let next = rest.get(1).copied().unwrap_or(0);
                if !self.quote(prev, next, 'd') {
                    self.out.push_str("&quot;");
                }
                1
            }
            b'&' => self.amp(i, prev),
            b'.' => self.period(rest),
            b'1' | b'3' => self.fraction(rest, prev),
            b'<' => self.tag(i),
            b'`' => self.backtick(rest, prev),
            _ => self.escape(rest),
        }
    }

    /// Emit an opening or closing curly quote when the surrounding characters
    /// allow it; `kind` is `d` or `s`.
    fn quote(&mut self, prev: u8, next: u8, kind: char) -> bool {
        let is_open = if kind == 'd' { self.in_dquote } else { self.in_squote };
        if is_open && !word_boundary(next) {
            return false;
        }
        if !is_open && !word_boundary(prev) {
            return false;
        }
        self.out.push('&');
        self.out.push(if is_open { 'r' } else { 'l' });
        self.out.push(kind);
        self.out.push_str("quo;");
        if kind == 'd' {
            self.in_dquote = !is_open;
        } else {
            self.in_squote = !is_open;
        }
        true
    }

    /// A single quote whose last byte sits at `last`. Returns how many bytes
    /// after `last` were consumed as well.
    fn squote(&mut self, prev: u8, last: usize, original: &str) -> usize {
        let text = &self.data[last..];
        if text.len() >= 2 {
            let next_len = squote_len(&text[1..]);
            if next_len > 0 {
                // two single quotes make a double quote
                let next = text.get(1 + next_len).copied().unwrap_or(0);
                if self.quote(prev, next, 'd') {
                    return next_len;
                }
            }

            let t1 = text[1].to_ascii_lowercase();
            if matches!(t1, b's' | b't' | b'm' | b'd')
                && text.get(2).is_none_or(|&c| word_boundary(c))
            {
                self.out.push_str("&rsquo;");
                return 0;
            }
            if let Some(&t2) = text.get(2) {
                let t2 = t2.to_ascii_lowercase();
                if matches!((t1, t2), (b'r', b'e') | (b'l', b'l') | (b'v', b'e'))
                    && text.get(3).is_none_or(|&c| word_boundary(c))
                {
                    self.out.push_str("&rsquo;");
                    return 0;
                }
            }
        }

        let next = text.get(1).copied().unwrap_or(0);
        if !self.quote(prev, next, 's') {
            self.out.push_str(original);
        }
        0
    }

    fn dash(&mut self, rest: &[u8]) -> usize {
        if rest.starts_with(b"---") {
            self.out.push_str("&mdash;");
            3
        } else if rest.starts_with(b"--") {
            self.out.push_str("&ndash;");
            2
        } else {
            self.out.push('-');
            1
        }
    }

    fn parens(&mut self, rest: &[u8]) -> usize {
        let lower = |k: usize| rest.get(k).map(|c| c.to_ascii_lowercase());
        match (lower(1), lower(2), lower(3)) {
            (Some(b'c'), Some(b')'), _) => {
                self.out.push_str("&copy;");
                3
            }
            (Some(b'r'), Some(b')'), _) => {
                self.out.push_str("&reg;");
                3
            }
            (Some(b't'), Some(b'm'), Some(b')')) => {
                self.out.push_str("&trade;");
                4
            }
            _ => {
                self.out.push('(');
                1
            }
        }
    }

    fn amp(&mut self, i: usize, prev: u8) -> usize {
        let rest = &self.data[i..];
        if rest.starts_with(b"&quot;") {
            let next = rest.get(6).copied().unwrap_or(0);
            if self.quote(prev, next, 'd') {
                return 6;
            }
        }

        let len = squote_len(rest);
        if len > 0 {
            let original = &self.text[i..i + len];
            return len + self.squote(prev, i + len - 1, original);
        }

        if rest.starts_with(b"&#0;") {
            return 4;
        }
        self.out.push('&');
        1
    }

    fn period(&mut self, rest: &[u8]) -> usize {
        if rest.starts_with(b"...") {
            self.out.push_str("&hellip;");
            3
        } else if rest.starts_with(b". . .") {
            self.out.push_str("&hellip;");
            5
        } else {
            self.out.push('.');
            1
        }
    }

    fn fraction(&mut self, rest: &[u8], prev: u8) -> usize {
        if word_boundary(prev) && rest.len() >= 3 && rest[1] == b'/' {
            let after = |k: usize| rest.get(k).map(|c| c.to_ascii_lowercase());
            let standalone = rest.len() == 3 || word_boundary(rest[3]);
            let suffixed = |suffix: &[u8]| {
                suffix
                    .iter()
                    .enumerate()
                    .all(|(k, &b)| after(3 + k) == Some(b))
            };
            let entity = match (rest[0], rest[2]) {
                (b'1', b'2') if standalone => Some("&frac12;"),
                (b'1', b'4') if standalone || suffixed(b"th") => Some("&frac14;"),
                (b'3', b'4') if standalone || suffixed(b"ths") => Some("&frac34;"),
                _ => None,
            };
            if let Some(entity) = entity {
                self.out.push_str(entity);
                return 3;
            }
        }
        self.out.push(char::from(rest[0]));
        1
    }

    /// Copy a tag, or a whole literal-text element, unchanged.
    fn tag(&mut self, i: usize) -> usize {
        let rest = &self.data[i..];
        let n = rest.len();

        if rest.starts_with(b"<!--") {
            let end = rest[4..]
                .windows(3)
                .position(|w| w == b"-->")
                .map_or(n, |k| 4 + k + 3);
            self.out.push_str(&self.text[i..i + end]);
            return end;
        }

        let mut j = 0;
        while j < n && rest[j] != b'>' {
            j += 1;
        }

        if let Some(name) = SKIP_TAGS
            .iter()
            .find(|name| html_tag(rest, name) == Some(TagKind::Open))
        {
            loop {
                while j < n && rest[j] != b'<' {
                    j += 1;
                }
                if j == n || html_tag(&rest[j..], name) == Some(TagKind::Close) {
                    break;
                }
                j += 1;
            }
            while j < n && rest[j] != b'>' {
                j += 1;
            }
        }

        let end = (j + 1).min(n);
        self.out.push_str(&self.text[i..i + end]);
        end
    }

    fn backtick(&mut self, rest: &[u8], prev: u8) -> usize {
        if rest.get(1) == Some(&b'`') {
            let next = rest.get(2).copied().unwrap_or(0);
            if self.quote(prev, next, 'd') {
                return 2;
            }
        }
        self.out.push('`');
        1
    }

    fn escape(&mut self, rest: &[u8]) -> usize {
        match rest.get(1) {
            Some(&c @ (b'\\' | b'"' | b'\'' | b'.' | b'-' | b'`')) => {
                self.out.push(char::from(c));
                2
            }
            _ => {
                self.out.push('\\');
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn contractions() {
        assert_eq!(
            transform("<p>They're not for sale.</p>\n"),
            "<p>They&rsquo;re not for sale.</p>\n"
        );
        assert_eq!(
            transform("<p>Well that'll be the day</p>\n"),
            "<p>Well that&rsquo;ll be the day</p>\n"
        );
        assert_eq!(transform("<p>I've seen that</p>\n"), "<p>I&rsquo;ve seen that</p>\n");
        assert_eq!(transform("<p>I'm not kidding</p>\n"), "<p>I&rsquo;m not kidding</p>\n");
        assert_eq!(transform("<p>what'd you say?</p>\n"), "<p>what&rsquo;d you say?</p>\n");
    }

    #[test]
    fn escaped_apostrophes_are_contractions_too() {
        assert_eq!(transform("Isn&#39;t it"), "Isn&rsquo;t it");
        assert_eq!(transform("Isn&#x27;t it"), "Isn&rsquo;t it");
    }

    #[test]
    fn double_quotes() {
        assert_eq!(transform("<p>\"Quoted text\"</p>\n"), "<p>&ldquo;Quoted text&rdquo;</p>\n");
        assert_eq!(
            transform("<p>&quot;Quoted text&quot;</p>\n"),
            "<p>&ldquo;Quoted text&rdquo;</p>\n"
        );
        assert_eq!(transform("``tex style''"), "&ldquo;tex style&rdquo;");
    }

    #[test]
    fn single_quotes() {
        assert_eq!(transform("'hello' there"), "&lsquo;hello&rsquo; there");
    }

    #[test]
    fn dashes_ellipses_symbols() {
        assert_eq!(transform("a -- b --- c - d"), "a &ndash; b &mdash; c - d");
        assert_eq!(transform("wait... . . ."), "wait&hellip; &hellip;");
        assert_eq!(transform("(c) (R) (tm) (x)"), "&copy; &reg; &trade; (x)");
    }

    #[test]
    fn fractions_only_standalone() {
        assert_eq!(transform("1/2 1/4 3/4"), "&frac12; &frac14; &frac34;");
        assert_eq!(transform("11/2 1/25"), "11/2 1/25");
        assert_eq!(transform("1/4th"), "&frac14;th");
    }

    #[test]
    fn markup_and_code_are_untouched() {
        assert_eq!(
            transform("<a title=\"x--y\">a--b</a>"),
            "<a title=\"x--y\">a&ndash;b</a>"
        );
        assert_eq!(
            transform("<pre><code>it's -- \"raw\"</code></pre> it's"),
            "<pre><code>it's -- \"raw\"</code></pre> it&rsquo;s"
        );
        assert_eq!(transform("<!-- a -- b --> --"), "<!-- a -- b --> &ndash;");
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(transform(r"\-\- \q"), r"-- \q");
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(transform("naïve — \"café\""), "naïve — &ldquo;café&rdquo;");
    }
}

//! Bare URL, `www.` and e-mail detection for the `AUTOLINK` extension.
//!
//! All offsets are absolute indexes into the inline buffer. A match may
//! "rewind" over text that was already emitted (the `http` before `://`, the
//! local part before `@`); the caller removes those bytes from its trailing
//! text node.

/// A match found around a trigger character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Found {
    /// Bytes before the trigger that belong to the link.
    pub rewind: usize,
    /// Bytes from the trigger (inclusive) to the end of the link.
    pub len: usize,
}

const SAFE_PREFIXES: &[&str] = &["http://", "https://", "/", "#", "ftp://", "mailto:"];

/// Whether `data` starts with a known-safe scheme followed by an
/// alphanumeric character.
pub(crate) fn is_safe_link(data: &[u8]) -> bool {
    SAFE_PREFIXES.iter().any(|prefix| {
        let len = prefix.len();
        data.len() > len
            && data[..len].eq_ignore_ascii_case(prefix.as_bytes())
            && data[len].is_ascii_alphanumeric()
    })
}

/// `scheme://domain/path` with the trigger at the `:`.
pub(crate) fn url(data: &[u8], pos: usize, max_rewind: usize) -> Option<Found> {
    let tail = &data[pos..];
    if tail.len() < 4 || tail[1] != b'/' || tail[2] != b'/' {
        return None;
    }

    let mut rewind = 0;
    while rewind < max_rewind && rewind < pos && data[pos - 1 - rewind].is_ascii_alphabetic() {
        rewind += 1;
    }
    if !is_safe_link(&data[pos - rewind..]) {
        return None;
    }

    let domain = check_domain(&tail[3..]);
    if domain == 0 {
        return None;
    }
    let mut end = 3 + domain;
    while end < tail.len() && !tail[end].is_ascii_whitespace() {
        end += 1;
    }

    let len = trim_delimiters(tail, end);
    (len > 0).then_some(Found { rewind, len })
}

/// `local@domain.tld` with the trigger at the `@`.
pub(crate) fn email(data: &[u8], pos: usize, max_rewind: usize) -> Option<Found> {
    let mut rewind = 0;
    while rewind < max_rewind && rewind < pos {
        let c = data[pos - 1 - rewind];
        if c.is_ascii_alphanumeric() || matches!(c, b'.' | b'+' | b'-' | b'_') {
            rewind += 1;
        } else {
            break;
        }
    }
    if rewind == 0 {
        return None;
    }

    let tail = &data[pos..];
    let (mut at_signs, mut dots) = (0, 0);
    let mut end = 0;
    while end < tail.len() {
        let c = tail[end];
        if c.is_ascii_alphanumeric() {
            // domain character
        } else if c == b'@' {
            at_signs += 1;
        } else if c == b'.' && end + 1 < tail.len() {
            dots += 1;
        } else if c != b'-' && c != b'_' {
            break;
        }
        end += 1;
    }

    if end < 2 || at_signs != 1 || dots == 0 || !tail[end - 1].is_ascii_alphabetic() {
        return None;
    }

    let len = trim_delimiters(tail, end);
    (len > 0).then_some(Found { rewind, len })
}

/// `www.domain/path` with the trigger at the first `w`.
pub(crate) fn www(data: &[u8], pos: usize) -> Option<usize> {
    if pos > 0 {
        let prev = data[pos - 1];
        if !prev.is_ascii_punctuation() && !prev.is_ascii_whitespace() {
            return None;
        }
    }

    let tail = &data[pos..];
    if tail.len() < 4 || !tail.starts_with(b"www.") {
        return None;
    }

    let domain = check_domain(tail);
    if domain == 0 {
        return None;
    }
    let mut end = domain;
    while end < tail.len() && !tail[end].is_ascii_whitespace() {
        end += 1;
    }

    let len = trim_delimiters(tail, end);
    (len > 0).then_some(len)
}

/// Length of a plausible domain (at least one dot) at the start of `data`.
fn check_domain(data: &[u8]) -> usize {
    if data.is_empty() || !data[0].is_ascii_alphanumeric() {
        return 0;
    }
    let mut dots = 0;
    let mut i = 1;
    while i + 1 < data.len() {
        let c = data[i];
        if c == b'.' || c == b':' {
            dots += 1;
        } else if !c.is_ascii_alphanumeric() && c != b'-' {
            break;
        }
        i += 1;
    }
    if dots > 0 { i } else { 0 }
}

/// Drop trailing prose punctuation, entity tails and unbalanced closing
/// brackets from a link candidate of length `end`.
fn trim_delimiters(data: &[u8], mut end: usize) -> usize {
    if let Some(lt) = data[..end].iter().position(|&b| b == b'<') {
        end = lt;
    }

    while end > 0 {
        let last = data[end - 1];
        if matches!(last, b'?' | b'!' | b'.' | b',' | b':') {
            end -= 1;
        } else if last == b';' {
            // "&amp;" style entity at the very end
            if end < 2 {
                end -= 1;
                continue;
            }
            let mut start = end - 2;
            while start > 0 && data[start].is_ascii_alphabetic() {
                start -= 1;
            }
            if start < end - 2 && data[start] == b'&' {
                end = start;
            } else {
                end -= 1;
            }
        } else {
            break;
        }
    }

    if end == 0 {
        return 0;
    }

    let close = data[end - 1];
    let open = match close {
        b'"' => b'"',
        b'\'' => b'\'',
        b')' => b'(',
        b']' => b'[',
        b'}' => b'{',
        _ => return end,
    };

    let (mut opening, mut closing) = (0, 0);
    for &c in &data[..end] {
        if c == open {
            opening += 1;
        } else if c == close {
            closing += 1;
        }
    }
    if opening != closing {
        end -= 1;
    }
    end
}

//! Extension and render flag sets.
//!
//! Both sets are plain bit-sets fixed when a [`Markdown`](crate::Markdown)
//! pipeline is built. Raw integers coming from configuration go through
//! [`Extensions::from_bits_checked`] / [`RenderFlags::from_bits_checked`] so
//! unknown bits are reported instead of silently dropped.

use bitflags::bitflags;

use crate::error::{Error, FlagKind};

bitflags! {
    /// Optional syntax accepted by the parser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Extensions: u32 {
        const TABLES = 1 << 0;
        const FENCED_CODE = 1 << 1;
        const FOOTNOTES = 1 << 2;
        const AUTOLINK = 1 << 3;
        const STRIKETHROUGH = 1 << 4;
        const UNDERLINE = 1 << 5;
        const HIGHLIGHT = 1 << 6;
        const QUOTE = 1 << 7;
        const SUPERSCRIPT = 1 << 8;
        const NO_INTRA_EMPHASIS = 1 << 11;
        const SPACE_HEADERS = 1 << 12;
    }
}

bitflags! {
    /// Output-shaping options for the HTML renderer and the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        const SKIP_HTML = 1 << 0;
        const ESCAPE = 1 << 1;
        const HARD_WRAP = 1 << 3;
        const USE_XHTML = 1 << 4;
        const SMARTYPANTS = 1 << 8;
    }
}

impl Extensions {
    /// Build from a raw bitmask, rejecting bits that name no extension.
    pub fn from_bits_checked(bits: u32) -> Result<Self, Error> {
        Self::from_bits(bits).ok_or(Error::UnknownFlags {
            kind: FlagKind::Extension,
            bits: bits & !Self::all().bits(),
        })
    }

    /// Build from names such as `"fenced-code"` or `"NO_INTRA_EMPHASIS"`.
    pub fn from_names<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for name in names {
            let name = name.as_ref();
            set |= Self::from_name(&normalize_name(name)).ok_or_else(|| Error::UnknownFlagName {
                kind: FlagKind::Extension,
                name: name.to_string(),
            })?;
        }
        Ok(set)
    }
}

impl RenderFlags {
    /// Build from a raw bitmask, rejecting bits that name no render option.
    pub fn from_bits_checked(bits: u32) -> Result<Self, Error> {
        Self::from_bits(bits).ok_or(Error::UnknownFlags {
            kind: FlagKind::Render,
            bits: bits & !Self::all().bits(),
        })
    }

    /// Build from names such as `"hard-wrap"` or `"SMARTYPANTS"`.
    pub fn from_names<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for name in names {
            let name = name.as_ref();
            let normalized = normalize_name(name);
            // "escape-html" and "xhtml" are the spellings used by most front ends
            let flag = match normalized.as_str() {
                "ESCAPE_HTML" => Some(Self::ESCAPE),
                "XHTML" => Some(Self::USE_XHTML),
                other => Self::from_name(other),
            };
            set |= flag.ok_or_else(|| Error::UnknownFlagName {
                kind: FlagKind::Render,
                name: name.to_string(),
            })?;
        }
        Ok(set)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('-', "_").to_ascii_uppercase()
}

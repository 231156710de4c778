//! `downpour` — a lenient, linear-time Markdown compiler.
//!
//! Markdown goes through two stages: a parser that builds a [`Document`]
//! tree, and a [`Renderer`] that turns the tree into output through one
//! callback per node. [`HtmlRenderer`] produces HTML; any other format is a
//! `Renderer` implementation away. An optional [`smartypants`] pass rewrites
//! quotes, dashes and ellipses into typographic entities.
//!
//! Parsing never fails. Malformed input degrades to literal text, and every
//! scan is bounded so that adversarial input still renders in linear time.
//!
//! # Quick start
//!
//! ```
//! use downpour::{Extensions, RenderFlags};
//!
//! let html = downpour::html(
//!     "# Hello\n\nSome *emphasis*.\n",
//!     Extensions::empty(),
//!     RenderFlags::empty(),
//! );
//! assert_eq!(html, "<h1>Hello</h1>\n\n<p>Some <em>emphasis</em>.</p>\n");
//! ```
//!
//! Extensions enable syntax beyond the Markdown core:
//!
//! ```
//! use downpour::{Extensions, HtmlRenderer, Markdown, RenderFlags};
//!
//! let mut md =
//!     Markdown::new(HtmlRenderer::new(RenderFlags::empty()), Extensions::STRIKETHROUGH).unwrap();
//! assert_eq!(md.render("~~gone~~\n"), "<p><del>gone</del></p>\n");
//! ```

mod autolink;
mod blocks;
pub mod error;
pub mod flags;
mod inline;
pub mod markdown;
pub mod parse;
pub mod render_html;
#[cfg(feature = "terminal")]
pub mod render_term;
pub mod renderer;
pub mod smartypants;
pub mod types;

pub use error::{Error, FlagKind};
pub use flags::{Extensions, RenderFlags};
pub use markdown::Markdown;
pub use parse::{DEFAULT_MAX_NESTING, parse, parse_with_nesting};
pub use render_html::HtmlRenderer;
#[cfg(feature = "terminal")]
pub use render_term::TerminalRenderer;
pub use renderer::{Capabilities, Renderer, render_document};
pub use types::*;

/// Render `text` to HTML in one call.
pub fn html(text: &str, extensions: Extensions, flags: RenderFlags) -> String {
    let doc = parse(text, extensions);
    let out = render_document(&doc, &mut HtmlRenderer::new(flags));
    if flags.contains(RenderFlags::SMARTYPANTS) {
        smartypants::transform(&out)
    } else {
        out
    }
}

//! The configured pipeline: parse, render, and the optional SmartyPants pass.

use crate::error::Error;
use crate::flags::{Extensions, RenderFlags};
use crate::parse::{DEFAULT_MAX_NESTING, parse_with_nesting};
use crate::renderer::{Capabilities, Renderer, render_document};
use crate::smartypants;
use crate::types::Document;

/// A renderer bound to a set of parser extensions.
///
/// The pipeline holds no per-document state; one instance can render any
/// number of documents in sequence.
#[derive(Debug)]
pub struct Markdown<R: Renderer> {
    renderer: R,
    extensions: Extensions,
    max_nesting: usize,
}

impl<R: Renderer> Markdown<R> {
    /// Bind `renderer` to `extensions`.
    ///
    /// Fails when an enabled extension needs a callback the renderer does not
    /// declare: tables cannot be rendered without `table_row` and
    /// `table_cell`.
    pub fn new(renderer: R, extensions: Extensions) -> Result<Self, Error> {
        let caps = renderer.capabilities();
        if extensions.contains(Extensions::TABLES) {
            for (cap, name) in [
                (Capabilities::TABLE_ROW, "table_row"),
                (Capabilities::TABLE_CELL, "table_cell"),
            ] {
                if !caps.contains(cap) {
                    return Err(Error::MissingCapability {
                        extension: "TABLES",
                        capability: name,
                    });
                }
            }
        }

        log::debug!(
            "Markdown pipeline: extensions={:?} render={:?}",
            extensions,
            renderer.render_flags()
        );

        Ok(Self {
            renderer,
            extensions,
            max_nesting: DEFAULT_MAX_NESTING,
        })
    }

    /// Limit how deeply blocks and spans may nest before degrading to text.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn extensions(&self) -> Extensions {
        self.extensions
    }

    pub fn render_flags(&self) -> RenderFlags {
        self.renderer.render_flags()
    }

    /// Parse without rendering.
    pub fn parse(&self, text: &str) -> Document {
        parse_with_nesting(text, self.extensions, self.max_nesting)
    }

    /// Parse and render `text`.
    pub fn render(&mut self, text: &str) -> String {
        let doc = self.parse(text);
        let out = render_document(&doc, &mut self.renderer);
        if self.renderer.render_flags().contains(RenderFlags::SMARTYPANTS) {
            smartypants::transform(&out)
        } else {
            out
        }
    }

    /// Like [`Markdown::render`], for byte input that must be UTF-8.
    pub fn render_bytes(&mut self, bytes: &[u8]) -> Result<String, Error> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.render(text))
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }
}

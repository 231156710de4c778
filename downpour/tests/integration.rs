//! End-to-end rendering: Markdown in, HTML (or custom output) out.

use std::fs;
use std::path::Path;

use downpour::{
    Alignment, AutolinkKind, Extensions, HtmlRenderer, ListFlags, Markdown, RenderFlags, Renderer,
};
use pretty_assertions::assert_eq;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn render(text: &str) -> String {
    downpour::html(text, Extensions::empty(), RenderFlags::empty())
}

fn render_ext(text: &str, extensions: Extensions) -> String {
    downpour::html(text, extensions, RenderFlags::empty())
}

fn render_flags(text: &str, flags: RenderFlags) -> String {
    downpour::html(text, Extensions::empty(), flags)
}

/// Collapse whitespace between tags so layout differences do not matter.
fn normalize_html(html: &str) -> String {
    html.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("> <", "><")
}

// ------------------------------------------------------------------
// SmartyPants
// ------------------------------------------------------------------

#[test]
fn smartypants_contractions_and_quotes() {
    let cases = [
        ("<p>They're not for sale.</p>\n", "<p>They&rsquo;re not for sale.</p>\n"),
        ("<p>Well that'll be the day</p>\n", "<p>Well that&rsquo;ll be the day</p>\n"),
        ("<p>\"Quoted text\"</p>\n", "<p>&ldquo;Quoted text&rdquo;</p>\n"),
        (
            "<p>I've been meaning to tell you ..</p>\n",
            "<p>I&rsquo;ve been meaning to tell you ..</p>\n",
        ),
        ("<p>I'm not kidding</p>\n", "<p>I&rsquo;m not kidding</p>\n"),
        ("<p>what'd you say?</p>\n", "<p>what&rsquo;d you say?</p>\n"),
    ];
    for (input, expected) in cases {
        assert_eq!(downpour::smartypants::transform(input), expected, "input {input:?}");
    }
}

#[test]
fn smartypants_flag_applies_to_rendered_html() {
    assert_eq!(
        render_flags("\"Quoted\" -- isn't it...\n", RenderFlags::SMARTYPANTS),
        "<p>&ldquo;Quoted&rdquo; &ndash; isn&rsquo;t it&hellip;</p>\n"
    );
}

// ------------------------------------------------------------------
// HTML render flags
// ------------------------------------------------------------------

#[test]
fn escape_html_flag() {
    let source = "\nThrough <em>NO</em> <script>DOUBLE NO</script>\n\n<script>BAD</script>\n\n<img src=\"/favicon.ico\" />\n";
    let expected = "<p>Through &lt;em&gt;NO&lt;/em&gt; &lt;script&gt;DOUBLE NO&lt;/script&gt;</p>\n\n\
                    <p>&lt;script&gt;BAD&lt;/script&gt;</p>\n\n\
                    <p>&lt;img src=&quot;/favicon.ico&quot; /&gt;</p>\n";
    assert_eq!(
        normalize_html(&render_flags(source, RenderFlags::ESCAPE)),
        normalize_html(expected)
    );
}

#[test]
fn skip_html_flag() {
    assert_eq!(
        render_flags("Through <em>NO</em> <script>DOUBLE NO</script>", RenderFlags::SKIP_HTML),
        "<p>Through NO DOUBLE NO</p>\n"
    );
    assert_eq!(
        render_flags("Lorem,  \nipsum\n", RenderFlags::SKIP_HTML),
        "<p>Lorem,<br>\nipsum</p>\n"
    );
}

#[test]
fn hard_wrap_flag() {
    let source = "\nHello world,\nthis is just a simple test\n\nWith hard wraps\nand other *things*.";
    let html = render_flags(source, RenderFlags::HARD_WRAP);
    assert!(html.contains("<br>"), "got {html}");
    assert!(!render(source).contains("<br>"));
}

#[test]
fn xhtml_flag() {
    assert_eq!(
        render_flags("a  \nb\n\n***\n", RenderFlags::USE_XHTML),
        "<p>a<br/>\nb</p>\n\n<hr/>\n"
    );
}

// ------------------------------------------------------------------
// Parser
// ------------------------------------------------------------------

#[test]
fn one_liners() {
    init_logger();
    assert_eq!(render("Hello World."), "<p>Hello World.</p>\n");
    assert_eq!(render("_Hello World_!"), "<p><em>Hello World</em>!</p>\n");
}

#[test]
fn emphasis_at_word_edges() {
    assert_eq!(
        render("_start _ foo_bar bar_baz _ end_ *italic* **bold** <a>_blah_</a>"),
        "<p>_start _ foo<em>bar bar</em>baz _ end_ <em>italic</em> <strong>bold</strong> <a><em>blah</em></a></p>\n"
    );
    assert_eq!(
        render("Run 'rake radiant:extensions:rbac_base:migrate'"),
        "<p>Run &#39;rake radiant:extensions:rbac_base:migrate&#39;</p>\n"
    );
}

#[test]
fn urls_are_not_double_escaped() {
    assert_eq!(
        render("[Page 2](/search?query=Markdown+Test&page=2)"),
        "<p><a href=\"/search?query=Markdown+Test&amp;page=2\">Page 2</a></p>\n"
    );
}

#[test]
fn html_blocks() {
    assert_eq!(
        render("before\n\n<div>\n  foo\n</div>\n\nafter"),
        "<p>before</p>\n\n<div>\n  foo\n</div>\n\n<p>after</p>\n"
    );
    assert_eq!(
        render("Para 1\n\n<div><pre>HTML block\n</pre></div>\n\nPara 2 [Link](#anchor)"),
        "<p>Para 1</p>\n\n<div><pre>HTML block\n</pre></div>\n\n<p>Para 2 <a href=\"#anchor\">Link</a></p>\n"
    );
    assert_eq!(
        render("Things to watch out for\n\n<ul>\n<li>Blah</li>\n</ul>\n"),
        "<p>Things to watch out for</p>\n\n<ul>\n<li>Blah</li>\n</ul>\n"
    );
}

#[test]
fn block_quote_preceded_by_spaces() {
    assert_eq!(
        render("A wise man once said:\n\n > Isn't it wonderful just to be alive.\n"),
        "<p>A wise man once said:</p>\n\n<blockquote>\n<p>Isn&#39;t it wonderful just to be alive.</p>\n</blockquote>\n"
    );
}

#[test]
fn headers_keep_trailing_space() {
    assert_eq!(
        render("The Ant-Sugar Tales \n=================== \n\nBy Candice Yellowflower   \n"),
        "<h1>The Ant-Sugar Tales </h1>\n\n<p>By Candice Yellowflower   </p>\n"
    );
}

#[test]
fn intra_word_emphasis() {
    assert_eq!(render("foo_bar_baz"), "<p>foo<em>bar</em>baz</p>\n");
    assert_eq!(
        render_ext("foo_bar_baz", Extensions::NO_INTRA_EMPHASIS),
        "<p>foo_bar_baz</p>\n"
    );
}

#[test]
fn tags_with_dashes_and_underscores() {
    assert_eq!(
        render("foo <asdf-qwerty>bar</asdf-qwerty> and <a_b>baz</a_b>"),
        "<p>foo <asdf-qwerty>bar</asdf-qwerty> and <a_b>baz</a_b></p>\n"
    );
}

#[test]
fn no_links_in_code_blocks() {
    assert_eq!(
        render("    This is a code block\n    This is a link [[1]] inside\n"),
        "<pre><code>This is a code block\nThis is a link [[1]] inside\n</code></pre>\n"
    );
}

#[test]
fn bare_autolinks() {
    assert_eq!(
        render_ext("http://axr.vg/", Extensions::AUTOLINK),
        "<p><a href=\"http://axr.vg/\">http://axr.vg/</a></p>\n"
    );
    assert_eq!(
        render_ext(
            "Japan: http://www.abc.net.au/news/events/japan-quake-2011/beforeafter.htm (yes, japan)",
            Extensions::AUTOLINK
        ),
        "<p>Japan: <a href=\"http://www.abc.net.au/news/events/japan-quake-2011/beforeafter.htm\">\
         http://www.abc.net.au/news/events/japan-quake-2011/beforeafter.htm</a> (yes, japan)</p>\n"
    );
    assert_eq!(
        render_ext(
            "This a stupid link: https://github.com/rtomayko/tilt/issues?milestone=1&state=open",
            Extensions::AUTOLINK
        ),
        "<p>This a stupid link: <a href=\"https://github.com/rtomayko/tilt/issues?milestone=1&amp;state=open\">\
         https://github.com/rtomayko/tilt/issues?milestone=1&amp;state=open</a></p>\n"
    );
}

#[test]
fn header_hash_runs_do_not_loop() {
    assert_eq!(render("######\n#Body#\n######\n"), "<h1>Body</h1>\n");
}

#[test]
fn extensions_gate_their_syntax() {
    let table = " aaa | bbbb\n-----|------\nhello|sailor\n";
    assert!(!render(table).contains("<table"));
    assert!(render_ext(table, Extensions::TABLES).contains("<table"));

    let strike = "this is ~some~ striked ~~text~~";
    assert!(!render(strike).contains("<del"));
    assert!(render_ext(strike, Extensions::STRIKETHROUGH).contains("<del"));

    let fenced = "\nThis is a simple test\n\n~~~~~\nThis is some awesome code\n    with tabs and shit\n~~~\n";
    assert!(!render(fenced).contains("<code"));
    assert!(render_ext(fenced, Extensions::FENCED_CODE).contains("<code"));

    assert!(!render_ext("#123 a header yes\n", Extensions::SPACE_HEADERS).contains("<h1>"));
    assert!(render("#123 a header yes\n").contains("<h1>"));
}

#[test]
fn links_inside_headers() {
    assert_eq!(
        render("### Hello [GitHub](http://github.com)"),
        "<h3>Hello <a href=\"http://github.com\">GitHub</a></h3>\n"
    );
}

#[test]
fn footnotes_render_after_the_body() {
    let html = render_ext("Text[^a].\n\n[^a]: The note.\n", Extensions::FOOTNOTES);
    assert_eq!(
        html,
        "<p>Text<sup id=\"fnref1\"><a href=\"#fn1\" rel=\"footnote\">1</a></sup>.</p>\n\n\
         <div class=\"footnotes\">\n<hr>\n<ol>\n\n\
         <li id=\"fn1\">\n<p>The note.&nbsp;<a href=\"#fnref1\" rev=\"footnote\">&#8617;</a></p>\n</li>\n\n\
         </ol>\n</div>\n"
    );
}

#[test]
fn table_alignment() {
    assert_eq!(
        render_ext("| a | b |\n|:--|--:|\n| 1 | 2 |\n", Extensions::TABLES),
        "<table>\n<thead>\n<tr>\n<th style=\"text-align: left\">a</th>\n<th style=\"text-align: right\">b</th>\n</tr>\n</thead>\n\
         <tbody>\n<tr>\n<td style=\"text-align: left\">1</td>\n<td style=\"text-align: right\">2</td>\n</tr>\n</tbody>\n</table>\n"
    );
}

#[test]
fn invalid_utf8_input_is_rejected() {
    let mut md = Markdown::new(HtmlRenderer::default(), Extensions::empty()).unwrap();
    let err = md.render_bytes(b"\xc3\x28").unwrap_err();
    assert_eq!(err.to_string(), "Input is not valid UTF-8 (valid up to byte 0)");
}

// ------------------------------------------------------------------
// Custom block renderers
// ------------------------------------------------------------------

struct BlockRenderer {
    html: HtmlRenderer,
}

impl Renderer for BlockRenderer {
    fn base(&self) -> Option<&dyn Renderer> {
        Some(&self.html)
    }
    fn base_mut(&mut self) -> Option<&mut dyn Renderer> {
        Some(&mut self.html)
    }
    fn block_code(&mut self, ob: &mut String, text: &str, lang: Option<&str>) {
        ob.push_str(&format!("<pre class=\"unique-{}\">{text}</pre>", lang.unwrap_or_default()));
    }
    fn block_quote(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("<blockquote cite=\"my\">\n{content}</blockquote>"));
    }
    fn block_html(&mut self, ob: &mut String, text: &str) {
        ob.push_str(&format!("This is html: {text}"));
    }
    fn header(&mut self, ob: &mut String, content: &str, level: u8) {
        ob.push_str(&format!("<h{level} class=\"custom\">{content}</h{level}>"));
    }
    fn hrule(&mut self, ob: &mut String) {
        ob.push_str("HR\n");
    }
    fn list(&mut self, ob: &mut String, content: &str, _flags: ListFlags) {
        ob.push_str(&format!("LIST\n{content}"));
    }
    fn list_item(&mut self, ob: &mut String, content: &str, _flags: ListFlags) {
        ob.push_str(&format!("[LIST ITEM:{}]\n", content.trim()));
    }
    fn footnotes(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[FOOT: {content}]"));
    }
    fn footnote_def(&mut self, ob: &mut String, content: &str, number: usize) {
        ob.push_str(&format!("[DEF: text={content}, num={number}"));
    }
}

fn block_renderer() -> Markdown<BlockRenderer> {
    let renderer = BlockRenderer {
        html: HtmlRenderer::default(),
    };
    Markdown::new(renderer, Extensions::FENCED_CODE | Extensions::FOOTNOTES).unwrap()
}

#[test]
fn custom_block_code() {
    let out = block_renderer().render("```python\ndef foo():\n   pass\n```");
    assert!(out.contains("unique-python"), "got {out}");
}

#[test]
fn custom_block_quote() {
    assert_eq!(
        block_renderer().render("A wise man once said:\n\n > Isn't it wonderful just to be alive.\n"),
        "<p>A wise man once said:</p>\n<blockquote cite=\"my\">\n<p>Isn&#39;t it wonderful just to be alive.</p>\n</blockquote>"
    );
}

#[test]
fn custom_raw_block() {
    assert_eq!(block_renderer().render("<p>raw</p>\n"), "This is html: <p>raw</p>\n");
}

#[test]
fn custom_header_hrule_and_list() {
    let mut md = block_renderer();
    assert_eq!(md.render("custom\n======\n"), "<h1 class=\"custom\">custom</h1>");
    assert_eq!(md.render("* * *"), "HR\n");
    assert_eq!(md.render("* one\n* two"), "LIST\n[LIST ITEM:one]\n[LIST ITEM:two]\n");
}

#[test]
fn custom_footnotes() {
    let out = block_renderer().render("line1 [^1]\n\n [^1]: test1\n       test2\n");
    assert!(out.contains("FOOT"), "got {out}");
    assert!(out.contains("DEF"), "got {out}");
}

struct TableRenderer;

impl Renderer for TableRenderer {
    fn table(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[TABLE content:{content}]"));
    }
    fn table_header(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[HEADER: {content}]\n"));
    }
    fn table_body(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[BODY: {content}]"));
    }
    fn table_row(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[ROW:{content}]"));
    }
    fn table_cell(&mut self, ob: &mut String, content: &str, _align: Alignment, _header: bool) {
        ob.push_str(&format!("<CELL>{content}</CELL>"));
    }
}

#[test]
fn custom_table() {
    let mut md = Markdown::new(TableRenderer, Extensions::FENCED_CODE | Extensions::TABLES).unwrap();
    assert_eq!(
        md.render("name | age\n-----|----\nMike | 30"),
        "[TABLE content:[HEADER: [ROW:<CELL>name</CELL><CELL>age</CELL>]]\n[BODY: [ROW:<CELL>Mike</CELL><CELL>30</CELL>]]]"
    );
}

#[test]
fn custom_paragraph() {
    struct Paragraphs(HtmlRenderer);
    impl Renderer for Paragraphs {
        fn base(&self) -> Option<&dyn Renderer> {
            Some(&self.0)
        }
        fn base_mut(&mut self) -> Option<&mut dyn Renderer> {
            Some(&mut self.0)
        }
        fn paragraph(&mut self, ob: &mut String, content: &str) {
            ob.push_str(&format!("PARAGRAPH:{content}\n"));
        }
    }

    let mut md = Markdown::new(Paragraphs(HtmlRenderer::default()), Extensions::FENCED_CODE).unwrap();
    assert_eq!(md.render("one\n\ntwo"), "PARAGRAPH:one\nPARAGRAPH:two\n");
}

// ------------------------------------------------------------------
// Custom span renderers
// ------------------------------------------------------------------

struct SpanRenderer {
    html: HtmlRenderer,
}

impl Renderer for SpanRenderer {
    fn base(&self) -> Option<&dyn Renderer> {
        Some(&self.html)
    }
    fn base_mut(&mut self) -> Option<&mut dyn Renderer> {
        Some(&mut self.html)
    }
    fn autolink(&mut self, ob: &mut String, link: &str, kind: AutolinkKind) {
        ob.push_str(&format!("[AUTOLINK] link={link}, type={kind:?}"));
    }
    fn codespan(&mut self, ob: &mut String, text: &str) {
        ob.push_str(&format!("[CODESPAN] {text}"));
    }
    fn double_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[DOUBLE EMPHASIS] {content}"));
    }
    fn emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[EMPHASIS] {content}"));
    }
    fn underline(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[UNDERLINE] {content}"));
    }
    fn highlight(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[HIGHLIGHT] {content}"));
    }
    fn quote(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[QUOTE] {content}"));
    }
    fn image(&mut self, ob: &mut String, link: &str, title: Option<&str>, alt: &str) {
        ob.push_str(&format!("[IMG] link={link}, title={title:?}, alt={alt}"));
    }
    fn linebreak(&mut self, ob: &mut String) {
        ob.push_str("[LB]");
    }
    fn link(&mut self, ob: &mut String, content: &str, link: &str, title: Option<&str>) {
        ob.push_str(&format!("link={link}, title={}, cont={content}", title.unwrap_or("None")));
    }
    fn raw_html(&mut self, ob: &mut String, text: &str) {
        ob.push_str(&format!("[RAWHTML]{text}"));
    }
    fn triple_emphasis(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[STRONG] {content}"));
    }
    fn strikethrough(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[DEL] {content}"));
    }
    fn superscript(&mut self, ob: &mut String, content: &str) {
        ob.push_str(&format!("[SUP] {content}"));
    }
    fn footnote_ref(&mut self, ob: &mut String, number: usize) {
        ob.push_str(&format!("[FOOTNOTE_REF] num={number}"));
    }
}

fn span(text: &str) -> String {
    let renderer = SpanRenderer {
        html: HtmlRenderer::default(),
    };
    let extensions = Extensions::AUTOLINK
        | Extensions::UNDERLINE
        | Extensions::HIGHLIGHT
        | Extensions::QUOTE
        | Extensions::STRIKETHROUGH
        | Extensions::SUPERSCRIPT
        | Extensions::FOOTNOTES;
    Markdown::new(renderer, extensions).unwrap().render(text)
}

#[test]
fn custom_span_callbacks() {
    let cases = [
        ("<https://github.com/>", "[AUTOLINK] link=https://github.com/, type=Url"),
        ("code `print 1`", "code [CODESPAN] print 1"),
        ("*emphasis*", "[EMPHASIS] emphasis"),
        ("**emphasis**", "[DOUBLE EMPHASIS] emphasis"),
        ("_line_", "[UNDERLINE] line"),
        ("==line==", "[HIGHLIGHT] line"),
        ("\"spanquote\"", "[QUOTE] spanquote"),
        ("![alt-string](path)", "[IMG] link=path, title=None, alt=alt-string"),
        ("test    \ntest\n", "test[LB]test"),
        (
            "[span link](https://github.com/ \"github\")",
            "link=https://github.com/, title=github, cont=span link",
        ),
        ("<raw>raw_html</raw>", "[RAWHTML]<raw>raw_html[RAWHTML]</raw>"),
        ("***triple emphasis***", "[STRONG] triple emphasis"),
        ("~~strikethrough~~", "[DEL] strikethrough"),
        ("^(superscript)", "[SUP] superscript"),
        ("line1 [^1]\n\n [^1]: test1\n       test2\n", "[FOOTNOTE_REF] num=1"),
    ];
    for (input, expected) in cases {
        let out = span(input);
        assert!(out.contains(expected), "input {input:?}: expected {expected:?} in {out:?}");
    }
}

// ------------------------------------------------------------------
// Golden fixtures
// ------------------------------------------------------------------

#[test]
fn golden_fixtures() {
    init_logger();
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut checked = 0;

    let mut entries: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "text"))
        .collect();
    entries.sort();

    for text_path in entries {
        let html_path = text_path.with_extension("html");
        let text = fs::read_to_string(&text_path).unwrap();
        let expected = fs::read_to_string(&html_path).unwrap();
        assert_eq!(
            normalize_html(&render(&text)),
            normalize_html(&expected),
            "fixture {}",
            text_path.display()
        );
        checked += 1;
    }
    assert!(checked >= 10, "expected fixtures in {}", dir.display());
}

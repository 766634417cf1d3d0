use anyhow::Result;
use pulldown_cmark::{html, Event, Options, Parser};
use serde_json::{json, Value};

/// Turns stored post content into its render-ready form.
///
/// Implementations must be pure: the result depends on `source` only and
/// nothing is written back to the store.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, source: &str) -> Result<Value>;
}

/// CommonMark renderer producing `{ "compiledSource": "<html>" }`.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
        }
    }
}

impl MarkdownRenderer {
    /// Renders `source` to HTML. Raw HTML in the source is emitted as escaped
    /// text, never as markup. Fenced code keeps its language as a
    /// `language-<lang>` class; highlighting is left to the client.
    pub fn to_html(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
        let mut output = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Result<Value> {
        Ok(json!({ "compiledSource": self.to_html(source) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_paragraphs() {
        let html = MarkdownRenderer::default().to_html("# Hello\n\nWorld");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn renders_gfm_extensions() {
        let renderer = MarkdownRenderer::default();
        let table = renderer.to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(table.contains("<table>"));
        assert!(renderer.to_html("~~gone~~").contains("<del>gone</del>"));
        assert!(renderer.to_html("- [x] done").contains("checkbox"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = MarkdownRenderer::default()
            .to_html("hello <script>alert(1)</script>\n\n<img src=x onerror=alert(1)>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    }

    #[test]
    fn fenced_code_keeps_language_class() {
        let html = MarkdownRenderer::default().to_html("```rust\nfn main() {}\n```");
        assert!(html.contains(r#"<pre><code class="language-rust">fn main() {}"#));
    }

    #[test]
    fn render_wraps_html_in_compiled_source() {
        let value = MarkdownRenderer::default()
            .render("*hi*")
            .expect("markdown rendering is infallible");
        assert_eq!(value["compiledSource"], "<p><em>hi</em></p>\n");
    }
}

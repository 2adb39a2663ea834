use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Renders message text as HTML for display.
///
/// Raw HTML in the source is shown as text, never interpreted, and
/// `javascript:` link targets are replaced with `#`. Single newlines become
/// line breaks.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if url.trim_start().to_ascii_lowercase().starts_with("javascript:") {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fenced_code_block() {
        let html = render_markdown("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre><code class=\"language-rust\">"), "{html}");
        assert!(html.contains("fn main() {}"));
    }

    #[test]
    fn renders_bold_italic_and_inline_code() {
        let html = render_markdown("**bold** and *soft* with `x + 1`");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>soft</em>"));
        assert!(html.contains("<code>x + 1</code>"));
    }

    #[test]
    fn escapes_raw_html() {
        let html = render_markdown("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("&lt;script&gt;"));

        let block = render_markdown("<div onclick=\"x()\">boom</div>");
        assert!(!block.contains("<div"), "{block}");
    }

    #[test]
    fn neutralizes_javascript_links() {
        let html = render_markdown("[click](javascript:alert(1))");
        assert!(html.contains("href=\"#\""), "{html}");
        assert!(!html.contains("javascript:"));

        let ok = render_markdown("[docs](https://example.com)");
        assert!(ok.contains("href=\"https://example.com\""));
    }

    #[test]
    fn renders_lists_and_headers() {
        let html = render_markdown("## Title\n\n- one\n- two");
        assert!(html.contains("<h2>Title</h2>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn single_newline_becomes_line_break() {
        assert_eq!(render_markdown("a\nb"), "<p>a<br />\nb</p>\n");
    }
}

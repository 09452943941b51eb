use pulldown_cmark::{html, Event, Options, Parser};

/// Render markdown to HTML.
///
/// Raw HTML embedded in the source is demoted to text events so it is
/// escaped on output; replies come from a remote model and must not be able
/// to inject markup.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Escape HTML to prevent markup injection from literal text.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render non-markdown text for insertion: escaped, with line breaks kept.
pub fn plain_text_html(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

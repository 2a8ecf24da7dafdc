//! Full-document serializer.

use std::borrow::Cow;

use super::context::RenderContext;
use super::error::RenderError;
use super::node::{Element, Node};

/// Destination for rendered markup.
pub trait HtmlSink {
    fn write(&mut self, chunk: &str);

    /// Push buffered output to the client, if the sink streams.
    fn flush(&mut self) {}
}

impl HtmlSink for String {
    fn write(&mut self, chunk: &str) {
        self.push_str(chunk);
    }
}

/// Static wrapper around the application markup.
#[derive(Debug, Clone)]
pub struct DocumentShell {
    pub title: String,
    pub description: String,
}

const HEAD_ASSETS: &str = concat!(
    r#"<meta charset="utf-8">"#,
    r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
    r#"<link rel="stylesheet" href="/style.css">"#,
);

const BODY_SCRIPTS: &str = r#"<script src="/js/index.js" type="module" defer></script>"#;

pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Render `app` inside the document shell.
///
/// The head is written and flushed before the body so streaming sinks can
/// deliver it while the rest of the tree is still being walked.
pub fn render_document(
    sink: &mut dyn HtmlSink,
    ctx: &mut RenderContext,
    shell: &DocumentShell,
    app: &Node,
) -> Result<(), RenderError> {
    sink.write("<!DOCTYPE html><html lang=\"en\"><head>");
    sink.write(HEAD_ASSETS);
    sink.write("<title>");
    sink.write(&escape_html(&shell.title));
    sink.write("</title><meta name=\"description\" content=\"");
    sink.write(&escape_html(&shell.description));
    sink.write("\"></head><body>");
    sink.flush();

    write_node(sink, ctx, app)?;

    sink.write(BODY_SCRIPTS);
    sink.write("</body></html>");
    sink.flush();
    Ok(())
}

/// Depth-first serialization of a node.
pub fn write_node(
    sink: &mut dyn HtmlSink,
    ctx: &mut RenderContext,
    node: &Node,
) -> Result<(), RenderError> {
    match node {
        Node::Empty => Ok(()),
        Node::Text(text) => {
            sink.write(&escape_html(text));
            Ok(())
        }
        Node::Raw(text) => {
            sink.write(text);
            Ok(())
        }
        Node::Element(element) => write_element(sink, ctx, element),
        Node::Fragment(nodes) => {
            for node in nodes {
                write_node(sink, ctx, node)?;
            }
            Ok(())
        }
        Node::Component(render) => {
            let node = render(ctx)?;
            write_node(sink, ctx, &node)
        }
        Node::Flush => {
            sink.flush();
            Ok(())
        }
    }
}

fn write_element(
    sink: &mut dyn HtmlSink,
    ctx: &mut RenderContext,
    element: &Element,
) -> Result<(), RenderError> {
    sink.write("<");
    sink.write(&element.tag);
    for (name, value) in &element.attrs {
        sink.write(" ");
        sink.write(name);
        if !value.is_empty() {
            sink.write("=\"");
            sink.write(&escape_html(value));
            sink.write("\"");
        }
    }
    sink.write(">");

    if element.is_void() {
        return Ok(());
    }

    for child in &element.children {
        write_node(sink, ctx, child)?;
    }

    sink.write("</");
    sink.write(&element.tag);
    sink.write(">");
    Ok(())
}

/// Render a node to a string, outside of any document shell.
pub fn render_to_string(ctx: &mut RenderContext, node: &Node) -> Result<String, RenderError> {
    let mut html = String::new();
    write_node(&mut html, ctx, node)?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::Transport;
    use crate::render::node::{component, el, raw, redirect, text};

    fn ctx() -> RenderContext {
        RenderContext::new("/", Transport::Http)
    }

    #[derive(Default)]
    struct CountingSink {
        html: String,
        flushes: Vec<usize>,
    }

    impl HtmlSink for CountingSink {
        fn write(&mut self, chunk: &str) {
            self.html.push_str(chunk);
        }

        fn flush(&mut self) {
            self.flushes.push(self.html.len());
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("plain"), "plain");
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_write_nested_elements() {
        let node: Node = el("div")
            .id("home")
            .child(el("h2").child("Search <Videos>"))
            .child(el("input").attr("type", "text").attr("required", ""))
            .child(el("style").child(raw("#home form { width: 1px }")))
            .into();

        let html = render_to_string(&mut ctx(), &node).unwrap();
        assert_eq!(
            html,
            "<div id=\"home\"><h2>Search &lt;Videos&gt;</h2><input type=\"text\" required>\
             <style>#home form { width: 1px }</style></div>"
        );
    }

    #[test]
    fn test_components_see_context() {
        let node = component(|ctx| Ok(text(format!("at {}", ctx.url()))));
        let html = render_to_string(&mut RenderContext::new("/video/a", Transport::Http), &node)
            .unwrap();
        assert_eq!(html, "at /video/a");
    }

    #[test]
    fn test_redirect_terminates_and_records_target() {
        let node: Node = el("div").child("before").child(redirect("/")).into();
        let mut ctx = ctx();
        let result = render_to_string(&mut ctx, &node);
        assert_eq!(result, Err(RenderError::EarlyTerminate));
        assert_eq!(ctx.redirect_target(), Some("/"));
    }

    #[test]
    fn test_document_shell_is_written_once_and_flushed() {
        let mut sink = CountingSink::default();
        let shell = DocumentShell {
            title: "A & B".to_string(),
            description: "say \"hi\"".to_string(),
        };
        let app: Node = el("div").id("app").child(Node::Flush).child("body").into();

        render_document(&mut sink, &mut ctx(), &shell, &app).unwrap();

        assert!(sink.html.starts_with("<!DOCTYPE html>"));
        assert_eq!(sink.html.matches("<head>").count(), 1);
        assert!(sink.html.contains("<title>A &amp; B</title>"));
        assert!(sink.html.contains("content=\"say &quot;hi&quot;\""));
        assert!(sink.html.ends_with("</body></html>"));
        // head, explicit flush inside the app, end of document
        assert_eq!(sink.flushes.len(), 3);
        assert!(sink.html[..sink.flushes[0]].ends_with("<body>"));
    }
}

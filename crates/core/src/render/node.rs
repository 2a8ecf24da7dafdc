//! Page tree built by route producers and consumed by both serializers.

use std::fmt;
use std::sync::Arc;

use super::context::RenderContext;
use super::error::RenderError;

/// A component evaluated lazily while rendering.
pub type ComponentFn = dyn Fn(&mut RenderContext) -> Result<Node, RenderError> + Send + Sync;

#[derive(Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    /// Text, escaped on output.
    Text(String),
    /// Trusted text written verbatim (style and script bodies).
    Raw(String),
    Element(Element),
    Fragment(Vec<Node>),
    Component(Arc<ComponentFn>),
    /// Hint for streaming sinks to push what has been written so far.
    Flush,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => f.write_str("Empty"),
            Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Node::Raw(text) => f.debug_tuple("Raw").field(text).finish(),
            Node::Element(element) => element.fmt(f),
            Node::Fragment(nodes) => f.debug_tuple("Fragment").field(nodes).finish(),
            Node::Component(_) => f.write_str("Component(<fn>)"),
            Node::Flush => f.write_str("Flush"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Elements that never have a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(
            self.tag.as_str(),
            "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source"
                | "track" | "wbr"
        )
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map(Into::into).unwrap_or(Node::Empty)
    }
}

pub fn el(tag: impl Into<String>) -> Element {
    Element::new(tag)
}

pub fn text(value: impl Into<String>) -> Node {
    Node::Text(value.into())
}

pub fn raw(value: impl Into<String>) -> Node {
    Node::Raw(value.into())
}

pub fn fragment<I, N>(nodes: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Fragment(nodes.into_iter().map(Into::into).collect())
}

pub fn component<F>(f: F) -> Node
where
    F: Fn(&mut RenderContext) -> Result<Node, RenderError> + Send + Sync + 'static,
{
    Node::Component(Arc::new(f))
}

/// Component that aborts rendering and asks the transport to navigate to `href`.
pub fn redirect(href: impl Into<String>) -> Node {
    let href = href.into();
    component(move |ctx| {
        ctx.redirect(href.clone());
        Err(RenderError::EarlyTerminate)
    })
}

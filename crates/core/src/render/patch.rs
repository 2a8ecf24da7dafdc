//! Compact structural form of a subtree, sent over push channels.
//!
//! An element becomes `[selector]`, `[selector, attrs]` or
//! `[selector, attrs, children]`, where `selector` folds the tag, id and
//! classes together (`div#downloadPage.panel`). Text becomes a JSON string.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::context::RenderContext;
use super::error::RenderError;
use super::node::{Element, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
    Text(String),
    Element(VElement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VElement {
    pub selector: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<VNode>,
}

impl Serialize for VNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VNode::Text(text) => serializer.serialize_str(text),
            VNode::Element(element) => element.serialize(serializer),
        }
    }
}

struct Attrs<'a>(&'a [(String, String)]);

impl Serialize for Attrs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for VElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if !self.children.is_empty() {
            3
        } else if !self.attrs.is_empty() {
            2
        } else {
            1
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.selector)?;
        if len >= 2 {
            seq.serialize_element(&Attrs(&self.attrs))?;
        }
        if len == 3 {
            seq.serialize_element(&self.children)?;
        }
        seq.end()
    }
}

/// Convert a subtree rooted at a single node into its patch form.
pub fn to_patch(ctx: &mut RenderContext, node: &Node) -> Result<VNode, RenderError> {
    let mut nodes = Vec::new();
    collect(ctx, node, &mut nodes)?;
    if nodes.len() == 1 {
        Ok(nodes.remove(0))
    } else {
        Err(RenderError::fault(format!(
            "patch root must be a single node, got {}",
            nodes.len()
        )))
    }
}

fn collect(ctx: &mut RenderContext, node: &Node, out: &mut Vec<VNode>) -> Result<(), RenderError> {
    match node {
        Node::Empty | Node::Flush => Ok(()),
        Node::Text(text) | Node::Raw(text) => {
            if !text.is_empty() {
                out.push(VNode::Text(text.clone()));
            }
            Ok(())
        }
        Node::Element(element) => {
            out.push(VNode::Element(convert_element(ctx, element)?));
            Ok(())
        }
        Node::Fragment(nodes) => {
            for node in nodes {
                collect(ctx, node, out)?;
            }
            Ok(())
        }
        Node::Component(render) => {
            let node = render(ctx)?;
            collect(ctx, &node, out)
        }
    }
}

fn convert_element(ctx: &mut RenderContext, element: &Element) -> Result<VElement, RenderError> {
    let mut selector = element.tag.clone();
    let mut attrs = Vec::new();

    for (name, value) in &element.attrs {
        match name.as_str() {
            "id" if is_selector_safe(value) => {
                selector.push('#');
                selector.push_str(value);
            }
            "class" if value.split_whitespace().all(is_selector_safe) => {
                for class in value.split_whitespace() {
                    selector.push('.');
                    selector.push_str(class);
                }
            }
            _ => attrs.push((name.clone(), value.clone())),
        }
    }

    let mut children = Vec::new();
    for child in &element.children {
        collect(ctx, child, &mut children)?;
    }

    Ok(VElement {
        selector,
        attrs,
        children,
    })
}

fn is_selector_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

//! Page tree rendering.
//!
//! The same tree serializes either to a full HTML document (HTTP) or to a
//! compact patch (push channels). Faults other than the early-terminate
//! signal are contained here and turned into inline error text.

mod context;
mod error;
mod html;
mod node;
mod patch;

pub use context::{RenderContext, Transport};
pub use error::RenderError;
pub use html::{escape_html, render_document, render_to_string, write_node, DocumentShell, HtmlSink};
pub use node::{component, el, fragment, raw, redirect, text, ComponentFn, Element, Node};
pub use patch::{to_patch, VElement, VNode};

use tracing::error;

/// How a guarded render ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Complete,
    /// Stopped by the early-terminate signal; output must be discarded.
    Terminated,
    /// A fault was caught and written to the sink as inline text.
    Failed(String),
}

/// Inline message shown in place of a page that failed to render.
pub fn internal_error_message(error: &RenderError) -> String {
    format!("Internal Error: {}", error)
}

/// Render a document, converting faults into inline text.
pub fn render_document_guarded(
    sink: &mut dyn HtmlSink,
    ctx: &mut RenderContext,
    shell: &DocumentShell,
    app: &Node,
) -> RenderOutcome {
    match render_document(sink, ctx, shell, app) {
        Ok(()) => RenderOutcome::Complete,
        Err(RenderError::EarlyTerminate) => RenderOutcome::Terminated,
        Err(e) => {
            error!(url = ctx.url(), "Failed to render page: {}", e);
            let message = internal_error_message(&e);
            sink.write(&escape_html(&message));
            sink.flush();
            RenderOutcome::Failed(e.to_string())
        }
    }
}

/// Build a patch, converting faults into an inline error element.
///
/// Returns `None` when rendering was deliberately terminated.
pub fn to_patch_guarded(ctx: &mut RenderContext, node: &Node) -> Option<VNode> {
    match to_patch(ctx, node) {
        Ok(patch) => Some(patch),
        Err(RenderError::EarlyTerminate) => None,
        Err(e) => {
            error!(url = ctx.url(), "Failed to render patch: {}", e);
            Some(VNode::Element(VElement {
                selector: "p.error".to_string(),
                attrs: Vec::new(),
                children: vec![VNode::Text(internal_error_message(&e))],
            }))
        }
    }
}

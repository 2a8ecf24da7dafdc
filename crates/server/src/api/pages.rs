//! Full-document responses for page routes.
//!
//! Streaming routes send their headers right away and push the document as
//! the renderer flushes. Every other route is rendered into a buffer first so
//! a redirect or a fault can still decide the status.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use futures::channel::mpsc;
use tracing::{debug, warn};
use tubefetch_core::metrics::RENDERS;
use tubefetch_core::render::{render_document_guarded, RenderOutcome};
use tubefetch_core::{DocumentShell, HtmlSink, Node, PageRoute, RenderContext, Transport};

use crate::state::AppState;

pub async fn page(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let route = state.dispatcher().resolve(&url).await;
    let app = state.dispatcher().app(&route);
    let shell = DocumentShell {
        title: route.title.clone(),
        description: route.description.clone(),
    };
    let status = route_status(&route);

    if route.streaming {
        streamed(url, status, shell, app)
    } else {
        buffered(&url, status, &shell, &app)
    }
}

fn route_status(route: &PageRoute) -> StatusCode {
    route
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK)
}

fn buffered(url: &str, status: StatusCode, shell: &DocumentShell, app: &Node) -> Response {
    let mut html = String::new();
    let mut ctx = RenderContext::new(url, Transport::Http);

    match render_document_guarded(&mut html, &mut ctx, shell, app) {
        RenderOutcome::Complete => {
            RENDERS.with_label_values(&["http", "complete"]).inc();
            (status, Html(html)).into_response()
        }
        RenderOutcome::Terminated => {
            RENDERS.with_label_values(&["http", "redirect"]).inc();
            match ctx.redirect_target() {
                Some(href) => {
                    debug!(url, href, "Redirecting");
                    Redirect::to(href).into_response()
                }
                None => status.into_response(),
            }
        }
        RenderOutcome::Failed(_) => {
            RENDERS.with_label_values(&["http", "failed"]).inc();
            (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
        }
    }
}

/// Sink that forwards each flushed chunk to the response body.
struct ChannelSink {
    buffer: String,
    tx: mpsc::UnboundedSender<Result<String, Infallible>>,
}

impl HtmlSink for ChannelSink {
    fn write(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let chunk = std::mem::take(&mut self.buffer);
        if self.tx.unbounded_send(Ok(chunk)).is_err() {
            debug!("Client went away while a page was streaming");
        }
    }
}

fn streamed(url: String, status: StatusCode, shell: DocumentShell, app: Node) -> Response {
    let (tx, rx) = mpsc::unbounded();

    tokio::spawn(async move {
        let mut sink = ChannelSink {
            buffer: String::new(),
            tx,
        };
        let mut ctx = RenderContext::new(url, Transport::Http);
        let outcome = render_document_guarded(&mut sink, &mut ctx, &shell, &app);
        sink.flush();

        let label = match outcome {
            RenderOutcome::Complete => "complete",
            RenderOutcome::Terminated => {
                // Headers are already out; the redirect cannot be honoured.
                warn!(
                    url = ctx.url(),
                    href = ctx.redirect_target(),
                    "Streamed page terminated after headers were sent"
                );
                "redirect"
            }
            RenderOutcome::Failed(_) => "failed",
        };
        RENDERS.with_label_values(&["http", label]).inc();
    });

    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from_stream(rx),
    )
        .into_response()
}

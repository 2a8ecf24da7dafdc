/// Which transport a render is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP request, answered with a full document.
    Http,
    /// Open push channel, answered with patches.
    Channel,
}

/// Per-render state shared with components.
#[derive(Debug, Clone)]
pub struct RenderContext {
    url: String,
    transport: Transport,
    redirect: Option<String>,
}

impl RenderContext {
    pub fn new(url: impl Into<String>, transport: Transport) -> Self {
        Self {
            url: url.into(),
            transport,
            redirect: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn redirect(&mut self, href: impl Into<String>) {
        self.redirect = Some(href.into());
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref()
    }
}

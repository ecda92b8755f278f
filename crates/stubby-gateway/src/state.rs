use std::sync::Arc;

use stubby_store::{Key, LinkService};

#[derive(Clone)]
pub struct AppState {
    links: Arc<dyn LinkService>,
    base_url: Option<String>,
    expose_info: bool,
}

impl AppState {
    pub fn new(links: Arc<dyn LinkService>) -> Self {
        Self {
            links,
            base_url: None,
            expose_info: false,
        }
    }

    /// Short URLs are built from this base instead of the request's `Host`.
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Mounts `GET /info/{key}`.
    pub fn with_info(mut self, expose_info: bool) -> Self {
        self.expose_info = expose_info;
        self
    }

    pub fn links(&self) -> &dyn LinkService {
        self.links.as_ref()
    }

    pub fn expose_info(&self) -> bool {
        self.expose_info
    }

    pub fn short_url(&self, key: &Key, host: &str) -> String {
        match &self.base_url {
            Some(base_url) => key.to_url(base_url),
            None => format!("http://{}/{}", host, key),
        }
    }
}

pub mod ai1ec_html;
pub mod base;

use reqwest::blocking::Client;

use crate::config::AppConfig;
use crate::error::Result;

pub use ai1ec_html::Ai1ecExtractor;

/// Where the listing page comes from.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Single blocking GET, no retries. Non-success statuses are errors.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: base::http_client(config)?,
        })
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<String> {
        base::fetch_html(&self.client, url)
    }
}

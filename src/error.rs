use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {name} selector {selector:?}")]
    Selector { name: &'static str, selector: String },

    #[error("unknown timezone: {0}")]
    Timezone(String),

    #[error("unparseable event time label: {0:?}")]
    TimeLabel(String),

    #[error("RSS error: {0}")]
    Rss(#[from] rss::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        AppError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

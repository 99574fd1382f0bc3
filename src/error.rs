use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(&'static str),
    #[error("unknown field path: `{0}`")]
    UnknownFieldPath(String),
    #[error("malformed expression: {0}")]
    MalformedExpression(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("query matched no results")]
    NoResults,
    #[error("query returned {found} rows where at most one was expected")]
    TooManyResults { found: usize },
    #[error("stream is closed")]
    StreamClosed,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether this is the backend's "no results" signal, which the fetch
    /// layer converts to an empty outcome instead of surfacing.
    pub fn is_no_results(&self) -> bool {
        matches!(self, Error::NoResults)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait WithContext<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T> WithContext<T> for Result<T> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: msg.into(),
            source: Box::new(e),
        })
    }
}

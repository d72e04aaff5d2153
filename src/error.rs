pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("remote query failed: {0}")]
    RemoteQuery(String),

    #[error("no results: {0}")]
    NoResults(String),
}

impl Error {
    /// Stable machine-readable tag, used in logs and by callers that need to
    /// branch on the failure class without matching the full enum.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::MalformedFilter(_) => "MalformedFilter",
            Error::InvalidRange(_) => "InvalidRange",
            Error::InvalidParameter(_) => "InvalidParameter",
            Error::IndexOutOfRange(_) => "IndexOutOfRange",
            Error::RemoteQuery(_) => "RemoteQuery",
            Error::NoResults(_) => "NoResults",
        }
    }
}

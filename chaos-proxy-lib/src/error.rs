use thiserror::Error;

/// Errors that can occur in the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DNS resolution failed for {0}")]
    Unresolved(String),

    #[error("upstream connect timed out")]
    ConnectTimeout,

    #[error("unrecognized client protocol")]
    UnknownProtocol,

    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

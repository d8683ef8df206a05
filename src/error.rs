use std::error::Error as StdError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid pattern {pattern:?}: capture group name {name:?} is reserved")]
    ReservedGroup { pattern: String, name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cache capacity must be greater than zero")]
    ZeroCacheCapacity,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("unknown mode {0:?}, expected \"production\" or \"development\"")]
    InvalidMode(String),
}

/// Faults produced by the dispatcher itself rather than by a handler.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler called next and then returned Continue, dropping the downstream response")]
    ResponseDropped,
}

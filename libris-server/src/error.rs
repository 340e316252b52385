use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibrisError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error(transparent)]
    Store(#[from] libris_store_db::Error),

    #[error("Bad request: {reason}")]
    BadRequest { reason: String },

    #[error("Route not found")]
    RouteNotFound,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Server startup failed: {reason}")]
    Startup { reason: String },

    #[error("Blocking task failed: {reason}")]
    Task { reason: String },
}

pub type Result<T> = std::result::Result<T, LibrisError>;

/// Extension trait for adding context to IO errors
pub trait IoErrorContext<T> {
    fn io_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> IoErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LibrisError::Io {
            context: context.into(),
            source: e,
        })
    }
}

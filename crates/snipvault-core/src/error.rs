//! Error types for the Snipvault storage layer

use thiserror::Error;

/// Result type alias using Snipvault's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Storage layer errors
///
/// Every failure carries enough detail (status text or a named reason)
/// for a caller to render a meaningful message. Nothing is retried
/// internally; errors propagate to the caller as-is.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (E100-E199)
    #[error("Configuration error: {0}")]
    Config(String),

    // Remote backend errors (E200-E299)
    #[error("Could not reach remote storage: {0}")]
    Connectivity(String),

    #[error("Remote storage request failed: {0}")]
    RemoteRequest(String),

    // Local backend errors (E300-E399)
    #[error("Schema integrity check failed: {0}")]
    SchemaIntegrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Invariant errors (E400-E499)
    #[error("The default namespace cannot be deleted")]
    DefaultNamespaceProtected,

    #[error("Destructive operation requires explicit confirmation")]
    ConfirmationRequired,

    // Lookup errors (E500-E599)
    #[error("Snippet '{0}' not found")]
    SnippetNotFound(String),

    #[error("Namespace '{0}' not found")]
    NamespaceNotFound(String),

    // Record errors (E600-E699)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E100",
            Self::Connectivity(_) => "E200",
            Self::RemoteRequest(_) => "E201",
            Self::SchemaIntegrity(_) => "E300",
            Self::Database(_) => "E301",
            Self::DefaultNamespaceProtected => "E400",
            Self::ConfirmationRequired => "E401",
            Self::SnippetNotFound(_) => "E500",
            Self::NamespaceNotFound(_) => "E501",
            Self::InvalidRecord(_) => "E600",
            Self::Serialization(_) => "E601",
            Self::Io(_) => "E9999",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_named_reason() {
        let err = Error::RemoteRequest("503 Service Unavailable".to_string());
        assert!(err.to_string().contains("503"));

        let err = Error::SchemaIntegrity("missing table 'namespaces'".to_string());
        assert!(err.to_string().contains("namespaces"));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::DefaultNamespaceProtected.code(), "E400");
        assert_eq!(Error::Config("x".into()).code(), "E100");
    }
}

//! Source error types.

use std::io;
use thiserror::Error;

/// Errors raised while resolving, listing or reading a photo source.
#[derive(Error, Debug)]
pub enum FsError {
    /// I/O error during a source operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed source URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// No factory registered for a scheme
    #[error("Unknown scheme: {0}")]
    UnknownScheme(String),

    /// A factory is already registered for a scheme
    #[error("Scheme already registered: {0}")]
    DuplicateScheme(String),

    /// A reference-encoded path that cannot be decoded
    #[error("Malformed photo reference: {0}")]
    MalformedReference(String),

    /// Non-success status from an upstream service
    #[error("Upstream returned HTTP {status} for {url}")]
    Upstream { status: u16, url: String },

    /// The source has been closed
    #[error("Source is closed: {0}")]
    Closed(String),

    /// Source backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// HTTP transport error
    #[cfg(feature = "flickr")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Object store error
    #[cfg(feature = "blob")]
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error annotated with the operation and path it happened on
    #[error("{operation} {path}: {source}")]
    Context {
        operation: &'static str,
        path: String,
        #[source]
        source: Box<FsError>,
    },
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// Wrap this error with the operation and path that produced it.
    pub fn context(self, operation: &'static str, path: impl Into<String>) -> Self {
        FsError::Context {
            operation,
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through context wrappers.
    pub fn root_cause(&self) -> &FsError {
        match self {
            FsError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self.root_cause() {
            FsError::NotFound(_) => true,
            FsError::Upstream { status: 404, .. } => true,
            FsError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            #[cfg(feature = "blob")]
            FsError::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        match self.root_cause() {
            FsError::PermissionDenied(_) => true,
            FsError::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

/// Attach operation/path context to fallible results.
pub trait ResultExt<T> {
    fn context(self, operation: &'static str, path: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: &'static str, path: &str) -> Result<T> {
        self.map_err(|e| e.context(operation, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_not_found() {
        let missing = FsError::Upstream { status: 404, url: "/1/1_a_o.jpg".into() };
        assert!(missing.is_not_found());
        let failed = FsError::Upstream { status: 503, url: "/1/1_a_o.jpg".into() };
        assert!(!failed.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        let err = FsError::NotFound("test".to_string());
        assert!(err.is_not_found());

        let io_err = FsError::Io(io::Error::new(io::ErrorKind::NotFound, "not found"));
        assert!(io_err.is_not_found());

        assert!(!FsError::Backend("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_not_found_through_context() {
        let err = FsError::NotFound("a.jpg".to_string())
            .context("open", "a.jpg")
            .context("serve", "local/a.jpg");
        assert!(err.is_not_found());
        assert!(matches!(err.root_cause(), FsError::NotFound(_)));
    }

    #[test]
    fn test_error_display() {
        let err = FsError::NotFound("2024/IMG_0001.jpg".to_string());
        assert_eq!(err.to_string(), "Path not found: 2024/IMG_0001.jpg");

        let err = FsError::UnknownScheme("gopher".to_string()).context("resolve", "gopher://x");
        assert_eq!(err.to_string(), "resolve gopher://x: Unknown scheme: gopher");
    }
}

//! Error types for the dog breed trainer.

use thiserror::Error;

/// Main error type for the dog breed trainer.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Dataset error (missing data, bad labels, shape mismatch)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Model construction or loading error
    #[error("Model error: {0}")]
    Model(String),

    /// Architecture name outside the supported set
    #[error("Unsupported architecture: '{0}' (expected one of alexnet, vgg16, resnet50, mobilenet)")]
    UnsupportedArchitecture(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),

    /// Checkpoint or saved-model persistence error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Specialized Result type for dog breed trainer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Model("test error".to_string());
        assert_eq!(err.to_string(), "Model error: test error");
    }

    #[test]
    fn test_unsupported_architecture_display() {
        let err = Error::UnsupportedArchitecture("googlenet".to_string());
        assert!(err.to_string().starts_with("Unsupported architecture: 'googlenet'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccError {
    #[error("Invalid point: {reason}")]
    InvalidPointError { reason: String },

    #[error("Reference system mismatch: expected {expected}, found {found}")]
    ReferenceSystemMismatchError { expected: String, found: String },

    #[error("Cannot evaluate a status from an empty result table")]
    EmptyResultError,

    #[error("Projection error: {message}")]
    ProjectionError { message: String },

    #[error("Unsupported layer format: {extension}")]
    UnsupportedFormatError { extension: String },

    #[error("Perimeter has no participants")]
    EmptyPerimeterError,

    #[error("Perimeter has no producer among {participants} participants")]
    NoProducerError { participants: usize },

    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Coordinates or participants supplied by the user.
    Input,
    /// Geometry and reference-system problems.
    Spatial,
    Evaluation,
    Configuration,
    /// File access and format decoding.
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AccError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AccError::InvalidPointError { .. }
            | AccError::EmptyPerimeterError
            | AccError::NoProducerError { .. } => ErrorCategory::Input,
            AccError::ReferenceSystemMismatchError { .. } | AccError::ProjectionError { .. } => {
                ErrorCategory::Spatial
            }
            AccError::EmptyResultError => ErrorCategory::Evaluation,
            AccError::ConfigError { .. }
            | AccError::ConfigValidationError { .. }
            | AccError::InvalidConfigValueError { .. }
            | AccError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AccError::UnsupportedFormatError { .. }
            | AccError::GeoJsonError(_)
            | AccError::CsvError(_)
            | AccError::IoError(_)
            | AccError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AccError::EmptyPerimeterError | AccError::NoProducerError { .. } => {
                ErrorSeverity::Medium
            }
            AccError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AccError::InvalidPointError { reason } => {
                format!("The production point coordinates are not valid ({})", reason)
            }
            AccError::ReferenceSystemMismatchError { expected, found } => format!(
                "The layer is not expressed in the expected reference system ({} instead of {})",
                found, expected
            ),
            AccError::EmptyResultError => {
                "No buffer was evaluated, so no status can be given".to_string()
            }
            AccError::ProjectionError { message } => {
                format!("Coordinates could not be projected: {}", message)
            }
            AccError::UnsupportedFormatError { extension } => {
                format!("Files of type '{}' cannot be read", extension)
            }
            AccError::EmptyPerimeterError => "Add a producer and some consumers".to_string(),
            AccError::NoProducerError { .. } => "No producer found among participants".to_string(),
            AccError::GeoJsonError(e) => format!("The GeoJSON file could not be read: {}", e),
            AccError::CsvError(e) => format!("The CSV file could not be processed: {}", e),
            AccError::IoError(e) => format!("File access failed: {}", e),
            AccError::SerializationError(e) => format!("Output could not be produced: {}", e),
            AccError::ConfigError { message } => format!("Configuration problem: {}", message),
            AccError::ConfigValidationError { field, message } => {
                format!("Configuration '{}' is invalid: {}", field, message)
            }
            AccError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration '{}' is invalid: {}", field, reason)
            }
            AccError::MissingConfigError { field } => {
                format!("Configuration '{}' is required", field)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => match self {
                AccError::InvalidPointError { .. } => {
                    "Enter a longitude between -180 and 180 and a latitude between -90 and 90"
                }
                _ => "Add at least one producer to the participant list",
            },
            ErrorCategory::Spatial => {
                "Reproject the layer to EPSG:2154 (Lambert-93) before evaluating"
            }
            ErrorCategory::Evaluation => "Configure at least one regulatory perimeter",
            ErrorCategory::Configuration => "Check the regulation TOML file against the documented format",
            ErrorCategory::Io => "Check that the file exists and is a valid GeoJSON or CSV file",
        }
    }
}

pub type Result<T> = std::result::Result<T, AccError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_are_classified() {
        let invalid = AccError::InvalidPointError {
            reason: "latitude missing".to_string(),
        };
        assert_eq!(invalid.category(), ErrorCategory::Input);
        assert_eq!(invalid.severity(), ErrorSeverity::High);

        let mismatch = AccError::ReferenceSystemMismatchError {
            expected: "EPSG:2154".to_string(),
            found: "EPSG:4326".to_string(),
        };
        assert_eq!(mismatch.category(), ErrorCategory::Spatial);
        assert!(mismatch.user_friendly_message().contains("EPSG:4326"));

        assert_eq!(AccError::EmptyResultError.category(), ErrorCategory::Evaluation);
    }

    #[test]
    fn io_errors_are_critical() {
        let err = AccError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("GeoJSON"));
    }
}

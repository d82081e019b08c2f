use thiserror::Error;

/// Errors produced while loading configuration from the environment or from
/// the optional field-map YAML file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read field map file {path}: {source}")]
    FieldMapIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse field map file: {0}")]
    FieldMapParse(#[from] serde_yaml::Error),

    #[error("field map validation failed: {0}")]
    Validation(String),
}

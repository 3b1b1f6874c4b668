use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("unknown factor in weight table: {0}")]
    UnknownFactor(String),

    #[error("weight table is missing factor: {0}")]
    MissingFactor(String),

    #[error("weight for {factor} must be a non-negative finite number, got {weight}")]
    NegativeWeight { factor: String, weight: f64 },

    #[error("weights must sum to 1.0, got {0:.6}")]
    WeightSum(f64),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("model call timed out after {0}ms")]
    Timeout(u64),

    #[error("model unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("college not found: {0}")]
    NotFound(String),
}

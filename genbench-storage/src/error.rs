#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Refusing to store an empty run: {0}")]
    EmptyRun(String),
}

pub type Result<T> = std::result::Result<T, Error>;

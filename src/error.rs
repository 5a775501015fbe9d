use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Duplicate wave number: {0}")]
    DuplicateWave(u32),

    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    #[error("Wave {wave} depends on unknown wave {dependency}")]
    UnknownWaveDependency { wave: u32, dependency: u32 },

    #[error("Dependency cycle detected at task: {0}")]
    DependencyCycle(String),

    #[error("No execution metrics collected yet")]
    NoMetrics,
}

pub type Result<T> = std::result::Result<T, Error>;

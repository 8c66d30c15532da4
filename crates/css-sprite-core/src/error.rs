use std::path::PathBuf;

use thiserror::Error;

/// Error type user-supplied filters and groupers may fail with.
pub type StageError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("`{0}` is required")]
    MissingOption(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),
    #[error("Template syntax error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),
    #[error("Filter #{stage} failed: {source}")]
    Filter { stage: usize, source: StageError },
    #[error("Grouper #{stage} failed: {source}")]
    Grouper { stage: usize, source: StageError },
    #[error("Packing engine error: {0}")]
    Engine(String),
    #[error("Timed out loading {path} after {timeout_ms}ms")]
    EngineTimeout { path: PathBuf, timeout_ms: u64 },
    #[error("Nothing to pack")]
    Empty,
    #[error("{path} reached the rewriter without sprite coordinates")]
    Unplaced { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, SpriteError>;

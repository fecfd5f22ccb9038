//! Sink trait for validated entities
//!
//! Sinks are the hand-off point to whatever persists or delivers the
//! crawl's output. They see entities in emission order, which is not
//! stable across runs.

use crate::model::Entity;
use thiserror::Error;

/// Errors that can occur while writing entities
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize entity: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Consumer of the entity stream
pub trait EntitySink {
    /// Records one validated entity
    fn accept(&mut self, entity: &Entity) -> SinkResult<()>;

    /// Flushes any buffered output
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

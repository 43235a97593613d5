use crate::DocId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Bad configuration, or a document missing a configured field.
    #[error("schema error: {0}")]
    Schema(String),
    #[error("index has already been built")]
    AlreadyBuilt,
    #[error("index has not been built yet")]
    NotBuilt,
    /// Bad query arguments.
    #[error("invalid query: {0}")]
    Validation(String),
    #[error("document {0} not found")]
    NotFound(DocId),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum FacetError {
    #[error("Unknown facet node: {0}")]
    UnknownNode(String),

    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, FacetError>;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CadenceError {
    #[error("Invalid section bounds: {0}")]
    InvalidSection(String),

    #[error("GPS marker not found: {0}")]
    MarkerNotFound(usize),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Event set not found: {0}")]
    EventNotFound(String),

    #[error("Event set already exists: {0}")]
    DuplicateEvent(String),

    #[error("Event set has no peaks: {0}")]
    EmptyEvent(String),

    #[error("No cycles matched between the selected events")]
    NoCycles,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
